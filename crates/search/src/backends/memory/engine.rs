//! In-memory search engine.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::config::IndexSettings;
use crate::core::{EngineQuery, SearchEngine, SearchRequest, SearchResponse};
use crate::error::{BackendError, SearchIndexResult};
use crate::expression::SuggestExpression;
use crate::types::{
    DataChangeProcessingMode, Document, ElasticsearchInfo, ID_FIELD, MappingConfiguration,
    SearchHitDto, SuggestResult,
};

use super::matcher::{Matcher, NestedMatches, lookup, nested_elements, sort_documents};

const BACKEND_NAME: &str = "memory";

#[derive(Debug, Default)]
struct MemoryIndex {
    settings: IndexSettings,
    mapping: MappingConfiguration,
    version: Option<i32>,
    /// Every accepted write; what `get` reads.
    documents: BTreeMap<String, Document>,
    /// What searches see; catches up with `documents` on refresh.
    searchable: BTreeMap<String, Document>,
}

impl MemoryIndex {
    fn refresh(&mut self) {
        self.searchable = self.documents.clone();
    }

    fn matching_ids(&self, query: &EngineQuery) -> Vec<String> {
        let matcher = Matcher::new(query);
        self.searchable
            .iter()
            .filter(|(_, document)| matcher.matches(document, &mut NestedMatches::new()))
            .map(|(id, _)| id.clone())
            .collect()
    }
}

#[derive(Debug, Default)]
struct State {
    indices: HashMap<String, MemoryIndex>,
    aliases: HashMap<String, String>,
}

/// A [`SearchEngine`] that keeps indices in process memory.
///
/// Gets are realtime. Searches see a snapshot that is refreshed by blocking
/// writes and by [`refresh`](SearchEngine::refresh), so background writes
/// become searchable only after a refresh, as with a real engine.
#[derive(Debug, Default)]
pub struct MemorySearchEngine {
    state: RwLock<State>,
}

impl MemorySearchEngine {
    /// Creates an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the names of all indices.
    pub fn index_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.read().indices.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the settings an index was created with.
    pub fn index_settings(&self, index: &str) -> Option<IndexSettings> {
        self.state.read().indices.get(index).map(|i| i.settings.clone())
    }

    /// Returns the field mapping of an index.
    pub fn index_mapping(&self, index: &str) -> Option<MappingConfiguration> {
        self.state.read().indices.get(index).map(|i| i.mapping.clone())
    }

    fn read_index<T>(
        &self,
        operation: &str,
        index: &str,
        f: impl FnOnce(&MemoryIndex) -> T,
    ) -> SearchIndexResult<T> {
        let state = self.state.read();
        let idx = state.indices.get(index).ok_or_else(|| missing(operation, index))?;
        Ok(f(idx))
    }

    fn write_index<T>(
        &self,
        operation: &str,
        index: &str,
        f: impl FnOnce(&mut MemoryIndex) -> T,
    ) -> SearchIndexResult<T> {
        let mut state = self.state.write();
        let idx = state
            .indices
            .get_mut(index)
            .ok_or_else(|| missing(operation, index))?;
        Ok(f(idx))
    }
}

fn missing(operation: &str, index: &str) -> BackendError {
    BackendError::request(BACKEND_NAME, operation, index, "no such index")
}

fn nested_hit(offset: usize, element: &Document) -> SearchHitDto {
    let id = match element.get(ID_FIELD) {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => offset.to_string(),
    };
    SearchHitDto::new(id, element.clone())
}

fn project(document: &Document, fields: &[String]) -> Document {
    if fields.is_empty() {
        return document.clone();
    }
    document
        .iter()
        .filter(|(key, _)| fields.iter().any(|f| f == *key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[async_trait]
impl SearchEngine for MemorySearchEngine {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn info(&self) -> SearchIndexResult<ElasticsearchInfo> {
        Ok(ElasticsearchInfo {
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            cluster_name: None,
        })
    }

    async fn create_index(
        &self,
        index: &str,
        settings: &IndexSettings,
        mapping: &MappingConfiguration,
    ) -> SearchIndexResult<()> {
        let mut state = self.state.write();
        if state.indices.contains_key(index) {
            return Err(BackendError::request(
                BACKEND_NAME,
                "create_index",
                index,
                "index already exists",
            )
            .into());
        }
        state.indices.insert(
            index.to_string(),
            MemoryIndex {
                settings: settings.clone(),
                mapping: mapping.clone(),
                ..MemoryIndex::default()
            },
        );
        debug!(index = %index, "created memory index");
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> SearchIndexResult<()> {
        let mut state = self.state.write();
        if state.indices.remove(index).is_none() {
            return Err(missing("delete_index", index).into());
        }
        state.aliases.retain(|_, target| target != index);
        Ok(())
    }

    async fn index_exists(&self, index: &str) -> SearchIndexResult<bool> {
        Ok(self.state.read().indices.contains_key(index))
    }

    async fn resolve_alias(&self, alias: &str) -> SearchIndexResult<Option<String>> {
        Ok(self.state.read().aliases.get(alias).cloned())
    }

    async fn switch_alias(&self, alias: &str, _from: Option<&str>, to: &str) -> SearchIndexResult<()> {
        let mut state = self.state.write();
        if !state.indices.contains_key(to) {
            return Err(missing("switch_alias", to).into());
        }
        state.aliases.insert(alias.to_string(), to.to_string());
        Ok(())
    }

    async fn remove_alias(&self, alias: &str, index: &str) -> SearchIndexResult<()> {
        let mut state = self.state.write();
        if state.aliases.get(alias).is_some_and(|target| target == index) {
            state.aliases.remove(alias);
        }
        Ok(())
    }

    async fn put_mapping(&self, index: &str, mapping: &MappingConfiguration) -> SearchIndexResult<()> {
        self.write_index("put_mapping", index, |idx| {
            idx.mapping.apply(mapping.fields.clone());
            for language in &mapping.languages {
                if !idx.mapping.languages.contains(language) {
                    idx.mapping.languages.push(language.clone());
                }
            }
        })
    }

    async fn set_index_version(&self, index: &str, version: i32) -> SearchIndexResult<()> {
        self.write_index("set_index_version", index, |idx| idx.version = Some(version))
    }

    async fn index_version(&self, index: &str) -> SearchIndexResult<Option<i32>> {
        self.read_index("index_version", index, |idx| idx.version)
    }

    async fn upsert(
        &self,
        index: &str,
        documents: &[(String, Document)],
        mode: DataChangeProcessingMode,
    ) -> SearchIndexResult<()> {
        self.write_index("upsert", index, |idx| {
            idx.documents.extend(documents.iter().cloned());
            if mode.is_blocking() {
                idx.refresh();
            }
        })
    }

    async fn delete(
        &self,
        index: &str,
        ids: &[String],
        mode: DataChangeProcessingMode,
    ) -> SearchIndexResult<()> {
        self.write_index("delete", index, |idx| {
            for id in ids {
                idx.documents.remove(id);
            }
            if mode.is_blocking() {
                idx.refresh();
            }
        })
    }

    async fn delete_by_query(
        &self,
        index: &str,
        query: &EngineQuery,
        mode: DataChangeProcessingMode,
    ) -> SearchIndexResult<u64> {
        self.write_index("delete_by_query", index, |idx| {
            let ids = idx.matching_ids(query);
            let mut deleted = 0;
            for id in &ids {
                if idx.documents.remove(id).is_some() {
                    deleted += 1;
                }
            }
            if mode.is_blocking() {
                idx.refresh();
            }
            deleted
        })
    }

    async fn get(&self, index: &str, id: &str) -> SearchIndexResult<Option<Document>> {
        self.read_index("get", index, |idx| idx.documents.get(id).cloned())
    }

    async fn search(&self, index: &str, request: &SearchRequest) -> SearchIndexResult<SearchResponse> {
        self.read_index("search", index, |idx| {
            let query = &request.query;
            let matcher = Matcher::new(query);
            let mut matched: Vec<(&String, &Document, NestedMatches)> = idx
                .searchable
                .iter()
                .filter_map(|(id, document)| {
                    let mut nested = NestedMatches::new();
                    matcher
                        .matches(document, &mut nested)
                        .then_some((id, document, nested))
                })
                .collect();
            sort_documents(&mut matched, |(_, document, _)| *document, &request.sort, query);

            let total = matched.len() as u64;
            let hits = matched
                .into_iter()
                .skip(request.from as usize)
                .take(request.size as usize)
                .map(|(id, document, nested)| {
                    let hit = SearchHitDto::new(id.clone(), project(document, &request.fields_to_resolve));
                    if request.inner_hits.is_empty() {
                        return hit;
                    }
                    let groups: HashMap<String, Vec<SearchHitDto>> = request
                        .inner_hits
                        .iter()
                        .map(|option| {
                            let elements = nested_elements(document, &option.relation);
                            let inner = match nested.get(&option.relation) {
                                Some(offsets) => elements
                                    .into_iter()
                                    .filter(|(offset, _)| offsets.contains(offset))
                                    .collect::<Vec<_>>(),
                                None => elements,
                            };
                            let inner_hits = inner
                                .into_iter()
                                .take(option.size as usize)
                                .map(|(offset, element)| nested_hit(offset, element))
                                .collect();
                            (option.relation.clone(), inner_hits)
                        })
                        .collect();
                    hit.inner_hits(groups)
                })
                .collect();

            SearchResponse {
                hits,
                total,
                exact_total: true,
            }
        })
    }

    async fn suggest(
        &self,
        index: &str,
        expressions: &[SuggestExpression],
        mapping: &MappingConfiguration,
    ) -> SearchIndexResult<SuggestResult> {
        self.read_index("suggest", index, |idx| {
            let mut result = SuggestResult::new();
            for expression in expressions {
                let prefix = expression.text().to_lowercase();
                let path = mapping.resolve_field_name(expression.name(), None);
                let candidates: BTreeSet<String> = idx
                    .searchable
                    .values()
                    .flat_map(|document| lookup(document, &path))
                    .filter_map(Value::as_str)
                    .filter(|text| text.to_lowercase().starts_with(&prefix))
                    .map(str::to_string)
                    .collect();
                result.insert(
                    expression.name(),
                    candidates.into_iter().take(expression.count()).collect(),
                );
            }
            result
        })
    }

    async fn refresh(&self, index: &str) -> SearchIndexResult<()> {
        self.write_index("refresh", index, MemoryIndex::refresh)
    }
}
