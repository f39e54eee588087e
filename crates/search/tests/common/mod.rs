//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use sift_search::account::{AccountContext, QueryAugmenter};
use sift_search::backends::memory::MemorySearchEngine;
use sift_search::config::{IndexPresetConfiguration, IndexSettings};
use sift_search::core::{EngineQuery, SearchEngine, SearchRequest, SearchResponse};
use sift_search::error::{BackendError, SearchIndexResult};
use sift_search::expression::{
    Expression, OperationExpression, SuggestExpression, ValueExpression,
};
use sift_search::service::SingleIndexService;
use sift_search::timing::{DiagnosticSink, TimingRecord};
use sift_search::types::{
    DataChangeProcessingMode, Document, ElasticsearchInfo, FieldConfiguration, FieldType,
    IndexObject, MappingConfiguration, SuggestResult,
};
use tokio::sync::Notify;

/// A hotel as stored in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotel {
    pub id: String,
    pub name: String,
    pub city: String,
    pub stars: u32,
    #[serde(default)]
    pub rooms: Vec<Room>,
}

/// A room, indexed as a nested document of its hotel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub label: String,
    pub beds: u32,
}

impl IndexObject for Hotel {
    fn id(&self) -> Option<String> {
        Some(self.id.clone())
    }
}

impl Hotel {
    pub fn new(id: &str, name: &str, city: &str, stars: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            city: city.to_string(),
            stars,
            rooms: vec![],
        }
    }

    pub fn with_room(mut self, id: &str, label: &str, beds: u32) -> Self {
        self.rooms.push(Room {
            id: id.to_string(),
            label: label.to_string(),
            beds,
        });
        self
    }
}

/// Field configuration for hotels.
pub fn hotel_mapping() -> MappingConfiguration {
    MappingConfiguration::new(
        vec![
            FieldConfiguration::new("name", FieldType::Text)
                .sortable()
                .copy_to_fulltext()
                .with_completion(),
            FieldConfiguration::new("city", FieldType::Keyword),
            FieldConfiguration::new("stars", FieldType::Integer),
            FieldConfiguration::new("description", FieldType::Text)
                .multilingual()
                .copy_to_fulltext(),
            FieldConfiguration::nested(
                "rooms",
                vec![
                    FieldConfiguration::new("id", FieldType::Keyword),
                    FieldConfiguration::new("label", FieldType::Text),
                    FieldConfiguration::new("beds", FieldType::Integer),
                ],
            ),
        ],
        vec!["en".to_string(), "de".to_string()],
    )
}

/// Builds a document from a JSON object literal.
pub fn doc(value: Value) -> Document {
    value.as_object().cloned().expect("fixture must be a JSON object")
}

/// Hotels used by most search tests.
pub fn hotels() -> Vec<Hotel> {
    vec![
        Hotel::new("h1", "Grand Hotel", "Rome", 5)
            .with_room("r1", "Double Suite", 2)
            .with_room("r2", "Single", 1),
        Hotel::new("h2", "Hotel Lido", "Rome", 3).with_room("r3", "Family Suite", 4),
        Hotel::new("h3", "Petit Paris", "Paris", 2).with_room("r4", "Double", 2),
        Hotel::new("h4", "Grand Palais", "Paris", 4),
    ]
}

/// A multilingual document.
pub fn described_hotel() -> Document {
    doc(json!({
        "id": "h9",
        "name": "Alpine Lake",
        "city": "Zermatt",
        "stars": 4,
        "description": {
            "en": "quiet lake view",
            "de": "ruhiger Seeblick"
        }
    }))
}

/// Sink that keeps every timing record.
#[derive(Debug, Default)]
pub struct CollectingSink {
    records: Mutex<Vec<TimingRecord>>,
}

impl CollectingSink {
    pub fn names(&self) -> Vec<String> {
        self.records.lock().iter().map(|r| r.name.clone()).collect()
    }
}

impl DiagnosticSink for CollectingSink {
    fn record(&self, record: &TimingRecord) {
        self.records.lock().push(record.clone());
    }
}

/// Restricts account searches to the account's city unless it is an admin.
#[derive(Debug)]
pub struct CityFilter;

impl QueryAugmenter for CityFilter {
    fn augment(&self, account: &AccountContext, expression: Expression) -> Expression {
        if account.has_role("admin") {
            return expression;
        }
        OperationExpression::and([
            expression,
            ValueExpression::new("city", account.user_id()).into(),
        ])
        .into()
    }
}

/// Creates a service over a fresh in-memory engine.
pub fn memory_service(alias: &str) -> (Arc<MemorySearchEngine>, SingleIndexService) {
    let engine = Arc::new(MemorySearchEngine::new());
    let service = SingleIndexService::new(
        engine.clone() as Arc<dyn SearchEngine>,
        IndexPresetConfiguration::new(alias),
        hotel_mapping(),
    );
    (engine, service)
}

/// Memory engine wrapper that can hold an alias lookup or fail alias switches.
#[derive(Debug, Default)]
pub struct HookedEngine {
    pub inner: MemorySearchEngine,
    hold_next_lookup: AtomicBool,
    fail_switch: AtomicBool,
    /// Notified once a held lookup has read the alias.
    pub lookup_held: Notify,
    /// Lets a held lookup return.
    pub release_lookup: Notify,
}

impl HookedEngine {
    /// Holds the next `resolve_alias` call after it has read the alias.
    pub fn hold_next_lookup(&self) {
        self.hold_next_lookup.store(true, Ordering::SeqCst);
    }

    /// Makes every `switch_alias` call fail.
    pub fn fail_alias_switches(&self) {
        self.fail_switch.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SearchEngine for HookedEngine {
    fn name(&self) -> &'static str {
        "hooked"
    }

    async fn info(&self) -> SearchIndexResult<ElasticsearchInfo> {
        self.inner.info().await
    }

    async fn create_index(
        &self,
        index: &str,
        settings: &IndexSettings,
        mapping: &MappingConfiguration,
    ) -> SearchIndexResult<()> {
        self.inner.create_index(index, settings, mapping).await
    }

    async fn delete_index(&self, index: &str) -> SearchIndexResult<()> {
        self.inner.delete_index(index).await
    }

    async fn index_exists(&self, index: &str) -> SearchIndexResult<bool> {
        self.inner.index_exists(index).await
    }

    async fn resolve_alias(&self, alias: &str) -> SearchIndexResult<Option<String>> {
        let resolved = self.inner.resolve_alias(alias).await?;
        if self.hold_next_lookup.swap(false, Ordering::SeqCst) {
            self.lookup_held.notify_one();
            self.release_lookup.notified().await;
        }
        Ok(resolved)
    }

    async fn switch_alias(&self, alias: &str, from: Option<&str>, to: &str) -> SearchIndexResult<()> {
        if self.fail_switch.load(Ordering::SeqCst) {
            return Err(BackendError::request("hooked", "switch alias", to, "switch refused").into());
        }
        self.inner.switch_alias(alias, from, to).await
    }

    async fn remove_alias(&self, alias: &str, index: &str) -> SearchIndexResult<()> {
        self.inner.remove_alias(alias, index).await
    }

    async fn put_mapping(&self, index: &str, mapping: &MappingConfiguration) -> SearchIndexResult<()> {
        self.inner.put_mapping(index, mapping).await
    }

    async fn set_index_version(&self, index: &str, version: i32) -> SearchIndexResult<()> {
        self.inner.set_index_version(index, version).await
    }

    async fn index_version(&self, index: &str) -> SearchIndexResult<Option<i32>> {
        self.inner.index_version(index).await
    }

    async fn upsert(
        &self,
        index: &str,
        documents: &[(String, Document)],
        mode: DataChangeProcessingMode,
    ) -> SearchIndexResult<()> {
        self.inner.upsert(index, documents, mode).await
    }

    async fn delete(
        &self,
        index: &str,
        ids: &[String],
        mode: DataChangeProcessingMode,
    ) -> SearchIndexResult<()> {
        self.inner.delete(index, ids, mode).await
    }

    async fn delete_by_query(
        &self,
        index: &str,
        query: &EngineQuery,
        mode: DataChangeProcessingMode,
    ) -> SearchIndexResult<u64> {
        self.inner.delete_by_query(index, query, mode).await
    }

    async fn get(&self, index: &str, id: &str) -> SearchIndexResult<Option<Document>> {
        self.inner.get(index, id).await
    }

    async fn search(&self, index: &str, request: &SearchRequest) -> SearchIndexResult<SearchResponse> {
        self.inner.search(index, request).await
    }

    async fn suggest(
        &self,
        index: &str,
        expressions: &[SuggestExpression],
        mapping: &MappingConfiguration,
    ) -> SearchIndexResult<SuggestResult> {
        self.inner.suggest(index, expressions, mapping).await
    }

    async fn refresh(&self, index: &str) -> SearchIndexResult<()> {
        self.inner.refresh(index).await
    }
}

/// Creates a service over a shared engine.
pub fn service_on(engine: Arc<dyn SearchEngine>, alias: &str) -> SingleIndexService {
    SingleIndexService::new(engine, IndexPresetConfiguration::new(alias), hotel_mapping())
}
