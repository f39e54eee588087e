//! [`SearchEngine`] implementation for Elasticsearch.

use async_trait::async_trait;
use elasticsearch::http::request::JsonBody;
use elasticsearch::indices::{
    IndicesCreateParts, IndicesDeleteAliasParts, IndicesDeleteParts, IndicesExistsParts,
    IndicesGetAliasParts, IndicesGetMappingParts, IndicesPutMappingParts, IndicesRefreshParts,
};
use elasticsearch::params::{Conflicts, Refresh};
use elasticsearch::{BulkParts, DeleteByQueryParts, GetParts, SearchParts};
use serde_json::{Value, json};

use crate::config::IndexSettings;
use crate::core::{EngineQuery, SearchEngine, SearchRequest, SearchResponse};
use crate::error::{BackendError, SearchIndexResult};
use crate::expression::SuggestExpression;
use crate::types::{DataChangeProcessingMode, Document, ElasticsearchInfo, MappingConfiguration, SuggestResult};

use super::backend::{BACKEND_NAME, ElasticsearchEngine, ensure_success, read_json, transport_error};
use super::query_builder::{build_delete_body, build_search_body, build_suggest_body};
use super::response::{parse_search_response, parse_suggest_response};
use super::schema::{INDEX_VERSION_META, create_index_body, mapping_body};

/// Version of the Elasticsearch client library.
const CLIENT_VERSION: &str = "8.15.0-alpha.1";

fn refresh_policy(mode: DataChangeProcessingMode) -> Refresh {
    if mode.is_blocking() {
        Refresh::WaitFor
    } else {
        Refresh::False
    }
}

impl ElasticsearchEngine {
    async fn bulk(
        &self,
        operation: &str,
        index: &str,
        body: Vec<JsonBody<Value>>,
        mode: DataChangeProcessingMode,
    ) -> SearchIndexResult<()> {
        let response = self
            .client()
            .bulk(BulkParts::Index(index))
            .refresh(refresh_policy(mode))
            .body(body)
            .send()
            .await
            .map_err(|e| transport_error(operation, index, e))?;
        let body = read_json(operation, index, response).await?;

        if body.get("errors").and_then(|e| e.as_bool()).unwrap_or(false) {
            // missing documents on delete are not errors
            let failure = body
                .get("items")
                .and_then(|items| items.as_array())
                .into_iter()
                .flatten()
                .filter_map(|item| item.as_object()?.values().next())
                .find_map(|result| result.get("error"));
            if let Some(error) = failure {
                return Err(BackendError::request(BACKEND_NAME, operation, index, error.to_string()).into());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SearchEngine for ElasticsearchEngine {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn info(&self) -> SearchIndexResult<ElasticsearchInfo> {
        let response = self
            .client()
            .info()
            .send()
            .await
            .map_err(|e| transport_error("info", "", e))?;
        let body = read_json("info", "", response).await?;

        Ok(ElasticsearchInfo {
            client_version: CLIENT_VERSION.to_string(),
            server_version: body
                .get("version")
                .and_then(|v| v.get("number"))
                .and_then(|n| n.as_str())
                .unwrap_or_default()
                .to_string(),
            cluster_name: body
                .get("cluster_name")
                .and_then(|n| n.as_str())
                .map(String::from),
        })
    }

    async fn create_index(
        &self,
        index: &str,
        settings: &IndexSettings,
        mapping: &MappingConfiguration,
    ) -> SearchIndexResult<()> {
        let response = self
            .client()
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(create_index_body(settings, mapping))
            .send()
            .await
            .map_err(|e| transport_error("create index", index, e))?;
        ensure_success("create index", index, response).await?;

        tracing::debug!("Created Elasticsearch index '{}'", index);
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> SearchIndexResult<()> {
        let response = self
            .client()
            .indices()
            .delete(IndicesDeleteParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| transport_error("delete index", index, e))?;

        // 404 is OK (index doesn't exist)
        if response.status_code().as_u16() != 404 {
            ensure_success("delete index", index, response).await?;
        }

        tracing::debug!("Deleted Elasticsearch index '{}'", index);
        Ok(())
    }

    async fn index_exists(&self, index: &str) -> SearchIndexResult<bool> {
        let response = self
            .client()
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| transport_error("index exists", index, e))?;

        match response.status_code().as_u16() {
            404 => Ok(false),
            _ => ensure_success("index exists", index, response).await.map(|_| true),
        }
    }

    async fn resolve_alias(&self, alias: &str) -> SearchIndexResult<Option<String>> {
        let response = self
            .client()
            .indices()
            .get_alias(IndicesGetAliasParts::Name(&[alias]))
            .send()
            .await
            .map_err(|e| transport_error("get alias", alias, e))?;

        if response.status_code().as_u16() == 404 {
            return Ok(None);
        }
        let body = read_json("get alias", alias, response).await?;

        // {"<index>": {"aliases": {"<alias>": {}}}}
        let mut indices: Vec<&String> = body
            .as_object()
            .map(|o| o.keys().collect())
            .unwrap_or_default();
        indices.sort();
        if indices.len() > 1 {
            tracing::warn!(alias = %alias, indices = ?indices, "alias points at several indices");
        }
        Ok(indices.last().map(|i| i.to_string()))
    }

    async fn switch_alias(&self, alias: &str, from: Option<&str>, to: &str) -> SearchIndexResult<()> {
        let mut actions = Vec::new();
        if let Some(from) = from {
            actions.push(json!({ "remove": { "index": from, "alias": alias } }));
        }
        actions.push(json!({ "add": { "index": to, "alias": alias } }));

        let response = self
            .client()
            .indices()
            .update_aliases()
            .body(json!({ "actions": actions }))
            .send()
            .await
            .map_err(|e| transport_error("update aliases", to, e))?;
        ensure_success("update aliases", to, response).await?;
        Ok(())
    }

    async fn remove_alias(&self, alias: &str, index: &str) -> SearchIndexResult<()> {
        let response = self
            .client()
            .indices()
            .delete_alias(IndicesDeleteAliasParts::IndexName(&[index], &[alias]))
            .send()
            .await
            .map_err(|e| transport_error("delete alias", index, e))?;

        if response.status_code().as_u16() != 404 {
            ensure_success("delete alias", index, response).await?;
        }
        Ok(())
    }

    async fn put_mapping(&self, index: &str, mapping: &MappingConfiguration) -> SearchIndexResult<()> {
        let response = self
            .client()
            .indices()
            .put_mapping(IndicesPutMappingParts::Index(&[index]))
            .body(mapping_body(mapping))
            .send()
            .await
            .map_err(|e| transport_error("put mapping", index, e))?;
        ensure_success("put mapping", index, response).await?;
        Ok(())
    }

    async fn set_index_version(&self, index: &str, version: i32) -> SearchIndexResult<()> {
        let response = self
            .client()
            .indices()
            .put_mapping(IndicesPutMappingParts::Index(&[index]))
            .body(json!({ "_meta": { INDEX_VERSION_META: version } }))
            .send()
            .await
            .map_err(|e| transport_error("set index version", index, e))?;
        ensure_success("set index version", index, response).await?;
        Ok(())
    }

    async fn index_version(&self, index: &str) -> SearchIndexResult<Option<i32>> {
        let response = self
            .client()
            .indices()
            .get_mapping(IndicesGetMappingParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| transport_error("get mapping", index, e))?;
        let body = read_json("get mapping", index, response).await?;

        let version = body
            .as_object()
            .and_then(|indices| indices.values().next())
            .and_then(|i| i.get("mappings"))
            .and_then(|m| m.get("_meta"))
            .and_then(|m| m.get(INDEX_VERSION_META))
            .and_then(|v| v.as_i64())
            .and_then(|v| i32::try_from(v).ok());
        Ok(version)
    }

    async fn upsert(
        &self,
        index: &str,
        documents: &[(String, Document)],
        mode: DataChangeProcessingMode,
    ) -> SearchIndexResult<()> {
        if documents.is_empty() {
            return Ok(());
        }
        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(documents.len() * 2);
        for (id, document) in documents {
            body.push(json!({ "index": { "_id": id } }).into());
            body.push(Value::Object(document.clone()).into());
        }
        self.bulk("index documents", index, body, mode).await
    }

    async fn delete(
        &self,
        index: &str,
        ids: &[String],
        mode: DataChangeProcessingMode,
    ) -> SearchIndexResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let body: Vec<JsonBody<Value>> = ids
            .iter()
            .map(|id| json!({ "delete": { "_id": id } }).into())
            .collect();
        self.bulk("delete documents", index, body, mode).await
    }

    async fn delete_by_query(
        &self,
        index: &str,
        query: &EngineQuery,
        mode: DataChangeProcessingMode,
    ) -> SearchIndexResult<u64> {
        let blocking = mode.is_blocking();
        let response = self
            .client()
            .delete_by_query(DeleteByQueryParts::Index(&[index]))
            .conflicts(Conflicts::Proceed)
            .refresh(blocking)
            .wait_for_completion(blocking)
            .body(build_delete_body(query))
            .send()
            .await
            .map_err(|e| transport_error("delete by query", index, e))?;
        let body = read_json("delete by query", index, response).await?;

        if !blocking {
            tracing::debug!(
                index = %index,
                task = ?body.get("task"),
                "delete by query running in background"
            );
            return Ok(0);
        }
        Ok(body.get("deleted").and_then(|d| d.as_u64()).unwrap_or(0))
    }

    async fn get(&self, index: &str, id: &str) -> SearchIndexResult<Option<Document>> {
        let response = self
            .client()
            .get(GetParts::IndexId(index, id))
            .send()
            .await
            .map_err(|e| transport_error("get document", index, e))?;

        if response.status_code().as_u16() == 404 {
            return Ok(None);
        }
        let body = read_json("get document", index, response).await?;

        if !body.get("found").and_then(|f| f.as_bool()).unwrap_or(false) {
            return Ok(None);
        }
        Ok(body.get("_source").and_then(|s| s.as_object()).cloned())
    }

    async fn search(&self, index: &str, request: &SearchRequest) -> SearchIndexResult<SearchResponse> {
        let body = build_search_body(request);
        tracing::trace!(index = %index, body = %body, "search request");

        let response = self
            .client()
            .search(SearchParts::Index(&[index]))
            .body(body)
            .send()
            .await
            .map_err(|e| transport_error("search", index, e))?;
        let body = read_json("search", index, response).await?;

        Ok(parse_search_response(&body))
    }

    async fn suggest(
        &self,
        index: &str,
        expressions: &[SuggestExpression],
        mapping: &MappingConfiguration,
    ) -> SearchIndexResult<SuggestResult> {
        let response = self
            .client()
            .search(SearchParts::Index(&[index]))
            .body(build_suggest_body(mapping, expressions))
            .send()
            .await
            .map_err(|e| transport_error("suggest", index, e))?;
        let body = read_json("suggest", index, response).await?;

        Ok(parse_suggest_response(&body, expressions))
    }

    async fn refresh(&self, index: &str) -> SearchIndexResult<()> {
        let response = self
            .client()
            .indices()
            .refresh(IndicesRefreshParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| transport_error("refresh", index, e))?;
        ensure_success("refresh", index, response).await?;
        Ok(())
    }
}
