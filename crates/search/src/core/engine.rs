//! The search engine boundary.
//!
//! [`SearchEngine`] is everything the facades need from the external engine:
//! index and alias administration, document writes and reads, queries and
//! suggestions. Backends translate the backend-agnostic requests defined here
//! into their own protocol.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::config::IndexSettings;
use crate::error::SearchIndexResult;
use crate::expression::{Expression, SuggestExpression};
use crate::types::{
    DataChangeProcessingMode, Document, ElasticsearchInfo, InnerHitsOption, MappingConfiguration,
    SearchHitDto, SortOption, SuggestResult,
};

/// An optimized expression with what is needed to translate it.
#[derive(Debug, Clone)]
pub struct EngineQuery {
    /// The optimized expression to evaluate.
    pub expression: Expression,
    /// Language used for multilingual fields.
    pub language: Option<String>,
    /// Field configuration at the time of the request.
    pub mapping: MappingConfiguration,
}

impl EngineQuery {
    /// Creates a query.
    pub fn new(expression: Expression, language: Option<String>, mapping: MappingConfiguration) -> Self {
        Self {
            expression,
            language,
            mapping,
        }
    }

    /// Resolves a field name for matching, honoring the query language.
    pub fn field_name(&self, path: &str) -> String {
        self.mapping.resolve_field_name(path, self.language.as_deref())
    }

    /// Returns the nested relation that `expression` must be evaluated in.
    ///
    /// A field condition on `relation.field` lives in `relation`; an AND/OR
    /// lives in a relation when all its operands do, so they are matched
    /// against the same nested document. Negations and fulltext queries
    /// never do, which keeps `NOT` meaning "no nested document matches".
    pub fn nested_scope<'e>(&self, expression: &'e Expression) -> Option<&'e str> {
        match expression {
            Expression::Value(expr) => self.mapping.nested_relation(expr.name()?),
            Expression::In(expr) => self.mapping.nested_relation(expr.name()),
            Expression::Range(expr) => self.mapping.nested_relation(expr.name()),
            Expression::IsNull(expr) => self.mapping.nested_relation(expr.name()),
            Expression::Operation(op) => {
                let mut scopes = op.operands().iter().map(|o| self.nested_scope(o));
                let first = scopes.next()??;
                scopes.all(|s| s == Some(first)).then_some(first)
            }
            Expression::MustNot(_) | Expression::Fulltext(_) | Expression::FindAll => None,
        }
    }
}

/// A paged search against one index.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// What to match.
    pub query: EngineQuery,
    /// Offset of the first hit.
    pub from: u32,
    /// Number of hits to return.
    pub size: u32,
    /// Sort options, applied in order.
    pub sort: Vec<SortOption>,
    /// Nested relations to return inner hits for.
    pub inner_hits: Vec<InnerHitsOption>,
    /// Attributes to return (empty = all).
    pub fields_to_resolve: Vec<String>,
}

/// Hits and total count of a search.
#[derive(Debug, Clone, Default)]
pub struct SearchResponse {
    /// Hits in engine order, inner hits attached.
    pub hits: Vec<SearchHitDto>,
    /// Number of matching documents.
    pub total: u64,
    /// Whether `total` is exact or a lower bound.
    pub exact_total: bool,
}

/// An external search engine.
///
/// Index names passed to document and query operations are physical index
/// names; alias resolution is the caller's job.
#[async_trait]
pub trait SearchEngine: Send + Sync + Debug {
    /// Returns a short name for logs and errors.
    fn name(&self) -> &'static str;

    /// Returns client and server version information.
    async fn info(&self) -> SearchIndexResult<ElasticsearchInfo>;

    /// Creates an empty index with the given settings and field mapping.
    async fn create_index(
        &self,
        index: &str,
        settings: &IndexSettings,
        mapping: &MappingConfiguration,
    ) -> SearchIndexResult<()>;

    /// Deletes an index and any aliases pointing at it.
    async fn delete_index(&self, index: &str) -> SearchIndexResult<()>;

    /// Returns `true` if the index exists.
    async fn index_exists(&self, index: &str) -> SearchIndexResult<bool>;

    /// Returns the index the alias points at, if any.
    async fn resolve_alias(&self, alias: &str) -> SearchIndexResult<Option<String>>;

    /// Points the alias at `to`, removing it from `from` in the same step.
    async fn switch_alias(&self, alias: &str, from: Option<&str>, to: &str) -> SearchIndexResult<()>;

    /// Removes the alias from `index`.
    async fn remove_alias(&self, alias: &str, index: &str) -> SearchIndexResult<()>;

    /// Adds the fields of `mapping` to the index mapping.
    async fn put_mapping(&self, index: &str, mapping: &MappingConfiguration) -> SearchIndexResult<()>;

    /// Stores the version number in the index metadata.
    async fn set_index_version(&self, index: &str, version: i32) -> SearchIndexResult<()>;

    /// Reads the version number from the index metadata.
    async fn index_version(&self, index: &str) -> SearchIndexResult<Option<i32>>;

    /// Inserts or replaces documents by id.
    async fn upsert(
        &self,
        index: &str,
        documents: &[(String, Document)],
        mode: DataChangeProcessingMode,
    ) -> SearchIndexResult<()>;

    /// Deletes documents by id; unknown ids are ignored.
    async fn delete(
        &self,
        index: &str,
        ids: &[String],
        mode: DataChangeProcessingMode,
    ) -> SearchIndexResult<()>;

    /// Deletes every document matching the query and returns how many were deleted.
    ///
    /// In background mode the count may be 0 because the deletion has not run yet.
    async fn delete_by_query(
        &self,
        index: &str,
        query: &EngineQuery,
        mode: DataChangeProcessingMode,
    ) -> SearchIndexResult<u64>;

    /// Returns the document with the given id, if it exists.
    async fn get(&self, index: &str, id: &str) -> SearchIndexResult<Option<Document>>;

    /// Executes a search.
    async fn search(&self, index: &str, request: &SearchRequest) -> SearchIndexResult<SearchResponse>;

    /// Returns completion candidates for each suggest expression.
    async fn suggest(
        &self,
        index: &str,
        expressions: &[SuggestExpression],
        mapping: &MappingConfiguration,
    ) -> SearchIndexResult<SuggestResult>;

    /// Makes all accepted writes visible to search.
    async fn refresh(&self, index: &str) -> SearchIndexResult<()>;
}
