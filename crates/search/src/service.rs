//! One handle for everything that happens behind a single index alias.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::account::{AccountContext, QueryAugmenter};
use crate::config::IndexPresetConfiguration;
use crate::core::{AliasState, DocumentService, IndexLifecycle, SearchEngine, SearchService};
use crate::error::SearchIndexResult;
use crate::expression::{Expression, SuggestExpression};
use crate::timing::{DiagnosticSink, TracingSink};
use crate::types::{
    DataChangeProcessingMode, Document, ElasticsearchInfo, FieldConfiguration, IndexObject,
    MappingConfiguration, SearchParameter, SearchResult, SuggestResult,
};

/// Index lifecycle, documents and search over one alias.
///
/// The three facades share the engine, the alias binding, the field mapping
/// and the diagnostic sink, so a field added through
/// [`add_field_configuration`](Self::add_field_configuration) is visible to
/// the next search. Cloning is cheap and clones share all state.
///
/// ```
/// use std::sync::Arc;
/// use sift_search::backends::memory::MemorySearchEngine;
/// use sift_search::config::IndexPresetConfiguration;
/// use sift_search::service::SingleIndexService;
///
/// let service = SingleIndexService::builder(
///     Arc::new(MemorySearchEngine::new()),
///     IndexPresetConfiguration::new("hotels"),
/// )
/// .build();
/// assert_eq!(service.index_alias(), "hotels");
/// ```
#[derive(Debug, Clone)]
pub struct SingleIndexService {
    engine: Arc<dyn SearchEngine>,
    lifecycle: IndexLifecycle,
    documents: DocumentService,
    search: SearchService,
}

impl SingleIndexService {
    /// Creates a service with the default sink and no augmenter.
    pub fn new(
        engine: Arc<dyn SearchEngine>,
        preset: IndexPresetConfiguration,
        mapping: MappingConfiguration,
    ) -> Self {
        Self::builder(engine, preset).mapping(mapping).build()
    }

    /// Starts a builder.
    pub fn builder(
        engine: Arc<dyn SearchEngine>,
        preset: IndexPresetConfiguration,
    ) -> SingleIndexServiceBuilder {
        SingleIndexServiceBuilder::new(engine, preset)
    }

    /// Returns the lifecycle facade.
    pub fn lifecycle(&self) -> &IndexLifecycle {
        &self.lifecycle
    }

    /// Returns the document facade.
    pub fn documents(&self) -> &DocumentService {
        &self.documents
    }

    /// Returns the search facade.
    pub fn search_service(&self) -> &SearchService {
        &self.search
    }

    /// Returns client and server version information.
    pub async fn engine_info(&self) -> SearchIndexResult<ElasticsearchInfo> {
        self.engine.info().await
    }

    // Index lifecycle

    /// Returns the alias.
    pub fn index_alias(&self) -> &str {
        self.lifecycle.index_alias()
    }

    /// Returns the physical index the alias is bound to.
    pub async fn index_name(&self) -> SearchIndexResult<String> {
        self.lifecycle.index_name().await
    }

    /// Creates a new index and points the alias at it.
    pub async fn create_index_with_alias(&self) -> SearchIndexResult<String> {
        self.lifecycle.create_index_with_alias().await
    }

    /// Deletes the bound index and its alias.
    pub async fn delete_index_with_alias(&self) -> SearchIndexResult<()> {
        self.lifecycle.delete_index_with_alias().await
    }

    /// Stores a version number on the bound index.
    pub async fn set_index_version(&self, version: i32) -> SearchIndexResult<()> {
        self.lifecycle.set_index_version(version).await
    }

    /// Reads the version number of the bound index.
    pub async fn index_version(&self) -> SearchIndexResult<Option<i32>> {
        self.lifecycle.index_version().await
    }

    /// Adds field configurations to the mapping.
    pub async fn add_field_configuration(&self, fields: &[FieldConfiguration]) -> SearchIndexResult<()> {
        self.lifecycle.add_field_configuration(fields).await
    }

    /// Makes all accepted writes visible to search.
    pub async fn refresh(&self) -> SearchIndexResult<()> {
        self.lifecycle.refresh().await
    }

    // Documents

    /// Adds or replaces one document.
    pub async fn add_document(&self, mode: DataChangeProcessingMode, document: Document) -> SearchIndexResult<()> {
        self.documents.add_document(mode, document).await
    }

    /// Adds or replaces several documents.
    pub async fn add_documents(
        &self,
        mode: DataChangeProcessingMode,
        documents: Vec<Document>,
    ) -> SearchIndexResult<()> {
        self.documents.add_documents(mode, documents).await
    }

    /// Adds or replaces a typed object under its own id.
    pub async fn add_object<T: IndexObject>(&self, mode: DataChangeProcessingMode, object: &T) -> SearchIndexResult<()> {
        self.documents.add_object(mode, object).await
    }

    /// Adds or replaces a typed object under `id`.
    pub async fn add_object_with_id<T: IndexObject>(
        &self,
        mode: DataChangeProcessingMode,
        object: &T,
        id: &str,
    ) -> SearchIndexResult<()> {
        self.documents.add_object_with_id(mode, object, id).await
    }

    /// Adds or replaces several typed objects.
    pub async fn add_objects<T: IndexObject>(
        &self,
        mode: DataChangeProcessingMode,
        objects: &[T],
    ) -> SearchIndexResult<()> {
        self.documents.add_objects(mode, objects).await
    }

    /// Removes one document.
    pub async fn remove_document(&self, mode: DataChangeProcessingMode, id: &str) -> SearchIndexResult<()> {
        self.documents.remove_document(mode, id).await
    }

    /// Removes several documents.
    pub async fn remove_documents(&self, mode: DataChangeProcessingMode, ids: &[String]) -> SearchIndexResult<()> {
        self.documents.remove_documents(mode, ids).await
    }

    /// Removes every document matching `expression` and returns how many went.
    pub async fn remove_by_expression(
        &self,
        mode: DataChangeProcessingMode,
        expression: Expression,
        locale: Option<&str>,
    ) -> SearchIndexResult<u64> {
        self.documents.remove_by_expression(mode, expression, locale).await
    }

    /// Returns the document with `id`, if any.
    pub async fn get_document(&self, id: &str) -> SearchIndexResult<Option<Document>> {
        self.documents.get_document(id).await
    }

    /// Returns the document with `id` mapped onto `T`, if any.
    pub async fn get_object<T: IndexObject>(&self, id: &str) -> SearchIndexResult<Option<T>> {
        self.documents.get_object(id).await
    }

    // Search

    /// Searches with the given parameters.
    pub async fn search(&self, expression: Expression, parameters: &SearchParameter) -> SearchIndexResult<SearchResult> {
        self.search.search(expression, parameters).await
    }

    /// Searches on behalf of an account.
    pub async fn search_with_account(
        &self,
        account: &AccountContext,
        expression: Expression,
        parameters: &SearchParameter,
    ) -> SearchIndexResult<SearchResult> {
        self.search.search_with_account(account, expression, parameters).await
    }

    /// Returns completion candidates for each suggest expression.
    pub async fn suggest(&self, expressions: &[SuggestExpression]) -> SearchIndexResult<SuggestResult> {
        self.search.suggest(expressions).await
    }
}

/// Builder for [`SingleIndexService`].
pub struct SingleIndexServiceBuilder {
    engine: Arc<dyn SearchEngine>,
    preset: IndexPresetConfiguration,
    mapping: MappingConfiguration,
    sink: Option<Arc<dyn DiagnosticSink>>,
    augmenter: Option<Arc<dyn QueryAugmenter>>,
}

impl SingleIndexServiceBuilder {
    /// Creates a builder with an empty mapping.
    pub fn new(engine: Arc<dyn SearchEngine>, preset: IndexPresetConfiguration) -> Self {
        Self {
            engine,
            preset,
            mapping: MappingConfiguration::default(),
            sink: None,
            augmenter: None,
        }
    }

    /// Sets the initial field mapping.
    pub fn mapping(mut self, mapping: MappingConfiguration) -> Self {
        self.mapping = mapping;
        self
    }

    /// Sets the sink that receives timing records (default: [`TracingSink`]).
    pub fn sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Sets the augmenter used for account searches.
    pub fn augmenter(mut self, augmenter: Arc<dyn QueryAugmenter>) -> Self {
        self.augmenter = Some(augmenter);
        self
    }

    /// Builds the service. No engine call is made.
    pub fn build(self) -> SingleIndexService {
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingSink));
        let state = AliasState::new(self.preset.index_alias.clone());
        let mapping = Arc::new(RwLock::new(self.mapping));

        let lifecycle = IndexLifecycle::new(
            self.engine.clone(),
            state,
            self.preset,
            mapping,
            sink.clone(),
        );
        let documents = DocumentService::new(self.engine.clone(), lifecycle.clone(), sink.clone());
        let mut search = SearchService::new(self.engine.clone(), lifecycle.clone(), sink);
        if let Some(augmenter) = self.augmenter {
            search = search.with_augmenter(augmenter);
        }

        SingleIndexService {
            engine: self.engine,
            lifecycle,
            documents,
            search,
        }
    }
}
