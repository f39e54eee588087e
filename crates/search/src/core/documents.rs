//! Document writes and reads against the live index.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::SearchIndexResult;
use crate::expression::Expression;
use crate::timing::{DiagnosticSink, watch_async};
use crate::types::{
    DataChangeProcessingMode, Document, IndexObject, document_id, from_document, to_document,
};

use super::engine::{EngineQuery, SearchEngine};
use super::lifecycle::IndexLifecycle;

/// Adds, removes and fetches documents in the index behind an alias.
///
/// Every write takes a [`DataChangeProcessingMode`]. Identifiers are checked
/// before anything is sent, and a batch is rejected as a whole if one of its
/// documents has no usable identifier.
#[derive(Debug, Clone)]
pub struct DocumentService {
    engine: Arc<dyn SearchEngine>,
    lifecycle: IndexLifecycle,
    sink: Arc<dyn DiagnosticSink>,
}

impl DocumentService {
    /// Creates a document service.
    pub fn new(
        engine: Arc<dyn SearchEngine>,
        lifecycle: IndexLifecycle,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            engine,
            lifecycle,
            sink,
        }
    }

    /// Adds or replaces one document. The id is taken from its `id` field.
    pub async fn add_document(
        &self,
        mode: DataChangeProcessingMode,
        document: Document,
    ) -> SearchIndexResult<()> {
        let id = document_id(&document)?;
        let batch = [(id.clone(), document)];
        let (engine, batch) = (&self.engine, &batch);
        let index = self
            .lifecycle
            .with_live_index(move |index| async move {
                let written = engine.upsert(&index, batch, mode).await;
                written.map(|()| index)
            })
            .await?;
        debug!(index = %index, id = %id, mode = ?mode, "added document");
        Ok(())
    }

    /// Adds or replaces several documents.
    pub async fn add_documents(
        &self,
        mode: DataChangeProcessingMode,
        documents: Vec<Document>,
    ) -> SearchIndexResult<()> {
        let batch = documents
            .into_iter()
            .map(|document| Ok((document_id(&document)?, document)))
            .collect::<SearchIndexResult<Vec<_>>>()?;
        self.write_batch(mode, batch).await
    }

    /// Adds or replaces a typed object under its own id.
    pub async fn add_object<T: IndexObject>(
        &self,
        mode: DataChangeProcessingMode,
        object: &T,
    ) -> SearchIndexResult<()> {
        self.add_document(mode, to_document(object, None)?).await
    }

    /// Adds or replaces a typed object under `id`, ignoring the object's own id.
    pub async fn add_object_with_id<T: IndexObject>(
        &self,
        mode: DataChangeProcessingMode,
        object: &T,
        id: &str,
    ) -> SearchIndexResult<()> {
        self.add_document(mode, to_document(object, Some(id))?).await
    }

    /// Adds or replaces several typed objects under their own ids.
    pub async fn add_objects<T: IndexObject>(
        &self,
        mode: DataChangeProcessingMode,
        objects: &[T],
    ) -> SearchIndexResult<()> {
        let batch = objects
            .iter()
            .map(|object| {
                let document = to_document(object, None)?;
                Ok((document_id(&document)?, document))
            })
            .collect::<SearchIndexResult<Vec<_>>>()?;
        self.write_batch(mode, batch).await
    }

    /// Removes one document. Unknown ids are ignored.
    pub async fn remove_document(
        &self,
        mode: DataChangeProcessingMode,
        id: &str,
    ) -> SearchIndexResult<()> {
        self.remove_documents(mode, &[id.to_string()]).await
    }

    /// Removes several documents. Unknown ids are ignored.
    pub async fn remove_documents(
        &self,
        mode: DataChangeProcessingMode,
        ids: &[String],
    ) -> SearchIndexResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let engine = &self.engine;
        let index = self
            .lifecycle
            .with_live_index(move |index| async move {
                let deleted = engine.delete(&index, ids, mode).await;
                deleted.map(|()| index)
            })
            .await?;
        debug!(index = %index, count = ids.len(), mode = ?mode, "removed documents");
        Ok(())
    }

    /// Removes every document matching `expression`, evaluated for `locale`.
    ///
    /// Returns the number of deleted documents. An expression that optimizes
    /// away deletes nothing.
    pub async fn remove_by_expression(
        &self,
        mode: DataChangeProcessingMode,
        expression: Expression,
        locale: Option<&str>,
    ) -> SearchIndexResult<u64> {
        expression.validate()?;
        let Some(optimized) = expression.optimize() else {
            let index = self.lifecycle.live_index().await?;
            debug!(index = %index, "expression optimized away, nothing to remove");
            return Ok(0);
        };

        let query = EngineQuery::new(
            optimized,
            locale.map(str::to_string),
            self.lifecycle.mapping(),
        );
        let (engine, query_ref) = (&self.engine, &query);
        let (deleted, elapsed) = watch_async(
            "remove by expression",
            self.sink.as_ref(),
            self.lifecycle.with_live_index(move |index| async move {
                let deleted = engine.delete_by_query(&index, query_ref, mode).await;
                deleted.map(|deleted| (index, deleted))
            }),
        )
        .await
        .into_parts();
        let (index, deleted) = deleted?;
        info!(
            index = %index,
            expression = %query.expression,
            deleted,
            elapsed_ms = elapsed.as_millis() as u64,
            "removed documents by expression"
        );
        Ok(deleted)
    }

    /// Returns the document with `id`, or `None` if there is none.
    pub async fn get_document(&self, id: &str) -> SearchIndexResult<Option<Document>> {
        let engine = &self.engine;
        self.lifecycle
            .with_live_index(move |index| async move { engine.get(&index, id).await })
            .await
    }

    /// Returns the document with `id` mapped onto `T`, or `None` if there is none.
    pub async fn get_object<T: IndexObject>(&self, id: &str) -> SearchIndexResult<Option<T>> {
        match self.get_document(id).await? {
            Some(document) => from_document(id, document).map(Some),
            None => Ok(None),
        }
    }

    async fn write_batch(
        &self,
        mode: DataChangeProcessingMode,
        batch: Vec<(String, Document)>,
    ) -> SearchIndexResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let count = batch.len();
        let (engine, batch) = (&self.engine, &batch);
        let (written, elapsed) = watch_async(
            "add documents",
            self.sink.as_ref(),
            self.lifecycle.with_live_index(move |index| async move {
                let written = engine.upsert(&index, batch, mode).await;
                written.map(|()| index)
            }),
        )
        .await
        .into_parts();
        let index = written?;
        debug!(
            index = %index,
            count,
            mode = ?mode,
            elapsed_ms = elapsed.as_millis() as u64,
            "added documents"
        );
        Ok(())
    }
}
