//! Search and suggest against the live index.

use std::sync::Arc;

use tracing::debug;

use crate::account::{AccountContext, QueryAugmenter};
use crate::error::{SearchIndexResult, ValidationError};
use crate::expression::{Expression, SuggestExpression};
use crate::timing::{DiagnosticSink, watch_async};
use crate::types::{SearchParameter, SearchResult, SuggestResult};

use super::engine::{EngineQuery, SearchEngine, SearchRequest};
use super::lifecycle::IndexLifecycle;

/// Executes searches and suggestions.
///
/// Expressions are validated and optimized first. An expression that
/// optimizes away matches every document.
#[derive(Debug, Clone)]
pub struct SearchService {
    engine: Arc<dyn SearchEngine>,
    lifecycle: IndexLifecycle,
    sink: Arc<dyn DiagnosticSink>,
    augmenter: Option<Arc<dyn QueryAugmenter>>,
}

impl SearchService {
    /// Creates a search service without a query augmenter.
    pub fn new(
        engine: Arc<dyn SearchEngine>,
        lifecycle: IndexLifecycle,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            engine,
            lifecycle,
            sink,
            augmenter: None,
        }
    }

    /// Sets the augmenter used by [`search_with_account`](Self::search_with_account).
    pub fn with_augmenter(mut self, augmenter: Arc<dyn QueryAugmenter>) -> Self {
        self.augmenter = Some(augmenter);
        self
    }

    /// Searches with the given parameters.
    pub async fn search(
        &self,
        expression: Expression,
        parameters: &SearchParameter,
    ) -> SearchIndexResult<SearchResult> {
        expression.validate()?;
        if parameters.page_size == 0 {
            return Err(ValidationError::InvalidSearchParameter {
                message: "page_size must be greater than 0".to_string(),
            }
            .into());
        }
        let expression = expression.optimize().unwrap_or(Expression::FindAll);
        let query = EngineQuery::new(
            expression,
            parameters.language.clone(),
            self.lifecycle.mapping(),
        );
        let (from, size) = parameters.page_window(self.lifecycle.preset().max_result_window);
        let request = if size == 0 {
            // past the result limit: only the total is fetched
            SearchRequest {
                query,
                from: 0,
                size: 0,
                sort: Vec::new(),
                inner_hits: Vec::new(),
                fields_to_resolve: Vec::new(),
            }
        } else {
            SearchRequest {
                query,
                from,
                size,
                sort: parameters.sort_options.clone(),
                inner_hits: parameters.inner_hits.clone(),
                fields_to_resolve: parameters.fields_to_resolve.clone(),
            }
        };

        let (engine, request_ref) = (&self.engine, &request);
        let (response, elapsed) = watch_async(
            "search",
            self.sink.as_ref(),
            self.lifecycle.with_live_index(move |index| async move {
                let response = engine.search(&index, request_ref).await;
                response.map(|response| (index, response))
            }),
        )
        .await
        .into_parts();
        let (index, response) = response?;
        debug!(
            index = %index,
            expression = %request.query.expression,
            total = response.total,
            returned = response.hits.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "search finished"
        );

        Ok(SearchResult::new(
            response.hits,
            parameters.page_index.max(1),
            parameters.page_size,
            response.total,
            response.exact_total,
        ))
    }

    /// Searches on behalf of an account.
    ///
    /// The configured augmenter may rewrite the expression for the account
    /// before it is optimized. Without an augmenter this is a plain search.
    pub async fn search_with_account(
        &self,
        account: &AccountContext,
        expression: Expression,
        parameters: &SearchParameter,
    ) -> SearchIndexResult<SearchResult> {
        let expression = match &self.augmenter {
            Some(augmenter) => augmenter.augment(account, expression),
            None => expression,
        };
        debug!(
            user_id = %account.user_id(),
            correlation_id = ?account.correlation_id(),
            "account search"
        );
        self.search(expression, parameters).await
    }

    /// Returns completion candidates for each suggest expression.
    pub async fn suggest(&self, expressions: &[SuggestExpression]) -> SearchIndexResult<SuggestResult> {
        if expressions.is_empty() {
            return Ok(SuggestResult::new());
        }
        let mapping = self.lifecycle.mapping();
        let (engine, mapping) = (&self.engine, &mapping);
        self.lifecycle
            .with_live_index(move |index| async move {
                engine.suggest(&index, expressions, mapping).await
            })
            .await
    }
}
