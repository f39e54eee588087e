//! Index lifecycle: alias binding, index creation and deletion, version
//! metadata and field configuration.

use std::sync::Arc;

use chrono::Utc;
use chrono::format::{Item, StrftimeItems};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::config::IndexPresetConfiguration;
use crate::error::{NotFoundError, ResolutionError, SearchIndexResult, ValidationError};
use crate::timing::{DiagnosticSink, watch_async};
use crate::types::{FieldConfiguration, MappingConfiguration};

use super::alias::{AliasBinding, AliasState};
use super::engine::SearchEngine;

/// Manages the physical index behind one alias.
#[derive(Debug, Clone)]
pub struct IndexLifecycle {
    engine: Arc<dyn SearchEngine>,
    state: AliasState,
    preset: IndexPresetConfiguration,
    mapping: Arc<RwLock<MappingConfiguration>>,
    sink: Arc<dyn DiagnosticSink>,
}

impl IndexLifecycle {
    /// Creates a lifecycle manager.
    pub fn new(
        engine: Arc<dyn SearchEngine>,
        state: AliasState,
        preset: IndexPresetConfiguration,
        mapping: Arc<RwLock<MappingConfiguration>>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            engine,
            state,
            preset,
            mapping,
            sink,
        }
    }

    /// Returns the alias.
    pub fn index_alias(&self) -> &str {
        self.state.alias()
    }

    /// Returns the preset configuration.
    pub fn preset(&self) -> &IndexPresetConfiguration {
        &self.preset
    }

    /// Returns a snapshot of the current field mapping.
    pub fn mapping(&self) -> MappingConfiguration {
        self.mapping.read().clone()
    }

    /// Returns the physical index the alias is currently bound to.
    ///
    /// Always asks the engine, so a rebind made through another handle is
    /// seen. Fails with [`ResolutionError::AliasUnbound`] if no index is bound.
    pub async fn index_name(&self) -> SearchIndexResult<String> {
        match self.resolve().await? {
            AliasBinding::Bound(name) => Ok(name),
            _ => Err(ResolutionError::AliasUnbound {
                alias: self.index_alias().to_string(),
            }
            .into()),
        }
    }

    /// Returns the physical index for document and search operations.
    ///
    /// A cached binding is used as is; anything else is resolved through the
    /// engine. An unbound alias is reported as [`NotFoundError::Index`].
    pub async fn live_index(&self) -> SearchIndexResult<String> {
        let binding = match self.state.binding() {
            AliasBinding::Bound(name) => AliasBinding::Bound(name),
            _ => self.resolve().await?,
        };
        match binding {
            AliasBinding::Bound(name) => Ok(name),
            _ => Err(NotFoundError::Index {
                alias: self.index_alias().to_string(),
            }
            .into()),
        }
    }

    /// Runs `op` against the live index.
    ///
    /// If `op` fails on a cached index that no longer exists, the alias was
    /// moved or deleted elsewhere: the binding is resolved again and `op`
    /// runs once more on the current index. With no index left the call
    /// fails with [`NotFoundError::Index`].
    pub async fn with_live_index<T, F, Fut>(&self, op: F) -> SearchIndexResult<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = SearchIndexResult<T>>,
    {
        let cached = matches!(self.state.binding(), AliasBinding::Bound(_));
        let index = self.live_index().await?;
        let error = match op(index.clone()).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        if !cached || self.engine.index_exists(&index).await.unwrap_or(true) {
            return Err(error);
        }

        self.state.forget_if_bound_to(&index);
        let current = self.live_index().await?;
        if current == index {
            return Err(NotFoundError::Index {
                alias: self.index_alias().to_string(),
            }
            .into());
        }
        debug!(alias = %self.index_alias(), stale = %index, index = %current, "alias moved, retrying");
        op(current).await
    }

    /// Creates a fresh index and binds the alias to it.
    ///
    /// The version of the previously bound index is carried over. The alias
    /// moves in a single engine step, so readers see either the old or the
    /// new index. The superseded index is deleted unless the preset keeps it.
    pub async fn create_index_with_alias(&self) -> SearchIndexResult<String> {
        let _guard = self.state.lock_writes().await;
        let alias = self.index_alias();

        let previous = self.engine.resolve_alias(alias).await?;
        let version = match &previous {
            Some(index) => self.engine.index_version(index).await?,
            None => None,
        };

        let name = self.new_index_name().await?;
        let settings = self.preset.index_settings();
        let mapping = self.mapping();
        let (created, elapsed) = watch_async(
            "create index",
            self.sink.as_ref(),
            self.engine.create_index(&name, &settings, &mapping),
        )
        .await
        .into_parts();
        created?;

        if let Err(e) = self.bind_new_index(alias, previous.as_deref(), &name, version).await {
            if let Err(cleanup) = self.engine.delete_index(&name).await {
                warn!(alias = %alias, index = %name, error = %cleanup, "failed to delete unbound new index");
            }
            return Err(e);
        }
        self.state.bind(name.clone());
        info!(
            alias = %alias,
            index = %name,
            previous = ?previous,
            elapsed_ms = elapsed.as_millis() as u64,
            "created index with alias"
        );

        if let Some(previous) = previous.filter(|_| self.preset.delete_superseded_indices) {
            if let Err(e) = self.engine.delete_index(&previous).await {
                warn!(alias = %alias, index = %previous, error = %e, "failed to delete superseded index");
            }
        }

        Ok(name)
    }

    async fn bind_new_index(
        &self,
        alias: &str,
        previous: Option<&str>,
        name: &str,
        version: Option<i32>,
    ) -> SearchIndexResult<()> {
        if let Some(version) = version {
            self.engine.set_index_version(name, version).await?;
        }
        self.engine.switch_alias(alias, previous, name).await
    }

    /// Deletes the bound index and its alias binding.
    ///
    /// Deleting an unbound alias does nothing.
    pub async fn delete_index_with_alias(&self) -> SearchIndexResult<()> {
        let _guard = self.state.lock_writes().await;
        let alias = self.index_alias();

        match self.engine.resolve_alias(alias).await? {
            Some(index) => {
                self.engine.remove_alias(alias, &index).await?;
                self.state.unbind();
                self.engine.delete_index(&index).await?;
                info!(alias = %alias, index = %index, "deleted index with alias");
            }
            None => {
                self.state.unbind();
                debug!(alias = %alias, "no index bound, nothing to delete");
            }
        }
        Ok(())
    }

    /// Stores the version number on the bound index.
    pub async fn set_index_version(&self, version: i32) -> SearchIndexResult<()> {
        let index = self.index_name().await?;
        self.engine.set_index_version(&index, version).await?;
        debug!(index = %index, version, "set index version");
        Ok(())
    }

    /// Returns the version number of the bound index, if one was set.
    pub async fn index_version(&self) -> SearchIndexResult<Option<i32>> {
        let index = self.index_name().await?;
        self.engine.index_version(&index).await
    }

    /// Adds field configurations to the mapping.
    ///
    /// Identical fields are skipped. A field whose type would change fails
    /// the whole call before the engine is contacted. New fields go to the
    /// bound index, if any, and then into the shared mapping.
    pub async fn add_field_configuration(
        &self,
        fields: &[FieldConfiguration],
    ) -> SearchIndexResult<()> {
        let (planned, languages) = {
            let mapping = self.mapping.read();
            (mapping.plan_additions(fields)?, mapping.languages.clone())
        };
        if planned.is_empty() {
            debug!(alias = %self.index_alias(), "field configuration unchanged");
            return Ok(());
        }

        let _guard = self.state.lock_writes().await;
        if let AliasBinding::Bound(index) = self.resolve().await? {
            let update = MappingConfiguration::new(planned.clone(), languages);
            self.engine.put_mapping(&index, &update).await?;
        }

        let names: Vec<String> = planned.iter().map(|f| f.name.clone()).collect();
        self.mapping.write().apply(planned);
        info!(alias = %self.index_alias(), fields = ?names, "added field configuration");
        Ok(())
    }

    /// Makes all accepted writes on the bound index visible to search.
    pub async fn refresh(&self) -> SearchIndexResult<()> {
        let engine = &self.engine;
        self.with_live_index(move |index| async move { engine.refresh(&index).await })
            .await
    }

    /// Drops the cached binding; the next read asks the engine.
    pub fn forget_binding(&self) {
        self.state.forget();
    }

    // A writer that changed the binding during the lookup wins.
    async fn resolve(&self) -> SearchIndexResult<AliasBinding> {
        let alias = self.index_alias();
        let (epoch, _) = self.state.snapshot();
        let resolved = match self.engine.resolve_alias(alias).await? {
            Some(index) => AliasBinding::Bound(index),
            None => AliasBinding::Unbound,
        };
        let binding = self.state.store_resolved(epoch, resolved);
        debug!(alias = %alias, binding = ?binding, "resolved alias");
        Ok(binding)
    }

    async fn new_index_name(&self) -> SearchIndexResult<String> {
        let items: Vec<Item<'_>> = StrftimeItems::new(&self.preset.index_name_date_format).collect();
        if items.iter().any(|item| matches!(item, Item::Error)) {
            return Err(ValidationError::InvalidConfiguration {
                message: format!(
                    "invalid index name date format '{}'",
                    self.preset.index_name_date_format
                ),
            }
            .into());
        }
        let base = format!(
            "{}-{}",
            self.preset.index_name_prefix(),
            Utc::now().format_with_items(items.iter())
        )
        .to_lowercase();

        let mut candidate = base.clone();
        let mut suffix = 1;
        while self.engine.index_exists(&candidate).await? {
            candidate = format!("{}-{}", base, suffix);
            suffix += 1;
        }
        Ok(candidate)
    }
}
