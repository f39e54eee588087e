//! Alias binding state.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{Mutex, MutexGuard};

/// What is known about the index an alias points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasBinding {
    /// Not resolved yet; ask the engine.
    Unknown,
    /// No index is bound.
    Unbound,
    /// Bound to the named physical index.
    Bound(String),
}

#[derive(Debug)]
struct Slot {
    // bumped on every change
    epoch: u64,
    binding: AliasBinding,
}

#[derive(Debug)]
struct Inner {
    alias: String,
    slot: RwLock<Slot>,
    writer: Mutex<()>,
}

/// Shared, concurrency-safe view of one alias binding.
///
/// Readers always see a complete binding. Writers that change the binding
/// (index creation and deletion) hold [`lock_writes`](Self::lock_writes) so
/// they run one at a time. Lookups that raced a writer are detected with
/// [`snapshot`](Self::snapshot) and [`store_resolved`](Self::store_resolved)
/// and never overwrite the writer's binding. Clones share state; create a
/// new handle for an independent binding.
#[derive(Debug, Clone)]
pub struct AliasState {
    inner: Arc<Inner>,
}

impl AliasState {
    /// Creates an unresolved binding for `alias`.
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                alias: alias.into(),
                slot: RwLock::new(Slot {
                    epoch: 0,
                    binding: AliasBinding::Unknown,
                }),
                writer: Mutex::new(()),
            }),
        }
    }

    /// Returns the alias name.
    pub fn alias(&self) -> &str {
        &self.inner.alias
    }

    /// Returns the current binding.
    pub fn binding(&self) -> AliasBinding {
        self.inner.slot.read().binding.clone()
    }

    /// Returns the current binding with the epoch it was set in.
    pub fn snapshot(&self) -> (u64, AliasBinding) {
        let slot = self.inner.slot.read();
        (slot.epoch, slot.binding.clone())
    }

    /// Records that the alias points at `index`.
    pub fn bind(&self, index: impl Into<String>) {
        self.set(AliasBinding::Bound(index.into()));
    }

    /// Records that no index is bound.
    pub fn unbind(&self) {
        self.set(AliasBinding::Unbound);
    }

    /// Forgets the binding so the next read asks the engine.
    pub fn forget(&self) {
        self.set(AliasBinding::Unknown);
    }

    /// Forgets the binding if it still points at `index`.
    pub fn forget_if_bound_to(&self, index: &str) {
        let mut slot = self.inner.slot.write();
        if matches!(&slot.binding, AliasBinding::Bound(bound) if bound == index) {
            slot.epoch += 1;
            slot.binding = AliasBinding::Unknown;
        }
    }

    /// Stores a binding looked up from the engine, unless the binding changed
    /// since `epoch`. Returns the binding in effect afterwards.
    pub fn store_resolved(&self, epoch: u64, resolved: AliasBinding) -> AliasBinding {
        let mut slot = self.inner.slot.write();
        if slot.epoch == epoch {
            slot.epoch += 1;
            slot.binding = resolved;
        }
        slot.binding.clone()
    }

    fn set(&self, binding: AliasBinding) {
        let mut slot = self.inner.slot.write();
        slot.epoch += 1;
        slot.binding = binding;
    }

    /// Serializes binding changes. Hold the guard for the whole change.
    pub async fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.inner.writer.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_transitions() {
        let state = AliasState::new("pictures");
        assert_eq!(state.alias(), "pictures");
        assert_eq!(state.binding(), AliasBinding::Unknown);

        state.bind("pictures-1");
        assert_eq!(state.binding(), AliasBinding::Bound("pictures-1".to_string()));

        state.unbind();
        assert_eq!(state.binding(), AliasBinding::Unbound);

        state.forget();
        assert_eq!(state.binding(), AliasBinding::Unknown);
    }

    #[test]
    fn test_stale_lookup_does_not_overwrite_binding() {
        let state = AliasState::new("pictures");
        let (epoch, _) = state.snapshot();

        // a writer binds while the lookup is in flight
        state.bind("pictures-2");
        let effective = state.store_resolved(epoch, AliasBinding::Unbound);

        assert_eq!(effective, AliasBinding::Bound("pictures-2".to_string()));
        assert_eq!(state.binding(), AliasBinding::Bound("pictures-2".to_string()));

        let (epoch, _) = state.snapshot();
        let effective = state.store_resolved(epoch, AliasBinding::Bound("pictures-3".to_string()));
        assert_eq!(effective, AliasBinding::Bound("pictures-3".to_string()));
    }

    #[test]
    fn test_forget_if_bound_to() {
        let state = AliasState::new("pictures");
        state.bind("pictures-2");

        state.forget_if_bound_to("pictures-1");
        assert_eq!(state.binding(), AliasBinding::Bound("pictures-2".to_string()));

        state.forget_if_bound_to("pictures-2");
        assert_eq!(state.binding(), AliasBinding::Unknown);
    }

    #[test]
    fn test_clones_share_state_and_new_handles_do_not() {
        let a = AliasState::new("pictures");
        let b = a.clone();
        let c = AliasState::new("pictures");
        a.bind("pictures-1");
        assert_eq!(b.binding(), AliasBinding::Bound("pictures-1".to_string()));
        assert_eq!(c.binding(), AliasBinding::Unknown);
    }

    #[tokio::test]
    async fn test_writers_are_serialized() {
        let state = AliasState::new("pictures");
        let guard = state.lock_writes().await;
        let other = state.clone();
        let waiter = tokio::spawn(async move {
            let _guard = other.lock_writes().await;
            other.bind("pictures-2");
        });
        tokio::task::yield_now().await;
        assert_eq!(state.binding(), AliasBinding::Unknown);
        drop(guard);
        waiter.await.unwrap();
        assert_eq!(state.binding(), AliasBinding::Bound("pictures-2".to_string()));
    }
}
