use serde::{Deserialize, Serialize};

/// Controls when a data-changing call returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DataChangeProcessingMode {
    /// Return once the change is applied and visible to search.
    #[default]
    Blocking,
    /// Return once the engine has accepted the change; visibility is eventual.
    Background,
}

impl DataChangeProcessingMode {
    /// Returns `true` for [`DataChangeProcessingMode::Blocking`].
    pub fn is_blocking(&self) -> bool {
        matches!(self, DataChangeProcessingMode::Blocking)
    }
}
