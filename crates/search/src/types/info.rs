use serde::{Deserialize, Serialize};

/// Version information about the client and the engine it talks to.
///
/// Values are exposed as reported; nothing is interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElasticsearchInfo {
    /// Version of the client library.
    pub client_version: String,
    /// Version reported by the engine.
    pub server_version: String,
    /// Cluster name reported by the engine.
    pub cluster_name: Option<String>,
}
