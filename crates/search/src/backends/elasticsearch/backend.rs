//! Elasticsearch client construction and configuration.

use std::fmt::Debug;
use std::time::Duration;

use elasticsearch::Elasticsearch;
use elasticsearch::auth::Credentials;
use elasticsearch::cert::CertificateValidation;
use elasticsearch::http::response::Response;
use elasticsearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BackendError, SearchIndexError, SearchIndexResult};

pub(crate) const BACKEND_NAME: &str = "elasticsearch";

/// Authentication configuration for Elasticsearch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ElasticsearchAuth {
    /// Basic username/password authentication.
    Basic {
        /// The username for basic auth.
        username: String,
        /// The password for basic auth.
        password: String,
    },
    /// Bearer token authentication.
    Bearer {
        /// The bearer token.
        token: String,
    },
}

/// Connection settings for the Elasticsearch engine.
///
/// Index settings (shards, replicas, result window) belong to the index
/// preset, not to the connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticsearchConfig {
    /// Elasticsearch node URLs (e.g., `["http://localhost:9200"]`).
    /// Currently uses the first node (single-node connection pool).
    pub nodes: Vec<String>,

    /// Request timeout in milliseconds (default: 30000).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Optional authentication.
    #[serde(default)]
    pub auth: Option<ElasticsearchAuth>,

    /// Whether to disable certificate validation (default: false).
    /// Only use for development/testing.
    #[serde(default)]
    pub disable_certificate_validation: bool,
}

fn default_request_timeout_ms() -> u64 {
    30000
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            nodes: vec!["http://localhost:9200".to_string()],
            request_timeout_ms: default_request_timeout_ms(),
            auth: None,
            disable_certificate_validation: false,
        }
    }
}

impl ElasticsearchConfig {
    /// Creates a configuration for a single node.
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            nodes: vec![node.into()],
            ..Default::default()
        }
    }

    /// Sets basic authentication.
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(ElasticsearchAuth::Basic {
            username: username.into(),
            password: password.into(),
        });
        self
    }
}

/// [`SearchEngine`](crate::core::SearchEngine) backed by an Elasticsearch cluster.
pub struct ElasticsearchEngine {
    client: Elasticsearch,
    config: ElasticsearchConfig,
}

impl Debug for ElasticsearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticsearchEngine")
            .field("nodes", &self.config.nodes)
            .field("request_timeout_ms", &self.config.request_timeout_ms)
            .finish_non_exhaustive()
    }
}

impl ElasticsearchEngine {
    /// Creates an engine with the given configuration.
    ///
    /// No request is sent; an unreachable cluster surfaces on first use.
    pub fn new(config: ElasticsearchConfig) -> SearchIndexResult<Self> {
        let client = Self::build_client(&config)?;
        Ok(Self { client, config })
    }

    /// Wraps an already configured client.
    pub fn with_client(client: Elasticsearch, config: ElasticsearchConfig) -> Self {
        Self { client, config }
    }

    fn build_client(config: &ElasticsearchConfig) -> SearchIndexResult<Elasticsearch> {
        let url = config
            .nodes
            .first()
            .cloned()
            .unwrap_or_else(|| "http://localhost:9200".to_string());

        let parsed_url: elasticsearch::http::Url = url.parse().map_err(|e| {
            SearchIndexError::Backend(BackendError::ConnectionFailed {
                backend_name: BACKEND_NAME.to_string(),
                message: format!("Invalid URL: {}", e),
            })
        })?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);

        let mut builder = TransportBuilder::new(conn_pool)
            .timeout(Duration::from_millis(config.request_timeout_ms));

        if config.disable_certificate_validation {
            builder = builder.cert_validation(CertificateValidation::None);
        }

        if let Some(ref auth) = config.auth {
            builder = match auth {
                ElasticsearchAuth::Basic { username, password } => {
                    builder.auth(Credentials::Basic(username.clone(), password.clone()))
                }
                ElasticsearchAuth::Bearer { token } => {
                    builder.auth(Credentials::Bearer(token.clone()))
                }
            };
        }

        let transport = builder.build().map_err(|e| {
            SearchIndexError::Backend(BackendError::ConnectionFailed {
                backend_name: BACKEND_NAME.to_string(),
                message: format!("Failed to build transport: {}", e),
            })
        })?;

        Ok(Elasticsearch::new(transport))
    }

    /// Returns the Elasticsearch client.
    pub fn client(&self) -> &Elasticsearch {
        &self.client
    }

    /// Returns the connection configuration.
    pub fn config(&self) -> &ElasticsearchConfig {
        &self.config
    }
}

/// Maps a transport error to a request error.
pub(crate) fn transport_error(operation: &str, index: &str, error: elasticsearch::Error) -> SearchIndexError {
    SearchIndexError::Backend(BackendError::Request {
        backend_name: BACKEND_NAME.to_string(),
        operation: operation.to_string(),
        index: index.to_string(),
        message: error.to_string(),
        source: Some(Box::new(error)),
    })
}

/// Fails with the response body unless the status is a success.
pub(crate) async fn ensure_success(
    operation: &str,
    index: &str,
    response: Response,
) -> SearchIndexResult<Response> {
    let status = response.status_code();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(BackendError::request(
        BACKEND_NAME,
        operation,
        index,
        format!("status {}: {}", status, body),
    )
    .into())
}

/// Reads a successful response body as JSON.
pub(crate) async fn read_json(operation: &str, index: &str, response: Response) -> SearchIndexResult<Value> {
    let response = ensure_success(operation, index, response).await?;
    response.json::<Value>().await.map_err(|e| {
        SearchIndexError::Backend(BackendError::UnexpectedResponse {
            backend_name: BACKEND_NAME.to_string(),
            operation: operation.to_string(),
            message: format!("Failed to parse response: {}", e),
        })
    })
}
