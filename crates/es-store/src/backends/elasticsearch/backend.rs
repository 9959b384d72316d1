//! Elasticsearch storage handle and configuration.

use std::fmt::Debug;
use std::time::Duration;

use elasticsearch::Elasticsearch;
use elasticsearch::auth::Credentials;
use elasticsearch::cert::CertificateValidation;
use elasticsearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use elasticsearch::indices::IndicesRefreshParts;
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

use super::client::{RefreshPolicy, SearchEngine};

/// Authentication configuration for Elasticsearch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
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

/// Configuration for the Elasticsearch storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElasticsearchConfig {
    /// Elasticsearch node URLs (e.g., `["http://localhost:9200"]`).
    /// Currently uses the first node (single-node connection pool).
    #[serde(default = "default_nodes")]
    pub nodes: Vec<String>,

    /// Index the items are stored in (default: `"items"`).
    #[serde(default = "default_index")]
    pub index: String,

    /// Refresh policy applied to every write (default: `false`).
    #[serde(default)]
    pub refresh: RefreshPolicy,

    /// Transport timeout (default: 30s).
    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,

    /// Number of primary shards when the index is created (default: 1).
    #[serde(default = "default_shards")]
    pub number_of_shards: u32,

    /// Number of replica shards when the index is created (default: 1).
    #[serde(default = "default_replicas")]
    pub number_of_replicas: u32,

    /// Optional authentication.
    #[serde(default)]
    pub auth: Option<ElasticsearchAuth>,

    /// Whether to disable certificate validation (default: false).
    /// Only use for development/testing.
    #[serde(default)]
    pub disable_certificate_validation: bool,
}

fn default_nodes() -> Vec<String> {
    vec!["http://localhost:9200".to_string()]
}

fn default_index() -> String {
    "items".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_shards() -> u32 {
    1
}

fn default_replicas() -> u32 {
    1
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            nodes: default_nodes(),
            index: default_index(),
            refresh: RefreshPolicy::default(),
            request_timeout: default_request_timeout(),
            number_of_shards: default_shards(),
            number_of_replicas: default_replicas(),
            auth: None,
            disable_certificate_validation: false,
        }
    }
}

/// Item storage backed by one Elasticsearch index.
///
/// The handle holds no mutable state: it can be shared across tasks, and
/// concurrent writers are arbitrated by the etag and the engine's document
/// version.
pub struct ElasticsearchStorage<C = Elasticsearch> {
    client: C,
    config: ElasticsearchConfig,
}

impl<C> Debug for ElasticsearchStorage<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticsearchStorage")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ElasticsearchStorage<Elasticsearch> {
    /// Creates a storage connected to the first configured node.
    pub fn new(config: ElasticsearchConfig) -> StorageResult<Self> {
        let client = build_client(&config)?;
        tracing::info!(
            "Elasticsearch storage created for index '{}' (refresh={:?})",
            config.index,
            config.refresh
        );
        Ok(Self { client, config })
    }

    /// Creates the index with its mapping unless it already exists.
    pub async fn ensure_index(&self) -> StorageResult<()> {
        super::schema::ensure_index(&self.client, &self.config).await
    }

    /// Refreshes the index to make recently written documents searchable.
    ///
    /// Only needed for testing; in production ES refreshes automatically.
    pub async fn refresh_index(&self) -> StorageResult<()> {
        let index = self.config.index.as_str();
        let response = self
            .client
            .indices()
            .refresh(IndicesRefreshParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| StorageError::Operation {
                operation: "refresh",
                index: index.to_string(),
                message: e.to_string(),
                source: Some(Box::new(e)),
            })?;

        let status = response.status_code();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::operation(
                "refresh",
                index,
                format!("status {}: {}", status, body),
            ));
        }
        Ok(())
    }
}

impl<C: SearchEngine> ElasticsearchStorage<C> {
    /// Creates a storage on top of an existing engine client.
    pub fn with_client(client: C, config: ElasticsearchConfig) -> Self {
        Self { client, config }
    }
}

impl<C> ElasticsearchStorage<C> {
    /// Returns the engine client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Returns the storage configuration.
    pub fn config(&self) -> &ElasticsearchConfig {
        &self.config
    }

    /// Returns the index name.
    pub fn index(&self) -> &str {
        &self.config.index
    }
}

/// Builds the Elasticsearch client from configuration.
fn build_client(config: &ElasticsearchConfig) -> StorageResult<Elasticsearch> {
    let url = config
        .nodes
        .first()
        .cloned()
        .unwrap_or_else(|| "http://localhost:9200".to_string());

    let parsed_url: elasticsearch::http::Url = url.parse().map_err(|e| {
        StorageError::operation("connect", &config.index, format!("Invalid URL '{}': {}", url, e))
    })?;

    let conn_pool = SingleNodeConnectionPool::new(parsed_url);

    let mut builder = TransportBuilder::new(conn_pool).timeout(config.request_timeout);

    if config.disable_certificate_validation {
        builder = builder.cert_validation(CertificateValidation::None);
    }

    if let Some(ref auth) = config.auth {
        builder = match auth {
            ElasticsearchAuth::Basic { username, password } => {
                builder.auth(Credentials::Basic(username.clone(), password.clone()))
            }
            ElasticsearchAuth::Bearer { token } => builder.auth(Credentials::Bearer(token.clone())),
        };
    }

    let transport = builder.build().map_err(|e| StorageError::Operation {
        operation: "connect",
        index: config.index.clone(),
        message: format!("Failed to build transport: {}", e),
        source: Some(Box::new(e)),
    })?;

    Ok(Elasticsearch::new(transport))
}

mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
