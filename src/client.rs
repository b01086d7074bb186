use crate::config::Config;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

/// The three cluster queries the scan consumes. Each call fails
/// independently and is never retried here.
pub trait ClusterApi {
    async fn probe(&self) -> Result<String, ApiError>;
    async fn list_nodes(&self) -> Result<Vec<NodeStatus>, ApiError>;
    async fn list_storage(&self, node: &str) -> Result<Vec<StorageVolume>, ApiError>;
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("token id or secret contains characters not allowed in a header")]
    InvalidToken(#[from] reqwest::header::InvalidHeaderValue),
    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {path} failed: {source}")]
    Transport {
        path: String,
        source: reqwest::Error,
    },
    #[error("api returned {status} for {path}")]
    Status { status: StatusCode, path: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeStatus {
    pub node: String,
    pub status: String,
    #[serde(default)]
    pub cpu: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageVolume {
    pub storage: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub used: u64,
}

// Every Proxmox response wraps its payload in a "data" field.
#[derive(Debug, Deserialize)]
struct ApiData<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct VersionInfo {
    release: String,
}

pub struct ProxmoxClient {
    http: Client,
    base_url: String,
}

impl ProxmoxClient {
    pub fn new(cfg: &Config, secret: &str) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&auth_header_value(&cfg.token_id, secret))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        // Config validation already proved the timeout parses.
        let timeout = cfg
            .parsed_request_timeout()
            .unwrap_or(std::time::Duration::from_secs(10));
        let http = Client::builder()
            .user_agent(concat!("pvescan/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .danger_accept_invalid_certs(!cfg.verify_tls)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: cfg.normalized_api_url(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                path: path.to_string(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status,
                path: path.to_string(),
            });
        }

        let body: ApiData<T> = resp.json().await.map_err(|source| ApiError::Transport {
            path: path.to_string(),
            source,
        })?;
        Ok(body.data)
    }
}

impl ClusterApi for ProxmoxClient {
    async fn probe(&self) -> Result<String, ApiError> {
        let version: VersionInfo = self.get_json("/version").await?;
        Ok(version.release)
    }

    async fn list_nodes(&self) -> Result<Vec<NodeStatus>, ApiError> {
        self.get_json("/nodes").await
    }

    async fn list_storage(&self, node: &str) -> Result<Vec<StorageVolume>, ApiError> {
        self.get_json(&format!("/nodes/{node}/storage")).await
    }
}

/// Proxmox API-token scheme: `PVEAPIToken=<user@realm!name>=<uuid>`.
fn auth_header_value(token_id: &str, secret: &str) -> String {
    format!("PVEAPIToken={token_id}={secret}")
}
