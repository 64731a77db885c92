//! Authenticated access to the Cloudflare v4 API

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::credentials::AuthMode;
use crate::backend::{BackendError, BackendResult, ProviderConfig};

/// Default endpoint of the Cloudflare v4 API
pub const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// Default per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// R2 error code for a missing object key
pub const NO_SUCH_KEY_CODE: i64 = 10007;

/// R2 error code for creating a bucket that already exists
pub const BUCKET_ALREADY_EXISTS_CODE: i64 = 10004;

/// A single entry of the `errors` array in an API response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiMessage {
    pub code: i64,
    pub message: String,
}

/// Errors returned by a [`BackendClient`]
#[derive(Debug, Error)]
pub enum ClientError {
    /// The addressed object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The resource being created already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// The API rejected the request
    #[error("API error ({status}): {}", describe(.errors))]
    Api {
        status: StatusCode,
        errors: Vec<ApiMessage>,
    },

    /// Network or connection error
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body did not have the expected shape
    #[error("Failed to decode API response: {0}")]
    Decode(#[from] serde_json::Error),
}

fn describe(errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return "no error details".to_string();
    }
    errors
        .iter()
        .map(|e| format!("{} ({})", e.message, e.code))
        .collect::<Vec<_>>()
        .join("; ")
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Request body sent to the API
#[derive(Debug, Clone)]
pub enum Body {
    Json(serde_json::Value),
    Raw(Vec<u8>),
}

/// Cloudflare account visible to the credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// R2 bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub name: String,
    #[serde(default)]
    pub creation_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct BucketList {
    #[serde(default)]
    buckets: Vec<Bucket>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

/// Decode the `result` field of a standard API envelope
pub fn decode_result<T: DeserializeOwned>(bytes: &[u8]) -> ClientResult<T> {
    let envelope: Envelope<T> = serde_json::from_slice(bytes)?;
    envelope.result.ok_or_else(|| ClientError::Api {
        status: StatusCode::OK,
        errors: envelope.errors,
    })
}

/// Turn a failed response into a typed error
///
/// Only an explicit missing-key code, or a 404 carrying no error details,
/// counts as `NotFound`. A missing bucket is reported as an API error, and so
/// is a bare 409: only bucket creation treats that as `AlreadyExists`.
pub fn classify_error(status: StatusCode, body: &[u8], target: &str) -> ClientError {
    let errors = match serde_json::from_slice::<Envelope<IgnoredAny>>(body) {
        Ok(envelope) => envelope.errors,
        Err(_) if body.is_empty() => Vec::new(),
        Err(_) => vec![ApiMessage {
            code: 0,
            message: String::from_utf8_lossy(body).trim().to_string(),
        }],
    };

    let has_code = |code: i64| errors.iter().any(|e| e.code == code);

    if has_code(NO_SUCH_KEY_CODE) || (status == StatusCode::NOT_FOUND && errors.is_empty()) {
        ClientError::NotFound(target.to_string())
    } else if has_code(BUCKET_ALREADY_EXISTS_CODE) {
        ClientError::AlreadyExists(target.to_string())
    } else {
        ClientError::Api { status, errors }
    }
}

/// Authenticated request capability against the remote API
///
/// Implementors only provide [`request`](BackendClient::request); the
/// account and bucket operations are built on it.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Issue `method` against `path` (relative to the API root) and return the raw response body
    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Body>,
    ) -> ClientResult<Vec<u8>>;

    async fn list_accounts(&self) -> ClientResult<Vec<Account>> {
        let bytes = self.request(Method::GET, "accounts", &[], None).await?;
        decode_result(&bytes)
    }

    /// List buckets whose name contains `name`
    async fn list_buckets(&self, account_id: &str, name: &str) -> ClientResult<Vec<Bucket>> {
        let path = format!("accounts/{}/r2/buckets", account_id);
        let bytes = self
            .request(Method::GET, &path, &[("name_contains", name)], None)
            .await?;
        let list: BucketList = decode_result(&bytes)?;
        Ok(list.buckets)
    }

    /// Create bucket `name`; a conflict reply is reported as `AlreadyExists`
    async fn create_bucket(&self, account_id: &str, name: &str) -> ClientResult<Bucket> {
        let path = format!("accounts/{}/r2/buckets", account_id);
        let body = Body::Json(serde_json::json!({ "name": name }));
        let result = self.request(Method::POST, &path, &[], Some(body)).await;
        let bytes = match result {
            Ok(bytes) => bytes,
            Err(ClientError::Api { status, .. }) if status == StatusCode::CONFLICT => {
                return Err(ClientError::AlreadyExists(path));
            }
            Err(e) => return Err(e),
        };
        decode_result(&bytes)
    }
}

/// Settings for [`HttpClient`]
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl HttpClientConfig {
    /// Read `apiBaseUrl` and `timeoutSecs` from provider attributes
    pub fn from_config(config: &ProviderConfig) -> BackendResult<Self> {
        let mut client_config = Self::default();

        if let Some(base_url) = config.get_string("apiBaseUrl") {
            client_config.base_url = base_url.to_string();
        }

        if let Some(timeout) = config.get_int("timeoutSecs") {
            client_config.timeout_secs = u64::try_from(timeout)
                .ok()
                .filter(|t| *t > 0)
                .ok_or_else(|| {
                    BackendError::configuration(format!(
                        "timeoutSecs must be a positive integer, got {}",
                        timeout
                    ))
                })?;
        }

        Ok(client_config)
    }
}

/// [`BackendClient`] speaking HTTPS to the Cloudflare API
pub struct HttpClient {
    http: reqwest::Client,
    base_url: Url,
    auth: AuthMode,
}

impl HttpClient {
    pub fn new(auth: AuthMode, config: HttpClientConfig) -> BackendResult<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            BackendError::configuration(format!("Invalid API base URL {}: {}", config.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::configuration(format!(
                "Invalid API base URL {}",
                config.base_url
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("homebase/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                BackendError::configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            base_url,
            auth,
        })
    }

    /// Build the full URL, percent-encoding each path segment
    fn url(&self, path: &str, query: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(path.split('/').filter(|s| !s.is_empty()));
        }
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        url
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            AuthMode::Token(token) => builder.bearer_auth(token),
            AuthMode::Key { key, email } => builder
                .header("X-Auth-Key", key)
                .header("X-Auth-Email", email),
        }
    }
}

#[async_trait]
impl BackendClient for HttpClient {
    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Body>,
    ) -> ClientResult<Vec<u8>> {
        let url = self.url(path, query);
        log::debug!("{} {}", method, url.path());

        let mut builder = self.authorize(self.http.request(method, url));
        builder = match body {
            Some(Body::Json(value)) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(serde_json::to_vec(&value)?),
            Some(Body::Raw(bytes)) => builder
                .header(CONTENT_TYPE, "application/octet-stream")
                .body(bytes),
            None => builder,
        };

        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if status.is_success() {
            Ok(bytes.to_vec())
        } else {
            Err(classify_error(status, &bytes, path))
        }
    }
}
