//! Home and provider traits and error types

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::address::{BlobAddress, BlobKind};
use crate::backends::cloudflare::ClientError;
use crate::value::Value;

/// Errors that can occur when interacting with a state home
#[derive(Debug, Error)]
pub enum BackendError {
    /// No usable credential mode could be assembled
    #[error("{0}")]
    AuthConfiguration(String),

    /// The target account could not be determined
    #[error("Failed to resolve account: {message}")]
    AccountResolution {
        message: String,
        #[source]
        source: Option<ClientError>,
    },

    /// Checking for or creating the state bucket failed
    #[error("Failed to bootstrap state bucket {bucket}: {source}")]
    Bootstrap {
        bucket: String,
        #[source]
        source: ClientError,
    },

    /// A blob operation was attempted before the state bucket was bootstrapped
    #[error("State home is not ready: the state bucket has not been bootstrapped")]
    NotReady,

    /// Any other failure of a remote call
    #[error("Request failed: {0}")]
    Request(#[from] ClientError),

    /// A blob address component is malformed
    #[error("Invalid blob address: {0}")]
    InvalidAddress(String),

    /// Stored bytes could not be decoded as expected
    #[error("Invalid blob data: {0}")]
    InvalidData(String),

    /// The provider type is not supported
    #[error("Unsupported provider type: {0}")]
    UnsupportedProvider(String),

    /// Configuration error
    #[error("Provider configuration error: {0}")]
    Configuration(String),
}

impl BackendError {
    /// Create an unsupported provider error
    pub fn unsupported_provider(provider_type: impl Into<String>) -> Self {
        Self::UnsupportedProvider(provider_type.into())
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Blob storage offered by a bootstrapped provider
///
/// Only `get`, `put` and `remove` are required. The remaining methods are
/// conveniences layered on top of them.
#[async_trait]
pub trait Home: Send + Sync {
    /// Read the blob at `address`
    ///
    /// Returns `None` if nothing is stored there. Any other failure is an error.
    async fn get(&self, address: &BlobAddress) -> BackendResult<Option<Vec<u8>>>;

    /// Write `data` at `address`, replacing any previous content
    async fn put(&self, address: &BlobAddress, data: &[u8]) -> BackendResult<()>;

    /// Delete the blob at `address`
    async fn remove(&self, address: &BlobAddress) -> BackendResult<()>;

    /// Read the blob stored for `kind`, `app` and `stage`
    async fn get_data(
        &self,
        kind: BlobKind,
        app: &str,
        stage: &str,
    ) -> BackendResult<Option<Vec<u8>>> {
        self.get(&BlobAddress::new(kind, app, stage)?).await
    }

    /// Write the blob for `kind`, `app` and `stage`
    async fn put_data(
        &self,
        kind: BlobKind,
        app: &str,
        stage: &str,
        data: &[u8],
    ) -> BackendResult<()> {
        self.put(&BlobAddress::new(kind, app, stage)?, data).await
    }

    /// Delete the blob stored for `kind`, `app` and `stage`
    async fn remove_data(&self, kind: BlobKind, app: &str, stage: &str) -> BackendResult<()> {
        self.remove(&BlobAddress::new(kind, app, stage)?).await
    }

    /// Store the passphrase for an app/stage as raw UTF-8 bytes
    async fn set_passphrase(&self, app: &str, stage: &str, passphrase: &str) -> BackendResult<()> {
        self.put_data(BlobKind::Passphrase, app, stage, passphrase.as_bytes())
            .await
    }

    /// Read the passphrase for an app/stage
    ///
    /// `None` means no passphrase was ever stored; `Some("")` is a stored empty one.
    async fn get_passphrase(&self, app: &str, stage: &str) -> BackendResult<Option<String>> {
        match self.get_data(BlobKind::Passphrase, app, stage).await? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| BackendError::InvalidData(format!("passphrase is not UTF-8: {}", e))),
            None => Ok(None),
        }
    }
}

/// A configured, authenticated provider that can be turned into a [`Home`]
#[async_trait]
pub trait Provider: Send + Sync {
    /// Name of this provider (e.g., "cloudflare")
    fn key(&self) -> &'static str;

    /// Ensure the state bucket exists and return the ready-to-use home
    ///
    /// Bootstrapping runs at most once per provider instance. After a failed
    /// bootstrap the instance stays unusable and should be discarded.
    async fn as_home<'a>(&'a mut self) -> BackendResult<&'a dyn Home>;

    /// Credentials and account scope resolved during initialization
    fn env(&self) -> HashMap<String, String>;
}

/// Configuration for a provider
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    /// Provider type (e.g., "cloudflare")
    pub provider_type: String,
    /// Provider-specific attributes
    pub attributes: HashMap<String, Value>,
}

impl ProviderConfig {
    pub fn new(provider_type: impl Into<String>) -> Self {
        Self {
            provider_type: provider_type.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Get a string attribute value
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    /// Get an integer attribute value
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.attributes.get(key) {
            Some(Value::Int(i)) => Some(*i),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryHome {
        blobs: Mutex<HashMap<String, Vec<u8>>>,
    }

    #[async_trait]
    impl Home for MemoryHome {
        async fn get(&self, address: &BlobAddress) -> BackendResult<Option<Vec<u8>>> {
            Ok(self.blobs.lock().unwrap().get(&address.path()).cloned())
        }

        async fn put(&self, address: &BlobAddress, data: &[u8]) -> BackendResult<()> {
            self.blobs
                .lock()
                .unwrap()
                .insert(address.path(), data.to_vec());
            Ok(())
        }

        async fn remove(&self, address: &BlobAddress) -> BackendResult<()> {
            self.blobs.lock().unwrap().remove(&address.path());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_passphrase_round_trip() {
        let home = MemoryHome::default();
        home.set_passphrase("my-app", "dev", "secret").await.unwrap();

        let passphrase = home.get_passphrase("my-app", "dev").await.unwrap();
        assert_eq!(passphrase.as_deref(), Some("secret"));
        assert!(
            home.blobs
                .lock()
                .unwrap()
                .contains_key("passphrase/my-app/dev")
        );
    }

    #[tokio::test]
    async fn test_passphrase_absent_vs_empty() {
        let home = MemoryHome::default();
        assert_eq!(home.get_passphrase("my-app", "dev").await.unwrap(), None);

        home.set_passphrase("my-app", "dev", "").await.unwrap();
        assert_eq!(
            home.get_passphrase("my-app", "dev").await.unwrap(),
            Some(String::new())
        );
    }

    #[tokio::test]
    async fn test_passphrase_rejects_invalid_utf8() {
        let home = MemoryHome::default();
        home.put_data(BlobKind::Passphrase, "my-app", "dev", &[0xff, 0xfe])
            .await
            .unwrap();

        let result = home.get_passphrase("my-app", "dev").await;
        assert!(matches!(result, Err(BackendError::InvalidData(_))));
    }

    #[tokio::test]
    async fn test_data_helpers_validate_address() {
        let home = MemoryHome::default();
        let result = home.put_data(BlobKind::App, "bad/app", "dev", b"{}").await;
        assert!(matches!(result, Err(BackendError::InvalidAddress(_))));
    }

    #[test]
    fn test_backend_error_display() {
        let error = BackendError::unsupported_provider("azure");
        assert_eq!(error.to_string(), "Unsupported provider type: azure");

        let error = BackendError::configuration("bad timeout");
        assert_eq!(error.to_string(), "Provider configuration error: bad timeout");
    }

    #[test]
    fn test_provider_config_accessors() {
        let config = ProviderConfig::new("cloudflare")
            .with_attribute("apiToken", "abc")
            .with_attribute("timeoutSecs", Value::Int(5))
            .with_attribute("debug", true);

        assert_eq!(config.get_string("apiToken"), Some("abc"));
        assert_eq!(config.get_string("debug"), None);
        assert_eq!(config.get_int("timeoutSecs"), Some(5));
        assert_eq!(config.get_int("apiToken"), None);
    }
}
