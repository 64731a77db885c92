//! Provider implementations for state storage

pub mod cloudflare;

pub use cloudflare::CloudflareProvider;

use crate::backend::{BackendError, BackendResult, Provider, ProviderConfig};

/// Create an initialized provider from configuration
///
/// This function dispatches to the appropriate provider implementation
/// based on the provider_type in the configuration. The returned provider
/// is authenticated and bound to an account; call `as_home` to bootstrap it.
pub async fn create_provider(config: &ProviderConfig) -> BackendResult<Box<dyn Provider>> {
    match config.provider_type.as_str() {
        CloudflareProvider::KEY => {
            let provider = CloudflareProvider::from_config(config).await?;
            Ok(Box::new(provider))
        }
        other => Err(BackendError::unsupported_provider(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unsupported_provider() {
        let config = ProviderConfig::new("aws");

        let result = create_provider(&config).await;
        assert!(result.is_err());

        if let Err(BackendError::UnsupportedProvider(name)) = result {
            assert_eq!(name, "aws");
        } else {
            panic!("Expected UnsupportedProvider error");
        }
    }

    #[tokio::test]
    async fn test_cloudflare_dispatch_validates_credentials() {
        let config = ProviderConfig::new("cloudflare").with_attribute("apiToken", true);

        let result = create_provider(&config).await;
        assert!(matches!(result, Err(BackendError::AuthConfiguration(_))));
    }
}
