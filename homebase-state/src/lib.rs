//! Homebase State Homes
//!
//! This crate stores deployment state for the Homebase tool in a remote
//! object store. A provider resolves credentials, selects an account and
//! bootstraps a single state bucket; the resulting [`Home`] then reads and
//! writes blobs addressed by `(kind, app, stage)`.
//!
//! # Overview
//!
//! - **Provider**: authenticated, account-bound entry point (currently Cloudflare R2)
//! - **Home**: blob CRUD plus passphrase storage inside the state bucket
//! - **BlobAddress**: normalized `kind/app/stage` object path
//!
//! # Example
//!
//! ```ignore
//! use homebase_state::{create_provider, BlobKind, ProviderConfig};
//!
//! let config = ProviderConfig::new("cloudflare")
//!     .with_attribute("accountId", "023e105f4ecef8ad9ca31a8372d0c353");
//!
//! let mut provider = create_provider(&config).await?;
//!
//! // Share the resolved credentials with resource provisioning
//! let env = provider.env();
//!
//! // Ensure the state bucket exists
//! let home = provider.as_home().await?;
//!
//! if home.get_passphrase("my-app", "dev").await?.is_none() {
//!     home.set_passphrase("my-app", "dev", "generated").await?;
//! }
//! let state = home.get_data(BlobKind::App, "my-app", "dev").await?;
//! ```

pub mod address;
pub mod backend;
pub mod backends;
pub mod value;

// Re-export main types for convenience
pub use address::{BlobAddress, BlobKind};
pub use backend::{BackendError, BackendResult, Home, Provider, ProviderConfig};
pub use backends::{CloudflareProvider, create_provider};
pub use value::Value;
