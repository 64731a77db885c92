//! Cloudflare R2 provider for state storage

mod account;
mod bootstrap;
mod client;
mod credentials;
#[cfg(test)]
mod fake;

pub use account::select_account;
pub use bootstrap::{Bootstrap, STATE_BUCKET, ensure_state_bucket};
pub use client::{
    Account, ApiMessage, BackendClient, Body, Bucket, ClientError, ClientResult, DEFAULT_BASE_URL,
    HttpClient, HttpClientConfig,
};
pub use credentials::{
    ATTR_ACCOUNT_ID, ATTR_API_KEY, ATTR_API_TOKEN, ATTR_EMAIL, AuthMode, CredentialFields,
    Credentials, ENV_ACCOUNT_ID, ENV_API_KEY, ENV_API_TOKEN, ENV_EMAIL,
};

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Method;

use crate::address::BlobAddress;
use crate::backend::{BackendError, BackendResult, Home, Provider, ProviderConfig};

/// R2-backed state home
///
/// Created authenticated and bound to one account by [`init`](Self::init).
/// Blob operations become available once [`Provider::as_home`] has
/// bootstrapped the state bucket.
pub struct CloudflareProvider {
    client: Box<dyn BackendClient>,
    account_id: String,
    env: HashMap<String, String>,
    lifecycle: Lifecycle,
}

/// Lifecycle after authentication; there is no way back from `Failed`
#[derive(Debug)]
enum Lifecycle {
    Authenticated,
    Bootstrapped(Bootstrap),
    Failed,
}

impl CloudflareProvider {
    pub const KEY: &'static str = "cloudflare";

    /// Resolve credentials from the environment and `config`, then select the account
    pub async fn from_config(config: &ProviderConfig) -> BackendResult<Self> {
        let credentials = Credentials::from_config(config)?;
        let client = HttpClient::new(
            credentials.auth.clone(),
            HttpClientConfig::from_config(config)?,
        )?;
        Self::init(credentials, Box::new(client)).await
    }

    /// Bind already-resolved credentials and a client to an account
    pub async fn init(
        credentials: Credentials,
        client: Box<dyn BackendClient>,
    ) -> BackendResult<Self> {
        let account_id =
            select_account(client.as_ref(), credentials.account_id.as_deref()).await?;

        let mut env = credentials.env();
        env.insert(ENV_ACCOUNT_ID.to_string(), account_id.clone());

        Ok(Self {
            client,
            account_id,
            env,
            lifecycle: Lifecycle::Authenticated,
        })
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Name of the state bucket, once bootstrapped
    pub fn state_bucket(&self) -> Option<&str> {
        match &self.lifecycle {
            Lifecycle::Bootstrapped(bootstrap) => Some(bootstrap.state_bucket.as_str()),
            _ => None,
        }
    }

    fn object_path(&self, address: &BlobAddress) -> BackendResult<String> {
        let Lifecycle::Bootstrapped(bootstrap) = &self.lifecycle else {
            return Err(BackendError::NotReady);
        };
        Ok(format!(
            "accounts/{}/r2/buckets/{}/objects/{}",
            self.account_id,
            bootstrap.state_bucket,
            address.path()
        ))
    }
}

#[async_trait]
impl Home for CloudflareProvider {
    async fn get(&self, address: &BlobAddress) -> BackendResult<Option<Vec<u8>>> {
        let path = self.object_path(address)?;
        match self.client.request(Method::GET, &path, &[], None).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(ClientError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, address: &BlobAddress, data: &[u8]) -> BackendResult<()> {
        let path = self.object_path(address)?;
        self.client
            .request(Method::PUT, &path, &[], Some(Body::Raw(data.to_vec())))
            .await?;
        Ok(())
    }

    async fn remove(&self, address: &BlobAddress) -> BackendResult<()> {
        let path = self.object_path(address)?;
        match self.client.request(Method::DELETE, &path, &[], None).await {
            Ok(_) | Err(ClientError::NotFound(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Provider for CloudflareProvider {
    fn key(&self) -> &'static str {
        Self::KEY
    }

    async fn as_home<'a>(&'a mut self) -> BackendResult<&'a dyn Home> {
        match self.lifecycle {
            Lifecycle::Bootstrapped(_) => {}
            Lifecycle::Failed => return Err(BackendError::NotReady),
            Lifecycle::Authenticated => {
                match ensure_state_bucket(self.client.as_ref(), &self.account_id, STATE_BUCKET)
                    .await
                {
                    Ok(bootstrap) => self.lifecycle = Lifecycle::Bootstrapped(bootstrap),
                    Err(e) => {
                        self.lifecycle = Lifecycle::Failed;
                        return Err(e);
                    }
                }
            }
        }
        Ok(&*self)
    }

    fn env(&self) -> HashMap<String, String> {
        self.env.clone()
    }
}
