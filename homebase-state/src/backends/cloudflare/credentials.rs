//! Credential resolution from the environment and provider attributes

use std::collections::HashMap;
use std::env::{self, VarError};
use std::fmt;

use crate::backend::{BackendError, BackendResult, ProviderConfig};
use crate::value::Value;

pub const ENV_API_TOKEN: &str = "CLOUDFLARE_API_TOKEN";
pub const ENV_API_KEY: &str = "CLOUDFLARE_API_KEY";
pub const ENV_EMAIL: &str = "CLOUDFLARE_EMAIL";
pub const ENV_ACCOUNT_ID: &str = "CLOUDFLARE_DEFAULT_ACCOUNT_ID";

pub const ATTR_API_TOKEN: &str = "apiToken";
pub const ATTR_API_KEY: &str = "apiKey";
pub const ATTR_EMAIL: &str = "email";
pub const ATTR_ACCOUNT_ID: &str = "accountId";

/// One layer of credential values; empty strings are treated as unset
#[derive(Clone, Default, PartialEq)]
pub struct CredentialFields {
    pub api_token: Option<String>,
    pub api_key: Option<String>,
    pub email: Option<String>,
    pub account_id: Option<String>,
}

impl CredentialFields {
    /// Read the `CLOUDFLARE_*` variables of the current process
    ///
    /// A variable that is set but not valid UTF-8 is rejected.
    pub fn from_env() -> BackendResult<Self> {
        let var = |name: &str| -> BackendResult<Option<String>> {
            match env::var(name) {
                Ok(value) if value.is_empty() => Ok(None),
                Ok(value) => Ok(Some(value)),
                Err(VarError::NotPresent) => Ok(None),
                Err(VarError::NotUnicode(_)) => Err(BackendError::AuthConfiguration(format!(
                    "Environment variable {} is not valid UTF-8",
                    name
                ))),
            }
        };

        Ok(Self {
            api_token: var(ENV_API_TOKEN)?,
            api_key: var(ENV_API_KEY)?,
            email: var(ENV_EMAIL)?,
            account_id: var(ENV_ACCOUNT_ID)?,
        })
    }

    /// Read the override layer from provider attributes
    ///
    /// A recognized key holding anything other than a string (or null) is rejected.
    pub fn from_attributes(attributes: &HashMap<String, Value>) -> BackendResult<Self> {
        let field = |key: &str| -> BackendResult<Option<String>> {
            match attributes.get(key) {
                None | Some(Value::Null) => Ok(None),
                Some(Value::String(s)) if s.is_empty() => Ok(None),
                Some(Value::String(s)) => Ok(Some(s.clone())),
                Some(other) => Err(BackendError::AuthConfiguration(format!(
                    "Provider attribute '{}' must be a string, got {}",
                    key,
                    other.type_name()
                ))),
            }
        };

        Ok(Self {
            api_token: field(ATTR_API_TOKEN)?,
            api_key: field(ATTR_API_KEY)?,
            email: field(ATTR_EMAIL)?,
            account_id: field(ATTR_ACCOUNT_ID)?,
        })
    }

    /// Layer `overrides` on top of `self`, field by field
    pub fn merge(self, overrides: CredentialFields) -> Self {
        Self {
            api_token: overrides.api_token.or(self.api_token),
            api_key: overrides.api_key.or(self.api_key),
            email: overrides.email.or(self.email),
            account_id: overrides.account_id.or(self.account_id),
        }
    }
}

impl fmt::Debug for CredentialFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("CredentialFields")
            .field("api_token", &redact(&self.api_token))
            .field("api_key", &redact(&self.api_key))
            .field("email", &self.email)
            .field("account_id", &self.account_id)
            .finish()
    }
}

/// How requests are authenticated
#[derive(Clone, PartialEq)]
pub enum AuthMode {
    /// Scoped API token
    Token(String),
    /// Global API key plus account email
    Key { key: String, email: String },
}

impl fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::Token(_) => f.write_str("Token([REDACTED])"),
            AuthMode::Key { email, .. } => f
                .debug_struct("Key")
                .field("key", &"[REDACTED]")
                .field("email", email)
                .finish(),
        }
    }
}

/// Validated credentials: exactly one auth mode plus an optional account id
#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub auth: AuthMode,
    pub account_id: Option<String>,
}

impl Credentials {
    /// Merge the ambient and override layers and pick an auth mode
    ///
    /// A complete key+email pair takes precedence over a token.
    pub fn resolve(ambient: CredentialFields, overrides: CredentialFields) -> BackendResult<Self> {
        let merged = ambient.merge(overrides);

        let auth = match (merged.api_key, merged.email, merged.api_token) {
            (Some(key), Some(email), _) => AuthMode::Key { key, email },
            (_, _, Some(token)) => AuthMode::Token(token),
            _ => {
                return Err(BackendError::AuthConfiguration(format!(
                    "Cloudflare credentials are not configured. Set {} or both {} and {} \
                     in the environment, or provide {}, or {} and {}, \
                     in the provider configuration.",
                    ENV_API_TOKEN, ENV_API_KEY, ENV_EMAIL, ATTR_API_TOKEN, ATTR_API_KEY, ATTR_EMAIL
                )));
            }
        };

        Ok(Self {
            auth,
            account_id: merged.account_id,
        })
    }

    /// Resolve from the process environment overridden by provider attributes
    pub fn from_config(config: &ProviderConfig) -> BackendResult<Self> {
        let overrides = CredentialFields::from_attributes(&config.attributes)?;
        Self::resolve(CredentialFields::from_env()?, overrides)
    }

    /// Environment variables carrying the selected auth mode
    pub fn env(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();
        match &self.auth {
            AuthMode::Token(token) => {
                env.insert(ENV_API_TOKEN.to_string(), token.clone());
            }
            AuthMode::Key { key, email } => {
                env.insert(ENV_API_KEY.to_string(), key.clone());
                env.insert(ENV_EMAIL.to_string(), email.clone());
            }
        }
        env
    }
}
