//! Account selection

use super::client::BackendClient;
use super::credentials::ENV_ACCOUNT_ID;
use crate::backend::{BackendError, BackendResult};

/// Determine the account all further requests are scoped to
///
/// A configured id is used as-is; otherwise the first account visible to
/// the credentials is taken.
pub async fn select_account(
    client: &dyn BackendClient,
    configured: Option<&str>,
) -> BackendResult<String> {
    let account_id = match configured {
        Some(id) => id.to_string(),
        None => {
            let accounts = client
                .list_accounts()
                .await
                .map_err(|e| BackendError::AccountResolution {
                    message: "listing accounts failed".to_string(),
                    source: Some(e),
                })?;

            accounts
                .into_iter()
                .next()
                .map(|account| account.id)
                .ok_or_else(|| BackendError::AccountResolution {
                    message: format!(
                        "no accounts are visible to these credentials; set {}",
                        ENV_ACCOUNT_ID
                    ),
                    source: None,
                })?
        }
    };

    log::info!("cloudflare account selected: {}", account_id);
    Ok(account_id)
}
