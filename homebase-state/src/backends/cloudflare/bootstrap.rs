//! State bucket bootstrap

use super::client::{BackendClient, ClientError};
use crate::backend::{BackendError, BackendResult};

/// Name of the bucket holding state for every app in an account
pub const STATE_BUCKET: &str = "sst-state";

/// Outcome of a successful bootstrap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bootstrap {
    /// Bucket that blobs are read from and written to
    pub state_bucket: String,
}

/// Make sure `bucket` exists in the account, creating it if needed
///
/// An existing bucket is adopted without any write. If the bucket appears
/// between listing and creation (another process bootstrapping at the same
/// time), the conflict response is treated as success.
pub async fn ensure_state_bucket(
    client: &dyn BackendClient,
    account_id: &str,
    bucket: &str,
) -> BackendResult<Bootstrap> {
    let bootstrap_error = |source: ClientError| BackendError::Bootstrap {
        bucket: bucket.to_string(),
        source,
    };

    let buckets = client
        .list_buckets(account_id, bucket)
        .await
        .map_err(bootstrap_error)?;

    if buckets.iter().any(|b| b.name == bucket) {
        log::info!("found existing state bucket: {}", bucket);
    } else {
        log::info!("creating state bucket: {}", bucket);
        match client.create_bucket(account_id, bucket).await {
            Ok(_) => {}
            Err(ClientError::AlreadyExists(_)) => {
                log::info!("state bucket {} was created concurrently, adopting it", bucket);
            }
            Err(e) => return Err(bootstrap_error(e)),
        }
    }

    Ok(Bootstrap {
        state_bucket: bucket.to_string(),
    })
}
