//! API-key failover for the completion service.
//!
//! Each user holds two completion keys. A call runs with the active key; if
//! the provider rejects that key, the active marker moves to the other key
//! (persisted through the [`UserDirectory`](crate::users::UserDirectory)) and
//! the call is retried exactly once.
//!
//! # Policy
//!
//! - **Credential errors** switch keys and retry once.
//! - **Any other error** propagates immediately without switching.
//! - No switch-back: later calls start from whichever key is active.

use std::future::Future;

use tracing::{info, warn};

use crate::error::Result;
use crate::users::CredentialSelector;

/// Run `operation` with the user's active key, failing over once on a
/// credential rejection.
///
/// `operation` receives the API key to use. The second error, if any, is the
/// one returned.
///
/// # Errors
///
/// - [`TaskError::Configuration`](crate::error::TaskError::Configuration) when no key is set.
/// - The original credential error when the other slot has no key.
/// - Whatever the retried call returns.
pub async fn with_failover<T, F, Fut>(selector: &CredentialSelector, mut operation: F) -> Result<T>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let (slot, key) = selector.active_key()?;

    let first_error = match operation(key.to_owned()).await {
        Ok(value) => return Ok(value),
        Err(e) if e.is_credential() => e,
        Err(e) => return Err(e),
    };

    let fallback = slot.other();
    let Some(fallback_key) = selector.key(fallback) else {
        warn!(
            user = selector.user_id(),
            slot = %slot,
            error = %first_error,
            "completion key rejected and no fallback key configured"
        );
        return Err(first_error);
    };

    warn!(
        user = selector.user_id(),
        from = %slot,
        to = %fallback,
        error = %first_error,
        "completion key rejected, failing over"
    );
    if let Err(e) = selector.switch_from(slot).await {
        warn!(user = selector.user_id(), "could not persist credential switch: {e}");
    }

    let result = operation(fallback_key.to_owned()).await;
    if result.is_ok() {
        info!(user = selector.user_id(), slot = %fallback, "fallback completion key succeeded");
    }
    result
}
