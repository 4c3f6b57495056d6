//! Timeout helper.

use std::future::Future;
use std::time::Duration;

use crate::error::StagehandError;

/// Wrap a future with a timeout. Elapsed time surfaces as [`StagehandError::Timeout`].
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T, StagehandError>>,
) -> Result<T, StagehandError> {
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(StagehandError::Timeout(duration.as_millis() as u64)),
    }
}
