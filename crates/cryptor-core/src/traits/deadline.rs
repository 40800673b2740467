//! Bounded port calls.

use std::future::Future;
use std::time::Duration;

use crate::error::PortError;

/// Await a port call, failing with [`PortError::Timeout`] once `limit` elapses.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, PortError>
where
    F: Future<Output = Result<T, PortError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(PortError::Timeout(limit.as_millis() as u64)),
    }
}
