//! Deadlines for collaborator calls.

use std::future::Future;
use std::time::Duration;

use watch_core::error::AppError;
use watch_core::result::AppResult;

/// Await `fut`, failing with a timeout error if it does not finish in
/// `deadline`. The future is dropped on timeout, so an in-flight write
/// may still land; its outcome is just no longer observed.
pub async fn with_deadline<T, F>(deadline: Duration, op: &str, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(AppError::timeout(format!(
            "{op} did not complete within {}ms",
            deadline.as_millis()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use watch_core::error::ErrorKind;

    #[tokio::test(start_paused = true)]
    async fn test_times_out() {
        let result: AppResult<()> = with_deadline(Duration::from_millis(50), "store.get", async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(())
        })
        .await;
        let err = result.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);
        assert!(err.message.contains("store.get"));
    }

    #[tokio::test]
    async fn test_passes_result_through() {
        let result = with_deadline(Duration::from_secs(1), "noop", async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
