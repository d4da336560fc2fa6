//! Fixed-delay retry for calls the remote service fails spuriously.
//!
//! Spreadsheet range reads regularly answer 500 or 503; these are retried a
//! fixed number of times with a constant delay. Progress does not apply.

use std::future::Future;

use crate::error::StorageError;
use crate::traits::Sleeper;
use crate::types::FixedRetrySettings;

/// Run `call`, retrying it while it fails with a retryable status.
///
/// # Arguments
/// * `settings` - Attempt count, delay and retryable statuses
/// * `sleeper` - Clock used between attempts
/// * `call` - Produces one attempt per invocation
///
/// # Returns
/// The first successful result.
///
/// # Errors
/// The fault of the last attempt, or the first fault whose status is not
/// retryable.
pub async fn retry_fixed<T, F, Fut>(
    settings: &FixedRetrySettings,
    sleeper: &dyn Sleeper,
    mut call: F,
) -> Result<T, StorageError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StorageError>>,
{
    let mut attempt: u32 = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < settings.max_attempts && settings.should_retry(&err) => {
                log::warn!(
                    "Attempt {}/{} failed ({}), retrying in {:?}",
                    attempt,
                    settings.max_attempts,
                    err,
                    settings.delay
                );
                sleeper.sleep(settings.delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;

    #[derive(Clone, Default)]
    struct RecordingSleeper {
        delays: Arc<Mutex<Vec<Duration>>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.delays.lock().unwrap().push(duration);
        }
    }

    async fn run(
        settings: &FixedRetrySettings,
        outcomes: Vec<Result<u32, StorageError>>,
    ) -> (Result<u32, StorageError>, usize, Vec<Duration>) {
        let sleeper = RecordingSleeper::default();
        let script: Arc<Mutex<VecDeque<Result<u32, StorageError>>>> =
            Arc::new(Mutex::new(outcomes.into()));
        let calls: Arc<Mutex<usize>> = Arc::new(Mutex::new(0));

        let result = retry_fixed(settings, &sleeper, || {
            let script = script.clone();
            let calls = calls.clone();
            async move {
                *calls.lock().unwrap() += 1;
                script.lock().unwrap().pop_front().unwrap()
            }
        })
        .await;

        let count: usize = *calls.lock().unwrap();
        let delays: Vec<Duration> = sleeper.delays.lock().unwrap().clone();
        (result, count, delays)
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let settings = FixedRetrySettings::default();
        let (result, calls, delays) = run(&settings, vec![Ok(7)]).await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls, 1);
        assert!(delays.is_empty());
    }

    #[tokio::test]
    async fn test_retries_503_then_succeeds() {
        let settings = FixedRetrySettings::default().with_delay(Duration::from_millis(250));
        let (result, calls, delays) = run(
            &settings,
            vec![
                Err(StorageError::http(503, "unavailable")),
                Err(StorageError::http(500, "internal")),
                Ok(1),
            ],
        )
        .await;
        assert_eq!(result, Ok(1));
        assert_eq!(calls, 3);
        assert_eq!(delays, vec![Duration::from_millis(250); 2]);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let settings = FixedRetrySettings::default().with_max_attempts(2);
        let (result, calls, delays) = run(
            &settings,
            vec![
                Err(StorageError::http(503, "first")),
                Err(StorageError::http(503, "second")),
            ],
        )
        .await;
        assert_eq!(result, Err(StorageError::http(503, "second")));
        assert_eq!(calls, 2);
        assert_eq!(delays.len(), 1);
    }

    #[tokio::test]
    async fn test_non_retryable_status_propagates() {
        let settings = FixedRetrySettings::default();
        let (result, calls, delays) =
            run(&settings, vec![Err(StorageError::http(502, "bad gateway"))]).await;
        assert_eq!(result, Err(StorageError::http(502, "bad gateway")));
        assert_eq!(calls, 1);
        assert!(delays.is_empty());
    }

    #[tokio::test]
    async fn test_network_error_propagates() {
        let settings = FixedRetrySettings::default();
        let err = StorageError::Network {
            message: "timeout".into(),
        };
        let (result, calls, _) = run(&settings, vec![Err(err.clone())]).await;
        assert_eq!(result, Err(err));
        assert_eq!(calls, 1);
    }
}
