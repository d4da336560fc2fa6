//! Transfer execution with retry for chunked requests.
//!
//! Single-shot requests run once and their faults propagate unchanged.
//! Chunked requests are advanced one chunk at a time; transient faults
//! (status >= 500, transport or I/O errors) are retried with exponential
//! backoff and jitter, everything else aborts the transfer immediately.
//!
//! # Example
//!
//! ```ignore
//! use rusty_drive_storage::{RetrySettings, TransferExecutor};
//!
//! let executor = TransferExecutor::new(RetrySettings::default());
//! let file = executor.execute(client.upload_request(target, source, mime, true), None).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use rusty_drive_common::ProgressCallback;

use crate::error::StorageError;
use crate::traits::{
    ChunkStatus, ChunkedRequest, Jitter, Sleeper, ThreadRngJitter, TokioSleeper, TransferRequest,
};
use crate::types::{RetrySettings, TransferProgress};

/// Largest backoff exponent; keeps the delay computation finite for huge budgets.
const MAX_BACKOFF_EXPONENT: u32 = 30;

/// Consecutive non-progressing attempts of one transfer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct RetryState {
    progressless_iters: u32,
}

impl RetryState {
    /// Count one more failed attempt and return the new count.
    fn record_failure(&mut self) -> u32 {
        self.progressless_iters += 1;
        self.progressless_iters
    }

    /// A chunk went through.
    fn reset(&mut self) {
        self.progressless_iters = 0;
    }
}

/// Drives transfer requests to completion.
#[derive(Clone)]
pub struct TransferExecutor {
    /// Retry budget and backoff unit.
    settings: RetrySettings,
    /// Clock used for backoff delays.
    sleeper: Arc<dyn Sleeper>,
    /// Source of backoff jitter.
    jitter: Arc<dyn Jitter>,
}

impl TransferExecutor {
    /// Create an executor sleeping on the tokio timer with thread-RNG jitter.
    ///
    /// # Arguments
    /// * `settings` - Retry budget and backoff unit
    pub fn new(settings: RetrySettings) -> Self {
        Self {
            settings,
            sleeper: Arc::new(TokioSleeper),
            jitter: Arc::new(ThreadRngJitter),
        }
    }

    /// Replace the clock used for backoff delays.
    pub fn with_sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// Replace the jitter source.
    pub fn with_jitter(mut self, jitter: impl Jitter + 'static) -> Self {
        self.jitter = Arc::new(jitter);
        self
    }

    /// Retry settings in use.
    pub fn settings(&self) -> &RetrySettings {
        &self.settings
    }

    /// Backoff before retry number `attempt` (1-based): a uniform random
    /// duration in `[0, 2^attempt)` backoff units.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent: i32 = attempt.min(MAX_BACKOFF_EXPONENT) as i32;
        let factor: f64 = self.jitter.sample() * 2f64.powi(exponent);
        self.settings.backoff_unit.mul_f64(factor)
    }

    /// Run a transfer to completion.
    ///
    /// # Arguments
    /// * `request` - Single-shot or chunked request
    /// * `progress` - Optional callback receiving progress after each chunk
    ///
    /// # Returns
    /// The decoded response entity of the final round-trip.
    ///
    /// # Errors
    /// Single-shot faults propagate as is. For chunked requests, a
    /// non-transient fault aborts at once, and the last transient fault is
    /// re-raised once the retry budget is exhausted.
    pub async fn execute<T: Send>(
        &self,
        request: TransferRequest<T>,
        progress: Option<&dyn ProgressCallback<TransferProgress>>,
    ) -> Result<T, StorageError> {
        match request {
            TransferRequest::SingleShot(mut single) => single.execute().await,
            TransferRequest::Chunked(chunked) => self.run_chunked(chunked, progress).await,
        }
    }

    async fn run_chunked<T: Send>(
        &self,
        mut request: Box<dyn ChunkedRequest<Output = T>>,
        progress: Option<&dyn ProgressCallback<TransferProgress>>,
    ) -> Result<T, StorageError> {
        let mut state: RetryState = RetryState::default();

        loop {
            match request.next_chunk().await {
                Ok(ChunkStatus::Complete(output)) => {
                    self.report(request.as_ref(), 1.0, progress);
                    return Ok(output);
                }
                Ok(ChunkStatus::InProgress { progress: fraction }) => {
                    state.reset();
                    if let Some(fraction) = fraction {
                        self.report(request.as_ref(), fraction, progress);
                    }
                }
                Err(err) if !err.is_transient() => return Err(err),
                Err(err) => {
                    let attempt: u32 = state.record_failure();
                    if attempt > self.settings.max_retries {
                        log::warn!(
                            "Failed to make progress on {} for {} consecutive attempts",
                            request.key(),
                            attempt - 1
                        );
                        return Err(err);
                    }

                    let delay: Duration = self.backoff_delay(attempt);
                    log::warn!(
                        "Caught error ({}). Sleeping for {:.3}s before retry #{}",
                        err,
                        delay.as_secs_f64(),
                        attempt
                    );
                    self.sleeper.sleep(delay).await;
                }
            }
        }
    }

    fn report<T: Send>(
        &self,
        request: &dyn ChunkedRequest<Output = T>,
        fraction: f64,
        progress: Option<&dyn ProgressCallback<TransferProgress>>,
    ) {
        let update: TransferProgress = TransferProgress {
            operation: request.operation(),
            key: request.key().to_string(),
            fraction,
        };
        log::debug!("{} {} {}%", update.operation, update.key, update.percent());
        if let Some(cb) = progress {
            cb.on_progress(&update);
        }
    }
}
