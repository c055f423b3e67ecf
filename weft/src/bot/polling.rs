//! Long polling: an ordered stream of update batches with a monotonic
//! offset and capped exponential backoff on transport failure.

use std::sync::Arc;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use futures::stream::Stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::Api;
use crate::types::{Update, UpdateType};

/// Default long-poll timeout sent to `getUpdates`, in seconds.
pub const DEFAULT_POLLING_TIMEOUT: u64 = 30;

fn default_backoff() -> ExponentialBackoff {
    ExponentialBackoff {
        initial_interval: Duration::from_millis(500),
        max_interval: Duration::from_secs(30),
        // The poller never gives up on its own; only stop() ends it.
        max_elapsed_time: None,
        ..ExponentialBackoff::default()
    }
}

/// The update source: owns the offset and the subscription parameters.
pub struct LongPolling {
    api: Api,
    offset: i64,
    timeout: u64,
    allowed_updates: Vec<UpdateType>,
    cancel: CancellationToken,
    backoff: ExponentialBackoff,
}

impl LongPolling {
    pub fn new(api: Api) -> Self {
        Self {
            api,
            offset: 0,
            timeout: DEFAULT_POLLING_TIMEOUT,
            allowed_updates: Vec::new(),
            cancel: CancellationToken::new(),
            backoff: default_backoff(),
        }
    }

    /// Narrows the subscription to the given update kinds.
    pub fn allowed_updates(mut self, kinds: Vec<UpdateType>) -> Self {
        self.allowed_updates = kinds;
        self
    }

    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    /// Ties the poller's lifetime to an external token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// A handle that stops the poller cleanly.
    pub fn stop_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// One non-empty batch in ascending `update_id` order, or `None` once
    /// stopped. Transport failures are retried with backoff; the offset
    /// never regresses.
    pub async fn next_batch(&mut self) -> Option<Vec<Update>> {
        loop {
            if self.cancel.is_cancelled() {
                return None;
            }
            let request =
                self.api
                    .get_updates(self.offset, self.timeout, &self.allowed_updates);
            let result = tokio::select! {
                _ = self.cancel.cancelled() => return None,
                result = request => result,
            };
            match result {
                Ok(mut batch) => {
                    self.backoff.reset();
                    if batch.is_empty() {
                        // Long polls usually block upstream; with a fast
                        // transport this keeps the loop cooperative.
                        tokio::task::yield_now().await;
                        continue;
                    }
                    batch.sort_by_key(|u| u.update_id);
                    if let Some(last) = batch.last() {
                        self.offset = last.update_id + 1;
                    }
                    debug!(count = batch.len(), offset = self.offset, "got update batch");
                    return Some(batch);
                }
                Err(error) => {
                    let delay = self
                        .backoff
                        .next_backoff()
                        .unwrap_or(Duration::from_secs(30));
                    warn!(error = %error, delay_ms = delay.as_millis() as u64, "getUpdates failed, backing off");
                    tokio::select! {
                        _ = self.cancel.cancelled() => return None,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// The batches as a stream; ends when the poller is stopped.
    pub fn listen(self) -> impl Stream<Item = Vec<Update>> {
        futures::stream::unfold(self, |mut poller| async move {
            poller.next_batch().await.map(|batch| (batch, poller))
        })
    }
}

/// Convenience: batches as `Arc<Update>` items ready for `Dispatcher::feed`.
pub fn updates_of(batch: Vec<Update>) -> impl Iterator<Item = Arc<Update>> {
    batch.into_iter().map(Arc::new)
}
