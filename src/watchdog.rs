//! Per-fetch deadline enforcement
//!
//! The operation runs on its own task while the caller's task waits on a
//! deadline timer. Whichever finishes first decides the outcome:
//!
//! - operation first: its result is returned and the timer is dropped;
//! - deadline first: `on_timeout` runs on the caller's task, the operation's
//!   [`CancellationToken`] is cancelled, and the task is detached. Whatever it
//!   eventually produces is discarded.
//!
//! The select is biased toward the operation, so a result that is ready in
//! the same poll as the deadline counts as a success.
//!
//! Cancellation is cooperative. Fetchers that watch the token abort their
//! in-flight request; fetchers that ignore it keep running in the background
//! until they finish on their own.

use crate::error::FetchError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Deadline wrapper around a single fetch
#[derive(Clone, Copy, Debug)]
pub struct Watchdog {
    deadline: Duration,
}

impl Watchdog {
    /// Create a watchdog with the given deadline
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }

    /// The deadline applied to each operation
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Run `operation` under the deadline.
    ///
    /// `operation` receives the token it should watch for cancellation.
    /// `on_timeout` is invoked at most once, on the calling task, before
    /// [`FetchError::TimedOut`] is returned.
    pub async fn run<T, F, Fut, H>(&self, operation: F, on_timeout: H) -> Result<T, FetchError>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
        T: Send + 'static,
        H: FnOnce(),
    {
        let cancel = CancellationToken::new();
        let mut task = tokio::spawn(operation(cancel.clone()));
        let timer = tokio::time::sleep(self.deadline);
        tokio::pin!(timer);

        tokio::select! {
            biased;

            joined = &mut task => match joined {
                Ok(result) => result,
                Err(e) => Err(FetchError::Other(format!("fetch task failed: {e}"))),
            },
            _ = &mut timer => {
                on_timeout();
                cancel.cancel();
                // Dropping the handle detaches the task; its outcome is never observed.
                drop(task);
                Err(FetchError::TimedOut {
                    after: self.deadline,
                })
            }
        }
    }
}
