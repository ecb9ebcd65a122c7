//! Periodic background fetches.
//!
//! A poller runs one fetch per interval tick on its own tokio task and
//! publishes the outcome on a `watch` channel. Fetches never overlap: a slow
//! fetch delays the next tick instead of stacking requests. Dropping the
//! handle aborts the task; whatever the in-flight fetch returns is discarded.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use medstock_quarantine::QuarantineSummary;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::api::Backend;
use crate::error::{Alert, ClientError};

/// Latest state published by a poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poll<T> {
    /// Last successfully fetched value. Kept across failed fetches.
    pub value: Option<T>,
    /// Set when the most recent fetch failed, cleared by the next success.
    pub last_error: Option<Alert>,
    /// Number of fetches finished so far, successful or not.
    pub completed: u64,
}

impl<T> Default for Poll<T> {
    fn default() -> Self {
        Self {
            value: None,
            last_error: None,
            completed: 0,
        }
    }
}

pub struct PollHandle<T> {
    rx: watch::Receiver<Poll<T>>,
    task: JoinHandle<()>,
}

impl<T: Clone> PollHandle<T> {
    pub fn latest(&self) -> Poll<T> {
        self.rx.borrow().clone()
    }

    /// Wait for the next published result. Returns `false` once the polling
    /// task has gone away.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    pub fn stop(self) {}
}

impl<T> Drop for PollHandle<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Handle for the dashboard's quarantine summary poller.
pub type SummaryPoller = PollHandle<QuarantineSummary>;

/// Run `fetch` now and then once every `interval` until the handle is dropped.
pub fn spawn_poller<T, F, Fut>(interval: Duration, mut fetch: F) -> PollHandle<T>
where
    T: Send + Sync + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
{
    let (tx, rx) = watch::channel(Poll::default());

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let result = fetch().await;
            tx.send_modify(|poll| {
                poll.completed += 1;
                match result {
                    Ok(value) => {
                        poll.value = Some(value);
                        poll.last_error = None;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "poll failed");
                        poll.last_error = Some(Alert::from(&e));
                    }
                }
            });
            if tx.is_closed() {
                break;
            }
        }
    });

    PollHandle { rx, task }
}

pub fn summary_poller(backend: Arc<dyn Backend>, interval: Duration) -> SummaryPoller {
    tracing::debug!(interval_secs = interval.as_secs(), "starting quarantine summary poller");
    spawn_poller(interval, move || {
        let backend = backend.clone();
        async move { backend.quarantine_summary().await }
    })
}
