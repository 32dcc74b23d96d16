//! Background Production Task
//!
//! Lifecycle plumbing shared by every provider: one spawned production
//! loop per provider, cooperative cancellation through a
//! `CancellationToken`, and a `stop` that waits for the loop to exit.
//! Every `stop` caller waits, not only the first: the spawned loop holds a
//! drop guard on a second token that fires when the loop ends or panics.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{LifecycleState, ProviderError};

/// Owns the production loop of a single provider.
#[derive(Debug)]
pub struct ProductionTask {
    provider: &'static str,
    slot: Mutex<TaskSlot>,
}

#[derive(Debug)]
struct TaskSlot {
    state: LifecycleState,
    cancel: CancellationToken,
    finished: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ProductionTask {
    /// Create an idle task slot for the named provider.
    #[must_use]
    pub fn new(provider: &'static str) -> Self {
        Self {
            provider,
            slot: Mutex::new(TaskSlot {
                state: LifecycleState::NotStarted,
                cancel: CancellationToken::new(),
                finished: CancellationToken::new(),
                handle: None,
            }),
        }
    }

    /// Get the lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.slot.lock().state
    }

    /// Spawn the production loop built by `make`.
    ///
    /// Returns `Ok(false)` without calling `make` if the loop is already
    /// running.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Stopped` once the task has been stopped.
    pub fn start<F, Fut>(&self, make: F) -> Result<bool, ProviderError>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.slot.lock();
        match slot.state {
            LifecycleState::Running => return Ok(false),
            LifecycleState::Stopped => return Err(ProviderError::Stopped(self.provider)),
            LifecycleState::NotStarted => {}
        }

        let finished = slot.finished.clone().drop_guard();
        let production = make(slot.cancel.clone());
        slot.handle = Some(tokio::spawn(async move {
            let _finished = finished;
            production.await;
        }));
        slot.state = LifecycleState::Running;
        drop(slot);

        tracing::info!(provider = self.provider, "Production loop started");
        Ok(true)
    }

    /// Cancel the production loop and wait for it to finish.
    ///
    /// Concurrent callers all wait; only the first reports the outcome.
    pub async fn stop(&self) {
        let (handle, finished) = {
            let mut slot = self.slot.lock();
            if slot.state == LifecycleState::NotStarted {
                slot.finished.cancel();
            }
            slot.state = LifecycleState::Stopped;
            slot.cancel.cancel();
            (slot.handle.take(), slot.finished.clone())
        };

        let Some(handle) = handle else {
            finished.cancelled().await;
            return;
        };

        if let Err(e) = handle.await {
            tracing::error!(provider = self.provider, error = %e, "Production loop failed");
        } else {
            tracing::info!(provider = self.provider, "Production loop stopped");
        }
    }
}

/// Sleep for `duration` unless cancelled first.
///
/// Returns `false` if the token was cancelled.
pub async fn sleep_or_cancel(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    #[tokio::test]
    async fn start_runs_until_stopped() {
        let task = ProductionTask::new("test");
        let exited = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&exited);

        let started = task
            .start(|cancel| async move {
                cancel.cancelled().await;
                flag.store(true, Ordering::SeqCst);
            })
            .unwrap();
        assert!(started);
        assert_eq!(task.state(), LifecycleState::Running);

        task.stop().await;
        assert!(exited.load(Ordering::SeqCst));
        assert_eq!(task.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn second_start_is_noop() {
        let task = ProductionTask::new("test");
        assert!(task.start(|c| async move { c.cancelled().await }).unwrap());
        assert!(!task.start(|_| async {}).unwrap());
        task.stop().await;
    }

    #[tokio::test]
    async fn start_after_stop_fails() {
        let task = ProductionTask::new("test");
        task.start(|c| async move { c.cancelled().await }).unwrap();
        task.stop().await;

        let result = task.start(|_| async {});
        assert!(matches!(result, Err(ProviderError::Stopped("test"))));
    }

    #[tokio::test]
    async fn stop_is_safe_in_any_state() {
        let task = ProductionTask::new("test");
        task.stop().await;
        task.stop().await;
        assert_eq!(task.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn overlapping_stops_both_wait_for_exit() {
        let task = ProductionTask::new("test");
        let exited = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&exited);

        task.start(|cancel| async move {
            cancel.cancelled().await;
            tokio::time::sleep(Duration::from_millis(100)).await;
            flag.store(true, Ordering::SeqCst);
        })
        .unwrap();

        let first = async {
            task.stop().await;
            exited.load(Ordering::SeqCst)
        };
        let second = async {
            task.stop().await;
            exited.load(Ordering::SeqCst)
        };
        let (first_saw_exit, second_saw_exit) = tokio::join!(first, second);

        assert!(first_saw_exit);
        assert!(second_saw_exit);
    }

    #[tokio::test]
    async fn stop_waits_for_panicked_loop() {
        let task = ProductionTask::new("test");
        task.start(|cancel| async move {
            cancel.cancelled().await;
            panic!("production loop failure");
        })
        .unwrap();

        let (first, second) = tokio::join!(
            tokio::time::timeout(Duration::from_secs(1), task.stop()),
            tokio::time::timeout(Duration::from_secs(1), task.stop()),
        );
        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(task.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn sleep_or_cancel_reports_cancellation() {
        let cancel = CancellationToken::new();
        assert!(sleep_or_cancel(&cancel, Duration::from_millis(1)).await);

        cancel.cancel();
        assert!(!sleep_or_cancel(&cancel, Duration::from_secs(3600)).await);
    }
}
