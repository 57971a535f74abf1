//! Cancellable periodic task.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Lifecycle of a [`PeriodicTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Stopped,
    Running,
    Paused,
}

/// Runs a job on a fixed period from a single tokio task.
///
/// Pausing only stops new runs from starting; a run already in progress is
/// left to finish. Stopping aborts the task. Dropping the handle stops it.
pub struct PeriodicTask {
    period: Duration,
    state: watch::Sender<TaskState>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl PeriodicTask {
    pub fn new(period: Duration) -> Self {
        let (state, _) = watch::channel(TaskState::Stopped);
        Self {
            period,
            state,
            handle: Mutex::new(None),
        }
    }

    pub fn state(&self) -> TaskState {
        *self.state.borrow()
    }

    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Start ticking. The first run happens one period from now.
    ///
    /// Does nothing unless the task is stopped; use [`Self::resume`] after a
    /// pause.
    pub fn start<F, Fut>(&self, job: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.state() != TaskState::Stopped {
            return;
        }

        let mut state = self.state.subscribe();
        let period = self.period;
        self.state.send_replace(TaskState::Running);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if *state.borrow() == TaskState::Running {
                            job().await;
                        }
                    }
                    changed = state.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        match *state.borrow_and_update() {
                            TaskState::Stopped => break,
                            TaskState::Running => interval.reset(),
                            TaskState::Paused => {}
                        }
                    }
                }
            }
        });

        let previous = self.lock_handle().replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
        tracing::debug!("Periodic task started with period {:?}", period);
    }

    /// Pause a running task. Returns whether it was running, so the caller
    /// can resume only what it paused.
    pub fn pause(&self) -> bool {
        let paused = self.state.send_if_modified(|state| {
            if *state == TaskState::Running {
                *state = TaskState::Paused;
                true
            } else {
                false
            }
        });
        if paused {
            tracing::debug!("Periodic task paused");
        }
        paused
    }

    /// Resume a paused task; the next run is one full period away.
    pub fn resume(&self) {
        let resumed = self.state.send_if_modified(|state| {
            if *state == TaskState::Paused {
                *state = TaskState::Running;
                true
            } else {
                false
            }
        });
        if resumed {
            tracing::debug!("Periodic task resumed");
        }
    }

    pub fn stop(&self) {
        self.state.send_replace(TaskState::Stopped);
        if let Some(handle) = self.lock_handle().take() {
            handle.abort();
            tracing::debug!("Periodic task stopped");
        }
    }

    fn lock_handle(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.handle
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        if let Some(handle) = self.lock_handle().take() {
            handle.abort();
        }
    }
}
