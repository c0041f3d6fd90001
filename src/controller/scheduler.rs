//! Cancellable background tasks
//!
//! Every remote call and every delayed follow-up runs as a tokio task
//! tracked here. `cancel_all()` aborts whatever is still running; it is
//! called on session reset and when the scheduler is dropped.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

/// Owner of the controller's in-flight tasks and timers
#[derive(Debug, Default)]
pub struct Scheduler {
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` now
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.prune();
        self.handles.push(tokio::spawn(task));
    }

    /// Run `task` after `delay`
    pub fn schedule<F>(&mut self, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        debug!(delay_ms = delay.as_millis() as u64, "timer scheduled");
        self.spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });
    }

    /// Abort every task that has not finished yet
    pub fn cancel_all(&mut self) {
        let mut aborted = 0usize;
        for handle in self.handles.drain(..) {
            if !handle.is_finished() {
                handle.abort();
                aborted += 1;
            }
        }
        if aborted > 0 {
            debug!(aborted, "cancelled background tasks");
        }
    }

    /// Number of tasks still running (including sleeping timers)
    pub fn active(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    fn prune(&mut self) {
        self.handles.retain(|h| !h.is_finished());
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
