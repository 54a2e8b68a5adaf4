use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

/// Detached tasks spawned by one cache, with a way to wait for all of them
#[derive(Clone, Default)]
pub(crate) struct BackgroundTasks {
    pending: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

struct PendingGuard {
    pending: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

impl BackgroundTasks {
    /// Spawn `task` outside the caller's cancellation scope
    pub(crate) fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.pending.fetch_add(1, Ordering::AcqRel);
        let guard = PendingGuard {
            pending: Arc::clone(&self.pending),
            idle: Arc::clone(&self.idle),
        };
        tokio::spawn(async move {
            let _guard = guard;
            task.await;
        });
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Resolve once no spawned task is running
    pub(crate) async fn wait_idle(&self) {
        loop {
            // Register before checking so a finishing task can't slip between
            let notified = self.idle.notified();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}
