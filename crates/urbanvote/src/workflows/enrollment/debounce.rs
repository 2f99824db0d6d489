//! Debounced async lookups with cancellation. A new input event for the
//! same field aborts the in-flight task before scheduling the next one, so
//! a stale geocoding result can never reach a draft that has moved on.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

pub struct Debouncer {
    delay: Duration,
    in_flight: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: None,
        }
    }

    /// Schedules `task` to run after the configured delay, cancelling any
    /// previously scheduled task. The cancelled task's result is discarded
    /// even if it was already executing.
    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let delay = self.delay;
        self.in_flight = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        }));
    }

    /// Aborts the in-flight task, if any. Called automatically on drop so
    /// abandoning a wizard mid-lookup discards the pending result.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn only_latest_task_runs() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(30));

        for _ in 0..4 {
            let counter = counter.clone();
            debouncer.spawn(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancel_discards_pending_task() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(20));

        {
            let counter = counter.clone();
            debouncer.spawn(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        debouncer.cancel();
        assert!(!debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn drop_aborts_in_flight_lookup() {
        let counter = Arc::new(AtomicUsize::new(0));

        {
            let counter = counter.clone();
            let mut debouncer = Debouncer::new(Duration::from_millis(20));
            debouncer.spawn(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
