use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Runs only the most recently scheduled task, once `delay` has passed
/// without another schedule.
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            task.await;
        });
        let previous = self
            .pending
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    pub fn cancel(&self) {
        if let Some(handle) = self
            .pending
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .take()
        {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
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
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter_task(counter: Arc<AtomicUsize>, value: usize) -> impl Future<Output = ()> {
        async move {
            counter.store(value, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn later_schedule_supersedes_pending_one() {
        let debouncer = Debouncer::new(Duration::from_millis(100));
        let seen = Arc::new(AtomicUsize::new(0));

        debouncer.schedule(counter_task(seen.clone(), 1));
        sleep(Duration::from_millis(60)).await;
        debouncer.schedule(counter_task(seen.clone(), 2));
        sleep(Duration::from_millis(60)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 0);
        assert!(debouncer.is_pending());

        sleep(Duration::from_millis(60)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_the_pending_task() {
        let debouncer = Debouncer::new(Duration::from_millis(100));
        let seen = Arc::new(AtomicUsize::new(0));
        debouncer.schedule(counter_task(seen.clone(), 7));
        debouncer.cancel();
        sleep(Duration::from_millis(250)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 0);
        assert!(!debouncer.is_pending());
    }
}
