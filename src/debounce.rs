use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;

pub const SEARCH_QUIET_PERIOD: Duration = Duration::from_millis(500);

/// Runs only the most recently scheduled action, once the quiet period has
/// passed without a newer one. Dropping the debouncer cancels whatever is
/// still pending.
#[derive(Debug)]
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

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action.await;
        });
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = pending.replace(handle) {
            previous.abort();
        }
    }

    pub fn cancel(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = pending.take() {
            previous.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        let pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(SEARCH_QUIET_PERIOD)
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
    use tokio::time::sleep;

    fn recorder() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn push(
        log: &Arc<Mutex<Vec<String>>>,
        value: &str,
    ) -> impl Future<Output = ()> + Send + 'static {
        let log = log.clone();
        let value = value.to_string();
        async move {
            log.lock().unwrap().push(value);
        }
    }

    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn only_the_last_input_in_the_window_fires() {
        let log = recorder();
        let debouncer = Debouncer::default();

        debouncer.schedule(push(&log, "b"));
        sleep(Duration::from_millis(200)).await;
        debouncer.schedule(push(&log, "ba"));
        sleep(Duration::from_millis(300)).await;
        debouncer.schedule(push(&log, "bat"));
        settle().await;
        assert!(log.lock().unwrap().is_empty());
        assert!(debouncer.is_pending());

        sleep(Duration::from_millis(501)).await;
        settle().await;
        assert_eq!(*log.lock().unwrap(), vec!["bat".to_string()]);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn separate_windows_each_fire() {
        let log = recorder();
        let debouncer = Debouncer::new(Duration::from_millis(100));

        debouncer.schedule(push(&log, "one"));
        sleep(Duration::from_millis(150)).await;
        settle().await;
        debouncer.schedule(push(&log, "two"));
        sleep(Duration::from_millis(150)).await;
        settle().await;
        assert_eq!(
            *log.lock().unwrap(),
            vec!["one".to_string(), "two".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_and_drop_prevent_firing() {
        let log = recorder();
        let debouncer = Debouncer::default();
        debouncer.schedule(push(&log, "cancelled"));
        debouncer.cancel();
        assert!(!debouncer.is_pending());

        let dropped = Debouncer::default();
        dropped.schedule(push(&log, "dropped"));
        drop(dropped);

        sleep(Duration::from_secs(2)).await;
        settle().await;
        assert!(log.lock().unwrap().is_empty());
    }
}
