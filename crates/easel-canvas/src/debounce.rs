//! Trailing debounce with an immediate reset
//!
//! [`Debouncer::set`] updates the live value and restarts a timer; when the
//! timer fires without being superseded the value is published as the
//! debounced value. [`Debouncer::reset_now`] cancels the timer and sets both
//! values at once.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::trace;

/// Debounced value holder
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    live: Mutex<T>,
    debounced: Arc<watch::Sender<T>>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl<T> Debouncer<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a debouncer starting at `initial`
    #[must_use]
    pub fn new(initial: T, delay: Duration) -> Self {
        let (tx, _) = watch::channel(initial.clone());
        Self {
            delay,
            live: Mutex::new(initial),
            debounced: Arc::new(tx),
            pending: Mutex::new(None),
        }
    }

    /// Debounce delay
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Current live value
    #[must_use]
    pub fn live(&self) -> T {
        self.live.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Current debounced value
    #[must_use]
    pub fn debounced(&self) -> T {
        self.debounced.borrow().clone()
    }

    /// Receiver notified every time the debounced value is published
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.debounced.subscribe()
    }

    /// Set the live value and (re)start the trailing timer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn set(&self, value: T) {
        *self.live.lock().unwrap_or_else(|e| e.into_inner()) = value.clone();

        let tx = Arc::clone(&self.debounced);
        let delay = self.delay;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            trace!("debounce timer fired");
            tx.send_replace(value);
        });

        if let Some(previous) = self.swap_pending(Some(timer)) {
            previous.abort();
        }
    }

    /// Cancel any pending timer and set live and debounced values at once
    pub fn reset_now(&self, value: T) {
        if let Some(previous) = self.swap_pending(None) {
            previous.abort();
        }
        *self.live.lock().unwrap_or_else(|e| e.into_inner()) = value.clone();
        self.debounced.send_replace(value);
    }

    /// Whether a timer is waiting to publish
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn swap_pending(&self, next: Option<JoinHandle<()>>) -> Option<JoinHandle<()>> {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *pending, next)
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        let pending = self.pending.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = pending.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(500);

    #[tokio::test(start_paused = true)]
    async fn test_trailing_value_published_after_delay() {
        let debouncer = Debouncer::new(String::new(), DELAY);
        let mut rx = debouncer.subscribe();

        debouncer.set("a".to_string());
        assert_eq!(debouncer.live(), "a");
        assert_eq!(debouncer.debounced(), "");
        assert!(debouncer.is_pending());

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), "a");
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseding_edit_restarts_timer() {
        let debouncer = Debouncer::new(String::new(), DELAY);
        let mut rx = debouncer.subscribe();

        debouncer.set("a".to_string());
        tokio::time::sleep(Duration::from_millis(300)).await;
        debouncer.set("ab".to_string());
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(debouncer.debounced(), "");

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), "ab");

        tokio::time::sleep(DELAY * 2).await;
        assert!(!rx.has_changed().unwrap(), "superseded value must not publish");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_now_cancels_pending_timer() {
        let debouncer = Debouncer::new(String::new(), DELAY);
        let mut rx = debouncer.subscribe();

        debouncer.set("typed".to_string());
        debouncer.reset_now("selected".to_string());
        assert_eq!(debouncer.live(), "selected");
        assert_eq!(*rx.borrow_and_update(), "selected");

        tokio::time::sleep(DELAY * 2).await;
        assert!(!rx.has_changed().unwrap());
        assert_eq!(debouncer.debounced(), "selected");
    }
}
