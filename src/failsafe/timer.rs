use core::time::Duration;

use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::debug;

/// Events the platform posts back to the node's event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformEvent {
    FailSafeTimerExpired,
}

/// Posts [`PlatformEvent::FailSafeTimerExpired`] when the armed duration
/// elapses. Only one timer runs at a time, starting it again replaces it.
pub struct FailSafeTimer {
    sender: Sender<PlatformEvent>,
    task: Option<JoinHandle<()>>,
}

impl FailSafeTimer {
    pub fn new(sender: Sender<PlatformEvent>) -> Self {
        Self { sender, task: None }
    }

    /// Start the timer. Must be called from within a tokio runtime.
    pub fn start(&mut self, expiry: Duration) {
        self.cancel();
        let sender = self.sender.clone();
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(expiry).await;
            if sender.send(PlatformEvent::FailSafeTimerExpired).await.is_err() {
                debug!("Event loop gone, dropping fail-safe expiry");
            }
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for FailSafeTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use tokio::{sync::mpsc, time::Instant};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_once_after_expiry() {
        let (sender, mut receiver) = mpsc::channel(4);
        let mut timer = FailSafeTimer::new(sender);
        let start = Instant::now();
        timer.start(Duration::from_secs(60));

        assert_eq!(receiver.recv().await, Some(PlatformEvent::FailSafeTimerExpired));
        assert!(start.elapsed() >= Duration::from_secs(60));
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_previous_timer() {
        let (sender, mut receiver) = mpsc::channel(4);
        let mut timer = FailSafeTimer::new(sender);
        let start = Instant::now();
        timer.start(Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(30)).await;
        timer.start(Duration::from_secs(60));

        assert_eq!(receiver.recv().await, Some(PlatformEvent::FailSafeTimerExpired));
        assert!(start.elapsed() >= Duration::from_secs(90));
        assert!(!timer.is_running() || receiver.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let (sender, mut receiver) = mpsc::channel(4);
        let mut timer = FailSafeTimer::new(sender);
        timer.start(Duration::from_secs(60));
        timer.cancel();
        assert!(!timer.is_running());
        drop(timer);
        // All senders gone and nothing sent
        assert_eq!(receiver.recv().await, None);
    }
}
