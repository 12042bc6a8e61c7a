use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::SessionError;

/// Shortest period accepted; `tokio::time::interval` rejects zero.
const MIN_PERIOD: Duration = Duration::from_secs(1);

/// Periodic background job, run once immediately and then every `period`.
///
/// The task stops on [`RefreshTask::stop`] or when the handle is dropped.
/// A run in progress at cancellation is abandoned.
pub struct RefreshTask {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
    period: Duration,
}

impl RefreshTask {
    /// Spawn the task on the current tokio runtime.
    pub fn spawn<F, Fut>(period: Duration, mut job: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), SessionError>> + Send + 'static,
    {
        let period = period.max(MIN_PERIOD);
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(period_secs = period.as_secs(), "Background refresh started");

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                debug!("Background refresh tick");
                tokio::select! {
                    _ = token.cancelled() => break,
                    result = job() => {
                        if let Err(e) = result {
                            debug!(error = %e, "Background refresh skipped");
                        }
                    }
                }
            }

            info!("Background refresh stopped");
        });

        Self {
            cancel,
            handle: Some(handle),
            period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Request cancellation without waiting for the task to exit
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancel and wait for the task to exit
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for RefreshTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const PERIOD: Duration = Duration::from_secs(300);

    fn counting_job(counter: Arc<AtomicUsize>) -> impl FnMut() -> std::future::Ready<Result<(), SessionError>> {
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_immediately_then_every_period() {
        let counter = Arc::new(AtomicUsize::new(0));
        let task = RefreshTask::spawn(PERIOD, counting_job(counter.clone()));

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        tokio::time::sleep(PERIOD).await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        tokio::time::sleep(PERIOD).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);

        task.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_the_schedule() {
        let counter = Arc::new(AtomicUsize::new(0));
        let task = RefreshTask::spawn(PERIOD, counting_job(counter.clone()));

        tokio::time::sleep(Duration::from_millis(1)).await;
        task.stop();
        tokio::time::sleep(PERIOD * 3).await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!task.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let counter = Arc::new(AtomicUsize::new(0));
        let task = RefreshTask::spawn(PERIOD, counting_job(counter.clone()));
        tokio::time::sleep(Duration::from_millis(1)).await;

        drop(task);
        tokio::time::sleep(PERIOD * 2).await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_errors_do_not_stop_the_schedule() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let task = RefreshTask::spawn(PERIOD, move || {
            c.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Err(SessionError::MissingRefreshToken))
        });

        tokio::time::sleep(Duration::from_millis(1)).await;
        tokio::time::sleep(PERIOD).await;

        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert!(task.is_running());
        task.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_period_is_clamped() {
        let task = RefreshTask::spawn(Duration::ZERO, || std::future::ready(Ok(())));
        assert_eq!(task.period(), MIN_PERIOD);
        task.shutdown().await;
    }
}
