//! Supervised periodic tasks.
//!
//! A [`PeriodicTask`] runs a job on a fixed period until cancelled. Each run
//! is spawned on its own, so a run that never finishes holds back only its
//! own effects and the next tick still fires on time. Job failures never
//! stop the task: each one is logged with the task name and counted in
//! [`TaskStats`] once the run finishes. With a backoff cap configured, the
//! delay doubles after each consecutive failure (up to the cap) and snaps
//! back to the period after a success.

use crate::types::BridgeError;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// `tokio::time::interval` rejects a zero period
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Scheduling policy for a periodic task
#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    pub period: Duration,
    pub max_backoff: Option<Duration>,
}

impl Schedule {
    pub fn every(period: Duration) -> Self {
        Self {
            period,
            max_backoff: None,
        }
    }

    pub fn with_max_backoff(mut self, max_backoff: Option<Duration>) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// Delay before the next run after `consecutive_failures` failures in a row
    pub fn delay(&self, consecutive_failures: u64) -> Duration {
        let Some(cap) = self.max_backoff else {
            return self.period;
        };
        if consecutive_failures == 0 {
            return self.period;
        }

        let factor = 1u32 << consecutive_failures.min(16);
        self.period.saturating_mul(factor).min(cap.max(self.period))
    }
}

/// Counters reported by a periodic task
#[derive(Debug, Default)]
pub struct TaskStats {
    runs: AtomicU64,
    failures: AtomicU64,
    consecutive_failures: AtomicU64,
}

impl TaskStats {
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn consecutive_failures(&self) -> u64 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    fn record(&self, result: &Result<(), BridgeError>) -> u64 {
        self.runs.fetch_add(1, Ordering::Relaxed);
        match result {
            Ok(()) => {
                self.consecutive_failures.store(0, Ordering::Relaxed);
                0
            }
            Err(_) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1
            }
        }
    }
}

/// Handle to a running periodic task
pub struct PeriodicTask {
    name: &'static str,
    token: CancellationToken,
    stats: Arc<TaskStats>,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// Spawn `job` on the current runtime. The first run happens one period
    /// after spawning; every later tick starts a new run whether or not the
    /// previous one has finished.
    pub fn spawn<F, Fut>(
        name: &'static str,
        schedule: Schedule,
        token: CancellationToken,
        mut job: F,
    ) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BridgeError>> + Send + 'static,
    {
        let stats = Arc::new(TaskStats::default());
        let task_stats = stats.clone();
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            debug!(task = name, period = ?schedule.period, "Periodic task started");
            let period = schedule.period.max(MIN_PERIOD);
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut runs = JoinSet::new();

            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    Some(joined) = runs.join_next() => {
                        if let Err(e) = joined {
                            warn!(task = name, "Periodic run ended abnormally: {}", e);
                        }
                        continue;
                    }
                    _ = ticker.tick() => {}
                }

                let backoff = schedule
                    .delay(task_stats.consecutive_failures())
                    .saturating_sub(schedule.period);
                if !backoff.is_zero() {
                    tokio::select! {
                        _ = task_token.cancelled() => break,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    ticker.reset();
                }

                let run = job();
                let run_stats = task_stats.clone();
                runs.spawn(async move {
                    let result = run.await;
                    let consecutive = run_stats.record(&result);
                    if let Err(e) = result {
                        warn!(task = name, consecutive, "Periodic task failed: {}", e);
                    }
                });
            }

            // In-flight runs belong to this task and stop with it
            runs.shutdown().await;
            debug!(task = name, "Periodic task stopped");
        });

        Self {
            name,
            token,
            stats,
            handle,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn stats(&self) -> Arc<TaskStats> {
        self.stats.clone()
    }

    /// Cancel and wait for the task to stop
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            warn!(task = self.name, "Periodic task ended abnormally: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_without_backoff() {
        let schedule = Schedule::every(Duration::from_secs(2));
        assert_eq!(schedule.delay(0), Duration::from_secs(2));
        assert_eq!(schedule.delay(5), Duration::from_secs(2));
    }

    #[test]
    fn test_delay_with_backoff_is_capped() {
        let schedule = Schedule::every(Duration::from_secs(2))
            .with_max_backoff(Some(Duration::from_secs(10)));

        assert_eq!(schedule.delay(0), Duration::from_secs(2));
        assert_eq!(schedule.delay(1), Duration::from_secs(4));
        assert_eq!(schedule.delay(2), Duration::from_secs(8));
        assert_eq!(schedule.delay(3), Duration::from_secs(10));
        assert_eq!(schedule.delay(60), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_failures_are_counted_and_task_keeps_running() {
        let token = CancellationToken::new();
        let counter = Arc::new(AtomicU64::new(0));
        let job_counter = counter.clone();

        let task = PeriodicTask::spawn(
            "flaky",
            Schedule::every(Duration::from_millis(5)),
            token,
            move || {
                let run = job_counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if run % 2 == 0 {
                        Err(BridgeError::StateFetch("not yet".into()))
                    } else {
                        Ok(())
                    }
                }
            },
        );

        let stats = task.stats();
        while stats.runs() < 4 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        task.shutdown().await;

        assert!(stats.failures() >= 2);
        assert!(counter.load(Ordering::SeqCst) >= 4);
    }

    #[tokio::test]
    async fn test_cancel_stops_task() {
        let token = CancellationToken::new();
        let task = PeriodicTask::spawn(
            "idle",
            Schedule::every(Duration::from_secs(3600)),
            token.clone(),
            || async { Ok(()) },
        );

        token.cancel();
        let stats = task.stats();
        task.shutdown().await;
        assert_eq!(stats.runs(), 0);
    }

    #[tokio::test]
    async fn test_hung_run_does_not_stall_later_ticks() {
        let token = CancellationToken::new();
        let calls = Arc::new(AtomicU64::new(0));
        let job_calls = calls.clone();

        let task = PeriodicTask::spawn(
            "hung-first-fetch",
            Schedule::every(Duration::from_millis(20)),
            token,
            move || {
                let call = job_calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call == 0 {
                        std::future::pending::<()>().await;
                    }
                    Ok::<(), BridgeError>(())
                }
            },
        );

        let stats = task.stats();
        tokio::time::timeout(Duration::from_secs(5), async {
            while stats.runs() < 3 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("later ticks never fired");

        // The hung run is aborted along with the task
        tokio::time::timeout(Duration::from_secs(1), task.shutdown())
            .await
            .expect("shutdown waited on the hung run");

        assert!(calls.load(Ordering::SeqCst) >= 4);
        assert_eq!(stats.failures(), 0);
    }

    #[tokio::test]
    async fn test_backoff_spaces_out_failing_runs() {
        let token = CancellationToken::new();
        let calls = Arc::new(AtomicU64::new(0));
        let job_calls = calls.clone();

        let task = PeriodicTask::spawn(
            "always-failing",
            Schedule::every(Duration::from_millis(10))
                .with_max_backoff(Some(Duration::from_secs(3600))),
            token,
            move || {
                job_calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), BridgeError>(BridgeError::StateFetch("down".into())) }
            },
        );

        // After one failure the next run waits 20ms, then 40ms, 80ms...
        tokio::time::sleep(Duration::from_millis(200)).await;
        let stats = task.stats();
        task.shutdown().await;

        let calls = calls.load(Ordering::SeqCst);
        assert!(calls >= 1);
        assert!(calls <= 6, "backoff ignored: {} runs", calls);
        assert_eq!(stats.failures(), stats.runs());
    }
}
