//! 清扫调度器
//!
//! 注册为 `TaskKind::Periodic`。每个周期执行一次清扫，执行完才会等待下一个
//! tick；超时的一轮会跳过错过的 tick，而不是补跑。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::{Sweep, SweepReport};
use crate::core::DiningResult;
use crate::utils::Clock;

/// Clears the in-progress flag when a run ends, including on panic
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Periodic runner for one [`Sweep`]
#[derive(Clone)]
pub struct Sweeper {
    sweep: Arc<dyn Sweep>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    running: Arc<AtomicBool>,
}

impl Sweeper {
    pub fn new(sweep: Arc<dyn Sweep>, clock: Arc<dyn Clock>, interval: Duration) -> Self {
        Self {
            sweep,
            clock,
            interval,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.sweep.name()
    }

    /// Run one sweep now
    ///
    /// Returns `None` without sweeping if a run of this sweeper is already in
    /// flight.
    pub fn run_once(&self) -> Option<DiningResult<SweepReport>> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(sweep = self.name(), "Sweep already running, tick skipped");
            return None;
        }
        let _guard = RunGuard(&self.running);
        Some(self.sweep.sweep(self.clock.now_millis()))
    }

    /// One scheduled tick; failures are logged and swallowed
    ///
    /// The sweep runs on the blocking pool since `begin_write` waits for the
    /// single writer.
    async fn tick(&self) {
        let sweeper = self.clone();
        let outcome = match tokio::task::spawn_blocking(move || sweeper.run_once()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(sweep = self.name(), error = %e, "Sweep task aborted, retrying next tick");
                return;
            }
        };
        match outcome {
            Some(Ok(report)) if report.is_empty() => {
                tracing::debug!(sweep = self.name(), "Nothing expired");
            }
            Some(Ok(report)) => {
                tracing::info!(
                    sweep = self.name(),
                    carts_deleted = report.carts_deleted,
                    items_deleted = report.items_deleted,
                    tables_released = report.tables_released,
                    "Sweep completed"
                );
            }
            Some(Err(e)) => {
                tracing::error!(sweep = self.name(), error = %e, "Sweep failed, retrying next tick");
            }
            None => {}
        }
    }

    /// Tick until `shutdown` is cancelled
    ///
    /// The first tick fires immediately. Cancellation is observed between
    /// ticks; a tick in progress always finishes its transaction.
    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(
            sweep = self.name(),
            interval_secs = self.interval.as_secs(),
            "Sweeper started"
        );

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(sweep = self.name(), "Sweeper received shutdown signal");
                    break;
                }
                _ = interval.tick() => self.tick().await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DiningError;
    use crate::utils::ManualClock;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;
    use std::sync::Mutex;

    /// Fails on its first call, succeeds afterwards
    #[derive(Default)]
    struct FlakySweep {
        calls: AtomicUsize,
    }

    impl Sweep for FlakySweep {
        fn name(&self) -> &'static str {
            "flaky"
        }

        fn sweep(&self, _now: i64) -> DiningResult<SweepReport> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(DiningError::validation("store unavailable"));
            }
            Ok(SweepReport::default())
        }
    }

    /// Blocks inside the sweep until released
    struct BlockingSweep {
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl Sweep for BlockingSweep {
        fn name(&self) -> &'static str {
            "blocking"
        }

        fn sweep(&self, _now: i64) -> DiningResult<SweepReport> {
            self.entered.lock().unwrap().send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
            Ok(SweepReport {
                carts_deleted: 1,
                ..Default::default()
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_tick_does_not_stop_scheduler() {
        let sweep = Arc::new(FlakySweep::default());
        let sweeper = Sweeper::new(
            sweep.clone(),
            Arc::new(ManualClock::new(0)),
            Duration::from_secs(60),
        );
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(sweeper.run(shutdown.clone()));

        // ticks at 0s, 60s, 120s
        tokio::time::sleep(Duration::from_secs(150)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert_eq!(sweep.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_overlapping_run_is_skipped() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let sweeper = Sweeper::new(
            Arc::new(BlockingSweep {
                entered: Mutex::new(entered_tx),
                release: Mutex::new(release_rx),
            }),
            Arc::new(ManualClock::new(0)),
            Duration::from_secs(60),
        );

        std::thread::scope(|scope| {
            let first = {
                let sweeper = sweeper.clone();
                scope.spawn(move || sweeper.run_once())
            };
            entered_rx.recv().unwrap();

            assert!(sweeper.run_once().is_none());

            release_tx.send(()).unwrap();
            let report = first.join().unwrap().unwrap().unwrap();
            assert_eq!(report.carts_deleted, 1);
        });

        // guard cleared: the next run proceeds
        release_tx.send(()).unwrap();
        assert!(sweeper.run_once().is_some());
    }

    #[tokio::test]
    async fn test_blocked_sweep_leaves_runtime_free() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let sweeper = Sweeper::new(
            Arc::new(BlockingSweep {
                entered: Mutex::new(entered_tx),
                release: Mutex::new(release_rx),
            }),
            Arc::new(ManualClock::new(0)),
            Duration::from_secs(60),
        );
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(sweeper.clone().run(shutdown.clone()));

        // this task keeps getting polled while the first tick is stuck in the store
        while entered_rx.try_recv().is_err() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(sweeper.run_once().is_none());

        release_tx.send(()).unwrap();
        while sweeper.running.load(Ordering::Acquire) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        shutdown.cancel();
        handle.await.unwrap();
    }
}
