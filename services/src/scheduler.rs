//! Named periodic jobs.
//!
//! Every tick runs on its own task behind the job's run-lock: when the
//! previous tick is still running the new one is skipped, so a job never
//! overlaps itself. Different jobs share nothing and run independently.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

pub struct PeriodicJob {
    name: &'static str,
    period: Duration,
    running: Mutex<()>,
}

impl PeriodicJob {
    pub fn new(name: &'static str, period: Duration) -> Self {
        Self {
            name,
            period,
            running: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Runs one tick unless the previous one still holds the run-lock.
    ///
    /// Returns `None` when the tick was skipped.
    pub async fn run_once<F, Fut, T>(&self, tick: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let Ok(_running) = self.running.try_lock() else {
            debug!(job = self.name, "Previous tick still running, skipping");
            return None;
        };
        Some(tick().await)
    }

    /// Starts the job loop on the runtime. The first tick fires immediately.
    pub fn spawn<F, Fut>(self, tick: F) -> JoinHandle<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let job = Arc::new(self);
        let tick = Arc::new(tick);

        tokio::spawn(async move {
            info!(
                job = job.name,
                period_secs = job.period.as_secs(),
                "Starting periodic job"
            );

            let mut timer = interval(job.period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                timer.tick().await;

                let job = Arc::clone(&job);
                let tick = Arc::clone(&tick);
                tokio::spawn(async move {
                    job.run_once(|| (*tick)()).await;
                });
            }
        })
    }
}
