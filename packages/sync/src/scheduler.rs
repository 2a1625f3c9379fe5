//! Periodic cycle driver.

use std::future::Future;
use std::time::Duration;

use crate::pipeline::Pipeline;

/// Runs [`Pipeline::run_cycle`] every `interval` until shut down.
#[derive(Debug)]
pub struct Scheduler {
    pipeline: Pipeline,
    interval: Duration,
}

impl Scheduler {
    /// Creates a scheduler driving `pipeline`.
    #[must_use]
    pub const fn new(pipeline: Pipeline, interval: Duration) -> Self {
        Self { pipeline, interval }
    }

    /// The driven pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Waits `interval`, runs a cycle, and repeats until `shutdown`
    /// resolves. The interval is measured from the end of one cycle to the
    /// start of the next. Cycle errors are logged and the loop continues.
    ///
    /// A cycle still in flight when `shutdown` resolves is abandoned.
    pub async fn run(&mut self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);

        log::info!("Scheduler started, interval {}s", self.interval.as_secs());

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                () = tokio::time::sleep(self.interval) => {}
            }

            tokio::select! {
                () = &mut shutdown => {
                    log::warn!("Shutdown requested during a cycle, abandoning it");
                    break;
                }
                result = self.pipeline.run_cycle() => {
                    if let Err(e) = result {
                        log::error!("Sync cycle failed at {} stage: {e}", e.stage());
                    }
                }
            }
        }

        log::info!("Scheduler stopped");
    }
}
