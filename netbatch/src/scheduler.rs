//! Fixed-interval inspection loop.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures_util::FutureExt;
use log::{error, info, warn};
use tokio::time::MissedTickBehavior;

use crate::batch::panic_message;
use crate::engine::Engine;
use crate::session::SessionProvider;

/// What one tick did, per group.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Groups inspected to completion.
    pub completed: Vec<String>,

    /// Groups skipped because a batch was still running.
    pub skipped: Vec<String>,

    /// Groups whose batch panicked, with the panic message.
    pub panicked: Vec<(String, String)>,
}

/// Runs `run_batch_inspect` for a set of groups every `interval`.
pub struct Scheduler<'a, P> {
    engine: &'a Engine<P>,
    interval: Duration,
    groups: Vec<String>,
    error_pause: Duration,
}

impl<'a, P: SessionProvider> Scheduler<'a, P> {
    /// Scheduler over every registry group.
    pub fn new(engine: &'a Engine<P>, interval: Duration) -> Self {
        Self {
            engine,
            interval: interval.max(Duration::from_secs(1)),
            groups: Vec::new(),
            error_pause: Duration::from_secs(60),
        }
    }

    /// Limit the loop to `groups`; empty means every registry group.
    pub fn with_groups(mut self, groups: Vec<String>) -> Self {
        self.groups = groups;
        self
    }

    /// How long to wait after a tick that panicked.
    pub fn with_error_pause(mut self, pause: Duration) -> Self {
        self.error_pause = pause;
        self
    }

    fn targets(&self) -> Vec<String> {
        if self.groups.is_empty() {
            self.engine.groups()
        } else {
            self.groups.clone()
        }
    }

    /// Inspect each target group once.
    pub async fn tick(&self) -> TickSummary {
        let mut summary = TickSummary::default();

        for group in self.targets() {
            let run = AssertUnwindSafe(self.engine.try_run_batch_inspect(&group)).catch_unwind();
            match run.await {
                Ok(Some(report)) => {
                    for device in report.needing_attention() {
                        warn!("{}/{}: {}", group, device.name, device.warnings.join("; "));
                    }
                    summary.completed.push(group);
                }
                Ok(None) => summary.skipped.push(group),
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!("{}: scheduled inspection panicked: {}", group, message);
                    summary.panicked.push((group, message));
                }
            }
        }

        summary
    }

    /// Tick until `shutdown` resolves. The first tick runs immediately.
    ///
    /// Missed ticks are skipped rather than bunched up. After a tick in which
    /// a group panicked the loop waits `error_pause` before going on.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        info!(
            "scheduled inspection every {:?} for {}",
            self.interval,
            if self.groups.is_empty() {
                "all groups".to_string()
            } else {
                self.groups.join(", ")
            }
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }

            info!("scheduled inspection starting");
            let summary = self.tick().await;
            info!(
                "scheduled inspection done: {} completed, {} skipped, {} failed",
                summary.completed.len(),
                summary.skipped.len(),
                summary.panicked.len()
            );

            if !summary.panicked.is_empty() {
                warn!("pausing scheduled inspection for {:?}", self.error_pause);
                tokio::select! {
                    _ = &mut shutdown => break,
                    _ = tokio::time::sleep(self.error_pause) => {}
                }
            }
        }

        info!("scheduled inspection stopped");
    }
}

/// Inspect `groups` (every group if empty) every `interval`, forever.
pub async fn run_scheduled_inspect<P: SessionProvider>(
    engine: &Engine<P>,
    interval: Duration,
    groups: Vec<String>,
) {
    Scheduler::new(engine, interval)
        .with_groups(groups)
        .run(std::future::pending())
        .await;
}
