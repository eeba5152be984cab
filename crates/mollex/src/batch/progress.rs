use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::time::MissedTickBehavior;
use tracing::info;

/// Completed-job counter shared between workers and the reporter.
#[derive(Debug, Clone, Default)]
pub struct ProgressCounter {
    completed: Arc<AtomicUsize>,
}

impl ProgressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one finished job.
    pub fn complete_one(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

/// Poll `counter` every `period`, logging `<done>/<total>`, until all jobs are done.
///
/// Returns the number of progress lines emitted.
pub async fn report_progress(counter: ProgressCounter, total: usize, period: Duration) -> usize {
    let mut ticker = tokio::time::interval(period.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut reports = 0;
    loop {
        ticker.tick().await;
        let done = counter.completed().min(total);
        info!(target: "mollex::progress", "{done}/{total}");
        reports += 1;
        if done == total {
            return reports;
        }
    }
}
