//! Live admin view of every active student.

use crate::client::{DashboardPoll, DetectionClient};
use examguard_common::protocol::{DashboardEntry, RiskStatus};
use examguard_common::risk::{RiskBand, bar_width_percent};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

/// One rendered dashboard row. `band` comes from the score alone.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardRow {
    pub student_id: String,
    pub score: f64,
    pub status: RiskStatus,
    pub band: RiskBand,
    pub bar_width: u8,
}

impl From<&DashboardEntry> for DashboardRow {
    fn from(entry: &DashboardEntry) -> Self {
        Self {
            student_id: entry.student_id.clone(),
            score: entry.score,
            status: entry.status,
            band: RiskBand::from_score(entry.score),
            bar_width: bar_width_percent(entry.score),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardView {
    entries: Option<Vec<DashboardEntry>>,
    consecutive_failures: u32,
    refreshes: u64,
}

impl DashboardView {
    /// A successful poll replaces the list wholesale; a failed poll keeps
    /// the last good list on screen.
    pub fn apply(&mut self, poll: DashboardPoll) {
        match poll {
            DashboardPoll::Students(entries) => {
                self.entries = Some(entries);
                self.consecutive_failures = 0;
                self.refreshes += 1;
            }
            DashboardPoll::Unavailable => {
                self.consecutive_failures += 1;
            }
        }
    }

    /// `None` until the first successful poll.
    pub fn entries(&self) -> Option<&[DashboardEntry]> {
        self.entries.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.entries.is_none()
    }

    pub fn rows(&self) -> Vec<DashboardRow> {
        self.entries
            .iter()
            .flatten()
            .map(DashboardRow::from)
            .collect()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn refreshes(&self) -> u64 {
        self.refreshes
    }
}

pub struct DashboardAggregator {
    client: DetectionClient,
    poll_interval: Duration,
}

impl DashboardAggregator {
    pub fn new(client: DetectionClient, poll_interval: Duration) -> Self {
        Self {
            client,
            poll_interval,
        }
    }

    /// Polls immediately, then once per interval until stopped.
    pub fn start(self) -> DashboardHandle {
        let view = Arc::new(Mutex::new(DashboardView::default()));
        let alive = Arc::new(AtomicBool::new(true));
        let (updates, _) = broadcast::channel(16);

        let task = tokio::spawn(run_poll_loop(
            self.client,
            self.poll_interval,
            view.clone(),
            alive.clone(),
            updates.clone(),
        ));
        info!("Dashboard polling every {:?}", self.poll_interval);

        DashboardHandle {
            view,
            alive,
            updates,
            task: Some(task),
        }
    }
}

async fn run_poll_loop(
    client: DetectionClient,
    period: Duration,
    view: Arc<Mutex<DashboardView>>,
    alive: Arc<AtomicBool>,
    updates: broadcast::Sender<DashboardView>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        if !alive.load(Ordering::SeqCst) {
            break;
        }

        // Each poll runs on its own task so a slow reply never delays the next tick.
        let client = client.clone();
        let view = view.clone();
        let alive = alive.clone();
        let updates = updates.clone();
        tokio::spawn(async move {
            let poll = client.poll_active_students().await;
            let mut view = view.lock().await;
            if !alive.load(Ordering::SeqCst) {
                debug!("Dropping dashboard reply for a stopped aggregator");
                return;
            }
            view.apply(poll);
            // No subscribers is fine.
            let _ = updates.send(view.clone());
        });
    }
}

pub struct DashboardHandle {
    view: Arc<Mutex<DashboardView>>,
    alive: Arc<AtomicBool>,
    updates: broadcast::Sender<DashboardView>,
    task: Option<JoinHandle<()>>,
}

impl DashboardHandle {
    pub async fn view(&self) -> DashboardView {
        self.view.lock().await.clone()
    }

    /// Receives a copy of the view after every applied poll.
    pub fn subscribe(&self) -> broadcast::Receiver<DashboardView> {
        self.updates.subscribe()
    }

    pub fn stop(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
            info!("Dashboard polling stopped");
        }
    }
}

impl Drop for DashboardHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
