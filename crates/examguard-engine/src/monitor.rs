//! Periodic camera capture and risk analysis for one exam sitting.

use crate::camera::{Camera, CameraStream};
use crate::client::DetectionClient;
use crate::session::StudentSession;
use examguard_common::alert::Alert;
use examguard_common::protocol::ProctorSnapshot;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorState {
    Connecting,
    Active,
    /// Camera acquisition failed. Terminal.
    Errored { message: String },
}

impl MonitorState {
    pub fn label(&self) -> &'static str {
        match self {
            MonitorState::Connecting => "Connecting",
            MonitorState::Active => "Live",
            MonitorState::Errored { .. } => "Error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorStatus {
    pub state: MonitorState,
    pub snapshot: ProctorSnapshot,
    /// Number of analysis replies applied so far.
    pub cycles: u64,
}

struct MonitorShared {
    status: Mutex<MonitorStatus>,
    alive: AtomicBool,
    alert_tx: Option<mpsc::UnboundedSender<Alert>>,
}

impl MonitorShared {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Clears the liveness flag while holding the status lock, so no
    /// `apply` can write once this returns.
    async fn shut_down(&self) {
        let _status = self.status.lock().await;
        self.alive.store(false, Ordering::SeqCst);
    }

    async fn set_state(&self, state: MonitorState) {
        self.status.lock().await.state = state;
    }

    /// Last write wins. Replies that arrive after the monitor stopped are dropped.
    async fn apply(&self, snapshot: ProctorSnapshot) {
        let mut status = self.status.lock().await;
        if !self.is_alive() {
            debug!("Dropping analysis reply for a stopped monitor");
            return;
        }

        let alert = Alert::for_status(snapshot.status);
        debug!(status = %snapshot.status, score = snapshot.score, "Snapshot applied");
        status.snapshot = snapshot;
        status.cycles += 1;
        drop(status);

        if let (Some(alert), Some(tx)) = (alert, &self.alert_tx)
            && tx.send(alert).is_err()
        {
            debug!("Alert listener is gone");
        }
    }
}

pub struct ProctoringMonitor {
    client: DetectionClient,
    session: Arc<StudentSession>,
    capture_interval: Duration,
    alert_tx: Option<mpsc::UnboundedSender<Alert>>,
}

impl ProctoringMonitor {
    pub fn new(
        client: DetectionClient,
        session: Arc<StudentSession>,
        capture_interval: Duration,
    ) -> Self {
        Self {
            client,
            session,
            capture_interval,
            alert_tx: None,
        }
    }

    /// Registers the listener that receives warning/error alerts.
    pub fn with_alert_listener(mut self, alert_tx: mpsc::UnboundedSender<Alert>) -> Self {
        self.alert_tx = Some(alert_tx);
        self
    }

    /// Fires the server-side score reset, opens the camera and starts the
    /// capture loop. The first capture waits for the reset to finish.
    ///
    /// Never fails: a camera error leaves the returned handle in
    /// [`MonitorState::Errored`].
    pub async fn start<C: Camera + ?Sized>(self, camera: &mut C) -> MonitorHandle {
        let shared = Arc::new(MonitorShared {
            status: Mutex::new(MonitorStatus {
                state: MonitorState::Connecting,
                snapshot: ProctorSnapshot::initial(),
                cycles: 0,
            }),
            alive: AtomicBool::new(true),
            alert_tx: self.alert_tx,
        });

        let student_id = self.session.student_id.clone();
        info!(student_id = %student_id, "Starting proctoring monitor");

        // The reset runs alongside camera acquisition; only the first
        // capture waits for it.
        let reset = {
            let client = self.client.clone();
            let student_id = student_id.clone();
            tokio::spawn(async move { client.reset_score(&student_id).await })
        };
        let first_capture = Instant::now() + self.capture_interval;

        let stream = match camera.acquire().await {
            Ok(stream) => stream,
            Err(e) => {
                error!(student_id = %student_id, error = %e, "Camera unavailable");
                shared.alive.store(false, Ordering::SeqCst);
                shared
                    .set_state(MonitorState::Errored {
                        message: e.user_message().to_string(),
                    })
                    .await;
                return MonitorHandle {
                    shared,
                    stream: Arc::new(Mutex::new(None)),
                    capture_task: None,
                };
            }
        };

        shared.set_state(MonitorState::Active).await;
        let stream = Arc::new(Mutex::new(Some(stream)));
        let capture_task = tokio::spawn(run_capture_loop(
            shared.clone(),
            stream.clone(),
            self.client,
            student_id,
            reset,
            first_capture,
            self.capture_interval,
        ));

        MonitorHandle {
            shared,
            stream,
            capture_task: Some(capture_task),
        }
    }
}

async fn run_capture_loop(
    shared: Arc<MonitorShared>,
    stream: Arc<Mutex<Option<Box<dyn CameraStream>>>>,
    client: DetectionClient,
    student_id: String,
    reset: JoinHandle<()>,
    first_capture: Instant,
    period: Duration,
) {
    if reset.await.is_err() {
        warn!("Score reset task did not complete");
    }

    let mut ticker = interval_at(first_capture, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        if !shared.is_alive() {
            break;
        }

        let frame = {
            let mut guard = stream.lock().await;
            let Some(camera) = guard.as_mut() else {
                break;
            };
            if !camera.is_ready() {
                debug!("Camera not ready, skipping capture");
                continue;
            }
            match camera.capture_jpeg().await {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(error = %e, "Frame capture failed");
                    continue;
                }
            }
        };

        // Not awaited: the next tick fires on schedule even if this call is slow.
        let shared = shared.clone();
        let client = client.clone();
        let student_id = student_id.clone();
        tokio::spawn(async move {
            let snapshot = client.analyze_frame(&frame, &student_id).await;
            shared.apply(snapshot).await;
        });
    }
}

/// Owner of a running monitor. Stopping or dropping it cancels the capture
/// loop and releases the camera.
pub struct MonitorHandle {
    shared: Arc<MonitorShared>,
    stream: Arc<Mutex<Option<Box<dyn CameraStream>>>>,
    capture_task: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    pub async fn status(&self) -> MonitorStatus {
        self.shared.status.lock().await.clone()
    }

    pub async fn state(&self) -> MonitorState {
        self.shared.status.lock().await.state.clone()
    }

    pub async fn snapshot(&self) -> ProctorSnapshot {
        self.shared.status.lock().await.snapshot.clone()
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_alive()
    }

    /// Read-only view for display code that does not own the monitor.
    pub fn view(&self) -> MonitorView {
        MonitorView {
            shared: self.shared.clone(),
        }
    }

    pub async fn stop(&mut self) {
        self.shared.shut_down().await;
        if let Some(task) = self.capture_task.take() {
            task.abort();
        }
        if let Some(mut stream) = self.stream.lock().await.take() {
            stream.release();
        }
        info!("Proctoring monitor stopped");
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        // Cannot wait for the status lock here. An `apply` already past its
        // liveness check may still land one last snapshot.
        self.shared.alive.store(false, Ordering::SeqCst);
        if let Some(task) = self.capture_task.take() {
            task.abort();
        }
        // If the capture task holds the lock, the stream is dropped (and
        // released) together with the aborted task.
        if let Ok(mut guard) = self.stream.try_lock()
            && let Some(mut stream) = guard.take()
        {
            stream.release();
        }
    }
}

#[derive(Clone)]
pub struct MonitorView {
    shared: Arc<MonitorShared>,
}

impl MonitorView {
    pub async fn status(&self) -> MonitorStatus {
        self.shared.status.lock().await.clone()
    }
}
