//! Test doubles shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use examguard_engine::camera::{Camera, CameraError, CameraStream};
use examguard_engine::error::ServiceError;
use examguard_engine::protocol::{
    AnalyzeRequest, DashboardEntry, ProctorSnapshot, ResetScoreAck, ResetScoreRequest, RiskStatus,
};
use examguard_engine::service::ProctorService;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Detection service
// ============================================================================

/// Scripted detection service that records every call it receives.
#[derive(Default)]
pub struct MockService {
    calls: Mutex<Vec<String>>,
    statuses: Mutex<VecDeque<RiskStatus>>,
    dashboards: Mutex<VecDeque<Option<Vec<DashboardEntry>>>>,
    pub fail_analyze: AtomicBool,
    pub analyze_delay: Option<Duration>,
    pub reset_delay: Option<Duration>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statuses returned by successive `analyze_frame` calls; `NORMAL` once exhausted.
    pub fn with_statuses(statuses: &[RiskStatus]) -> Self {
        let service = Self::default();
        service.statuses.lock().unwrap().extend(statuses.iter().copied());
        service
    }

    /// Results of successive `dashboard_data` calls; `None` is a failed call.
    /// An exhausted script keeps failing.
    pub fn with_dashboards(dashboards: Vec<Option<Vec<DashboardEntry>>>) -> Self {
        let service = Self::default();
        service.dashboards.lock().unwrap().extend(dashboards);
        service
    }

    pub fn failing() -> Self {
        let service = Self::default();
        service.fail_analyze.store(true, Ordering::SeqCst);
        service
    }

    pub fn delayed(delay: Duration) -> Self {
        Self {
            analyze_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn slow_reset(delay: Duration) -> Self {
        Self {
            reset_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

fn unreachable(endpoint: &str) -> ServiceError {
    ServiceError::Transport {
        endpoint: endpoint.to_string(),
        message: "connection refused".to_string(),
    }
}

#[async_trait]
impl ProctorService for MockService {
    async fn reset_score(&self, request: ResetScoreRequest) -> Result<ResetScoreAck, ServiceError> {
        if let Some(delay) = self.reset_delay {
            tokio::time::sleep(delay).await;
        }
        self.record(format!("reset:{}", request.student_id));
        Ok(ResetScoreAck::default())
    }

    async fn analyze_frame(
        &self,
        request: AnalyzeRequest,
    ) -> Result<ProctorSnapshot, ServiceError> {
        self.record(format!("analyze:{}", request.student_id));
        if let Some(delay) = self.analyze_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_analyze.load(Ordering::SeqCst) {
            return Err(unreachable("/proctor/analyze"));
        }

        let status = self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(RiskStatus::Normal);
        Ok(ProctorSnapshot {
            score: match status {
                RiskStatus::Suspicious => 20.0,
                RiskStatus::Cheating => 40.0,
                _ => 0.0,
            },
            status,
            head_direction: "center".to_string(),
            phone_detected: status == RiskStatus::Cheating,
        })
    }

    async fn dashboard_data(&self) -> Result<Vec<DashboardEntry>, ServiceError> {
        self.record("dashboard".to_string());
        match self.dashboards.lock().unwrap().pop_front() {
            Some(Some(entries)) => Ok(entries),
            _ => Err(unreachable("/proctor/dashboard-data")),
        }
    }
}

pub fn entry(student_id: &str, score: f64, status: RiskStatus) -> DashboardEntry {
    DashboardEntry {
        student_id: student_id.to_string(),
        score,
        status,
    }
}

// ============================================================================
// Camera
// ============================================================================

/// Observable state of a [`MockCamera`] and the stream it hands out.
#[derive(Clone, Default)]
pub struct CameraTracker {
    pub ready: Arc<AtomicBool>,
    pub released: Arc<AtomicBool>,
    pub captures: Arc<AtomicUsize>,
}

pub enum CameraFailure {
    Denied,
    Missing,
}

pub struct MockCamera {
    tracker: CameraTracker,
    failure: Option<CameraFailure>,
}

impl MockCamera {
    pub fn ready() -> (Self, CameraTracker) {
        let tracker = CameraTracker::default();
        tracker.ready.store(true, Ordering::SeqCst);
        (
            Self {
                tracker: tracker.clone(),
                failure: None,
            },
            tracker,
        )
    }

    /// A camera whose stream has not decoded a frame yet.
    pub fn warming_up() -> (Self, CameraTracker) {
        let tracker = CameraTracker::default();
        (
            Self {
                tracker: tracker.clone(),
                failure: None,
            },
            tracker,
        )
    }

    pub fn failing(failure: CameraFailure) -> Self {
        Self {
            tracker: CameraTracker::default(),
            failure: Some(failure),
        }
    }
}

#[async_trait]
impl Camera for MockCamera {
    async fn acquire(&mut self) -> Result<Box<dyn CameraStream>, CameraError> {
        match self.failure {
            Some(CameraFailure::Denied) => Err(CameraError::PermissionDenied("mock".into())),
            Some(CameraFailure::Missing) => Err(CameraError::NoDevice("mock".into())),
            None => Ok(Box::new(MockStream {
                tracker: self.tracker.clone(),
            })),
        }
    }
}

struct MockStream {
    tracker: CameraTracker,
}

#[async_trait]
impl CameraStream for MockStream {
    fn is_ready(&self) -> bool {
        self.tracker.ready.load(Ordering::SeqCst) && !self.is_released()
    }

    async fn capture_jpeg(&mut self) -> Result<Vec<u8>, CameraError> {
        if self.is_released() {
            return Err(CameraError::Released);
        }
        self.tracker.captures.fetch_add(1, Ordering::SeqCst);
        Ok(vec![0xFF, 0xD8, 0xFF, 0xD9])
    }

    fn release(&mut self) {
        self.tracker.released.store(true, Ordering::SeqCst);
    }

    fn is_released(&self) -> bool {
        self.tracker.released.load(Ordering::SeqCst)
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        self.release();
    }
}

/// Lets spawned tasks run without moving the paused clock.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
