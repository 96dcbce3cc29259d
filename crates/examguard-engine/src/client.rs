//! Fail-safe facade over a [`ProctorService`].
//!
//! Nothing returned from here is an error. Failed calls are logged and
//! replaced by a sentinel, and no call is ever retried.

use crate::service::ProctorService;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use examguard_common::protocol::{
    AnalyzeRequest, DashboardEntry, EvidenceRecord, ProctorSnapshot, ResetScoreRequest, TabEvent,
    TabEventAck,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of one dashboard poll.
///
/// An empty list from the service and a failed call are different things:
/// the first clears the admin view, the second must not.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardPoll {
    Students(Vec<DashboardEntry>),
    Unavailable,
}

impl DashboardPoll {
    pub fn into_students(self) -> Vec<DashboardEntry> {
        match self {
            DashboardPoll::Students(students) => students,
            DashboardPoll::Unavailable => Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct DetectionClient {
    service: Arc<dyn ProctorService>,
}

impl DetectionClient {
    pub fn new(service: Arc<dyn ProctorService>) -> Self {
        Self { service }
    }

    pub async fn reset_score(&self, student_id: &str) {
        let request = ResetScoreRequest {
            student_id: student_id.to_string(),
        };
        match self.service.reset_score(request).await {
            Ok(ack) => debug!(student_id, message = ?ack.message, "Score reset"),
            Err(e) => warn!(student_id, error = %e, "Score reset failed"),
        }
    }

    pub async fn analyze_frame(&self, image: &[u8], student_id: &str) -> ProctorSnapshot {
        let request = AnalyzeRequest {
            image: STANDARD.encode(image),
            student_id: student_id.to_string(),
        };
        match self.service.analyze_frame(request).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(student_id, error = %e, "Frame analysis failed");
                ProctorSnapshot::error_sentinel()
            }
        }
    }

    pub async fn poll_active_students(&self) -> DashboardPoll {
        match self.service.dashboard_data().await {
            Ok(students) => DashboardPoll::Students(students),
            Err(e) => {
                warn!(error = %e, "Dashboard fetch failed");
                DashboardPoll::Unavailable
            }
        }
    }

    /// Active students, or an empty list if the service could not be reached.
    pub async fn list_active_students(&self) -> Vec<DashboardEntry> {
        self.poll_active_students().await.into_students()
    }

    pub async fn evidence_list(&self) -> Vec<EvidenceRecord> {
        match self.service.evidence_list().await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Evidence fetch failed");
                Vec::new()
            }
        }
    }

    pub async fn send_tab_event(&self, event: TabEvent) -> TabEventAck {
        let student_id = event.student_id.clone();
        match self.service.tab_event(event).await {
            Ok(ack) => ack,
            Err(e) => {
                warn!(student_id = %student_id, error = %e, "Tab event failed");
                TabEventAck::error_sentinel()
            }
        }
    }
}
