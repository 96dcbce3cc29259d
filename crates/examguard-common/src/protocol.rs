use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Head direction reported before the first analysis cycle completes.
pub const INITIAL_HEAD_DIRECTION: &str = "center";

/// Head direction used when the service could not be reached.
pub const UNKNOWN_HEAD_DIRECTION: &str = "unknown";

/// Custom deserializer for scores: null becomes 0 and negative values are floored at 0.
fn deserialize_score<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let score: Option<f64> = Option::deserialize(deserializer)?;
    Ok(score.map(|s| s.max(0.0)).unwrap_or(0.0))
}

/// The detection service sends `null` for the head direction when no face is found.
fn deserialize_head_direction<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let direction: Option<String> = Option::deserialize(deserializer)?;
    Ok(direction.unwrap_or_else(unknown_head_direction))
}

fn unknown_head_direction() -> String {
    UNKNOWN_HEAD_DIRECTION.to_string()
}

/// Risk status as decided by the detection service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskStatus {
    #[default]
    Normal,
    Suspicious,
    Cheating,
    Error,
}

impl RiskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskStatus::Normal => "NORMAL",
            RiskStatus::Suspicious => "SUSPICIOUS",
            RiskStatus::Cheating => "CHEATING",
            RiskStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for RiskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One risk assessment returned by `POST /proctor/analyze`.
///
/// The service also returns face, eye and hand fields; those are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProctorSnapshot {
    #[serde(default, deserialize_with = "deserialize_score")]
    pub score: f64,
    pub status: RiskStatus,
    #[serde(
        default = "unknown_head_direction",
        deserialize_with = "deserialize_head_direction"
    )]
    pub head_direction: String,
    #[serde(default)]
    pub phone_detected: bool,
}

impl ProctorSnapshot {
    /// What the monitor shows before any analysis reply has arrived.
    pub fn initial() -> Self {
        Self {
            score: 0.0,
            status: RiskStatus::Normal,
            head_direction: INITIAL_HEAD_DIRECTION.to_string(),
            phone_detected: false,
        }
    }

    /// Substituted for any failed analysis call.
    pub fn error_sentinel() -> Self {
        Self {
            score: 0.0,
            status: RiskStatus::Error,
            head_direction: UNKNOWN_HEAD_DIRECTION.to_string(),
            phone_detected: false,
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == RiskStatus::Error
    }
}

impl Default for ProctorSnapshot {
    fn default() -> Self {
        Self::initial()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    /// Base64 encoded JPEG, without a `data:` URL prefix.
    pub image: String,
    pub student_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetScoreRequest {
    pub student_id: String,
}

/// Acknowledgement of `POST /proctor/reset-score`. Every field is service-defined.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResetScoreAck {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub status: Option<RiskStatus>,
}

/// One row of `GET /proctor/dashboard-data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardEntry {
    pub student_id: String,
    #[serde(default, deserialize_with = "deserialize_score")]
    pub score: f64,
    #[serde(default)]
    pub status: RiskStatus,
}

/// One row of `GET /proctor/evidence-list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    pub image: String,
}

/// Browser-visibility style violation reported to `POST /proctor/tab-event`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabEvent {
    pub student_id: String,
    pub event_type: String,
    #[serde(default)]
    pub tab_switch_count: u32,
    #[serde(default)]
    pub total_away_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabEventAck {
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    pub status: RiskStatus,
}

impl TabEventAck {
    pub fn error_sentinel() -> Self {
        Self {
            event: None,
            score: None,
            status: RiskStatus::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Student => f.write_str("student"),
            Role::Admin => f.write_str("admin"),
        }
    }
}
