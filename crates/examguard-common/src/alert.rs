use crate::protocol::RiskStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default banner title.
pub const DEFAULT_ALERT_TITLE: &str = "Alert";

/// How long an auto-hiding alert stays visible.
pub const AUTO_HIDE_SECS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Success,
}

impl Severity {
    pub fn icon(&self) -> &'static str {
        match self {
            Severity::Info => "i",
            Severity::Warning => "!",
            Severity::Error => "x",
            Severity::Success => "+",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => f.write_str("info"),
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
            Severity::Success => f.write_str("success"),
        }
    }
}

/// A user-facing notification. Only the most recent one is shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub title: String,
    pub message: String,
    pub severity: Severity,
    #[serde(default)]
    pub auto_hide: bool,
}

impl Alert {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: DEFAULT_ALERT_TITLE.to_string(),
            message: message.into(),
            severity,
            auto_hide: false,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn auto_hiding(mut self) -> Self {
        self.auto_hide = true;
        self
    }

    /// Alert raised for a proctoring status, if that status warrants one.
    pub fn for_status(status: RiskStatus) -> Option<Self> {
        match status {
            RiskStatus::Cheating => Some(Self::new(
                "Suspicious activity detected! Your actions are being recorded.",
                Severity::Error,
            )),
            RiskStatus::Suspicious => Some(Self::new(
                "Please stay focused on the exam.",
                Severity::Warning,
            )),
            RiskStatus::Normal | RiskStatus::Error => None,
        }
    }

    pub fn submitted() -> Self {
        Self::new("Exam submitted successfully.", Severity::Success)
    }
}
