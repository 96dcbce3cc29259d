use crate::exam::Question;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExamGuardConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub proctoring: ProctoringConfig,
    #[serde(default)]
    pub exam: ExamConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl ServiceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

pub fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProctoringConfig {
    #[serde(default = "default_capture_interval_ms")]
    pub capture_interval_ms: u64,
}

impl Default for ProctoringConfig {
    fn default() -> Self {
        Self {
            capture_interval_ms: default_capture_interval_ms(),
        }
    }
}

impl ProctoringConfig {
    pub fn capture_interval(&self) -> Duration {
        Duration::from_millis(self.capture_interval_ms)
    }
}

fn default_capture_interval_ms() -> u64 {
    3000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u32,
    #[serde(default = "default_questions")]
    pub questions: Vec<Question>,
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            duration_secs: default_duration_secs(),
            questions: default_questions(),
        }
    }
}

fn default_title() -> String {
    "AI Fundamentals Exam".to_string()
}

fn default_duration_secs() -> u32 {
    3600
}

fn default_questions() -> Vec<Question> {
    vec![
        Question::new(
            1,
            "Explain the fundamental principles of Artificial Intelligence and its applications in modern technology.",
        ),
        Question::new(
            2,
            "What is machine learning and how does it differ from traditional programming?",
        ),
        Question::new(3, "Describe the ethical considerations in AI development."),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl DashboardConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_poll_interval_ms() -> u64 {
    3000
}
