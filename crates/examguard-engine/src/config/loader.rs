use super::schema::ExamGuardConfig;
use crate::exam::first_duplicate_id;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Environment variable that overrides `service.base_url`.
pub const API_URL_ENV: &str = "EXAMGUARD_API_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid service URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Exam has no questions")]
    NoQuestions,
    #[error("Question id {0} is used more than once")]
    DuplicateQuestion(u32),
    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from default locations:
    /// 1. ./examguard.yaml
    /// 2. ~/.examguard/config.yaml
    /// 3. Default configuration
    ///
    /// `EXAMGUARD_API_URL` is applied on top of whichever was found.
    pub async fn load_default() -> Result<ExamGuardConfig, ConfigError> {
        let config = match Self::find_config_file() {
            Some(path) => Self::read(&path).await?,
            None => ExamGuardConfig::default(),
        };
        Self::finish(config)
    }

    pub async fn load_from(path: &Path) -> Result<ExamGuardConfig, ConfigError> {
        let config = Self::read(path).await?;
        Self::finish(config)
    }

    fn find_config_file() -> Option<PathBuf> {
        let local_config = PathBuf::from("./examguard.yaml");
        if local_config.exists() {
            return Some(local_config);
        }

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".examguard").join("config.yaml");
            if home_config.exists() {
                return Some(home_config);
            }
        }

        None
    }

    async fn read(path: &Path) -> Result<ExamGuardConfig, ConfigError> {
        debug!("Loading config from {}", path.display());
        let content = tokio::fs::read_to_string(path).await?;
        let config: ExamGuardConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    fn finish(mut config: ExamGuardConfig) -> Result<ExamGuardConfig, ConfigError> {
        if let Ok(url) = std::env::var(API_URL_ENV)
            && !url.trim().is_empty()
        {
            config.service.base_url = url.trim().to_string();
        }
        validate(&config)?;
        Ok(config)
    }
}

/// Replaces the service URL, as the `--api-url` flag does.
pub fn override_base_url(config: &mut ExamGuardConfig, url: &str) -> Result<(), ConfigError> {
    config.service.base_url = url.to_string();
    validate(config)
}

fn validate(config: &ExamGuardConfig) -> Result<(), ConfigError> {
    url::Url::parse(&config.service.base_url).map_err(|e| ConfigError::InvalidUrl {
        url: config.service.base_url.clone(),
        reason: e.to_string(),
    })?;
    if config.exam.questions.is_empty() {
        return Err(ConfigError::NoQuestions);
    }
    if let Some(id) = first_duplicate_id(&config.exam.questions) {
        return Err(ConfigError::DuplicateQuestion(id));
    }
    // tokio intervals panic on a zero period.
    if config.proctoring.capture_interval_ms == 0 {
        return Err(ConfigError::ZeroInterval("proctoring.capture_interval_ms"));
    }
    if config.dashboard.poll_interval_ms == 0 {
        return Err(ConfigError::ZeroInterval("dashboard.poll_interval_ms"));
    }
    Ok(())
}
