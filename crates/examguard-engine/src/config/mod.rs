pub mod loader;
pub mod schema;

pub use loader::{API_URL_ENV, ConfigError, ConfigLoader, override_base_url};
pub use schema::{DashboardConfig, ExamConfig, ExamGuardConfig, ProctoringConfig, ServiceConfig};
