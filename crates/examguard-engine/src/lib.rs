pub mod camera;
pub mod cli;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod exam;
pub mod formatter;
pub mod monitor;
pub mod service;
pub mod session;

pub use examguard_common::alert;
pub use examguard_common::error;
pub use examguard_common::protocol;
pub use examguard_common::risk;
