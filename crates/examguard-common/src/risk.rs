//! Score-threshold banding used by the admin dashboard.
//!
//! Bands come from the numeric score only, never from the `status` string
//! the service attaches to each entry.

use std::fmt;

/// Lowest score rendered in the suspicious band.
pub const SUSPICIOUS_THRESHOLD: f64 = 15.0;

/// Lowest score rendered in the cheating band.
pub const CHEATING_THRESHOLD: f64 = 35.0;

/// Scores above this value render a full risk bar.
const BAR_SATURATION: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiskBand {
    Normal,
    Suspicious,
    Cheating,
}

impl RiskBand {
    pub fn from_score(score: f64) -> Self {
        if score >= CHEATING_THRESHOLD {
            RiskBand::Cheating
        } else if score >= SUSPICIOUS_THRESHOLD {
            RiskBand::Suspicious
        } else {
            RiskBand::Normal
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskBand::Normal => "normal",
            RiskBand::Suspicious => "suspicious",
            RiskBand::Cheating => "cheating",
        }
    }
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// Width of the dashboard risk bar as a percentage in `[0, 100]`.
pub fn bar_width_percent(score: f64) -> u8 {
    (score.clamp(0.0, BAR_SATURATION) * 2.0).round() as u8
}
