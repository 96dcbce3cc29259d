use crate::alert::Alert;
use crate::protocol::{DashboardEntry, ProctorSnapshot};
use crate::risk::{RiskBand, bar_width_percent};

/// Number of characters used to draw a full risk bar.
const BAR_CELLS: usize = 20;

/// Renders seconds as `HH:MM:SS`.
pub fn format_time(seconds: u32) -> String {
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    format!("{:02}:{:02}:{:02}", h, m, s)
}

/// Scores come back as integers from the service, so drop a `.0` suffix.
pub fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{:.0}", score)
    } else {
        format!("{:.1}", score)
    }
}

pub fn format_snapshot(snapshot: &ProctorSnapshot) -> String {
    let phone = if snapshot.phone_detected {
        "Detected"
    } else {
        "Clear"
    };
    format!(
        "Status: {}\nScore: {}\nHead: {}\nPhone: {}",
        snapshot.status,
        format_score(snapshot.score),
        snapshot.head_direction,
        phone
    )
}

pub fn format_alert(alert: &Alert) -> String {
    format!(
        "[{}] {}: {}",
        alert.severity.icon(),
        alert.title,
        alert.message
    )
}

pub fn format_risk_bar(score: f64) -> String {
    let filled = (bar_width_percent(score) as usize * BAR_CELLS) / 100;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(BAR_CELLS - filled))
}

pub fn format_dashboard_entry(entry: &DashboardEntry) -> String {
    format!(
        "{:<16} {:<10} {:>6} {:<10} {}",
        entry.student_id,
        entry.status,
        format_score(entry.score),
        RiskBand::from_score(entry.score),
        format_risk_bar(entry.score)
    )
}

/// Renders the admin table. `None` means no poll has succeeded yet.
pub fn format_dashboard(entries: Option<&[DashboardEntry]>) -> String {
    let Some(entries) = entries else {
        return "Loading data...".to_string();
    };
    if entries.is_empty() {
        return "No active students".to_string();
    }

    let mut output = format!(
        "{:<16} {:<10} {:>6} {:<10} {}",
        "STUDENT", "STATUS", "SCORE", "BAND", "RISK"
    );
    for entry in entries {
        output.push('\n');
        output.push_str(&format_dashboard_entry(entry));
    }
    output
}
