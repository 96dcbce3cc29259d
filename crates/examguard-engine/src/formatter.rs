use crate::exam::{ExamSession, SubmitReason};
use crate::monitor::{MonitorState, MonitorStatus};
use examguard_common::formatter::{format_alert, format_snapshot, format_time};

/// Question palette, e.g. `[1] <2> [3+]`: `<>` marks the current question,
/// `+` an answered one.
pub fn format_palette(session: &ExamSession) -> String {
    let current = session.current_question().id;
    session
        .questions()
        .iter()
        .map(|q| {
            let mark = if session.is_answered(q.id) { "+" } else { "" };
            if q.id == current {
                format!("<{}{}>", q.id, mark)
            } else {
                format!("[{}{}]", q.id, mark)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn format_exam(session: &ExamSession) -> String {
    let mut time = format_time(session.seconds_remaining());
    if session.is_low_time() && !session.is_submitted() {
        time.push_str(" (hurry)");
    }

    let question = session.current_question();
    let progress = session.progress();
    let mut output = format!(
        "{}\nTime Remaining: {}\n{}\n\nQuestion {} of {}\n{}\n\nAnswer: {}\n\nProgress: {}/{} answered",
        session.title(),
        time,
        format_palette(session),
        session.current_position(),
        session.question_count(),
        question.text,
        session.answer_for(question.id).unwrap_or(""),
        progress.answered,
        progress.total
    );

    if let Some(reason) = session.submit_reason() {
        let how = match reason {
            SubmitReason::Manual => "submitted",
            SubmitReason::TimeExpired => "submitted automatically (time is up)",
        };
        output.push_str(&format!("\nExam {}", how));
    }

    if let Some(alert) = session.alert() {
        output.push_str("\n\n");
        output.push_str(&format_alert(alert));
    }
    output
}

pub fn format_monitor(status: &MonitorStatus) -> String {
    let mut output = format!("Camera Feed: {}", status.state.label());
    match &status.state {
        MonitorState::Connecting => output.push_str("\nInitializing camera..."),
        MonitorState::Errored { message } => {
            output.push('\n');
            output.push_str(message);
        }
        MonitorState::Active => {
            output.push('\n');
            output.push_str(&format_snapshot(&status.snapshot));
        }
    }
    output
}
