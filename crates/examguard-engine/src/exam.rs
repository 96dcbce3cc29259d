//! Timed exam state machine.
//!
//! `ExamSession` is plain synchronous state: navigation, answers, the
//! countdown and the current alert. `ExamRunner` drives it from a tokio
//! runtime with a one-second countdown task and an alert relay task.

use crate::config::ExamConfig;
use examguard_common::alert::{AUTO_HIDE_SECS, Alert};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tracing::{debug, info};

/// Below this many seconds the timer is shown as running low.
pub const LOW_TIME_THRESHOLD_SECS: u32 = 600;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExamError {
    #[error("Exam has already been submitted")]
    Submitted,
    #[error("Question {0} does not exist")]
    UnknownQuestion(u32),
    #[error("An exam needs at least one question")]
    NoQuestions,
    #[error("Question id {0} is used more than once")]
    DuplicateQuestion(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: u32,
    pub text: String,
}

impl Question {
    pub fn new(id: u32, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamPhase {
    InProgress,
    Submitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitReason {
    Manual,
    TimeExpired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamTimerState {
    pub seconds_remaining: u32,
    pub running: bool,
}

/// Result of one countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still in progress, with this many seconds left.
    Counting(u32),
    /// This tick reached zero and submitted the exam.
    AutoSubmitted,
    /// The exam was already submitted; nothing changed.
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub answered: usize,
    pub total: usize,
}

#[derive(Debug, Clone)]
struct VisibleAlert {
    alert: Alert,
    hide_in: Option<u32>,
}

pub type ExamAnswerSet = BTreeMap<u32, String>;

#[derive(Debug, Clone)]
pub struct ExamSession {
    title: String,
    questions: Vec<Question>,
    answers: ExamAnswerSet,
    cursor: usize,
    timer: ExamTimerState,
    phase: ExamPhase,
    submit_reason: Option<SubmitReason>,
    alert: Option<VisibleAlert>,
}

impl ExamSession {
    /// A duration of zero submits on the first tick.
    pub fn new(
        title: impl Into<String>,
        questions: Vec<Question>,
        duration_secs: u32,
    ) -> Result<Self, ExamError> {
        if questions.is_empty() {
            return Err(ExamError::NoQuestions);
        }
        if let Some(id) = first_duplicate_id(&questions) {
            return Err(ExamError::DuplicateQuestion(id));
        }
        Ok(Self {
            title: title.into(),
            questions,
            answers: BTreeMap::new(),
            cursor: 0,
            timer: ExamTimerState {
                seconds_remaining: duration_secs,
                running: true,
            },
            phase: ExamPhase::InProgress,
            submit_reason: None,
            alert: None,
        })
    }

    pub fn from_config(config: &ExamConfig) -> Result<Self, ExamError> {
        Self::new(
            config.title.clone(),
            config.questions.clone(),
            config.duration_secs,
        )
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// 1-based position of the question being shown.
    pub fn current_position(&self) -> usize {
        self.cursor + 1
    }

    pub fn current_question(&self) -> &Question {
        &self.questions[self.cursor]
    }

    pub fn phase(&self) -> ExamPhase {
        self.phase
    }

    pub fn is_submitted(&self) -> bool {
        self.phase == ExamPhase::Submitted
    }

    pub fn submit_reason(&self) -> Option<SubmitReason> {
        self.submit_reason
    }

    pub fn timer(&self) -> ExamTimerState {
        self.timer
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.timer.seconds_remaining
    }

    pub fn is_low_time(&self) -> bool {
        self.timer.seconds_remaining < LOW_TIME_THRESHOLD_SECS
    }

    // ------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------

    /// Moves forward one question. Returns false at the last question.
    pub fn next(&mut self) -> bool {
        if self.cursor + 1 < self.questions.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Moves back one question. Returns false at the first question.
    pub fn previous(&mut self) -> bool {
        if self.cursor > 0 {
            self.cursor -= 1;
            true
        } else {
            false
        }
    }

    pub fn go_to(&mut self, question_id: u32) -> Result<(), ExamError> {
        let index = self
            .questions
            .iter()
            .position(|q| q.id == question_id)
            .ok_or(ExamError::UnknownQuestion(question_id))?;
        self.cursor = index;
        Ok(())
    }

    // ------------------------------------------------------------
    // Answers
    // ------------------------------------------------------------

    /// Overwrites the answer to the current question. Empty text is accepted.
    pub fn answer(&mut self, text: impl Into<String>) -> Result<(), ExamError> {
        if self.is_submitted() {
            return Err(ExamError::Submitted);
        }
        let id = self.current_question().id;
        self.answers.insert(id, text.into());
        Ok(())
    }

    pub fn answer_for(&self, question_id: u32) -> Option<&str> {
        self.answers.get(&question_id).map(String::as_str)
    }

    pub fn answers(&self) -> &ExamAnswerSet {
        &self.answers
    }

    pub fn is_answered(&self, question_id: u32) -> bool {
        self.answer_for(question_id)
            .map(|a| !a.is_empty())
            .unwrap_or(false)
    }

    pub fn progress(&self) -> Progress {
        let answered = self
            .questions
            .iter()
            .filter(|q| self.is_answered(q.id))
            .count();
        Progress {
            answered,
            total: self.questions.len(),
        }
    }

    // ------------------------------------------------------------
    // Countdown & submission
    // ------------------------------------------------------------

    pub fn tick(&mut self) -> TickOutcome {
        if self.is_submitted() {
            return TickOutcome::Idle;
        }

        self.age_alert();
        self.timer.seconds_remaining = self.timer.seconds_remaining.saturating_sub(1);
        if self.timer.seconds_remaining == 0 {
            self.finish(SubmitReason::TimeExpired);
            return TickOutcome::AutoSubmitted;
        }
        TickOutcome::Counting(self.timer.seconds_remaining)
    }

    /// Manual submission. Returns false if the exam was already submitted.
    pub fn submit(&mut self) -> bool {
        if self.is_submitted() {
            debug!("Submit ignored: exam already submitted");
            return false;
        }
        self.finish(SubmitReason::Manual);
        true
    }

    fn finish(&mut self, reason: SubmitReason) {
        self.phase = ExamPhase::Submitted;
        self.timer.running = false;
        self.submit_reason = Some(reason);
        self.alert = Some(VisibleAlert {
            alert: Alert::submitted(),
            hide_in: None,
        });
        info!(
            reason = ?reason,
            seconds_remaining = self.timer.seconds_remaining,
            answers = ?self.answers,
            "Exam submitted"
        );
    }

    // ------------------------------------------------------------
    // Alerts
    // ------------------------------------------------------------

    /// Shows a proctoring alert. Ignored once the exam is submitted.
    pub fn relay_alert(&mut self, alert: Alert) -> bool {
        if self.is_submitted() {
            debug!("Alert ignored after submission: {}", alert.message);
            return false;
        }
        let hide_in = alert.auto_hide.then_some(AUTO_HIDE_SECS);
        self.alert = Some(VisibleAlert { alert, hide_in });
        true
    }

    pub fn alert(&self) -> Option<&Alert> {
        self.alert.as_ref().map(|v| &v.alert)
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    fn age_alert(&mut self) {
        let expired = match self.alert.as_mut().and_then(|v| v.hide_in.as_mut()) {
            Some(left) => {
                *left = left.saturating_sub(1);
                *left == 0
            }
            None => false,
        };
        if expired {
            self.alert = None;
        }
    }
}

/// First question id that appears more than once, if any.
pub fn first_duplicate_id(questions: &[Question]) -> Option<u32> {
    let mut seen = BTreeSet::new();
    questions.iter().map(|q| q.id).find(|id| !seen.insert(*id))
}

/// Drives an [`ExamSession`] in the background.
pub struct ExamRunner {
    session: Arc<Mutex<ExamSession>>,
    countdown: Option<JoinHandle<()>>,
    relay: Option<JoinHandle<()>>,
}

impl ExamRunner {
    /// Starts the countdown (first tick one period from now) and relays
    /// every alert received on `alerts` into the session.
    pub fn start(
        session: ExamSession,
        tick_period: Duration,
        alerts: mpsc::UnboundedReceiver<Alert>,
    ) -> Self {
        let session = Arc::new(Mutex::new(session));
        let countdown = tokio::spawn(run_countdown(session.clone(), tick_period));
        let relay = tokio::spawn(run_alert_relay(session.clone(), alerts));
        Self {
            session,
            countdown: Some(countdown),
            relay: Some(relay),
        }
    }

    pub fn session(&self) -> Arc<Mutex<ExamSession>> {
        self.session.clone()
    }

    pub async fn stop(&mut self) {
        self.abort_tasks();
        debug!("Exam runner stopped");
    }

    fn abort_tasks(&mut self) {
        if let Some(task) = self.countdown.take() {
            task.abort();
        }
        if let Some(task) = self.relay.take() {
            task.abort();
        }
    }
}

impl Drop for ExamRunner {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

async fn run_countdown(session: Arc<Mutex<ExamSession>>, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    loop {
        ticker.tick().await;
        let outcome = session.lock().await.tick();
        match outcome {
            TickOutcome::Counting(_) => {}
            TickOutcome::AutoSubmitted => {
                info!("Time is up");
                break;
            }
            TickOutcome::Idle => break,
        }
    }
}

async fn run_alert_relay(
    session: Arc<Mutex<ExamSession>>,
    mut alerts: mpsc::UnboundedReceiver<Alert>,
) {
    while let Some(alert) = alerts.recv().await {
        session.lock().await.relay_alert(alert);
    }
}
