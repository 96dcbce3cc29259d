mod common;

use common::{CameraFailure, MockCamera, MockService, settle};
use examguard_engine::alert::Severity;
use examguard_engine::client::DetectionClient;
use examguard_engine::monitor::{MonitorState, ProctoringMonitor};
use examguard_engine::protocol::{ProctorSnapshot, RiskStatus, UNKNOWN_HEAD_DIRECTION};
use examguard_engine::session::StudentSession;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;

const INTERVAL: Duration = Duration::from_secs(3);

fn student() -> Arc<StudentSession> {
    Arc::new(StudentSession {
        student_id: "student_42".to_string(),
        exam_user_id: "ada@example.com".to_string(),
        role: examguard_engine::protocol::Role::Student,
    })
}

fn monitor(service: &Arc<MockService>) -> ProctoringMonitor {
    ProctoringMonitor::new(DetectionClient::new(service.clone()), student(), INTERVAL)
}

/// Sleeps past the `n`th capture tick.
async fn after_ticks(n: u32) {
    sleep(INTERVAL * n + Duration::from_millis(100)).await;
    settle().await;
}

#[tokio::test(start_paused = true)]
async fn test_reset_precedes_first_analysis() {
    let service = Arc::new(MockService::new());
    let (mut camera, _tracker) = MockCamera::ready();

    let mut handle = monitor(&service).start(&mut camera).await;
    assert_eq!(handle.state().await, MonitorState::Active);
    settle().await;
    assert_eq!(service.calls(), vec!["reset:student_42"]);

    after_ticks(2).await;
    assert_eq!(
        service.calls(),
        vec!["reset:student_42", "analyze:student_42", "analyze:student_42"]
    );
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_slow_reset_does_not_hold_up_the_camera() {
    let service = Arc::new(MockService::slow_reset(Duration::from_secs(10)));
    let (mut camera, tracker) = MockCamera::ready();

    let started = tokio::time::Instant::now();
    let mut handle = monitor(&service).start(&mut camera).await;
    assert_eq!(started.elapsed(), Duration::ZERO);
    assert_eq!(handle.state().await, MonitorState::Active);

    // Capture waits for the reset, even past the first interval.
    after_ticks(1).await;
    assert_eq!(tracker.captures.load(Ordering::SeqCst), 0);
    assert!(service.calls().is_empty());

    sleep(Duration::from_secs(7)).await;
    settle().await;
    assert_eq!(
        service.calls(),
        vec!["reset:student_42", "analyze:student_42"]
    );
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_no_capture_before_first_interval() {
    let service = Arc::new(MockService::new());
    let (mut camera, tracker) = MockCamera::ready();

    let mut handle = monitor(&service).start(&mut camera).await;
    sleep(INTERVAL - Duration::from_millis(100)).await;
    settle().await;

    assert_eq!(tracker.captures.load(Ordering::SeqCst), 0);
    assert_eq!(handle.snapshot().await, ProctorSnapshot::initial());
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_alerts_follow_reported_status() {
    let service = Arc::new(MockService::with_statuses(&[
        RiskStatus::Normal,
        RiskStatus::Suspicious,
        RiskStatus::Cheating,
        RiskStatus::Normal,
    ]));
    let (mut camera, _tracker) = MockCamera::ready();
    let (alert_tx, mut alert_rx) = mpsc::unbounded_channel();

    let mut handle = monitor(&service)
        .with_alert_listener(alert_tx)
        .start(&mut camera)
        .await;
    after_ticks(4).await;

    let mut severities = Vec::new();
    while let Ok(alert) = alert_rx.try_recv() {
        severities.push(alert.severity);
    }
    assert_eq!(severities, vec![Severity::Warning, Severity::Error]);

    let status = handle.status().await;
    assert_eq!(status.cycles, 4);
    assert_eq!(status.snapshot.status, RiskStatus::Normal);
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_latest_snapshot_replaces_previous() {
    let service = Arc::new(MockService::with_statuses(&[
        RiskStatus::Cheating,
        RiskStatus::Suspicious,
    ]));
    let (mut camera, _tracker) = MockCamera::ready();

    let mut handle = monitor(&service).start(&mut camera).await;
    after_ticks(1).await;
    let first = handle.snapshot().await;
    assert_eq!(first.status, RiskStatus::Cheating);
    assert!(first.phone_detected);

    after_ticks(1).await;
    let second = handle.snapshot().await;
    assert_eq!(second.status, RiskStatus::Suspicious);
    assert!(!second.phone_detected);
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_service_shows_error_sentinel() {
    let service = Arc::new(MockService::failing());
    let (mut camera, _tracker) = MockCamera::ready();
    let (alert_tx, mut alert_rx) = mpsc::unbounded_channel();

    let mut handle = monitor(&service)
        .with_alert_listener(alert_tx)
        .start(&mut camera)
        .await;
    after_ticks(1).await;

    let snapshot = handle.snapshot().await;
    assert_eq!(snapshot.status, RiskStatus::Error);
    assert_eq!(snapshot.score, 0.0);
    assert_eq!(snapshot.head_direction, UNKNOWN_HEAD_DIRECTION);
    assert!(alert_rx.try_recv().is_err());
    // The loop keeps going after a failed cycle.
    assert_eq!(handle.state().await, MonitorState::Active);
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_camera_denied_is_terminal() {
    let service = Arc::new(MockService::new());
    let mut camera = MockCamera::failing(CameraFailure::Denied);

    let handle = monitor(&service).start(&mut camera).await;
    assert_eq!(
        handle.state().await,
        MonitorState::Errored {
            message: "Camera access denied".to_string()
        }
    );
    assert!(!handle.is_running());

    after_ticks(3).await;
    assert_eq!(service.count("analyze"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_missing_camera_message() {
    let service = Arc::new(MockService::new());
    let mut camera = MockCamera::failing(CameraFailure::Missing);

    let handle = monitor(&service).start(&mut camera).await;
    assert_eq!(
        handle.state().await,
        MonitorState::Errored {
            message: "No camera found".to_string()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_unready_stream_skips_the_tick() {
    let service = Arc::new(MockService::new());
    let (mut camera, tracker) = MockCamera::warming_up();

    let mut handle = monitor(&service).start(&mut camera).await;
    after_ticks(2).await;
    assert_eq!(tracker.captures.load(Ordering::SeqCst), 0);
    assert_eq!(service.count("analyze"), 0);

    tracker.ready.store(true, Ordering::SeqCst);
    after_ticks(1).await;
    assert_eq!(tracker.captures.load(Ordering::SeqCst), 1);
    assert_eq!(service.count("analyze"), 1);
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_releases_camera_and_halts_capture() {
    let service = Arc::new(MockService::new());
    let (mut camera, tracker) = MockCamera::ready();

    let mut handle = monitor(&service).start(&mut camera).await;
    after_ticks(1).await;
    handle.stop().await;

    assert!(tracker.released.load(Ordering::SeqCst));
    assert!(!handle.is_running());

    after_ticks(3).await;
    assert_eq!(tracker.captures.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_drop_releases_camera() {
    let service = Arc::new(MockService::new());
    let (mut camera, tracker) = MockCamera::ready();

    let handle = monitor(&service).start(&mut camera).await;
    after_ticks(1).await;
    drop(handle);
    settle().await;

    assert!(tracker.released.load(Ordering::SeqCst));
    after_ticks(2).await;
    assert_eq!(service.count("analyze"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reply_after_stop_is_dropped() {
    let service = Arc::new(MockService::delayed(Duration::from_secs(5)));
    let (mut camera, _tracker) = MockCamera::ready();
    let (alert_tx, mut alert_rx) = mpsc::unbounded_channel();

    let mut handle = monitor(&service)
        .with_alert_listener(alert_tx)
        .start(&mut camera)
        .await;
    // The first analysis is in flight until t = 8s.
    after_ticks(1).await;
    assert_eq!(service.count("analyze"), 1);
    handle.stop().await;

    sleep(Duration::from_secs(10)).await;
    settle().await;
    let status = handle.status().await;
    assert_eq!(status.cycles, 0);
    assert_eq!(status.snapshot, ProctorSnapshot::initial());
    assert!(alert_rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_slow_reply_does_not_delay_next_capture() {
    let service = Arc::new(MockService::delayed(Duration::from_secs(5)));
    let (mut camera, tracker) = MockCamera::ready();

    let mut handle = monitor(&service).start(&mut camera).await;
    after_ticks(2).await;

    // Two captures went out even though the first reply is still pending.
    assert_eq!(tracker.captures.load(Ordering::SeqCst), 2);
    assert_eq!(handle.status().await.cycles, 0);

    after_ticks(1).await;
    assert_eq!(handle.status().await.cycles, 1);
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_view_tracks_owner() {
    let service = Arc::new(MockService::with_statuses(&[RiskStatus::Suspicious]));
    let (mut camera, _tracker) = MockCamera::ready();

    let mut handle = monitor(&service).start(&mut camera).await;
    let view = handle.view();
    after_ticks(1).await;

    assert_eq!(view.status().await.snapshot.status, RiskStatus::Suspicious);
    assert_eq!(view.status().await.state.label(), "Live");
    handle.stop().await;
}
