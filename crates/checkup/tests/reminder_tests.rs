//! Daily reminder gating, deduplication and the midnight reset

mod common;

use std::sync::Arc;
use std::time::Duration;

use checkup::{MonitorStatus, NotificationKind, ReminderOutcome, ReminderWindow};
use common::{MemoryStore, RecordingNotifier, ReminderFixture, at, init_tracing};

#[tokio::test]
async fn test_concurrent_reminders_dispatch_once() {
    init_tracing();
    let fixture = ReminderFixture::new(
        at(1, 12, 1),
        RecordingNotifier::slow(Duration::from_millis(20)),
        MemoryStore::empty(),
    );

    let attempts = (0..8).map(|_| {
        let reminder = Arc::clone(&fixture.reminder);
        tokio::spawn(async move {
            reminder.maybe_notify_daily("m1", "Shop", Some(2), MonitorStatus::Down).await
        })
    });
    let outcomes: Vec<_> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let dispatched = outcomes.iter().filter(|o| matches!(o, ReminderOutcome::Dispatched(_))).count();
    assert_eq!(dispatched, 1);
    assert_eq!(outcomes.iter().filter(|o| **o == ReminderOutcome::AlreadySent).count(), 7);
    assert_eq!(fixture.notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_reset_makes_kind_eligible_next_day() {
    let fixture = ReminderFixture::new(at(1, 12, 0), RecordingNotifier::new(), MemoryStore::empty());
    let remind = || fixture.reminder.maybe_notify_daily("m1", "Shop", Some(0), MonitorStatus::Down);

    assert_eq!(remind().await, ReminderOutcome::Dispatched(NotificationKind::ExpiredCritical));
    assert_eq!(remind().await, ReminderOutcome::AlreadySent);

    fixture.clock.set(at(2, 0, 0));
    assert!(fixture.cache.clear_if_day_start(at(2, 0, 0)));

    fixture.clock.set(at(2, 12, 3));
    assert_eq!(remind().await, ReminderOutcome::Dispatched(NotificationKind::ExpiredCritical));
    assert_eq!(fixture.notifier.sent().len(), 2);
}

#[tokio::test]
async fn test_new_day_key_without_reset() {
    let fixture = ReminderFixture::new(at(1, 12, 0), RecordingNotifier::new(), MemoryStore::empty());

    fixture.reminder.maybe_notify_daily("m1", "Shop", None, MonitorStatus::Down).await;
    fixture.clock.set(at(2, 12, 0));
    let outcome = fixture.reminder.maybe_notify_daily("m1", "Shop", None, MonitorStatus::Down).await;

    assert_eq!(outcome, ReminderOutcome::Dispatched(NotificationKind::CheckFailedDaily));
    assert_eq!(fixture.cache.len(), 2);
}

#[tokio::test]
async fn test_each_day_count_is_its_own_kind() {
    let fixture = ReminderFixture::new(at(1, 12, 0), RecordingNotifier::new(), MemoryStore::empty());

    for days in [3, 2, 3] {
        fixture.reminder.maybe_notify_daily("m1", "Shop", Some(days), MonitorStatus::Down).await;
    }

    let sent = fixture.notifier.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].message.contains("within 3 days"));
    assert!(sent[1].message.contains("within 2 days"));
}

#[tokio::test]
async fn test_monitors_are_independent() {
    let fixture = ReminderFixture::new(at(1, 12, 0), RecordingNotifier::new(), MemoryStore::empty());

    fixture.reminder.maybe_notify_daily("m1", "Shop", Some(5), MonitorStatus::Down).await;
    fixture.reminder.maybe_notify_daily("m2", "Blog", Some(5), MonitorStatus::Down).await;

    let ids: Vec<_> = fixture.notifier.sent().into_iter().map(|d| d.monitor_id).collect();
    assert_eq!(ids, vec!["m1", "m2"]);
}

#[tokio::test]
async fn test_gating_by_status_and_window() {
    let fixture = ReminderFixture::new(at(1, 12, 5), RecordingNotifier::new(), MemoryStore::empty());

    let up = fixture.reminder.maybe_notify_daily("m1", "Shop", Some(3), MonitorStatus::Up).await;
    assert_eq!(up, ReminderOutcome::NotDown);

    let late = fixture.reminder.maybe_notify_daily("m1", "Shop", Some(3), MonitorStatus::Down).await;
    assert_eq!(late, ReminderOutcome::OutsideWindow);
    assert!(fixture.cache.is_empty());
    assert!(fixture.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_custom_window() {
    let notifier = RecordingNotifier::new();
    let fixture = ReminderFixture::new(at(1, 8, 14), notifier.clone(), MemoryStore::empty());
    let reminder = checkup::DailyReminder::new(
        fixture.cache.clone(),
        fixture.clock.clone(),
        MemoryStore::empty(),
        notifier.clone(),
    )
    .with_window(ReminderWindow { hour: 8, minutes: 15 });

    let outcome = reminder.maybe_notify_daily("m1", "Shop", Some(1), MonitorStatus::Down).await;
    assert_eq!(outcome, ReminderOutcome::Dispatched(NotificationKind::ExpiringCritical(1)));
}

#[tokio::test]
async fn test_previous_status_is_forwarded() {
    let fixture = ReminderFixture::new(
        at(1, 12, 0),
        RecordingNotifier::new(),
        MemoryStore::with("m1", MonitorStatus::Down),
    );

    fixture.reminder.maybe_notify_daily("m1", "Shop", Some(-1), MonitorStatus::Down).await;

    let sent = fixture.notifier.sent();
    assert_eq!(sent[0].previous_status, Some(MonitorStatus::Down));
    assert!(sent[0].message.contains("expired or invalid"));
}

#[tokio::test]
async fn test_store_failure_still_dispatches() {
    let fixture = ReminderFixture::new(at(1, 12, 0), RecordingNotifier::new(), MemoryStore::broken());

    let outcome = fixture.reminder.maybe_notify_daily("m1", "Shop", None, MonitorStatus::Down).await;

    assert_eq!(outcome, ReminderOutcome::Dispatched(NotificationKind::CheckFailedDaily));
    assert_eq!(fixture.notifier.sent()[0].previous_status, None);
}

#[tokio::test]
async fn test_failed_dispatch_can_be_retried() {
    let fixture = ReminderFixture::new(at(1, 12, 0), RecordingNotifier::failing(), MemoryStore::empty());

    let first = fixture.reminder.maybe_notify_daily("m1", "Shop", Some(6), MonitorStatus::Down).await;
    assert_eq!(first, ReminderOutcome::Failed(NotificationKind::ExpiringCritical(6)));
    assert!(fixture.cache.is_empty());

    let second = fixture.reminder.maybe_notify_daily("m1", "Shop", Some(6), MonitorStatus::Down).await;
    assert_eq!(second, ReminderOutcome::Failed(NotificationKind::ExpiringCritical(6)));
}

#[tokio::test(start_paused = true)]
async fn test_reset_task_reopens_reminders() {
    let fixture = ReminderFixture::new(at(1, 12, 0), RecordingNotifier::new(), MemoryStore::empty());
    fixture.reminder.maybe_notify_daily("m1", "Shop", Some(0), MonitorStatus::Down).await;
    assert_eq!(fixture.cache.len(), 1);

    let task = fixture.cache.spawn_daily_reset(fixture.clock.clone());
    fixture.clock.set(at(2, 0, 0));
    tokio::time::sleep(Duration::from_secs(61)).await;
    assert!(fixture.cache.is_empty());
    task.abort();
}
