//! Reminder scheduler: at-least-once delivery with flag-based dedup.

use chrono::Duration;
use voxtask::tasks::{NewTask, Task, TaskPatch, TaskStore};

use crate::helpers::{Harness, OWNER, t0};

async fn task_with_reminder(h: &Harness, title: &str, minutes_from_t0: i64) -> Task {
    let mut new = NewTask::titled(title);
    new.reminder_at = Some(t0() + Duration::minutes(minutes_from_t0));
    h.store.insert(new.into_task(OWNER, t0())).await.unwrap()
}

#[tokio::test]
async fn reminder_is_sent_once_and_marked() {
    let h = Harness::in_memory();
    let task = task_with_reminder(&h, "Buy milk", 30).await;

    // Not due yet.
    assert_eq!(h.scheduler.tick().await.unwrap().due, 0);

    h.clock.advance(Duration::minutes(31));
    let report = h.scheduler.tick().await.unwrap();
    assert_eq!(report.delivered, 1);
    assert!(h.store.find_one(OWNER, &task.id).await.unwrap().unwrap().reminder_sent);

    // Email and WhatsApp both enabled for this profile.
    assert_eq!(h.email.sent().len(), 1);
    assert_eq!(h.whatsapp.sent().len(), 1);
    assert_eq!(h.whatsapp.sent()[0].0.key.as_deref(), Some("wa-key"));
    assert!(h.email.sent()[0].1.subject.contains("Buy milk"));

    // Second tick finds nothing.
    h.clock.advance(Duration::minutes(1));
    assert_eq!(h.scheduler.tick().await.unwrap().due, 0);
    assert_eq!(h.email.sent().len(), 1);
}

#[tokio::test]
async fn failed_delivery_leaves_flag_clear_and_retries() {
    let h = Harness::in_memory();
    let task = task_with_reminder(&h, "Pay rent", -1).await;
    h.email.set_failing(true);
    h.whatsapp.set_failing(true);

    let report = h.scheduler.tick().await.unwrap();
    assert_eq!(report.failed, 1);
    assert!(!h.store.find_one(OWNER, &task.id).await.unwrap().unwrap().reminder_sent);

    h.email.set_failing(false);
    let report = h.scheduler.tick().await.unwrap();
    assert_eq!(report.delivered, 1);
    assert!(h.store.find_one(OWNER, &task.id).await.unwrap().unwrap().reminder_sent);
}

#[tokio::test]
async fn one_working_channel_is_enough() {
    let h = Harness::in_memory();
    let task = task_with_reminder(&h, "Call mum", -5).await;
    h.email.set_failing(true);

    let report = h.scheduler.tick().await.unwrap();
    assert_eq!(report.delivered, 1);
    assert_eq!(h.whatsapp.sent().len(), 1);
    assert!(h.store.find_one(OWNER, &task.id).await.unwrap().unwrap().reminder_sent);
}

#[tokio::test]
async fn completed_tasks_are_not_reminded() {
    let h = Harness::in_memory();
    let task = task_with_reminder(&h, "Old chore", -10).await;
    h.store
        .update_one(&task.id, OWNER, &TaskPatch::complete(), t0())
        .await
        .unwrap();

    assert_eq!(h.scheduler.tick().await.unwrap().due, 0);
    assert!(h.email.sent().is_empty());
}

#[tokio::test]
async fn rescheduling_rearms_a_sent_reminder() {
    let h = Harness::in_memory();
    let task = task_with_reminder(&h, "Dentist", -1).await;
    h.scheduler.tick().await.unwrap();
    assert_eq!(h.email.sent().len(), 1);

    let reply = h
        .say(
            "move the dentist reminder to 9am",
            r#"{"action":"update","task":{"title":"dentist"},"updateFields":{"reminderTime":"2025-06-01T09:00:00Z"}}"#,
        )
        .await;
    assert!(reply.success, "{:?}", reply.error);
    let stored = h.store.find_one(OWNER, &task.id).await.unwrap().unwrap();
    assert!(!stored.reminder_sent);

    h.clock.set(t0() + Duration::hours(1));
    assert_eq!(h.scheduler.tick().await.unwrap().delivered, 1);
    assert_eq!(h.email.sent().len(), 2);
}

#[tokio::test]
async fn stale_mark_after_reschedule_is_ignored() {
    let h = Harness::in_memory();
    let task = task_with_reminder(&h, "Dentist", -1).await;
    let old = task.reminder_at.unwrap();

    let patch = TaskPatch {
        reminder_at: Some(t0() + Duration::hours(2)),
        ..TaskPatch::default()
    };
    h.store.update_one(&task.id, OWNER, &patch, t0()).await.unwrap();

    assert!(!h.store.mark_reminder_sent(&task.id, old).await.unwrap());
    assert!(!h.store.find_one(OWNER, &task.id).await.unwrap().unwrap().reminder_sent);
}
