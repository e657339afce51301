mod common;

use chrono::{Duration, Utc};
use common::{USER, dump, result_from, store_with_user, tasks_payload};
use serde_json::json;
use triage::EnergyLevel;
use triage_store::{
    DEFAULT_TIMEZONE, EmailStatus, NeurodivergentFocus, NewEmail, ProfileUpdate, StoreError,
};

#[test]
fn profile_is_created_once_with_defaults() {
    let store = store_with_user();
    let first = store.get_or_create_profile(USER).unwrap();
    assert_eq!(first.default_energy_level, EnergyLevel::Medium);
    assert_eq!(first.timezone, DEFAULT_TIMEZONE);
    assert!(first.email_opt_in);
    assert_eq!(first.neurodivergent_focus, NeurodivergentFocus::Unspecified);

    let again = store.get_or_create_profile(USER).unwrap();
    assert_eq!(again, first);
}

#[test]
fn profile_update_changes_only_given_fields() {
    let store = store_with_user();
    let updated = store
        .update_profile(
            USER,
            &ProfileUpdate {
                default_energy_level: Some(EnergyLevel::High),
                neurodivergent_focus: Some(NeurodivergentFocus::Audhd),
                ..ProfileUpdate::default()
            },
        )
        .unwrap();
    assert_eq!(updated.default_energy_level, EnergyLevel::High);
    assert_eq!(updated.neurodivergent_focus, NeurodivergentFocus::Audhd);
    assert_eq!(updated.timezone, DEFAULT_TIMEZONE);
    assert!(updated.email_opt_in);

    let blank = ProfileUpdate {
        timezone: Some("  ".into()),
        ..ProfileUpdate::default()
    };
    assert!(matches!(
        store.update_profile(USER, &blank),
        Err(StoreError::Invalid { field: "timezone", .. })
    ));
}

#[test]
fn emails_queue_until_send_after() {
    let store = store_with_user();
    let d = dump(&store, USER, "email me");
    let run = store
        .save_triage_result(&d, &result_from(tasks_payload(1, json!([0]))))
        .unwrap();

    let now_email = store
        .queue_email(NewEmail {
            user_id: USER,
            triage_run_id: run.id,
            to_email: " me@example.com ",
            subject: "Your Quick Catch plan",
            body_md: &run.action_plan_md,
            send_after: None,
        })
        .unwrap();
    assert_eq!(now_email.status, EmailStatus::Queued);
    assert_eq!(now_email.send_after, now_email.created_at);
    assert_eq!(now_email.to_email, "me@example.com");

    store
        .queue_email(NewEmail {
            user_id: USER,
            triage_run_id: run.id,
            to_email: "me@example.com",
            subject: "Later",
            body_md: "later",
            send_after: Some(Utc::now() + Duration::hours(2)),
        })
        .unwrap();

    let due = store.due_emails(Utc::now(), 10).unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].id, now_email.id);

    store
        .record_email_status(now_email.id, EmailStatus::Sent, Some("msg-42"), None)
        .unwrap();
    assert!(store.due_emails(Utc::now(), 10).unwrap().is_empty());
    assert!(
        store
            .due_emails(Utc::now() + Duration::hours(3), 10)
            .unwrap()
            .iter()
            .all(|e| e.subject == "Later")
    );

    let missing = store.record_email_status(uuid::Uuid::new_v4(), EmailStatus::Failed, None, Some("x"));
    assert!(missing.unwrap_err().is_not_found());
}

#[test]
fn invalid_recipient_is_rejected() {
    let store = store_with_user();
    let d = dump(&store, USER, "x");
    let run = store
        .save_triage_result(&d, &result_from(tasks_payload(1, json!([0]))))
        .unwrap();
    let err = store
        .queue_email(NewEmail {
            user_id: USER,
            triage_run_id: run.id,
            to_email: "nobody",
            subject: "s",
            body_md: "b",
            send_after: None,
        })
        .unwrap_err();
    assert!(matches!(err, StoreError::Invalid { field: "to_email", .. }));
}

#[test]
fn deleting_a_user_cascades_everything() {
    let store = store_with_user();
    let d = dump(&store, USER, "everything");
    let run = store
        .save_triage_result(&d, &result_from(tasks_payload(3, json!([0, 1, 2]))))
        .unwrap();
    store
        .update_profile(
            USER,
            &ProfileUpdate {
                default_energy_level: Some(EnergyLevel::Low),
                ..ProfileUpdate::default()
            },
        )
        .unwrap();
    store
        .queue_email(NewEmail {
            user_id: USER,
            triage_run_id: run.id,
            to_email: "me@example.com",
            subject: "s",
            body_md: "b",
            send_after: None,
        })
        .unwrap();

    assert!(store.delete_user(USER).unwrap());

    assert!(store.list_dumps_for_user(USER, 50).unwrap().is_empty());
    assert!(store.latest_run_for_dump(d.id).unwrap().is_none());
    assert!(store.tasks_for_run(run.id).unwrap().is_empty());
    assert!(store.due_emails(Utc::now(), 10).unwrap().is_empty());
    assert!(!store.delete_user(USER).unwrap());

    // the Low profile went with the user
    store.ensure_user(USER).unwrap();
    let fresh = store.get_or_create_profile(USER).unwrap();
    assert_eq!(fresh.default_energy_level, EnergyLevel::Medium);
}

#[test]
fn dumps_require_a_known_user() {
    let store = store_with_user();
    let err = store
        .insert_dump(triage_store::NewDump {
            user_id: "ghost",
            input_text: "hello",
            energy_level: EnergyLevel::Medium,
            source: triage_store::Source::Api,
        })
        .unwrap_err();
    assert!(matches!(err, StoreError::Sqlite(_)));
}
