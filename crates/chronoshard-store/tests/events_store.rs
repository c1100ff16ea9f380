//! Integration tests for the master event store over the in-memory
//! driver.

mod common;

use chronoshard_core::types::{AttendanceStatus, Repeat, Scope};
use chronoshard_store::error::StoreError;
use chronoshard_store::store::events::{ListEvents, SystemListEvents, UpdateEvent};

use common::{DEPARTMENT, OTHER_SHOP, USER, at, basic_event, frozen_now, harness, scope};

fn update_keeping(event: &chronoshard_store::model::event::Event) -> UpdateEvent {
    UpdateEvent {
        id: event.id.to_string(),
        title: String::new(),
        description: event.description.clone(),
        start_time: event.start_time,
        end_time: event.end_time,
        all_day: event.all_day,
        repeat: event.repeat,
        repeat_until: event.repeat_until,
        public: event.public,
        assign_ids: event.assign_ids.clone().unwrap_or_default(),
        department_ids: event.department_ids.clone().unwrap_or_default(),
        branch_ids: event.branch_ids.clone().unwrap_or_default(),
        room_ids: event.room_ids.clone().unwrap_or_default(),
        notify_time: event.notify_time,
    }
}

fn full_year() -> ListEvents {
    ListEvents {
        from: at(2024, 1, 1, 0),
        to: at(2024, 12, 31, 23),
        ids: Vec::new(),
        need_repeat: None,
        visibility: chronoshard_store::db::query::scope::VisibilityOptions::default(),
    }
}

#[test_log::test(tokio::test)]
async fn create_then_detail_round_trips_every_field() {
    let h = harness();
    let sc = scope();

    let mut input = basic_event("sprint planning", at(2024, 2, 5, 9), at(2024, 2, 5, 10));
    input.repeat = Repeat::Weekly;
    input.repeat_until = Some(at(2024, 6, 1, 0));
    input.public = true;
    input.assign_ids = vec!["user-2".to_string()];
    input.department_ids = vec![DEPARTMENT.to_string()];
    input.notify_time = Some(at(2024, 2, 5, 8));

    let created = h.events.create(&sc, input).await.unwrap();
    let fetched = h.events.detail(&sc, &created.id.to_string()).await.unwrap();

    assert_eq!(created, fetched);
    assert_eq!(fetched.created_by_id.as_deref(), Some(USER));
    assert_eq!(fetched.created_at, frozen_now());
    assert_eq!(fetched.assign_ids.as_deref(), Some(&["user-2".to_string()][..]));

    // February lands in the first quarter's collection.
    assert!(h.db.collection_names().contains(&"events_2024_1".to_string()));
}

#[test_log::test(tokio::test)]
async fn all_day_events_are_normalized_to_the_full_day() {
    let h = harness();
    let sc = scope();

    let mut input = basic_event("company holiday", at(2024, 3, 10, 14), at(2024, 3, 10, 15));
    input.all_day = true;

    let created = h.events.create(&sc, input).await.unwrap();

    assert_eq!(created.start_time, at(2024, 3, 10, 0));
    assert_eq!(created.end_time.timestamp_millis() % 1000, 999);
    assert_eq!(created.end_time.date_naive(), created.start_time.date_naive());
}

#[test_log::test(tokio::test)]
async fn ownership_is_exclusive_between_system_and_creator() {
    let h = harness();
    let ownerless = Scope::new(common::SHOP, "");

    let err = h
        .events
        .create(&ownerless, basic_event("x", at(2024, 2, 1, 9), at(2024, 2, 1, 10)))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidArgument(_)));

    let mut system_input = basic_event("cleanup job", at(2024, 2, 1, 9), at(2024, 2, 1, 10));
    system_input.system = true;
    let created = h.events.create(&ownerless, system_input).await.unwrap();
    assert!(created.system);
    assert_eq!(created.created_by_id, None);
}

#[test_log::test(tokio::test)]
async fn repeat_until_without_a_pattern_is_rejected() {
    let h = harness();
    let sc = scope();

    let mut input = basic_event("x", at(2024, 2, 1, 9), at(2024, 2, 1, 10));
    input.repeat_until = Some(at(2024, 3, 1, 0));

    let err = h.events.create(&sc, input).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidArgument(_)));
}

#[test_log::test(tokio::test)]
async fn empty_audience_list_unsets_the_stored_field() {
    let h = harness();
    let sc = scope();

    let mut input = basic_event("standup", at(2024, 2, 5, 9), at(2024, 2, 5, 10));
    input.assign_ids = vec!["u1".to_string(), "u2".to_string()];
    let created = h.events.create(&sc, input).await.unwrap();

    let mut update = update_keeping(&created);
    update.assign_ids = Vec::new();
    let updated = h.events.update(&sc, &update).await.unwrap();
    assert_eq!(updated.assign_ids, None);

    let raw = h.db.raw_documents("events_2024_1");
    let doc = raw
        .iter()
        .find(|d| d["id"] == serde_json::json!(created.id.to_string()))
        .unwrap();
    assert!(!doc.contains_key("assign_ids"));

    let fetched = h.events.detail(&sc, &created.id.to_string()).await.unwrap();
    assert_eq!(fetched.assign_ids, None);
}

#[test_log::test(tokio::test)]
async fn non_empty_audience_list_sets_and_empty_title_leaves_prior_value() {
    let h = harness();
    let sc = scope();

    let created = h
        .events
        .create(&sc, basic_event("standup", at(2024, 2, 5, 9), at(2024, 2, 5, 10)))
        .await
        .unwrap();

    let mut update = update_keeping(&created);
    update.assign_ids = vec!["u9".to_string()];
    let updated = h.events.update(&sc, &update).await.unwrap();

    assert_eq!(updated.title, "standup");
    assert_eq!(updated.assign_ids.as_deref(), Some(&["u9".to_string()][..]));
}

#[test_log::test(tokio::test)]
async fn attendance_is_idempotent_and_neutral_is_a_no_op() {
    let h = harness();
    let sc = scope();

    let created = h
        .events
        .create(&sc, basic_event("retro", at(2024, 2, 5, 9), at(2024, 2, 5, 10)))
        .await
        .unwrap();
    let id = created.id.to_string();

    h.events
        .update_attendance(&sc, &id, AttendanceStatus::Accept)
        .await
        .unwrap();
    h.events
        .update_attendance(&sc, &id, AttendanceStatus::Accept)
        .await
        .unwrap();

    let fetched = h.events.detail(&sc, &id).await.unwrap();
    assert_eq!(fetched.accepted_ids.as_deref(), Some(&[USER.to_string()][..]));
    assert!(fetched.declined_ids.unwrap_or_default().is_empty());

    h.events
        .update_attendance(&sc, &id, AttendanceStatus::Decline)
        .await
        .unwrap();
    let fetched = h.events.detail(&sc, &id).await.unwrap();
    assert!(fetched.accepted_ids.clone().unwrap_or_default().is_empty());
    assert_eq!(fetched.declined_ids.as_deref(), Some(&[USER.to_string()][..]));

    // Neutral performs no write: the declined membership stays.
    h.events
        .update_attendance(&sc, &id, AttendanceStatus::Neutral)
        .await
        .unwrap();
    let fetched = h.events.detail(&sc, &id).await.unwrap();
    assert_eq!(fetched.declined_ids.as_deref(), Some(&[USER.to_string()][..]));
}

#[test_log::test(tokio::test)]
async fn soft_delete_hides_the_row_but_keeps_it_physically() {
    let h = harness();
    let sc = scope();

    let created = h
        .events
        .create(&sc, basic_event("old", at(2024, 2, 5, 9), at(2024, 2, 5, 10)))
        .await
        .unwrap();
    let id = created.id.to_string();

    h.events.soft_delete(&sc, &id).await.unwrap();

    assert!(matches!(
        h.events.detail(&sc, &id).await.unwrap_err(),
        StoreError::NotFound(_)
    ));
    assert!(h.events.list(&sc, &full_year()).await.unwrap().is_empty());

    let raw = h.db.raw_documents("events_2024_1");
    assert_eq!(raw.len(), 1);
    assert!(raw[0].contains_key("deleted_at"));

    // Deleting again finds nothing live.
    assert!(matches!(
        h.events.soft_delete(&sc, &id).await.unwrap_err(),
        StoreError::NotFound(_)
    ));
}

#[test_log::test(tokio::test)]
async fn list_fans_out_across_every_touched_bucket() {
    let h = harness();
    let sc = scope();

    for (month, title) in [(2, "feb"), (5, "may"), (9, "sep")] {
        h.events
            .create(&sc, basic_event(title, at(2024, month, 5, 9), at(2024, month, 5, 10)))
            .await
            .unwrap();
    }

    let listed = h.events.list(&sc, &full_year()).await.unwrap();

    let mut titles: Vec<&str> = listed.iter().map(|e| e.title.as_str()).collect();
    titles.sort_unstable();
    assert_eq!(titles, vec!["feb", "may", "sep"]);
}

#[test_log::test(tokio::test)]
async fn one_failing_shard_fails_the_whole_list() {
    let h = harness();
    let sc = scope();

    for month in [2, 5, 9] {
        h.events
            .create(&sc, basic_event("e", at(2024, month, 5, 9), at(2024, month, 5, 10)))
            .await
            .unwrap();
    }
    // May lives in the second quarter's collection.
    h.db.fail_collection("events_2024_2");

    let err = h.events.list(&sc, &full_year()).await.unwrap_err();
    assert!(matches!(err, StoreError::Storage { .. }));

    h.db.restore_collection("events_2024_2");
    assert_eq!(h.events.list(&sc, &full_year()).await.unwrap().len(), 3);
}

#[test_log::test(tokio::test)]
async fn list_by_ids_groups_ids_sharing_a_bucket() {
    let h = harness();
    let sc = scope();

    let mut ids = Vec::new();
    for month in [2, 3, 9] {
        let created = h
            .events
            .create(&sc, basic_event("e", at(2024, month, 5, 9), at(2024, month, 5, 10)))
            .await
            .unwrap();
        ids.push(created.id.to_string());
    }

    let listed = h.events.list_by_ids(&sc, &ids).await.unwrap();
    assert_eq!(listed.len(), 3);
}

#[test_log::test(tokio::test)]
async fn buckets_split_at_the_year_boundary() {
    let h = harness();
    let sc = scope();

    h.events
        .create(&sc, basic_event("nye", at(2024, 12, 31, 22), at(2024, 12, 31, 23)))
        .await
        .unwrap();
    h.events
        .create(&sc, basic_event("nyd", at(2025, 1, 1, 9), at(2025, 1, 1, 10)))
        .await
        .unwrap();

    let names = h.db.collection_names();
    assert!(names.contains(&"events_2024_4".to_string()));
    assert!(names.contains(&"events_2025_1".to_string()));
}

#[test_log::test(tokio::test)]
async fn other_tenants_cannot_see_the_event() {
    let h = harness();
    let sc = scope();
    let other = Scope::new(OTHER_SHOP, "user-9");

    let created = h
        .events
        .create(&sc, basic_event("private", at(2024, 2, 5, 9), at(2024, 2, 5, 10)))
        .await
        .unwrap();

    assert!(matches!(
        h.events.detail(&other, &created.id.to_string()).await.unwrap_err(),
        StoreError::NotFound(_)
    ));
    assert!(h.events.list(&other, &full_year()).await.unwrap().is_empty());
}

#[test_log::test(tokio::test)]
async fn visibility_hides_other_users_private_events() {
    let h = harness();
    let owner = scope();
    let viewer = Scope::new(common::SHOP, "user-2");

    h.events
        .create(&owner, basic_event("private", at(2024, 2, 5, 9), at(2024, 2, 5, 10)))
        .await
        .unwrap();
    let mut public_input = basic_event("town hall", at(2024, 2, 6, 9), at(2024, 2, 6, 10));
    public_input.public = true;
    h.events.create(&owner, public_input).await.unwrap();

    let visible = h.events.list(&viewer, &full_year()).await.unwrap();
    let titles: Vec<&str> = visible.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["town hall"]);
}

#[test_log::test(tokio::test)]
async fn system_list_sees_everything_and_filters_by_notify_time() {
    let h = harness();
    let sc = scope();

    let mut input = basic_event("private", at(2024, 2, 5, 9), at(2024, 2, 5, 10));
    input.notify_time = Some(at(2024, 2, 5, 8));
    h.events.create(&sc, input).await.unwrap();

    let mut other = basic_event("other", at(2024, 2, 6, 9), at(2024, 2, 6, 10));
    other.notify_time = Some(at(2024, 2, 6, 8));
    h.events.create(&sc, other).await.unwrap();

    let jobs = Scope::new(common::SHOP, "");
    let due = h
        .events
        .system_list(
            &jobs,
            &SystemListEvents {
                from: at(2024, 1, 1, 0),
                to: at(2024, 12, 31, 23),
                need_repeat: None,
                notify_time: Some(at(2024, 2, 5, 8)),
            },
        )
        .await
        .unwrap();

    assert_eq!(due.len(), 1);
    assert_eq!(due[0].title, "private");
}

#[test_log::test(tokio::test)]
async fn update_repeat_until_moves_the_horizon() {
    let h = harness();
    let sc = scope();

    let mut input = basic_event("weekly", at(2024, 2, 5, 9), at(2024, 2, 5, 10));
    input.repeat = Repeat::Weekly;
    input.repeat_until = Some(at(2024, 3, 1, 0));
    let created = h.events.create(&sc, input).await.unwrap();

    h.events
        .update_repeat_until(&sc, &created.id.to_string(), at(2024, 6, 1, 0))
        .await
        .unwrap();

    let fetched = h.events.detail(&sc, &created.id.to_string()).await.unwrap();
    assert_eq!(fetched.repeat_until, Some(at(2024, 6, 1, 0)));
}

#[test_log::test(tokio::test)]
async fn malformed_identifiers_are_rejected_locally() {
    let h = harness();
    let sc = scope();

    assert!(matches!(
        h.events.detail(&sc, "not-an-id").await.unwrap_err(),
        StoreError::InvalidIdentifier(_)
    ));

    let missing = uuid::Uuid::now_v7().to_string();
    assert!(matches!(
        h.events
            .update_attendance(&sc, &missing, AttendanceStatus::Accept)
            .await
            .unwrap_err(),
        StoreError::NotFound(_)
    ));
}
