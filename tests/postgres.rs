//! Storage tests against a live Postgres.
//!
//! Run with `DATABASE_URL=postgres://... cargo test -- --ignored`. Each test
//! tags its rows with a unique country so runs can share one database.

use chrono::{Duration, Utc};
use phone_tracker::model::{PhoneChanges, PhoneFilter, PhoneStatus};
use phone_tracker::schema::PhoneNumber;
use phone_tracker::{PgStore, PhoneStore, RecordId};
use uuid::Uuid;

// =============================================================================
// Test Helpers
// =============================================================================

async fn connect() -> PgStore {
    let url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for --ignored tests");
    PgStore::connect(&url, None, 2)
        .await
        .expect("Failed to connect to Postgres")
}

fn number(phone: &str, tag: &str, status: PhoneStatus, note: Option<&str>) -> PhoneNumber {
    PhoneNumber::new(
        phone.to_string(),
        Some(tag.to_string()),
        status,
        note.map(str::to_string),
    )
    .unwrap()
}

fn tagged(tag: &str) -> PhoneFilter {
    PhoneFilter::new(None, Some(tag.to_string()))
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn insert_find_update_delete_round() {
    let store = connect().await;
    let tag = Uuid::new_v4().to_string();
    let t0 = Utc::now();

    let first = store
        .insert(&number("111", &tag, PhoneStatus::Unknown, Some("keep me")), t0)
        .await
        .unwrap();
    let second = store
        .insert(&number("222", &tag, PhoneStatus::HasFb, None), t0)
        .await
        .unwrap();
    let third = store
        .insert(&number("333", &tag, PhoneStatus::HasFb, None), t0)
        .await
        .unwrap();
    assert_ne!(first, second);

    // Insertion order, with and without a limit.
    let all = store.find(&tagged(&tag), None).await.unwrap();
    let ids: Vec<RecordId> = all.iter().map(|r| r.id).collect();
    assert_eq!(ids, [first, second, third]);
    assert_eq!(all[0].created_at.map(|t| t.timestamp()), Some(t0.timestamp()));
    assert_eq!(store.find(&tagged(&tag), Some(2)).await.unwrap().len(), 2);

    let filter = PhoneFilter::new(Some("has_fb".into()), Some(tag.clone()));
    let has_fb = store.find(&filter, None).await.unwrap();
    assert_eq!(has_fb.iter().map(|r| r.id).collect::<Vec<_>>(), [second, third]);

    // Partial update leaves the other columns untouched.
    let t1 = t0 + Duration::seconds(30);
    let changes = PhoneChanges {
        status: Some(PhoneStatus::Review),
        ..Default::default()
    };
    assert_eq!(store.update(first, &changes, t1).await.unwrap(), 1);

    let updated = store
        .find(&tagged(&tag), None)
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.id == first)
        .unwrap();
    assert_eq!(updated.status, PhoneStatus::Review);
    assert_eq!(updated.phone, "111");
    assert_eq!(updated.country.as_deref(), Some(tag.as_str()));
    assert_eq!(updated.note.as_deref(), Some("keep me"));
    assert_eq!(updated.updated_at.map(|t| t.timestamp()), Some(t1.timestamp()));
    assert_eq!(updated.created_at.map(|t| t.timestamp()), Some(t0.timestamp()));

    for id in [first, second, third] {
        assert_eq!(store.delete(id).await.unwrap(), 1);
    }
    assert_eq!(store.delete(first).await.unwrap(), 0);
    assert_eq!(store.update(first, &changes, t1).await.unwrap(), 0);
    assert!(store.find(&tagged(&tag), None).await.unwrap().is_empty());

    store.close().await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn search_is_literal_and_case_insensitive() {
    let store = connect().await;
    let tag = Uuid::new_v4().to_string();
    let now = Utc::now();

    let dotted = store
        .insert(&number("555", &tag, PhoneStatus::Unknown, Some("Ref A.B")), now)
        .await
        .unwrap();
    let other = store
        .insert(&number("556", &tag, PhoneStatus::Unknown, Some("ref axb")), now)
        .await
        .unwrap();

    let filter = PhoneFilter::new(None, Some("a.b".into()));
    let found: Vec<RecordId> = store
        .find(&filter, None)
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.country.as_deref() == Some(tag.as_str()))
        .map(|r| r.id)
        .collect();
    assert_eq!(found, [dotted]);

    let names = store.collection_names().await.unwrap();
    assert!(names.iter().any(|n| n == "phonenumber"));

    store.delete(dotted).await.unwrap();
    store.delete(other).await.unwrap();
    store.close().await;
}
