mod common;

use std::sync::Arc;

use common::TickingClock;
use rf_core::fields::field_map;
use rf_core::{Collection, Id, KvStore, Page, RecordStore};
use rf_kv_memory::MemoryStore;

fn store(collection: Collection) -> (RecordStore, Arc<MemoryStore>) {
    let kv = Arc::new(MemoryStore::new());
    let records = RecordStore::new(kv.clone(), collection)
        .with_clock(Arc::new(TickingClock::default()));
    (records, kv)
}

#[tokio::test]
async fn test_ids_strictly_increase_across_collections() {
    let (threads, _) = store(Collection::Thread);
    let posts = threads.sibling(Collection::Post);

    let mut seen = Vec::new();
    for _ in 0..5 {
        seen.push(threads.generate_id().await.unwrap());
        seen.push(posts.generate_id().await.unwrap());
    }
    assert_eq!(seen.first(), Some(&Id(1)));
    assert!(seen.windows(2).all(|pair| pair[0] < pair[1]));
}

#[tokio::test]
async fn test_set_get_and_delete_maintain_all_set() {
    let (categories, kv) = store(Collection::Category);
    let id = categories.generate_id().await.unwrap();
    categories
        .set(id, &field_map([("title", "General".to_string())]))
        .await
        .unwrap();

    let record = categories.get(id).await.unwrap().unwrap();
    assert_eq!(record.id(), "1");
    assert_eq!(record.get("title"), Some("General"));
    assert_eq!(record.fields().len(), 1);
    assert_eq!(categories.all_ids().await.unwrap(), vec!["1"]);
    assert!(kv.contains_key("category:1"));

    assert!(categories.delete(id).await.unwrap());
    assert!(categories.get(id).await.unwrap().is_none());
    assert!(categories.all_ids().await.unwrap().is_empty());
    assert!(!categories.delete(id).await.unwrap());
}

#[tokio::test]
async fn test_delete_field_leaves_other_fields() {
    let (users, _) = store(Collection::User);
    users
        .set(3, &field_map([("username", "marv".to_string()), ("session", "abc".to_string())]))
        .await
        .unwrap();
    assert_eq!(users.delete_field(3, &["session"]).await.unwrap(), 1);

    let record = users.get(3).await.unwrap().unwrap();
    assert_eq!(record.get("username"), Some("marv"));
    assert_eq!(record.get("session"), None);
}

#[tokio::test]
async fn test_edit_relocates_linked_value() {
    let (categories, _) = store(Collection::Category);
    categories.link_value_to_id("General", 4).await.unwrap();
    categories
        .set(4, &field_map([("title", "General".to_string())]))
        .await
        .unwrap();

    categories
        .edit(4, Some("title"), &field_map([("title", "Lobby".to_string())]))
        .await
        .unwrap();

    assert_eq!(categories.get_id_by_value("General").await.unwrap(), None);
    assert_eq!(
        categories.get_id_by_value("Lobby").await.unwrap().as_deref(),
        Some("4")
    );
    let record = categories.get(4).await.unwrap().unwrap();
    assert_eq!(record.get("title"), Some("Lobby"));
}

#[tokio::test]
async fn test_edit_into_taken_value_is_rejected() {
    let (categories, _) = store(Collection::Category);
    for (id, title) in [(1, "General"), (2, "Lobby")] {
        categories.link_value_to_id(title, id).await.unwrap();
        categories
            .set(id, &field_map([("title", title.to_string())]))
            .await
            .unwrap();
    }

    let err = categories
        .edit(1, Some("title"), &field_map([("title", "Lobby".to_string())]))
        .await
        .unwrap_err();
    assert!(err.is_already_exists());
    assert_eq!(
        categories.get_id_by_value("General").await.unwrap().as_deref(),
        Some("1")
    );
    let record = categories.get(1).await.unwrap().unwrap();
    assert_eq!(record.get("title"), Some("General"));
}

#[tokio::test]
async fn test_reserve_value_keeps_first_holder() {
    let (subs, _) = store(Collection::Sub);
    assert!(subs.reserve_value("Intro", 1).await.unwrap());
    assert!(!subs.reserve_value("Intro", 2).await.unwrap());
    assert_eq!(subs.get_id_by_value("Intro").await.unwrap().as_deref(), Some("1"));
    assert!(subs.unlink_value("Intro").await.unwrap());
    assert_eq!(subs.get_id_by_value("Intro").await.unwrap(), None);
}

#[tokio::test]
async fn test_members_page_walks_newest_first() {
    let (subs, _) = store(Collection::Sub);
    let key = subs.children_key(1, Collection::Thread);
    assert_eq!(key, "sub:1:threads");
    for member in 1..=7 {
        subs.add_member(&key, member).await.unwrap();
    }

    assert_eq!(
        subs.members_page(&key, Page::new(3, 1)).await.unwrap(),
        vec!["7", "6", "5"]
    );
    assert_eq!(subs.members_page(&key, Page::new(3, 3)).await.unwrap(), vec!["1"]);
    assert!(subs.members_page(&key, Page::new(3, 4)).await.unwrap().is_empty());
    assert!(subs.members_page(&key, Page::new(0, 1)).await.unwrap().is_empty());
    assert!(subs.is_member(&key, 4).await.unwrap());
    assert!(!subs.is_member(&key, 8).await.unwrap());
}

#[tokio::test]
async fn test_member_scores_come_from_the_clock() {
    let kv = Arc::new(MemoryStore::new());
    let subs = RecordStore::new(kv.clone(), Collection::Sub)
        .with_clock(Arc::new(TickingClock::starting_at(1_700_000_000)));
    let threads = subs.sibling(Collection::Thread);
    let key = subs.children_key(1, Collection::Thread);
    for member in 8..=11 {
        subs.add_member(&key, member).await.unwrap();
    }
    threads.add_member(&key, 12).await.unwrap();

    assert_eq!(kv.zscore(&key, "8").await.unwrap(), Some(1_700_000_000));
    assert_eq!(kv.zscore(&key, "12").await.unwrap(), Some(1_700_000_004));
    assert_eq!(
        subs.members(&key).await.unwrap(),
        vec!["12", "11", "10", "9", "8"]
    );
}

#[tokio::test]
async fn test_load_records_skips_dangling_ids() {
    let (posts, _) = store(Collection::Post);
    posts.set(1, &field_map([("body", "hi".to_string())])).await.unwrap();

    let ids = vec!["1".to_string(), "99".to_string()];
    let records = posts.load_records(&ids).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id(), "1");
}
