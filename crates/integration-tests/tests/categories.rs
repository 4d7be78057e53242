mod common;

use common::{board, forum};
use rf_core::{AppError, Entity, Id, Page, SubUpdate};

#[tokio::test]
async fn test_create_then_get_category() {
    let (forum, _) = forum();
    let general = forum.categories.create("General").await.unwrap();

    assert_eq!(forum.categories.get(general.id).await.unwrap(), Some(general.clone()));
    assert_eq!(forum.categories.by_title("General").await.unwrap(), Some(general));
    assert!(forum.categories.by_title("Nope").await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_category_title_is_rejected() {
    let (forum, store) = forum();
    let first = forum.categories.create("General").await.unwrap();

    let err = forum.categories.create("General").await.unwrap_err();
    assert!(matches!(err, AppError::AlreadyExists { entity: Entity::Category, .. }));
    assert_eq!(forum.categories.all().await.unwrap(), vec![first]);
    assert!(store.contains_key("category:categorys"));
}

#[tokio::test]
async fn test_duplicate_sub_title_is_rejected_across_categories() {
    let (forum, _) = forum();
    let general = forum.categories.create("General").await.unwrap();
    let other = forum.categories.create("Other").await.unwrap();
    let intro = forum.subs.create(&general, "Intro", "hello").await.unwrap();

    let err = forum.subs.create(&other, "Intro", "again").await.unwrap_err();
    assert!(matches!(err, AppError::AlreadyExists { entity: Entity::Sub, .. }));
    assert_eq!(forum.subs.by_title("Intro").await.unwrap(), Some(intro));
    assert!(forum.categories.subs(other.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sub_links_into_its_category() {
    let (forum, _) = forum();
    let general = forum.categories.create("General").await.unwrap();
    let intro = forum.categories.create_sub(&general, "t", "d").await.unwrap();
    assert_eq!(intro.category, general.id);
    assert_eq!(intro.description, "d");

    assert_eq!(forum.categories.subs(general.id).await.unwrap(), vec![intro.clone()]);

    assert!(forum.subs.delete(intro.id).await.unwrap());
    assert!(forum.categories.subs(general.id).await.unwrap().is_empty());
    assert!(forum.subs.by_title("t").await.unwrap().is_none());
    assert!(forum.subs.get(intro.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_rename_category_moves_title_index() {
    let (forum, _) = forum();
    let general = forum.categories.create("General").await.unwrap();

    let renamed = forum.categories.edit(general.id, "Lobby").await.unwrap().unwrap();
    assert_eq!(renamed.title, "Lobby");
    assert!(forum.categories.by_title("General").await.unwrap().is_none());
    assert_eq!(forum.categories.by_title("Lobby").await.unwrap(), Some(renamed));

    // The freed title can be taken by someone else.
    forum.categories.create("General").await.unwrap();
    assert!(forum.categories.edit(Id(999), "Ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn test_sub_edit_updates_description_without_touching_index() {
    let (forum, _) = forum();
    let general = forum.categories.create("General").await.unwrap();
    let intro = forum.subs.create(&general, "Intro", "old").await.unwrap();

    let update = SubUpdate {
        description: Some("new".into()),
        ..SubUpdate::default()
    };
    let edited = forum.subs.edit(intro.id, update).await.unwrap().unwrap();
    assert_eq!(edited.description, "new");
    assert_eq!(edited.title, "Intro");
    assert_eq!(forum.subs.by_title("Intro").await.unwrap().map(|s| s.id), Some(intro.id));

    let update = SubUpdate {
        title: Some("Welcome".into()),
        ..SubUpdate::default()
    };
    forum.subs.edit(intro.id, update).await.unwrap();
    assert!(forum.subs.by_title("Intro").await.unwrap().is_none());
    assert_eq!(forum.subs.by_title("Welcome").await.unwrap().map(|s| s.id), Some(intro.id));
}

#[tokio::test]
async fn test_with_subs_lists_every_category() {
    let (forum, _) = forum();
    let general = forum.categories.create("General").await.unwrap();
    let empty = forum.categories.create("Empty").await.unwrap();
    let intro = forum.categories.create_sub(&general, "Intro", "").await.unwrap();
    let rules = forum.categories.create_sub(&general, "Rules", "").await.unwrap();

    let listing = forum.categories.with_subs().await.unwrap();
    assert_eq!(listing.len(), 2);
    let (_, general_subs) = listing.iter().find(|(c, _)| c.id == general.id).unwrap();
    assert_eq!(general_subs, &vec![rules, intro]);
    let (_, empty_subs) = listing.iter().find(|(c, _)| c.id == empty.id).unwrap();
    assert!(empty_subs.is_empty());
}

#[tokio::test]
async fn test_category_delete_cascades_without_leaking_keys() {
    let (forum, store) = forum();
    let (general, intro, alice) = board(&forum).await;
    let thread = forum
        .threads
        .create(&alice, &intro, "Hello", "First!")
        .await
        .unwrap();
    forum.posts.create(&alice, &thread, "Hi there").await.unwrap();
    forum.posts.create(&alice, &thread, "Welcome").await.unwrap();

    assert!(forum.categories.delete(general.id).await.unwrap());

    assert!(forum.categories.get(general.id).await.unwrap().is_none());
    assert!(forum.subs.get(intro.id).await.unwrap().is_none());
    assert!(forum.threads.get(thread.id).await.unwrap().is_none());
    assert!(forum.posts.all(Page::default()).await.unwrap().is_empty());
    assert!(forum.threads.by_user(alice.id, Page::default()).await.unwrap().is_empty());
    assert!(forum.categories.by_title("General").await.unwrap().is_none());
    assert!(forum.subs.by_title("Intro").await.unwrap().is_none());

    let user_key = format!("user:{}", alice.id);
    assert_eq!(
        store.keys(),
        vec!["next_id", user_key.as_str(), "user:all", "user:users"]
    );
    assert!(!forum.categories.delete(general.id).await.unwrap());
}

#[tokio::test]
async fn test_sub_under_deleted_category_is_not_found() {
    let (forum, store) = forum();
    let general = forum.categories.create("General").await.unwrap();
    assert!(forum.categories.delete(general.id).await.unwrap());

    let err = forum
        .categories
        .create_sub(&general, "Intro", "Say hello")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound { entity: Entity::Category, .. }));
    assert!(forum.subs.by_title("Intro").await.unwrap().is_none());
    assert!(!store.contains_key(&format!("category:{}:subs", general.id)));
    assert!(!store.contains_key("sub:all"));
}
