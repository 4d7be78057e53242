mod common;

use common::forum;
use rf_core::Page;

/// General > Intro, alice posts a thread and a reply, then her account is
/// deleted. Content outlives its author.
#[tokio::test]
async fn test_board_survives_author_deletion() {
    let (forum, _) = forum();
    let general = forum.categories.create("General").await.unwrap();
    let intro = forum.subs.create(&general, "Intro", "Say hello").await.unwrap();
    let alice = forum.users.create("alice", "pw").await.unwrap();
    let thread = forum
        .threads
        .create(&alice, &intro, "Hello", "First!")
        .await
        .unwrap();
    let post = forum.posts.create(&alice, &thread, "Hi there").await.unwrap();

    let threads = forum.subs.get_threads(intro.id, Page::default()).await.unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].id, thread.id);
    assert_eq!(threads[0].user.as_ref().map(|u| u.username.as_str()), Some("alice"));

    let posts = forum.threads.posts(thread.id, Page::default()).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, post.id);
    assert_eq!(posts[0].body, "Hi there");

    assert!(forum.users.delete(alice.id).await.unwrap());

    let orphan = forum.threads.get(thread.id).await.unwrap().unwrap();
    assert_eq!(orphan.record.user, alice.id);
    assert!(orphan.user.is_none());
    let threads = forum.subs.get_threads(intro.id, Page::default()).await.unwrap();
    assert_eq!(threads.len(), 1);
    assert!(threads[0].user.is_none());
    let posts = forum.threads.posts(thread.id, Page::default()).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert!(posts[0].user.is_none());

    // The author's listings went with the account.
    assert!(forum.posts.by_user(alice.id, Page::default()).await.unwrap().is_empty());
    assert!(forum.users.by_username("alice").await.unwrap().is_none());
}

#[tokio::test]
async fn test_board_index_lists_categories_with_subs() {
    let (forum, _) = forum();
    let general = forum.categories.create("General").await.unwrap();
    forum.categories.create_sub(&general, "Intro", "").await.unwrap();
    forum.categories.create("Off Topic").await.unwrap();

    let index = forum.categories.with_subs().await.unwrap();
    let titles: Vec<(&str, usize)> = index
        .iter()
        .map(|(category, subs)| (category.title.as_str(), subs.len()))
        .collect();
    assert_eq!(titles, vec![("Off Topic", 0), ("General", 1)]);
}
