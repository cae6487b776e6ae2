mod common;

use common::{FailingDirectory, FailingNotifications, StalledDirectory, StalledNotifications, TestEnv};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use engagement_service::ServiceError;

#[tokio::test]
async fn test_fanout_failure_does_not_fail_mutation() {
    let store = Arc::new(FailingNotifications::default());
    let env = TestEnv::with_notification_store(store.clone());
    let owner = env.user("olivia", None).await;
    let carol = env.user("carol", None).await;
    let outfit = env.outfit(owner).await;

    let outcome = env.service.toggle_like(Some(carol), outfit).await.unwrap();
    assert!(outcome.active);
    assert_eq!(outcome.count, 1);

    env.service.follow(Some(carol), owner).await.unwrap();
    assert!(env.service.is_following(Some(carol), owner).await.unwrap());

    env.service
        .add_comment(Some(carol), outfit, "great", None)
        .await
        .unwrap();

    assert_eq!(store.attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_fanout_timeout_does_not_fail_mutation() {
    let env = TestEnv::with_notification_store(Arc::new(StalledNotifications));
    let owner = env.user("olivia", None).await;
    let carol = env.user("carol", None).await;
    let outfit = env.outfit(owner).await;

    let outcome = env.service.toggle_save(Some(carol), outfit.id).await.unwrap();
    assert!(outcome.active);
    assert!(env.service.is_saved(Some(carol), outfit.id).await.unwrap());
}

#[tokio::test]
async fn test_stalled_directory_does_not_hold_mutations() {
    let env = TestEnv::with_directory(Arc::new(StalledDirectory));
    let owner = env.user("olivia", None).await;
    let carol = env.user("carol", None).await;
    let outfit = env.outfit(owner).await;

    let outcome = tokio::time::timeout(
        Duration::from_secs(1),
        env.service.toggle_like(Some(carol), outfit),
    )
    .await
    .expect("like held up by actor lookup")
    .unwrap();
    assert!(outcome.active);
    assert_eq!(outcome.count, 1);

    tokio::time::timeout(Duration::from_secs(1), env.service.follow(Some(carol), owner))
        .await
        .expect("follow held up by actor lookup")
        .unwrap();

    let view = tokio::time::timeout(
        Duration::from_secs(1),
        env.service.add_comment(Some(carol), outfit, "hello", None),
    )
    .await
    .expect("comment held up by author lookup")
    .unwrap();
    assert!(view.author.is_none());

    // The lookup timed out, so no notification was written.
    assert_eq!(env.service.unread_notification_count(Some(owner)).await.unwrap(), 0);
}

#[tokio::test]
async fn test_failing_directory_after_commit_still_succeeds() {
    let env = TestEnv::with_directory(Arc::new(FailingDirectory));
    let owner = env.user("olivia", None).await;
    let erin = env.user("erin", Some("Erin")).await;
    let outfit = env.outfit(owner).await;

    let view = env
        .service
        .add_comment(Some(erin), outfit, "hello", None)
        .await
        .unwrap();
    assert_eq!(view.comment.body, "hello");
    assert!(view.author.is_none());
    assert_eq!(env.service.content_counts(outfit).await.unwrap().comments_count, 1);

    let outcome = env.service.follow(Some(erin), owner).await.unwrap();
    assert!(outcome.following);
    assert_eq!(outcome.followee.followers_count, 1);

    let outcome = env.service.unfollow(Some(erin), owner).await.unwrap();
    assert!(!outcome.following);
    assert_eq!(outcome.followee.followers_count, 0);

    // Fan-out falls back to a generic actor name.
    let inbox = env.notifications_for(owner).await;
    assert_eq!(inbox.len(), 2);
    assert_eq!(
        inbox[1].message.as_deref(),
        Some("Someone commented: \"hello\"")
    );
    assert_eq!(inbox[0].message.as_deref(), Some("Someone started following you"));
}

#[tokio::test]
async fn test_mark_read_and_unread_count() {
    let env = TestEnv::new();
    let alice = env.user("alice", None).await;
    let bob = env.user("bob", None).await;
    let carol = env.user("carol", None).await;
    let outfit = env.outfit(alice).await;

    env.service.follow(Some(bob), alice).await.unwrap();
    env.service.follow(Some(carol), alice).await.unwrap();
    env.service.toggle_like(Some(bob), outfit).await.unwrap();

    assert_eq!(env.service.unread_notification_count(Some(alice)).await.unwrap(), 3);

    let inbox = env.notifications_for(alice).await;
    // Newest first
    assert_eq!(inbox[0].actor_id, Some(bob));
    assert!(inbox[0].target.is_some());

    env.service
        .mark_notification_read(Some(alice), inbox[0].id)
        .await
        .unwrap();
    assert_eq!(env.service.unread_notification_count(Some(alice)).await.unwrap(), 2);

    let unread = env
        .service
        .list_notifications(Some(alice), 50, 0, true)
        .await
        .unwrap();
    assert_eq!(unread.len(), 2);
    assert!(unread.iter().all(|n| !n.read));

    let updated = env
        .service
        .mark_all_notifications_read(Some(alice))
        .await
        .unwrap();
    assert_eq!(updated, 2);
    assert_eq!(env.service.unread_notification_count(Some(alice)).await.unwrap(), 0);
    assert_eq!(
        env.service
            .mark_all_notifications_read(Some(alice))
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_mark_read_rejects_foreign_and_missing() {
    let env = TestEnv::new();
    let alice = env.user("alice", None).await;
    let bob = env.user("bob", None).await;

    env.service.follow(Some(bob), alice).await.unwrap();
    let inbox = env.notifications_for(alice).await;

    let err = env
        .service
        .mark_notification_read(Some(bob), inbox[0].id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let err = env
        .service
        .mark_notification_read(Some(alice), Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let err = env
        .service
        .mark_notification_read(None, inbox[0].id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));
}

#[tokio::test]
async fn test_anonymous_reads_return_defaults() {
    let env = TestEnv::new();
    assert!(env
        .service
        .list_notifications(None, 50, 0, false)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(env.service.unread_notification_count(None).await.unwrap(), 0);
}
