mod common;

use common::TestEnv;
use engagement_service::domain::models::{ContentRef, EngagementKind, NotificationKind};
use engagement_service::ServiceError;
use uuid::Uuid;

#[tokio::test]
async fn test_like_increments_count_and_notifies_owner() {
    let env = TestEnv::new();
    let owner = env.user("olivia", Some("Olivia")).await;
    let carol = env.user("carol", Some("Carol King")).await;
    let outfit = env.outfit_with_likes(owner, 5).await;

    let outcome = env.service.toggle_like(Some(carol), outfit).await.unwrap();
    assert!(outcome.active);
    assert_eq!(outcome.count, 6);
    assert!(env.service.is_liked(Some(carol), outfit).await.unwrap());

    let counts = env.service.content_counts(outfit).await.unwrap();
    assert_eq!(counts.likes_count, 6);

    let inbox = env.notifications_for(owner).await;
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].kind, NotificationKind::Like);
    assert_eq!(inbox[0].actor_id, Some(carol));
    assert_eq!(inbox[0].target, Some(outfit));
    assert_eq!(
        inbox[0].message.as_deref(),
        Some("Carol King liked your outfit")
    );
}

#[tokio::test]
async fn test_unlike_restores_count_without_new_notification() {
    let env = TestEnv::new();
    let owner = env.user("olivia", None).await;
    let carol = env.user("carol", None).await;
    let post = env.post(owner).await;

    env.service.toggle_like(Some(carol), post).await.unwrap();
    let outcome = env.service.toggle_like(Some(carol), post).await.unwrap();
    assert!(!outcome.active);
    assert_eq!(outcome.count, 0);
    assert!(!env.service.is_liked(Some(carol), post).await.unwrap());

    let inbox = env.notifications_for(owner).await;
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].message.as_deref(), Some("carol liked your post"));
}

#[tokio::test]
async fn test_toggle_parity() {
    let env = TestEnv::new();
    let owner = env.user("olivia", None).await;
    let carol = env.user("carol", None).await;
    let outfit = env.outfit_with_likes(owner, 3).await;

    for _ in 0..4 {
        env.service.toggle_like(Some(carol), outfit).await.unwrap();
    }
    assert_eq!(env.service.content_counts(outfit).await.unwrap().likes_count, 3);

    env.service.toggle_like(Some(carol), outfit).await.unwrap();
    assert_eq!(env.service.content_counts(outfit).await.unwrap().likes_count, 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_toggles_from_one_actor() {
    let env = TestEnv::new();
    let owner = env.user("olivia", None).await;
    let carol = env.user("carol", None).await;
    let outfit = env.outfit_with_likes(owner, 10).await;

    for (rounds, expected) in [(8usize, 10i64), (7, 11)] {
        let mut handles = Vec::with_capacity(rounds);
        for _ in 0..rounds {
            let service = env.service.clone();
            handles.push(tokio::spawn(async move {
                service.toggle_like(Some(carol), outfit).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let counts = env.service.content_counts(outfit).await.unwrap();
        assert_eq!(counts.likes_count, expected);
        let edges = env.backend.edge_count(outfit, EngagementKind::Like).await;
        assert_eq!(edges as i64, expected - 10);
    }
}

#[tokio::test]
async fn test_self_like_counts_but_does_not_notify() {
    let env = TestEnv::new();
    let owner = env.user("olivia", None).await;
    let outfit = env.outfit(owner).await;

    let outcome = env.service.toggle_like(Some(owner), outfit).await.unwrap();
    assert!(outcome.active);
    assert_eq!(outcome.count, 1);
    assert!(env.notifications_for(owner).await.is_empty());
}

#[tokio::test]
async fn test_save_outfit() {
    let env = TestEnv::new();
    let owner = env.user("olivia", None).await;
    let dan = env.user("dan", Some("Dan")).await;
    let outfit = env.outfit(owner).await;

    let outcome = env.service.toggle_save(Some(dan), outfit.id).await.unwrap();
    assert!(outcome.active);
    assert_eq!(outcome.count, 1);
    assert!(env.service.is_saved(Some(dan), outfit.id).await.unwrap());

    let counts = env.service.content_counts(outfit).await.unwrap();
    assert_eq!(counts.saves_count, Some(1));
    assert_eq!(counts.likes_count, 0);

    let inbox = env.notifications_for(owner).await;
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].kind, NotificationKind::Save);
    assert_eq!(inbox[0].title, "Outfit saved");
    assert_eq!(inbox[0].message.as_deref(), Some("Dan saved your outfit"));

    let outcome = env.service.toggle_save(Some(dan), outfit.id).await.unwrap();
    assert!(!outcome.active);
    assert_eq!(outcome.count, 0);
}

#[tokio::test]
async fn test_posts_have_no_save_counter() {
    let env = TestEnv::new();
    let owner = env.user("olivia", None).await;
    let post = env.post(owner).await;

    let counts = env.service.content_counts(post).await.unwrap();
    assert_eq!(counts.saves_count, None);

    // A post id is not an outfit
    let err = env.service.toggle_save(Some(owner), post.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn test_engagement_errors() {
    let env = TestEnv::new();
    let carol = env.user("carol", None).await;
    let missing = ContentRef::outfit(Uuid::new_v4());

    let err = env.service.toggle_like(Some(carol), missing).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let err = env.service.toggle_like(None, missing).await.unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));

    assert!(!env.service.is_liked(None, missing).await.unwrap());
    assert!(!env.service.is_saved(None, missing.id).await.unwrap());
}

#[tokio::test]
async fn test_unknown_actor_leaves_item_untouched() {
    let env = TestEnv::new();
    let owner = env.user("olivia", None).await;
    let outfit = env.outfit_with_likes(owner, 2).await;
    let stranger = Uuid::new_v4();

    let err = env.service.toggle_like(Some(stranger), outfit).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
    let err = env.service.toggle_save(Some(stranger), outfit.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let err = env
        .service
        .add_comment(Some(stranger), outfit, "hi", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let counts = env.service.content_counts(outfit).await.unwrap();
    assert_eq!(counts.likes_count, 2);
    assert_eq!(counts.saves_count, Some(0));
    assert_eq!(counts.comments_count, 0);
    assert_eq!(env.backend.edge_count(outfit, EngagementKind::Like).await, 0);
    assert!(env.notifications_for(owner).await.is_empty());
}
