//! Mutation saga tests against the in-memory store

mod common;

use async_trait::async_trait;
use common::{image, TestContext, MEDIA_FOLDER};
use post_service::db::{
    CommentRepository, MemoryStore, PostRepository, Repositories, UserRepository,
};
use post_service::error::{AppError, Result};
use post_service::models::{NewUser, User, UserList};
use post_service::services::LikeOutcome;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

#[tokio::test]
async fn test_comment_lifecycle_scenario() {
    let ctx = TestContext::new();
    let a = ctx.user("alice").await;
    let b = ctx.user("bob").await;

    let post = ctx
        .posts
        .add_post(a.id, Some("hello".into()), None)
        .await
        .unwrap();
    let comment = ctx.comments.add_comment(b.id, post.id, "nice").await.unwrap();

    let stored = ctx.store.find_post(post.id).await.unwrap().unwrap();
    assert_eq!(stored.comments, vec![comment.id]);
    assert_eq!(ctx.reload(&b).await.replies, vec![comment.id]);

    // The post owner is not the comment author
    let err = ctx
        .comments
        .delete_comment(a.id, post.id, comment.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    let stored = ctx.store.find_post(post.id).await.unwrap().unwrap();
    assert_eq!(stored.comments, vec![comment.id]);
    assert_eq!(ctx.reload(&b).await.replies, vec![comment.id]);
    assert!(ctx.comments.get_comment(comment.id).await.is_ok());

    ctx.comments
        .delete_comment(b.id, post.id, comment.id)
        .await
        .unwrap();
    let stored = ctx.store.find_post(post.id).await.unwrap().unwrap();
    assert!(stored.comments.is_empty());
    assert!(ctx.reload(&b).await.replies.is_empty());
    assert!(matches!(
        ctx.comments.get_comment(comment.id).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_add_post_links_owner() {
    let ctx = TestContext::new();
    let a = ctx.user("alice").await;

    let post = ctx
        .posts
        .add_post(a.id, Some("  hello  ".into()), Some(image(b"png-bytes")))
        .await
        .unwrap();

    assert_eq!(post.admin, a.id);
    assert_eq!(post.text.as_deref(), Some("hello"));
    let media = post.media.expect("media attached");
    assert!(media.public_id.starts_with(MEDIA_FOLDER));
    assert_eq!(ctx.media.upload_count(), 1);
    assert_eq!(ctx.reload(&a).await.posts, vec![post.id]);
}

#[tokio::test]
async fn test_add_post_requires_text_or_media() {
    let ctx = TestContext::new();
    let a = ctx.user("alice").await;

    for text in [None, Some(String::new()), Some("   ".to_string())] {
        let err = ctx.posts.add_post(a.id, text, None).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }
    assert_eq!(ctx.store.post_count(), 0);

    let media_only = ctx.posts.add_post(a.id, None, Some(image(b"x"))).await.unwrap();
    assert!(media_only.text.is_none());
    assert!(media_only.media.is_some());
}

#[tokio::test]
async fn test_add_post_for_unknown_user() {
    let ctx = TestContext::new();
    let err = ctx
        .posts
        .add_post(Uuid::new_v4(), Some("hi".into()), Some(image(b"x")))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(ctx.store.post_count(), 0);
    assert_eq!(ctx.media.upload_count(), 0);
}

#[tokio::test]
async fn test_upload_failure_creates_nothing() {
    let ctx = TestContext::new();
    let a = ctx.user("alice").await;
    ctx.media.fail_uploads.store(true, Ordering::SeqCst);

    let err = ctx
        .posts
        .add_post(a.id, Some("hi".into()), Some(image(b"x")))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::UploadError(_)));
    assert_eq!(ctx.store.post_count(), 0);
    assert!(ctx.reload(&a).await.posts.is_empty());
}

#[tokio::test]
async fn test_like_toggle_round_trip() {
    let ctx = TestContext::new();
    let a = ctx.user("alice").await;
    let b = ctx.user("bob").await;
    let post = ctx.posts.add_post(a.id, Some("p".into()), None).await.unwrap();

    assert_eq!(
        ctx.posts.like_post(b.id, post.id).await.unwrap(),
        LikeOutcome::Liked
    );
    assert_eq!(
        ctx.store.find_post(post.id).await.unwrap().unwrap().likes,
        vec![b.id]
    );

    assert_eq!(
        ctx.posts.like_post(b.id, post.id).await.unwrap(),
        LikeOutcome::Unliked
    );
    assert!(ctx
        .store
        .find_post(post.id)
        .await
        .unwrap()
        .unwrap()
        .likes
        .is_empty());
}

#[tokio::test]
async fn test_like_missing_post() {
    let ctx = TestContext::new();
    let a = ctx.user("alice").await;
    assert!(matches!(
        ctx.posts.like_post(a.id, Uuid::new_v4()).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_concurrent_likes_are_not_lost() {
    let ctx = Arc::new(TestContext::new());
    let owner = ctx.user("owner").await;
    let post = ctx.posts.add_post(owner.id, Some("p".into()), None).await.unwrap();

    let mut likers = Vec::new();
    for i in 0..16 {
        likers.push(ctx.user(&format!("liker{}", i)).await.id);
    }

    let handles: Vec<_> = likers
        .iter()
        .map(|&id| {
            let ctx = ctx.clone();
            tokio::spawn(async move { ctx.posts.like_post(id, post.id).await })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), LikeOutcome::Liked);
    }

    let stored = ctx.store.find_post(post.id).await.unwrap().unwrap();
    assert_eq!(stored.likes.len(), likers.len());
}

#[tokio::test]
async fn test_repost_twice_is_conflict() {
    let ctx = TestContext::new();
    let a = ctx.user("alice").await;
    let b = ctx.user("bob").await;
    let post = ctx.posts.add_post(a.id, Some("p".into()), None).await.unwrap();

    ctx.posts.repost(b.id, post.id).await.unwrap();
    let err = ctx.posts.repost(b.id, post.id).await.unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(ctx.reload(&b).await.reposts, vec![post.id]);
}

#[tokio::test]
async fn test_concurrent_reposts_leave_one_entry() {
    let ctx = Arc::new(TestContext::new());
    let a = ctx.user("alice").await;
    let b = ctx.user("bob").await;
    let post = ctx.posts.add_post(a.id, Some("p".into()), None).await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ctx = ctx.clone();
            tokio::spawn(async move { ctx.posts.repost(b.id, post.id).await })
        })
        .collect();

    let mut ok = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => ok += 1,
            Err(AppError::Conflict(_)) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(ok, 1);
    assert_eq!(ctx.reload(&b).await.reposts, vec![post.id]);
}

#[tokio::test]
async fn test_repost_missing_post_or_user() {
    let ctx = TestContext::new();
    let a = ctx.user("alice").await;
    let post = ctx.posts.add_post(a.id, Some("p".into()), None).await.unwrap();

    assert!(matches!(
        ctx.posts.repost(a.id, Uuid::new_v4()).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        ctx.posts.repost(Uuid::new_v4(), post.id).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_delete_post_cascades() {
    let ctx = TestContext::new();
    let a = ctx.user("alice").await;
    let b = ctx.user("bob").await;
    let c = ctx.user("carol").await;

    let post = ctx
        .posts
        .add_post(a.id, Some("doomed".into()), Some(image(b"img")))
        .await
        .unwrap();
    let other = ctx.posts.add_post(a.id, Some("kept".into()), None).await.unwrap();

    let c1 = ctx.comments.add_comment(b.id, post.id, "one").await.unwrap();
    let c2 = ctx.comments.add_comment(c.id, post.id, "two").await.unwrap();
    let kept_comment = ctx.comments.add_comment(b.id, other.id, "stays").await.unwrap();
    ctx.posts.repost(b.id, post.id).await.unwrap();
    ctx.posts.repost(c.id, post.id).await.unwrap();
    ctx.posts.repost(c.id, other.id).await.unwrap();
    ctx.posts.like_post(b.id, post.id).await.unwrap();

    ctx.posts.delete_post(a.id, post.id).await.unwrap();

    assert!(ctx.store.find_post(post.id).await.unwrap().is_none());
    assert!(ctx.store.find_comment(c1.id).await.unwrap().is_none());
    assert!(ctx.store.find_comment(c2.id).await.unwrap().is_none());
    assert_eq!(ctx.media.destroyed(), vec![format!("{}/asset-1", MEDIA_FOLDER)]);

    let gone = [post.id, c1.id, c2.id];
    for user in [&a, &b, &c] {
        let user = ctx.reload(user).await;
        for list in [UserList::Posts, UserList::Replies, UserList::Reposts] {
            assert!(
                user.list(list).iter().all(|id| !gone.contains(id)),
                "{} still references deleted records in {:?}",
                user.user_name,
                list
            );
        }
    }

    assert_eq!(ctx.reload(&a).await.posts, vec![other.id]);
    assert_eq!(ctx.reload(&b).await.replies, vec![kept_comment.id]);
    assert_eq!(ctx.reload(&c).await.reposts, vec![other.id]);
    assert_eq!(ctx.store.comment_count(), 1);
}

#[tokio::test]
async fn test_delete_post_continues_when_media_destroy_fails() {
    let ctx = TestContext::new();
    let a = ctx.user("alice").await;
    let post = ctx
        .posts
        .add_post(a.id, None, Some(image(b"img")))
        .await
        .unwrap();
    ctx.media.fail_destroys.store(true, Ordering::SeqCst);

    ctx.posts.delete_post(a.id, post.id).await.unwrap();

    assert!(ctx.store.find_post(post.id).await.unwrap().is_none());
    assert!(ctx.reload(&a).await.posts.is_empty());
}

#[tokio::test]
async fn test_unauthorized_deletes_change_nothing() {
    let ctx = TestContext::new();
    let a = ctx.user("alice").await;
    let b = ctx.user("bob").await;
    let post = ctx.posts.add_post(a.id, Some("mine".into()), None).await.unwrap();
    let comment = ctx.comments.add_comment(a.id, post.id, "own").await.unwrap();
    ctx.posts.repost(b.id, post.id).await.unwrap();

    let before_post = ctx.store.find_post(post.id).await.unwrap().unwrap();
    let before_a = ctx.reload(&a).await;
    let before_b = ctx.reload(&b).await;

    assert!(matches!(
        ctx.posts.delete_post(b.id, post.id).await,
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        ctx.comments.delete_comment(b.id, post.id, comment.id).await,
        Err(AppError::Forbidden(_))
    ));

    let after_post = ctx.store.find_post(post.id).await.unwrap().unwrap();
    assert_eq!(after_post.comments, before_post.comments);
    assert_eq!(after_post.likes, before_post.likes);
    let after_a = ctx.reload(&a).await;
    let after_b = ctx.reload(&b).await;
    assert_eq!(after_a.posts, before_a.posts);
    assert_eq!(after_a.replies, before_a.replies);
    assert_eq!(after_b.reposts, before_b.reposts);
    assert!(ctx.comments.get_comment(comment.id).await.is_ok());
    assert!(ctx.media.destroyed().is_empty());
}

#[tokio::test]
async fn test_add_comment_validation_and_existence() {
    let ctx = TestContext::new();
    let a = ctx.user("alice").await;
    let post = ctx.posts.add_post(a.id, Some("p".into()), None).await.unwrap();

    assert!(matches!(
        ctx.comments.add_comment(a.id, post.id, "  ").await,
        Err(AppError::ValidationError(_))
    ));
    assert!(matches!(
        ctx.comments.add_comment(a.id, Uuid::new_v4(), "hi").await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        ctx.comments.add_comment(Uuid::new_v4(), post.id, "hi").await,
        Err(AppError::NotFound(_))
    ));
    assert_eq!(ctx.store.comment_count(), 0);
}

#[tokio::test]
async fn test_delete_comment_must_belong_to_post() {
    let ctx = TestContext::new();
    let a = ctx.user("alice").await;
    let p1 = ctx.posts.add_post(a.id, Some("one".into()), None).await.unwrap();
    let p2 = ctx.posts.add_post(a.id, Some("two".into()), None).await.unwrap();
    let comment = ctx.comments.add_comment(a.id, p1.id, "on one").await.unwrap();

    let err = ctx
        .comments
        .delete_comment(a.id, p2.id, comment.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref msg) if msg.contains("in this post")));

    assert!(matches!(
        ctx.comments.delete_comment(a.id, p1.id, Uuid::new_v4()).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        ctx.comments.delete_comment(a.id, Uuid::new_v4(), comment.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(ctx.comments.get_comment(comment.id).await.is_ok());
}

/// User repository that can be told to fail `push_ref`
struct FailingUsers {
    inner: Arc<MemoryStore>,
    fail_push: AtomicBool,
}

#[async_trait]
impl UserRepository for FailingUsers {
    async fn create_user(&self, new: NewUser) -> Result<User> {
        self.inner.create_user(new).await
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        self.inner.find_user(id).await
    }

    async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        self.inner.find_users(ids).await
    }

    async fn push_ref(&self, user_id: Uuid, list: UserList, value: Uuid) -> Result<bool> {
        if self.fail_push.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError("connection reset".to_string()));
        }
        self.inner.push_ref(user_id, list, value).await
    }

    async fn push_unique_ref(&self, user_id: Uuid, list: UserList, value: Uuid) -> Result<bool> {
        self.inner.push_unique_ref(user_id, list, value).await
    }

    async fn pull_ref(&self, user_id: Uuid, list: UserList, value: Uuid) -> Result<bool> {
        self.inner.pull_ref(user_id, list, value).await
    }

    async fn scrub_post_refs(&self, post_id: Uuid, comment_ids: &[Uuid]) -> Result<u64> {
        self.inner.scrub_post_refs(post_id, comment_ids).await
    }
}

#[tokio::test]
async fn test_failed_owner_link_leaves_orphan_for_retry() {
    let store = Arc::new(MemoryStore::new());
    let users = Arc::new(FailingUsers {
        inner: store.clone(),
        fail_push: AtomicBool::new(true),
    });
    let repos = Repositories {
        users: users.clone(),
        posts: store.clone(),
        comments: store.clone(),
    };
    let ctx = TestContext::with_repos(
        store.clone(),
        repos,
        Arc::new(common::RecordingMediaStore::default()),
        3,
    );
    let a = ctx.user("alice").await;

    let err = ctx
        .posts
        .add_post(a.id, Some("hi".into()), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DatabaseError(_)));

    // The post exists without its owner link; no rollback is attempted
    assert_eq!(store.post_count(), 1);
    assert!(ctx.reload(&a).await.posts.is_empty());

    users.fail_push.store(false, Ordering::SeqCst);
    let post = ctx.posts.add_post(a.id, Some("hi".into()), None).await.unwrap();
    assert_eq!(ctx.reload(&a).await.posts, vec![post.id]);
}
