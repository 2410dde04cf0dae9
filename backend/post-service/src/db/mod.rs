/// Database access layer for post-service
///
/// Repository traits are the seam between the sagas in `services` and the
/// stores. Every single call is atomic with respect to the one record it
/// touches; nothing spans records. Two stores implement them:
/// - `PgStore`: PostgreSQL, reference lists in `UUID[]` columns
/// - `MemoryStore`: dashmap-backed, used by tests and local runs
use crate::error::Result;
use crate::models::{Comment, NewUser, Post, User, UserList};
use async_trait::async_trait;
use serde::Serialize;
use sqlx::migrate::Migrator;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

pub mod comment_repo;
pub mod memory;
pub mod post_repo;
pub mod sweep;
pub mod user_repo;

pub use memory::MemoryStore;

/// Embedded schema migrations for the `users`, `posts` and `comments` tables
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, new: NewUser) -> Result<User>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>>;

    /// Batch lookup; missing ids are skipped
    async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<User>>;

    /// Append `value` to one of the user's lists. Returns false if the user is absent.
    async fn push_ref(&self, user_id: Uuid, list: UserList, value: Uuid) -> Result<bool>;

    /// Append `value` unless already present. Returns false if it was present
    /// or the user is absent; the membership test and append are one step.
    async fn push_unique_ref(&self, user_id: Uuid, list: UserList, value: Uuid) -> Result<bool>;

    /// Remove every occurrence of `value` from one of the user's lists
    async fn pull_ref(&self, user_id: Uuid, list: UserList, value: Uuid) -> Result<bool>;

    /// Single sweep over all users removing `post_id` from `posts`, `reposts`
    /// and `replies`, and `comment_ids` from `replies`. Returns users touched.
    async fn scrub_post_refs(&self, post_id: Uuid, comment_ids: &[Uuid]) -> Result<u64>;
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn insert_post(&self, post: Post) -> Result<Post>;

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>>;

    /// Newest first
    async fn list_posts(&self, skip: i64, limit: i64) -> Result<Vec<Post>>;

    /// Flip `user_id`'s membership in the post's likes. `None` if the post is
    /// absent, otherwise whether the user likes the post afterwards.
    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> Result<Option<bool>>;

    async fn push_comment(&self, post_id: Uuid, comment_id: Uuid) -> Result<bool>;

    async fn pull_comment(&self, post_id: Uuid, comment_id: Uuid) -> Result<bool>;

    async fn delete_post(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn insert_comment(&self, comment: Comment) -> Result<Comment>;

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>>;

    /// Batch lookup; missing ids are skipped
    async fn find_comments(&self, ids: &[Uuid]) -> Result<Vec<Comment>>;

    async fn delete_comment(&self, id: Uuid) -> Result<bool>;

    async fn delete_comments(&self, ids: &[Uuid]) -> Result<u64>;
}

/// Counts of dangling references removed by one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Comments whose post no longer exists
    pub orphaned_comments: u64,
    /// Posts whose comment list named missing comments
    pub posts_repaired: u64,
    /// Users whose lists named missing posts or comments
    pub users_repaired: u64,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        *self == SweepReport::default()
    }
}

/// Repairs references left dangling by interrupted sagas
#[async_trait]
pub trait ConsistencySweeper: Send + Sync {
    async fn sweep_dangling_references(&self) -> Result<SweepReport>;
}

/// Liveness of the backing store, used by the readiness endpoint
#[async_trait]
pub trait StoreHealth: Send + Sync {
    fn backend(&self) -> &'static str;
    async fn health_check(&self) -> Result<()>;
}

/// Repository handles injected into the services
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
}

impl Repositories {
    /// Use one store for all three collections
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: UserRepository + PostRepository + CommentRepository + 'static,
    {
        Self {
            users: store.clone(),
            posts: store.clone(),
            comments: store,
        }
    }
}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl StoreHealth for PgStore {
    fn backend(&self) -> &'static str {
        "postgresql"
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
