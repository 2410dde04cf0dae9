/// In-memory store
///
/// Each collection is a `DashMap`; a single repository call holds at most one
/// record's shard lock at a time, which gives the same per-record atomicity
/// the PostgreSQL store has and nothing more.
use super::{
    CommentRepository, ConsistencySweeper, PostRepository, StoreHealth, SweepReport,
    UserRepository,
};
use crate::error::{AppError, Result};
use crate::models::{Comment, NewUser, Post, User, UserList};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

struct StoredPost {
    /// Insertion order, breaks ties between equal `created_at`
    seq: u64,
    post: Post,
}

#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<Uuid, User>,
    emails: DashMap<String, Uuid>,
    posts: DashMap<Uuid, StoredPost>,
    comments: DashMap<Uuid, Comment>,
    next_seq: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn post_count(&self) -> usize {
        self.posts.len()
    }

    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, new: NewUser) -> Result<User> {
        let user = User::new(new);

        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => {
                return Err(AppError::Conflict("Email already registered".to_string()))
            }
            Entry::Vacant(slot) => {
                slot.insert(user.id);
            }
        }

        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.users.get(id).map(|u| u.clone()))
            .collect())
    }

    async fn push_ref(&self, user_id: Uuid, list: UserList, value: Uuid) -> Result<bool> {
        Ok(match self.users.get_mut(&user_id) {
            Some(mut user) => {
                user.list_mut(list).push(value);
                user.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn push_unique_ref(&self, user_id: Uuid, list: UserList, value: Uuid) -> Result<bool> {
        Ok(match self.users.get_mut(&user_id) {
            Some(mut user) => {
                if user.list(list).contains(&value) {
                    false
                } else {
                    user.list_mut(list).push(value);
                    user.updated_at = Utc::now();
                    true
                }
            }
            None => false,
        })
    }

    async fn pull_ref(&self, user_id: Uuid, list: UserList, value: Uuid) -> Result<bool> {
        Ok(match self.users.get_mut(&user_id) {
            Some(mut user) => {
                user.list_mut(list).retain(|id| *id != value);
                user.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn scrub_post_refs(&self, post_id: Uuid, comment_ids: &[Uuid]) -> Result<u64> {
        let comment_ids: HashSet<Uuid> = comment_ids.iter().copied().collect();
        let mut touched = 0;

        for mut user in self.users.iter_mut() {
            let referenced = user.posts.contains(&post_id)
                || user.reposts.contains(&post_id)
                || user
                    .replies
                    .iter()
                    .any(|id| *id == post_id || comment_ids.contains(id));
            if !referenced {
                continue;
            }

            user.posts.retain(|id| *id != post_id);
            user.reposts.retain(|id| *id != post_id);
            user.replies
                .retain(|id| *id != post_id && !comment_ids.contains(id));
            user.updated_at = Utc::now();
            touched += 1;
        }

        Ok(touched)
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn insert_post(&self, post: Post) -> Result<Post> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        match self.posts.entry(post.id) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!("Post {} already exists", post.id))),
            Entry::Vacant(slot) => {
                slot.insert(StoredPost {
                    seq,
                    post: post.clone(),
                });
                Ok(post)
            }
        }
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>> {
        Ok(self.posts.get(&id).map(|p| p.post.clone()))
    }

    async fn list_posts(&self, skip: i64, limit: i64) -> Result<Vec<Post>> {
        let mut all: Vec<(u64, Post)> = self
            .posts
            .iter()
            .map(|p| (p.seq, p.post.clone()))
            .collect();
        all.sort_by(|(a_seq, a), (b_seq, b)| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b_seq.cmp(a_seq))
        });

        Ok(all
            .into_iter()
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|(_, post)| post)
            .collect())
    }

    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> Result<Option<bool>> {
        Ok(self.posts.get_mut(&post_id).map(|mut stored| {
            let post = &mut stored.post;
            let liked = if post.likes.contains(&user_id) {
                post.likes.retain(|id| *id != user_id);
                false
            } else {
                post.likes.push(user_id);
                true
            };
            post.updated_at = Utc::now();
            liked
        }))
    }

    async fn push_comment(&self, post_id: Uuid, comment_id: Uuid) -> Result<bool> {
        Ok(match self.posts.get_mut(&post_id) {
            Some(mut stored) => {
                stored.post.comments.push(comment_id);
                stored.post.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn pull_comment(&self, post_id: Uuid, comment_id: Uuid) -> Result<bool> {
        Ok(match self.posts.get_mut(&post_id) {
            Some(mut stored) => {
                stored.post.comments.retain(|id| *id != comment_id);
                stored.post.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool> {
        Ok(self.posts.remove(&id).is_some())
    }
}

#[async_trait]
impl CommentRepository for MemoryStore {
    async fn insert_comment(&self, comment: Comment) -> Result<Comment> {
        match self.comments.entry(comment.id) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "Comment {} already exists",
                comment.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(comment.clone());
                Ok(comment)
            }
        }
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>> {
        Ok(self.comments.get(&id).map(|c| c.clone()))
    }

    async fn find_comments(&self, ids: &[Uuid]) -> Result<Vec<Comment>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.comments.get(id).map(|c| c.clone()))
            .collect())
    }

    async fn delete_comment(&self, id: Uuid) -> Result<bool> {
        Ok(self.comments.remove(&id).is_some())
    }

    async fn delete_comments(&self, ids: &[Uuid]) -> Result<u64> {
        Ok(ids
            .iter()
            .filter(|id| self.comments.remove(*id).is_some())
            .count() as u64)
    }
}

#[async_trait]
impl ConsistencySweeper for MemoryStore {
    async fn sweep_dangling_references(&self) -> Result<SweepReport> {
        let mut report = SweepReport::default();

        let orphaned: Vec<Uuid> = self
            .comments
            .iter()
            .filter(|c| !self.posts.contains_key(&c.post))
            .map(|c| c.id)
            .collect();
        for id in orphaned {
            if self.comments.remove(&id).is_some() {
                report.orphaned_comments += 1;
            }
        }

        for mut stored in self.posts.iter_mut() {
            let before = stored.post.comments.len();
            stored
                .post
                .comments
                .retain(|id| self.comments.contains_key(id));
            if stored.post.comments.len() != before {
                stored.post.updated_at = Utc::now();
                report.posts_repaired += 1;
            }
        }

        for mut user in self.users.iter_mut() {
            let before = (user.posts.len(), user.reposts.len(), user.replies.len());
            user.posts.retain(|id| self.posts.contains_key(id));
            user.reposts.retain(|id| self.posts.contains_key(id));
            user.replies.retain(|id| self.comments.contains_key(id));
            if (user.posts.len(), user.reposts.len(), user.replies.len()) != before {
                user.updated_at = Utc::now();
                report.users_repaired += 1;
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            user_name: name.to_string(),
            email: format!("{}@example.com", name),
            password_hash: "hash".to_string(),
            bio: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let store = MemoryStore::new();
        store.create_user(new_user("alice")).await.unwrap();

        let err = store.create_user(new_user("alice")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let mut shouting = new_user("alice");
        shouting.email = "ALICE@example.com".to_string();
        assert!(matches!(
            store.create_user(shouting).await,
            Err(AppError::Conflict(_))
        ));
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn test_push_unique_ref_rejects_duplicates() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("bob")).await.unwrap();
        let post_id = Uuid::new_v4();

        assert!(store.push_unique_ref(user.id, UserList::Reposts, post_id).await.unwrap());
        assert!(!store.push_unique_ref(user.id, UserList::Reposts, post_id).await.unwrap());
        assert!(!store.push_unique_ref(Uuid::new_v4(), UserList::Reposts, post_id).await.unwrap());

        let user = store.find_user(user.id).await.unwrap().unwrap();
        assert_eq!(user.reposts, vec![post_id]);
    }

    #[tokio::test]
    async fn test_toggle_like_flips_membership() {
        let store = MemoryStore::new();
        let post = store.insert_post(Post::new(Uuid::new_v4(), Some("hi".into()), None)).await.unwrap();
        let liker = Uuid::new_v4();

        assert_eq!(store.toggle_like(post.id, liker).await.unwrap(), Some(true));
        assert_eq!(store.toggle_like(post.id, liker).await.unwrap(), Some(false));
        assert_eq!(store.toggle_like(Uuid::new_v4(), liker).await.unwrap(), None);
        assert!(store.find_post(post.id).await.unwrap().unwrap().likes.is_empty());
    }

    #[tokio::test]
    async fn test_list_posts_newest_first_with_paging() {
        let store = MemoryStore::new();
        let admin = Uuid::new_v4();
        let mut ids = Vec::new();
        for i in 0..5 {
            let post = store
                .insert_post(Post::new(admin, Some(format!("post {}", i)), None))
                .await
                .unwrap();
            ids.push(post.id);
        }

        let first = store.list_posts(0, 3).await.unwrap();
        let second = store.list_posts(3, 3).await.unwrap();

        assert_eq!(first.iter().map(|p| p.id).collect::<Vec<_>>(), vec![ids[4], ids[3], ids[2]]);
        assert_eq!(second.iter().map(|p| p.id).collect::<Vec<_>>(), vec![ids[1], ids[0]]);
    }

    #[tokio::test]
    async fn test_scrub_post_refs_touches_only_referencing_users() {
        let store = MemoryStore::new();
        let owner = store.create_user(new_user("owner")).await.unwrap();
        let other = store.create_user(new_user("other")).await.unwrap();
        let post_id = Uuid::new_v4();
        let comment_id = Uuid::new_v4();
        let unrelated = Uuid::new_v4();

        store.push_ref(owner.id, UserList::Posts, post_id).await.unwrap();
        store.push_ref(owner.id, UserList::Posts, unrelated).await.unwrap();
        store.push_ref(other.id, UserList::Replies, comment_id).await.unwrap();
        store.push_ref(other.id, UserList::Reposts, post_id).await.unwrap();

        let touched = store.scrub_post_refs(post_id, &[comment_id]).await.unwrap();
        assert_eq!(touched, 2);

        let owner = store.find_user(owner.id).await.unwrap().unwrap();
        let other = store.find_user(other.id).await.unwrap().unwrap();
        assert_eq!(owner.posts, vec![unrelated]);
        assert!(other.replies.is_empty());
        assert!(other.reposts.is_empty());
    }
}
