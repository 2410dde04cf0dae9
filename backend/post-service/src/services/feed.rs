/// Feed service - paginated post listing and single post retrieval with
/// owner, likers and comment authors expanded
use crate::db::Repositories;
use crate::error::{AppError, Result};
use crate::models::{Comment, CommentView, Post, PostView, User, UserSummary};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// One page of the feed
#[derive(Debug, Clone)]
pub struct FeedPage {
    pub posts: Vec<PostView>,
    /// Page number actually served
    pub page: i64,
}

/// Parse a `page` query value. Absent or non-numeric means 1; values below 1
/// are clamped to 1.
pub fn page_number(raw: Option<&str>) -> i64 {
    raw.and_then(|p| p.trim().parse::<i64>().ok())
        .unwrap_or(1)
        .max(1)
}

pub struct FeedService {
    repos: Repositories,
    page_size: i64,
}

impl FeedService {
    pub fn new(repos: Repositories, page_size: i64) -> Self {
        Self {
            repos,
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    /// Newest posts first, `page_size` per page
    pub async fn list_posts(&self, page: i64) -> Result<FeedPage> {
        let page = page.max(1);
        let skip = (page - 1).saturating_mul(self.page_size);

        let posts = self.repos.posts.list_posts(skip, self.page_size).await?;
        let posts = self.expand(posts).await?;

        Ok(FeedPage { posts, page })
    }

    pub async fn get_post(&self, post_id: Uuid) -> Result<PostView> {
        let post = self
            .repos
            .posts
            .find_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        let mut views = self.expand(vec![post]).await?;
        views
            .pop()
            .ok_or_else(|| AppError::Internal("post expansion returned nothing".to_string()))
    }

    /// Resolve references with one batch lookup per collection. References to
    /// records that no longer exist are dropped from lists and rendered as
    /// `None` for single references.
    async fn expand(&self, posts: Vec<Post>) -> Result<Vec<PostView>> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let comment_ids: Vec<Uuid> = posts
            .iter()
            .flat_map(|p| p.comments.iter().copied())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let comments: HashMap<Uuid, Comment> = self
            .repos
            .comments
            .find_comments(&comment_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        let user_ids: Vec<Uuid> = posts
            .iter()
            .flat_map(|p| std::iter::once(p.admin).chain(p.likes.iter().copied()))
            .chain(comments.values().map(|c| c.admin))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let users: HashMap<Uuid, User> = self
            .repos
            .users
            .find_users(&user_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let summary = |id: &Uuid| users.get(id).map(UserSummary::from);

        Ok(posts
            .into_iter()
            .map(|post| PostView {
                id: post.id,
                admin: summary(&post.admin),
                likes: post.likes.iter().filter_map(summary).collect(),
                comments: post
                    .comments
                    .iter()
                    .filter_map(|id| comments.get(id))
                    .map(|c| CommentView {
                        id: c.id,
                        text: c.text.clone(),
                        post: c.post,
                        admin: summary(&c.admin),
                        created_at: c.created_at,
                    })
                    .collect(),
                text: post.text,
                media: post.media,
                created_at: post.created_at,
            })
            .collect())
    }
}
