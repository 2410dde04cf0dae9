/// Comment service - handles comment creation, retrieval and deletion
use crate::db::Repositories;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{Comment, UserList};
use uuid::Uuid;

pub struct CommentService {
    repos: Repositories,
}

impl CommentService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Get a comment by ID
    pub async fn get_comment(&self, comment_id: Uuid) -> Result<Comment> {
        self.repos
            .comments
            .find_comment(comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))
    }

    /// Create a comment, then link it from the post and from the author's replies
    pub async fn add_comment(&self, caller: Uuid, post_id: Uuid, text: &str) -> Result<Comment> {
        let result = self.add_comment_inner(caller, post_id, text).await;
        metrics::record_result("add_comment", &result);
        result
    }

    async fn add_comment_inner(&self, caller: Uuid, post_id: Uuid, text: &str) -> Result<Comment> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::ValidationError("No Comment is Added !".to_string()));
        }

        if self.repos.posts.find_post(post_id).await?.is_none() {
            return Err(AppError::NotFound("Post not found".to_string()));
        }
        if self.repos.users.find_user(caller).await?.is_none() {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        let comment = self
            .repos
            .comments
            .insert_comment(Comment::new(post_id, caller, text.to_string()))
            .await?;

        if !self.repos.posts.push_comment(post_id, comment.id).await? {
            tracing::warn!(%post_id, comment_id = %comment.id, "post deleted while commenting; comment left for the sweeper");
            return Err(AppError::NotFound("Post not found".to_string()));
        }
        if !self
            .repos
            .users
            .push_ref(caller, UserList::Replies, comment.id)
            .await?
        {
            tracing::warn!(user_id = %caller, comment_id = %comment.id, "author vanished while commenting");
            return Err(AppError::NotFound("User not found".to_string()));
        }

        tracing::info!(%post_id, comment_id = %comment.id, user_id = %caller, "comment added");
        Ok(comment)
    }

    /// Delete a comment authored by `caller`. References are removed before
    /// the record itself.
    pub async fn delete_comment(&self, caller: Uuid, post_id: Uuid, comment_id: Uuid) -> Result<()> {
        let result = self.delete_comment_inner(caller, post_id, comment_id).await;
        metrics::record_result("delete_comment", &result);
        result
    }

    async fn delete_comment_inner(&self, caller: Uuid, post_id: Uuid, comment_id: Uuid) -> Result<()> {
        let post = self
            .repos
            .posts
            .find_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        let comment = self
            .repos
            .comments
            .find_comment(comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

        if !post.comments.contains(&comment_id) {
            return Err(AppError::NotFound("Comment not found in this post".to_string()));
        }

        if comment.admin != caller {
            return Err(AppError::Forbidden(
                "You are not authorized to delete this comment".to_string(),
            ));
        }

        self.repos.posts.pull_comment(post_id, comment_id).await?;
        self.repos
            .users
            .pull_ref(comment.admin, UserList::Replies, comment_id)
            .await?;
        self.repos.comments.delete_comment(comment_id).await?;

        tracing::info!(%post_id, %comment_id, user_id = %caller, "comment deleted");
        Ok(())
    }
}
