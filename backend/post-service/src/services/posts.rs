/// Post service - post creation, deletion, likes and reposts
///
/// Every operation runs as a short saga of single-record repository calls:
/// existence check, then authorization check, then the write to the record
/// itself, then the writes to records referencing it. There is no
/// cross-record transaction. Each step is idempotent, so retrying a failed
/// call converges, and `jobs::reference_sweeper` repairs what a crash leaves
/// behind.
use crate::db::Repositories;
use crate::error::{AppError, Result};
use crate::media::{MediaStore, MediaUpload};
use crate::metrics;
use crate::models::{Post, UserList};
use std::sync::Arc;
use uuid::Uuid;

/// Result of the like toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
    Liked,
    Unliked,
}

impl LikeOutcome {
    pub fn is_liked(self) -> bool {
        matches!(self, LikeOutcome::Liked)
    }

    pub fn message(self) -> &'static str {
        match self {
            LikeOutcome::Liked => "Post Liked Successfully !",
            LikeOutcome::Unliked => "Post Unliked Successfully !",
        }
    }
}

pub struct PostService {
    repos: Repositories,
    media: Arc<dyn MediaStore>,
    media_folder: String,
}

impl PostService {
    pub fn new(repos: Repositories, media: Arc<dyn MediaStore>, media_folder: impl Into<String>) -> Self {
        Self {
            repos,
            media,
            media_folder: media_folder.into(),
        }
    }

    /// Create a post owned by `caller`. Upload first, then the post, then the
    /// owner's `posts` list.
    pub async fn add_post(
        &self,
        caller: Uuid,
        text: Option<String>,
        media: Option<MediaUpload>,
    ) -> Result<Post> {
        let result = self.add_post_inner(caller, text, media).await;
        metrics::record_result("add_post", &result);
        result
    }

    async fn add_post_inner(
        &self,
        caller: Uuid,
        text: Option<String>,
        media: Option<MediaUpload>,
    ) -> Result<Post> {
        let text = text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        let media = media.filter(|m| !m.bytes.is_empty());

        if text.is_none() && media.is_none() {
            return Err(AppError::ValidationError(
                "Post must have text or media".to_string(),
            ));
        }

        if self.repos.users.find_user(caller).await?.is_none() {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        let media = match media {
            Some(upload) => Some(self.media.upload(upload, &self.media_folder).await?),
            None => None,
        };

        let post = self
            .repos
            .posts
            .insert_post(Post::new(caller, text, media))
            .await?;

        match self.repos.users.push_ref(caller, UserList::Posts, post.id).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::error!(post_id = %post.id, user_id = %caller, "owner vanished after post creation; post is orphaned");
                return Err(AppError::NotFound("User not found".to_string()));
            }
            Err(e) => {
                tracing::error!(post_id = %post.id, user_id = %caller, error = %e, "failed to link post to owner; post is orphaned");
                return Err(e);
            }
        }

        tracing::info!(post_id = %post.id, user_id = %caller, has_media = post.media.is_some(), "post created");
        Ok(post)
    }

    /// Delete a post owned by `caller`, its media, its comments and every
    /// user reference to it. The post record goes last so a retry after a
    /// partial failure still finds it.
    pub async fn delete_post(&self, caller: Uuid, post_id: Uuid) -> Result<()> {
        let result = self.delete_post_inner(caller, post_id).await;
        metrics::record_result("delete_post", &result);
        result
    }

    async fn delete_post_inner(&self, caller: Uuid, post_id: Uuid) -> Result<()> {
        let post = self
            .repos
            .posts
            .find_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        if post.admin != caller {
            return Err(AppError::Forbidden(
                "You are not authorized to delete this post".to_string(),
            ));
        }

        if let Some(media) = &post.media {
            if let Err(e) = self.media.destroy(&media.public_id).await {
                metrics::record_media_destroy_failure();
                tracing::warn!(%post_id, public_id = %media.public_id, error = %e, "media destroy failed, continuing post deletion");
            }
        }

        let comments_deleted = self.repos.comments.delete_comments(&post.comments).await?;
        let users_scrubbed = self
            .repos
            .users
            .scrub_post_refs(post_id, &post.comments)
            .await?;
        self.repos.posts.delete_post(post_id).await?;

        tracing::info!(%post_id, user_id = %caller, comments_deleted, users_scrubbed, "post deleted");
        Ok(())
    }

    /// Toggle `caller`'s like on a post. Likes are kept on the post only.
    pub async fn like_post(&self, caller: Uuid, post_id: Uuid) -> Result<LikeOutcome> {
        let result = self.like_post_inner(caller, post_id).await;
        metrics::record_result("like_post", &result);
        result
    }

    async fn like_post_inner(&self, caller: Uuid, post_id: Uuid) -> Result<LikeOutcome> {
        if self.repos.posts.find_post(post_id).await?.is_none() {
            return Err(AppError::NotFound("Post not found".to_string()));
        }

        let liked = self
            .repos
            .posts
            .toggle_like(post_id, caller)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        tracing::debug!(%post_id, user_id = %caller, liked, "like toggled");
        Ok(if liked {
            LikeOutcome::Liked
        } else {
            LikeOutcome::Unliked
        })
    }

    /// Add a post to `caller`'s reposts, at most once.
    pub async fn repost(&self, caller: Uuid, post_id: Uuid) -> Result<()> {
        let result = self.repost_inner(caller, post_id).await;
        metrics::record_result("repost", &result);
        result
    }

    async fn repost_inner(&self, caller: Uuid, post_id: Uuid) -> Result<()> {
        if self.repos.posts.find_post(post_id).await?.is_none() {
            return Err(AppError::NotFound("Post not found".to_string()));
        }

        let user = self
            .repos
            .users
            .find_user(caller)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let already_reposted =
            || AppError::Conflict("You have already reposted this post".to_string());

        if user.reposts.contains(&post_id) {
            return Err(already_reposted());
        }

        // A concurrent repost can win between the read above and this write.
        if !self
            .repos
            .users
            .push_unique_ref(caller, UserList::Reposts, post_id)
            .await?
        {
            return Err(already_reposted());
        }

        tracing::info!(%post_id, user_id = %caller, "post reposted");
        Ok(())
    }
}
