use super::{PgStore, PostRepository};
use crate::error::Result;
use crate::models::{MediaRef, Post};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

const POST_COLUMNS: &str =
    "id, text, media_url, media_public_id, admin, likes, comments, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    text: Option<String>,
    media_url: Option<String>,
    media_public_id: Option<String>,
    admin: Uuid,
    likes: Vec<Uuid>,
    comments: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        let media = match (row.media_url, row.media_public_id) {
            (Some(url), Some(public_id)) => Some(MediaRef { url, public_id }),
            _ => None,
        };

        Post {
            id: row.id,
            text: row.text,
            media,
            admin: row.admin,
            likes: row.likes,
            comments: row.comments,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl PostRepository for PgStore {
    async fn insert_post(&self, post: Post) -> Result<Post> {
        let (media_url, media_public_id) = match &post.media {
            Some(media) => (Some(media.url.as_str()), Some(media.public_id.as_str())),
            None => (None, None),
        };

        let row = sqlx::query_as::<_, PostRow>(&format!(
            r#"
            INSERT INTO posts (id, text, media_url, media_public_id, admin, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(post.id)
        .bind(&post.text)
        .bind(media_url)
        .bind(media_public_id)
        .bind(post.admin)
        .bind(post.created_at)
        .fetch_one(self.pool())
        .await?;

        Ok(row.into())
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(Post::from))
    }

    async fn list_posts(&self, skip: i64, limit: i64) -> Result<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(skip)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> Result<Option<bool>> {
        // RETURNING sees the updated row, so the result is the state after the flip.
        let liked = sqlx::query_scalar::<_, bool>(
            r#"
            UPDATE posts
            SET likes = CASE
                    WHEN $2 = ANY(likes) THEN array_remove(likes, $2)
                    ELSE array_append(likes, $2)
                END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING $2 = ANY(likes)
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(liked)
    }

    async fn push_comment(&self, post_id: Uuid, comment_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE posts SET comments = array_append(comments, $2), updated_at = NOW() WHERE id = $1",
        )
        .bind(post_id)
        .bind(comment_id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn pull_comment(&self, post_id: Uuid, comment_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE posts SET comments = array_remove(comments, $2), updated_at = NOW() WHERE id = $1",
        )
        .bind(post_id)
        .bind(comment_id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
