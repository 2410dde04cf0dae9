use super::{CommentRepository, PgStore};
use crate::error::Result;
use crate::models::Comment;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
impl CommentRepository for PgStore {
    async fn insert_comment(&self, comment: Comment) -> Result<Comment> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (id, text, post, admin, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id, text, post, admin, created_at, updated_at
            "#,
        )
        .bind(comment.id)
        .bind(&comment.text)
        .bind(comment.post)
        .bind(comment.admin)
        .bind(comment.created_at)
        .fetch_one(self.pool())
        .await?;

        Ok(comment)
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(
            "SELECT id, text, post, admin, created_at, updated_at FROM comments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(comment)
    }

    async fn find_comments(&self, ids: &[Uuid]) -> Result<Vec<Comment>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let comments = sqlx::query_as::<_, Comment>(
            "SELECT id, text, post, admin, created_at, updated_at FROM comments WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(self.pool())
        .await?;

        Ok(comments)
    }

    async fn delete_comment(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_comments(&self, ids: &[Uuid]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM comments WHERE id = ANY($1)")
            .bind(ids)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }
}
