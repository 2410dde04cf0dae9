use super::{PgStore, UserRepository};
use crate::error::{AppError, Result};
use crate::models::{NewUser, User, UserList};
use async_trait::async_trait;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, user_name, email, password_hash, bio, profile_pic, profile_pic_id, \
     followers, posts, replies, reposts, created_at, updated_at";

#[async_trait]
impl UserRepository for PgStore {
    async fn create_user(&self, new: NewUser) -> Result<User> {
        let user = User::new(new);

        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, user_name, email, password_hash, bio, profile_pic, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.user_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.bio)
        .bind(&user.profile_pic)
        .bind(user.created_at)
        .fetch_one(self.pool())
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict("Email already registered".to_string())
            }
            _ => AppError::from(e),
        })?;

        Ok(created)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(user)
    }

    async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(self.pool())
        .await?;

        Ok(users)
    }

    async fn push_ref(&self, user_id: Uuid, list: UserList, value: Uuid) -> Result<bool> {
        let column = list.column();
        let result = sqlx::query(&format!(
            "UPDATE users SET {column} = array_append({column}, $2), updated_at = NOW() WHERE id = $1"
        ))
        .bind(user_id)
        .bind(value)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn push_unique_ref(&self, user_id: Uuid, list: UserList, value: Uuid) -> Result<bool> {
        let column = list.column();
        let result = sqlx::query(&format!(
            r#"
            UPDATE users
            SET {column} = array_append({column}, $2), updated_at = NOW()
            WHERE id = $1 AND NOT ($2 = ANY({column}))
            "#
        ))
        .bind(user_id)
        .bind(value)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn pull_ref(&self, user_id: Uuid, list: UserList, value: Uuid) -> Result<bool> {
        let column = list.column();
        let result = sqlx::query(&format!(
            "UPDATE users SET {column} = array_remove({column}, $2), updated_at = NOW() WHERE id = $1"
        ))
        .bind(user_id)
        .bind(value)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn scrub_post_refs(&self, post_id: Uuid, comment_ids: &[Uuid]) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET posts = array_remove(posts, $1),
                reposts = array_remove(reposts, $1),
                replies = ARRAY(
                    SELECT r FROM unnest(replies) WITH ORDINALITY AS t(r, ord)
                    WHERE r <> $1 AND NOT (r = ANY($2))
                    ORDER BY ord
                ),
                updated_at = NOW()
            WHERE $1 = ANY(posts) OR $1 = ANY(reposts) OR $1 = ANY(replies) OR replies && $2
            "#,
        )
        .bind(post_id)
        .bind(comment_ids)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected())
    }
}
