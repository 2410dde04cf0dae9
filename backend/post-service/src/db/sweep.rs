use super::{ConsistencySweeper, PgStore, SweepReport};
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
impl ConsistencySweeper for PgStore {
    async fn sweep_dangling_references(&self) -> Result<SweepReport> {
        let mut tx = self.pool().begin().await?;

        let orphaned = sqlx::query(
            r#"
            DELETE FROM comments c
            WHERE NOT EXISTS (SELECT 1 FROM posts p WHERE p.id = c.post)
            "#,
        )
        .execute(&mut *tx)
        .await?;

        let posts = sqlx::query(
            r#"
            UPDATE posts p
            SET comments = ARRAY(
                    SELECT t.c FROM unnest(p.comments) WITH ORDINALITY AS t(c, ord)
                    WHERE EXISTS (SELECT 1 FROM comments x WHERE x.id = t.c)
                    ORDER BY t.ord
                ),
                updated_at = NOW()
            WHERE EXISTS (
                SELECT 1 FROM unnest(p.comments) AS t(c)
                WHERE NOT EXISTS (SELECT 1 FROM comments x WHERE x.id = t.c)
            )
            "#,
        )
        .execute(&mut *tx)
        .await?;

        let users = sqlx::query(
            r#"
            UPDATE users u
            SET posts = ARRAY(
                    SELECT t.p FROM unnest(u.posts) WITH ORDINALITY AS t(p, ord)
                    WHERE EXISTS (SELECT 1 FROM posts x WHERE x.id = t.p)
                    ORDER BY t.ord
                ),
                reposts = ARRAY(
                    SELECT t.p FROM unnest(u.reposts) WITH ORDINALITY AS t(p, ord)
                    WHERE EXISTS (SELECT 1 FROM posts x WHERE x.id = t.p)
                    ORDER BY t.ord
                ),
                replies = ARRAY(
                    SELECT t.c FROM unnest(u.replies) WITH ORDINALITY AS t(c, ord)
                    WHERE EXISTS (SELECT 1 FROM comments x WHERE x.id = t.c)
                    ORDER BY t.ord
                ),
                updated_at = NOW()
            WHERE EXISTS (
                    SELECT 1 FROM unnest(u.posts || u.reposts) AS t(p)
                    WHERE NOT EXISTS (SELECT 1 FROM posts x WHERE x.id = t.p)
                )
               OR EXISTS (
                    SELECT 1 FROM unnest(u.replies) AS t(c)
                    WHERE NOT EXISTS (SELECT 1 FROM comments x WHERE x.id = t.c)
                )
            "#,
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(SweepReport {
            orphaned_comments: orphaned.rows_affected(),
            posts_repaired: posts.rows_affected(),
            users_repaired: users.rows_affected(),
        })
    }
}
