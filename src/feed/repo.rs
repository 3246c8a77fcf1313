use anyhow::Context;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::repo_types::{Comment, FeedItem, Post};

const POST_COLUMNS: &str = "id, plant_id, user_id, image_key, description, created_at, updated_at";

/// Posts visible to `$1`: anything on a public plant plus the viewer's own.
const FEED_SELECT: &str = r#"
    SELECT po.id, po.plant_id, po.user_id, po.image_key, po.description,
           po.created_at, po.updated_at,
           u.display_name AS author_name,
           pl.species AS plant_species, pl.nickname AS plant_nickname,
           (SELECT COUNT(*) FROM likes l WHERE l.post_id = po.id) AS like_count,
           (SELECT COUNT(*) FROM comments c WHERE c.post_id = po.id) AS comment_count,
           EXISTS (SELECT 1 FROM likes l WHERE l.post_id = po.id AND l.user_id = $1) AS liked_by_me
      FROM posts po
      JOIN plants pl ON pl.id = po.plant_id
      JOIN users u ON u.id = po.user_id
     WHERE (pl.is_public OR po.user_id = $1)
"#;

impl Post {
    pub async fn create(
        db: &PgPool,
        plant_id: Uuid,
        user_id: Uuid,
        image_key: &str,
        description: Option<&str>,
    ) -> anyhow::Result<Post> {
        let row = sqlx::query_as::<_, Post>(&format!(
            r#"
            INSERT INTO posts (plant_id, user_id, image_key, description)
            VALUES ($1, $2, $3, $4)
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(plant_id)
        .bind(user_id)
        .bind(image_key)
        .bind(description)
        .fetch_one(db)
        .await
        .context("insert post")?;
        Ok(row)
    }

    pub async fn delete(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Post>> {
        let row = sqlx::query_as::<_, Post>(&format!(
            "DELETE FROM posts WHERE id = $1 AND user_id = $2 RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await
        .context("delete post")?;
        Ok(row)
    }
}

impl FeedItem {
    pub async fn page(
        db: &PgPool,
        viewer: Uuid,
        plant_id: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<FeedItem>> {
        let rows = sqlx::query_as::<_, FeedItem>(&format!(
            "{FEED_SELECT} AND ($2::uuid IS NULL OR po.plant_id = $2)
             ORDER BY po.created_at DESC
             LIMIT $3 OFFSET $4"
        ))
        .bind(viewer)
        .bind(plant_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
        .context("load feed page")?;
        Ok(rows)
    }

    pub async fn find_visible(db: &PgPool, viewer: Uuid, id: Uuid) -> anyhow::Result<Option<FeedItem>> {
        let row = sqlx::query_as::<_, FeedItem>(&format!("{FEED_SELECT} AND po.id = $2"))
            .bind(viewer)
            .bind(id)
            .fetch_optional(db)
            .await
            .context("find post")?;
        Ok(row)
    }
}

async fn like_count(tx: &mut Transaction<'_, Postgres>, post_id: Uuid) -> anyhow::Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM likes WHERE post_id = $1")
        .bind(post_id)
        .fetch_one(&mut **tx)
        .await
        .context("count likes")?;
    Ok(count)
}

/// Likes the post if the user has not yet, unlikes it otherwise.
/// Returns the new state and the resulting like count.
///
/// The post row is locked first so concurrent toggles by the same user run
/// one after another, and the outcome is read from the insert itself.
pub async fn toggle_like(db: &PgPool, post_id: Uuid, user_id: Uuid) -> anyhow::Result<(bool, i64)> {
    let mut tx = db.begin().await.context("begin tx")?;
    sqlx::query("SELECT id FROM posts WHERE id = $1 FOR UPDATE")
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await
        .context("lock post")?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO likes (post_id, user_id) VALUES ($1, $2)
        ON CONFLICT (post_id, user_id) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(post_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await
    .context("like")?;

    let liked = match inserted {
        Some(_) => true,
        None => {
            sqlx::query("DELETE FROM likes WHERE post_id = $1 AND user_id = $2")
                .bind(post_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await
                .context("unlike")?;
            false
        }
    };

    let count = like_count(&mut tx, post_id).await?;
    tx.commit().await.context("commit tx")?;
    Ok((liked, count))
}

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.post_id, c.user_id, u.display_name AS author_name, c.content, c.created_at
      FROM comments c
      JOIN users u ON u.id = c.user_id
"#;

impl Comment {
    pub async fn list(db: &PgPool, post_id: Uuid) -> anyhow::Result<Vec<Comment>> {
        let rows = sqlx::query_as::<_, Comment>(&format!(
            "{COMMENT_SELECT} WHERE c.post_id = $1 ORDER BY c.created_at ASC"
        ))
        .bind(post_id)
        .fetch_all(db)
        .await
        .context("list comments")?;
        Ok(rows)
    }

    pub async fn create(db: &PgPool, post_id: Uuid, user_id: Uuid, content: &str) -> anyhow::Result<Comment> {
        let row = sqlx::query_as::<_, Comment>(
            r#"
            WITH inserted AS (
                INSERT INTO comments (post_id, user_id, content)
                VALUES ($1, $2, $3)
                RETURNING id, post_id, user_id, content, created_at
            )
            SELECT i.id, i.post_id, i.user_id, u.display_name AS author_name, i.content, i.created_at
              FROM inserted i
              JOIN users u ON u.id = i.user_id
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .bind(content)
        .fetch_one(db)
        .await
        .context("insert comment")?;
        Ok(row)
    }

    /// Only the author may delete; returns whether a row went away.
    pub async fn delete(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM comments WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(db)
            .await
            .context("delete comment")?;
        Ok(res.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::User;
    use crate::plants::repo_types::{Plant, PlantFields};
    use crate::state::AppState;
    use time::macros::date;

    async fn seed_post(db: &PgPool) -> (Uuid, Uuid) {
        let email = format!("{}@bonsai.test", Uuid::new_v4());
        let user = User::create(db, &email, "$argon2id$x", "tester").await.unwrap();
        let plant = Plant::create(
            db,
            user.id,
            &PlantFields {
                species: "Carmona retusa".into(),
                nickname: None,
                location: None,
                temperature: None,
                start_date: date!(2025 - 03 - 01),
                watering_interval_days: 2,
                sun_interval_days: None,
                care_notes: None,
                is_public: true,
            },
        )
        .await
        .unwrap();
        let post = Post::create(db, plant.id, user.id, "posts/x.jpg", None).await.unwrap();
        (post.id, user.id)
    }

    #[tokio::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn like_then_unlike() {
        let db = AppState::test_pool().await;
        let (post, user) = seed_post(&db).await;
        assert_eq!(toggle_like(&db, post, user).await.unwrap(), (true, 1));
        assert_eq!(toggle_like(&db, post, user).await.unwrap(), (false, 0));
    }

    #[tokio::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn concurrent_toggles_by_one_user_serialize() {
        let db = AppState::test_pool().await;
        let (post, user) = seed_post(&db).await;

        let (a, b) = tokio::join!(toggle_like(&db, post, user), toggle_like(&db, post, user));
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_ne!(a.0, b.0, "one toggle likes, the other unlikes");

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM likes WHERE post_id = $1")
            .bind(post)
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
