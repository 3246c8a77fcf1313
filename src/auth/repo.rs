use crate::auth::repo_types::{Profile, User};
use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, password_hash, display_name, bio, created_at, updated_at";

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    /// Create a new user with hashed password.
    pub async fn create(
        db: &PgPool,
        email: &str,
        password_hash: &str,
        display_name: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, display_name)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(password_hash)
        .bind(display_name)
        .fetch_one(db)
        .await
        .context("insert user")?;
        Ok(user)
    }

    /// `None` fields keep their stored value.
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        display_name: Option<&str>,
        bio: Option<&str>,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET display_name = COALESCE($2, display_name),
                   bio = COALESCE($3, bio),
                   updated_at = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(display_name)
        .bind(bio)
        .fetch_optional(db)
        .await
        .context("update profile")?;
        Ok(user)
    }
}

impl Profile {
    pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(
            "SELECT id, display_name, bio, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find profile")?;
        Ok(profile)
    }

    /// `pattern` is an already escaped ILIKE pattern.
    pub async fn search(db: &PgPool, pattern: &str, limit: i64) -> anyhow::Result<Vec<Profile>> {
        let rows = sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, display_name, bio, created_at
              FROM users
             WHERE display_name ILIKE $1 ESCAPE '\'
             ORDER BY display_name
             LIMIT $2
            "#,
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(db)
        .await
        .context("search profiles")?;
        Ok(rows)
    }
}
