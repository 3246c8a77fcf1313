use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Plant, PlantFields};

const PLANT_COLUMNS: &str = "id, user_id, species, nickname, location, temperature, start_date, \
     watering_interval_days, sun_interval_days, care_notes, image_key, is_public, created_at, updated_at";

impl Plant {
    pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Plant>> {
        let rows = sqlx::query_as::<_, Plant>(&format!(
            "SELECT {PLANT_COLUMNS} FROM plants WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(db)
        .await
        .context("list plants by user")?;
        Ok(rows)
    }

    pub async fn list_public_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Plant>> {
        let rows = sqlx::query_as::<_, Plant>(&format!(
            r#"
            SELECT {PLANT_COLUMNS}
              FROM plants
             WHERE user_id = $1 AND is_public
             ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(db)
        .await
        .context("list public plants by user")?;
        Ok(rows)
    }

    pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Plant>> {
        let row = sqlx::query_as::<_, Plant>(&format!(
            "SELECT {PLANT_COLUMNS} FROM plants WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find plant")?;
        Ok(row)
    }

    pub async fn create(db: &PgPool, user_id: Uuid, f: &PlantFields) -> anyhow::Result<Plant> {
        let row = sqlx::query_as::<_, Plant>(&format!(
            r#"
            INSERT INTO plants (user_id, species, nickname, location, temperature, start_date,
                                watering_interval_days, sun_interval_days, care_notes, is_public)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {PLANT_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(&f.species)
        .bind(&f.nickname)
        .bind(&f.location)
        .bind(&f.temperature)
        .bind(f.start_date)
        .bind(f.watering_interval_days)
        .bind(f.sun_interval_days)
        .bind(&f.care_notes)
        .bind(f.is_public)
        .fetch_one(db)
        .await
        .context("insert plant")?;
        Ok(row)
    }

    /// Only the owner's row is touched; `None` means no such plant for this user.
    pub async fn update(
        db: &PgPool,
        user_id: Uuid,
        id: Uuid,
        f: &PlantFields,
    ) -> anyhow::Result<Option<Plant>> {
        let row = sqlx::query_as::<_, Plant>(&format!(
            r#"
            UPDATE plants
               SET species = $3, nickname = $4, location = $5, temperature = $6, start_date = $7,
                   watering_interval_days = $8, sun_interval_days = $9, care_notes = $10,
                   is_public = $11, updated_at = now()
             WHERE id = $1 AND user_id = $2
            RETURNING {PLANT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(&f.species)
        .bind(&f.nickname)
        .bind(&f.location)
        .bind(&f.temperature)
        .bind(f.start_date)
        .bind(f.watering_interval_days)
        .bind(f.sun_interval_days)
        .bind(&f.care_notes)
        .bind(f.is_public)
        .fetch_optional(db)
        .await
        .context("update plant")?;
        Ok(row)
    }

    /// Reminders and posts go with the plant (ON DELETE CASCADE).
    pub async fn delete(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Plant>> {
        let row = sqlx::query_as::<_, Plant>(&format!(
            "DELETE FROM plants WHERE id = $1 AND user_id = $2 RETURNING {PLANT_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await
        .context("delete plant")?;
        Ok(row)
    }

    /// Returns the previous key (if any) wrapped in `Some` when the plant exists.
    pub async fn replace_image_key(
        db: &PgPool,
        user_id: Uuid,
        id: Uuid,
        key: &str,
    ) -> anyhow::Result<Option<Option<String>>> {
        let mut tx = db.begin().await.context("begin tx")?;
        let previous: Option<(Option<String>,)> = sqlx::query_as(
            "SELECT image_key FROM plants WHERE id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .context("lock plant")?;

        let Some((previous,)) = previous else {
            return Ok(None);
        };

        sqlx::query("UPDATE plants SET image_key = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(key)
            .execute(&mut *tx)
            .await
            .context("set plant image")?;
        tx.commit().await.context("commit tx")?;
        Ok(Some(previous))
    }

    /// `pattern` is an already escaped ILIKE pattern.
    pub async fn search_public(db: &PgPool, pattern: &str, limit: i64) -> anyhow::Result<Vec<Plant>> {
        let rows = sqlx::query_as::<_, Plant>(&format!(
            r#"
            SELECT {PLANT_COLUMNS}
              FROM plants
             WHERE is_public
               AND (species ILIKE $1 ESCAPE '\' OR nickname ILIKE $1 ESCAPE '\')
             ORDER BY created_at DESC
             LIMIT $2
            "#
        ))
        .bind(pattern)
        .bind(limit)
        .fetch_all(db)
        .await
        .context("search plants")?;
        Ok(rows)
    }
}
