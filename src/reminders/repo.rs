use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::repo_types::{CareReminder, NewReminder, ReminderWithPlant};

/// Persistence seam for the reminder workflow.
#[async_trait]
pub trait ReminderStore: Send + Sync {
    /// Inserts every reminder whose (user, plant, date, kind) is not stored yet,
    /// all in one transaction. Existing rows are left untouched. Returns the
    /// number of rows created.
    async fn insert_missing(&self, batch: &[NewReminder]) -> anyhow::Result<u64>;

    /// `None` when no reminder with this id belongs to `user_id`.
    async fn set_completion(
        &self,
        user_id: Uuid,
        reminder_id: Uuid,
        completed: bool,
        completed_at: Option<OffsetDateTime>,
    ) -> anyhow::Result<Option<CareReminder>>;

    /// Reminders dated within `[start, end]`, ordered by date then kind.
    async fn list_in_range(
        &self,
        user_id: Uuid,
        start: Date,
        end: Date,
    ) -> anyhow::Result<Vec<ReminderWithPlant>>;
}

const REMINDER_COLUMNS: &str =
    "id, user_id, plant_id, reminder_date, kind, completed, completed_at, created_at";

pub struct PgReminderStore {
    db: PgPool,
}

impl PgReminderStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReminderStore for PgReminderStore {
    async fn insert_missing(&self, batch: &[NewReminder]) -> anyhow::Result<u64> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        let mut inserted = 0u64;
        for r in batch {
            let res = sqlx::query(
                r#"
                INSERT INTO care_reminders (user_id, plant_id, reminder_date, kind, completed)
                SELECT $1, $2, $3, $4, FALSE
                 WHERE NOT EXISTS (
                       SELECT 1 FROM care_reminders
                        WHERE user_id = $1 AND plant_id = $2
                          AND reminder_date = $3 AND kind = $4)
                "#,
            )
            .bind(r.user_id)
            .bind(r.plant_id)
            .bind(r.reminder_date)
            .bind(r.kind)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("insert {} reminder for plant {}", r.kind, r.plant_id))?;
            inserted += res.rows_affected();
        }
        tx.commit().await.context("commit tx")?;
        Ok(inserted)
    }

    async fn set_completion(
        &self,
        user_id: Uuid,
        reminder_id: Uuid,
        completed: bool,
        completed_at: Option<OffsetDateTime>,
    ) -> anyhow::Result<Option<CareReminder>> {
        let row = sqlx::query_as::<_, CareReminder>(&format!(
            r#"
            UPDATE care_reminders
               SET completed = $3, completed_at = $4
             WHERE id = $1 AND user_id = $2
            RETURNING {REMINDER_COLUMNS}
            "#
        ))
        .bind(reminder_id)
        .bind(user_id)
        .bind(completed)
        .bind(completed_at)
        .fetch_optional(&self.db)
        .await
        .context("update reminder completion")?;
        Ok(row)
    }

    async fn list_in_range(
        &self,
        user_id: Uuid,
        start: Date,
        end: Date,
    ) -> anyhow::Result<Vec<ReminderWithPlant>> {
        let rows = sqlx::query_as::<_, ReminderWithPlant>(
            r#"
            SELECT r.id, r.user_id, r.plant_id, r.reminder_date, r.kind, r.completed,
                   r.completed_at, r.created_at,
                   p.species AS plant_species, p.nickname AS plant_nickname
              FROM care_reminders r
              JOIN plants p ON p.id = r.plant_id
             WHERE r.user_id = $1
               AND r.reminder_date BETWEEN $2 AND $3
             ORDER BY r.reminder_date, r.kind, p.species
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await
        .context("list reminders in range")?;
        Ok(rows)
    }
}
