use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Which care action a reminder stands for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "reminder_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReminderKind {
    Watering,
    Sun,
}

impl std::fmt::Display for ReminderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ReminderKind::Watering => "watering",
            ReminderKind::Sun => "sun",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CareReminder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plant_id: Uuid,
    pub reminder_date: Date,
    pub kind: ReminderKind,
    pub completed: bool,
    pub completed_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

/// A reminder to be created; always starts out pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NewReminder {
    pub user_id: Uuid,
    pub plant_id: Uuid,
    pub reminder_date: Date,
    pub kind: ReminderKind,
}

#[cfg(test)]
impl NewReminder {
    pub fn matches(&self, r: &CareReminder) -> bool {
        self.user_id == r.user_id
            && self.plant_id == r.plant_id
            && self.reminder_date == r.reminder_date
            && self.kind == r.kind
    }
}

/// Reminder joined with the plant fields the calendar displays.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ReminderWithPlant {
    #[sqlx(flatten)]
    pub reminder: CareReminder,
    pub plant_species: String,
    pub plant_nickname: Option<String>,
}
