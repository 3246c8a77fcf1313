use serde::Serialize;
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Plant {
    pub id: Uuid,
    pub user_id: Uuid,
    pub species: String,
    pub nickname: Option<String>,
    pub location: Option<String>,
    pub temperature: Option<String>,
    pub start_date: Date,
    pub watering_interval_days: i32,
    pub sun_interval_days: Option<i32>,
    pub care_notes: Option<String>,
    pub image_key: Option<String>,
    pub is_public: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Validated column values for insert/update.
#[derive(Debug, Clone, PartialEq)]
pub struct PlantFields {
    pub species: String,
    pub nickname: Option<String>,
    pub location: Option<String>,
    pub temperature: Option<String>,
    pub start_date: Date,
    pub watering_interval_days: i32,
    pub sun_interval_days: Option<i32>,
    pub care_notes: Option<String>,
    pub is_public: bool,
}
