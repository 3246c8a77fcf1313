use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::repo_types::Plant;
use crate::dates::iso_date;

/// Body of `POST /plants` and `PUT /plants/:id`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlantRequest {
    pub species: String,
    pub nickname: Option<String>,
    pub location: Option<String>,
    pub temperature: Option<String>,
    #[serde(with = "iso_date")]
    pub start_date: Date,
    pub watering_interval_days: i32,
    pub sun_interval_days: Option<i32>,
    pub care_notes: Option<String>,
    #[serde(default = "default_public")]
    pub is_public: bool,
}

fn default_public() -> bool {
    true
}

#[derive(Debug, Clone, Serialize)]
pub struct PlantView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub species: String,
    pub nickname: Option<String>,
    pub location: Option<String>,
    pub temperature: Option<String>,
    #[serde(with = "iso_date")]
    pub start_date: Date,
    pub watering_interval_days: i32,
    pub sun_interval_days: Option<i32>,
    pub care_notes: Option<String>,
    pub image_url: Option<String>,
    pub is_public: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl PlantView {
    pub fn from_plant(p: Plant, image_url: Option<String>) -> Self {
        Self {
            id: p.id,
            user_id: p.user_id,
            species: p.species,
            nickname: p.nickname,
            location: p.location,
            temperature: p.temperature,
            start_date: p.start_date,
            watering_interval_days: p.watering_interval_days,
            sun_interval_days: p.sun_interval_days,
            care_notes: p.care_notes,
            image_url,
            is_public: p.is_public,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}
