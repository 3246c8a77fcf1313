use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::calendar::Badge;
use super::repo_types::{CareReminder, ReminderKind, ReminderWithPlant};
use crate::dates::iso_date;

#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    /// The client's local date; the server's UTC date when absent.
    #[serde(default, with = "iso_date::option")]
    pub today: Option<Date>,
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    /// Completion state the client is currently showing.
    pub completed: bool,
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    #[serde(with = "iso_date")]
    pub start: Date,
    #[serde(with = "iso_date")]
    pub end: Date,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReminderView {
    pub id: Uuid,
    pub plant_id: Uuid,
    pub plant_species: Option<String>,
    pub plant_nickname: Option<String>,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub kind: ReminderKind,
    pub completed: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
}

impl From<CareReminder> for ReminderView {
    fn from(r: CareReminder) -> Self {
        Self {
            id: r.id,
            plant_id: r.plant_id,
            plant_species: None,
            plant_nickname: None,
            date: r.reminder_date,
            kind: r.kind,
            completed: r.completed,
            completed_at: r.completed_at,
        }
    }
}

impl From<ReminderWithPlant> for ReminderView {
    fn from(r: ReminderWithPlant) -> Self {
        Self {
            plant_species: Some(r.plant_species),
            plant_nickname: r.plant_nickname,
            ..ReminderView::from(r.reminder)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub candidates: usize,
    pub inserted: u64,
    /// The month containing `today`, reloaded after the write.
    pub reminders: Vec<ReminderView>,
}

#[derive(Debug, Serialize)]
pub struct CalendarDay {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub watering: Badge,
    pub sun: Badge,
    pub reminders: Vec<ReminderView>,
}

#[derive(Debug, Serialize)]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u8,
    #[serde(with = "iso_date")]
    pub start: Date,
    #[serde(with = "iso_date")]
    pub end: Date,
    pub days: Vec<CalendarDay>,
}
