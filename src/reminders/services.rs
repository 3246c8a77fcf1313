//! Care-reminder generation and completion.
//!
//! `generate` can run as often as the client likes: candidates always cover
//! the next [`HORIZON_DAYS`] days and only missing (user, plant, date, kind)
//! rows are written, so repeated calls converge on the same set without
//! touching completion state.

use axum::http::StatusCode;
use time::{Date, Duration};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::calendar::month_bounds;
use super::repo::ReminderStore;
use super::repo_types::{CareReminder, NewReminder, ReminderKind, ReminderWithPlant};
use crate::context::RequestContext;
use crate::plants::repo_types::Plant;

pub const HORIZON_DAYS: i64 = 60;

/// Widest window `reminders_in_range` will read in one call.
pub const MAX_RANGE_DAYS: i64 = 366;

#[derive(Debug, thiserror::Error)]
pub enum CareError {
    #[error("plant {plant_id} has a non-positive {kind} interval ({interval} days)")]
    InvalidCadence {
        plant_id: Uuid,
        kind: ReminderKind,
        interval: i32,
    },
    #[error("plant {0} does not belong to the caller")]
    ForeignPlant(Uuid),
    #[error("invalid date range {start} .. {end}")]
    InvalidRange { start: Date, end: Date },
    #[error("invalid calendar month {year}-{month}")]
    InvalidMonth { year: i32, month: u8 },
    #[error("reminder date falls outside the supported calendar")]
    DateOverflow,
    #[error("reminder not found")]
    NotFound,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl CareError {
    pub fn status(&self) -> StatusCode {
        match self {
            CareError::NotFound => StatusCode::NOT_FOUND,
            CareError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateOutcome {
    pub candidates: usize,
    pub inserted: u64,
}

/// Day offsets `0, n, 2n, ...` below the horizon.
fn cadence_offsets(
    plant_id: Uuid,
    kind: ReminderKind,
    interval: i32,
) -> Result<impl Iterator<Item = i64>, CareError> {
    if interval <= 0 {
        return Err(CareError::InvalidCadence {
            plant_id,
            kind,
            interval,
        });
    }
    Ok((0..HORIZON_DAYS).step_by(interval as usize))
}

/// Candidate reminders for every plant, dated from `today` over the horizon.
pub fn plan_reminders(
    ctx: &RequestContext,
    plants: &[Plant],
    today: Date,
) -> Result<Vec<NewReminder>, CareError> {
    let mut out = Vec::new();
    for plant in plants {
        if plant.user_id != ctx.user_id {
            return Err(CareError::ForeignPlant(plant.id));
        }

        let mut cadences = vec![(ReminderKind::Watering, plant.watering_interval_days)];
        if let Some(sun) = plant.sun_interval_days {
            cadences.push((ReminderKind::Sun, sun));
        }

        for (kind, interval) in cadences {
            for offset in cadence_offsets(plant.id, kind, interval)? {
                let reminder_date = today
                    .checked_add(Duration::days(offset))
                    .ok_or(CareError::DateOverflow)?;
                out.push(NewReminder {
                    user_id: ctx.user_id,
                    plant_id: plant.id,
                    reminder_date,
                    kind,
                });
            }
        }
    }
    Ok(out)
}

/// Plans and stores reminders for `plants`. Nothing is written when there is
/// nothing to plan or when any plant fails validation.
pub async fn generate(
    store: &dyn ReminderStore,
    ctx: &RequestContext,
    plants: &[Plant],
    today: Date,
) -> Result<GenerateOutcome, CareError> {
    let batch = plan_reminders(ctx, plants, today)?;
    if batch.is_empty() {
        debug!(user_id = %ctx.user_id, "no plants, nothing to generate");
        return Ok(GenerateOutcome {
            candidates: 0,
            inserted: 0,
        });
    }

    let inserted = store.insert_missing(&batch).await.map_err(|e| {
        warn!(error = %e, user_id = %ctx.user_id, "reminder batch not committed");
        CareError::Storage(e)
    })?;

    info!(
        user_id = %ctx.user_id,
        plants = plants.len(),
        candidates = batch.len(),
        inserted,
        %today,
        "reminders generated"
    );
    Ok(GenerateOutcome {
        candidates: batch.len(),
        inserted,
    })
}

/// Runs `generate` and then reads back, from storage, the calendar month
/// containing `today`.
pub async fn generate_and_reload(
    store: &dyn ReminderStore,
    ctx: &RequestContext,
    plants: &[Plant],
    today: Date,
) -> Result<(GenerateOutcome, Vec<ReminderWithPlant>), CareError> {
    let outcome = generate(store, ctx, plants, today).await?;
    let (start, end) = month_bounds(today.year(), u8::from(today.month()))?;
    let month = reminders_in_range(store, ctx, start, end).await?;
    Ok((outcome, month))
}

/// Flips a reminder relative to the state the caller last saw.
pub async fn toggle(
    store: &dyn ReminderStore,
    ctx: &RequestContext,
    reminder_id: Uuid,
    currently_completed: bool,
) -> Result<CareReminder, CareError> {
    let completed = !currently_completed;
    let completed_at = completed.then_some(ctx.now);

    let updated = store
        .set_completion(ctx.user_id, reminder_id, completed, completed_at)
        .await?
        .ok_or(CareError::NotFound)?;

    info!(user_id = %ctx.user_id, %reminder_id, completed, "reminder toggled");
    Ok(updated)
}

pub async fn reminders_in_range(
    store: &dyn ReminderStore,
    ctx: &RequestContext,
    start: Date,
    end: Date,
) -> Result<Vec<ReminderWithPlant>, CareError> {
    if start > end || (end - start).whole_days() >= MAX_RANGE_DAYS {
        return Err(CareError::InvalidRange { start, end });
    }
    let rows = store.list_in_range(ctx.user_id, start, end).await?;
    Ok(rows
        .into_iter()
        .filter(|r| r.reminder.reminder_date >= start && r.reminder.reminder_date <= end)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminders::repo::memory::MemoryReminderStore;
    use std::collections::HashSet;
    use time::macros::{date, datetime};
    use time::OffsetDateTime;

    const TODAY: Date = date!(2026 - 10 - 19);

    fn ctx(user_id: Uuid) -> RequestContext {
        RequestContext::new(user_id, datetime!(2026-10-19 08:30 UTC))
    }

    fn plant(user_id: Uuid, watering: i32, sun: Option<i32>) -> Plant {
        let now = OffsetDateTime::now_utc();
        Plant {
            id: Uuid::new_v4(),
            user_id,
            species: "Acer palmatum".into(),
            nickname: Some("Momiji".into()),
            location: None,
            temperature: None,
            start_date: date!(2023 - 05 - 01),
            watering_interval_days: watering,
            sun_interval_days: sun,
            care_notes: None,
            image_key: None,
            is_public: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn offsets(batch: &[NewReminder], kind: ReminderKind) -> Vec<i64> {
        batch
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| (r.reminder_date - TODAY).whole_days())
            .collect()
    }

    #[test]
    fn watering_count_is_ceil_of_horizon_over_interval() {
        let user = Uuid::new_v4();
        for w in [1, 2, 3, 7, 11, 59, 60, 61, 365] {
            let batch = plan_reminders(&ctx(user), &[plant(user, w, None)], TODAY).unwrap();
            let days = offsets(&batch, ReminderKind::Watering);
            let expected = (60 + w as usize - 1) / w as usize;
            assert_eq!(days.len(), expected, "interval {w}");
            assert!(days.iter().all(|d| d % w as i64 == 0 && *d < 60));
            let unique: HashSet<_> = days.iter().collect();
            assert_eq!(unique.len(), days.len());
        }
    }

    #[test]
    fn watering_three_sun_seven_yields_29_candidates() {
        let user = Uuid::new_v4();
        let batch = plan_reminders(&ctx(user), &[plant(user, 3, Some(7))], TODAY).unwrap();
        assert_eq!(batch.len(), 29);

        let watering = offsets(&batch, ReminderKind::Watering);
        assert_eq!(watering, (0..60).step_by(3).collect::<Vec<_>>());
        assert_eq!(watering.len(), 20);

        let sun = offsets(&batch, ReminderKind::Sun);
        assert_eq!(sun, vec![0, 7, 14, 21, 28, 35, 42, 49, 56]);
    }

    #[test]
    fn no_sun_interval_means_no_sun_reminders() {
        let user = Uuid::new_v4();
        let batch = plan_reminders(&ctx(user), &[plant(user, 5, None)], TODAY).unwrap();
        assert!(batch.iter().all(|r| r.kind == ReminderKind::Watering));
        assert_eq!(batch.len(), 12);
    }

    #[test]
    fn non_positive_interval_is_rejected() {
        let user = Uuid::new_v4();
        let err = plan_reminders(&ctx(user), &[plant(user, 0, None)], TODAY).unwrap_err();
        assert!(matches!(
            err,
            CareError::InvalidCadence {
                kind: ReminderKind::Watering,
                interval: 0,
                ..
            }
        ));

        let err = plan_reminders(&ctx(user), &[plant(user, 2, Some(-1))], TODAY).unwrap_err();
        assert!(matches!(err, CareError::InvalidCadence { kind: ReminderKind::Sun, .. }));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn foreign_plants_are_rejected() {
        let me = Uuid::new_v4();
        let someone_else = plant(Uuid::new_v4(), 2, None);
        let err = plan_reminders(&ctx(me), &[plant(me, 2, None), someone_else.clone()], TODAY)
            .unwrap_err();
        assert!(matches!(err, CareError::ForeignPlant(id) if id == someone_else.id));
    }

    #[tokio::test]
    async fn empty_plant_list_skips_persistence() {
        let store = MemoryReminderStore::default();
        let out = generate(&store, &ctx(Uuid::new_v4()), &[], TODAY).await.unwrap();
        assert_eq!(out, GenerateOutcome { candidates: 0, inserted: 0 });
        assert_eq!(store.insert_calls(), 0);
    }

    #[tokio::test]
    async fn generate_twice_is_idempotent_and_keeps_progress() {
        let user = Uuid::new_v4();
        let c = ctx(user);
        let p = plant(user, 3, Some(7));
        let store = MemoryReminderStore::default();

        let first = generate(&store, &c, &[p.clone()], TODAY).await.unwrap();
        assert_eq!(first, GenerateOutcome { candidates: 29, inserted: 29 });

        let target = store.all().await[4].id;
        toggle(&store, &c, target, false).await.unwrap();

        let second = generate(&store, &c, &[p], TODAY).await.unwrap();
        assert_eq!(second, GenerateOutcome { candidates: 29, inserted: 0 });

        let rows = store.all().await;
        assert_eq!(rows.len(), 29);
        let done: Vec<_> = rows.iter().filter(|r| r.completed).collect();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].id, target);
    }

    #[tokio::test]
    async fn later_run_only_adds_the_new_tail() {
        let user = Uuid::new_v4();
        let c = ctx(user);
        let p = plant(user, 1, None);
        let store = MemoryReminderStore::default();

        generate(&store, &c, &[p.clone()], TODAY).await.unwrap();
        let next_day = TODAY.next_day().unwrap();
        let out = generate(&store, &c, &[p], next_day).await.unwrap();
        assert_eq!(out.inserted, 1);
        assert_eq!(store.all().await.len(), 61);
    }

    #[tokio::test]
    async fn generate_returns_the_month_read_back_from_storage() {
        let user = Uuid::new_v4();
        let c = ctx(user);
        let p = plant(user, 7, None);
        let store = MemoryReminderStore::default();
        store.add_plant(p.id, &p.species, p.nickname.as_deref()).await;

        generate(&store, &c, &[p.clone()], TODAY).await.unwrap();
        let first = store.all().await[0].id;
        toggle(&store, &c, first, false).await.unwrap();

        let (outcome, month) = generate_and_reload(&store, &c, &[p], TODAY).await.unwrap();
        assert_eq!(outcome, GenerateOutcome { candidates: 9, inserted: 0 });

        // 2026-10-19 and 2026-10-26 fall in October; later dates do not.
        assert_eq!(month.len(), 2);
        assert!(month.iter().all(|r| r.reminder.reminder_date.month() == time::Month::October));
        let stored = month.iter().find(|r| r.reminder.id == first).unwrap();
        assert!(stored.reminder.completed);
        assert_eq!(stored.plant_species, "Acer palmatum");
    }

    #[tokio::test]
    async fn reload_is_skipped_when_generation_fails() {
        let user = Uuid::new_v4();
        let store = MemoryReminderStore::default();
        store.fail_writes(true);
        let err = generate_and_reload(&store, &ctx(user), &[plant(user, 2, None)], TODAY)
            .await
            .unwrap_err();
        assert!(matches!(err, CareError::Storage(_)));
    }

    #[tokio::test]
    async fn failed_batch_commits_nothing() {
        let user = Uuid::new_v4();
        let store = MemoryReminderStore::default();
        store.fail_writes(true);

        let err = generate(&store, &ctx(user), &[plant(user, 2, None)], TODAY)
            .await
            .unwrap_err();
        assert!(matches!(err, CareError::Storage(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(store.all().await.is_empty());
    }

    #[tokio::test]
    async fn toggle_sets_and_clears_completion_time() {
        let user = Uuid::new_v4();
        let c = ctx(user);
        let store = MemoryReminderStore::default();
        generate(&store, &c, &[plant(user, 30, None)], TODAY).await.unwrap();
        let id = store.all().await[0].id;

        let done = toggle(&store, &c, id, false).await.unwrap();
        assert!(done.completed);
        assert_eq!(done.completed_at, Some(c.now));

        let undone = toggle(&store, &c, id, true).await.unwrap();
        assert!(!undone.completed);
        assert_eq!(undone.completed_at, None);
    }

    #[tokio::test]
    async fn toggle_of_someone_elses_reminder_is_not_found() {
        let owner = Uuid::new_v4();
        let store = MemoryReminderStore::default();
        generate(&store, &ctx(owner), &[plant(owner, 30, None)], TODAY)
            .await
            .unwrap();
        let id = store.all().await[0].id;

        let err = toggle(&store, &ctx(Uuid::new_v4()), id, false).await.unwrap_err();
        assert!(matches!(err, CareError::NotFound));
        assert!(!store.all().await[0].completed);
    }

    #[tokio::test]
    async fn failed_toggle_leaves_state_alone() {
        let user = Uuid::new_v4();
        let store = MemoryReminderStore::default();
        generate(&store, &ctx(user), &[plant(user, 30, None)], TODAY)
            .await
            .unwrap();
        let id = store.all().await[0].id;

        store.fail_writes(true);
        assert!(toggle(&store, &ctx(user), id, false).await.is_err());
        assert!(!store.all().await[0].completed);
    }

    #[tokio::test]
    async fn range_is_inclusive_and_scoped_to_the_caller() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        let store = MemoryReminderStore::default();
        let mine = plant(me, 1, None);
        store.add_plant(mine.id, &mine.species, mine.nickname.as_deref()).await;
        generate(&store, &ctx(me), &[mine], TODAY).await.unwrap();
        generate(&store, &ctx(other), &[plant(other, 1, None)], TODAY)
            .await
            .unwrap();

        let start = date!(2026 - 10 - 25);
        let end = date!(2026 - 10 - 31);
        let rows = reminders_in_range(&store, &ctx(me), start, end).await.unwrap();
        assert_eq!(rows.len(), 7);
        assert!(rows.iter().all(|r| r.reminder.user_id == me));
        assert!(rows
            .iter()
            .all(|r| r.reminder.reminder_date >= start && r.reminder.reminder_date <= end));
        assert_eq!(rows[0].plant_nickname.as_deref(), Some("Momiji"));
    }

    #[tokio::test]
    async fn inverted_or_huge_range_is_rejected() {
        let store = MemoryReminderStore::default();
        let c = ctx(Uuid::new_v4());
        let err = reminders_in_range(&store, &c, date!(2026 - 11 - 01), date!(2026 - 10 - 01))
            .await
            .unwrap_err();
        assert!(matches!(err, CareError::InvalidRange { .. }));

        let err = reminders_in_range(&store, &c, date!(2025 - 01 - 01), date!(2026 - 06 - 01))
            .await
            .unwrap_err();
        assert!(matches!(err, CareError::InvalidRange { .. }));
    }
}
