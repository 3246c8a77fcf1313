use serde::Serialize;
use time::{Date, Month};

use super::dto::{CalendarDay, CalendarMonth, ReminderView};
use super::repo_types::{ReminderKind, ReminderWithPlant};
use super::services::CareError;

/// Badge drawn in a calendar cell for one reminder kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Badge {
    None,
    Pending,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayBadges {
    pub watering: Badge,
    pub sun: Badge,
}

/// First and last day of a calendar month.
pub fn month_bounds(year: i32, month: u8) -> Result<(Date, Date), CareError> {
    let invalid = || CareError::InvalidMonth { year, month };
    let m = Month::try_from(month).map_err(|_| invalid())?;
    let first = Date::from_calendar_date(year, m, 1).map_err(|_| invalid())?;
    let last = Date::from_calendar_date(year, m, m.length(year)).map_err(|_| invalid())?;
    Ok((first, last))
}

pub fn reminders_for_date(reminders: &[ReminderWithPlant], date: Date) -> Vec<&ReminderWithPlant> {
    reminders
        .iter()
        .filter(|r| r.reminder.reminder_date == date)
        .collect()
}

/// A day shows the completed badge as soon as one reminder of that kind is
/// done, even if others of the same kind are still pending.
pub fn badge_for(day: &[&ReminderWithPlant], kind: ReminderKind) -> Badge {
    let mut of_kind = day.iter().filter(|r| r.reminder.kind == kind).peekable();
    if of_kind.peek().is_none() {
        return Badge::None;
    }
    if of_kind.any(|r| r.reminder.completed) {
        Badge::Completed
    } else {
        Badge::Pending
    }
}

pub fn day_badges(day: &[&ReminderWithPlant]) -> DayBadges {
    DayBadges {
        watering: badge_for(day, ReminderKind::Watering),
        sun: badge_for(day, ReminderKind::Sun),
    }
}

/// Every day of the month from `first` to `last` inclusive.
pub fn month_days(first: Date, last: Date) -> impl Iterator<Item = Date> {
    std::iter::successors(Some(first), move |d| d.next_day().filter(|n| *n <= last))
}

/// Lays the loaded reminders out over every day of the month.
pub fn assemble_month(year: i32, month: u8, reminders: &[ReminderWithPlant]) -> Result<CalendarMonth, CareError> {
    let (start, end) = month_bounds(year, month)?;
    let days = month_days(start, end)
        .map(|date| {
            let day = reminders_for_date(reminders, date);
            let badges = day_badges(&day);
            CalendarDay {
                date,
                watering: badges.watering,
                sun: badges.sun,
                reminders: day.into_iter().cloned().map(ReminderView::from).collect(),
            }
        })
        .collect();
    Ok(CalendarMonth {
        year,
        month,
        start,
        end,
        days,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;
    use time::OffsetDateTime;
    use uuid::Uuid;

    use crate::reminders::repo_types::CareReminder;

    fn reminder(date: Date, kind: ReminderKind, completed: bool) -> ReminderWithPlant {
        ReminderWithPlant {
            reminder: CareReminder {
                id: Uuid::new_v4(),
                user_id: Uuid::nil(),
                plant_id: Uuid::nil(),
                reminder_date: date,
                kind,
                completed,
                completed_at: None,
                created_at: OffsetDateTime::UNIX_EPOCH,
            },
            plant_species: "Ficus microcarpa".into(),
            plant_nickname: None,
        }
    }

    #[test]
    fn month_bounds_handle_leap_years_and_bad_months() {
        assert_eq!(
            month_bounds(2028, 2).unwrap(),
            (date!(2028 - 02 - 01), date!(2028 - 02 - 29))
        );
        assert_eq!(
            month_bounds(2026, 12).unwrap(),
            (date!(2026 - 12 - 01), date!(2026 - 12 - 31))
        );
        assert!(month_bounds(2026, 0).is_err());
        assert!(month_bounds(2026, 13).is_err());
    }

    #[test]
    fn month_days_walks_every_day() {
        let (first, last) = month_bounds(2026, 4).unwrap();
        let days: Vec<_> = month_days(first, last).collect();
        assert_eq!(days.len(), 30);
        assert_eq!(days[0], first);
        assert_eq!(days[29], last);
    }

    #[test]
    fn filters_by_exact_date() {
        let d = date!(2026 - 10 - 20);
        let all = vec![
            reminder(d, ReminderKind::Watering, false),
            reminder(d.next_day().unwrap(), ReminderKind::Watering, false),
            reminder(d, ReminderKind::Sun, true),
        ];
        let day = reminders_for_date(&all, d);
        assert_eq!(day.len(), 2);
        assert!(day.iter().all(|r| r.reminder.reminder_date == d));
    }

    #[test]
    fn any_completed_reminder_marks_the_badge_completed() {
        let d = date!(2026 - 10 - 20);
        let all = vec![
            reminder(d, ReminderKind::Watering, true),
            reminder(d, ReminderKind::Watering, false),
        ];
        let day = reminders_for_date(&all, d);
        assert_eq!(
            day_badges(&day),
            DayBadges {
                watering: Badge::Completed,
                sun: Badge::None
            }
        );
    }

    #[test]
    fn assembled_month_covers_every_day() {
        let all = vec![
            reminder(date!(2026 - 10 - 01), ReminderKind::Watering, false),
            reminder(date!(2026 - 10 - 31), ReminderKind::Sun, true),
        ];
        let month = assemble_month(2026, 10, &all).unwrap();
        assert_eq!(month.days.len(), 31);
        assert_eq!(month.days[0].watering, Badge::Pending);
        assert_eq!(month.days[0].reminders.len(), 1);
        assert_eq!(month.days[15].watering, Badge::None);
        assert!(month.days[15].reminders.is_empty());
        assert_eq!(month.days[30].sun, Badge::Completed);
        assert_eq!(
            month.days[30].reminders[0].plant_species.as_deref(),
            Some("Ficus microcarpa")
        );
    }

    #[test]
    fn pending_only_when_nothing_is_done() {
        let d = date!(2026 - 10 - 21);
        let all = vec![
            reminder(d, ReminderKind::Sun, false),
            reminder(d, ReminderKind::Sun, false),
            reminder(d, ReminderKind::Watering, false),
        ];
        let day = reminders_for_date(&all, d);
        assert_eq!(badge_for(&day, ReminderKind::Sun), Badge::Pending);
        assert_eq!(badge_for(&day, ReminderKind::Watering), Badge::Pending);
        assert_eq!(badge_for(&[], ReminderKind::Sun), Badge::None);
    }
}
