use crate::engine::localize_on;
use crate::model::{DayType, OverrideKind, ScheduleOverride};
use crate::store::{OverrideStore, ScheduleStore};
use anyhow::Result;
use chrono::{DateTime, Datelike, NaiveDate};
use chrono_tz::Tz;
use tracing::debug;

/// The work-hours interval resolved for one user on one calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkHoursBoundary {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

/// Outcome of one resolution strategy in the precedence chain.
enum Resolution {
    /// Work hours apply on this date with this interval.
    Boundary(WorkHoursBoundary),
    /// This strategy decides the date has no work hours at all.
    NoWorkHours,
    /// This strategy has nothing to say; try the next one.
    NotApplicable,
}

/// Resolve the work-hours interval for a user on a date, localized to
/// `zone`. Overrides take strict precedence over the regular schedule.
/// `None` is a normal result meaning the whole day is off-hours.
pub fn resolve<S>(
    store: &S,
    user_id: &str,
    date: NaiveDate,
    zone: Tz,
) -> Result<Option<WorkHoursBoundary>>
where
    S: ScheduleStore + OverrideStore,
{
    match resolve_override(store, date, zone)? {
        Resolution::Boundary(boundary) => return Ok(Some(boundary)),
        Resolution::NoWorkHours => return Ok(None),
        Resolution::NotApplicable => {}
    }

    match resolve_schedule(store, user_id, date, zone)? {
        Resolution::Boundary(boundary) => Ok(Some(boundary)),
        Resolution::NoWorkHours | Resolution::NotApplicable => Ok(None),
    }
}

fn resolve_override<S: OverrideStore>(store: &S, date: NaiveDate, zone: Tz) -> Result<Resolution> {
    let Some(record) = store.override_for_date(date)? else {
        return Ok(Resolution::NotApplicable);
    };

    debug!(%date, kind = record.kind.as_str(), "schedule override found");

    match record.kind {
        OverrideKind::Holiday | OverrideKind::Pto => Ok(Resolution::NoWorkHours),
        OverrideKind::IrregularWork | OverrideKind::Custom => custom_boundary(&record, date, zone),
    }
}

fn custom_boundary(record: &ScheduleOverride, date: NaiveDate, zone: Tz) -> Result<Resolution> {
    let (Some(start), Some(end)) = (record.custom_start_time, record.custom_end_time) else {
        return Ok(Resolution::NoWorkHours);
    };

    Ok(Resolution::Boundary(WorkHoursBoundary {
        start: localize_on(zone, date, start)?,
        end: localize_on(zone, date, end)?,
    }))
}

fn resolve_schedule<S: ScheduleStore>(
    store: &S,
    user_id: &str,
    date: NaiveDate,
    zone: Tz,
) -> Result<Resolution> {
    let day = date.weekday();
    let Some(schedule) = store.schedule_for_day(user_id, day)? else {
        debug!(user = user_id, ?day, "no working schedule configured");
        return Ok(Resolution::NoWorkHours);
    };

    if !schedule.active {
        debug!(user = user_id, ?day, "working schedule inactive");
        return Ok(Resolution::NoWorkHours);
    }

    Ok(Resolution::Boundary(WorkHoursBoundary {
        start: localize_on(zone, date, schedule.start_time)?,
        end: localize_on(zone, date, schedule.end_time)?,
    }))
}

/// Classify a calendar date for a user: overrides first, then the
/// regular schedule. `SickDay` is never produced here.
pub fn day_type_for<S>(store: &S, user_id: &str, date: NaiveDate) -> Result<DayType>
where
    S: ScheduleStore + OverrideStore,
{
    if let Some(record) = store.override_for_date(date)? {
        let day_type = match record.kind {
            OverrideKind::Holiday => DayType::Holiday,
            OverrideKind::Pto => DayType::Pto,
            OverrideKind::IrregularWork | OverrideKind::Custom => DayType::Workday,
        };
        return Ok(day_type);
    }

    let schedule = store.schedule_for_day(user_id, date.weekday())?;
    match schedule {
        Some(schedule) if schedule.active => Ok(DayType::Workday),
        _ => Ok(DayType::NonWorkday),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{insert_override, insert_schedule, temp_database};
    use chrono::{NaiveTime, Weekday};
    use chrono_tz::Asia::Seoul;

    const USER: &str = "user-1";

    // 2026-03-02 is a Monday.
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    #[test]
    fn regular_schedule_resolves_to_local_interval() {
        let (_dir, database) = temp_database();
        insert_schedule(&database, USER, Weekday::Mon, (9, 0), (17, 0), true);

        let boundary = resolve(&database, USER, monday(), Seoul).unwrap().unwrap();
        assert_eq!(boundary.start.to_rfc3339(), "2026-03-02T09:00:00+09:00");
        assert_eq!(boundary.end.to_rfc3339(), "2026-03-02T17:00:00+09:00");
    }

    #[test]
    fn missing_or_inactive_schedule_means_no_work_hours() {
        let (_dir, database) = temp_database();
        assert!(resolve(&database, USER, monday(), Seoul).unwrap().is_none());

        insert_schedule(&database, USER, Weekday::Mon, (9, 0), (17, 0), false);
        assert!(resolve(&database, USER, monday(), Seoul).unwrap().is_none());
    }

    #[test]
    fn holiday_override_beats_active_schedule() {
        let (_dir, database) = temp_database();
        insert_schedule(&database, USER, Weekday::Mon, (9, 0), (17, 0), true);
        insert_override(&database, monday(), crate::model::OverrideKind::Holiday, None);

        assert!(resolve(&database, USER, monday(), Seoul).unwrap().is_none());
        assert_eq!(
            day_type_for(&database, USER, monday()).unwrap(),
            DayType::Holiday
        );
    }

    #[test]
    fn irregular_work_override_supplies_custom_interval() {
        let (_dir, database) = temp_database();
        insert_override(
            &database,
            monday(),
            crate::model::OverrideKind::IrregularWork,
            Some((
                NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            )),
        );

        let boundary = resolve(&database, USER, monday(), Seoul).unwrap().unwrap();
        assert_eq!(boundary.start.to_rfc3339(), "2026-03-02T13:00:00+09:00");
        assert_eq!(boundary.end.to_rfc3339(), "2026-03-02T18:00:00+09:00");
        assert_eq!(
            day_type_for(&database, USER, monday()).unwrap(),
            DayType::Workday
        );
    }

    #[test]
    fn custom_override_without_times_means_no_work_hours() {
        let (_dir, database) = temp_database();
        insert_schedule(&database, USER, Weekday::Mon, (9, 0), (17, 0), true);
        insert_override(&database, monday(), crate::model::OverrideKind::Custom, None);

        // The override decides the date; the schedule is never consulted.
        assert!(resolve(&database, USER, monday(), Seoul).unwrap().is_none());
    }

    #[test]
    fn day_type_without_any_configuration_is_non_workday() {
        let (_dir, database) = temp_database();
        assert_eq!(
            day_type_for(&database, USER, monday()).unwrap(),
            DayType::NonWorkday
        );
    }
}
