pub mod queries;

use crate::model::{
    ActivityKind, ActivitySegment, ActivitySession, DailyAggregation, DayType, OverrideKind,
    ScheduleOverride, SegmentKind, WorkingSchedule, weekday_as_str, weekday_parse,
};
use crate::store::{AggregationStore, OverrideStore, ScheduleStore, SegmentStore, SessionStore};
use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, Weekday};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::fs;
use std::path::Path;
use uuid::Uuid;

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite DB: {}", path.display()))?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .context("Failed to enable foreign keys")?;

        let database = Self { conn };
        database.init_schema()?;

        Ok(database)
    }

    pub fn init_schema(&self) -> Result<()> {
        queries::schema_statements()
            .iter()
            .try_for_each(|statement| {
                self.conn
                    .execute(statement, [])
                    .context("Failed to initialize schema")
                    .map(|_| ())
            })
    }

    // ---- sessions ----

    pub fn soft_delete_session(&self, id: Uuid) -> Result<bool> {
        let updated = self
            .conn
            .execute(
                "UPDATE activity_sessions SET deleted = 1 WHERE id = ?1",
                params![id.to_string()],
            )
            .context("Failed to soft delete session")?;

        Ok(updated > 0)
    }

    // ---- working schedules ----

    pub fn insert_schedule(&self, schedule: &WorkingSchedule) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO working_schedules
                 (id, user_id, day_of_week, start_time, end_time, timezone, active,
                  effective_from, effective_to, deleted)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    schedule.id.to_string(),
                    schedule.user_id,
                    weekday_as_str(schedule.day_of_week),
                    schedule.start_time,
                    schedule.end_time,
                    schedule.timezone,
                    schedule.active,
                    schedule.effective_from,
                    schedule.effective_to,
                    schedule.deleted,
                ],
            )
            .context("Failed to insert working schedule")?;

        Ok(())
    }

    pub fn schedule_by_id(&self, id: Uuid) -> Result<Option<WorkingSchedule>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, user_id, day_of_week, start_time, end_time, timezone, active,
                        effective_from, effective_to, deleted
                 FROM working_schedules WHERE id = ?1",
                params![id.to_string()],
                schedule_from_row,
            )
            .optional()
            .context("Failed to query working schedule")?;

        Ok(row)
    }

    pub fn update_schedule(&self, schedule: &WorkingSchedule) -> Result<bool> {
        let updated = self
            .conn
            .execute(
                "UPDATE working_schedules
                 SET day_of_week = ?2, start_time = ?3, end_time = ?4, timezone = ?5,
                     active = ?6, effective_from = ?7, effective_to = ?8
                 WHERE id = ?1",
                params![
                    schedule.id.to_string(),
                    weekday_as_str(schedule.day_of_week),
                    schedule.start_time,
                    schedule.end_time,
                    schedule.timezone,
                    schedule.active,
                    schedule.effective_from,
                    schedule.effective_to,
                ],
            )
            .context("Failed to update working schedule")?;

        Ok(updated > 0)
    }

    pub fn soft_delete_schedule(&self, id: Uuid) -> Result<bool> {
        let updated = self
            .conn
            .execute(
                "UPDATE working_schedules SET deleted = 1 WHERE id = ?1",
                params![id.to_string()],
            )
            .context("Failed to soft delete working schedule")?;

        Ok(updated > 0)
    }

    // ---- schedule overrides ----

    pub fn insert_override(&self, record: &ScheduleOverride) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO schedule_overrides
                 (id, date, kind, custom_start_time, custom_end_time, reason, deleted)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.id.to_string(),
                    record.date,
                    record.kind.as_str(),
                    record.custom_start_time,
                    record.custom_end_time,
                    record.reason,
                    record.deleted,
                ],
            )
            .context("Failed to insert schedule override")?;

        Ok(())
    }

    pub fn soft_delete_override(&self, id: Uuid) -> Result<bool> {
        let updated = self
            .conn
            .execute(
                "UPDATE schedule_overrides SET deleted = 1 WHERE id = ?1",
                params![id.to_string()],
            )
            .context("Failed to soft delete schedule override")?;

        Ok(updated > 0)
    }

    // ---- status helpers ----

    pub fn latest_aggregation_date(&self) -> Result<Option<NaiveDate>> {
        let date = self
            .conn
            .query_row(
                "SELECT date FROM daily_aggregations ORDER BY date DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to query latest aggregation date")?;

        Ok(date)
    }

    pub fn unprocessed_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM activity_sessions WHERE processed = 0 AND deleted = 0",
                [],
                |row| row.get(0),
            )
            .context("Failed to count unprocessed sessions")?;

        Ok(count)
    }
}

impl SessionStore for Database {
    fn session_by_id(&self, id: Uuid) -> Result<Option<ActivitySession>> {
        let row = self
            .conn
            .query_row(
                &format!("{SESSION_SELECT} WHERE id = ?1"),
                params![id.to_string()],
                session_from_row,
            )
            .optional()
            .context("Failed to query session by id")?;

        Ok(row)
    }

    fn sessions_by_user(&self, user_id: &str) -> Result<Vec<ActivitySession>> {
        let mut statement = self
            .conn
            .prepare(&format!(
                "{SESSION_SELECT} WHERE user_id = ?1 ORDER BY start_time ASC"
            ))?;

        let rows = statement
            .query_map(params![user_id], session_from_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query sessions by user")?;

        Ok(rows)
    }

    fn unprocessed_sessions(&self, user_id: Option<&str>) -> Result<Vec<ActivitySession>> {
        let rows = match user_id {
            Some(user) => {
                let mut statement = self.conn.prepare(&format!(
                    "{SESSION_SELECT} WHERE processed = 0 AND deleted = 0 AND user_id = ?1
                     ORDER BY start_time ASC"
                ))?;
                statement
                    .query_map(params![user], session_from_row)?
                    .collect::<Result<Vec<_>, _>>()
            }
            None => {
                let mut statement = self.conn.prepare(&format!(
                    "{SESSION_SELECT} WHERE processed = 0 AND deleted = 0
                     ORDER BY start_time ASC"
                ))?;
                statement
                    .query_map([], session_from_row)?
                    .collect::<Result<Vec<_>, _>>()
            }
        }
        .context("Failed to query unprocessed sessions")?;

        Ok(rows)
    }

    fn session_by_external_id(&self, external_id: &str) -> Result<Option<ActivitySession>> {
        let row = self
            .conn
            .query_row(
                &format!("{SESSION_SELECT} WHERE external_record_id = ?1"),
                params![external_id],
                session_from_row,
            )
            .optional()
            .context("Failed to query session by external record id")?;

        Ok(row)
    }

    fn insert_session(&self, session: &ActivitySession) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO activity_sessions
                 (id, user_id, kind, start_time, end_time, timezone, step_count,
                  calories_burned, average_heart_rate, min_heart_rate, max_heart_rate,
                  exercise_type, exercise_title, data_source, external_record_id,
                  ingested_at, processed, deleted)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                         ?15, ?16, ?17, ?18)",
                params![
                    session.id.to_string(),
                    session.user_id,
                    session.kind.as_str(),
                    session.start_time,
                    session.end_time,
                    session.timezone,
                    session.step_count,
                    session.calories_burned,
                    session.average_heart_rate,
                    session.min_heart_rate,
                    session.max_heart_rate,
                    session.exercise_type,
                    session.exercise_title,
                    session.data_source,
                    session.external_record_id,
                    session.ingested_at,
                    session.processed,
                    session.deleted,
                ],
            )
            .context("Failed to insert session")?;

        Ok(())
    }
}

impl ScheduleStore for Database {
    fn active_schedules(&self, user_id: &str) -> Result<Vec<WorkingSchedule>> {
        let mut statement = self.conn.prepare(
            "SELECT id, user_id, day_of_week, start_time, end_time, timezone, active,
                    effective_from, effective_to, deleted
             FROM working_schedules
             WHERE user_id = ?1 AND active = 1 AND deleted = 0
             ORDER BY day_of_week ASC",
        )?;

        let rows = statement
            .query_map(params![user_id], schedule_from_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query active schedules")?;

        Ok(rows)
    }

    fn schedule_for_day(&self, user_id: &str, day: Weekday) -> Result<Option<WorkingSchedule>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, user_id, day_of_week, start_time, end_time, timezone, active,
                        effective_from, effective_to, deleted
                 FROM working_schedules
                 WHERE user_id = ?1 AND day_of_week = ?2 AND deleted = 0
                 LIMIT 1",
                params![user_id, weekday_as_str(day)],
                schedule_from_row,
            )
            .optional()
            .context("Failed to query schedule for day of week")?;

        Ok(row)
    }
}

impl OverrideStore for Database {
    fn override_for_date(&self, date: NaiveDate) -> Result<Option<ScheduleOverride>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, date, kind, custom_start_time, custom_end_time, reason, deleted
                 FROM schedule_overrides
                 WHERE date = ?1 AND deleted = 0",
                params![date],
                override_from_row,
            )
            .optional()
            .context("Failed to query schedule override")?;

        Ok(row)
    }

    fn overrides_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<ScheduleOverride>> {
        let mut statement = self.conn.prepare(
            "SELECT id, date, kind, custom_start_time, custom_end_time, reason, deleted
             FROM schedule_overrides
             WHERE date >= ?1 AND date <= ?2 AND deleted = 0
             ORDER BY date ASC",
        )?;

        let rows = statement
            .query_map(params![from, to], override_from_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query schedule overrides")?;

        Ok(rows)
    }
}

impl SegmentStore for Database {
    fn segments_for_date(&self, date: NaiveDate) -> Result<Vec<ActivitySegment>> {
        let mut statement = self.conn.prepare(&format!(
            "{SEGMENT_SELECT} WHERE activity_date = ?1 ORDER BY start_time ASC"
        ))?;

        let rows = statement
            .query_map(params![date], segment_from_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query segments for date")?;

        Ok(rows)
    }

    fn segments_for_date_and_kind(
        &self,
        date: NaiveDate,
        kind: SegmentKind,
    ) -> Result<Vec<ActivitySegment>> {
        let mut statement = self.conn.prepare(&format!(
            "{SEGMENT_SELECT} WHERE activity_date = ?1 AND kind = ?2 ORDER BY start_time ASC"
        ))?;

        let rows = statement
            .query_map(params![date, kind.as_str()], segment_from_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query segments for date and kind")?;

        Ok(rows)
    }

    fn save_segments(&mut self, session_id: Uuid, segments: &[ActivitySegment]) -> Result<()> {
        let transaction = self
            .conn
            .transaction()
            .context("Failed to start segment transaction")?;

        segments.iter().try_for_each(|segment| {
            transaction
                .execute(
                    "INSERT INTO activity_segments
                     (id, session_id, kind, activity_date, start_time, end_time,
                      duration_seconds, step_count, calories_burned, average_heart_rate,
                      min_heart_rate, max_heart_rate, allocation_ratio, is_split, deleted)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                    params![
                        segment.id.to_string(),
                        segment.session_id.to_string(),
                        segment.kind.as_str(),
                        segment.activity_date,
                        segment.start_time,
                        segment.end_time,
                        segment.duration_seconds,
                        segment.step_count,
                        segment.calories_burned,
                        segment.average_heart_rate,
                        segment.min_heart_rate,
                        segment.max_heart_rate,
                        segment.allocation_ratio,
                        segment.is_split,
                        segment.deleted,
                    ],
                )
                .context("Failed to insert segment")
                .map(|_| ())
        })?;

        let updated = transaction
            .execute(
                "UPDATE activity_sessions SET processed = 1 WHERE id = ?1",
                params![session_id.to_string()],
            )
            .context("Failed to mark session processed")?;

        if updated == 0 {
            bail!("Session not found: {session_id}");
        }

        transaction
            .commit()
            .context("Failed to commit segment batch")?;

        Ok(())
    }
}

impl AggregationStore for Database {
    fn aggregation_for(&self, user_id: &str, date: NaiveDate) -> Result<Option<DailyAggregation>> {
        let row = self
            .conn
            .query_row(
                &format!("{AGGREGATION_SELECT} WHERE user_id = ?1 AND date = ?2"),
                params![user_id, date],
                aggregation_from_row,
            )
            .optional()
            .context("Failed to query daily aggregation")?;

        Ok(row)
    }

    fn upsert_aggregation(&self, aggregation: &DailyAggregation) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO daily_aggregations
                 (id, user_id, date, day_type,
                  work_hours_steps, work_hours_calories, work_hours_active_minutes,
                  work_hours_avg_heart_rate,
                  off_hours_steps, off_hours_calories, off_hours_active_minutes,
                  off_hours_avg_heart_rate,
                  total_steps, total_calories, total_active_minutes,
                  sleep_duration_seconds, sleep_quality_score, computed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                         ?15, ?16, ?17, ?18)
                 ON CONFLICT(user_id, date)
                 DO UPDATE SET
                   day_type = excluded.day_type,
                   work_hours_steps = excluded.work_hours_steps,
                   work_hours_calories = excluded.work_hours_calories,
                   work_hours_active_minutes = excluded.work_hours_active_minutes,
                   work_hours_avg_heart_rate = excluded.work_hours_avg_heart_rate,
                   off_hours_steps = excluded.off_hours_steps,
                   off_hours_calories = excluded.off_hours_calories,
                   off_hours_active_minutes = excluded.off_hours_active_minutes,
                   off_hours_avg_heart_rate = excluded.off_hours_avg_heart_rate,
                   total_steps = excluded.total_steps,
                   total_calories = excluded.total_calories,
                   total_active_minutes = excluded.total_active_minutes,
                   sleep_duration_seconds = excluded.sleep_duration_seconds,
                   sleep_quality_score = excluded.sleep_quality_score,
                   computed_at = excluded.computed_at",
                params![
                    aggregation.id.to_string(),
                    aggregation.user_id,
                    aggregation.date,
                    aggregation.day_type.as_str(),
                    aggregation.work_hours_steps,
                    aggregation.work_hours_calories,
                    aggregation.work_hours_active_minutes,
                    aggregation.work_hours_avg_heart_rate,
                    aggregation.off_hours_steps,
                    aggregation.off_hours_calories,
                    aggregation.off_hours_active_minutes,
                    aggregation.off_hours_avg_heart_rate,
                    aggregation.total_steps,
                    aggregation.total_calories,
                    aggregation.total_active_minutes,
                    aggregation.sleep_duration_seconds,
                    aggregation.sleep_quality_score,
                    aggregation.computed_at,
                ],
            )
            .context("Failed to upsert daily aggregation")?;

        Ok(())
    }

    fn aggregations_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyAggregation>> {
        let mut statement = self.conn.prepare(&format!(
            "{AGGREGATION_SELECT} WHERE date >= ?1 AND date <= ?2 ORDER BY date DESC"
        ))?;

        let rows = statement
            .query_map(params![from, to], aggregation_from_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query daily aggregations in range")?;

        Ok(rows)
    }
}

const SESSION_SELECT: &str = "SELECT id, user_id, kind, start_time, end_time, timezone, \
     step_count, calories_burned, average_heart_rate, min_heart_rate, max_heart_rate, \
     exercise_type, exercise_title, data_source, external_record_id, ingested_at, \
     processed, deleted FROM activity_sessions";

const SEGMENT_SELECT: &str = "SELECT id, session_id, kind, activity_date, start_time, end_time, \
     duration_seconds, step_count, calories_burned, average_heart_rate, min_heart_rate, \
     max_heart_rate, allocation_ratio, is_split, deleted FROM activity_segments";

const AGGREGATION_SELECT: &str = "SELECT id, user_id, date, day_type, \
     work_hours_steps, work_hours_calories, work_hours_active_minutes, work_hours_avg_heart_rate, \
     off_hours_steps, off_hours_calories, off_hours_active_minutes, off_hours_avg_heart_rate, \
     total_steps, total_calories, total_active_minutes, \
     sleep_duration_seconds, sleep_quality_score, computed_at FROM daily_aggregations";

fn column_error(index: usize, error: anyhow::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, error.into())
}

fn uuid_column(row: &Row<'_>, index: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(index)?;
    Uuid::parse_str(&raw).map_err(|error| column_error(index, error.into()))
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<ActivitySession> {
    let kind: String = row.get(2)?;

    Ok(ActivitySession {
        id: uuid_column(row, 0)?,
        user_id: row.get(1)?,
        kind: ActivityKind::parse(&kind).map_err(|error| column_error(2, error))?,
        start_time: row.get(3)?,
        end_time: row.get(4)?,
        timezone: row.get(5)?,
        step_count: row.get(6)?,
        calories_burned: row.get(7)?,
        average_heart_rate: row.get(8)?,
        min_heart_rate: row.get(9)?,
        max_heart_rate: row.get(10)?,
        exercise_type: row.get(11)?,
        exercise_title: row.get(12)?,
        data_source: row.get(13)?,
        external_record_id: row.get(14)?,
        ingested_at: row.get(15)?,
        processed: row.get(16)?,
        deleted: row.get(17)?,
    })
}

fn schedule_from_row(row: &Row<'_>) -> rusqlite::Result<WorkingSchedule> {
    let day: String = row.get(2)?;

    Ok(WorkingSchedule {
        id: uuid_column(row, 0)?,
        user_id: row.get(1)?,
        day_of_week: weekday_parse(&day).map_err(|error| column_error(2, error))?,
        start_time: row.get(3)?,
        end_time: row.get(4)?,
        timezone: row.get(5)?,
        active: row.get(6)?,
        effective_from: row.get(7)?,
        effective_to: row.get(8)?,
        deleted: row.get(9)?,
    })
}

fn override_from_row(row: &Row<'_>) -> rusqlite::Result<ScheduleOverride> {
    let kind: String = row.get(2)?;

    Ok(ScheduleOverride {
        id: uuid_column(row, 0)?,
        date: row.get(1)?,
        kind: OverrideKind::parse(&kind).map_err(|error| column_error(2, error))?,
        custom_start_time: row.get(3)?,
        custom_end_time: row.get(4)?,
        reason: row.get(5)?,
        deleted: row.get(6)?,
    })
}

fn segment_from_row(row: &Row<'_>) -> rusqlite::Result<ActivitySegment> {
    let kind: String = row.get(2)?;

    Ok(ActivitySegment {
        id: uuid_column(row, 0)?,
        session_id: uuid_column(row, 1)?,
        kind: SegmentKind::parse(&kind).map_err(|error| column_error(2, error))?,
        activity_date: row.get(3)?,
        start_time: row.get(4)?,
        end_time: row.get(5)?,
        duration_seconds: row.get(6)?,
        step_count: row.get(7)?,
        calories_burned: row.get(8)?,
        average_heart_rate: row.get(9)?,
        min_heart_rate: row.get(10)?,
        max_heart_rate: row.get(11)?,
        allocation_ratio: row.get(12)?,
        is_split: row.get(13)?,
        deleted: row.get(14)?,
    })
}

fn aggregation_from_row(row: &Row<'_>) -> rusqlite::Result<DailyAggregation> {
    let day_type: String = row.get(3)?;

    Ok(DailyAggregation {
        id: uuid_column(row, 0)?,
        user_id: row.get(1)?,
        date: row.get(2)?,
        day_type: DayType::parse(&day_type).map_err(|error| column_error(3, error))?,
        work_hours_steps: row.get(4)?,
        work_hours_calories: row.get(5)?,
        work_hours_active_minutes: row.get(6)?,
        work_hours_avg_heart_rate: row.get(7)?,
        off_hours_steps: row.get(8)?,
        off_hours_calories: row.get(9)?,
        off_hours_active_minutes: row.get(10)?,
        off_hours_avg_heart_rate: row.get(11)?,
        total_steps: row.get(12)?,
        total_calories: row.get(13)?,
        total_active_minutes: row.get(14)?,
        sleep_duration_seconds: row.get(15)?,
        sleep_quality_score: row.get(16)?,
        computed_at: row.get(17)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_session, temp_database};
    use chrono::{NaiveTime, TimeZone, Utc};

    #[test]
    fn session_round_trip_and_dedup_lookup() {
        let (_dir, database) = temp_database();
        let mut session = sample_session("user-1", "2026-03-02T09:00:00Z", "2026-03-02T10:00:00Z");
        session.external_record_id = Some("hc-record-1".to_string());

        database.insert_session(&session).unwrap();

        let loaded = database.session_by_id(session.id).unwrap().unwrap();
        assert_eq!(loaded.user_id, "user-1");
        assert_eq!(loaded.kind, ActivityKind::Steps);
        assert_eq!(loaded.start_time, session.start_time);
        assert!(!loaded.processed);

        let by_external = database
            .session_by_external_id("hc-record-1")
            .unwrap()
            .unwrap();
        assert_eq!(by_external.id, session.id);
        assert!(database.session_by_external_id("missing").unwrap().is_none());
    }

    #[test]
    fn save_segments_marks_session_processed_atomically() {
        let (_dir, mut database) = temp_database();
        let session = sample_session("user-1", "2026-03-02T09:00:00Z", "2026-03-02T10:00:00Z");
        database.insert_session(&session).unwrap();

        let segment = ActivitySegment {
            id: Uuid::new_v4(),
            session_id: session.id,
            kind: SegmentKind::WorkHours,
            activity_date: session.start_time.date_naive(),
            start_time: session.start_time,
            end_time: session.end_time,
            duration_seconds: 3600,
            step_count: Some(1000),
            calories_burned: None,
            average_heart_rate: None,
            min_heart_rate: None,
            max_heart_rate: None,
            allocation_ratio: 1.0,
            is_split: false,
            deleted: false,
        };

        database.save_segments(session.id, &[segment]).unwrap();

        let reloaded = database.session_by_id(session.id).unwrap().unwrap();
        assert!(reloaded.processed);
        assert_eq!(
            database
                .segments_for_date(session.start_time.date_naive())
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn save_segments_for_unknown_session_writes_nothing() {
        let (_dir, mut database) = temp_database();
        let session = sample_session("user-1", "2026-03-02T09:00:00Z", "2026-03-02T10:00:00Z");
        // Not inserted: the processed-flag update has nothing to hit.

        let segment = ActivitySegment {
            id: Uuid::new_v4(),
            session_id: session.id,
            kind: SegmentKind::OffHours,
            activity_date: session.start_time.date_naive(),
            start_time: session.start_time,
            end_time: session.end_time,
            duration_seconds: 3600,
            step_count: None,
            calories_burned: None,
            average_heart_rate: None,
            min_heart_rate: None,
            max_heart_rate: None,
            allocation_ratio: 1.0,
            is_split: false,
            deleted: false,
        };

        assert!(database.save_segments(session.id, &[segment]).is_err());
        assert!(
            database
                .segments_for_date(session.start_time.date_naive())
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn aggregation_upsert_keeps_single_row_and_identity() {
        let (_dir, database) = temp_database();
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();

        let first = DailyAggregation {
            id: Uuid::new_v4(),
            user_id: "user-1".to_string(),
            date,
            day_type: DayType::Workday,
            work_hours_steps: Some(4000),
            work_hours_calories: None,
            work_hours_active_minutes: Some(60),
            work_hours_avg_heart_rate: None,
            off_hours_steps: None,
            off_hours_calories: None,
            off_hours_active_minutes: None,
            off_hours_avg_heart_rate: None,
            total_steps: Some(4000),
            total_calories: None,
            total_active_minutes: Some(60),
            sleep_duration_seconds: None,
            sleep_quality_score: None,
            computed_at: Utc.with_ymd_and_hms(2026, 3, 3, 0, 0, 0).unwrap(),
        };
        database.upsert_aggregation(&first).unwrap();

        let second = DailyAggregation {
            id: Uuid::new_v4(),
            total_steps: Some(5200),
            ..first.clone()
        };
        database.upsert_aggregation(&second).unwrap();

        let rows = database.aggregations_between(date, date).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, first.id);
        assert_eq!(rows[0].total_steps, Some(5200));
    }

    #[test]
    fn override_date_is_unique() {
        let (_dir, database) = temp_database();
        let date = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();

        let holiday = ScheduleOverride {
            id: Uuid::new_v4(),
            date,
            kind: OverrideKind::Holiday,
            custom_start_time: None,
            custom_end_time: None,
            reason: Some("May Day".to_string()),
            deleted: false,
        };
        database.insert_override(&holiday).unwrap();

        let duplicate = ScheduleOverride {
            id: Uuid::new_v4(),
            kind: OverrideKind::Pto,
            ..holiday.clone()
        };
        assert!(database.insert_override(&duplicate).is_err());

        let loaded = database.override_for_date(date).unwrap().unwrap();
        assert_eq!(loaded.kind, OverrideKind::Holiday);
    }

    #[test]
    fn schedule_lookup_skips_deleted_rows() {
        let (_dir, database) = temp_database();

        let schedule = WorkingSchedule {
            id: Uuid::new_v4(),
            user_id: "user-1".to_string(),
            day_of_week: Weekday::Mon,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            timezone: "Asia/Seoul".to_string(),
            active: true,
            effective_from: None,
            effective_to: None,
            deleted: false,
        };
        database.insert_schedule(&schedule).unwrap();

        assert!(
            database
                .schedule_for_day("user-1", Weekday::Mon)
                .unwrap()
                .is_some()
        );

        assert!(database.soft_delete_schedule(schedule.id).unwrap());
        assert!(
            database
                .schedule_for_day("user-1", Weekday::Mon)
                .unwrap()
                .is_none()
        );
    }
}
