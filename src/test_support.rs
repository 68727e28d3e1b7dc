//! Shared fixtures for the inline test modules.

use crate::db::Database;
use crate::model::{
    ActivityKind, ActivitySegment, ActivitySession, OverrideKind, ScheduleOverride, SegmentKind,
    WorkingSchedule,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use tempfile::TempDir;
use uuid::Uuid;

pub fn temp_database() -> (TempDir, Database) {
    let dir = tempfile::tempdir().expect("temp dir");
    let database = Database::open(&dir.path().join("worktime-test.db")).expect("open database");
    (dir, database)
}

/// A steps session in Asia/Seoul between two RFC 3339 instants.
pub fn sample_session(user_id: &str, start: &str, end: &str) -> ActivitySession {
    ActivitySession {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        kind: ActivityKind::Steps,
        start_time: parse_instant(start),
        end_time: parse_instant(end),
        timezone: "Asia/Seoul".to_string(),
        step_count: None,
        calories_burned: None,
        average_heart_rate: None,
        min_heart_rate: None,
        max_heart_rate: None,
        exercise_type: None,
        exercise_title: None,
        data_source: "Health Connect".to_string(),
        external_record_id: None,
        ingested_at: Utc::now(),
        processed: false,
        deleted: false,
    }
}

/// A bare half-hour segment of `session` on `date`; metric fields start
/// out absent so tests set only what they assert on.
pub fn sample_segment(
    session: &ActivitySession,
    kind: SegmentKind,
    date: NaiveDate,
) -> ActivitySegment {
    ActivitySegment {
        id: Uuid::new_v4(),
        session_id: session.id,
        kind,
        activity_date: date,
        start_time: session.start_time,
        end_time: session.start_time + chrono::Duration::seconds(1800),
        duration_seconds: 1800,
        step_count: None,
        calories_burned: None,
        average_heart_rate: None,
        min_heart_rate: None,
        max_heart_rate: None,
        allocation_ratio: 0.5,
        is_split: false,
        deleted: false,
    }
}

pub fn insert_schedule(
    database: &Database,
    user_id: &str,
    day: Weekday,
    start: (u32, u32),
    end: (u32, u32),
    active: bool,
) {
    let schedule = WorkingSchedule {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        day_of_week: day,
        start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).expect("start time"),
        end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).expect("end time"),
        timezone: "Asia/Seoul".to_string(),
        active,
        effective_from: None,
        effective_to: None,
        deleted: false,
    };

    database.insert_schedule(&schedule).expect("insert schedule");
}

pub fn insert_override(
    database: &Database,
    date: NaiveDate,
    kind: OverrideKind,
    custom: Option<(NaiveTime, NaiveTime)>,
) {
    let record = ScheduleOverride {
        id: Uuid::new_v4(),
        date,
        kind,
        custom_start_time: custom.map(|(start, _)| start),
        custom_end_time: custom.map(|(_, end)| end),
        reason: None,
        deleted: false,
    };

    database.insert_override(&record).expect("insert override");
}

fn parse_instant(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .expect("RFC 3339 instant")
        .with_timezone(&Utc)
}
