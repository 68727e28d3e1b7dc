use crate::model::{
    ActivitySegment, ActivitySession, DailyAggregation, ScheduleOverride, SegmentKind,
    WorkingSchedule,
};
use anyhow::Result;
use chrono::{NaiveDate, Weekday};
use uuid::Uuid;

/// Raw session storage. Sessions are never physically deleted here;
/// removal is a soft-delete flag set by the caller.
pub trait SessionStore {
    fn session_by_id(&self, id: Uuid) -> Result<Option<ActivitySession>>;
    fn sessions_by_user(&self, user_id: &str) -> Result<Vec<ActivitySession>>;
    /// Unprocessed, non-deleted sessions, optionally limited to one user.
    fn unprocessed_sessions(&self, user_id: Option<&str>) -> Result<Vec<ActivitySession>>;
    /// Existence lookup used for ingest deduplication.
    fn session_by_external_id(&self, external_id: &str) -> Result<Option<ActivitySession>>;
    fn insert_session(&self, session: &ActivitySession) -> Result<()>;
}

/// Regular working schedule lookup.
pub trait ScheduleStore {
    fn active_schedules(&self, user_id: &str) -> Result<Vec<WorkingSchedule>>;
    /// The schedule for a user and day of week, deleted rows excluded.
    /// Effective-from/to bounds are not consulted by this lookup.
    fn schedule_for_day(&self, user_id: &str, day: Weekday) -> Result<Option<WorkingSchedule>>;
}

/// Calendar-date override lookup. Overrides are keyed by date alone and
/// apply to every user.
pub trait OverrideStore {
    fn override_for_date(&self, date: NaiveDate) -> Result<Option<ScheduleOverride>>;
    fn overrides_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<ScheduleOverride>>;
}

/// Derived segment storage.
pub trait SegmentStore {
    fn segments_for_date(&self, date: NaiveDate) -> Result<Vec<ActivitySegment>>;
    fn segments_for_date_and_kind(
        &self,
        date: NaiveDate,
        kind: SegmentKind,
    ) -> Result<Vec<ActivitySegment>>;
    /// Durably writes the whole batch and flips the parent session's
    /// processed flag in the same transaction. On failure nothing is
    /// written and the session stays eligible for retry.
    fn save_segments(&mut self, session_id: Uuid, segments: &[ActivitySegment]) -> Result<()>;
}

/// Pre-computed daily aggregation storage, unique per (user, date).
pub trait AggregationStore {
    fn aggregation_for(&self, user_id: &str, date: NaiveDate) -> Result<Option<DailyAggregation>>;
    /// Insert-or-update keyed by (user, date); an existing row keeps its
    /// identity.
    fn upsert_aggregation(&self, aggregation: &DailyAggregation) -> Result<()>;
    /// Aggregations in a date range, newest first.
    fn aggregations_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyAggregation>>;
}
