use crate::engine::resolver::{self, WorkHoursBoundary};
use crate::engine::start_of_day;
use crate::model::{ActivitySegment, ActivitySession, SegmentKind};
use crate::store::{OverrideStore, ScheduleStore};
use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate};
use chrono_tz::Tz;
use tracing::{debug, info};
use uuid::Uuid;

/// Split a session into date-bucketed work-hours/off-hours segments.
///
/// The returned segments are chronological, non-overlapping, and cover
/// the session's full time range; their allocation ratios sum to 1.0
/// (0.0 for a zero-duration session). Persistence is the caller's job.
pub fn split_session<S>(store: &S, session: &ActivitySession) -> Result<Vec<ActivitySegment>>
where
    S: ScheduleStore + OverrideStore,
{
    info!(
        session = %session.id,
        user = session.user_id,
        kind = session.kind.as_str(),
        start = %session.start_time,
        end = %session.end_time,
        "splitting session"
    );

    let zone = session.zone()?;
    let session_start = session.start_time.with_timezone(&zone);
    let session_end = session.end_time.with_timezone(&zone);

    let end_date = session_end.date_naive();
    let mut current_date = session_start.date_naive();
    let mut window_start = session_start;
    let mut segments = Vec::new();

    while current_date <= end_date {
        let boundary = resolver::resolve(store, &session.user_id, current_date, zone)?;

        let window_end = if current_date == end_date {
            session_end
        } else {
            start_of_day(zone, next_day(current_date))?
        };

        split_day_window(
            session,
            window_start,
            window_end,
            boundary,
            current_date,
            &mut segments,
        );

        current_date = next_day(current_date);
        if current_date <= end_date {
            window_start = start_of_day(zone, current_date)?;
        }
    }

    info!(session = %session.id, segments = segments.len(), "session split");
    Ok(segments)
}

/// Classify one day's window against that day's work-hours boundary.
fn split_day_window(
    session: &ActivitySession,
    window_start: DateTime<Tz>,
    window_end: DateTime<Tz>,
    boundary: Option<WorkHoursBoundary>,
    date: NaiveDate,
    segments: &mut Vec<ActivitySegment>,
) {
    let Some(boundary) = boundary else {
        debug!(%date, "no work hours; whole window is off-hours");
        segments.push(make_segment(
            session,
            window_start,
            window_end,
            SegmentKind::OffHours,
            date,
            false,
        ));
        return;
    };

    let WorkHoursBoundary {
        start: work_start,
        end: work_end,
    } = boundary;
    debug!(%date, work_start = %work_start, work_end = %work_end, "work hours resolved");

    // Entirely before or at the boundary start, or at/after its end:
    // one untouched off-hours segment.
    if window_end <= work_start || window_start >= work_end {
        segments.push(make_segment(
            session,
            window_start,
            window_end,
            SegmentKind::OffHours,
            date,
            false,
        ));
    }
    // Entirely inside the boundary.
    else if window_start >= work_start && window_end <= work_end {
        segments.push(make_segment(
            session,
            window_start,
            window_end,
            SegmentKind::WorkHours,
            date,
            false,
        ));
    }
    // Spanning: up to three pieces, all flagged as split.
    else {
        if window_start < work_start {
            segments.push(make_segment(
                session,
                window_start,
                work_start,
                SegmentKind::OffHours,
                date,
                true,
            ));
        }

        let work_piece_start = window_start.max(work_start);
        let work_piece_end = window_end.min(work_end);
        segments.push(make_segment(
            session,
            work_piece_start,
            work_piece_end,
            SegmentKind::WorkHours,
            date,
            true,
        ));

        if window_end > work_end {
            segments.push(make_segment(
                session,
                work_end,
                window_end,
                SegmentKind::OffHours,
                date,
                true,
            ));
        }
    }
}

fn make_segment(
    session: &ActivitySession,
    start: DateTime<Tz>,
    end: DateTime<Tz>,
    kind: SegmentKind,
    date: NaiveDate,
    is_split: bool,
) -> ActivitySegment {
    let total_seconds = session.duration_seconds();
    let duration_seconds = (end - start).num_seconds();

    // A zero-duration session cannot allocate anything.
    let allocation_ratio = if total_seconds > 0 {
        duration_seconds as f64 / total_seconds as f64
    } else {
        0.0
    };

    debug!(
        kind = kind.as_str(),
        start = %start,
        end = %end,
        ratio = format!("{allocation_ratio:.3}"),
        is_split,
        "creating segment"
    );

    ActivitySegment {
        id: Uuid::new_v4(),
        session_id: session.id,
        kind,
        activity_date: date,
        start_time: start.with_timezone(&chrono::Utc),
        end_time: end.with_timezone(&chrono::Utc),
        duration_seconds,
        step_count: session
            .step_count
            .map(|value| (value as f64 * allocation_ratio).round() as i64),
        calories_burned: session
            .calories_burned
            .map(|value| value * allocation_ratio),
        // Heart-rate values are not additive over a sub-interval; they
        // are carried over unscaled.
        average_heart_rate: session.average_heart_rate,
        min_heart_rate: session.min_heart_rate,
        max_heart_rate: session.max_heart_rate,
        allocation_ratio,
        is_split,
        deleted: false,
    }
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date + Duration::days(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OverrideKind;
    use crate::test_support::{insert_override, insert_schedule, sample_session, temp_database};
    use chrono::Weekday;

    // All fixtures run in Asia/Seoul (UTC+9, no DST). 2026-03-02 is a
    // Monday; local 07:00 is 2026-03-01T22:00:00Z.

    #[test]
    fn no_schedule_day_yields_single_off_hours_segment() {
        let (_dir, database) = temp_database();
        // Local 07:00-19:00 on a Monday with no schedule configured.
        let session = sample_session("user-1", "2026-03-01T22:00:00Z", "2026-03-02T10:00:00Z");

        let segments = split_session(&database, &session).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].kind, SegmentKind::OffHours);
        assert!(!segments[0].is_split);
        assert!((segments[0].allocation_ratio - 1.0).abs() < 1e-9);
    }

    #[test]
    fn session_spanning_work_hours_splits_into_three() {
        let (_dir, database) = temp_database();
        insert_schedule(&database, "user-1", Weekday::Mon, (9, 0), (17, 0), true);

        // Local 07:00-19:00 on Monday.
        let mut session = sample_session("user-1", "2026-03-01T22:00:00Z", "2026-03-02T10:00:00Z");
        session.step_count = Some(12000);
        session.calories_burned = Some(600.0);
        session.average_heart_rate = Some(88);

        let segments = split_session(&database, &session).unwrap();
        assert_eq!(segments.len(), 3);

        assert_eq!(segments[0].kind, SegmentKind::OffHours);
        assert_eq!(segments[1].kind, SegmentKind::WorkHours);
        assert_eq!(segments[2].kind, SegmentKind::OffHours);
        assert!(segments.iter().all(|segment| segment.is_split));

        let ratios: Vec<f64> = segments
            .iter()
            .map(|segment| segment.allocation_ratio)
            .collect();
        assert!((ratios[0] - 2.0 / 12.0).abs() < 1e-9);
        assert!((ratios[1] - 8.0 / 12.0).abs() < 1e-9);
        assert!((ratios[2] - 2.0 / 12.0).abs() < 1e-9);
        assert!((ratios.iter().sum::<f64>() - 1.0).abs() < 1e-9);

        // Additive metrics conserved within rounding; averages copied.
        let step_sum: i64 = segments.iter().filter_map(|s| s.step_count).sum();
        assert!((step_sum - 12000).abs() <= segments.len() as i64);
        let calorie_sum: f64 = segments.iter().filter_map(|s| s.calories_burned).sum();
        assert!((calorie_sum - 600.0).abs() < 1e-9);
        assert!(
            segments
                .iter()
                .all(|segment| segment.average_heart_rate == Some(88))
        );
    }

    #[test]
    fn segments_partition_the_session_exactly() {
        let (_dir, database) = temp_database();
        insert_schedule(&database, "user-1", Weekday::Mon, (9, 0), (17, 30), true);
        insert_schedule(&database, "user-1", Weekday::Tue, (10, 0), (16, 0), true);

        // Sunday 23:10 local through Tuesday 11:45 local.
        let session = sample_session("user-1", "2026-03-01T14:10:00Z", "2026-03-03T02:45:00Z");
        let segments = split_session(&database, &session).unwrap();

        let total: i64 = segments.iter().map(|s| s.duration_seconds).sum();
        assert_eq!(total, session.duration_seconds());

        for pair in segments.windows(2) {
            assert_eq!(pair[0].end_time, pair[1].start_time);
        }
        assert_eq!(segments[0].start_time, session.start_time);
        assert_eq!(segments.last().unwrap().end_time, session.end_time);

        let ratio_sum: f64 = segments.iter().map(|s| s.allocation_ratio).sum();
        assert!((ratio_sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn window_touching_boundary_stays_off_hours_and_unsplit() {
        let (_dir, database) = temp_database();
        insert_schedule(&database, "user-1", Weekday::Mon, (9, 0), (17, 0), true);

        // Ends exactly at 09:00 local.
        let before = sample_session("user-1", "2026-03-01T22:00:00Z", "2026-03-02T00:00:00Z");
        let segments = split_session(&database, &before).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].kind, SegmentKind::OffHours);
        assert!(!segments[0].is_split);

        // Starts exactly at 17:00 local.
        let after = sample_session("user-1", "2026-03-02T08:00:00Z", "2026-03-02T10:00:00Z");
        let segments = split_session(&database, &after).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].kind, SegmentKind::OffHours);
        assert!(!segments[0].is_split);
    }

    #[test]
    fn window_inside_work_hours_is_one_work_segment() {
        let (_dir, database) = temp_database();
        insert_schedule(&database, "user-1", Weekday::Mon, (9, 0), (17, 0), true);

        // Local 10:00-12:00 on Monday.
        let session = sample_session("user-1", "2026-03-02T01:00:00Z", "2026-03-02T03:00:00Z");
        let segments = split_session(&database, &session).unwrap();

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].kind, SegmentKind::WorkHours);
        assert!(!segments[0].is_split);
        assert!((segments[0].allocation_ratio - 1.0).abs() < 1e-9);
    }

    #[test]
    fn multi_day_session_resolves_each_date_independently() {
        let (_dir, database) = temp_database();
        insert_schedule(&database, "user-1", Weekday::Tue, (0, 30), (5, 0), true);

        // Monday 22:00 local through Tuesday 06:00 local; Monday has no
        // schedule, Tuesday's night shift splits the second window.
        let session = sample_session("user-1", "2026-03-02T13:00:00Z", "2026-03-02T21:00:00Z");
        let segments = split_session(&database, &session).unwrap();

        let monday = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2026, 3, 3).unwrap();

        let monday_segments: Vec<_> = segments
            .iter()
            .filter(|s| s.activity_date == monday)
            .collect();
        let tuesday_segments: Vec<_> = segments
            .iter()
            .filter(|s| s.activity_date == tuesday)
            .collect();

        assert_eq!(monday_segments.len(), 1);
        assert_eq!(monday_segments[0].kind, SegmentKind::OffHours);
        assert!(!monday_segments[0].is_split);

        assert_eq!(tuesday_segments.len(), 3);
        assert_eq!(tuesday_segments[1].kind, SegmentKind::WorkHours);
        assert!(tuesday_segments.iter().all(|s| s.is_split));
    }

    #[test]
    fn holiday_override_forces_whole_day_off_hours() {
        let (_dir, database) = temp_database();
        insert_schedule(&database, "user-1", Weekday::Mon, (9, 0), (17, 0), true);
        insert_override(
            &database,
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            OverrideKind::Holiday,
            None,
        );

        // Local 07:00-19:00 on the overridden Monday.
        let session = sample_session("user-1", "2026-03-01T22:00:00Z", "2026-03-02T10:00:00Z");
        let segments = split_session(&database, &session).unwrap();
        assert!(
            segments
                .iter()
                .all(|segment| segment.kind == SegmentKind::OffHours)
        );
    }

    #[test]
    fn zero_duration_session_allocates_nothing() {
        let (_dir, database) = temp_database();
        let mut session = sample_session("user-1", "2026-03-02T01:00:00Z", "2026-03-02T01:00:00Z");
        session.step_count = Some(500);
        session.calories_burned = Some(20.0);

        let segments = split_session(&database, &session).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].duration_seconds, 0);
        assert_eq!(segments[0].allocation_ratio, 0.0);
        assert_eq!(segments[0].step_count, Some(0));
        assert_eq!(segments[0].calories_burned, Some(0.0));
    }
}
