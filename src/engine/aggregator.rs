use crate::engine::resolver;
use crate::model::{
    ActivityKind, ActivitySegment, ActivitySession, DailyAggregation, SegmentKind,
};
use crate::store::{
    AggregationStore, OverrideStore, ScheduleStore, SegmentStore, SessionStore,
};
use anyhow::Result;
use chrono::{Duration, NaiveDate, Utc};
use std::collections::HashSet;
use std::ops::Add;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Metric totals for one work-hours or off-hours partition. Absent
/// fields mean the partition carried no data, not zero.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct PartitionTotals {
    steps: Option<i64>,
    calories: Option<f64>,
    active_minutes: Option<i64>,
    avg_heart_rate: Option<i64>,
}

/// Compute (or recompute) the daily aggregation for a user and date and
/// upsert it. Recomputation overwrites the existing row in place.
pub fn compute_daily_aggregation<S>(
    store: &S,
    user_id: &str,
    date: NaiveDate,
) -> Result<DailyAggregation>
where
    S: SessionStore + SegmentStore + ScheduleStore + OverrideStore + AggregationStore,
{
    info!(user = user_id, %date, "computing daily aggregation");

    let sessions = store.sessions_by_user(user_id)?;
    let owned_ids: HashSet<Uuid> = sessions
        .iter()
        .filter(|session| !session.deleted)
        .map(|session| session.id)
        .collect();

    let segments: Vec<ActivitySegment> = store
        .segments_for_date(date)?
        .into_iter()
        .filter(|segment| !segment.deleted && owned_ids.contains(&segment.session_id))
        .collect();
    debug!(user = user_id, %date, segments = segments.len(), "segments fetched");

    let work_totals = aggregate_partition(
        segments
            .iter()
            .filter(|segment| segment.kind == SegmentKind::WorkHours),
    );
    let off_totals = aggregate_partition(
        segments
            .iter()
            .filter(|segment| segment.kind == SegmentKind::OffHours),
    );

    let (sleep_duration_seconds, sleep_quality_score) = sleep_metrics(&sessions, date)?;
    let day_type = resolver::day_type_for(store, user_id, date)?;

    // Keep the existing row's identity so recomputation never duplicates.
    let id = store
        .aggregation_for(user_id, date)?
        .map_or_else(Uuid::new_v4, |existing| existing.id);

    let aggregation = DailyAggregation {
        id,
        user_id: user_id.to_string(),
        date,
        day_type,
        work_hours_steps: work_totals.steps,
        work_hours_calories: work_totals.calories,
        work_hours_active_minutes: work_totals.active_minutes,
        work_hours_avg_heart_rate: work_totals.avg_heart_rate,
        off_hours_steps: off_totals.steps,
        off_hours_calories: off_totals.calories,
        off_hours_active_minutes: off_totals.active_minutes,
        off_hours_avg_heart_rate: off_totals.avg_heart_rate,
        total_steps: add_opt(work_totals.steps, off_totals.steps),
        total_calories: add_opt(work_totals.calories, off_totals.calories),
        total_active_minutes: add_opt(work_totals.active_minutes, off_totals.active_minutes),
        sleep_duration_seconds,
        sleep_quality_score,
        computed_at: Utc::now(),
    };

    store.upsert_aggregation(&aggregation)?;

    info!(
        user = user_id,
        %date,
        steps = ?aggregation.total_steps,
        day_type = day_type.as_str(),
        "daily aggregation stored"
    );
    Ok(aggregation)
}

/// Recompute aggregations for every date in `[from, to]`. A failing date
/// is logged and skipped; the returned count covers successes only.
pub fn recompute_range<S>(store: &S, user_id: &str, from: NaiveDate, to: NaiveDate) -> Result<usize>
where
    S: SessionStore + SegmentStore + ScheduleStore + OverrideStore + AggregationStore,
{
    info!(user = user_id, %from, %to, "recomputing aggregation range");

    let mut recomputed = 0;
    let mut date = from;
    while date <= to {
        match compute_daily_aggregation(store, user_id, date) {
            Ok(_) => recomputed += 1,
            Err(err) => {
                error!(user = user_id, %date, error = %err, "failed to recompute aggregation");
            }
        }
        date += Duration::days(1);
    }

    info!(user = user_id, recomputed, "aggregation range recomputed");
    Ok(recomputed)
}

fn aggregate_partition<'a, I>(segments: I) -> PartitionTotals
where
    I: Iterator<Item = &'a ActivitySegment>,
{
    let mut totals = PartitionTotals::default();
    let mut heart_rate_sum = 0_i64;
    let mut heart_rate_count = 0_i64;

    for segment in segments {
        totals.steps = add_opt(totals.steps, segment.step_count);
        totals.calories = add_opt(totals.calories, segment.calories_burned);
        totals.active_minutes = add_opt(totals.active_minutes, Some(segment.duration_seconds));
        if let Some(rate) = segment.average_heart_rate {
            heart_rate_sum += rate;
            heart_rate_count += 1;
        }
    }

    // Each segment's average contributes equally, not duration-weighted.
    totals.avg_heart_rate = (heart_rate_count > 0).then(|| heart_rate_sum / heart_rate_count);
    totals.active_minutes = totals.active_minutes.map(|seconds| seconds / 60);
    totals
}

/// Total sleep duration and quality score for the night ending on `date`.
/// Sleep sessions are attributed to the date their end instant falls on,
/// in each session's own timezone.
fn sleep_metrics(
    sessions: &[ActivitySession],
    date: NaiveDate,
) -> Result<(Option<i64>, Option<f64>)> {
    let mut total_seconds = 0_i64;
    let mut matched = false;

    for session in sessions {
        if session.kind != ActivityKind::SleepSession || session.deleted {
            continue;
        }

        let zone = session.zone()?;
        if session.end_time.with_timezone(&zone).date_naive() != date {
            continue;
        }

        total_seconds += session.duration_seconds();
        matched = true;
    }

    if !matched {
        return Ok((None, None));
    }

    Ok((Some(total_seconds), Some(sleep_quality_score(total_seconds))))
}

/// Duration-based quality score: 7-9 hours scores 100, shorter sleep
/// scales down linearly, longer sleep loses 10 points per excess hour.
fn sleep_quality_score(sleep_seconds: i64) -> f64 {
    if sleep_seconds <= 0 {
        return 0.0;
    }

    let hours = sleep_seconds as f64 / 3600.0;
    if (7.0..=9.0).contains(&hours) {
        100.0
    } else if hours < 7.0 {
        ((hours / 7.0) * 100.0).max(0.0)
    } else {
        (100.0 - (hours - 9.0) * 10.0).max(0.0)
    }
}

/// Adds two optional values; one absent side yields the other, both
/// absent yields absent. Never collapses "no data" to zero.
fn add_opt<T: Add<Output = T>>(left: Option<T>, right: Option<T>) -> Option<T> {
    match (left, right) {
        (Some(a), Some(b)) => Some(a + b),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}
