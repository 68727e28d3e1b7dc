use crate::db::Database;
use crate::engine::splitter;
use crate::model::{ActivityKind, ActivitySession};
use crate::store::{SegmentStore, SessionStore};
use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

/// One raw session as submitted by a device sync client.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestRequest {
    pub user_id: String,
    pub kind: ActivityKind,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub timezone: String,
    pub step_count: Option<i64>,
    pub calories_burned: Option<f64>,
    pub average_heart_rate: Option<i64>,
    pub min_heart_rate: Option<i64>,
    pub max_heart_rate: Option<i64>,
    pub exercise_type: Option<String>,
    pub exercise_title: Option<String>,
    pub data_source: Option<String>,
    pub external_record_id: Option<String>,
}

/// Outcome of a batch ingest. Failed requests are dropped, not retried.
#[derive(Debug, Default, Clone, Copy)]
pub struct BatchOutcome {
    pub ingested: usize,
    pub duplicates: usize,
    pub failed: usize,
}

/// Validate, dedup, and store one session, then segment it. Segmentation
/// failure leaves the session stored but unprocessed; a later reprocess
/// pass picks it up.
pub fn ingest_session(database: &mut Database, request: IngestRequest) -> Result<ActivitySession> {
    let (session, _duplicate) = ingest_one(database, request)?;
    Ok(session)
}

pub fn ingest_batch(database: &mut Database, requests: Vec<IngestRequest>) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();

    for request in requests {
        match ingest_one(database, request) {
            Ok((_, true)) => outcome.duplicates += 1,
            Ok((_, false)) => outcome.ingested += 1,
            Err(err) => {
                error!(error = %err, "batch item rejected");
                outcome.failed += 1;
            }
        }
    }

    info!(
        ingested = outcome.ingested,
        duplicates = outcome.duplicates,
        failed = outcome.failed,
        "batch ingest finished"
    );
    outcome
}

fn ingest_one(
    database: &mut Database,
    request: IngestRequest,
) -> Result<(ActivitySession, bool)> {
    validate(&request)?;

    // Device syncs resend records; the external record id dedups them.
    if let Some(external_id) = request.external_record_id.as_deref()
        && let Some(existing) = database.session_by_external_id(external_id)?
    {
        warn!(
            external_id,
            session = %existing.id,
            "duplicate device record; returning existing session"
        );
        return Ok((existing, true));
    }

    let session = ActivitySession {
        id: Uuid::new_v4(),
        user_id: request.user_id,
        kind: request.kind,
        start_time: request.start_time,
        end_time: request.end_time,
        timezone: request.timezone,
        step_count: request.step_count,
        calories_burned: request.calories_burned,
        average_heart_rate: request.average_heart_rate,
        min_heart_rate: request.min_heart_rate,
        max_heart_rate: request.max_heart_rate,
        exercise_type: request.exercise_type,
        exercise_title: request.exercise_title,
        data_source: request
            .data_source
            .unwrap_or_else(|| "Health Connect".to_string()),
        external_record_id: request.external_record_id,
        ingested_at: Utc::now(),
        processed: false,
        deleted: false,
    };

    database.insert_session(&session)?;
    info!(session = %session.id, user = session.user_id, "session ingested");

    if let Err(err) = process_session(database, &session) {
        error!(session = %session.id, error = %err, "segmentation deferred");
    }

    // Hand back the stored row so the caller sees the processed flag.
    match database.session_by_id(session.id)? {
        Some(stored) => Ok((stored, false)),
        None => Ok((session, false)),
    }
}

/// Split an unprocessed session into segments and persist them. A session
/// already marked processed is left alone.
pub fn process_session(database: &mut Database, session: &ActivitySession) -> Result<()> {
    if session.processed {
        info!(session = %session.id, "already processed; skipping");
        return Ok(());
    }

    let segments = splitter::split_session(database, session)?;
    database.save_segments(session.id, &segments)?;

    info!(session = %session.id, segments = segments.len(), "session segmented");
    Ok(())
}

/// Segment every stored session still waiting for processing, optionally
/// for one user. A failing session is logged and skipped; the count
/// covers successes only.
pub fn reprocess_unprocessed(database: &mut Database, user_id: Option<&str>) -> Result<usize> {
    let pending = database.unprocessed_sessions(user_id)?;
    info!(pending = pending.len(), "reprocessing unprocessed sessions");

    let mut processed = 0;
    for session in &pending {
        match process_session(database, session) {
            Ok(()) => processed += 1,
            Err(err) => {
                error!(session = %session.id, error = %err, "reprocess failed; skipping");
            }
        }
    }

    Ok(processed)
}

/// Soft-delete a session. Its segments stay on disk but drop out of every
/// aggregation on the next recompute.
pub fn delete_session(database: &Database, id: Uuid) -> Result<()> {
    if !database.soft_delete_session(id)? {
        bail!("Session not found: {id}");
    }

    info!(session = %id, "session soft-deleted");
    Ok(())
}

fn validate(request: &IngestRequest) -> Result<()> {
    if request.user_id.trim().is_empty() {
        bail!("User id must not be empty");
    }
    if request.end_time < request.start_time {
        bail!(
            "Session end {} precedes start {}",
            request.end_time,
            request.start_time
        );
    }
    if request.timezone.parse::<Tz>().is_err() {
        bail!("Invalid IANA timezone: {}", request.timezone);
    }

    Ok(())
}
