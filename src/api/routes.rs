use crate::config::Config;
use crate::db::Database;
use crate::engine::aggregator;
use crate::ingest::{self, IngestRequest};
use crate::model::{
    ActivitySession, DailyAggregation, OverrideKind, ScheduleOverride, WorkingSchedule,
    weekday_str,
};
use crate::store::{AggregationStore, OverrideStore, ScheduleStore, SessionStore};
use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<Config>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/status", get(status))
        .route(
            "/api/v1/activity/sessions",
            get(session_list).post(session_ingest),
        )
        .route("/api/v1/activity/sessions/batch", post(session_ingest_batch))
        .route("/api/v1/activity/sessions/reprocess", post(session_reprocess))
        .route(
            "/api/v1/activity/sessions/:id",
            get(session_get).delete(session_delete),
        )
        .route(
            "/api/v1/schedules/working",
            get(schedule_list).post(schedule_create),
        )
        .route(
            "/api/v1/schedules/working/:id",
            axum::routing::put(schedule_update).delete(schedule_delete),
        )
        .route(
            "/api/v1/schedules/overrides",
            get(override_list).post(override_create),
        )
        .route("/api/v1/schedules/overrides/:id", delete(override_delete))
        .route("/api/v1/analytics/daily/:date", get(daily_get))
        .route("/api/v1/analytics/daily/:date/recompute", post(daily_recompute))
        .route(
            "/api/v1/analytics/daily/recompute-range",
            post(daily_recompute_range),
        )
        .route("/api/v1/analytics/range", get(analytics_range))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct UserQuery {
    user: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RangeQuery {
    user: Option<String>,
    from: String,
    to: String,
}

#[derive(Debug, Deserialize)]
struct RecomputeRangePayload {
    user: Option<String>,
    from: String,
    to: String,
}

#[derive(Debug, Deserialize)]
struct SchedulePayload {
    user_id: Option<String>,
    #[serde(with = "weekday_str")]
    day_of_week: Weekday,
    start_time: NaiveTime,
    end_time: NaiveTime,
    timezone: Option<String>,
    #[serde(default = "default_true")]
    active: bool,
    effective_from: Option<NaiveDate>,
    effective_to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct OverridePayload {
    date: NaiveDate,
    kind: OverrideKind,
    custom_start_time: Option<NaiveTime>,
    custom_end_time: Option<NaiveTime>,
    reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct StatusPayload {
    unprocessed_sessions: i64,
    latest_aggregation_date: Option<NaiveDate>,
    api_port: u16,
    default_user: String,
}

#[derive(Debug, Serialize)]
struct RangePayload {
    user: String,
    from: NaiveDate,
    to: NaiveDate,
    count: usize,
    aggregations: Vec<DailyAggregation>,
}

fn default_true() -> bool {
    true
}

async fn status(State(state): State<ApiState>) -> ApiResult<Json<StatusPayload>> {
    let database = open_database(&state)?;

    let payload = StatusPayload {
        unprocessed_sessions: database.unprocessed_count()?,
        latest_aggregation_date: database.latest_aggregation_date()?,
        api_port: state.config.api_port,
        default_user: state.config.default_user.clone(),
    };

    Ok(Json(payload))
}

async fn session_ingest(
    State(state): State<ApiState>,
    Json(payload): Json<IngestRequest>,
) -> ApiResult<(StatusCode, Json<ActivitySession>)> {
    let mut database = open_database(&state)?;
    let session = ingest::ingest_session(&mut database, payload)
        .map_err(|error| ApiError::BadRequest(error.to_string()))?;

    Ok((StatusCode::CREATED, Json(session)))
}

async fn session_ingest_batch(
    State(state): State<ApiState>,
    Json(payload): Json<Vec<IngestRequest>>,
) -> ApiResult<Json<Value>> {
    let mut database = open_database(&state)?;
    let outcome = ingest::ingest_batch(&mut database, payload);

    Ok(Json(json!({
        "ingested": outcome.ingested,
        "duplicates": outcome.duplicates,
        "failed": outcome.failed
    })))
}

async fn session_reprocess(
    State(state): State<ApiState>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<Value>> {
    let mut database = open_database(&state)?;
    let processed = ingest::reprocess_unprocessed(&mut database, query.user.as_deref())?;

    Ok(Json(json!({ "processed": processed })))
}

async fn session_list(
    State(state): State<ApiState>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<Vec<ActivitySession>>> {
    let database = open_database(&state)?;
    let user = resolve_user(&state, query.user);
    let sessions = database
        .sessions_by_user(&user)?
        .into_iter()
        .filter(|session| !session.deleted)
        .collect::<Vec<_>>();

    Ok(Json(sessions))
}

async fn session_get(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ActivitySession>> {
    let database = open_database(&state)?;
    let session = database
        .session_by_id(id)?
        .ok_or_else(|| ApiError::NotFound(format!("Session not found: {id}")))?;

    Ok(Json(session))
}

async fn session_delete(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let database = open_database(&state)?;
    ingest::delete_session(&database, id)
        .map_err(|error| ApiError::NotFound(error.to_string()))?;

    Ok(Json(json!({ "deleted": true })))
}

async fn schedule_list(
    State(state): State<ApiState>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<Vec<WorkingSchedule>>> {
    let database = open_database(&state)?;
    let user = resolve_user(&state, query.user);
    let schedules = database.active_schedules(&user)?;

    Ok(Json(schedules))
}

async fn schedule_create(
    State(state): State<ApiState>,
    Json(payload): Json<SchedulePayload>,
) -> ApiResult<(StatusCode, Json<WorkingSchedule>)> {
    validate_interval(payload.start_time, payload.end_time)?;

    let database = open_database(&state)?;
    let schedule = WorkingSchedule {
        id: Uuid::new_v4(),
        user_id: payload
            .user_id
            .unwrap_or_else(|| state.config.default_user.clone()),
        day_of_week: payload.day_of_week,
        start_time: payload.start_time,
        end_time: payload.end_time,
        timezone: payload
            .timezone
            .unwrap_or_else(|| state.config.default_timezone.clone()),
        active: payload.active,
        effective_from: payload.effective_from,
        effective_to: payload.effective_to,
        deleted: false,
    };
    database.insert_schedule(&schedule)?;

    Ok((StatusCode::CREATED, Json(schedule)))
}

async fn schedule_update(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SchedulePayload>,
) -> ApiResult<Json<WorkingSchedule>> {
    validate_interval(payload.start_time, payload.end_time)?;

    let database = open_database(&state)?;
    let existing = database
        .schedule_by_id(id)?
        .ok_or_else(|| ApiError::NotFound(format!("Schedule not found: {id}")))?;

    let schedule = WorkingSchedule {
        id,
        user_id: payload.user_id.unwrap_or(existing.user_id),
        day_of_week: payload.day_of_week,
        start_time: payload.start_time,
        end_time: payload.end_time,
        timezone: payload.timezone.unwrap_or(existing.timezone),
        active: payload.active,
        effective_from: payload.effective_from,
        effective_to: payload.effective_to,
        deleted: existing.deleted,
    };
    database.update_schedule(&schedule)?;

    Ok(Json(schedule))
}

async fn schedule_delete(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let database = open_database(&state)?;
    if !database.soft_delete_schedule(id)? {
        return Err(ApiError::NotFound(format!("Schedule not found: {id}")));
    }

    Ok(Json(json!({ "deleted": true })))
}

async fn override_list(
    State(state): State<ApiState>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<Vec<ScheduleOverride>>> {
    let database = open_database(&state)?;
    let from = parse_date(&query.from)?;
    let to = parse_date(&query.to)?;
    let overrides = database.overrides_between(from, to)?;

    Ok(Json(overrides))
}

async fn override_create(
    State(state): State<ApiState>,
    Json(payload): Json<OverridePayload>,
) -> ApiResult<(StatusCode, Json<ScheduleOverride>)> {
    if let (Some(start), Some(end)) = (payload.custom_start_time, payload.custom_end_time) {
        validate_interval(start, end)?;
    }

    let database = open_database(&state)?;
    if database.override_for_date(payload.date)?.is_some() {
        return Err(ApiError::BadRequest(format!(
            "An override already exists for {}",
            payload.date
        )));
    }

    let record = ScheduleOverride {
        id: Uuid::new_v4(),
        date: payload.date,
        kind: payload.kind,
        custom_start_time: payload.custom_start_time,
        custom_end_time: payload.custom_end_time,
        reason: payload.reason,
        deleted: false,
    };
    database.insert_override(&record)?;

    Ok((StatusCode::CREATED, Json(record)))
}

async fn override_delete(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let database = open_database(&state)?;
    if !database.soft_delete_override(id)? {
        return Err(ApiError::NotFound(format!("Override not found: {id}")));
    }

    Ok(Json(json!({ "deleted": true })))
}

async fn daily_get(
    State(state): State<ApiState>,
    Path(date): Path<String>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<DailyAggregation>> {
    let database = open_database(&state)?;
    let target = parse_date(&date)?;
    let user = resolve_user(&state, query.user);

    let aggregation = database
        .aggregation_for(&user, target)?
        .ok_or_else(|| ApiError::NotFound(format!("No aggregation for {user} on {target}")))?;

    Ok(Json(aggregation))
}

async fn daily_recompute(
    State(state): State<ApiState>,
    Path(date): Path<String>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<DailyAggregation>> {
    let database = open_database(&state)?;
    let target = parse_date(&date)?;
    let user = resolve_user(&state, query.user);

    let aggregation = aggregator::compute_daily_aggregation(&database, &user, target)?;
    Ok(Json(aggregation))
}

async fn daily_recompute_range(
    State(state): State<ApiState>,
    Json(payload): Json<RecomputeRangePayload>,
) -> ApiResult<Json<Value>> {
    let database = open_database(&state)?;
    let from = parse_date(&payload.from)?;
    let to = parse_date(&payload.to)?;
    if to < from {
        return Err(ApiError::BadRequest(format!(
            "Range end {to} precedes start {from}"
        )));
    }
    let user = resolve_user(&state, payload.user);

    let recomputed = aggregator::recompute_range(&database, &user, from, to)?;
    Ok(Json(json!({ "recomputed": recomputed })))
}

async fn analytics_range(
    State(state): State<ApiState>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<RangePayload>> {
    let database = open_database(&state)?;
    let from = parse_date(&query.from)?;
    let to = parse_date(&query.to)?;
    let user = resolve_user(&state, query.user);

    let aggregations = database
        .aggregations_between(from, to)?
        .into_iter()
        .filter(|aggregation| aggregation.user_id == user)
        .collect::<Vec<_>>();

    Ok(Json(RangePayload {
        user,
        from,
        to,
        count: aggregations.len(),
        aggregations,
    }))
}

fn open_database(state: &ApiState) -> Result<Database> {
    Database::open(&state.config.db_path)
}

fn resolve_user(state: &ApiState, user: Option<String>) -> String {
    user.unwrap_or_else(|| state.config.default_user.clone())
}

fn parse_date(input: &str) -> std::result::Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|_| {
        ApiError::BadRequest(format!("Invalid date format: {input}. Example: 2026-02-18"))
    })
}

fn validate_interval(start: NaiveTime, end: NaiveTime) -> std::result::Result<(), ApiError> {
    if end <= start {
        return Err(ApiError::BadRequest(format!(
            "Interval end {end} must come after start {start}"
        )));
    }
    Ok(())
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Internal(error) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": error.to_string() })),
            )
                .into_response(),
        }
    }
}
