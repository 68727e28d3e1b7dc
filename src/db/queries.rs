pub const CREATE_ACTIVITY_SESSIONS: &str = r#"
CREATE TABLE IF NOT EXISTS activity_sessions (
  id                 TEXT PRIMARY KEY,
  user_id            TEXT NOT NULL,
  kind               TEXT NOT NULL,
  start_time         TEXT NOT NULL,
  end_time           TEXT NOT NULL,
  timezone           TEXT NOT NULL,
  step_count         INTEGER,
  calories_burned    REAL,
  average_heart_rate INTEGER,
  min_heart_rate     INTEGER,
  max_heart_rate     INTEGER,
  exercise_type      TEXT,
  exercise_title     TEXT,
  data_source        TEXT NOT NULL,
  external_record_id TEXT UNIQUE,
  ingested_at        TEXT NOT NULL,
  processed          INTEGER NOT NULL DEFAULT 0,
  deleted            INTEGER NOT NULL DEFAULT 0
);
"#;

pub const CREATE_WORKING_SCHEDULES: &str = r#"
CREATE TABLE IF NOT EXISTS working_schedules (
  id             TEXT PRIMARY KEY,
  user_id        TEXT NOT NULL,
  day_of_week    TEXT NOT NULL,
  start_time     TEXT NOT NULL,
  end_time       TEXT NOT NULL,
  timezone       TEXT NOT NULL,
  active         INTEGER NOT NULL DEFAULT 1,
  effective_from TEXT,
  effective_to   TEXT,
  deleted        INTEGER NOT NULL DEFAULT 0
);
"#;

pub const CREATE_SCHEDULE_OVERRIDES: &str = r#"
CREATE TABLE IF NOT EXISTS schedule_overrides (
  id                TEXT PRIMARY KEY,
  date              TEXT NOT NULL UNIQUE,
  kind              TEXT NOT NULL,
  custom_start_time TEXT,
  custom_end_time   TEXT,
  reason            TEXT,
  deleted           INTEGER NOT NULL DEFAULT 0
);
"#;

pub const CREATE_ACTIVITY_SEGMENTS: &str = r#"
CREATE TABLE IF NOT EXISTS activity_segments (
  id                 TEXT PRIMARY KEY,
  session_id         TEXT NOT NULL REFERENCES activity_sessions(id),
  kind               TEXT NOT NULL,
  activity_date      TEXT NOT NULL,
  start_time         TEXT NOT NULL,
  end_time           TEXT NOT NULL,
  duration_seconds   INTEGER NOT NULL,
  step_count         INTEGER,
  calories_burned    REAL,
  average_heart_rate INTEGER,
  min_heart_rate     INTEGER,
  max_heart_rate     INTEGER,
  allocation_ratio   REAL NOT NULL,
  is_split           INTEGER NOT NULL DEFAULT 0,
  deleted            INTEGER NOT NULL DEFAULT 0
);
"#;

pub const CREATE_DAILY_AGGREGATIONS: &str = r#"
CREATE TABLE IF NOT EXISTS daily_aggregations (
  id                       TEXT PRIMARY KEY,
  user_id                  TEXT NOT NULL,
  date                     TEXT NOT NULL,
  day_type                 TEXT NOT NULL,
  work_hours_steps         INTEGER,
  work_hours_calories      REAL,
  work_hours_active_minutes INTEGER,
  work_hours_avg_heart_rate INTEGER,
  off_hours_steps          INTEGER,
  off_hours_calories       REAL,
  off_hours_active_minutes INTEGER,
  off_hours_avg_heart_rate INTEGER,
  total_steps              INTEGER,
  total_calories           REAL,
  total_active_minutes     INTEGER,
  sleep_duration_seconds   INTEGER,
  sleep_quality_score      REAL,
  computed_at              TEXT NOT NULL,
  UNIQUE (user_id, date)
);
"#;

pub const INDEX_SESSIONS_USER: &str =
    "CREATE INDEX IF NOT EXISTS idx_sessions_user ON activity_sessions(user_id);";

pub const INDEX_SESSIONS_PROCESSED: &str =
    "CREATE INDEX IF NOT EXISTS idx_sessions_processed ON activity_sessions(processed);";

pub const INDEX_SCHEDULES_USER_DAY: &str =
    "CREATE INDEX IF NOT EXISTS idx_schedules_user_day ON working_schedules(user_id, day_of_week);";

pub const INDEX_SEGMENTS_DATE: &str =
    "CREATE INDEX IF NOT EXISTS idx_segments_date ON activity_segments(activity_date);";

pub const INDEX_SEGMENTS_SESSION: &str =
    "CREATE INDEX IF NOT EXISTS idx_segments_session ON activity_segments(session_id);";

pub const INDEX_AGGREGATIONS_DATE: &str =
    "CREATE INDEX IF NOT EXISTS idx_aggregations_date ON daily_aggregations(date);";

pub fn schema_statements() -> Vec<&'static str> {
    vec![
        CREATE_ACTIVITY_SESSIONS,
        CREATE_WORKING_SCHEDULES,
        CREATE_SCHEDULE_OVERRIDES,
        CREATE_ACTIVITY_SEGMENTS,
        CREATE_DAILY_AGGREGATIONS,
        INDEX_SESSIONS_USER,
        INDEX_SESSIONS_PROCESSED,
        INDEX_SCHEDULES_USER_DAY,
        INDEX_SEGMENTS_DATE,
        INDEX_SEGMENTS_SESSION,
        INDEX_AGGREGATIONS_DATE,
    ]
}
