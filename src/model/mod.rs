use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of raw activity recorded by the wearable device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityKind {
    Steps,
    HeartRate,
    ExerciseSession,
    SleepSession,
    CaloriesBurned,
}

impl ActivityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Steps => "STEPS",
            Self::HeartRate => "HEART_RATE",
            Self::ExerciseSession => "EXERCISE_SESSION",
            Self::SleepSession => "SLEEP_SESSION",
            Self::CaloriesBurned => "CALORIES_BURNED",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "STEPS" => Ok(Self::Steps),
            "HEART_RATE" => Ok(Self::HeartRate),
            "EXERCISE_SESSION" => Ok(Self::ExerciseSession),
            "SLEEP_SESSION" => Ok(Self::SleepSession),
            "CALORIES_BURNED" => Ok(Self::CaloriesBurned),
            other => Err(anyhow!("Unknown activity kind: {other}")),
        }
    }
}

/// Classification of a segment relative to the owner's work hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SegmentKind {
    WorkHours,
    OffHours,
}

impl SegmentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WorkHours => "WORK_HOURS",
            Self::OffHours => "OFF_HOURS",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "WORK_HOURS" => Ok(Self::WorkHours),
            "OFF_HOURS" => Ok(Self::OffHours),
            other => Err(anyhow!("Unknown segment kind: {other}")),
        }
    }
}

/// Kind of a calendar-date schedule override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverrideKind {
    Holiday,
    Pto,
    IrregularWork,
    Custom,
}

impl OverrideKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Holiday => "HOLIDAY",
            Self::Pto => "PTO",
            Self::IrregularWork => "IRREGULAR_WORK",
            Self::Custom => "CUSTOM",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "HOLIDAY" => Ok(Self::Holiday),
            "PTO" => Ok(Self::Pto),
            "IRREGULAR_WORK" => Ok(Self::IrregularWork),
            "CUSTOM" => Ok(Self::Custom),
            other => Err(anyhow!("Unknown override kind: {other}")),
        }
    }
}

/// Classification of a whole calendar day for analytics.
///
/// `SickDay` exists in the domain but no resolution path currently
/// produces it; it is reserved for manual/administrative tagging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayType {
    Workday,
    NonWorkday,
    Holiday,
    Pto,
    SickDay,
}

impl DayType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Workday => "WORKDAY",
            Self::NonWorkday => "NON_WORKDAY",
            Self::Holiday => "HOLIDAY",
            Self::Pto => "PTO",
            Self::SickDay => "SICK_DAY",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "WORKDAY" => Ok(Self::Workday),
            "NON_WORKDAY" => Ok(Self::NonWorkday),
            "HOLIDAY" => Ok(Self::Holiday),
            "PTO" => Ok(Self::Pto),
            "SICK_DAY" => Ok(Self::SickDay),
            other => Err(anyhow!("Unknown day type: {other}")),
        }
    }
}

/// A raw activity session as ingested from the device. Immutable once
/// processed, except for the `processed` flag itself and soft deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivitySession {
    pub id: Uuid,
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
    pub data_source: String,
    pub external_record_id: Option<String>,
    pub ingested_at: DateTime<Utc>,
    pub processed: bool,
    pub deleted: bool,
}

impl ActivitySession {
    pub fn duration_seconds(&self) -> i64 {
        (self.end_time - self.start_time).num_seconds()
    }

    pub fn zone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| anyhow!("Invalid IANA timezone: {}", self.timezone))
    }
}

/// Regular work hours for one day of the week.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingSchedule {
    pub id: Uuid,
    pub user_id: String,
    #[serde(with = "weekday_str")]
    pub day_of_week: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub timezone: String,
    pub active: bool,
    pub effective_from: Option<NaiveDate>,
    pub effective_to: Option<NaiveDate>,
    pub deleted: bool,
}

/// A single-date exception to the regular schedule. At most one override
/// exists per calendar date, across all users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleOverride {
    pub id: Uuid,
    pub date: NaiveDate,
    pub kind: OverrideKind,
    pub custom_start_time: Option<NaiveTime>,
    pub custom_end_time: Option<NaiveTime>,
    pub reason: Option<String>,
    pub deleted: bool,
}

/// One piece of a split session. Segments of a session are contiguous,
/// non-overlapping, and together cover the session's full time range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivitySegment {
    pub id: Uuid,
    pub session_id: Uuid,
    pub kind: SegmentKind,
    pub activity_date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: i64,
    pub step_count: Option<i64>,
    pub calories_burned: Option<f64>,
    pub average_heart_rate: Option<i64>,
    pub min_heart_rate: Option<i64>,
    pub max_heart_rate: Option<i64>,
    pub allocation_ratio: f64,
    pub is_split: bool,
    pub deleted: bool,
}

/// Pre-computed per-user, per-date summary. Absent metric fields mean
/// "no data for that day", which is distinct from zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyAggregation {
    pub id: Uuid,
    pub user_id: String,
    pub date: NaiveDate,
    pub day_type: DayType,
    pub work_hours_steps: Option<i64>,
    pub work_hours_calories: Option<f64>,
    pub work_hours_active_minutes: Option<i64>,
    pub work_hours_avg_heart_rate: Option<i64>,
    pub off_hours_steps: Option<i64>,
    pub off_hours_calories: Option<f64>,
    pub off_hours_active_minutes: Option<i64>,
    pub off_hours_avg_heart_rate: Option<i64>,
    pub total_steps: Option<i64>,
    pub total_calories: Option<f64>,
    pub total_active_minutes: Option<i64>,
    pub sleep_duration_seconds: Option<i64>,
    pub sleep_quality_score: Option<f64>,
    pub computed_at: DateTime<Utc>,
}

pub fn weekday_as_str(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MONDAY",
        Weekday::Tue => "TUESDAY",
        Weekday::Wed => "WEDNESDAY",
        Weekday::Thu => "THURSDAY",
        Weekday::Fri => "FRIDAY",
        Weekday::Sat => "SATURDAY",
        Weekday::Sun => "SUNDAY",
    }
}

pub fn weekday_parse(raw: &str) -> Result<Weekday> {
    match raw {
        "MONDAY" => Ok(Weekday::Mon),
        "TUESDAY" => Ok(Weekday::Tue),
        "WEDNESDAY" => Ok(Weekday::Wed),
        "THURSDAY" => Ok(Weekday::Thu),
        "FRIDAY" => Ok(Weekday::Fri),
        "SATURDAY" => Ok(Weekday::Sat),
        "SUNDAY" => Ok(Weekday::Sun),
        other => Err(anyhow!("Unknown day of week: {other}")),
    }
}

/// Serializes `chrono::Weekday` as the uppercase day name used on the wire
/// and in the database ("MONDAY", ...).
pub mod weekday_str {
    use chrono::Weekday;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(day: &Weekday, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(super::weekday_as_str(*day))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Weekday, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::weekday_parse(&raw).map_err(D::Error::custom)
    }
}
