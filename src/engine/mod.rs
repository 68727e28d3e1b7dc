pub mod aggregator;
pub mod resolver;
pub mod splitter;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;

/// Resolve a wall-clock time on a calendar date to an instant in `zone`.
///
/// Ambiguous local times (DST fall-back) take the earlier instant. Local
/// times skipped by a DST spring-forward are pushed past the gap.
pub fn localize_on(zone: Tz, date: NaiveDate, time: NaiveTime) -> Result<DateTime<Tz>> {
    let naive = date.and_time(time);

    match zone.from_local_datetime(&naive) {
        LocalResult::Single(instant) => Ok(instant),
        LocalResult::Ambiguous(earlier, _) => Ok(earlier),
        LocalResult::None => zone
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .with_context(|| format!("Failed to localize {naive} in {zone}")),
    }
}

/// The instant a calendar date begins in `zone`.
pub fn start_of_day(zone: Tz, date: NaiveDate) -> Result<DateTime<Tz>> {
    localize_on(zone, date, NaiveTime::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn localizes_plain_local_time() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let time = NaiveTime::from_hms_opt(9, 0, 0).unwrap();

        let instant = localize_on(chrono_tz::Asia::Seoul, date, time).unwrap();
        assert_eq!(instant.to_rfc3339(), "2026-03-02T09:00:00+09:00");
    }

    #[test]
    fn spring_forward_gap_is_pushed_past_the_gap() {
        // US DST starts 2026-03-08 02:00 local; 02:30 does not exist.
        let date = NaiveDate::from_ymd_opt(2026, 3, 8).unwrap();
        let time = NaiveTime::from_hms_opt(2, 30, 0).unwrap();

        let instant = localize_on(chrono_tz::America::New_York, date, time).unwrap();
        assert_eq!(instant.to_rfc3339(), "2026-03-08T03:30:00-04:00");
    }
}
