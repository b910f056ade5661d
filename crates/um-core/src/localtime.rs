//! Local calendar arithmetic over an explicit time zone.
//!
//! Every projector that slices time at day boundaries goes through these
//! helpers so DST transitions are handled in exactly one place.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use chrono::offset::LocalResult;
use chrono_tz::Tz;

/// Minutes in a civil day.
pub const MINUTES_PER_DAY: u32 = 1440;

/// Converts a local date at midnight to UTC.
/// Handles DST ambiguity by picking the earlier time.
pub fn local_midnight_to_utc(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight) {
        // Single or ambiguous (DST fall-back): use the earlier time
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        LocalResult::None => {
            // DST spring-forward gap at midnight is rare but possible
            // Use 1am local which is guaranteed to exist
            let one_am = date.and_time(NaiveTime::from_hms_opt(1, 0, 0).unwrap_or(NaiveTime::MIN));
            tz.from_local_datetime(&one_am)
                .earliest()
                .map_or_else(|| Utc.from_utc_datetime(&midnight), |dt| dt.with_timezone(&Utc))
        }
    }
}

/// Half-open day boundaries `[start, end)` for a local date.
pub fn day_bounds(date: NaiveDate, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_midnight_to_utc(date, tz);
    let end = local_midnight_to_utc(date + chrono::Duration::days(1), tz);
    (start, end)
}

/// The local calendar date an instant falls on.
pub fn local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// Minute-of-day offset of an instant attributed to `date`, in `[0, 1440]`.
///
/// An instant landing exactly on the next local midnight reads as minute
/// 1440 of `date` rather than minute 0 of the following day, so a slice
/// ending at midnight closes out its own day.
pub fn minute_of_day(instant: DateTime<Utc>, date: NaiveDate, tz: Tz) -> u32 {
    let local = instant.with_timezone(&tz);
    if local.date_naive() > date {
        return MINUTES_PER_DAY;
    }
    local.hour() * 60 + local.minute()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn day_bounds_are_half_open_and_24h_in_utc() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let (start, end) = day_bounds(date, Tz::UTC);
        assert_eq!(start, utc(2025, 3, 10, 0, 0, 0));
        assert_eq!(end, utc(2025, 3, 11, 0, 0, 0));
    }

    #[test]
    fn local_midnight_respects_zone_offset() {
        // Tokyo is UTC+9 year-round.
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let start = local_midnight_to_utc(date, Tz::Asia__Tokyo);
        assert_eq!(start, utc(2025, 5, 31, 15, 0, 0));
    }

    #[test]
    fn dst_spring_forward_day_is_23h() {
        // US Eastern loses an hour on 2025-03-09.
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        let (start, end) = day_bounds(date, Tz::America__New_York);
        assert_eq!((end - start).num_hours(), 23);
    }

    #[test]
    fn local_date_crosses_utc_midnight() {
        // 23:30 UTC on Jun 1 is already Jun 2 in Tokyo.
        let instant = utc(2025, 6, 1, 23, 30, 0);
        assert_eq!(
            local_date(instant, Tz::Asia__Tokyo),
            NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
        );
    }

    #[test]
    fn minute_of_day_maps_midnight_end_to_1440() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let next_midnight = local_midnight_to_utc(date + chrono::Duration::days(1), Tz::UTC);
        assert_eq!(minute_of_day(next_midnight, date, Tz::UTC), 1440);

        let late = utc(2025, 6, 1, 23, 50, 30);
        assert_eq!(minute_of_day(late, date, Tz::UTC), 1430);
        let early = utc(2025, 6, 1, 0, 0, 59);
        assert_eq!(minute_of_day(early, date, Tz::UTC), 0);
    }
}
