use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
    Timelike, Utc,
};
use chrono_tz::America::Toronto;
use chrono_tz::Tz;
use serde::Serialize;

/// Reference time zone for all period math. Wall-clock boundaries are
/// computed here and converted to UTC before any store query.
pub const REFERENCE_TZ: Tz = Toronto;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Period {
    #[serde(rename = "AM")]
    Am,
    #[serde(rename = "PM")]
    Pm,
}

impl Period {
    pub fn label(self) -> &'static str {
        match self {
            Period::Am => "AM",
            Period::Pm => "PM",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PeriodWindow {
    pub period: Period,
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// The AM/PM half-day containing `now`. AM is 00:00:00–11:59:59 local,
/// PM is 12:00:00–23:59:59 local, bounds inclusive.
pub fn current_period(now: DateTime<Utc>) -> PeriodWindow {
    let local = now.with_timezone(&REFERENCE_TZ);
    let date = local.date_naive();
    let period = if local.hour() < 12 { Period::Am } else { Period::Pm };

    let (start_time, end_time) = match period {
        Period::Am => (NaiveTime::MIN, wall_time(11, 59, 59)),
        Period::Pm => (wall_time(12, 0, 0), wall_time(23, 59, 59)),
    };

    PeriodWindow {
        period,
        date,
        start: local_to_utc(date.and_time(start_time)),
        end: local_to_utc(date.and_time(end_time)),
    }
}

/// The full local calendar day containing `now`, as a half-open UTC range.
pub fn day_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let local = now.with_timezone(&REFERENCE_TZ);
    let start = local_to_utc(local.date_naive().and_time(NaiveTime::MIN));
    (start, start + Duration::days(1))
}

pub fn today_local(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&REFERENCE_TZ).date_naive()
}

/// UTC instant of local midnight on the 1st of the month containing `now`.
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let local = now.with_timezone(&REFERENCE_TZ).date_naive();
    let first = NaiveDate::from_ymd_opt(local.year(), local.month(), 1).unwrap_or(local);
    local_to_utc(first.and_time(NaiveTime::MIN))
}

/// UTC range covering the inclusive local date span `[start, end]`.
pub fn date_range_window(start: NaiveDate, end: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        local_to_utc(start.and_time(NaiveTime::MIN)),
        local_to_utc(end.and_time(wall_time(23, 59, 59))),
    )
}

fn wall_time(h: u32, m: u32, s: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, s).expect("valid wall time literal")
}

fn local_to_utc(wall: NaiveDateTime) -> DateTime<Utc> {
    match REFERENCE_TZ.from_local_datetime(&wall) {
        LocalResult::Single(t) => t.with_timezone(&Utc),
        LocalResult::Ambiguous(earlier, _) => earlier.with_timezone(&Utc),
        // A wall time inside a spring-forward gap; resume on the far side.
        LocalResult::None => REFERENCE_TZ
            .from_local_datetime(&(wall + Duration::hours(1)))
            .earliest()
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&wall)),
    }
}
