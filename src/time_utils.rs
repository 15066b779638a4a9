// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and wall-clock arithmetic.
//!
//! Users see a local wall clock expressed as a fixed offset from UTC in
//! minutes. All stored timestamps stay in UTC.

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, NaiveTime, Offset, Utc};

/// Westernmost wall-clock offset accepted from users (UTC-12:00).
pub const MIN_UTC_OFFSET_MINUTES: i32 = -720;
/// Easternmost wall-clock offset accepted from users (UTC+14:00).
pub const MAX_UTC_OFFSET_MINUTES: i32 = 840;

/// Minutes since local midnight.
pub fn minutes_of_day(time: NaiveTime) -> u32 {
    use chrono::Timelike;
    time.hour() * 60 + time.minute()
}

/// Inclusive window check on minute resolution.
///
/// `start <= end` is a same-day window; `start > end` wraps midnight.
pub fn is_within_window(now: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    let (now, start, end) = (minutes_of_day(now), minutes_of_day(start), minutes_of_day(end));
    if start <= end {
        now >= start && now <= end
    } else {
        now >= start || now <= end
    }
}

/// The wall-clock offset for a user. Offsets outside
/// [`MIN_UTC_OFFSET_MINUTES`]..=[`MAX_UTC_OFFSET_MINUTES`] fall back to UTC,
/// so both conversion directions always agree.
fn offset(utc_offset_minutes: i32) -> FixedOffset {
    Some(utc_offset_minutes)
        .filter(|m| (MIN_UTC_OFFSET_MINUTES..=MAX_UTC_OFFSET_MINUTES).contains(m))
        .and_then(|m| m.checked_mul(60))
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix())
}

/// Local wall-clock date and time for `now`.
pub fn local_datetime(now: DateTime<Utc>, utc_offset_minutes: i32) -> NaiveDateTime {
    now.with_timezone(&offset(utc_offset_minutes)).naive_local()
}

fn local_to_utc(local: NaiveDateTime, utc_offset_minutes: i32) -> DateTime<Utc> {
    let shift = Duration::seconds(i64::from(offset(utc_offset_minutes).local_minus_utc()));
    DateTime::from_naive_utc_and_offset(local - shift, Utc)
}

/// Start of the local calendar day containing `now`, as UTC.
pub fn local_midnight(now: DateTime<Utc>, utc_offset_minutes: i32) -> DateTime<Utc> {
    let local = local_datetime(now, utc_offset_minutes);
    local_to_utc(local.date().and_time(NaiveTime::MIN), utc_offset_minutes)
}

/// Next time the local wall clock reads `at`: today if still ahead of
/// `now`, otherwise tomorrow.
pub fn next_occurrence(now: DateTime<Utc>, utc_offset_minutes: i32, at: NaiveTime) -> DateTime<Utc> {
    let local = local_datetime(now, utc_offset_minutes);
    let today = local.date().and_time(at);
    let target = if today > local {
        today
    } else {
        today + Duration::days(1)
    };
    local_to_utc(target, utc_offset_minutes)
}

/// `at` on the local calendar day after `now`.
pub fn next_day_at(now: DateTime<Utc>, utc_offset_minutes: i32, at: NaiveTime) -> DateTime<Utc> {
    let local = local_datetime(now, utc_offset_minutes);
    let target = (local.date() + Duration::days(1)).and_time(at);
    local_to_utc(target, utc_offset_minutes)
}

/// Serde adapter for `"HH:MM"` wall-clock times. Seconds are accepted on
/// input and dropped on output.
pub mod hh_mm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn parse(raw: &str) -> Result<NaiveTime, chrono::ParseError> {
        NaiveTime::parse_from_str(raw, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::NaiveTime;
        use serde::{Deserialize, Deserializer};

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveTime>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| super::parse(&raw).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
