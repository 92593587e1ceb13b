//! Wall-clock queries and TTL arithmetic in a fixed civil timezone
//!
//! Every boundary computation in the pipeline (cache expiry at a time of
//! day, flight-tracker hour buckets, the tide date window) goes through
//! [`TimeService`]. The service never consults the host's default timezone:
//! the current instant comes from a [`Clock`] in UTC and is converted with an
//! explicit `chrono-tz` zone, so DST rules are applied deterministically.
//!
//! # Example
//!
//! ```rust,ignore
//! use lagoon::time::TimeService;
//!
//! let time = TimeService::new("Europe/Rome")?;
//! let until_midnight = time.dynamic_ttl(24, 0, 0)?;
//! let until_next_slot = time.next_boundary_ttl(&[6, 12, 18, 24])?;
//! ```

use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
    Timelike, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};

/// Default cache boundaries for flight data: 06:00, 12:00, 18:00, midnight
pub const DEFAULT_BOUNDARIES: [u32; 4] = [6, 12, 18, 24];

/// Width of a flight-tracker hour bucket
pub const FLIGHT_BUCKET_HOURS: u32 = 6;

/// Source of the current instant
pub trait Clock: Send + Sync {
    /// Current instant in UTC
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock, for tests and replays
#[derive(Debug)]
pub struct FixedClock {
    instant: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self {
            instant: Mutex::new(instant),
        }
    }

    /// Move the clock to a new instant
    pub fn set(&self, instant: DateTime<Utc>) {
        if let Ok(mut guard) = self.instant.lock() {
            *guard = instant;
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.instant.lock() {
            *guard += by;
        }
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        match self.instant.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Broken-down wall-clock time in a civil timezone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CivilTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl CivilTime {
    fn from_local(dt: &DateTime<Tz>) -> Self {
        Self {
            year: dt.year(),
            month: dt.month(),
            day: dt.day(),
            hour: dt.hour(),
            minute: dt.minute(),
            second: dt.second(),
        }
    }

    /// Seconds elapsed since local midnight
    pub fn seconds_since_midnight(&self) -> u32 {
        self.hour * 3600 + self.minute * 60 + self.second
    }

    /// `YYYY-MM-DD`
    pub fn iso_date(&self) -> String {
        format!("{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Wall-clock service bound to one civil timezone
#[derive(Clone)]
pub struct TimeService {
    tz: Tz,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TimeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeService")
            .field("tz", &self.tz.name())
            .finish_non_exhaustive()
    }
}

impl TimeService {
    /// Create a service for a named IANA timezone using the system clock
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if the timezone name is unknown
    pub fn new(tz_name: &str) -> Result<Self> {
        Ok(Self::with_clock(parse_timezone(tz_name)?, Arc::new(SystemClock)))
    }

    /// Create a service with an explicit clock
    pub fn with_clock(tz: Tz, clock: Arc<dyn Clock>) -> Self {
        Self { tz, clock }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Current instant in the service timezone
    pub fn now_local(&self) -> DateTime<Tz> {
        self.clock.now_utc().with_timezone(&self.tz)
    }

    /// Current wall-clock time in the service timezone
    pub fn now(&self) -> CivilTime {
        self.now_in(self.tz)
    }

    /// Current wall-clock time in an arbitrary timezone
    pub fn now_in(&self, tz: Tz) -> CivilTime {
        CivilTime::from_local(&self.clock.now_utc().with_timezone(&tz))
    }

    /// Seconds until the next wall-clock occurrence of `hour:minute:second`
    ///
    /// If that time has already passed today the next day's occurrence is
    /// used. `hour == 24` (with zero minute and second) means the coming
    /// midnight. The result is never negative; it is 0 only when the target
    /// is exactly now.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for an out-of-range time of day
    pub fn dynamic_ttl(&self, hour: u32, minute: u32, second: u32) -> Result<u64> {
        validate_time_of_day(hour, minute, second)?;
        Ok(self.ttl_until(self.clock.now_utc(), hour, minute, second))
    }

    /// Seconds until the smallest boundary hour strictly after the current hour
    ///
    /// When no boundary lies ahead today, the earliest one tomorrow is used.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if `boundaries` is empty or contains an
    /// hour above 24
    pub fn next_boundary_ttl(&self, boundaries: &[u32]) -> Result<u64> {
        if boundaries.is_empty() {
            return Err(Error::validation("boundary list must not be empty"));
        }
        if let Some(bad) = boundaries.iter().find(|b| **b > 24) {
            return Err(Error::validation(format!("boundary hour {bad} is out of range")));
        }

        let now = self.clock.now_utc();
        let hour_now = now.with_timezone(&self.tz).hour();
        let target = next_boundary(hour_now, boundaries)
            .or_else(|| boundaries.iter().copied().min())
            .unwrap_or(24);

        Ok(self.ttl_until(now, target, 0, 0))
    }

    /// Today's and tomorrow's civil dates as `YYYY-MM-DD`
    pub fn today_and_tomorrow(&self) -> (String, String) {
        let today = self.now_local().date_naive();
        let tomorrow = today.succ_opt().unwrap_or(today);
        (iso(today), iso(tomorrow))
    }

    fn ttl_until(&self, now: DateTime<Utc>, hour: u32, minute: u32, second: u32) -> u64 {
        let today = now.with_timezone(&self.tz).date_naive();
        let (date, time) = if hour == 24 {
            (today.succ_opt().unwrap_or(today), midnight())
        } else {
            (
                today,
                NaiveTime::from_hms_opt(hour, minute, second).unwrap_or_else(midnight),
            )
        };

        let mut target = self.resolve(date.and_time(time));
        if target < now {
            let next_day = date.succ_opt().unwrap_or(date);
            target = self.resolve(next_day.and_time(time));
        }

        let millis = (target - now).num_milliseconds().max(0);
        (millis / 1000) as u64
    }

    /// Map a local wall-clock time to an instant, handling DST transitions
    ///
    /// Ambiguous times (clocks going back) take the earlier instant; times
    /// inside a spring-forward gap move forward by the gap.
    fn resolve(&self, local: NaiveDateTime) -> DateTime<Utc> {
        match self.tz.from_local_datetime(&local) {
            LocalResult::Single(dt) => dt.with_timezone(&Utc),
            LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
            LocalResult::None => {
                let shifted = local + Duration::hours(1);
                match self.tz.from_local_datetime(&shifted).earliest() {
                    Some(dt) => dt.with_timezone(&Utc),
                    None => Utc.from_utc_datetime(&local),
                }
            }
        }
    }
}

/// Smallest boundary strictly greater than `hour_now`
pub fn next_boundary(hour_now: u32, boundaries: &[u32]) -> Option<u32> {
    boundaries.iter().copied().filter(|b| *b > hour_now).min()
}

/// Flight-tracker hour parameter: the hour floored to its 6-hour bucket
pub fn flight_hour_bucket(hour: u32) -> u32 {
    (hour / FLIGHT_BUCKET_HOURS) * FLIGHT_BUCKET_HOURS
}

/// Parse an IANA timezone name
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| Error::validation(format!("unknown timezone '{name}'")))
}

pub(crate) fn validate_time_of_day(hour: u32, minute: u32, second: u32) -> Result<()> {
    let valid = match hour {
        0..=23 => minute < 60 && second < 60,
        24 => minute == 0 && second == 0,
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "invalid time of day {hour:02}:{minute:02}:{second:02}"
        )))
    }
}

fn midnight() -> NaiveTime {
    NaiveTime::from_hms_opt(0, 0, 0).unwrap_or_default()
}

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
