//! Property tests for TTL arithmetic and departure-time parsing

use std::sync::Arc;

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::{Europe::Rome, UTC};
use lagoon::time::{FixedClock, TimeService, DEFAULT_BOUNDARIES};
use lagoon::utils::time_to_seconds;
use proptest::prelude::*;

// 2024-01-01 .. 2030-01-01
const FROM: i64 = 1_704_067_200;
const TO: i64 = 1_893_456_000;

fn service_at(tz: chrono_tz::Tz, secs: i64) -> (TimeService, DateTime<Utc>) {
    let now = DateTime::from_timestamp(secs, 0).unwrap();
    (TimeService::with_clock(tz, Arc::new(FixedClock::new(now))), now)
}

proptest! {
    #[test]
    fn dynamic_ttl_is_within_a_day(secs in FROM..TO, h in 0u32..24, m in 0u32..60, s in 0u32..60) {
        let (time, _) = service_at(UTC, secs);
        let ttl = time.dynamic_ttl(h, m, s).unwrap();
        prop_assert!(ttl < 86_400);
    }

    #[test]
    fn dynamic_ttl_lands_on_the_target(secs in FROM..TO, h in 0u32..24, m in 0u32..60, s in 0u32..60) {
        let (time, now) = service_at(UTC, secs);
        let ttl = time.dynamic_ttl(h, m, s).unwrap();

        let expiry = now + chrono::Duration::seconds(ttl as i64);
        prop_assert_eq!((expiry.hour(), expiry.minute(), expiry.second()), (h, m, s));
    }

    #[test]
    fn dynamic_ttl_in_venice_is_bounded(secs in FROM..TO, h in 0u32..24, m in 0u32..60) {
        // Real seconds, so a fall-back day can exceed 86400 by up to an hour
        let (time, _) = service_at(Rome, secs);
        let ttl = time.dynamic_ttl(h, m, 0).unwrap();
        prop_assert!(ttl <= 90_000);
    }

    #[test]
    fn midnight_ttl_never_exceeds_a_day(secs in FROM..TO) {
        let (time, _) = service_at(UTC, secs);
        let ttl = time.dynamic_ttl(24, 0, 0).unwrap();
        prop_assert!(ttl > 0 && ttl <= 86_400);
    }

    #[test]
    fn boundary_ttl_is_at_most_six_hours(secs in FROM..TO) {
        let (time, _) = service_at(UTC, secs);
        let ttl = time.next_boundary_ttl(&DEFAULT_BOUNDARIES).unwrap();
        prop_assert!(ttl > 0 && ttl <= 6 * 3600);
    }

    #[test]
    fn out_of_range_times_are_rejected(h in 25u32..100, m in 0u32..60) {
        let (time, _) = service_at(UTC, FROM);
        prop_assert!(time.dynamic_ttl(h, m, 0).is_err());
    }

    #[test]
    fn departure_times_wrap_into_a_day(h in 0u32..48, m in 0u32..60, s in 0u32..60) {
        let text = format!("{h:02}:{m:02}:{s:02}");
        let secs = time_to_seconds(&text).unwrap();
        prop_assert!(secs < 86_400);
        prop_assert_eq!(secs, (h * 3600 + m * 60 + s) % 86_400);
    }

    #[test]
    fn garbage_departure_times_are_rejected(text in "[A-Za-z ]{0,12}") {
        prop_assert_eq!(time_to_seconds(&text), None);
    }
}
