//! Visit counting on top of the session.
//!
//! Two session keys are managed here: `visits`, a string-encoded counter, and
//! `last_visit`, a string-encoded local timestamp written as
//! `YYYY-MM-DD HH:MM:SS.ffffff`. On read the 7-character fractional suffix is
//! dropped and the remainder parsed at whole-second precision.
//!
//! The counter advances whenever the time since `last_visit` is strictly
//! positive. Because the stored timestamp loses its fraction, that holds on
//! practically every request, not once per day.
// TODO: move to a one-day threshold once product confirms that is the intended rule.

use crate::session::SessionState;
use chrono::{Duration, Local, NaiveDateTime};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

pub const VISITS_KEY: &str = "visits";
pub const LAST_VISIT_KEY: &str = "last_visit";

const STORED_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
const PARSED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const STRIPPED_SUFFIX: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VisitState {
    pub visits: u32,
    pub last_visit: NaiveDateTime,
}

#[derive(Debug, Error)]
pub enum VisitError {
    #[error("malformed last_visit timestamp {value:?}: {source}")]
    MalformedTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

pub fn update_visits(session: &mut SessionState) -> Result<VisitState, VisitError> {
    update_visits_at(session, Local::now().naive_local())
}

/// Same as [`update_visits`] with an explicit clock reading.
pub fn update_visits_at(
    session: &mut SessionState,
    now: NaiveDateTime,
) -> Result<VisitState, VisitError> {
    let visits = session
        .get(VISITS_KEY)
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(1);

    let raw_last = session
        .get(LAST_VISIT_KEY)
        .map(str::to_owned)
        .unwrap_or_else(|| format_timestamp(now));
    let last_visit = parse_timestamp(&raw_last)?;

    let state = if now - last_visit > Duration::zero() {
        session.set(LAST_VISIT_KEY, format_timestamp(now));
        VisitState {
            visits: visits.saturating_add(1),
            last_visit: now,
        }
    } else {
        session.set(LAST_VISIT_KEY, raw_last);
        VisitState {
            visits: 1,
            last_visit,
        }
    };
    session.set(VISITS_KEY, state.visits.to_string());

    debug!("visit count now {}", state.visits);
    Ok(state)
}

pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(STORED_FORMAT).to_string()
}

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, VisitError> {
    let cut = raw
        .char_indices()
        .rev()
        .nth(STRIPPED_SUFFIX - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    NaiveDateTime::parse_from_str(&raw[..cut], PARSED_FORMAT).map_err(|source| {
        VisitError::MalformedTimestamp {
            value: raw.to_string(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32, micro: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_micro_opt(h, m, s, micro)
            .unwrap()
    }

    #[test]
    fn first_visit_counts_two() {
        let mut session = SessionState::new();
        let now = at(10, 0, 0, 250_000);

        let state = update_visits_at(&mut session, now).unwrap();

        assert_eq!(state.visits, 2);
        assert_eq!(state.last_visit, now);
        assert_eq!(session.get(VISITS_KEY), Some("2"));
        assert_eq!(session.get(LAST_VISIT_KEY), Some("2024-03-09 10:00:00.250000"));
    }

    #[test]
    fn every_later_request_increments() {
        let mut session = SessionState::new();

        let first = update_visits_at(&mut session, at(10, 0, 0, 250_000)).unwrap();
        let second = update_visits_at(&mut session, at(10, 0, 0, 250_001)).unwrap();
        let third = update_visits_at(&mut session, at(10, 0, 0, 900_000)).unwrap();

        assert_eq!(first.visits, 2);
        assert_eq!(second.visits, first.visits + 1);
        assert_eq!(third.visits, first.visits + 2);
        assert_eq!(session.get(VISITS_KEY), Some("4"));
        assert_eq!(session.get(LAST_VISIT_KEY), Some("2024-03-09 10:00:00.900000"));
    }

    #[test]
    fn rapid_requests_with_real_clock_increment() {
        let mut session = SessionState::new();
        let first = update_visits(&mut session).unwrap();
        let second = update_visits(&mut session).unwrap();
        let third = update_visits(&mut session).unwrap();
        assert_eq!(second.visits, first.visits + 1);
        assert_eq!(third.visits, first.visits + 2);
    }

    #[test]
    fn increments_from_stored_count() {
        let mut session = SessionState::new();
        session.set(VISITS_KEY, "7");
        session.set(LAST_VISIT_KEY, "2024-03-08 09:00:00.000000");

        let state = update_visits_at(&mut session, at(9, 0, 0, 0)).unwrap();

        assert_eq!(state.visits, 8);
        assert_eq!(session.get(LAST_VISIT_KEY), Some("2024-03-09 09:00:00.000000"));
    }

    #[test]
    fn same_whole_second_resets_count() {
        let mut session = SessionState::new();
        session.set(VISITS_KEY, "7");
        session.set(LAST_VISIT_KEY, "2024-03-09 09:00:00.900000");

        let state = update_visits_at(&mut session, at(9, 0, 0, 0)).unwrap();

        assert_eq!(state.visits, 1);
        assert_eq!(state.last_visit, at(9, 0, 0, 0));
        assert_eq!(session.get(VISITS_KEY), Some("1"));
        assert_eq!(session.get(LAST_VISIT_KEY), Some("2024-03-09 09:00:00.900000"));
    }

    #[test]
    fn last_visit_in_the_future_resets_count() {
        let mut session = SessionState::new();
        session.set(VISITS_KEY, "4");
        session.set(LAST_VISIT_KEY, "2024-03-10 00:00:00.000000");

        let state = update_visits_at(&mut session, at(12, 0, 0, 0)).unwrap();

        assert_eq!(state.visits, 1);
        assert_eq!(session.get(LAST_VISIT_KEY), Some("2024-03-10 00:00:00.000000"));
    }

    #[test]
    fn garbage_counter_falls_back_to_default() {
        let mut session = SessionState::new();
        session.set(VISITS_KEY, "many");
        session.set(LAST_VISIT_KEY, "2024-03-08 09:00:00.000000");

        let state = update_visits_at(&mut session, at(9, 0, 0, 0)).unwrap();

        assert_eq!(state.visits, 2);
    }

    #[test]
    fn malformed_timestamp_is_an_error() {
        let mut session = SessionState::new();
        session.set(LAST_VISIT_KEY, "yesterday");

        let err = update_visits_at(&mut session, at(9, 0, 0, 0)).unwrap_err();

        assert!(matches!(err, VisitError::MalformedTimestamp { .. }));
    }

    #[test]
    fn timestamp_without_fraction_loses_seconds_and_fails() {
        // The suffix is always stripped, so a value missing it is cut into the seconds field.
        let mut session = SessionState::new();
        session.set(LAST_VISIT_KEY, "2024-03-08 09:00:00");

        assert!(update_visits_at(&mut session, at(9, 0, 0, 0)).is_err());
    }
}
