//! Market calendar: session/holiday gating and next-open lookahead.
//!
//! A pure function of timestamp + schedule. Sessions may wrap midnight
//! (`start > end` means "from start today through end tomorrow"); a
//! timestamp in the early morning is also checked against the previous
//! calendar day's overnight session.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One trading session window. Bounds are inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Session {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// `start > end` means the session runs through midnight into the next day.
    pub fn wraps_midnight(&self) -> bool {
        self.start > self.end
    }

    /// Containment for the part of the session on its own calendar day.
    fn covers_same_day(&self, t: NaiveTime) -> bool {
        if self.wraps_midnight() {
            t >= self.start
        } else {
            t >= self.start && t <= self.end
        }
    }

    /// Containment for the after-midnight tail of an overnight session.
    fn covers_overnight_tail(&self, t: NaiveTime) -> bool {
        self.wraps_midnight() && t <= self.end
    }
}

/// Trading schedule for one market.
///
/// Resolution order for a date: full closure (absolute) → holiday/weekday
/// eligibility (overridden by an extra-workday entry or a special session) →
/// session windows (special sessions replace the defaults for that date) →
/// partial-closure exclusions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schedule {
    /// Default session windows, ordered by start time.
    pub sessions: Vec<Session>,
    /// ISO weekday numbers (Mon=1 .. Sun=7). Empty means every weekday.
    pub weekdays: BTreeSet<u8>,
    pub holidays: BTreeSet<NaiveDate>,
    /// Dates traded despite being a holiday or an excluded weekday.
    pub extra_workdays: BTreeSet<NaiveDate>,
    /// Per-date session lists that replace the defaults.
    pub special_sessions: BTreeMap<NaiveDate, Vec<Session>>,
    /// Dates with no trading at all, overriding everything else.
    pub full_closures: BTreeSet<NaiveDate>,
    /// Per-date windows excluded within an otherwise-open day.
    pub partial_closures: BTreeMap<NaiveDate, Vec<Session>>,
}

impl Schedule {
    /// Whether `date` can host any trading at all.
    fn day_openable(&self, date: NaiveDate) -> bool {
        if self.full_closures.contains(&date) {
            return false;
        }
        let overridden =
            self.extra_workdays.contains(&date) || self.special_sessions.contains_key(&date);
        if self.holidays.contains(&date) && !overridden {
            return false;
        }
        if !self.weekdays.is_empty() {
            let wd = date.weekday().number_from_monday() as u8;
            if !self.weekdays.contains(&wd) && !overridden {
                return false;
            }
        }
        true
    }

    fn sessions_for(&self, date: NaiveDate) -> &[Session] {
        match self.special_sessions.get(&date) {
            Some(special) => special,
            None => &self.sessions,
        }
    }

    fn in_partial_closure(&self, date: NaiveDate, t: NaiveTime) -> bool {
        self.partial_closures
            .get(&date)
            .map(|windows| windows.iter().any(|w| w.covers_same_day(t)))
            .unwrap_or(false)
    }
}

/// Whether the market is open at `ts` under `schedule`.
pub fn is_open(ts: NaiveDateTime, schedule: &Schedule) -> bool {
    let date = ts.date();
    let t = ts.time();

    if schedule.full_closures.contains(&date) {
        return false;
    }

    let covered_today = schedule.day_openable(date) && {
        let sessions = schedule.sessions_for(date);
        // An eligible day with no session windows trades around the clock.
        sessions.is_empty() || sessions.iter().any(|s| s.covers_same_day(t))
    };

    let covered_overnight = !covered_today && {
        let prev = date - Duration::days(1);
        schedule.day_openable(prev)
            && schedule
                .sessions_for(prev)
                .iter()
                .any(|s| s.covers_overnight_tail(t))
    };

    if !covered_today && !covered_overnight {
        return false;
    }
    !schedule.in_partial_closure(date, t)
}

/// Earliest open instant at or after `ts`, scanning at most `max_days`
/// calendar days ahead. Returns `ts` itself when already open, `None` when
/// the lookahead bound is exhausted.
pub fn next_open(ts: NaiveDateTime, schedule: &Schedule, max_days: u32) -> Option<NaiveDateTime> {
    if is_open(ts, schedule) {
        return Some(ts);
    }

    for offset in 0..=max_days as i64 {
        let day = ts.date() + Duration::days(offset);
        if !schedule.day_openable(day) {
            continue;
        }
        let mut starts: Vec<NaiveTime> = schedule.sessions_for(day).iter().map(|s| s.start).collect();
        starts.sort();
        if starts.is_empty() {
            let candidate = day.and_time(NaiveTime::MIN);
            if candidate > ts {
                return Some(candidate);
            }
            continue;
        }
        for start in starts {
            let candidate = day.and_time(start);
            if candidate > ts && !schedule.in_partial_closure(day, start) {
                return Some(candidate);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn d(y: i32, mo: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, mo, day).unwrap()
    }

    fn dt(y: i32, mo: u32, day: u32, h: u32, m: u32) -> NaiveDateTime {
        d(y, mo, day).and_hms_opt(h, m, 0).unwrap()
    }

    fn day_schedule() -> Schedule {
        Schedule {
            sessions: vec![
                Session::new(t(9, 0), t(11, 30)),
                Session::new(t(13, 30), t(15, 0)),
            ],
            weekdays: (1..=5).collect(),
            ..Schedule::default()
        }
    }

    #[test]
    fn open_within_session_closed_at_noon() {
        let schedule = day_schedule();
        // 2026-02-11 is a Wednesday.
        assert!(is_open(dt(2026, 2, 11, 9, 30), &schedule));
        assert!(!is_open(dt(2026, 2, 11, 12, 0), &schedule));
        // Saturday.
        assert!(!is_open(dt(2026, 2, 14, 9, 30), &schedule));
    }

    #[test]
    fn holiday_closes_the_day() {
        let mut schedule = day_schedule();
        schedule.holidays.insert(d(2026, 2, 12));
        assert!(!is_open(dt(2026, 2, 12, 9, 30), &schedule));
    }

    #[test]
    fn next_open_skips_holiday() {
        let mut schedule = Schedule {
            sessions: vec![Session::new(t(9, 0), t(11, 30))],
            weekdays: (1..=5).collect(),
            ..Schedule::default()
        };
        schedule.holidays.insert(d(2026, 2, 12));
        let nxt = next_open(dt(2026, 2, 11, 12, 0), &schedule, 14).unwrap();
        assert_eq!(nxt, dt(2026, 2, 13, 9, 0));
    }

    #[test]
    fn next_open_is_identity_when_open() {
        let schedule = day_schedule();
        let ts = dt(2026, 2, 11, 10, 0);
        assert_eq!(next_open(ts, &schedule, 14), Some(ts));
    }

    #[test]
    fn next_open_exhausts_lookahead() {
        let mut schedule = day_schedule();
        // Every day for two weeks is a holiday.
        for offset in 0..20 {
            schedule.holidays.insert(d(2026, 2, 11) + Duration::days(offset));
        }
        assert_eq!(next_open(dt(2026, 2, 11, 12, 0), &schedule, 14), None);
    }

    #[test]
    fn overnight_session_spans_midnight() {
        let schedule = Schedule {
            sessions: vec![Session::new(t(21, 0), t(2, 30))],
            weekdays: (1..=5).collect(),
            ..Schedule::default()
        };
        // Wednesday evening part.
        assert!(is_open(dt(2026, 2, 11, 22, 0), &schedule));
        // Thursday early morning belongs to Wednesday's session.
        assert!(is_open(dt(2026, 2, 12, 1, 0), &schedule));
        assert!(!is_open(dt(2026, 2, 12, 3, 0), &schedule));
    }

    #[test]
    fn overnight_tail_requires_previous_day_eligible() {
        let mut schedule = Schedule {
            sessions: vec![Session::new(t(21, 0), t(2, 30))],
            weekdays: (1..=5).collect(),
            ..Schedule::default()
        };
        schedule.holidays.insert(d(2026, 2, 11));
        // Wednesday was a holiday, so Thursday 01:00 has no session to belong to.
        assert!(!is_open(dt(2026, 2, 12, 1, 0), &schedule));
    }

    #[test]
    fn special_session_overrides_holiday() {
        let mut schedule = day_schedule();
        schedule.holidays.insert(d(2026, 2, 12));
        schedule
            .special_sessions
            .insert(d(2026, 2, 12), vec![Session::new(t(10, 0), t(11, 0))]);
        assert!(is_open(dt(2026, 2, 12, 10, 30), &schedule));
        // Outside the special window the default sessions do not apply.
        assert!(!is_open(dt(2026, 2, 12, 9, 30), &schedule));
    }

    #[test]
    fn extra_workday_overrides_weekday_mask() {
        let mut schedule = day_schedule();
        schedule.extra_workdays.insert(d(2026, 2, 14)); // Saturday
        assert!(is_open(dt(2026, 2, 14, 9, 30), &schedule));
    }

    #[test]
    fn partial_closure_excludes_sub_window() {
        let mut schedule = day_schedule();
        schedule
            .partial_closures
            .insert(d(2026, 2, 11), vec![Session::new(t(10, 0), t(10, 30))]);
        assert!(is_open(dt(2026, 2, 11, 9, 30), &schedule));
        assert!(!is_open(dt(2026, 2, 11, 10, 15), &schedule));
        assert!(is_open(dt(2026, 2, 11, 10, 31), &schedule));
    }

    #[test]
    fn full_closure_beats_everything() {
        let mut schedule = day_schedule();
        schedule.full_closures.insert(d(2026, 2, 11));
        schedule.extra_workdays.insert(d(2026, 2, 11));
        assert!(!is_open(dt(2026, 2, 11, 9, 30), &schedule));
    }

    #[test]
    fn next_open_skips_partially_closed_session_start() {
        let mut schedule = day_schedule();
        schedule
            .partial_closures
            .insert(d(2026, 2, 11), vec![Session::new(t(9, 0), t(9, 30))]);
        // 09:00 start sits inside the closure; the afternoon session is next.
        let nxt = next_open(dt(2026, 2, 11, 8, 0), &schedule, 14).unwrap();
        assert_eq!(nxt, dt(2026, 2, 11, 13, 30));
    }
}
