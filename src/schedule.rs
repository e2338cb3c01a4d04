use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Days, Local, LocalResult, NaiveTime, TimeZone, Timelike};
use log::info;

use crate::error::{AlarmError, Result};

/// Identifies an alarm slot. Arming an occupied slot replaces its entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AlarmKey(pub u32);

impl fmt::Display for AlarmKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmEntry {
    pub key: AlarmKey,
    pub fire_at: DateTime<Local>,
}

/// Parse "HH:MM" (24h) into a time of day at second 0
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|_| AlarmError::InvalidTime(s.into()))
}

/// Format as "hh:mm AM"
pub fn format_12h<T: Timelike>(t: &T) -> String {
    let (pm, hour) = t.hour12();
    format!("{:02}:{:02} {}", hour, t.minute(), if pm { "PM" } else { "AM" })
}

/// Next instant `time` is reached on the wall clock.
///
/// Today's occurrence is used while it is still strictly in the future;
/// otherwise the same wall-clock time on the following calendar day. A
/// wall-clock time repeated by a clock change resolves to its first
/// occurrence that is still ahead of `now`.
pub fn next_fire_instant<Tz: TimeZone>(time: NaiveTime, now: &DateTime<Tz>) -> Result<DateTime<Tz>> {
    let time = time.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(time);
    let today = now.date_naive().and_time(time);

    if today > now.naive_local() {
        return match now.timezone().from_local_datetime(&today) {
            LocalResult::Single(at) => Ok(at),
            LocalResult::Ambiguous(first, second) => Ok(if first > *now { first } else { second }),
            LocalResult::None => Err(AlarmError::NonexistentLocalTime(today)),
        };
    }

    let tomorrow = today
        .checked_add_days(Days::new(1))
        .ok_or(AlarmError::NonexistentLocalTime(today))?;
    now.timezone()
        .from_local_datetime(&tomorrow)
        .earliest()
        .ok_or(AlarmError::NonexistentLocalTime(tomorrow))
}

/// In-process stand-in for the OS alarm service.
///
/// Nothing here survives a restart; the event loop polls `take_due` on every tick.
#[derive(Debug, Default)]
pub struct AlarmRegistry {
    entries: HashMap<AlarmKey, DateTime<Local>>,
}

impl AlarmRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry this one replaced, if any
    pub fn arm(&mut self, key: AlarmKey, fire_at: DateTime<Local>) -> Option<AlarmEntry> {
        info!("arming alarm {} for {}", key, fire_at.format("%Y-%m-%d %H:%M:%S"));
        self.entries
            .insert(key, fire_at)
            .map(|previous| AlarmEntry {
                key,
                fire_at: previous,
            })
    }

    /// Roll `time` to its next occurrence after `now` and arm it
    pub fn arm_at_time_of_day(
        &mut self,
        key: AlarmKey,
        time: NaiveTime,
        now: &DateTime<Local>,
    ) -> Result<AlarmEntry> {
        let fire_at = next_fire_instant(time, now)?;
        self.arm(key, fire_at);
        Ok(AlarmEntry { key, fire_at })
    }

    pub fn cancel(&mut self, key: AlarmKey) -> Option<AlarmEntry> {
        let removed = self.entries.remove(&key).map(|fire_at| AlarmEntry { key, fire_at });
        if removed.is_some() {
            info!("cancelled alarm {}", key);
        }
        removed
    }

    pub fn pending(&self, key: AlarmKey) -> Option<AlarmEntry> {
        self.entries
            .get(&key)
            .map(|fire_at| AlarmEntry { key, fire_at: *fire_at })
    }

    pub fn next_pending(&self) -> Option<AlarmEntry> {
        self.entries
            .iter()
            .min_by_key(|(_, fire_at)| **fire_at)
            .map(|(key, fire_at)| AlarmEntry {
                key: *key,
                fire_at: *fire_at,
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove and return every entry due at `now`, earliest first
    pub fn take_due(&mut self, now: &DateTime<Local>) -> Vec<AlarmEntry> {
        let due_keys: Vec<AlarmKey> = self
            .entries
            .iter()
            .filter(|(_, fire_at)| **fire_at <= *now)
            .map(|(key, _)| *key)
            .collect();

        let mut due: Vec<AlarmEntry> = due_keys
            .into_iter()
            .filter_map(|key| self.entries.remove(&key).map(|fire_at| AlarmEntry { key, fire_at }))
            .collect();
        due.sort_by_key(|e| e.fire_at);

        for entry in &due {
            info!("alarm {} fired", entry.key);
        }
        due
    }
}

/// Human readable "in 7h 05m" style countdown
pub fn format_countdown(remaining: chrono::Duration) -> String {
    let secs = remaining.num_seconds().max(0);
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    match (h, m) {
        (0, 0) => format!("{}s", s),
        (0, _) => format!("{}m {:02}s", m, s),
        _ => format!("{}h {:02}m", h, m),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{Duration, FixedOffset, NaiveDate, NaiveDateTime, Utc};

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn future_time_fires_today() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 6, 0, 0).unwrap();
        let fire = next_fire_instant(at(7, 30), &now).unwrap();
        assert_eq!(fire, Utc.with_ymd_and_hms(2024, 3, 10, 7, 30, 0).unwrap());
    }

    #[test]
    fn past_time_rolls_exactly_one_day() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap();
        let fire = next_fire_instant(at(7, 30), &now).unwrap();
        assert_eq!(fire, Utc.with_ymd_and_hms(2024, 3, 11, 7, 30, 0).unwrap());
        assert_eq!(fire - now, Duration::hours(23) + Duration::minutes(30));
    }

    #[test]
    fn current_minute_never_fires_immediately() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 7, 30, 0).unwrap();
        let fire = next_fire_instant(at(7, 30), &now).unwrap();
        assert_eq!(fire - now, Duration::days(1));

        let now = Utc.with_ymd_and_hms(2024, 3, 10, 7, 30, 42).unwrap();
        let fire = next_fire_instant(at(7, 30), &now).unwrap();
        assert!(fire > now);
        assert_eq!(fire, Utc.with_ymd_and_hms(2024, 3, 11, 7, 30, 0).unwrap());
    }

    #[test]
    fn rollover_crosses_month_end() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2024, 2, 29, 23, 0, 0).unwrap();
        let fire = next_fire_instant(at(6, 0), &now).unwrap();
        assert_eq!(fire, tz.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap());
    }

    /// US Eastern for 2024 only: EDT from 03-10 07:00 UTC to 11-03 06:00 UTC
    #[derive(Debug, Clone, Copy)]
    struct Eastern2024;

    impl Eastern2024 {
        fn edt() -> FixedOffset {
            FixedOffset::west_opt(4 * 3600).unwrap()
        }

        fn est() -> FixedOffset {
            FixedOffset::west_opt(5 * 3600).unwrap()
        }

        fn is_dst(utc: &NaiveDateTime) -> bool {
            let start = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap().and_hms_opt(7, 0, 0).unwrap();
            let end = NaiveDate::from_ymd_opt(2024, 11, 3).unwrap().and_hms_opt(6, 0, 0).unwrap();
            *utc >= start && *utc < end
        }
    }

    impl TimeZone for Eastern2024 {
        type Offset = FixedOffset;

        fn from_offset(_offset: &FixedOffset) -> Self {
            Eastern2024
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
            self.offset_from_local_datetime(&local.and_time(NaiveTime::MIN))
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            let as_utc = |off: FixedOffset| *local - Duration::seconds(off.local_minus_utc() as i64);
            let edt = Self::is_dst(&as_utc(Self::edt()));
            let est = !Self::is_dst(&as_utc(Self::est()));
            match (edt, est) {
                (true, true) => LocalResult::Ambiguous(Self::edt(), Self::est()),
                (true, false) => LocalResult::Single(Self::edt()),
                (false, true) => LocalResult::Single(Self::est()),
                (false, false) => LocalResult::None,
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            self.offset_from_utc_datetime(&utc.and_time(NaiveTime::MIN))
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
            if Self::is_dst(utc) {
                Self::edt()
            } else {
                Self::est()
            }
        }
    }

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d).unwrap().and_hms_opt(h, mi, 0).unwrap()
    }

    #[test]
    fn rollover_onto_repeated_hour_takes_first_occurrence() {
        let now = Eastern2024.with_ymd_and_hms(2024, 11, 2, 9, 0, 0).unwrap();
        let fire = next_fire_instant(at(1, 30), &now).unwrap();

        assert_eq!(fire.naive_local(), local(2024, 11, 3, 1, 30));
        assert_eq!(fire.offset().local_minus_utc(), -4 * 3600);
        assert_eq!(fire.naive_utc(), local(2024, 11, 3, 5, 30));
    }

    #[test]
    fn repeated_hour_in_progress_uses_second_occurrence() {
        // 01:10 EST, the first 01:30 (EDT) already went by
        let now = Utc
            .with_ymd_and_hms(2024, 11, 3, 6, 10, 0)
            .unwrap()
            .with_timezone(&Eastern2024);
        assert_eq!(now.naive_local(), local(2024, 11, 3, 1, 10));

        let fire = next_fire_instant(at(1, 30), &now).unwrap();
        assert!(fire > now);
        assert_eq!(fire.naive_utc(), local(2024, 11, 3, 6, 30));
    }

    #[test]
    fn rollover_into_skipped_hour_reports_tomorrow() {
        let now = Eastern2024.with_ymd_and_hms(2024, 3, 9, 9, 0, 0).unwrap();
        assert_matches!(
            next_fire_instant(at(2, 30), &now),
            Err(AlarmError::NonexistentLocalTime(t)) if t == local(2024, 3, 10, 2, 30)
        );
    }

    #[test]
    fn skipped_hour_today_is_an_error() {
        let now = Eastern2024.with_ymd_and_hms(2024, 3, 10, 1, 0, 0).unwrap();
        assert_matches!(
            next_fire_instant(at(2, 30), &now),
            Err(AlarmError::NonexistentLocalTime(t)) if t == local(2024, 3, 10, 2, 30)
        );

        // already past the gap: tomorrow exists again
        let now = Eastern2024.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap();
        let fire = next_fire_instant(at(2, 30), &now).unwrap();
        assert_eq!(fire.naive_local(), local(2024, 3, 11, 2, 30));
    }

    #[test]
    fn parses_and_formats_times() {
        assert_eq!(parse_time_of_day("07:05").unwrap(), at(7, 5));
        assert_eq!(parse_time_of_day(" 23:59 ").unwrap(), at(23, 59));
        assert_matches!(parse_time_of_day("25:00"), Err(AlarmError::InvalidTime(_)));
        assert_matches!(parse_time_of_day("7am"), Err(AlarmError::InvalidTime(_)));

        assert_eq!(format_12h(&at(7, 5)), "07:05 AM");
        assert_eq!(format_12h(&at(0, 0)), "12:00 AM");
        assert_eq!(format_12h(&at(13, 45)), "01:45 PM");
    }

    #[test]
    fn rearming_same_key_replaces() {
        let mut registry = AlarmRegistry::new();
        let now = Local::now();
        let key = AlarmKey::default();

        assert_eq!(registry.arm(key, now + Duration::hours(1)), None);
        let replaced = registry.arm(key, now + Duration::hours(2));
        assert_eq!(
            replaced,
            Some(AlarmEntry {
                key,
                fire_at: now + Duration::hours(1)
            })
        );
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.pending(key).unwrap().fire_at, now + Duration::hours(2));
    }

    #[test]
    fn distinct_keys_coexist() {
        let mut registry = AlarmRegistry::new();
        let now = Local::now();
        registry.arm(AlarmKey(0), now + Duration::hours(3));
        registry.arm(AlarmKey(1), now + Duration::hours(1));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.next_pending().unwrap().key, AlarmKey(1));
    }

    #[test]
    fn take_due_removes_only_due_entries() {
        let mut registry = AlarmRegistry::new();
        let now = Local::now();
        registry.arm(AlarmKey(0), now - Duration::seconds(5));
        registry.arm(AlarmKey(1), now - Duration::seconds(30));
        registry.arm(AlarmKey(2), now + Duration::minutes(10));

        let due = registry.take_due(&now);
        let keys: Vec<AlarmKey> = due.iter().map(|e| e.key).collect();
        assert_eq!(keys, vec![AlarmKey(1), AlarmKey(0)]);
        assert_eq!(registry.len(), 1);
        assert!(registry.take_due(&now).is_empty());
    }

    #[test]
    fn cancel_clears_entry() {
        let mut registry = AlarmRegistry::new();
        let now = Local::now();
        registry.arm(AlarmKey(0), now + Duration::minutes(1));
        assert!(registry.cancel(AlarmKey(0)).is_some());
        assert!(registry.cancel(AlarmKey(0)).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn countdown_formatting() {
        assert_eq!(format_countdown(Duration::seconds(9)), "9s");
        assert_eq!(format_countdown(Duration::seconds(125)), "2m 05s");
        assert_eq!(format_countdown(Duration::minutes(425)), "7h 05m");
        assert_eq!(format_countdown(Duration::seconds(-3)), "0s");
    }
}
