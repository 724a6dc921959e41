//! Membersync Dates — the calendar-rule engine.
//!
//! Pure functions parameterized by an injected "now"; no I/O and no system
//! clock access. All rules are evaluated in a fixed reference timezone
//! (Europe/Paris in the production deployment): "year", "Feb 1",
//! "Wednesday", and "18:00" mean the reference zone's calendar, not the
//! zone `now` happens to be expressed in.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;

/// Weekly-digest deadline: Wednesday at this wall-clock hour, so the
/// digest lands before Thursday morning.
const DIGEST_DEADLINE_HOUR: u32 = 18;

/// Calendar rules evaluated in one fixed reference timezone.
#[derive(Debug, Clone, Copy)]
pub struct CalendarPolicy {
    tz: Tz,
}

impl Default for CalendarPolicy {
    fn default() -> Self {
        Self::new(chrono_tz::Europe::Paris)
    }
}

impl CalendarPolicy {
    /// Creates a policy evaluating all rules in `tz`.
    #[must_use]
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// The cutoff before which a membership is considered lapsed.
    ///
    /// A membership registered in calendar year Y is valid through
    /// Dec 31 Y, with a renewal grace period until Feb 1 of Y+1: before
    /// Feb 1 the previous year's cohort still counts as current.
    #[must_use]
    pub fn validity_threshold(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let year = now.with_timezone(&self.tz).year();
        if now >= self.first_of_month(year, 2) {
            self.first_of_month(year, 1)
        } else {
            self.first_of_month(year - 1, 1)
        }
    }

    /// The cutoff before which raw registration data must be deleted for
    /// retention compliance: Jan 1 of last year, i.e. one full year after
    /// the membership year ended.
    #[must_use]
    pub fn prune_threshold(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let year = now.with_timezone(&self.tz).year();
        self.first_of_month(year - 1, 1)
    }

    /// Whether the annual prune is due. Edge-triggered: fires exactly once
    /// per year, on the first run whose `now` crosses the Feb 1 boundary,
    /// regardless of how much earlier `last_run` was before it.
    #[must_use]
    pub fn needs_annual_prune(&self, now: DateTime<Utc>, last_run: DateTime<Utc>) -> bool {
        let feb_first = self.first_of_month(now.with_timezone(&self.tz).year(), 2);
        now >= feb_first && last_run < feb_first
    }

    /// Whether the weekly digest is due. Edge-triggered per week,
    /// mirroring the annual rule: the deadline is Wednesday 18:00 in the
    /// reference zone, and a `last_run` that is itself a Wednesday before
    /// 18:00 still owes that same day's deadline.
    #[must_use]
    pub fn needs_weekly_digest(&self, now: DateTime<Utc>, last_run: DateTime<Utc>) -> bool {
        let local = last_run.with_timezone(&self.tz);
        let deadline_time = NaiveTime::from_hms_opt(DIGEST_DEADLINE_HOUR, 0, 0)
            .expect("18:00:00 is a valid wall-clock time");

        let deadline_date = if local.weekday() == Weekday::Wed && local.time() < deadline_time {
            local.date_naive()
        } else {
            // Next Wednesday strictly after `last_run`.
            let days_ahead = (Weekday::Wed.num_days_from_monday() + 7
                - local.weekday().num_days_from_monday())
                % 7;
            let days_ahead = if days_ahead == 0 { 7 } else { days_ahead };
            local.date_naive() + Duration::days(i64::from(days_ahead))
        };

        now >= self.at_local(deadline_date, deadline_time)
    }

    /// Start of the fetch window for a run: `last_run` minus a one-hour
    /// overlap. The source exhibits read-after-write lag of up to tens of
    /// seconds; the downstream upsert is idempotent, so re-processing the
    /// overlap is safe.
    #[must_use]
    pub fn safe_lookback_start(&self, last_run: DateTime<Utc>) -> DateTime<Utc> {
        last_run - Duration::hours(1)
    }

    /// Midnight on the first of `month` in the reference zone, as UTC.
    fn first_of_month(&self, year: i32, month: u32) -> DateTime<Utc> {
        let date =
            NaiveDate::from_ymd_opt(year, month, 1).expect("the first of a month always exists");
        self.at_local(date, NaiveTime::MIN)
    }

    /// Resolves a wall-clock instant in the reference zone to UTC. A DST
    /// gap falls back to reading the wall time as UTC; Paris gaps are at
    /// 02:00, which none of the rule boundaries touch.
    fn at_local(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        let naive = date.and_time(time);
        naive
            .and_local_timezone(self.tz)
            .earliest()
            .map_or_else(|| naive.and_utc(), |dt| dt.with_timezone(&Utc))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use chrono_tz::Europe::Paris;

    use super::CalendarPolicy;

    fn paris(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Paris
            .with_ymd_and_hms(y, mo, d, h, mi, s)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_validity_threshold_on_february_first_is_this_january() {
        // Arrange
        let policy = CalendarPolicy::default();
        let now = paris(2019, 2, 1, 0, 0, 0);

        // Act
        let threshold = policy.validity_threshold(now);

        // Assert
        assert_eq!(threshold, paris(2019, 1, 1, 0, 0, 0));
    }

    #[test]
    fn test_validity_threshold_just_before_february_is_last_january() {
        // Arrange
        let policy = CalendarPolicy::default();
        let now = paris(2019, 1, 31, 23, 23, 59);

        // Act
        let threshold = policy.validity_threshold(now);

        // Assert
        assert_eq!(threshold, paris(2018, 1, 1, 0, 0, 0));
    }

    #[test]
    fn test_prune_threshold_is_january_first_of_last_year() {
        // Arrange
        let policy = CalendarPolicy::default();
        let now = paris(2019, 9, 15, 10, 30, 0);

        // Act
        let threshold = policy.prune_threshold(now);

        // Assert
        assert_eq!(threshold, paris(2018, 1, 1, 0, 0, 0));
    }

    #[test]
    fn test_annual_prune_fires_when_now_crosses_february_first() {
        // Arrange
        let policy = CalendarPolicy::default();
        let now = Utc.with_ymd_and_hms(2019, 2, 2, 0, 0, 0).unwrap();
        let last_run = Utc.with_ymd_and_hms(2019, 1, 31, 0, 0, 0).unwrap();

        // Act & Assert
        assert!(policy.needs_annual_prune(now, last_run));
    }

    #[test]
    fn test_annual_prune_does_not_fire_twice() {
        // Arrange: the previous run already crossed the boundary.
        let policy = CalendarPolicy::default();
        let now = Utc.with_ymd_and_hms(2019, 2, 2, 0, 0, 0).unwrap();
        let last_run = paris(2019, 2, 1, 0, 0, 0);

        // Act & Assert
        assert!(!policy.needs_annual_prune(now, last_run));
    }

    #[test]
    fn test_annual_prune_fires_even_for_a_months_old_last_run() {
        // Arrange
        let policy = CalendarPolicy::default();
        let now = paris(2019, 4, 10, 8, 0, 0);
        let last_run = paris(2018, 11, 2, 8, 0, 0);

        // Act & Assert
        assert!(policy.needs_annual_prune(now, last_run));
    }

    #[test]
    fn test_weekly_digest_fires_across_the_wednesday_deadline() {
        // Arrange: 2019-03-06 is a Wednesday.
        let policy = CalendarPolicy::default();
        let last_run = paris(2019, 3, 6, 17, 59, 59);
        let now = paris(2019, 3, 6, 18, 0, 1);

        // Act & Assert
        assert!(policy.needs_weekly_digest(now, last_run));
    }

    #[test]
    fn test_weekly_digest_does_not_fire_twice_in_the_same_week() {
        // Arrange
        let policy = CalendarPolicy::default();
        let last_run = paris(2019, 3, 6, 18, 0, 1);
        let now = paris(2019, 3, 6, 18, 0, 2);

        // Act & Assert
        assert!(!policy.needs_weekly_digest(now, last_run));
    }

    #[test]
    fn test_weekly_digest_wednesday_morning_run_owes_the_same_day_deadline() {
        // Arrange
        let policy = CalendarPolicy::default();
        let last_run = paris(2019, 3, 6, 9, 0, 0);
        let now = paris(2019, 3, 6, 18, 0, 0);

        // Act & Assert
        assert!(policy.needs_weekly_digest(now, last_run));
    }

    #[test]
    fn test_weekly_digest_thursday_run_waits_for_next_wednesday() {
        // Arrange: 2019-03-07 is a Thursday; the next deadline is
        // 2019-03-13 18:00.
        let policy = CalendarPolicy::default();
        let last_run = paris(2019, 3, 7, 9, 0, 0);

        // Act & Assert
        assert!(!policy.needs_weekly_digest(paris(2019, 3, 13, 17, 59, 59), last_run));
        assert!(policy.needs_weekly_digest(paris(2019, 3, 13, 18, 0, 0), last_run));
    }

    #[test]
    fn test_safe_lookback_start_is_one_hour_before_last_run() {
        // Arrange
        let policy = CalendarPolicy::default();
        let last_run = Utc.with_ymd_and_hms(2020, 9, 8, 6, 30, 0).unwrap();

        // Act
        let start = policy.safe_lookback_start(last_run);

        // Assert
        assert_eq!(start, Utc.with_ymd_and_hms(2020, 9, 8, 5, 30, 0).unwrap());
        assert_eq!(last_run, Utc.with_ymd_and_hms(2020, 9, 8, 6, 30, 0).unwrap());
    }
}
