//! Explicit time reference for a run
//!
//! Components that need "now" or a local offset receive a [`TimeContext`]
//! instead of asking the host clock or time zone database themselves. The
//! binary builds one at startup; tests build fixed ones.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, Offset, TimeZone, Utc};

/// The instant a run started and the UTC offset naive timestamps are read in
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeContext {
    now: DateTime<Utc>,
    offset: FixedOffset,
}

impl TimeContext {
    /// Build a context from explicit values
    pub fn new(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self { now, offset }
    }

    /// Capture the host clock once, using `offset_minutes` when given and the
    /// host's current UTC offset otherwise
    ///
    /// Offsets outside ±24h fall back to UTC.
    pub fn capture(offset_minutes: Option<i32>) -> Self {
        let now = Utc::now();
        let offset = match offset_minutes {
            Some(minutes) => FixedOffset::east_opt(minutes.saturating_mul(60))
                .unwrap_or_else(|| Utc.fix()),
            None => Local::now().offset().fix(),
        };
        Self { now, offset }
    }

    /// The instant this run started
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// The offset naive timestamps are interpreted in
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// `now` minus the given number of whole days
    pub fn days_ago(&self, days: u32) -> DateTime<Utc> {
        self.now - chrono::Duration::days(i64::from(days))
    }

    /// Interpret a wall-clock value in this context's offset
    ///
    /// Returns None only when the value cannot be represented.
    pub fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        self.offset
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Express an instant in this context's offset, for display
    pub fn to_local(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.offset)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn berlin_summer() -> FixedOffset {
        FixedOffset::east_opt(2 * 3600).unwrap()
    }

    #[test]
    fn localize_reads_wall_clock_in_configured_offset() {
        let now = Utc.with_ymd_and_hms(2010, 10, 28, 0, 0, 0).unwrap();
        let ctx = TimeContext::new(now, berlin_summer());
        let naive = NaiveDate::from_ymd_opt(2010, 10, 26)
            .unwrap()
            .and_hms_opt(11, 53, 49)
            .unwrap();

        let instant = ctx.localize(naive).unwrap();

        assert_eq!(instant, Utc.with_ymd_and_hms(2010, 10, 26, 9, 53, 49).unwrap());
    }

    #[test]
    fn to_local_then_back_is_identity() {
        let ctx = TimeContext::new(Utc::now(), berlin_summer());
        let instant = Utc.with_ymd_and_hms(2010, 10, 27, 9, 53, 49).unwrap();

        let local = ctx.to_local(instant);

        assert_eq!(local.with_timezone(&Utc), instant);
        assert_eq!(local.naive_local().to_string(), "2010-10-27 11:53:49");
    }

    #[test]
    fn days_ago_subtracts_whole_days() {
        let now = Utc.with_ymd_and_hms(2010, 10, 28, 12, 0, 0).unwrap();
        let ctx = TimeContext::new(now, Utc.fix());

        assert_eq!(
            ctx.days_ago(7),
            Utc.with_ymd_and_hms(2010, 10, 21, 12, 0, 0).unwrap()
        );
        assert_eq!(ctx.days_ago(0), now);
    }

    #[test]
    fn capture_honours_explicit_offset() {
        let ctx = TimeContext::capture(Some(-300));
        assert_eq!(ctx.offset().local_minus_utc(), -300 * 60);
    }

    #[test]
    fn capture_with_out_of_range_offset_falls_back_to_utc() {
        let ctx = TimeContext::capture(Some(24 * 60 + 1));
        assert_eq!(ctx.offset().local_minus_utc(), 0);
    }
}
