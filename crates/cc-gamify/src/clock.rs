use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

/// Source of the current time and of the calendar day used for streaks.
pub trait Clock: Send + Sync {
    /// Current instant, used for grant timestamps
    fn now(&self) -> DateTime<Utc>;

    /// Current calendar day in the server's streak time zone
    fn today(&self) -> NaiveDate;
}

/// Wall clock pinned to one fixed UTC offset.
///
/// Every user's "day" is evaluated in this single zone, so a streak never
/// depends on where the request came from.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub const fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Build a clock from an offset in minutes east of UTC.
    ///
    /// Returns `None` when the offset is outside ±24 hours.
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(Self::new)
    }

    pub const fn offset(&self) -> FixedOffset {
        self.offset
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(Utc.fix())
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset).date_naive()
    }
}
