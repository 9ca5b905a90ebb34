/// Due date normalization
///
/// Users enter due dates as plain calendar dates. A date is interpreted as
/// 23:59 on that day in a fixed reference timezone and stored as a
/// timezone-naive UTC timestamp. When no date is given, the task is due one
/// focus session from now.
///
/// Stored timestamps are converted back to the reference timezone for display
/// and export, so `local_date(end_of_day(d)) == d` for every date.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use neuronudge_shared::due_date::DueDateNormalizer;
///
/// let normalizer = DueDateNormalizer::new(-7).unwrap();
/// let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
///
/// let stored = normalizer.end_of_day(date);
/// assert_eq!(stored.to_string(), "2024-06-02 06:59:00");
/// assert_eq!(normalizer.local_date(stored), date);
/// ```

use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc,
};

/// Default reference offset in hours (Pacific daylight time)
pub const DEFAULT_REFERENCE_OFFSET_HOURS: i32 = -7;

/// Focus duration used when the user has not configured one
pub const DEFAULT_FOCUS_MINUTES: i32 = 25;

const SECONDS_PER_HOUR: i32 = 3600;

/// Error type for due date handling
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DueDateError {
    /// The configured offset is not a real UTC offset
    #[error("Invalid reference offset: {0} hours (expected -12..=14)")]
    InvalidOffset(i32),

    /// The entered date lies before today in the reference timezone
    #[error("Due date {date} cannot be in the past (today is {today})")]
    PastDate { date: NaiveDate, today: NaiveDate },
}

/// Converts user-entered due dates to stored timestamps and back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueDateNormalizer {
    offset: FixedOffset,
}

impl DueDateNormalizer {
    /// Creates a normalizer for a whole-hour UTC offset
    ///
    /// # Errors
    ///
    /// Returns `DueDateError::InvalidOffset` if the offset is outside -12..=14
    pub fn new(offset_hours: i32) -> Result<Self, DueDateError> {
        if !(-12..=14).contains(&offset_hours) {
            return Err(DueDateError::InvalidOffset(offset_hours));
        }

        FixedOffset::east_opt(offset_hours * SECONDS_PER_HOUR)
            .map(|offset| Self { offset })
            .ok_or(DueDateError::InvalidOffset(offset_hours))
    }

    /// The reference timezone offset
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Last minute of the day a due date refers to
    pub fn end_of_day_time() -> NaiveTime {
        NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN)
    }

    /// Normalizes an optional user-entered date into a stored timestamp
    ///
    /// * `date` - calendar date entered by the user, if any
    /// * `focus_minutes` - the user's focus duration, used when `date` is None
    /// * `now` - the current instant
    pub fn normalize(
        &self,
        date: Option<NaiveDate>,
        focus_minutes: Option<i32>,
        now: DateTime<Utc>,
    ) -> NaiveDateTime {
        match date {
            Some(date) => self.end_of_day(date),
            None => self.default_due(focus_minutes, now),
        }
    }

    /// 23:59 on `date` in the reference timezone, as naive UTC
    pub fn end_of_day(&self, date: NaiveDate) -> NaiveDateTime {
        let local = date.and_time(Self::end_of_day_time());

        // A fixed offset never produces an ambiguous or missing local time
        match self.offset.from_local_datetime(&local).single() {
            Some(dt) => dt.naive_utc(),
            None => local - Duration::seconds(i64::from(self.offset.local_minus_utc())),
        }
    }

    /// Now in the reference timezone plus the focus duration, as naive UTC
    ///
    /// Missing or non-positive focus durations fall back to 25 minutes.
    pub fn default_due(&self, focus_minutes: Option<i32>, now: DateTime<Utc>) -> NaiveDateTime {
        let minutes = focus_minutes
            .filter(|m| *m > 0)
            .unwrap_or(DEFAULT_FOCUS_MINUTES);

        let local_now = now.with_timezone(&self.offset);
        (local_now + Duration::minutes(i64::from(minutes))).naive_utc()
    }

    /// Converts a stored timestamp back to the reference timezone
    pub fn to_local(&self, stored: NaiveDateTime) -> DateTime<FixedOffset> {
        self.offset.from_utc_datetime(&stored)
    }

    /// Calendar date of a stored timestamp in the reference timezone
    pub fn local_date(&self, stored: NaiveDateTime) -> NaiveDate {
        self.to_local(stored).date_naive()
    }

    /// Today's date in the reference timezone
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.offset).date_naive()
    }

    /// Rejects dates before today in the reference timezone
    pub fn validate_not_past(&self, date: NaiveDate, now: DateTime<Utc>) -> Result<(), DueDateError> {
        let today = self.today(now);
        if date < today {
            return Err(DueDateError::PastDate { date, today });
        }
        Ok(())
    }
}

impl Default for DueDateNormalizer {
    fn default() -> Self {
        Self {
            offset: FixedOffset::east_opt(DEFAULT_REFERENCE_OFFSET_HOURS * SECONDS_PER_HOUR)
                .unwrap_or_else(|| Utc.fix()),
        }
    }
}
