//! ExpiryClock day arithmetic.
//!
//! All values are whole calendar days in UTC-naive dates. A freeze window
//! is inclusive of both its start day and its planned end day.

use chrono::{Days, NaiveDate};

use crate::domain::foundation::ValidationError;

/// Day counting for freeze windows.
pub struct ExpiryClock;

impl ExpiryClock {
    /// True if a freeze planned to end on `planned_end` may start `today`.
    pub fn is_valid_window(today: NaiveDate, planned_end: NaiveDate) -> bool {
        planned_end > today
    }

    /// Inclusive day count from the start of `today` to the end of
    /// `planned_end`.
    ///
    /// Freezing on 2025-01-10 until 2025-01-20 plans 11 days.
    pub fn planned_duration_days(today: NaiveDate, planned_end: NaiveDate) -> i64 {
        ((planned_end - today).num_days() + 1).max(0)
    }

    /// Days the expiry clock was actually stopped.
    ///
    /// Reaching (or passing) the planned end day counts the full planned
    /// window. Unfreezing earlier counts only the elapsed days before
    /// `today`, since the member is active again on the unfreeze day.
    pub fn actual_frozen_days(
        freeze_start: NaiveDate,
        planned_end: NaiveDate,
        planned_days: i64,
        today: NaiveDate,
    ) -> i64 {
        if today >= planned_end {
            return planned_days.max(0);
        }
        (today - freeze_start).num_days().clamp(0, planned_days.max(0))
    }

    /// Expiry after a freeze of `frozen_days`, measured from the pre-freeze
    /// expiry so repeated application is idempotent.
    pub fn extended_expiry(
        original_expiry: NaiveDate,
        frozen_days: i64,
    ) -> Result<NaiveDate, ValidationError> {
        original_expiry
            .checked_add_days(Days::new(frozen_days.max(0).unsigned_abs()))
            .ok_or_else(|| {
                ValidationError::invalid_format(
                    "expiry_date",
                    format!("{original_expiry} extended by {frozen_days} days is past the supported calendar"),
                )
            })
    }
}
