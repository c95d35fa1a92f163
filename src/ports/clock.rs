//! Clock port.
//!
//! Every date decision in the ledger (package status, freeze windows,
//! auto-unfreeze) is made against `today()`, so tests pin the clock.

use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::foundation::Timestamp;

pub trait Clock: Send + Sync {
    /// Current UTC instant.
    fn now(&self) -> DateTime<Utc>;

    /// Current UTC calendar day.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    fn timestamp(&self) -> Timestamp {
        Timestamp::from_datetime(self.now())
    }
}
