//! Credit handlers - eligibility, deduction, refund and package assignment.

mod add_package;
mod cancel_package;
mod check_eligibility;
mod deduct_credit;
mod refund_credit;

pub use add_package::{AddPackageCommand, AddPackageHandler};
pub use cancel_package::{CancelPackageCommand, CancelPackageHandler};
pub use check_eligibility::{CheckEligibilityCommand, CheckEligibilityHandler};
pub use deduct_credit::{DeductCreditCommand, DeductCreditHandler};
pub use refund_credit::{RefundCreditCommand, RefundCreditHandler};

pub(crate) use deduct_credit::legacy_migrated;
