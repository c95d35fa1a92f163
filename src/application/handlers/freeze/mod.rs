//! Freeze handlers - single-member freeze/unfreeze and group batches.

mod bulk_freeze;
mod freeze_member;
mod unfreeze_member;

pub use bulk_freeze::{BatchResult, BulkFreezeCoordinator, FreezeAllCommand, UnfreezeAllCommand};
pub use freeze_member::{FreezeMemberCommand, FreezeMemberHandler};
pub use unfreeze_member::{UnfreezeMemberCommand, UnfreezeMemberHandler};

pub(crate) use unfreeze_member::unfrozen_event;
