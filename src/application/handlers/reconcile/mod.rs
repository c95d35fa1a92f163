//! Reconciliation - drift repair, auto-unfreeze, the periodic job and the
//! members overview that runs it first.

mod auto_reconciler;
mod list_members;
mod reconciler_job;

pub use auto_reconciler::{AutoReconciler, ReconcileReport, AUTO_UNFREEZE_REASON};
pub use list_members::{ListMembersHandler, MemberOverview, PackageView};
pub use reconciler_job::ReconcilerJob;
