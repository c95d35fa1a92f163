//! Runtime knobs for the ledger handlers.

use super::WritePolicy;
use crate::domain::ledger::RefundFallback;

/// Actor recorded by automatic unfreezes.
pub const DEFAULT_SYSTEM_ACTOR: &str = "system-auto";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSettings {
    pub write_policy: WritePolicy,
    pub refund_fallback: RefundFallback,
    pub system_actor: String,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            write_policy: WritePolicy::default(),
            refund_fallback: RefundFallback::default(),
            system_actor: DEFAULT_SYSTEM_ACTOR.to_string(),
        }
    }
}
