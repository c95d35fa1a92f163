//! Ledger behaviour configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::application::{LedgerSettings, WritePolicy, DEFAULT_SYSTEM_ACTOR};
use crate::domain::ledger::RefundFallback;

/// Ledger configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Attempts per record update before giving up on conflicts/timeouts
    #[serde(default = "default_max_write_attempts")]
    pub max_write_attempts: u32,

    /// Bound on each store call, in milliseconds
    #[serde(default = "default_record_timeout_ms")]
    pub record_timeout_ms: u64,

    /// Seconds between background reconciliation passes
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_secs: u64,

    /// Target for refunds whose lesson date no package covers
    #[serde(default)]
    pub refund_fallback: RefundFallback,

    /// Actor recorded by automatic unfreezes
    #[serde(default = "default_system_actor")]
    pub system_actor: String,

    /// Run the legacy migration sweep when the binary starts
    #[serde(default)]
    pub migrate_on_startup: bool,
}

impl LedgerConfig {
    pub fn record_timeout(&self) -> Duration {
        Duration::from_millis(self.record_timeout_ms)
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }

    /// Handler settings derived from this configuration.
    pub fn settings(&self) -> LedgerSettings {
        LedgerSettings {
            write_policy: WritePolicy {
                max_attempts: self.max_write_attempts,
                record_timeout: self.record_timeout(),
                ..WritePolicy::default()
            },
            refund_fallback: self.refund_fallback,
            system_actor: self.system_actor.clone(),
        }
    }

    /// Validate ledger configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=20).contains(&self.max_write_attempts) {
            return Err(ValidationError::InvalidWriteAttempts);
        }
        if self.record_timeout_ms == 0 {
            return Err(ValidationError::InvalidTimeout("record_timeout_ms"));
        }
        if self.reconcile_interval_secs == 0 {
            return Err(ValidationError::InvalidReconcileInterval);
        }
        if self.system_actor.trim().is_empty() {
            return Err(ValidationError::MissingRequired("LEDGER__SYSTEM_ACTOR"));
        }
        Ok(())
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_write_attempts: default_max_write_attempts(),
            record_timeout_ms: default_record_timeout_ms(),
            reconcile_interval_secs: default_reconcile_interval(),
            refund_fallback: RefundFallback::default(),
            system_actor: default_system_actor(),
            migrate_on_startup: false,
        }
    }
}

fn default_max_write_attempts() -> u32 {
    5
}

fn default_record_timeout_ms() -> u64 {
    2000
}

fn default_reconcile_interval() -> u64 {
    300
}

fn default_system_actor() -> String {
    DEFAULT_SYSTEM_ACTOR.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_defaults() {
        let config = LedgerConfig::default();
        assert_eq!(config.max_write_attempts, 5);
        assert_eq!(config.record_timeout(), Duration::from_millis(2000));
        assert_eq!(config.reconcile_interval(), Duration::from_secs(300));
        assert_eq!(config.refund_fallback, RefundFallback::MostRecentActive);
        assert_eq!(config.system_actor, "system-auto");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_settings_carry_policy() {
        let config = LedgerConfig {
            max_write_attempts: 3,
            record_timeout_ms: 500,
            refund_fallback: RefundFallback::Disabled,
            ..Default::default()
        };
        let settings = config.settings();
        assert_eq!(settings.write_policy.max_attempts, 3);
        assert_eq!(settings.write_policy.record_timeout, Duration::from_millis(500));
        assert_eq!(settings.refund_fallback, RefundFallback::Disabled);
    }

    #[test]
    fn test_validation_write_attempts_range() {
        for attempts in [0, 21] {
            let config = LedgerConfig {
                max_write_attempts: attempts,
                ..Default::default()
            };
            assert_eq!(config.validate(), Err(ValidationError::InvalidWriteAttempts));
        }
    }

    #[test]
    fn test_validation_blank_actor() {
        let config = LedgerConfig {
            system_actor: " ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
