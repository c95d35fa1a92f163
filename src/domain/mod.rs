//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (ids, timestamps, errors, events)
//! - `ledger` - Package allocations, selection and expiry arithmetic
//! - `membership` - Member aggregate, freeze state and ledger errors

pub mod foundation;
pub mod ledger;
pub mod membership;
