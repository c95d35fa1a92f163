//! Lesson Ledger - multi-package lesson credits for studio members.
//!
//! Tracks time-bounded credit packages per member, decides which package a
//! booking draws from or a cancellation refunds, and pauses package expiry
//! while a membership is frozen.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;
