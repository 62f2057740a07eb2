//! Domain layer for TargetPing.
//!
//! This crate contains:
//! - Domain models (Target, LocationFix, Transition, LogRecord, TrackingStatus)
//! - The proximity monitoring engine (containment tracking, evaluation, lifecycle)
//! - Collaborator contracts (target store, event log, location source, keep-alive, alerts)

pub mod models;
pub mod services;
