//! Persistence layer for TargetPing.
//!
//! This crate contains:
//! - Database connection management and embedded migrations
//! - Entity definitions (database row mappings)
//! - Repository implementations
//! - PostgreSQL-backed target store and event log

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
pub mod stores;
