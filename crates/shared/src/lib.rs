//! Shared utilities and common types for TargetPing.
//!
//! This crate provides functionality used across all other crates:
//! - Geodesic distance and human-readable distance formatting
//! - Common validation logic for coordinates, names and location fixes

pub mod geodesy;
pub mod validation;
