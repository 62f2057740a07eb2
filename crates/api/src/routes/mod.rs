//! HTTP route handlers.

pub mod health;
pub mod locations;
pub mod logs;
pub mod targets;
pub mod tracking;
