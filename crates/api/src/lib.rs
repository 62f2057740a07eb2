//! TargetPing hosting process: configuration, HTTP control surface, location
//! ingestion and background jobs around the domain monitoring engine.

pub mod app;
pub mod config;
pub mod error;
pub mod jobs;
pub mod middleware;
pub mod routes;
pub mod services;
