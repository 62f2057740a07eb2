//! Host-side collaborator implementations.

pub mod keep_alive;

pub use keep_alive::HeartbeatKeepAlive;
