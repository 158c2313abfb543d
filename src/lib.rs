// src/lib.rs
pub mod backends;
pub mod checks;
pub mod config;
pub mod heartbeat;
pub mod metrics;
pub mod server;
