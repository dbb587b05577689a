//! vigil -- Dead-Man's-Switch Heartbeat Monitor
//!
//! Jobs check in over HTTP; a poller alerts when a job goes silent
//! past its declared frequency, and again when it comes back.

pub mod alert;
pub mod config;
pub mod poller;
pub mod server;
pub mod store;
pub mod summary;
pub mod types;
