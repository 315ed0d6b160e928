//! uplink-core: Shared building blocks for the uplink daemon
//!
//! This crate provides the configuration model, the shared link/connection
//! state flags, and the append-only event log used by the daemon components.

pub mod config;
pub mod error;
pub mod log;
pub mod state;

pub use config::{Config, Credentials, Mode};
pub use error::{ConfigError, LogError};
pub use log::{EventLog, Level};
pub use state::{Iface, LinkState};
