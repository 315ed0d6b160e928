//! uplinkd: Connection-keeper daemon
//!
//! Tracks the link state of two network interfaces in the background,
//! selects the healthiest one, and drives either an interactive remote
//! shell session or a reachability probe loop against the device,
//! retrying forever on failure.

pub mod link;
pub mod monitor;
pub mod orchestrator;
pub mod probe;
pub mod shell;

pub use monitor::InterfaceMonitor;
pub use orchestrator::Orchestrator;
