//! Shared daemon state
//!
//! Two liveness flags and one established flag, each with exactly one
//! writer: the interface monitor owns the liveness flags, the connection
//! loop owns the established flag. Plain atomic load/store is sufficient;
//! no flag carries an ordering dependency on another, so relaxed ordering
//! is used throughout.

use std::sync::atomic::{AtomicBool, Ordering};

/// One monitored network interface and its last observed link state.
///
/// Lives for the whole process; only the monitor writes the flag.
#[derive(Debug)]
pub struct Iface {
    name: String,
    link_up: AtomicBool,
}

impl Iface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            link_up: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_up(&self) -> bool {
        self.link_up.load(Ordering::Relaxed)
    }

    pub fn set_up(&self, up: bool) {
        self.link_up.store(up, Ordering::Relaxed);
    }
}

/// Flags shared between the interface monitor and the connection loop
#[derive(Debug)]
pub struct LinkState {
    /// Preferred interface
    pub primary: Iface,
    /// Fallback interface
    pub secondary: Iface,
    established: AtomicBool,
}

impl LinkState {
    /// Create the state for the two configured interfaces.
    ///
    /// Both liveness flags and the established flag start false.
    pub fn new(ifname0: impl Into<String>, ifname1: impl Into<String>) -> Self {
        Self {
            primary: Iface::new(ifname0),
            secondary: Iface::new(ifname1),
            established: AtomicBool::new(false),
        }
    }

    /// Whether a remote session or probe loop is currently succeeding
    pub fn is_established(&self) -> bool {
        self.established.load(Ordering::Relaxed)
    }

    pub fn set_established(&self, established: bool) {
        self.established.store(established, Ordering::Relaxed);
    }

    pub fn interfaces(&self) -> [&Iface; 2] {
        [&self.primary, &self.secondary]
    }
}
