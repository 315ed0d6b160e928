//! Background interface monitor
//!
//! Polls link state for both configured interfaces and reports them plus
//! the session-established flag to the event log, once per cycle.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use uplink_core::{EventLog, Level, LinkState};

use crate::link;

/// Periodic liveness poller for the two configured interfaces
pub struct InterfaceMonitor {
    interval: Duration,
    state: Arc<LinkState>,
    log: Arc<EventLog>,
}

impl InterfaceMonitor {
    pub fn new(interval: Duration, state: Arc<LinkState>, log: Arc<EventLog>) -> Self {
        Self {
            interval,
            state,
            log,
        }
    }

    /// Start the monitor loop as a background task.
    ///
    /// Returns immediately; the task runs until the token is cancelled and
    /// is joined at shutdown via the returned handle.
    pub fn spawn(self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        self.log
            .append(Level::Info, "starting interface monitor");

        tokio::spawn(async move {
            loop {
                self.poll_once();

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.interval) => {}
                }
            }
            tracing::debug!("interface monitor stopped");
        })
    }

    /// One monitor cycle: refresh both liveness flags and log the state.
    fn poll_once(&self) {
        for iface in self.state.interfaces() {
            let up = link::is_operational(iface.name());
            iface.set_up(up);

            let status = if up { "online" } else { "offline" };
            self.log
                .append(Level::Info, &format!("{} is {}", iface.name(), status));
        }

        if self.state.is_established() {
            self.log
                .append(Level::Info, "connection to device established");
        } else {
            self.log
                .append(Level::Info, "connection to device is not established");
        }
    }
}
