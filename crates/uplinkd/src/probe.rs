//! Echo-style reachability probing
//!
//! A probe is a single ICMP echo round trip, optionally bound to one local
//! interface. The real implementation shells out to `ping`; the probe seam
//! is a trait so the control flow around it can be exercised without a
//! network.

use std::net::IpAddr;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use uplink_core::{EventLog, Level, LinkState};

/// Reachability errors surfaced to the connection loop
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Pre-flight probe failed; no session is attempted
    #[error("{target} is unreachable via {ifname}")]
    Unreachable { ifname: String, target: IpAddr },

    /// The chosen interface carries no usable address to probe
    #[error("no address assigned to {0}")]
    NoAddress(String),
}

/// One echo round trip to a target address
#[async_trait]
pub trait EchoProbe: Send + Sync {
    /// True iff the target answered. `bind` scopes the outbound probe to a
    /// local interface.
    async fn echo(&self, target: IpAddr, bind: Option<&str>) -> bool;
}

/// Probes via the system `ping` binary, one echo request per probe.
pub struct PingProbe {
    timeout: Duration,
}

impl PingProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl EchoProbe for PingProbe {
    async fn echo(&self, target: IpAddr, bind: Option<&str>) -> bool {
        let mut cmd = tokio::process::Command::new("ping");
        cmd.arg("-c")
            .arg("1")
            .arg("-W")
            .arg(self.timeout.as_secs().max(1).to_string());
        if let Some(ifname) = bind {
            cmd.arg("-I").arg(ifname);
        }
        cmd.arg(target.to_string())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        match cmd.status().await {
            Ok(status) => status.success(),
            Err(e) => {
                // Fails closed, like every other liveness query
                tracing::debug!("ping spawn failed: {}", e);
                false
            }
        }
    }
}

/// Reachability checks and the decaying mock-connection loop
pub struct ReachabilityProbe<P> {
    prober: P,
    interval: Duration,
}

impl<P: EchoProbe> ReachabilityProbe<P> {
    pub fn new(prober: P, interval: Duration) -> Self {
        Self { prober, interval }
    }

    /// One-shot reachability check.
    pub async fn check(&self, target: IpAddr) -> bool {
        self.prober.echo(target, None).await
    }

    /// One-shot check with the outbound probe bound to `ifname`.
    ///
    /// Used as the pre-flight gate before a shell session is opened.
    pub async fn check_via_interface(&self, ifname: &str, target: IpAddr) -> bool {
        self.prober.echo(target, Some(ifname)).await
    }

    /// Probe `target` every interval until the first failure.
    ///
    /// While the target answers, the established flag is held true. The loop
    /// returns the instant a probe fails and leaves the flag set; clearing
    /// it is the caller's epilogue.
    pub async fn run_loop(&self, target: IpAddr, state: &LinkState, log: &EventLog) {
        loop {
            if !self.prober.echo(target, None).await {
                log.append(Level::Error, &format!("lost contact with {target}"));
                return;
            }

            state.set_established(true);
            log.append(Level::Info, &format!("echo reply from {target}"));

            tokio::time::sleep(self.interval).await;
        }
    }
}
