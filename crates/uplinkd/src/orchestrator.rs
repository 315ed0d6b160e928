//! Top-level connection loop
//!
//! Each cycle selects an interface by fixed priority, pre-flight-checks
//! reachability, and drives either a full shell session or the probe loop
//! to completion. Every failure is logged and retried after a fixed
//! backoff; no error kind is terminal. The loop only stops with the
//! process.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::BufReader;
use uplink_core::{Config, EventLog, Iface, Level, LinkState, Mode};

use crate::link;
use crate::probe::{EchoProbe, ProbeError, ReachabilityProbe};
use crate::shell::{ShellError, ShellSession, ShellSettings};

/// How a connection cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Neither interface is live; nothing was attempted
    NoInterface,
    /// A shell session ran to completion
    SessionEnded,
    /// The probe loop ran until a probe failed
    ProbeLoopEnded,
}

/// Any failure raised during a connection cycle
#[derive(Error, Debug)]
pub enum CycleError {
    #[error(transparent)]
    Shell(#[from] ShellError),

    #[error(transparent)]
    Probe(#[from] ProbeError),
}

/// Fixed-priority interface choice: the primary wins whenever it is live.
pub fn select_interface(state: &LinkState) -> Option<&Iface> {
    if state.primary.is_up() {
        Some(&state.primary)
    } else if state.secondary.is_up() {
        Some(&state.secondary)
    } else {
        None
    }
}

/// The retrying connection loop
pub struct Orchestrator<P> {
    mode: Mode,
    interval: Duration,
    ready_timeout: Duration,
    state: Arc<LinkState>,
    log: Arc<EventLog>,
    probe: ReachabilityProbe<P>,
}

impl<P: EchoProbe> Orchestrator<P> {
    pub fn new(
        config: &Config,
        state: Arc<LinkState>,
        log: Arc<EventLog>,
        probe: ReachabilityProbe<P>,
    ) -> Self {
        Self {
            mode: config.mode.clone(),
            interval: config.probe_interval,
            ready_timeout: config.channel_ready_timeout(),
            state,
            log,
            probe,
        }
    }

    /// Run connection cycles forever.
    ///
    /// The established flag is cleared after every cycle, successful or
    /// not; a failed cycle additionally backs off for half an interval.
    pub async fn run(&mut self) {
        loop {
            match self.cycle().await {
                Ok(CycleOutcome::NoInterface) => {
                    self.log.append(Level::Info, "no interface available, retrying");
                    tokio::time::sleep(self.interval).await;
                }
                Ok(_) => {
                    self.state.set_established(false);
                    self.log.append(Level::Info, "connection cycle ended");
                }
                Err(e) => {
                    self.state.set_established(false);
                    self.log
                        .append(Level::Error, &format!("connection cycle failed: {e}"));
                    tokio::time::sleep(self.interval / 2).await;
                }
            }
        }
    }

    /// One pass of the loop: select, gate, and drive to completion.
    ///
    /// `run` wraps this with the logging, flag-clearing, and backoff
    /// policy.
    pub async fn cycle(&mut self) -> Result<CycleOutcome, CycleError> {
        let chosen = match select_interface(&self.state) {
            Some(iface) => iface.name().to_string(),
            None => return Ok(CycleOutcome::NoInterface),
        };
        self.log
            .append(Level::Info, &format!("{chosen} chosen to connect through"));

        match self.mode.clone() {
            Mode::Shell(credentials) => {
                // Pre-flight gate: no session attempt against a dead target
                if !self
                    .probe
                    .check_via_interface(&chosen, credentials.host)
                    .await
                {
                    return Err(ProbeError::Unreachable {
                        ifname: chosen,
                        target: credentials.host,
                    }
                    .into());
                }

                let settings = ShellSettings {
                    channel_ready_timeout: self.ready_timeout,
                };
                let session =
                    ShellSession::connect(&credentials, &settings, self.log.clone()).await?;

                let mut input = BufReader::new(tokio::io::stdin());
                let mut output = tokio::io::stdout();
                session.run(&self.state, &mut input, &mut output).await?;

                Ok(CycleOutcome::SessionEnded)
            }
            Mode::ProbeOnly => {
                let addr = link::local_ipv4(&chosen)
                    .ok_or_else(|| ProbeError::NoAddress(chosen.clone()))?;

                self.probe
                    .run_loop(IpAddr::V4(addr), &self.state, &self.log)
                    .await;

                Ok(CycleOutcome::ProbeLoopEnded)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::net::Ipv4Addr;

    struct FixedProbe(bool);

    #[async_trait]
    impl EchoProbe for FixedProbe {
        async fn echo(&self, _target: IpAddr, _bind: Option<&str>) -> bool {
            self.0
        }
    }

    fn state_with(primary_up: bool, secondary_up: bool) -> Arc<LinkState> {
        let state = Arc::new(LinkState::new("eth0", "wlan0"));
        state.primary.set_up(primary_up);
        state.secondary.set_up(secondary_up);
        state
    }

    fn test_log() -> (tempfile::TempDir, Arc<EventLog>) {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(EventLog::open(&dir.path().join("uplink.log")).unwrap());
        (dir, log)
    }

    fn shell_config() -> Config {
        Config::parse(
            "ifname0:eth0\nifname1:wlan0\nSSH:1\nuser:admin\npassword:pass\nip:192.0.2.9\nport:22\n",
        )
        .unwrap()
    }

    #[test]
    fn test_selection_is_fixed_priority() {
        assert_eq!(
            select_interface(&state_with(true, true)).map(Iface::name),
            Some("eth0")
        );
        assert_eq!(
            select_interface(&state_with(true, false)).map(Iface::name),
            Some("eth0")
        );
        assert_eq!(
            select_interface(&state_with(false, true)).map(Iface::name),
            Some("wlan0")
        );
        assert!(select_interface(&state_with(false, false)).is_none());
    }

    #[tokio::test]
    async fn test_cycle_without_interfaces_is_idle() {
        let (_dir, log) = test_log();
        let mut orchestrator = Orchestrator::new(
            &shell_config(),
            state_with(false, false),
            log,
            ReachabilityProbe::new(FixedProbe(true), Duration::ZERO),
        );

        let outcome = orchestrator.cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::NoInterface);
    }

    #[tokio::test]
    async fn test_failed_preflight_prevents_session_attempt() {
        let (_dir, log) = test_log();
        let state = state_with(true, false);
        let mut orchestrator = Orchestrator::new(
            &shell_config(),
            state.clone(),
            log,
            ReachabilityProbe::new(FixedProbe(false), Duration::ZERO),
        );

        // 192.0.2.9 is TEST-NET; a connect attempt against it would stall,
        // so a fast typed error shows no session was built.
        let started = std::time::Instant::now();
        let err = orchestrator.cycle().await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(1));

        match err {
            CycleError::Probe(ProbeError::Unreachable { ifname, target }) => {
                assert_eq!(ifname, "eth0");
                assert_eq!(target, IpAddr::V4(Ipv4Addr::new(192, 0, 2, 9)));
            }
            other => panic!("expected reachability error, got {other}"),
        }
        assert!(!state.is_established());
    }

    #[tokio::test]
    async fn test_probe_mode_without_address_is_an_error() {
        let (_dir, log) = test_log();
        let config =
            Config::parse("ifname0:uplink-test-missing0\nifname1:wlan0\nSSH:0\n").unwrap();
        let state = Arc::new(LinkState::new("uplink-test-missing0", "wlan0"));
        state.primary.set_up(true);

        let mut orchestrator = Orchestrator::new(
            &config,
            state,
            log,
            ReachabilityProbe::new(FixedProbe(true), Duration::ZERO),
        );

        let err = orchestrator.cycle().await.unwrap_err();
        assert!(matches!(
            err,
            CycleError::Probe(ProbeError::NoAddress(name)) if name == "uplink-test-missing0"
        ));
    }
}
