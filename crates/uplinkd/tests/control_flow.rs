//! End-to-end control-flow tests for the connection loop
//!
//! These drive the orchestrator and probe loop through scripted probes and
//! real shared state, without touching the network.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use uplink_core::{Config, EventLog, LinkState};
use uplinkd::orchestrator::{CycleOutcome, Orchestrator};
use uplinkd::probe::{EchoProbe, ReachabilityProbe};

/// Replays a fixed sequence of probe outcomes; repeats the last one when
/// the script runs dry.
struct ScriptedProbe {
    script: Mutex<Vec<bool>>,
}

impl ScriptedProbe {
    fn new(script: &[bool]) -> Self {
        Self {
            script: Mutex::new(script.to_vec()),
        }
    }
}

#[async_trait]
impl EchoProbe for ScriptedProbe {
    async fn echo(&self, _target: IpAddr, _bind: Option<&str>) -> bool {
        let mut script = self.script.lock().await;
        if script.len() > 1 {
            script.remove(0)
        } else {
            script[0]
        }
    }
}

fn test_log(dir: &tempfile::TempDir) -> Arc<EventLog> {
    Arc::new(EventLog::open(&dir.path().join("uplink.log")).unwrap())
}

#[test]
fn established_is_false_at_process_start() {
    let state = LinkState::new("eth0", "wlan0");
    assert!(!state.is_established());
}

#[tokio::test]
async fn probe_cycle_holds_established_until_the_loop_ends() {
    let dir = tempfile::tempdir().unwrap();
    let log = test_log(&dir);

    // Loopback always carries 127.0.0.1, so probe-only mode can resolve it
    let mut config = Config::parse("ifname0:lo\nifname1:wlan0\nSSH:0\n").unwrap();
    config.probe_interval = Duration::ZERO;

    let state = Arc::new(LinkState::new("lo", "wlan0"));
    state.primary.set_up(true);

    let mut orchestrator = Orchestrator::new(
        &config,
        state.clone(),
        log,
        ReachabilityProbe::new(ScriptedProbe::new(&[true, true, false]), Duration::ZERO),
    );

    let outcome = orchestrator.cycle().await.unwrap();
    assert_eq!(outcome, CycleOutcome::ProbeLoopEnded);

    // The probe loop leaves the flag set; run()'s epilogue clears it
    assert!(state.is_established());
}

#[tokio::test]
async fn run_clears_established_after_every_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let log = test_log(&dir);

    // A live interface with no address makes every cycle fail fast, which
    // exercises the error epilogue: clear the flag, back off, retry.
    let mut config =
        Config::parse("ifname0:uplink-test-missing0\nifname1:wlan0\nSSH:0\n").unwrap();
    config.probe_interval = Duration::from_millis(10);

    let state = Arc::new(LinkState::new("uplink-test-missing0", "wlan0"));
    state.primary.set_up(true);
    state.set_established(true);

    let mut orchestrator = Orchestrator::new(
        &config,
        state.clone(),
        log,
        ReachabilityProbe::new(ScriptedProbe::new(&[true]), Duration::ZERO),
    );
    let task = tokio::spawn(async move { orchestrator.run().await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!state.is_established());

    task.abort();
    let _ = task.await;
}

#[tokio::test]
async fn idle_loop_waits_when_no_interface_is_live() {
    let dir = tempfile::tempdir().unwrap();
    let log = test_log(&dir);
    let log_path = dir.path().join("uplink.log");

    let mut config = Config::parse("ifname0:eth0\nifname1:wlan0\nSSH:0\n").unwrap();
    config.probe_interval = Duration::from_millis(10);

    let state = Arc::new(LinkState::new("eth0", "wlan0"));

    let mut orchestrator = Orchestrator::new(
        &config,
        state.clone(),
        log,
        ReachabilityProbe::new(ScriptedProbe::new(&[true]), Duration::ZERO),
    );
    let task = tokio::spawn(async move { orchestrator.run().await });

    tokio::time::sleep(Duration::from_millis(40)).await;
    task.abort();
    let _ = task.await;

    assert!(!state.is_established());
    let content = std::fs::read_to_string(&log_path).unwrap();
    assert!(content.contains("no interface available, retrying"));
}
