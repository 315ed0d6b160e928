//! Configuration for the uplink daemon
//!
//! The config collaborator speaks a plain `key:value` line format:
//!
//! ```text
//! ifname0:eth0
//! ifname1:wlan0
//! SSH:1
//! user:admin
//! password:pass
//! ip:10.0.0.5
//! port:22
//! ```
//!
//! `SSH:1` switches the daemon into remote-shell mode and makes the
//! credential keys mandatory; anything else selects the probe-only mode.

use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Default path of the config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "settings.conf";

/// Default path of the connection event log.
pub const DEFAULT_LOG_PATH: &str = "/var/log/uplink.log";

/// Default probe interval when the config carries no `interval` key.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(5);

/// Login data for the remote device.
///
/// Held only in memory. The `Debug` impl masks the password so the struct
/// can never leak it through diagnostics or the event log.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Username for password authentication
    pub user: String,
    /// Password, never logged in full
    pub password: String,
    /// Address of the remote device
    pub host: IpAddr,
    /// SSH port on the remote device
    pub port: u16,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

/// What the daemon drives once an interface has been selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Open an interactive remote shell session against the device
    Shell(Credentials),
    /// Keep probing the selected interface's own address
    ProbeOnly,
}

/// Parsed daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// First (preferred) interface name
    pub ifname0: String,
    /// Second (fallback) interface name
    pub ifname1: String,
    /// Session or probe-only operation
    pub mode: Mode,
    /// Interval between monitor cycles and reachability probes
    pub probe_interval: Duration,
}

impl Config {
    /// Load and parse the config file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content)
    }

    /// Parse config text in the `key:value` line format.
    ///
    /// Empty lines are skipped; a duplicate key overwrites the earlier value.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let mut map = HashMap::new();

        for line in input.lines() {
            if line.is_empty() {
                continue;
            }
            let (key, value) = line
                .split_once(':')
                .ok_or_else(|| ConfigError::Invalid(format!("malformed line: {line:?}")))?;
            map.insert(key, value);
        }

        let ifname0 = required(&map, "ifname0")?.to_string();
        let ifname1 = required(&map, "ifname1")?.to_string();

        let mode = if map.get("SSH").copied() == Some("1") {
            Mode::Shell(Credentials {
                user: required(&map, "user")?.to_string(),
                password: required(&map, "password")?.to_string(),
                host: required(&map, "ip")?
                    .parse()
                    .map_err(|_| ConfigError::Invalid(format!("bad ip: {}", map["ip"])))?,
                port: required(&map, "port")?
                    .parse()
                    .map_err(|_| ConfigError::Invalid(format!("bad port: {}", map["port"])))?,
            })
        } else {
            Mode::ProbeOnly
        };

        let probe_interval = match map.get("interval") {
            Some(value) => {
                let secs: u64 = value
                    .parse()
                    .map_err(|_| ConfigError::Invalid(format!("bad interval: {value}")))?;
                Duration::from_secs(secs)
            }
            None => DEFAULT_PROBE_INTERVAL,
        };

        Ok(Self {
            ifname0,
            ifname1,
            mode,
            probe_interval,
        })
    }

    /// Bounded wait for channel readiness inside command execution.
    ///
    /// This is the only bounded wait in the connection core.
    pub fn channel_ready_timeout(&self) -> Duration {
        self.probe_interval * 2
    }
}

fn required<'a>(
    map: &HashMap<&str, &'a str>,
    key: &'static str,
) -> Result<&'a str, ConfigError> {
    map.get(key).copied().ok_or(ConfigError::MissingField(key))
}
