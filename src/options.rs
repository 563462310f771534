//! Contains the setup options that can be given to the [`ServerBuilder`](crate::ServerBuilder),
//! either one by one or all at once through a [`ServerConfig`].

use crate::ServerError;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{self, Display, Formatter},
    net::{Ipv4Addr, SocketAddr},
    ops::RangeInclusive,
    path::Path,
};

/// The greeting sent to a client right after it connects.
pub const DEFAULT_GREETING: &str = "Welcome to the ftpgate FTP server";
/// The address the control channel listens on.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:2121";
/// Seconds a session may stay silent before it is closed.
pub const DEFAULT_IDLE_SESSION_TIMEOUT_SECS: u64 = 600;
/// The lowest port handed out for passive data connections.
pub const DEFAULT_PASSIVE_PORT_LOW: u16 = 49152;
/// The highest port handed out for passive data connections.
pub const DEFAULT_PASSIVE_PORT_HIGH: u16 = 65535;
/// Seconds we wait for a client to connect to the data port it asked for with `PASV`.
pub const DEFAULT_PASSIVE_ACCEPT_TIMEOUT_SECS: u64 = 15;
/// Seconds after which a passive port that was never connected to is taken back.
pub const DEFAULT_PASSIVE_LEASE_TIMEOUT_SECS: u64 = 30;
/// The number of protocol violations tolerated per session.
pub const DEFAULT_VIOLATION_THRESHOLD: u32 = 10;
/// Milliseconds every failed login is held back.
pub const DEFAULT_FAILED_LOGIN_DELAY_MS: u64 = 1000;
/// Seconds sessions get to finish after shutdown was requested.
pub const DEFAULT_SHUTDOWN_GRACE_PERIOD_SECS: u64 = 10;

/// How the IP address sent back in the `PASV` reply is determined.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum PassiveHost {
    /// Use the local address of the control connection
    #[default]
    FromConnection,
    /// Advertise this address, typically the public address of a NAT gateway or load balancer.
    Ip(Ipv4Addr),
}

impl From<Ipv4Addr> for PassiveHost {
    fn from(ip: Ipv4Addr) -> Self {
        PassiveHost::Ip(ip)
    }
}

impl From<[u8; 4]> for PassiveHost {
    fn from(ip: [u8; 4]) -> Self {
        PassiveHost::Ip(ip.into())
    }
}

impl From<Option<Ipv4Addr>> for PassiveHost {
    fn from(ip: Option<Ipv4Addr>) -> Self {
        ip.map(PassiveHost::Ip).unwrap_or_default()
    }
}

impl Display for PassiveHost {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PassiveHost::FromConnection => f.write_str("address of the control connection"),
            PassiveHost::Ip(ip) => write!(f, "{}", ip),
        }
    }
}

/// An inclusive port range as written in a configuration file: `{"low": 50000, "high": 50100}`.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub struct PortRange {
    /// The first port of the range
    pub low: u16,
    /// The last port of the range, inclusive.
    pub high: u16,
}

impl Default for PortRange {
    fn default() -> Self {
        PortRange {
            low: DEFAULT_PASSIVE_PORT_LOW,
            high: DEFAULT_PASSIVE_PORT_HIGH,
        }
    }
}

impl From<PortRange> for RangeInclusive<u16> {
    fn from(range: PortRange) -> Self {
        range.low..=range.high
    }
}

impl From<RangeInclusive<u16>> for PortRange {
    fn from(range: RangeInclusive<u16>) -> Self {
        PortRange {
            low: *range.start(),
            high: *range.end(),
        }
    }
}

/// Process configuration of a server, read once at startup. Every field is optional in the JSON
/// form and falls back to the `DEFAULT_*` constant of this module.
///
/// ```
/// use ftpgate::options::ServerConfig;
///
/// let config = ServerConfig::from_json(r#"{
///     "bind_address": "127.0.0.1:2121",
///     "passive_ports": {"low": 50000, "high": 50009},
///     "public_ip": "203.0.113.7"
/// }"#).unwrap();
/// assert_eq!(config.passive_ports.high, 50009);
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address and port of the control channel listener.
    pub bind_address: SocketAddr,
    /// The ports the passive port allocator hands out.
    pub passive_ports: PortRange,
    /// Address advertised in `PASV` replies instead of the control connection's local address.
    pub public_ip: Option<Ipv4Addr>,
    /// The welcome banner.
    pub greeting: String,
    /// See [`DEFAULT_IDLE_SESSION_TIMEOUT_SECS`].
    pub idle_session_timeout_secs: u64,
    /// See [`DEFAULT_PASSIVE_ACCEPT_TIMEOUT_SECS`].
    pub passive_accept_timeout_secs: u64,
    /// See [`DEFAULT_PASSIVE_LEASE_TIMEOUT_SECS`].
    pub passive_lease_timeout_secs: u64,
    /// See [`DEFAULT_VIOLATION_THRESHOLD`].
    pub violation_threshold: u32,
    /// See [`DEFAULT_FAILED_LOGIN_DELAY_MS`].
    pub failed_login_delay_ms: u64,
    /// See [`DEFAULT_SHUTDOWN_GRACE_PERIOD_SECS`].
    pub shutdown_grace_period_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 2121)),
            passive_ports: PortRange::default(),
            public_ip: None,
            greeting: String::from(DEFAULT_GREETING),
            idle_session_timeout_secs: DEFAULT_IDLE_SESSION_TIMEOUT_SECS,
            passive_accept_timeout_secs: DEFAULT_PASSIVE_ACCEPT_TIMEOUT_SECS,
            passive_lease_timeout_secs: DEFAULT_PASSIVE_LEASE_TIMEOUT_SECS,
            violation_threshold: DEFAULT_VIOLATION_THRESHOLD,
            failed_login_delay_ms: DEFAULT_FAILED_LOGIN_DELAY_MS,
            shutdown_grace_period_secs: DEFAULT_SHUTDOWN_GRACE_PERIOD_SECS,
        }
    }
}

impl ServerConfig {
    /// Parses a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ServerError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ServerError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
