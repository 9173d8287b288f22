//! Host probes used by the reconciliation engine.
//!
//! Two trait seams live here, each with a default implementation:
//!
//! * [`ProcessObserver`] enumerates the OS process table ([`PsObserver`]).
//! * [`PortProbe`] checks a localhost TCP port ([`TcpPortProbe`]).
//!
//! Both are blocking-style external calls wrapped in explicit timeouts; a
//! failure surfaces as [`Error::Probe`](crate::error::Error::Probe) and is
//! never retried here.

mod port;
mod process;

pub use port::TcpPortProbe;
pub use process::{PsObserver, parse_ps_aux};

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One row of the process table at the moment of enumeration.
///
/// No identity persists across calls; every reconciliation re-derives its
/// matches from a fresh list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRecord {
    pub pid: u32,
    /// Executable base name.
    pub name: String,
    /// Full command line.
    pub cmd: String,
    pub cpu: f32,
    pub memory: f32,
    /// Resident set size in KiB.
    pub mem_rss: u64,
}

/// Reachability of a TCP port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortState {
    Open,
    Closed,
    /// The connect attempt neither succeeded nor was refused in time.
    Filtered,
}

impl PortState {
    pub fn is_open(self) -> bool {
        self == PortState::Open
    }
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PortState::Open => "open",
            PortState::Closed => "closed",
            PortState::Filtered => "filtered",
        };
        write!(f, "{}", s)
    }
}

/// Enumerates host processes.
#[async_trait]
pub trait ProcessObserver: Send + Sync {
    /// Returns the current process table.
    async fn processes(&self) -> Result<Vec<ProcessRecord>>;
}

/// Checks TCP reachability of a local port.
#[async_trait]
pub trait PortProbe: Send + Sync {
    /// Returns the state of `host:port`.
    async fn check(&self, host: &str, port: u16) -> Result<PortState>;
}
