//! Host telemetry for the dashboard.
//!
//! [`SystemMonitor`] samples CPU, memory, OS, disk and network data through
//! `sysinfo` on the blocking pool. [`TelemetryPoller`] publishes periodic
//! samples.

mod monitor;

pub use monitor::{SystemMonitor, TelemetryPoller};

use chrono::{DateTime, Utc};
use serde::Serialize;

pub(crate) const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
pub(crate) const MIB: f64 = 1024.0 * 1024.0;

/// Compact sample pushed every few seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub cpu: CpuUsage,
    pub memory: MemoryUsage,
    pub os: OsInfo,
    pub disk: Option<DiskUsage>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuUsage {
    /// Global usage in percent.
    pub usage: f32,
    pub cores: usize,
}

/// Memory figures in GiB.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
    pub total: f64,
    pub used: f64,
    pub free: f64,
    pub usage_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OsInfo {
    pub platform: String,
    pub distro: String,
    pub release: String,
    pub kernel: String,
    pub arch: String,
    pub hostname: String,
}

/// Primary disk in GiB.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskUsage {
    pub mount_point: String,
    pub total: f64,
    pub available: f64,
}

/// Full snapshot served on demand.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedSystemInfo {
    pub cpu: CpuDetails,
    pub memory: MemoryDetails,
    pub os: OsInfo,
    pub disks: Vec<DiskDetails>,
    pub network: Vec<NetworkInterface>,
    pub processes: Vec<TopProcess>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuDetails {
    pub brand: String,
    pub frequency_mhz: u64,
    pub physical_cores: Option<usize>,
    pub logical_cores: usize,
    pub usage: f32,
}

/// Memory and swap in GiB.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryDetails {
    pub total: f64,
    pub used: f64,
    pub available: f64,
    pub swap_total: f64,
    pub swap_used: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskDetails {
    pub name: String,
    pub mount_point: String,
    pub file_system: String,
    pub total: f64,
    pub available: f64,
}

/// Cumulative traffic in bytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    pub name: String,
    pub mac: String,
    pub received: u64,
    pub transmitted: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProcess {
    pub pid: u32,
    pub name: String,
    pub cpu: f32,
    pub memory_mib: f64,
    pub command: String,
}
