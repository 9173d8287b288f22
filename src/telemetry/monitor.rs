use crate::error::{Error, Result};
use crate::telemetry::{
    CpuDetails, CpuUsage, DetailedSystemInfo, DiskDetails, DiskUsage, GIB, MIB, MemoryDetails,
    MemoryUsage, NetworkInterface, OsInfo, SystemInfo, TopProcess,
};
use chrono::Utc;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use sysinfo::{Disks, Networks, ProcessesToUpdate, System};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

const TOP_PROCESSES: usize = 10;

/// Samples host metrics through `sysinfo`.
///
/// The underlying [`System`] is kept between samples so CPU usage is the
/// average since the previous call. Sampling runs on the blocking pool.
#[derive(Clone)]
pub struct SystemMonitor {
    system: Arc<Mutex<System>>,
    last_good: Arc<RwLock<Option<SystemInfo>>>,
}

impl SystemMonitor {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        system.refresh_memory();

        Self {
            system: Arc::new(Mutex::new(system)),
            last_good: Arc::new(RwLock::new(None)),
        }
    }

    /// Current compact sample; falls back to the previous one if sampling
    /// fails.
    pub async fn current_info(&self) -> Result<SystemInfo> {
        let system = Arc::clone(&self.system);
        let sampled = tokio::task::spawn_blocking(move || {
            let mut sys = system.lock().unwrap_or_else(PoisonError::into_inner);
            sample(&mut sys)
        })
        .await;

        match sampled {
            Ok(info) => {
                *self.last_good.write().unwrap_or_else(PoisonError::into_inner) = Some(info.clone());
                Ok(info)
            }
            Err(e) => {
                tracing::warn!(error = %e, "System sampling failed, reusing last sample");
                self.last_good
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone()
                    .ok_or_else(|| Error::Other(format!("System sampling failed: {}", e)))
            }
        }
    }

    /// Full snapshot including disks, interfaces and the busiest processes.
    pub async fn detailed_info(&self) -> Result<DetailedSystemInfo> {
        let system = Arc::clone(&self.system);
        tokio::task::spawn_blocking(move || {
            let mut sys = system.lock().unwrap_or_else(PoisonError::into_inner);
            sample_detailed(&mut sys)
        })
        .await
        .map_err(|e| Error::Other(format!("System sampling failed: {}", e)))
    }
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new()
    }
}

fn gib(bytes: u64) -> f64 {
    bytes as f64 / GIB
}

fn os_info() -> OsInfo {
    OsInfo {
        platform: std::env::consts::OS.to_string(),
        distro: System::name().unwrap_or_default(),
        release: System::long_os_version()
            .or_else(System::os_version)
            .unwrap_or_default(),
        kernel: System::kernel_version().unwrap_or_default(),
        arch: std::env::consts::ARCH.to_string(),
        hostname: System::host_name().unwrap_or_else(|| "local".to_string()),
    }
}

fn primary_disk(disks: &Disks) -> Option<DiskUsage> {
    let list = disks.list();
    list.iter()
        .find(|d| d.mount_point() == Path::new("/"))
        .or_else(|| list.first())
        .map(|d| DiskUsage {
            mount_point: d.mount_point().display().to_string(),
            total: gib(d.total_space()),
            available: gib(d.available_space()),
        })
}

fn sample(sys: &mut System) -> SystemInfo {
    sys.refresh_cpu_usage();
    sys.refresh_memory();

    let total = sys.total_memory();
    let used = sys.used_memory();
    let usage_percent = if total > 0 {
        used as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    SystemInfo {
        cpu: CpuUsage {
            usage: sys.global_cpu_usage(),
            cores: sys.cpus().len(),
        },
        memory: MemoryUsage {
            total: gib(total),
            used: gib(used),
            free: gib(total.saturating_sub(used)),
            usage_percent,
        },
        os: os_info(),
        disk: primary_disk(&Disks::new_with_refreshed_list()),
        timestamp: Utc::now(),
    }
}

fn sample_detailed(sys: &mut System) -> DetailedSystemInfo {
    sys.refresh_cpu_all();
    sys.refresh_memory();
    sys.refresh_processes(ProcessesToUpdate::All, true);

    let cpus = sys.cpus();
    let cpu = CpuDetails {
        brand: cpus.first().map(|c| c.brand().trim().to_string()).unwrap_or_default(),
        frequency_mhz: cpus.first().map(|c| c.frequency()).unwrap_or(0),
        physical_cores: System::physical_core_count(),
        logical_cores: cpus.len(),
        usage: sys.global_cpu_usage(),
    };

    let memory = MemoryDetails {
        total: gib(sys.total_memory()),
        used: gib(sys.used_memory()),
        available: gib(sys.available_memory()),
        swap_total: gib(sys.total_swap()),
        swap_used: gib(sys.used_swap()),
    };

    let disks = Disks::new_with_refreshed_list()
        .list()
        .iter()
        .map(|d| DiskDetails {
            name: d.name().to_string_lossy().into_owned(),
            mount_point: d.mount_point().display().to_string(),
            file_system: d.file_system().to_string_lossy().into_owned(),
            total: gib(d.total_space()),
            available: gib(d.available_space()),
        })
        .collect();

    let mut network: Vec<NetworkInterface> = Networks::new_with_refreshed_list()
        .list()
        .iter()
        .map(|(name, data)| NetworkInterface {
            name: name.clone(),
            mac: data.mac_address().to_string(),
            received: data.total_received(),
            transmitted: data.total_transmitted(),
        })
        .collect();
    network.sort_by(|a, b| a.name.cmp(&b.name));

    let mut processes: Vec<TopProcess> = sys
        .processes()
        .values()
        .map(|p| TopProcess {
            pid: p.pid().as_u32(),
            name: p.name().to_string_lossy().into_owned(),
            cpu: p.cpu_usage(),
            memory_mib: p.memory() as f64 / MIB,
            command: p
                .cmd()
                .iter()
                .map(|arg| arg.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" "),
        })
        .collect();
    processes.sort_by(|a, b| b.cpu.total_cmp(&a.cpu));
    processes.truncate(TOP_PROCESSES);

    DetailedSystemInfo {
        cpu,
        memory,
        os: os_info(),
        disks,
        network,
        processes,
        timestamp: Utc::now(),
    }
}

/// Publishes a [`SystemInfo`] sample every interval.
pub struct TelemetryPoller {
    monitor: SystemMonitor,
    interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl TelemetryPoller {
    pub fn new(monitor: SystemMonitor, interval: Duration) -> Self {
        Self {
            monitor,
            interval,
            task: None,
        }
    }

    pub fn start<F>(&mut self, on_sample: F)
    where
        F: Fn(SystemInfo) + Send + 'static,
    {
        if self.task.is_some() {
            return;
        }

        let monitor = self.monitor.clone();
        let period = self.interval;

        self.task = Some(tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                match monitor.current_info().await {
                    Ok(info) => on_sample(info),
                    Err(e) => tracing::warn!(error = %e, "No telemetry sample available"),
                }
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for TelemetryPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_current_info_is_sane() {
        let monitor = SystemMonitor::new();
        let info = monitor.current_info().await.unwrap();

        assert!(info.cpu.cores >= 1);
        assert!(info.memory.total > 0.0);
        assert!(info.memory.usage_percent >= 0.0 && info.memory.usage_percent <= 100.0);
        assert_eq!(info.os.arch, std::env::consts::ARCH);
    }

    #[tokio::test]
    async fn test_detailed_info_caps_process_list() {
        let monitor = SystemMonitor::new();
        let info = monitor.detailed_info().await.unwrap();

        assert!(info.processes.len() <= TOP_PROCESSES);
        assert!(info.cpu.logical_cores >= 1);
        assert!(
            info.processes.windows(2).all(|w| w[0].cpu >= w[1].cpu),
            "processes must be sorted by cpu"
        );
    }

    #[test]
    fn test_gib_conversion() {
        assert_eq!(gib(1024 * 1024 * 1024), 1.0);
        assert_eq!(gib(0), 0.0);
    }
}
