use std::path::{Path, PathBuf};

use sysinfo::{CpuRefreshKind, Disks, MemoryRefreshKind, Networks, RefreshKind, System};

use crate::core::profiler::{DiskUsage, HostMetrics, HostSource};
use crate::error::Result;

/// Machine-wide metrics from sysinfo.
pub struct SysinfoHost {
    system: System,
    disks: Disks,
    networks: Networks,
    disk_path: PathBuf,
}

impl SysinfoHost {
    /// `disk_path` selects the filesystem reported in `HostMetrics::disk`.
    pub fn new(disk_path: impl AsRef<Path>) -> Self {
        let system = System::new_with_specifics(
            RefreshKind::nothing()
                .with_cpu(CpuRefreshKind::nothing().with_frequency())
                .with_memory(MemoryRefreshKind::nothing().with_ram()),
        );
        let disk_path = disk_path.as_ref();
        let disk_path = disk_path
            .canonicalize()
            .unwrap_or_else(|_| disk_path.to_path_buf());

        Self {
            system,
            disks: Disks::new_with_refreshed_list(),
            networks: Networks::new_with_refreshed_list(),
            disk_path,
        }
    }

    fn disk_usage(&self) -> Option<DiskUsage> {
        let mounts = self
            .disks
            .list()
            .iter()
            .map(|disk| (disk.mount_point(), disk.total_space(), disk.available_space()));
        select_disk(&self.disk_path, mounts)
    }
}

impl HostSource for SysinfoHost {
    fn read(&mut self) -> Result<HostMetrics> {
        self.system.refresh_cpu_frequency();
        self.system.refresh_memory();
        self.disks.refresh(true);
        self.networks.refresh(true);

        // MHz, first core stands in for the package
        let cpu_frequency_hz = self
            .system
            .cpus()
            .first()
            .map(|cpu| cpu.frequency() * 1_000_000)
            .unwrap_or(0);

        let (network_bytes_sent, network_bytes_received) = self
            .networks
            .iter()
            .fold((0u64, 0u64), |(sent, received), (_, data)| {
                (
                    sent.saturating_add(data.total_transmitted()),
                    received.saturating_add(data.total_received()),
                )
            });

        Ok(HostMetrics {
            cpu_frequency_hz,
            memory_total_bytes: self.system.total_memory(),
            memory_used_bytes: self.system.used_memory(),
            disk: self.disk_usage(),
            network_bytes_sent,
            network_bytes_received,
        })
    }
}

/// Pick the mount with the longest prefix of `path`.
fn select_disk<'a>(
    path: &Path,
    mounts: impl Iterator<Item = (&'a Path, u64, u64)>,
) -> Option<DiskUsage> {
    mounts
        .filter(|(mount, _, _)| path.starts_with(mount))
        .max_by_key(|(mount, _, _)| mount.components().count())
        .map(|(mount, total, available)| DiskUsage {
            mount_point: mount.to_string_lossy().to_string(),
            total_bytes: total,
            used_bytes: total.saturating_sub(available),
            free_bytes: available,
        })
}
