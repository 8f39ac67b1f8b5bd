//! 主机状态：CPU、内存、根分区磁盘占用，用于 /status 回复

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use sysinfo::{Disks, System};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostSnapshot {
    pub cpu_usage: f32,
    pub memory_used: u64,
    pub memory_total: u64,
    pub disk_used: u64,
    pub disk_total: u64,
}

impl std::fmt::Display for HostSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "CPU: {:.1}%", self.cpu_usage)?;
        writeln!(
            f,
            "RAM: {} / {}",
            human_bytes(self.memory_used),
            human_bytes(self.memory_total)
        )?;
        write!(
            f,
            "Disk (/): {} / {}",
            human_bytes(self.disk_used),
            human_bytes(self.disk_total)
        )
    }
}

pub fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[async_trait]
pub trait HostProbe: Send + Sync {
    async fn snapshot(&self) -> HostSnapshot;
}

/// sysinfo 实现
#[derive(Debug, Default)]
pub struct SysinfoProbe;

#[async_trait]
impl HostProbe for SysinfoProbe {
    /// sysinfo 读取 /proc 等为阻塞调用，放在 spawn_blocking 中执行
    async fn snapshot(&self) -> HostSnapshot {
        let first = tokio::task::spawn_blocking(|| {
            let mut sys = System::new();
            sys.refresh_cpu();
            sys
        })
        .await;
        let sys = match first {
            Ok(sys) => sys,
            Err(e) => {
                tracing::warn!(error = %e, "host sampling task failed");
                return HostSnapshot::default();
            }
        };

        // 两次采样之间需要间隔，CPU 占用率才有意义
        tokio::time::sleep(Duration::from_millis(250)).await;

        match tokio::task::spawn_blocking(move || finish_sample(sys)).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "host sampling task failed");
                HostSnapshot::default()
            }
        }
    }
}

fn finish_sample(mut sys: System) -> HostSnapshot {
    sys.refresh_cpu();
    sys.refresh_memory();

    let disks = Disks::new_with_refreshed_list();
    let root = disks
        .iter()
        .find(|d| d.mount_point() == Path::new("/"))
        .or_else(|| disks.iter().next());
    let (disk_total, disk_available) = root
        .map(|d| (d.total_space(), d.available_space()))
        .unwrap_or((0, 0));

    HostSnapshot {
        cpu_usage: sys.global_cpu_info().cpu_usage(),
        memory_used: sys.used_memory(),
        memory_total: sys.total_memory(),
        disk_used: disk_total.saturating_sub(disk_available),
        disk_total,
    }
}
