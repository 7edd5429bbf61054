/*
 *  metrics.rs
 *
 *  lcdmon - smart screen monitor
 *	(c) 2020-26 Stuart Hunter
 *
 *	CPU, memory and process metrics from /proc and /sys
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */
//! System metrics gathered from /proc and /sys files.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::display::error::MetricsError;

/// Snapshot of CPU state
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CpuInfo {
    pub per_cpu: Vec<f64>,
    pub overall: f64,
    /// GHz
    pub freq: f64,
    pub load1: f64,
    pub load5: f64,
    pub load15: f64,
    /// Celsius, 0 if unavailable
    pub temp: f64,
    pub core_count: usize,
}

/// Memory and swap, in bytes
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct MemInfo {
    pub total: u64,
    pub used: u64,
    pub available: u64,
    pub used_percent: f64,
    pub swap_total: u64,
    pub swap_used: u64,
    pub swap_percent: f64,
}

/// Resident memory of a family of processes
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessGroup {
    pub name: String,
    pub rss: u64,
    pub percent: f64,
    pub count: usize,
}

/// Where monitors get their numbers from
pub trait MetricsSource: Send {
    fn cpu(&mut self) -> Result<CpuInfo, MetricsError>;
    fn memory(&mut self) -> Result<MemInfo, MetricsError>;
    fn top_processes(&mut self, n: usize) -> Result<Vec<ProcessGroup>, MetricsError>;
}

/// Jiffy counters for one `cpu` line of /proc/stat
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CpuTimes {
    pub total: u64,
    pub idle: u64,
}

impl CpuTimes {
    /// Busy percentage between two samples
    pub fn usage_since(&self, prev: &CpuTimes) -> f64 {
        let total = self.total.saturating_sub(prev.total);
        if total == 0 {
            return 0.0;
        }
        let idle = self.idle.saturating_sub(prev.idle);
        (total.saturating_sub(idle)) as f64 / total as f64 * 100.0
    }
}

/// Aggregate line first, then one entry per core
pub fn parse_stat(content: &str) -> Vec<CpuTimes> {
    content
        .lines()
        .filter(|l| l.starts_with("cpu"))
        .map(|line| {
            // user nice system idle iowait irq softirq steal; guest is already in user
            let fields: Vec<u64> = line
                .split_whitespace()
                .skip(1)
                .take(8)
                .map(|f| f.parse().unwrap_or(0))
                .collect();
            let idle = fields.get(3).copied().unwrap_or(0) + fields.get(4).copied().unwrap_or(0);
            CpuTimes { total: fields.iter().sum(), idle }
        })
        .collect()
}

/// (load1, load5, load15)
pub fn parse_loadavg(content: &str) -> Option<(f64, f64, f64)> {
    let mut it = content.split_whitespace().map(|f| f.parse::<f64>().ok());
    Some((it.next()??, it.next()??, it.next()??))
}

/// First core's "cpu MHz", in GHz
pub fn parse_cpu_mhz(content: &str) -> Option<f64> {
    content
        .lines()
        .find(|l| l.starts_with("cpu MHz"))
        .and_then(|l| l.split(':').nth(1))
        .and_then(|v| v.trim().parse::<f64>().ok())
        .map(|mhz| mhz / 1000.0)
}

pub fn parse_meminfo(content: &str) -> MemInfo {
    let mut kb: HashMap<&str, u64> = HashMap::new();
    for line in content.lines() {
        if let Some((key, rest)) = line.split_once(':') {
            if let Some(v) = rest.split_whitespace().next().and_then(|v| v.parse().ok()) {
                kb.insert(key, v);
            }
        }
    }
    let get = |k: &str| kb.get(k).copied().unwrap_or(0) * 1024;

    let total = get("MemTotal");
    let available = match kb.get("MemAvailable") {
        Some(v) => v * 1024,
        None => get("MemFree") + get("Buffers") + get("Cached"),
    };
    let used = total.saturating_sub(available);
    let swap_total = get("SwapTotal");
    let swap_used = swap_total.saturating_sub(get("SwapFree"));

    MemInfo {
        total,
        used,
        available,
        used_percent: percent(used, total),
        swap_total,
        swap_used,
        swap_percent: percent(swap_used, swap_total),
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 { 0.0 } else { part as f64 / whole as f64 * 100.0 }
}

const CPU_SENSORS: [&str; 4] = ["coretemp", "k10temp", "cpu_thermal", "zenpower"];

/// Family a process name is counted under
pub fn process_group(name: &str) -> &str {
    match name {
        "chrome" | "chromium" | "Chrome" | "Chromium" => "chrome",
        "firefox" | "Firefox" | "firefox-esr" => "firefox",
        "code" | "Code" | "code-oss" => "code",
        "electron" | "Electron" => "electron",
        "slack" | "Slack" => "slack",
        "discord" | "Discord" => "discord",
        "spotify" | "Spotify" => "spotify",
        "cursor" | "Cursor" => "cursor",
        "crush" | "Crush" => "crush",
        "node" | "nodejs" | "Node" => "node",
        "python" | "python3" | "Python" => "python",
        "java" | "Java" => "java",
        "rust-analyzer" => "rust-analyzer",
        "gopls" => "gopls",
        "docker" | "dockerd" | "containerd" => "docker",
        n if n.starts_with("gnome-") => "gnome",
        n if n.starts_with("systemd") => "systemd",
        n => n,
    }
}

/// Sum (name, rss) pairs by family, largest first, at most `n`
pub fn group_processes<'a, I>(procs: I, total_mem: u64, n: usize) -> Vec<ProcessGroup>
where
    I: IntoIterator<Item = (&'a str, u64)>,
{
    let mut groups: HashMap<&str, ProcessGroup> = HashMap::new();
    for (name, rss) in procs {
        let family = process_group(name);
        let g = groups.entry(family).or_insert_with(|| ProcessGroup {
            name: family.to_string(),
            rss: 0,
            percent: 0.0,
            count: 0,
        });
        g.rss += rss;
        g.count += 1;
    }

    let mut result: Vec<ProcessGroup> = groups
        .into_values()
        .map(|mut g| {
            g.percent = percent(g.rss, total_mem);
            g
        })
        .collect();
    result.sort_by(|a, b| b.rss.cmp(&a.rss).then_with(|| a.name.cmp(&b.name)));
    result.truncate(n);
    result
}

/// Human-readable size: B, K and M rounded, G to one decimal
pub fn format_bytes(b: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    match b {
        b if b >= GB => format!("{:.1}G", b as f64 / GB as f64),
        b if b >= MB => format!("{}M", (b as f64 / MB as f64).round() as u64),
        b if b >= KB => format!("{}K", (b as f64 / KB as f64).round() as u64),
        b => format!("{b}B"),
    }
}

fn page_size() -> u64 {
    // SAFETY: sysconf has no preconditions
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 { size as u64 } else { 4096 }
}

/// Live metrics from the running kernel
pub struct ProcMetrics {
    proc_root: PathBuf,
    sys_root: PathBuf,
    prev: Option<Vec<CpuTimes>>,
    page_size: u64,
}

impl ProcMetrics {
    pub fn new() -> Self {
        Self::with_roots("/proc", "/sys")
    }

    /// Read from alternate trees (tests, containers with a host /proc mount)
    pub fn with_roots(proc_root: impl Into<PathBuf>, sys_root: impl Into<PathBuf>) -> Self {
        Self { proc_root: proc_root.into(), sys_root: sys_root.into(), prev: None, page_size: page_size() }
    }

    fn read(&self, path: &Path) -> Result<String, MetricsError> {
        fs::read_to_string(path).map_err(|e| MetricsError::read(path.display().to_string(), e))
    }

    /// Celsius from hwmon, preferring CPU package sensors, else thermal_zone0
    fn temperature(&self) -> f64 {
        let read_milli = |p: PathBuf| -> Option<f64> {
            fs::read_to_string(p).ok()?.trim().parse::<f64>().ok().map(|m| m / 1000.0)
        };

        let mut sensors: Vec<(String, f64)> = Vec::new();
        if let Ok(entries) = fs::read_dir(self.sys_root.join("class/hwmon")) {
            let mut dirs: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
            dirs.sort();
            for dir in dirs {
                let name = fs::read_to_string(dir.join("name")).unwrap_or_default().trim().to_string();
                if let Some(t) = read_milli(dir.join("temp1_input")) {
                    sensors.push((name, t));
                }
            }
        }

        if let Some((_, t)) = sensors.iter().find(|(n, _)| CPU_SENSORS.contains(&n.as_str())) {
            return *t;
        }
        if let Some((_, t)) = sensors.first() {
            return *t;
        }
        read_milli(self.sys_root.join("class/thermal/thermal_zone0/temp")).unwrap_or(0.0)
    }
}

impl Default for ProcMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSource for ProcMetrics {
    fn cpu(&mut self) -> Result<CpuInfo, MetricsError> {
        let stat_path = self.proc_root.join("stat");
        let times = parse_stat(&self.read(&stat_path)?);
        if times.len() < 2 {
            return Err(MetricsError::parse(stat_path.display().to_string(), "no per-cpu lines"));
        }

        let usage: Vec<f64> = match &self.prev {
            Some(prev) if prev.len() == times.len() => {
                times.iter().zip(prev).map(|(cur, old)| cur.usage_since(old)).collect()
            }
            // first sample, or a CPU went offline
            _ => vec![0.0; times.len()],
        };
        self.prev = Some(times);

        let mut info = CpuInfo {
            overall: usage[0],
            per_cpu: usage[1..].to_vec(),
            ..CpuInfo::default()
        };
        info.core_count = info.per_cpu.len();

        if let Ok(s) = fs::read_to_string(self.proc_root.join("cpuinfo")) {
            info.freq = parse_cpu_mhz(&s).unwrap_or(0.0);
        }
        if let Some((l1, l5, l15)) = fs::read_to_string(self.proc_root.join("loadavg")).ok().as_deref().and_then(parse_loadavg) {
            info.load1 = l1;
            info.load5 = l5;
            info.load15 = l15;
        }
        info.temp = self.temperature();
        Ok(info)
    }

    fn memory(&mut self) -> Result<MemInfo, MetricsError> {
        let path = self.proc_root.join("meminfo");
        let info = parse_meminfo(&self.read(&path)?);
        if info.total == 0 {
            return Err(MetricsError::parse(path.display().to_string(), "MemTotal missing"));
        }
        Ok(info)
    }

    fn top_processes(&mut self, n: usize) -> Result<Vec<ProcessGroup>, MetricsError> {
        let total = self.memory()?.total;
        let entries = fs::read_dir(&self.proc_root)
            .map_err(|e| MetricsError::read(self.proc_root.display().to_string(), e))?;

        let mut procs: Vec<(String, u64)> = Vec::new();
        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Some(pid) = file_name.to_str().filter(|s| s.bytes().all(|b| b.is_ascii_digit())) else {
                continue;
            };
            // processes exit between listing and reading; skip them
            let dir = self.proc_root.join(pid);
            let Ok(comm) = fs::read_to_string(dir.join("comm")) else { continue };
            let Ok(statm) = fs::read_to_string(dir.join("statm")) else { continue };
            let Some(pages) = statm.split_whitespace().nth(1).and_then(|v| v.parse::<u64>().ok()) else {
                continue;
            };
            procs.push((comm.trim().to_string(), pages * self.page_size));
        }
        debug!("scanned {} processes", procs.len());

        Ok(group_processes(procs.iter().map(|(n, r)| (n.as_str(), *r)), total, n))
    }
}
