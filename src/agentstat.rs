/*
 *  agentstat.rs
 *
 *  lcdmon - smart screen monitor
 *	(c) 2020-26 Stuart Hunter
 *
 *	Coding agent status files: reading, validation and cleanup
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

//! Each agent writes one JSON file into a shared directory and rewrites it
//! as it works; readers treat the directory as a snapshot.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SCHEMA_VERSION: i64 = 1;

pub const VALID_STATUSES: [&str; 7] = ["idle", "thinking", "working", "waiting", "error", "done", "paused"];

pub const VALID_PROVIDERS: [&str; 8] = ["anthropic", "openai", "bedrock", "vertex", "ollama", "local", "azure", "google"];

/// Older than this and a record is shown dimmed
pub const FRESH_THRESHOLD: Duration = Duration::from_secs(60);

/// Older than this and a record is not shown at all
pub const STALE_THRESHOLD: Duration = Duration::from_secs(300);

const MAX_RECENT_TOOLS: usize = 10;

#[derive(Debug, Error)]
pub enum AgentStatusError {
    #[error("{field}: {reason}")]
    Validation { field: String, reason: &'static str },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: invalid JSON: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn invalid(field: impl Into<String>, reason: &'static str) -> AgentStatusError {
    AgentStatusError::Validation { field: field.into(), reason }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolsInfo {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub active: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recent: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub counts: HashMap<String, i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokensInfo {
    pub input: i64,
    pub output: i64,
    pub cache_read: i64,
    pub cache_write: i64,
}

/// One agent's published status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentStatus {
    #[serde(rename = "v")]
    pub version: i64,
    pub agent: String,
    pub instance: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<i64>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub project: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cwd: String,
    pub status: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub task: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub model: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokensInfo>,
    pub cost_usd: f64,
    pub started: i64,
    /// Unix seconds
    pub updated: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,

    #[serde(skip)]
    pub age: Duration,
    #[serde(skip)]
    pub stale: bool,
    #[serde(skip)]
    pub file: PathBuf,
}

fn is_agent_id(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

impl AgentStatus {
    /// First schema violation, if any
    pub fn validate(&self) -> Result<(), AgentStatusError> {
        match self.validate_all().into_iter().next() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Every schema violation, in field order
    pub fn validate_all(&self) -> Vec<AgentStatusError> {
        let mut errs = Vec::new();

        match self.version {
            0 => errs.push(invalid("v", "missing required field")),
            SCHEMA_VERSION => {}
            _ => errs.push(invalid("v", "unsupported schema version")),
        }
        if self.agent.is_empty() {
            errs.push(invalid("agent", "missing required field"));
        } else if !is_agent_id(&self.agent) {
            errs.push(invalid("agent", "must be lowercase and start with a letter"));
        }
        if self.instance.is_empty() {
            errs.push(invalid("instance", "missing required field"));
        }
        if self.status.is_empty() {
            errs.push(invalid("status", "missing required field"));
        } else if !VALID_STATUSES.contains(&self.status.as_str()) {
            errs.push(invalid("status", "invalid status value"));
        }
        if self.updated == 0 {
            errs.push(invalid("updated", "missing required field"));
        } else if self.updated < 0 {
            errs.push(invalid("updated", "must be a positive timestamp"));
        }

        if self.pid.is_some_and(|p| p < 0) {
            errs.push(invalid("pid", "must be positive if provided"));
        }
        if !self.provider.is_empty() && !VALID_PROVIDERS.contains(&self.provider.as_str()) {
            errs.push(invalid("provider", "invalid provider value"));
        }
        if self.cost_usd < 0.0 {
            errs.push(invalid("cost_usd", "must be non-negative"));
        }
        if self.started < 0 {
            errs.push(invalid("started", "must be non-negative"));
        }

        if let Some(tools) = &self.tools {
            if tools.recent.len() > MAX_RECENT_TOOLS {
                errs.push(invalid("tools.recent", "exceeds maximum of 10 items"));
            }
            let mut negative: Vec<&String> =
                tools.counts.iter().filter(|(_, c)| **c < 0).map(|(name, _)| name).collect();
            negative.sort();
            for name in negative {
                errs.push(invalid(format!("tools.counts.{name}"), "must be non-negative"));
            }
        }
        if let Some(t) = &self.tokens {
            for (field, v) in [
                ("tokens.input", t.input),
                ("tokens.output", t.output),
                ("tokens.cache_read", t.cache_read),
                ("tokens.cache_write", t.cache_write),
            ] {
                if v < 0 {
                    errs.push(invalid(field, "must be non-negative"));
                }
            }
        }
        errs
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// `AGENT_STATUS_DIR`, else the configured directory, else `~/.agent-status`
pub fn status_dir(configured: Option<&Path>) -> PathBuf {
    if let Some(dir) = std::env::var_os("AGENT_STATUS_DIR").filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    if let Some(dir) = configured {
        return dir.to_path_buf();
    }
    dirs_next::home_dir().unwrap_or_default().join(".agent-status")
}

fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn json_files(dir: &Path) -> Result<Vec<PathBuf>, AgentStatusError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => return Err(AgentStatusError::Io { path: dir.to_path_buf(), source }),
    };
    Ok(entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|x| x == "json"))
        .collect())
}

fn load(path: &Path) -> Result<AgentStatus, AgentStatusError> {
    let data = fs::read(path).map_err(|source| AgentStatusError::Io { path: path.to_path_buf(), source })?;
    serde_json::from_slice(&data).map_err(|source| AgentStatusError::Json { path: path.to_path_buf(), source })
}

/// Valid records no older than `max_age`, most recently updated first.
///
/// A missing directory yields no records; unreadable or invalid files are
/// skipped.
pub fn read_all(dir: &Path, max_age: Duration) -> Result<Vec<AgentStatus>, AgentStatusError> {
    read_all_at(dir, max_age, unix_now())
}

/// [`read_all`] against a fixed "now" in unix seconds
pub fn read_all_at(dir: &Path, max_age: Duration, now: i64) -> Result<Vec<AgentStatus>, AgentStatusError> {
    let mut statuses = Vec::new();
    for path in json_files(dir)? {
        let mut s = match load(&path).and_then(|s| s.validate().map(|_| s)) {
            Ok(s) => s,
            Err(e) => {
                debug!("skipping agent status {}: {}", path.display(), e);
                continue;
            }
        };
        let age = Duration::from_secs(now.saturating_sub(s.updated).max(0) as u64);
        if age > max_age {
            continue;
        }
        s.age = age;
        s.stale = age > FRESH_THRESHOLD;
        s.file = path;
        statuses.push(s);
    }
    statuses.sort_by(|a, b| b.updated.cmp(&a.updated));
    Ok(statuses)
}

/// Remove unreadable, malformed or expired status files; returns how many
pub fn cleanup(dir: &Path, max_age: Duration) -> Result<usize, AgentStatusError> {
    cleanup_at(dir, max_age, unix_now())
}

pub fn cleanup_at(dir: &Path, max_age: Duration, now: i64) -> Result<usize, AgentStatusError> {
    let mut removed = 0;
    for path in json_files(dir)? {
        let expired = match load(&path) {
            Ok(s) => now.saturating_sub(s.updated) > max_age.as_secs() as i64,
            Err(_) => true,
        };
        if expired && fs::remove_file(&path).is_ok() {
            removed += 1;
        }
    }
    if removed > 0 {
        info!("removed {} expired agent status files from {}", removed, dir.display());
    }
    Ok(removed)
}

/// Token count with k/M suffix, truncated to one decimal
pub fn format_tokens(count: i64) -> String {
    let tenths = |unit: i64| {
        let t = count / (unit / 10);
        format!("{}.{}", t / 10, t % 10)
    };
    match count {
        c if c >= 1_000_000 => format!("{}M", tenths(1_000_000)),
        c if c >= 1_000 => format!("{}k", tenths(1_000)),
        c => c.to_string(),
    }
}

/// Dollars; sub-cent amounts keep three decimals
pub fn format_cost(cost: f64) -> String {
    if cost < 0.01 { format!("${cost:.3}") } else { format!("${cost:.2}") }
}

/// Where the agent monitor gets its rows from
pub trait AgentSource: Send {
    fn agents(&mut self) -> Result<Vec<AgentStatus>, AgentStatusError>;

    /// Housekeeping hook, called every few minutes
    fn cleanup(&mut self) {}
}

/// Reads a status directory on every call
#[derive(Debug, Clone)]
pub struct StatusDir {
    dir: PathBuf,
    max_age: Duration,
    cleanup_age: Duration,
}

impl StatusDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), max_age: STALE_THRESHOLD, cleanup_age: Duration::from_secs(3600) }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }
}

impl AgentSource for StatusDir {
    fn agents(&mut self) -> Result<Vec<AgentStatus>, AgentStatusError> {
        read_all(&self.dir, self.max_age)
    }

    fn cleanup(&mut self) {
        if let Err(e) = cleanup(&self.dir, self.cleanup_age) {
            debug!("agent status cleanup failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_750_000_000;

    fn minimal() -> AgentStatus {
        AgentStatus {
            version: 1,
            agent: "test".into(),
            instance: "abc123".into(),
            status: "idle".into(),
            updated: NOW,
            ..AgentStatus::default()
        }
    }

    fn field_of(s: &AgentStatus) -> Option<String> {
        match s.validate() {
            Err(AgentStatusError::Validation { field, .. }) => Some(field),
            _ => None,
        }
    }

    #[test]
    fn test_required_fields_in_order() {
        let mut s = AgentStatus::default();
        assert_eq!(field_of(&s).as_deref(), Some("v"));
        s.version = 1;
        assert_eq!(field_of(&s).as_deref(), Some("agent"));
        s.agent = "test".into();
        assert_eq!(field_of(&s).as_deref(), Some("instance"));
        s.instance = "abc".into();
        assert_eq!(field_of(&s).as_deref(), Some("status"));
        s.status = "idle".into();
        assert_eq!(field_of(&s).as_deref(), Some("updated"));
        s.updated = NOW;
        assert!(s.is_valid());
    }

    #[test]
    fn test_field_rules() {
        let cases: &[(&str, fn(&mut AgentStatus))] = &[
            ("v", |s| s.version = 2),
            ("agent", |s| s.agent = "Claude".into()),
            ("agent", |s| s.agent = "1agent".into()),
            ("status", |s| s.status = "sleeping".into()),
            ("updated", |s| s.updated = -5),
            ("pid", |s| s.pid = Some(-1)),
            ("provider", |s| s.provider = "acme".into()),
            ("cost_usd", |s| s.cost_usd = -0.5),
            ("tools.recent", |s| {
                s.tools = Some(ToolsInfo { recent: vec!["Read".into(); 11], ..ToolsInfo::default() })
            }),
            ("tokens.output", |s| s.tokens = Some(TokensInfo { output: -1, ..TokensInfo::default() })),
        ];
        for (field, mutate) in cases {
            let mut s = minimal();
            mutate(&mut s);
            assert_eq!(field_of(&s).as_deref(), Some(*field));
        }

        let mut s = minimal();
        s.agent = "claude-code".into();
        s.provider = "anthropic".into();
        assert!(s.is_valid());
    }

    #[test]
    fn test_validate_all_collects_every_violation() {
        let fields = |s: &AgentStatus| -> Vec<String> {
            s.validate_all()
                .into_iter()
                .filter_map(|e| match e {
                    AgentStatusError::Validation { field, .. } => Some(field),
                    _ => None,
                })
                .collect()
        };

        assert_eq!(fields(&AgentStatus::default()), ["v", "agent", "instance", "status", "updated"]);
        assert!(minimal().validate_all().is_empty());

        let mut s = minimal();
        s.cost_usd = -1.0;
        s.tokens = Some(TokensInfo { input: -1, cache_write: -3, ..TokensInfo::default() });
        s.tools = Some(ToolsInfo {
            counts: [("Read".to_string(), -1), ("Edit".to_string(), -2), ("Bash".to_string(), 4)].into(),
            ..ToolsInfo::default()
        });
        assert_eq!(
            fields(&s),
            ["cost_usd", "tools.counts.Edit", "tools.counts.Read", "tokens.input", "tokens.cache_write"]
        );
        assert_eq!(field_of(&s).as_deref(), Some("cost_usd"));
    }

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    fn record(agent: &str, status: &str, updated: i64) -> String {
        format!(r#"{{"v":1,"agent":"{agent}","instance":"i-{agent}","status":"{status}","updated":{updated},"model":"claude-sonnet-4"}}"#)
    }

    #[test]
    fn test_read_all_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.json", &record("alpha", "working", NOW - 10));
        write(dir.path(), "b.json", &record("beta", "thinking", NOW - 2));
        write(dir.path(), "c.json", &record("gamma", "idle", NOW - 120));
        write(dir.path(), "d.json", &record("delta", "done", NOW - 400));
        write(dir.path(), "e.json", "{ not json");
        write(dir.path(), "f.json", &record("Bad", "idle", NOW));
        write(dir.path(), "notes.txt", &record("txt", "idle", NOW));

        let all = read_all_at(dir.path(), STALE_THRESHOLD, NOW).unwrap();
        let names: Vec<&str> = all.iter().map(|s| s.agent.as_str()).collect();
        assert_eq!(names, ["beta", "alpha", "gamma"]);
        assert!(!all[0].stale);
        assert!(all[2].stale);
        assert_eq!(all[2].age, Duration::from_secs(120));
        assert_eq!(all[1].file, dir.path().join("a.json"));
        assert_eq!(all[1].model, "claude-sonnet-4");
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let all = read_all_at(Path::new("/nonexistent/agent-status"), STALE_THRESHOLD, NOW).unwrap();
        assert!(all.is_empty());
    }

    #[test]
    fn test_cleanup_removes_expired_and_malformed() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "fresh.json", &record("alpha", "working", NOW - 10));
        write(dir.path(), "old.json", &record("beta", "done", NOW - 7200));
        write(dir.path(), "broken.json", "[");
        write(dir.path(), "keep.txt", "[");

        let removed = cleanup_at(dir.path(), Duration::from_secs(3600), NOW).unwrap();
        assert_eq!(removed, 2);
        assert!(dir.path().join("fresh.json").exists());
        assert!(!dir.path().join("old.json").exists());
        assert!(!dir.path().join("broken.json").exists());
        assert!(dir.path().join("keep.txt").exists());
    }

    #[test]
    fn test_formatters() {
        assert_eq!(format_tokens(999), "999");
        assert_eq!(format_tokens(1_250), "1.2k");
        assert_eq!(format_tokens(45_000), "45.0k");
        assert_eq!(format_tokens(2_560_000), "2.5M");
        assert_eq!(format_cost(0.004), "$0.004");
        assert_eq!(format_cost(1.5), "$1.50");
    }
}
