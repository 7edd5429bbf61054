use serde::{Deserialize, Serialize};
use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use std::{fs, path::{Path, PathBuf}, time::Duration};
use thiserror::Error;

use crate::display::session::PanelConfig;
use crate::display::traits::Orientation;
use crate::monitors::MonitorKind;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

pub const DEFAULT_INTERVAL_MS: u64 = 1000;

/// Top-level app configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// General options
    pub log_level: Option<String>,     // e.g., "info" | "debug"
    /// AGENT_STATUS_DIR still wins when set
    pub agent_status_dir: Option<PathBuf>,
    /// blank panels while the host monitors sleep
    pub follow_dpms: Option<bool>,
    /// one entry per attached screen
    pub panels: Option<Vec<PanelSpec>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PanelSpec {
    pub monitor: Option<MonitorKind>,
    pub port: Option<String>,       // e.g. "/dev/ttyACM0"
    pub width: Option<u32>,         // physical, portrait
    pub height: Option<u32>,
    pub brightness: Option<u8>,     // 0-100
    pub orientation: Option<Orientation>,
    pub interval_ms: Option<u64>,
    pub simulated: Option<bool>,
}

impl PanelSpec {
    pub fn monitor(&self) -> MonitorKind {
        self.monitor.unwrap_or_default()
    }

    pub fn simulated(&self) -> bool {
        self.simulated.unwrap_or(false)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.unwrap_or(DEFAULT_INTERVAL_MS))
    }

    /// Session parameters, defaults filled in
    pub fn panel_config(&self) -> PanelConfig {
        let d = PanelConfig::default();
        PanelConfig {
            port: self.port.clone().unwrap_or(d.port),
            width: self.width.unwrap_or(d.width),
            height: self.height.unwrap_or(d.height),
            brightness: self.brightness.unwrap_or(d.brightness),
            orientation: self.orientation.unwrap_or(d.orientation),
        }
    }
}

impl Config {
    pub fn follow_dpms(&self) -> bool {
        self.follow_dpms.unwrap_or(true)
    }

    pub fn panels(&self) -> &[PanelSpec] {
        self.panels.as_deref().unwrap_or_default()
    }
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "lcdmon", version, about = "Smart screen system monitor")]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// shorthand for --log-level debug
    #[arg(short = 'v', long = "debug", action = ArgAction::SetTrue)]
    pub debug: bool,
    #[arg(long, value_enum)]
    pub monitor: Option<MonitorKind>,
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub port: Option<String>,
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub brightness: Option<u8>,
    /// portrait | landscape | reverse-portrait | reverse-landscape
    #[arg(long)]
    pub orientation: Option<Orientation>,
    #[arg(long)]
    pub interval_ms: Option<u64>,
    /// draw without hardware
    #[arg(long, action = ArgAction::SetTrue)]
    pub simulate: bool,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

impl Cli {
    fn has_panel_overrides(&self) -> bool {
        self.monitor.is_some()
            || self.port.is_some()
            || self.brightness.is_some()
            || self.orientation.is_some()
            || self.interval_ms.is_some()
            || self.simulate
    }
}

/// Public entry point: read YAML, merge CLI over it, validate.
pub fn load(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // nothing configured: one CPU screen on the default port
    if cfg.panels().is_empty() {
        cfg.panels = Some(vec![PanelSpec::default()]);
    }

    // 4) Validate
    validate(&cfg)?;
    Ok(cfg)
}

/// Pretty YAML of effective config (nice for debugging)
pub fn dump(cfg: &Config) -> Result<String, ConfigError> {
    Ok(serde_yaml::to_string(cfg)?)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/lcdmon/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/lcdmon/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/lcdmon.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["lcdmon.yaml", "config.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

pub fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option. A panel list replaces
/// the previous one wholesale.
fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some()        { dst.log_level = src.log_level; }
    if src.agent_status_dir.is_some() { dst.agent_status_dir = src.agent_status_dir; }
    if src.follow_dpms.is_some()      { dst.follow_dpms = src.follow_dpms; }
    if src.panels.is_some()           { dst.panels = src.panels; }
}

/// Panel flags land on the first panel, which is created if needed.
fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some()       { cfg.log_level = cli.log_level.clone(); }
    if cli.debug                     { cfg.log_level = Some("debug".into()); }

    if !cli.has_panel_overrides() {
        return;
    }
    let panels = cfg.panels.get_or_insert_with(Vec::new);
    if panels.is_empty() {
        panels.push(PanelSpec::default());
    }
    let panel = &mut panels[0];
    if cli.monitor.is_some()       { panel.monitor = cli.monitor; }
    if cli.port.is_some()          { panel.port = cli.port.clone(); }
    if cli.brightness.is_some()    { panel.brightness = cli.brightness; }
    if cli.orientation.is_some()   { panel.orientation = cli.orientation; }
    if cli.interval_ms.is_some()   { panel.interval_ms = cli.interval_ms; }
    if cli.simulate                { panel.simulated = Some(true); }
}

/// Put any invariants here (required fields, ranges, etc.)
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    let mut ports: Vec<String> = Vec::new();
    for (i, panel) in cfg.panels().iter().enumerate() {
        if panel.width == Some(0) || panel.height == Some(0) {
            return Err(ConfigError::Validation(format!("panel {i}: width/height must be > 0")));
        }
        if let Some(b) = panel.brightness {
            if b > 100 {
                return Err(ConfigError::Validation(format!("panel {i}: brightness must be 0..=100")));
            }
        }
        if panel.interval_ms == Some(0) {
            return Err(ConfigError::Validation(format!("panel {i}: interval_ms must be > 0")));
        }
        // one session per serial channel
        if !panel.simulated() {
            let port = panel.panel_config().port;
            if ports.contains(&port) {
                return Err(ConfigError::Validation(format!("panel {i}: port {port} is used by another panel")));
            }
            ports.push(port);
        }
    }
    Ok(())
}
