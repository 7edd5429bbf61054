/*
 *  main.rs
 *
 *  lcdmon - smart screen monitor
 *	(c) 2020-26 Stuart Hunter
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

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;

use lcdmon::agentstat;
use lcdmon::config::{self, Cli, PanelSpec};
use lcdmon::display::{Compositor, Palette, ScreenFactory, StopHandle, SystemClock};
use lcdmon::dpms::DpmsWatcher;
use lcdmon::monitors::build_view;

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Waits for SIGINT, SIGTERM or SIGHUP and logs which one arrived.
async fn signal_handler() -> std::io::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

/// One synchronous monitor loop on a blocking thread
fn spawn_monitor(
    index: usize,
    panel: PanelSpec,
    agent_dir: PathBuf,
    follow_dpms: bool,
    stop: StopHandle,
) -> JoinHandle<anyhow::Result<()>> {
    tokio::task::spawn_blocking(move || {
        let pc = panel.panel_config();
        let kind = panel.monitor();
        info!("panel {index}: {kind} monitor on {}{}", pc.port, if panel.simulated() { " (simulated)" } else { "" });

        let screen = ScreenFactory::create(&pc, panel.simulated())
            .with_context(|| format!("panel {index}: connecting to {}", pc.port))?;
        let mut comp = Compositor::new(screen, build_view(kind, &agent_dir), Palette::default());
        if follow_dpms {
            comp = comp.with_dpms(DpmsWatcher::new());
        }
        comp.run(panel.interval(), &SystemClock, &stop)
            .with_context(|| format!("panel {index}: {kind} monitor"))
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli).context("loading configuration")?;

    if cli.dump_config {
        print!("{}", config::dump(&cfg)?);
        return Ok(());
    }

    let level = cfg.log_level.clone().unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();

    info!("{} smart screen monitor", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);

    let agent_dir = agentstat::status_dir(cfg.agent_status_dir.as_deref());
    let follow_dpms = cfg.follow_dpms();
    if follow_dpms {
        info!("following host DPMS state");
    }

    let mut stops = Vec::new();
    let mut handles = Vec::new();
    for (i, panel) in cfg.panels().iter().enumerate() {
        let stop = StopHandle::new();
        handles.push(spawn_monitor(i, panel.clone(), agent_dir.clone(), follow_dpms, stop.clone()));
        stops.push(stop);
    }

    // every loop checks its flag between ticks
    tokio::spawn(async move {
        if let Err(e) = signal_handler().await {
            warn!("signal handling unavailable: {e}");
            return;
        }
        for stop in &stops {
            stop.stop();
        }
    });

    let total = handles.len();
    let mut failed = 0;
    for handle in handles {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!("{e:#}");
                failed += 1;
            }
            Err(e) => {
                error!("monitor thread panicked: {e}");
                failed += 1;
            }
        }
    }

    if failed == total {
        bail!("no monitor could run");
    }
    info!("shutdown complete");
    Ok(())
}
