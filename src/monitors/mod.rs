/*
 *  monitors/mod.rs
 *
 *  lcdmon - smart screen monitor
 *  (c) 2020-26 Stuart Hunter
 *
 *  The CPU, RAM and agent status screens
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::agentstat::StatusDir;
use crate::display::compositor::View;
use crate::metrics::ProcMetrics;

pub mod agent;
pub mod cpu;
pub mod ram;

pub use agent::AgentView;
pub use cpu::CpuView;
pub use ram::RamView;

/// Which screen a panel shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MonitorKind {
    #[default]
    Cpu,
    Ram,
    Agent,
}

impl std::fmt::Display for MonitorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MonitorKind::Cpu => "cpu",
            MonitorKind::Ram => "ram",
            MonitorKind::Agent => "agent",
        };
        f.write_str(s)
    }
}

/// Build the view for a panel, wired to the live system sources
pub fn build_view(kind: MonitorKind, agent_status_dir: &Path) -> Box<dyn View> {
    match kind {
        MonitorKind::Cpu => Box::new(CpuView::new(ProcMetrics::new())),
        MonitorKind::Ram => Box::new(RamView::new(ProcMetrics::new())),
        MonitorKind::Agent => Box::new(AgentView::new(StatusDir::new(agent_status_dir))),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::display::color::Palette;
    use crate::display::compositor::{Compositor, TickOutcome, View};
    use crate::display::drivers::mock::MockScreen;
    use crate::display::region::Region;

    /// Landscape Rev A panel compositor around a view
    pub fn compositor<V: View>(view: V) -> (Compositor<MockScreen, V>, MockScreen) {
        let screen = MockScreen::new(480, 320);
        (Compositor::new(screen.clone(), view, Palette::default()), screen)
    }

    /// Run one tick and return the rectangles it pushed
    pub fn tick_draws<V: View>(comp: &mut Compositor<MockScreen, V>, screen: &MockScreen) -> Vec<Region> {
        screen.reset_state();
        match comp.tick() {
            TickOutcome::Drawn(_) => screen.draws(),
            other => panic!("unexpected tick outcome {other:?}"),
        }
    }
}
