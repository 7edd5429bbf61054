/*
 *  dpms.rs
 *
 *  lcdmon - smart screen monitor
 *	(c) 2020-26 Stuart Hunter
 *
 *	Host monitor power state from DRM, so panels can sleep with them
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

use std::fs;
use std::path::Path;

use log::debug;

const DRM_CLASS: &str = "/sys/class/drm";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DpmsState {
    On,
    Standby,
    Suspend,
    Off,
    Unknown,
}

impl DpmsState {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "On" => DpmsState::On,
            "Standby" => DpmsState::Standby,
            "Suspend" => DpmsState::Suspend,
            "Off" => DpmsState::Off,
            _ => DpmsState::Unknown,
        }
    }

    pub fn is_asleep(self) -> bool {
        matches!(self, DpmsState::Standby | DpmsState::Suspend | DpmsState::Off)
    }
}

/// Combine per-connector states: any On wins, otherwise any sleeping
/// connector means Off
pub fn combine<I: IntoIterator<Item = DpmsState>>(states: I) -> DpmsState {
    let mut any_asleep = false;
    for s in states {
        if s == DpmsState::On {
            return DpmsState::On;
        }
        any_asleep |= s.is_asleep();
    }
    if any_asleep { DpmsState::Off } else { DpmsState::Unknown }
}

/// Read every `card*-*/dpms` under a DRM class directory
pub fn state_in(drm_class: &Path) -> DpmsState {
    let Ok(entries) = fs::read_dir(drm_class) else {
        return DpmsState::Unknown;
    };
    let states = entries
        .flatten()
        .filter(|e| {
            let name = e.file_name();
            let name = name.to_string_lossy();
            name.starts_with("card") && name.contains('-')
        })
        .filter_map(|e| fs::read_to_string(e.path().join("dpms")).ok())
        .map(|s| DpmsState::parse(&s));
    combine(states)
}

pub fn current_state() -> DpmsState {
    state_in(Path::new(DRM_CLASS))
}

/// Reports DPMS transitions, ignoring Unknown readings
pub struct DpmsWatcher {
    probe: Box<dyn FnMut() -> DpmsState + Send>,
    last: DpmsState,
}

impl DpmsWatcher {
    pub fn new() -> Self {
        Self::with_probe(current_state)
    }

    pub fn with_probe<F>(mut probe: F) -> Self
    where
        F: FnMut() -> DpmsState + Send + 'static,
    {
        let last = probe();
        debug!("initial dpms state {:?}", last);
        Self { probe: Box::new(probe), last }
    }

    pub fn last(&self) -> DpmsState {
        self.last
    }

    /// Poll once; returns the new state when it changed
    pub fn poll(&mut self) -> Option<DpmsState> {
        let state = (self.probe)();
        if state != self.last && state != DpmsState::Unknown {
            self.last = state;
            return Some(state);
        }
        None
    }
}

impl Default for DpmsWatcher {
    fn default() -> Self {
        Self::new()
    }
}
