/*
 *  display/error.rs
 *
 *  lcdmon - smart screen monitor
 *  (c) 2020-26 Stuart Hunter
 *
 *  Error types for the panel transport and render loop
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

use std::io;
use thiserror::Error;

use super::region::Region;

/// Which step of the open sequence failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenStep {
    OpenPort,
    Handshake,
    Reset,
    Reopen,
    Orientation,
    Brightness,
    ScreenOn,
}

impl std::fmt::Display for OpenStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OpenStep::OpenPort => "open port",
            OpenStep::Handshake => "handshake",
            OpenStep::Reset => "reset",
            OpenStep::Reopen => "reopen after reset",
            OpenStep::Orientation => "set orientation",
            OpenStep::Brightness => "set brightness",
            OpenStep::ScreenOn => "screen on",
        };
        f.write_str(s)
    }
}

/// Failure while opening the panel; fatal to that open attempt
#[derive(Debug, Error)]
#[error("panel {port}: {step} failed: {source}")]
pub struct ConnectionError {
    pub port: String,
    pub step: OpenStep,
    #[source]
    pub source: io::Error,
}

/// Failure while talking to an open panel
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("panel is not open")]
    NotOpen,

    #[error("write failed: {0}")]
    Io(#[from] io::Error),

    #[error("region {region} outside {width}x{height} panel")]
    OutOfBounds { region: Region, width: u32, height: u32 },

    #[error("pixel count mismatch: expected {expected}, got {actual}")]
    PixelCountMismatch { expected: usize, actual: usize },
}

/// Failure producing a metrics or agent snapshot
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("reading {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("parsing {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("agent status: {0}")]
    Agents(#[from] crate::agentstat::AgentStatusError),

    #[error("{0}")]
    Other(String),
}

impl MetricsError {
    pub fn read(path: impl Into<String>, source: io::Error) -> Self {
        MetricsError::Read { path: path.into(), source }
    }

    pub fn parse(path: impl Into<String>, reason: impl Into<String>) -> Self {
        MetricsError::Parse { path: path.into(), reason: reason.into() }
    }
}

/// What stopped a monitor's run loop
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("initial draw failed: {0}")]
    InitialDraw(#[source] TransportError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),
}
