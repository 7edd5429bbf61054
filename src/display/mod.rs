/*
 *  display/mod.rs
 *
 *  lcdmon - smart screen monitor
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display subsystem - panel protocol, transport and incremental rendering
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

// Core trait definitions
pub mod traits;
pub mod error;
pub mod region;

// Wire format
pub mod protocol;
pub mod color;

// Transport
pub mod session;
pub mod drivers;
pub mod factory;

// Rendering pipeline
pub mod cache;
pub mod raster;
pub mod renderer;
pub mod compositor;

// Re-exports for convenience
pub use traits::{Clock, LinkOpener, Orientation, Screen, SerialLink, SerialSettings, SystemClock};
pub use error::{ConnectionError, MetricsError, MonitorError, OpenStep, TransportError};
pub use region::{DirtySet, Region};
pub use color::Palette;
pub use session::{PanelConfig, PanelSession, SessionState};
pub use factory::{BoxedScreen, ScreenFactory};
pub use cache::RegionCache;
pub use raster::Raster;
pub use renderer::{FontSet, Painter};
pub use compositor::{Compositor, CompositorState, Frame, StopHandle, TickOutcome, View};
