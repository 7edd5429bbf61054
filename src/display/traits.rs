/*
 *  display/traits.rs
 *
 *  lcdmon - smart screen monitor
 *  (c) 2020-26 Stuart Hunter
 *
 *  Core trait definitions for the panel transport abstraction
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
use std::time::{Duration, Instant};

use embedded_graphics::pixelcolor::Rgb888;
use serde::{Deserialize, Serialize};

use crate::display::error::TransportError;
use crate::display::region::Region;

/// Panel orientation, as understood by the SetOrientation command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Orientation {
    Portrait = 0,
    Landscape = 1,
    ReversePortrait = 2,
    #[default]
    ReverseLandscape = 3,
}

impl Orientation {
    pub fn is_landscape(self) -> bool {
        matches!(self, Orientation::Landscape | Orientation::ReverseLandscape)
    }

    /// Logical (width, height) for a panel with the given physical size
    pub fn logical_size(self, width: u32, height: u32) -> (u32, u32) {
        if self.is_landscape() { (height, width) } else { (width, height) }
    }
}

impl std::str::FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "portrait" => Ok(Orientation::Portrait),
            "landscape" => Ok(Orientation::Landscape),
            "reverse-portrait" => Ok(Orientation::ReversePortrait),
            "reverse-landscape" => Ok(Orientation::ReverseLandscape),
            other => Err(format!("unknown orientation '{other}'")),
        }
    }
}

/// Anything the compositor can push pixels to.
///
/// Implemented by the hardware session and by the simulated panel; the
/// choice is made once, when the monitor is built.
pub trait Screen: Send {
    /// Logical width after orientation
    fn width(&self) -> u32;

    /// Logical height after orientation
    fn height(&self) -> u32;

    /// Push `pixels` (row-major, exactly `region.area()` of them) to `region`
    fn draw_region(&mut self, region: Region, pixels: &[Rgb888]) -> Result<(), TransportError>;

    fn screen_on(&mut self) -> Result<(), TransportError>;

    fn screen_off(&mut self) -> Result<(), TransportError>;

    /// Screen off (best effort) and release the channel. Idempotent.
    fn close(&mut self);
}

impl<S: Screen + ?Sized> Screen for Box<S> {
    fn width(&self) -> u32 { (**self).width() }
    fn height(&self) -> u32 { (**self).height() }
    fn draw_region(&mut self, region: Region, pixels: &[Rgb888]) -> Result<(), TransportError> {
        (**self).draw_region(region, pixels)
    }
    fn screen_on(&mut self) -> Result<(), TransportError> { (**self).screen_on() }
    fn screen_off(&mut self) -> Result<(), TransportError> { (**self).screen_off() }
    fn close(&mut self) { (**self).close() }
}

/// Serial line parameters. The panel only speaks 115200 8N1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    pub port: String,
    pub baud_rate: u32,
    pub read_timeout: Duration,
}

impl SerialSettings {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: 115_200,
            read_timeout: Duration::from_secs(1),
        }
    }
}

/// An open byte channel to the panel. Dropping it closes the channel.
pub trait SerialLink: Send {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Read whatever is available, bounded by the read timeout
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Opens (and reopens, after a reset) the channel to the panel
pub trait LinkOpener: Send {
    type Link: SerialLink;

    fn open(&mut self, settings: &SerialSettings) -> io::Result<Self::Link>;
}

/// Time source for the reset pause and the tick timer
pub trait Clock: Send {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landscape_swaps_axes() {
        assert_eq!(Orientation::Landscape.logical_size(320, 480), (480, 320));
        assert_eq!(Orientation::ReverseLandscape.logical_size(320, 480), (480, 320));
        assert_eq!(Orientation::Portrait.logical_size(320, 480), (320, 480));
        assert_eq!(Orientation::ReversePortrait.logical_size(320, 480), (320, 480));
    }

    #[test]
    fn test_parse_orientation() {
        assert_eq!("reverse_landscape".parse::<Orientation>(), Ok(Orientation::ReverseLandscape));
        assert_eq!("Portrait".parse::<Orientation>(), Ok(Orientation::Portrait));
        assert!("sideways".parse::<Orientation>().is_err());
    }
}
