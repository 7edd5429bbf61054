/*
 *  display/drivers/simulated.rs
 *
 *  lcdmon - smart screen monitor
 *  (c) 2020-26 Stuart Hunter
 *
 *  No-op panel for running monitors without hardware
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

use embedded_graphics::pixelcolor::Rgb888;
use log::{debug, info};

use crate::display::error::TransportError;
use crate::display::region::Region;
use crate::display::traits::{Orientation, Screen};

/// Accepts every draw and discards it.
///
/// Bounds are still checked so layout bugs surface without hardware.
#[derive(Debug, Clone)]
pub struct SimulatedScreen {
    width: u32,
    height: u32,
    orientation: Orientation,
    bytes_discarded: u64,
}

impl SimulatedScreen {
    pub fn new(width: u32, height: u32, orientation: Orientation) -> Self {
        info!("simulated panel {}x{} {:?}", width, height, orientation);
        Self { width, height, orientation, bytes_discarded: 0 }
    }

    /// Payload bytes a real panel would have received
    pub fn bytes_discarded(&self) -> u64 {
        self.bytes_discarded
    }
}

impl Screen for SimulatedScreen {
    fn width(&self) -> u32 {
        self.orientation.logical_size(self.width, self.height).0
    }

    fn height(&self) -> u32 {
        self.orientation.logical_size(self.width, self.height).1
    }

    fn draw_region(&mut self, region: Region, pixels: &[Rgb888]) -> Result<(), TransportError> {
        if region.is_empty() {
            return Ok(());
        }
        let (width, height) = (self.width(), self.height());
        if !region.fits_within(width, height) {
            return Err(TransportError::OutOfBounds { region, width, height });
        }
        if pixels.len() != region.area() {
            return Err(TransportError::PixelCountMismatch { expected: region.area(), actual: pixels.len() });
        }
        self.bytes_discarded += 6 + pixels.len() as u64 * 2;
        Ok(())
    }

    fn screen_on(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn screen_off(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn close(&mut self) {
        debug!("simulated panel closed after {} bytes", self.bytes_discarded);
    }
}
