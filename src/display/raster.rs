/*
 *  display/raster.rs
 *
 *  lcdmon - smart screen monitor
 *  (c) 2020-26 Stuart Hunter
 *
 *  Off-panel true-colour raster the monitors draw into
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

use core::convert::Infallible;

use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

use crate::display::region::Region;

/// Full-panel Rgb888 framebuffer, sized to the panel's logical dimensions
#[derive(Debug, Clone)]
pub struct Raster {
    buf: Vec<Rgb888>,
    w: usize,
    h: usize,
}

impl Raster {
    pub fn new(width: u32, height: u32, fill: Rgb888) -> Self {
        let (w, h) = (width as usize, height as usize);
        Self { buf: vec![fill; w * h], w, h }
    }

    pub fn width(&self) -> u32 { self.w as u32 }
    pub fn height(&self) -> u32 { self.h as u32 }

    /// The whole raster as a region
    pub fn bounds(&self) -> Region {
        Region::new(0, 0, self.w as u32, self.h as u32)
    }

    pub fn as_slice(&self) -> &[Rgb888] { &self.buf }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb888> {
        self.idx(Point::new(x as i32, y as i32)).map(|i| self.buf[i])
    }

    pub fn fill(&mut self, color: Rgb888) {
        self.buf.fill(color);
    }

    /// Fill a region (clipped to the raster) with one colour
    pub fn fill_region(&mut self, region: Region, color: Rgb888) {
        let r = region.clipped(self.w as u32, self.h as u32);
        for row in r.y as usize..(r.y + r.h) as usize {
            let base = row * self.w + r.x as usize;
            self.buf[base..base + r.w as usize].fill(color);
        }
    }

    /// Copy a region out row-major into `out`, ready for the panel.
    ///
    /// The region is clipped first; the clipped region is returned so the
    /// caller sends exactly what was copied.
    pub fn copy_region(&self, region: Region, out: &mut Vec<Rgb888>) -> Region {
        let r = region.clipped(self.w as u32, self.h as u32);
        out.clear();
        out.reserve(r.area());
        for row in r.y as usize..(r.y + r.h) as usize {
            let base = row * self.w + r.x as usize;
            out.extend_from_slice(&self.buf[base..base + r.w as usize]);
        }
        r
    }

    /// Map (x,y) to linear index; returns None if out of bounds
    #[inline]
    fn idx(&self, p: Point) -> Option<usize> {
        if p.x >= 0 && p.y >= 0 {
            let (x, y) = (p.x as usize, p.y as usize);
            if x < self.w && y < self.h {
                return Some(y * self.w + x);
            }
        }
        None
    }
}

impl OriginDimensions for Raster {
    fn size(&self) -> Size {
        Size::new(self.w as u32, self.h as u32)
    }
}

impl DrawTarget for Raster {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            if let Some(i) = self.idx(p) {
                self.buf[i] = c;
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        // rectangles are the bulk of what monitors draw (bars, clears)
        let area = area.intersection(&self.bounding_box());
        if let Some(br) = area.bottom_right() {
            let region = Region::new(
                area.top_left.x as u32,
                area.top_left.y as u32,
                (br.x - area.top_left.x + 1) as u32,
                (br.y - area.top_left.y + 1) as u32,
            );
            self.fill_region(region, color);
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.fill(color);
        Ok(())
    }
}
