/*
 *  display/region.rs
 *
 *  lcdmon - smart screen monitor
 *  (c) 2020-26 Stuart Hunter
 *
 *  Screen rectangles and the per-cycle dirty set
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

use std::fmt;

use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

/// Rectangular area of the panel, origin top-left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Region {
    pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    pub fn area(&self) -> usize {
        self.w as usize * self.h as usize
    }

    /// Inclusive bottom-right corner as sent in the bitmap header
    pub fn end(&self) -> (u32, u32) {
        (self.x + self.w - 1, self.y + self.h - 1)
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x.checked_add(self.w).is_some_and(|r| r <= width)
            && self.y.checked_add(self.h).is_some_and(|b| b <= height)
    }

    /// Clip to a `width` x `height` surface; may return an empty region
    pub fn clipped(&self, width: u32, height: u32) -> Region {
        let x = self.x.min(width);
        let y = self.y.min(height);
        let w = self.w.min(width - x);
        let h = self.h.min(height - y);
        Region { x, y, w, h }
    }

    pub fn to_rectangle(&self) -> Rectangle {
        Rectangle::new(Point::new(self.x as i32, self.y as i32), Size::new(self.w, self.h))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.w, self.h, self.x, self.y)
    }
}

/// Rectangles touched during one render cycle, in first-touch order.
///
/// Touching the same rectangle again keeps its original position; by the
/// time the set is flushed the raster holds its final content.
#[derive(Debug, Default)]
pub struct DirtySet {
    regions: Vec<Region>,
}

impl DirtySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn touch(&mut self, region: Region) {
        if region.is_empty() || self.regions.contains(&region) {
            return;
        }
        self.regions.push(region);
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    /// Hand the cycle's rectangles to the caller, leaving the set empty
    pub fn take(&mut self) -> Vec<Region> {
        std::mem::take(&mut self.regions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_is_inclusive() {
        assert_eq!(Region::new(5, 8, 470, 24).end(), (474, 31));
        assert_eq!(Region::new(0, 0, 1, 1).end(), (0, 0));
    }

    #[test]
    fn test_bounds() {
        assert!(Region::new(0, 0, 480, 320).fits_within(480, 320));
        assert!(!Region::new(1, 0, 480, 320).fits_within(480, 320));
        assert!(!Region::new(u32::MAX, 0, 2, 1).fits_within(480, 320));
    }

    #[test]
    fn test_clipped() {
        assert_eq!(Region::new(470, 300, 20, 40).clipped(480, 320), Region::new(470, 300, 10, 20));
        assert!(Region::new(500, 0, 10, 10).clipped(480, 320).is_empty());
    }

    #[test]
    fn test_dirty_set_collapses_duplicates() {
        let mut set = DirtySet::new();
        let a = Region::new(0, 0, 10, 10);
        let b = Region::new(10, 0, 10, 10);
        set.touch(a);
        set.touch(b);
        set.touch(a);
        set.touch(Region::new(3, 3, 0, 5));
        assert_eq!(set.take(), vec![a, b]);
        assert!(set.is_empty());
    }
}
