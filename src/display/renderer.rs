/*
 *  display/renderer.rs
 *
 *  lcdmon - smart screen monitor
 *  (c) 2020-26 Stuart Hunter
 *
 *  Drawing helpers: text, bars, separators and status dots
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

use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::mono_font::iso_8859_1::{FONT_10X20, FONT_7X13, FONT_9X15};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Circle, Line, PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};

use crate::display::color::Palette;
use crate::display::raster::Raster;
use crate::display::region::Region;

/// Small / normal / large fonts used by a monitor
#[derive(Clone, Copy)]
pub struct FontSet {
    pub small: &'static MonoFont<'static>,
    pub normal: &'static MonoFont<'static>,
    pub large: &'static MonoFont<'static>,
}

impl Default for FontSet {
    fn default() -> Self {
        Self { small: &FONT_7X13, normal: &FONT_9X15, large: &FONT_10X20 }
    }
}

impl std::fmt::Debug for FontSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontSet")
            .field("small", &self.small.character_size)
            .field("normal", &self.normal.character_size)
            .field("large", &self.large.character_size)
            .finish()
    }
}

/// Truncate to at most `max` characters (not bytes)
pub fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

/// Characters of `font` that fit in `width` pixels
pub fn chars_fitting(font: &MonoFont<'_>, width: u32) -> usize {
    let advance = font.character_size.width + font.character_spacing;
    if advance == 0 { 0 } else { (width / advance) as usize }
}

/// Paints onto the raster with the monitor's palette.
///
/// Drawing into a `Raster` cannot fail, so primitive results are dropped.
pub struct Painter<'a> {
    raster: &'a mut Raster,
    palette: &'a Palette,
}

impl<'a> Painter<'a> {
    pub fn new(raster: &'a mut Raster, palette: &'a Palette) -> Self {
        Self { raster, palette }
    }

    pub fn palette(&self) -> &Palette {
        self.palette
    }

    /// Fill a region with the background colour
    pub fn clear(&mut self, region: Region) {
        self.raster.fill_region(region, self.palette.bg);
    }

    /// Text with its top-left at the region origin, clipped to the region
    pub fn text(&mut self, region: Region, text: &str, font: &MonoFont<'_>, color: Rgb888) {
        self.text_at(region, region.x as i32, region.y as i32, text, font, color);
    }

    /// Text right-aligned against the region's right edge
    pub fn text_right(&mut self, region: Region, text: &str, font: &MonoFont<'_>, color: Rgb888) {
        let style = TextStyleBuilder::new().alignment(Alignment::Right).baseline(Baseline::Top).build();
        let anchor = Point::new((region.x + region.w) as i32 - 1, region.y as i32);
        Text::with_text_style(text, anchor, MonoTextStyle::new(font, color), style)
            .draw(&mut self.raster.clipped(&region.to_rectangle()))
            .ok();
    }

    /// Text with its top-left at (x, y), clipped to `clip`
    pub fn text_at(&mut self, clip: Region, x: i32, y: i32, text: &str, font: &MonoFont<'_>, color: Rgb888) {
        Text::with_baseline(text, Point::new(x, y), MonoTextStyle::new(font, color), Baseline::Top)
            .draw(&mut self.raster.clipped(&clip.to_rectangle()))
            .ok();
    }

    /// Progress bar: dark track, optional border, fill coloured by level
    pub fn bar(&mut self, region: Region, value: f64, min: f64, max: f64, border: bool) {
        if region.is_empty() {
            return;
        }
        let rect = region.to_rectangle();
        rect.into_styled(PrimitiveStyle::with_fill(self.palette.bar_bg)).draw(self.raster).ok();
        if border {
            rect.into_styled(PrimitiveStyle::with_stroke(self.palette.border, 1)).draw(self.raster).ok();
        }
        if value <= min || max <= min {
            return;
        }

        let pct = ((value - min) / (max - min)).min(1.0);
        let fill_w = (f64::from(region.w.saturating_sub(2)) * pct) as u32;
        if fill_w == 0 || region.h <= 2 {
            return;
        }
        Rectangle::new(Point::new(region.x as i32 + 1, region.y as i32 + 1), Size::new(fill_w, region.h - 2))
            .into_styled(PrimitiveStyle::with_fill(self.palette.bar_color(pct)))
            .draw(self.raster)
            .ok();
    }

    /// One-pixel horizontal separator in the border colour
    pub fn hline(&mut self, x1: u32, y: u32, x2: u32) {
        Line::new(Point::new(x1 as i32, y as i32), Point::new(x2 as i32, y as i32))
            .into_styled(PrimitiveStyle::with_stroke(self.palette.border, 1))
            .draw(self.raster)
            .ok();
    }

    pub fn circle(&mut self, center: Point, radius: u32, color: Rgb888) {
        Circle::with_center(center, radius * 2)
            .into_styled(PrimitiveStyle::with_fill(color))
            .draw(self.raster)
            .ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate("chromium-browser", 6), "chromi");
        assert_eq!(truncate("short", 18), "short");
        assert_eq!(truncate("41°C hot", 4), "41°C");
    }

    #[test]
    fn test_text_stays_inside_region() {
        let palette = Palette::default();
        let mut raster = Raster::new(100, 40, palette.bg);
        let region = Region::new(10, 10, 20, 15);
        Painter::new(&mut raster, &palette).text(region, "WWWWWWWWWW", &FONT_10X20, palette.text);

        let outside = (0..100)
            .flat_map(|x| (0..40).map(move |y| (x, y)))
            .filter(|&(x, y)| !(10..30).contains(&x) || !(10..25).contains(&y))
            .any(|(x, y)| raster.pixel(x, y) != Some(palette.bg));
        assert!(!outside);
        assert!(raster.as_slice().iter().any(|&p| p == palette.text));
    }

    #[test]
    fn test_bar_fill_proportional() {
        let palette = Palette::default();
        let mut raster = Raster::new(110, 10, palette.bg);
        Painter::new(&mut raster, &palette).bar(Region::new(0, 0, 102, 10), 25.0, 0.0, 100.0, true);

        assert_eq!(raster.pixel(0, 0), Some(palette.border));
        assert_eq!(raster.pixel(1, 5), Some(palette.bar_low));
        assert_eq!(raster.pixel(25, 5), Some(palette.bar_low));
        assert_eq!(raster.pixel(26, 5), Some(palette.bar_bg));
    }

    #[test]
    fn test_bar_high_color() {
        let palette = Palette::default();
        let mut raster = Raster::new(20, 6, palette.bg);
        Painter::new(&mut raster, &palette).bar(Region::new(0, 0, 12, 6), 150.0, 0.0, 100.0, false);
        assert_eq!(raster.pixel(10, 3), Some(palette.bar_high));
        assert_eq!(raster.pixel(11, 3), Some(palette.bar_bg));
    }
}
