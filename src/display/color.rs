/*
 *  display/color.rs
 *
 *  lcdmon - smart screen monitor
 *  (c) 2020-26 Stuart Hunter
 *
 *  RGB565 pixel codec and the monitor colour palette
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

use embedded_graphics::pixelcolor::{Rgb888, RgbColor};

/// Bytes per encoded pixel on the wire
pub const BYTES_PER_PIXEL: usize = 2;

/// True-colour pixel at 16-bit channel precision
///
/// The panel codec truncates from 16-bit channels, so 8-bit raster values
/// are widened first (`v * 257`, i.e. `v << 8 | v`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb48 {
    pub r: u16,
    pub g: u16,
    pub b: u16,
}

impl From<Rgb888> for Rgb48 {
    fn from(c: Rgb888) -> Self {
        Self {
            r: u16::from(c.r()) * 257,
            g: u16::from(c.g()) * 257,
            b: u16::from(c.b()) * 257,
        }
    }
}

impl Rgb48 {
    /// Pack to 5-6-5, truncating the low-order bits
    #[inline]
    pub fn to_rgb565(self) -> u16 {
        let r5 = (self.r >> 11) & 0x1F;
        let g6 = (self.g >> 10) & 0x3F;
        let b5 = (self.b >> 11) & 0x1F;
        (r5 << 11) | (g6 << 5) | b5
    }
}

#[inline]
pub fn rgb565(c: Rgb888) -> u16 {
    Rgb48::from(c).to_rgb565()
}

/// Expand a 5-6-5 value back to 8-bit channels (bit replication)
pub fn decode_rgb565(v: u16) -> Rgb888 {
    let r5 = ((v >> 11) & 0x1F) as u8;
    let g6 = ((v >> 5) & 0x3F) as u8;
    let b5 = (v & 0x1F) as u8;
    Rgb888::new((r5 << 3) | (r5 >> 2), (g6 << 2) | (g6 >> 4), (b5 << 3) | (b5 >> 2))
}

/// Encode a row-major run of pixels as little-endian RGB565.
///
/// Output is exactly `pixels.len() * 2` bytes.
pub fn encode_pixels(pixels: &[Rgb888], out: &mut Vec<u8>) {
    out.clear();
    out.reserve(pixels.len() * BYTES_PER_PIXEL);
    for &p in pixels {
        out.extend_from_slice(&rgb565(p).to_le_bytes());
    }
}

/// Palette shared by all monitors (htop-style green on black)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub bg: Rgb888,
    pub text: Rgb888,
    pub text_dim: Rgb888,
    pub header: Rgb888,
    pub bar_low: Rgb888,
    pub bar_med: Rgb888,
    pub bar_high: Rgb888,
    pub bar_bg: Rgb888,
    pub border: Rgb888,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            bg: Rgb888::new(0, 0, 0),
            text: Rgb888::new(0, 255, 0),
            text_dim: Rgb888::new(0, 180, 0),
            header: Rgb888::new(0, 255, 255),
            bar_low: Rgb888::new(0, 255, 0),
            bar_med: Rgb888::new(255, 255, 0),
            bar_high: Rgb888::new(255, 0, 0),
            bar_bg: Rgb888::new(40, 40, 40),
            border: Rgb888::new(80, 80, 80),
        }
    }
}

impl Palette {
    /// Bar fill colour for a fraction in 0.0..=1.0
    pub fn bar_color(&self, fraction: f64) -> Rgb888 {
        if fraction < 0.5 {
            self.bar_low
        } else if fraction < 0.8 {
            self.bar_med
        } else {
            self.bar_high
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primaries() {
        assert_eq!(rgb565(Rgb888::new(255, 0, 0)), 0xF800);
        assert_eq!(rgb565(Rgb888::new(0, 255, 0)), 0x07E0);
        assert_eq!(rgb565(Rgb888::new(0, 0, 255)), 0x001F);
        assert_eq!(rgb565(Rgb888::new(255, 255, 255)), 0xFFFF);
        assert_eq!(rgb565(Rgb888::new(0, 0, 0)), 0x0000);
    }

    #[test]
    fn test_truncates_not_rounds() {
        // 7 is just under one red step (8); rounding would give 1
        assert_eq!(rgb565(Rgb888::new(7, 0, 0)), 0);
        assert_eq!(rgb565(Rgb888::new(0, 3, 0)), 0);
        assert_eq!(rgb565(Rgb888::new(8, 4, 8)), (1 << 11) | (1 << 5) | 1);
    }

    #[test]
    fn test_quantization_error_bounded() {
        for v in (0..=255u8).step_by(3) {
            let c = Rgb888::new(v, 255 - v, v / 2 + 7);
            let back = decode_rgb565(rgb565(c));
            assert!((c.r() as i16 - back.r() as i16).abs() <= 8, "red {v}");
            assert!((c.g() as i16 - back.g() as i16).abs() <= 4, "green {v}");
            assert!((c.b() as i16 - back.b() as i16).abs() <= 8, "blue {v}");
        }
    }

    #[test]
    fn test_little_endian_row_major() {
        let pixels = [Rgb888::new(255, 0, 0), Rgb888::new(0, 0, 255), Rgb888::new(0, 255, 0)];
        let mut out = Vec::new();
        encode_pixels(&pixels, &mut out);
        assert_eq!(out, vec![0x00, 0xF8, 0x1F, 0x00, 0xE0, 0x07]);
    }

    #[test]
    fn test_bar_color_thresholds() {
        let p = Palette::default();
        assert_eq!(p.bar_color(0.2), p.bar_low);
        assert_eq!(p.bar_color(0.5), p.bar_med);
        assert_eq!(p.bar_color(0.95), p.bar_high);
    }
}
