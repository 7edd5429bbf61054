/*
 *  monitors/cpu.rs
 *
 *  lcdmon - smart screen monitor
 *  (c) 2020-26 Stuart Hunter
 *
 *  CPU screen: temperature, frequency, load and per-core bars
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

use crate::display::compositor::{Frame, View};
use crate::display::error::MetricsError;
use crate::display::region::Region;
use crate::display::renderer::{FontSet, Painter};
use crate::metrics::{CpuInfo, MetricsSource};

const CORES_Y: u32 = 68;
const PCT_WIDTH: u32 = 38;
const BAR_SPACING: u32 = 3;

const FREQ_THRESHOLD: f64 = 0.05;
const CORE_THRESHOLD: f64 = 2.0;
const OVERALL_THRESHOLD: f64 = 1.0;

/// Columns of core bars for a given core count
pub fn columns_for(cores: usize) -> u32 {
    match cores {
        0..=8 => 1,
        9..=16 => 2,
        _ => 4,
    }
}

/// Height of one core bar, clamped to 12..=35
pub fn bar_height_for(height: u32, cores: usize, cols: u32) -> u32 {
    let available = height.saturating_sub(CORES_Y + 40);
    let rows = (cores as u32).div_ceil(cols).max(1);
    (available.saturating_sub(30) / rows).clamp(12, 35)
}

pub fn header_text(info: &CpuInfo) -> String {
    let mut header = format!("CPU Monitor - {} cores", info.core_count);
    if info.temp > 0.0 {
        header.push_str(&format!(" | {:.0}°C", info.temp));
    }
    header
}

pub struct CpuView<M: MetricsSource> {
    source: M,
    fonts: FontSet,
    width: u32,
    cores: usize,
    cols: u32,
    bar_height: u32,
    overall_y: u32,
}

impl<M: MetricsSource> CpuView<M> {
    pub fn new(source: M) -> Self {
        Self { source, fonts: FontSet::default(), width: 0, cores: 0, cols: 1, bar_height: 12, overall_y: 0 }
    }

    /// Percentage text and bar rectangles for core `i`
    fn core_regions(&self, i: usize) -> (Region, Region) {
        let col = i as u32 % self.cols;
        let row = i as u32 / self.cols;
        let col_width = self.width.saturating_sub(10) / self.cols;
        let bar_width = col_width.saturating_sub(PCT_WIDTH + 8);
        let x = 5 + col * col_width;
        let y = CORES_Y + row * (self.bar_height + BAR_SPACING);

        // text is vertically centred on the bar and never reaches the next row
        let pct_y = (y as i32 + (self.bar_height as i32 - 18) / 2).max(0) as u32;
        let pct_h = 20u32.min(self.bar_height + BAR_SPACING);
        (
            Region::new(x, pct_y, PCT_WIDTH, pct_h),
            Region::new(x + PCT_WIDTH + 4, y, bar_width, self.bar_height - 1),
        )
    }
}

impl<M: MetricsSource> View for CpuView<M> {
    fn name(&self) -> &str {
        "CPU"
    }

    fn layout(&mut self, width: u32, height: u32) -> Result<(), MetricsError> {
        // also primes the usage counters, so the first tick has real deltas
        let info = self.source.cpu()?;
        self.width = width;
        self.cores = info.core_count;
        self.cols = columns_for(self.cores);
        self.bar_height = bar_height_for(height, self.cores, self.cols);
        self.overall_y = height.saturating_sub(35);
        Ok(())
    }

    fn draw_static(&self, painter: &mut Painter<'_>) {
        let header = painter.palette().header;
        painter.hline(0, 35, self.width);
        painter.hline(0, self.overall_y.saturating_sub(5), self.width);
        painter.text(Region::new(5, self.overall_y, 35, 24), "ALL", self.fonts.normal, header);
    }

    fn render(&mut self, frame: &mut Frame<'_>) -> Result<(), MetricsError> {
        let info = self.source.cpu()?;
        let pal = frame.palette();
        let fonts = self.fonts;
        let w = self.width;

        let header = header_text(&info);
        if frame.changed("header", &header) {
            let reg = Region::new(5, 8, w.saturating_sub(10), 24);
            frame.painter().clear(reg);
            frame.painter().text(reg, &header, fonts.large, pal.header);
            frame.touch(reg);
        }

        if frame.changed_float("freq", info.freq, FREQ_THRESHOLD) {
            let reg = Region::new(5, 38, 180, 20);
            frame.painter().clear(reg);
            frame.painter().text(reg, &format!("Freq: {:.2} GHz", info.freq), fonts.normal, pal.text_dim);
            frame.touch(reg);
        }

        let load = format!("Load: {:.2} {:.2} {:.2}", info.load1, info.load5, info.load15);
        if frame.changed("load", &load) {
            let reg = Region::new(190, 38, 280, 20);
            frame.painter().clear(reg);
            frame.painter().text(reg, &load, fonts.normal, pal.text_dim);
            frame.touch(reg);
        }

        // a core count change (hotplug) is only picked up on restart
        for (i, pct) in info.per_cpu.iter().copied().enumerate().take(self.cores) {
            if frame.changed_float(&format!("cpu_{i}"), pct, CORE_THRESHOLD) {
                let (pct_reg, bar_reg) = self.core_regions(i);
                frame.painter().clear(pct_reg);
                frame.painter().text_right(pct_reg, &format!("{pct:3.0}%"), fonts.small, pal.text);
                frame.touch(pct_reg);

                frame.painter().bar(bar_reg, pct, 0.0, 100.0, true);
                frame.touch(bar_reg);
            }
        }

        if frame.changed_float("overall", info.overall, OVERALL_THRESHOLD) {
            let bar_reg = Region::new(45, self.overall_y, w.saturating_sub(120), 24);
            frame.painter().bar(bar_reg, info.overall, 0.0, 100.0, true);
            frame.touch(bar_reg);

            let pct_reg = Region::new(w.saturating_sub(70), self.overall_y, 65, 24);
            frame.painter().clear(pct_reg);
            frame.painter().text_right(pct_reg, &format!("{:5.1}%", info.overall), fonts.normal, pal.text);
            frame.touch(pct_reg);
        }

        Ok(())
    }
}
