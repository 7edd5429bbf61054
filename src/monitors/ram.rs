/*
 *  monitors/ram.rs
 *
 *  lcdmon - smart screen monitor
 *  (c) 2020-26 Stuart Hunter
 *
 *  RAM screen: memory and swap bars, largest process families
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
use crate::display::renderer::{truncate, FontSet, Painter};
use crate::metrics::{format_bytes, MemInfo, MetricsSource, ProcessGroup};

const PROCESS_LIST_Y: u32 = 138;
const NUM_ROWS: usize = 5;
const PROC_BAR_WIDTH: u32 = 100;
const NAME_CHARS: usize = 18;
const PCT_THRESHOLD: f64 = 0.5;

const PROCESS_HEADER: &str = "PROCESS                    MEM        %     #";

pub fn swap_text(mem: &MemInfo) -> String {
    if mem.swap_total > 0 {
        format!("{} / {}", format_bytes(mem.swap_used), format_bytes(mem.swap_total))
    } else {
        "No swap".to_string()
    }
}

/// Cache value for a process row; changes when anything shown changes
fn row_value(p: &ProcessGroup) -> String {
    format!("{}_{}_{:.1}_{}", p.name, p.count, p.percent, format_bytes(p.rss))
}

pub struct RamView<M: MetricsSource> {
    source: M,
    fonts: FontSet,
    width: u32,
    row_height: u32,
}

impl<M: MetricsSource> RamView<M> {
    pub fn new(source: M) -> Self {
        Self { source, fonts: FontSet::default(), width: 0, row_height: 28 }
    }

    fn row_y(&self, i: usize) -> u32 {
        PROCESS_LIST_Y + i as u32 * self.row_height
    }

    fn draw_process(&self, frame: &mut Frame<'_>, y: u32, p: &ProcessGroup) {
        let pal = frame.palette();
        let rh = self.row_height;

        let name_reg = Region::new(5, y, 160, rh);
        frame.painter().clear(name_reg);
        frame.painter().text(name_reg, truncate(&p.name, NAME_CHARS), self.fonts.normal, pal.text_dim);
        frame.touch(name_reg);

        let bar_reg = Region::new(170, y + 2, PROC_BAR_WIDTH, rh.saturating_sub(6));
        frame.painter().bar(bar_reg, p.percent, 0.0, 100.0, true);
        frame.touch(bar_reg);

        let mem_reg = Region::new(280, y, 70, rh);
        frame.painter().clear(mem_reg);
        frame.painter().text_right(mem_reg, &format_bytes(p.rss), self.fonts.normal, pal.text);
        frame.touch(mem_reg);

        let pct_reg = Region::new(355, y, 55, rh);
        frame.painter().clear(pct_reg);
        frame.painter().text_right(pct_reg, &format!("{:.1}%", p.percent), self.fonts.normal, pal.text_dim);
        frame.touch(pct_reg);

        let count_reg = Region::new(415, y, 60, rh);
        frame.painter().clear(count_reg);
        if p.count > 1 {
            frame.painter().text_right(count_reg, &format!("x{}", p.count), self.fonts.small, pal.text_dim);
        }
        frame.touch(count_reg);
    }
}

impl<M: MetricsSource> View for RamView<M> {
    fn name(&self) -> &str {
        "RAM"
    }

    fn layout(&mut self, width: u32, height: u32) -> Result<(), MetricsError> {
        self.width = width;
        self.row_height = (height.saturating_sub(PROCESS_LIST_Y + 10) / NUM_ROWS as u32).max(28);
        Ok(())
    }

    fn draw_static(&self, painter: &mut Painter<'_>) {
        painter.hline(0, 35, self.width);
        painter.hline(0, PROCESS_LIST_Y - 5, self.width);
    }

    fn render(&mut self, frame: &mut Frame<'_>) -> Result<(), MetricsError> {
        let mem = self.source.memory()?;
        let procs = self.source.top_processes(NUM_ROWS)?;
        let pal = frame.palette();
        let fonts = self.fonts;
        let w = self.width;

        let header = format!("RAM Monitor - {} total", format_bytes(mem.total));
        if frame.changed("header", &header) {
            let reg = Region::new(5, 8, w.saturating_sub(10), 24);
            frame.painter().clear(reg);
            frame.painter().text(reg, &header, fonts.large, pal.header);
            frame.touch(reg);
        }

        if frame.changed("ram_label", true) {
            let reg = Region::new(5, 40, 45, 20);
            frame.painter().clear(reg);
            frame.painter().text(reg, "RAM", fonts.normal, pal.text);
            frame.touch(reg);
        }

        if frame.changed_float("ram_pct", mem.used_percent, PCT_THRESHOLD) {
            let reg = Region::new(55, 40, 250, 24);
            frame.painter().bar(reg, mem.used_percent, 0.0, 100.0, true);
            frame.touch(reg);
        }

        let ram_text = format!("{} / {}", format_bytes(mem.used), format_bytes(mem.total));
        if frame.changed("ram_text", &ram_text) {
            let reg = Region::new(310, 40, 165, 20);
            frame.painter().clear(reg);
            frame.painter().text_right(reg, &ram_text, fonts.normal, pal.text);
            frame.touch(reg);
        }

        if frame.changed("swap_label", true) {
            let reg = Region::new(5, 75, 45, 20);
            frame.painter().clear(reg);
            frame.painter().text(reg, "Swap", fonts.normal, pal.text_dim);
            frame.touch(reg);
        }

        if frame.changed_float("swap_pct", mem.swap_percent, PCT_THRESHOLD) {
            let reg = Region::new(55, 75, w.saturating_sub(180), 20);
            frame.painter().bar(reg, mem.swap_percent, 0.0, 100.0, true);
            frame.touch(reg);
        }

        let swap = swap_text(&mem);
        if frame.changed("swap_text", &swap) {
            let reg = Region::new(w.saturating_sub(120), 75, 115, 20);
            frame.painter().clear(reg);
            frame.painter().text_right(reg, &swap, fonts.normal, pal.text_dim);
            frame.touch(reg);
        }

        if frame.changed("proc_header", true) {
            let reg = Region::new(5, 110, w.saturating_sub(10), 22);
            frame.painter().clear(reg);
            frame.painter().text(reg, PROCESS_HEADER, fonts.normal, pal.header);
            frame.touch(reg);
        }

        for i in 0..NUM_ROWS {
            let key = format!("proc_{i}");
            let y = self.row_y(i);
            match procs.get(i) {
                Some(p) => {
                    if frame.changed(&key, row_value(p)) {
                        self.draw_process(frame, y, p);
                    }
                }
                None => {
                    if frame.changed(&key, "empty") {
                        let reg = Region::new(5, y, w.saturating_sub(10), self.row_height);
                        frame.painter().clear(reg);
                        frame.touch(reg);
                    }
                }
            }
        }

        Ok(())
    }
}
