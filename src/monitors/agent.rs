/*
 *  monitors/agent.rs
 *
 *  lcdmon - smart screen monitor
 *  (c) 2020-26 Stuart Hunter
 *
 *  Agent screen: one row per coding agent reporting status
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

use std::time::{Duration, Instant};

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;

use crate::agentstat::{format_cost, format_tokens, AgentSource, AgentStatus};
use crate::display::compositor::{Frame, View};
use crate::display::error::MetricsError;
use crate::display::region::Region;
use crate::display::renderer::{truncate, FontSet, Painter};
use crate::pacer::Pacer;

const ROWS_Y: u32 = 60;
const NUM_ROWS: usize = 5;
const TEXT_X: u32 = 35;
const CLEANUP_EVERY: Duration = Duration::from_secs(5 * 60);

pub fn status_color(status: &str) -> Rgb888 {
    match status {
        "idle" => Rgb888::new(100, 100, 100),
        "thinking" => Rgb888::new(255, 255, 0),
        "working" => Rgb888::new(0, 255, 0),
        "waiting" => Rgb888::new(0, 150, 255),
        "error" => Rgb888::new(255, 0, 0),
        "done" => Rgb888::new(0, 255, 150),
        "paused" => Rgb888::new(255, 150, 0),
        _ => Rgb888::new(80, 80, 80),
    }
}

fn dim(c: Rgb888) -> Rgb888 {
    Rgb888::new(c.r() / 2, c.g() / 2, c.b() / 2)
}

/// Drop vendor prefixes and the date stamp from a model id
pub fn short_model(model: &str) -> &str {
    let mut m = model;
    for affix in ["claude-", "gpt-", "-20250514"] {
        m = m.strip_prefix(affix).or_else(|| m.strip_suffix(affix)).unwrap_or(m);
    }
    truncate(m, 20)
}

pub fn summary_text(agents: &[AgentStatus]) -> String {
    if agents.is_empty() {
        return "No agents reporting".to_string();
    }
    let stale = agents.iter().filter(|a| a.stale).count();
    format!("{} active, {} stale", agents.len() - stale, stale)
}

fn title_text(a: &AgentStatus) -> String {
    let title = if a.project.is_empty() {
        a.agent.clone()
    } else {
        format!("{} · {}", a.agent, truncate(&a.project, 20))
    };
    truncate(&title, 35).to_string()
}

/// Active tool, else the most recent one
fn tool_text(a: &AgentStatus) -> Option<String> {
    let tools = a.tools.as_ref()?;
    if !tools.active.is_empty() {
        Some(format!("» {}", tools.active))
    } else {
        tools.recent.last().map(|last| format!("· {last}"))
    }
}

fn tokens_text(a: &AgentStatus) -> Option<String> {
    a.tokens
        .filter(|t| t.input > 0 || t.output > 0)
        .map(|t| format!("in {} out {}", format_tokens(t.input), format_tokens(t.output)))
}

fn cost_text(a: &AgentStatus) -> Option<String> {
    (a.cost_usd > 0.0).then(|| format_cost(a.cost_usd))
}

/// Seconds below a minute, whole minutes after
pub fn age_text(age: Duration) -> String {
    let secs = age.as_secs();
    if secs < 60 { format!("{secs}s ago") } else { format!("{}m ago", secs / 60) }
}

/// Cache value for a row: everything `draw_row` puts on screen
fn row_value(a: &AgentStatus) -> String {
    let age = if a.stale { age_text(a.age) } else { String::new() };
    format!(
        "{}|{}|{}|{}|{}|{}|{}|{}",
        title_text(a),
        a.status,
        a.task,
        a.model,
        tool_text(a).unwrap_or_default(),
        tokens_text(a).unwrap_or_default(),
        cost_text(a).unwrap_or_default(),
        age,
    )
}

pub struct AgentView<A: AgentSource> {
    source: A,
    fonts: FontSet,
    width: u32,
    row_height: u32,
    cleanup: Pacer,
}

impl<A: AgentSource> AgentView<A> {
    pub fn new(source: A) -> Self {
        Self {
            source,
            fonts: FontSet::default(),
            width: 0,
            row_height: 45,
            cleanup: Pacer::new(CLEANUP_EVERY, Instant::now()),
        }
    }

    /// Row `i`, stopping short of the separator under it
    fn row_region(&self, i: usize) -> Region {
        Region::new(0, ROWS_Y + i as u32 * self.row_height, self.width, self.row_height.saturating_sub(3))
    }

    fn draw_row(&self, painter: &mut Painter<'_>, reg: Region, a: &AgentStatus) {
        let pal = *painter.palette();
        let fonts = self.fonts;
        let w = self.width;
        let (x, y) = (TEXT_X as i32, reg.y as i32);
        let text_color = if a.stale { pal.text_dim } else { pal.text };

        painter.clear(reg);

        let mut dot = status_color(&a.status);
        if a.stale {
            dot = dim(dot);
        }
        painter.circle(Point::new(reg.x as i32 + 15, y + reg.h as i32 / 2), 8, dot);

        painter.text_at(reg, x, y, &title_text(a), fonts.normal, text_color);

        if !a.model.is_empty() {
            let model_reg = Region::new(w.saturating_sub(105), reg.y, 100, 15);
            painter.text_right(model_reg, short_model(&a.model), fonts.small, pal.text_dim);
        }

        if !a.task.is_empty() {
            painter.text_at(reg, x, y + 16, truncate(&a.task, 50), fonts.small, text_color);
        }

        if let Some(tool) = tool_text(a) {
            let active = a.tools.as_ref().is_some_and(|t| !t.active.is_empty());
            let color = if active { pal.header } else { pal.text_dim };
            painter.text_at(reg, x, y + 30, &tool, fonts.small, color);
        }

        if let Some(tokens) = tokens_text(a) {
            painter.text_at(reg, 180, y + 30, &tokens, fonts.small, pal.text_dim);
        }

        if let Some(cost) = cost_text(a) {
            let cost_reg = Region::new(w.saturating_sub(65), reg.y + 30, 60, 15);
            painter.text_right(cost_reg, &cost, fonts.small, pal.text_dim);
        }

        if a.stale {
            let age_reg = Region::new(w.saturating_sub(85), reg.y + 16, 80, 15);
            painter.text_right(age_reg, &age_text(a.age), fonts.small, pal.text_dim);
        }
    }
}

impl<A: AgentSource> View for AgentView<A> {
    fn name(&self) -> &str {
        "Agent"
    }

    fn layout(&mut self, width: u32, height: u32) -> Result<(), MetricsError> {
        self.width = width;
        self.row_height = (height.saturating_sub(ROWS_Y + 15) / NUM_ROWS as u32).max(45);
        self.source.cleanup();
        Ok(())
    }

    fn draw_static(&self, painter: &mut Painter<'_>) {
        painter.hline(0, 32, self.width);
        for i in 0..=NUM_ROWS as u32 {
            painter.hline(0, ROWS_Y + i * self.row_height - 2, self.width);
        }
    }

    fn render(&mut self, frame: &mut Frame<'_>) -> Result<(), MetricsError> {
        if self.cleanup.should_tick(Instant::now()) {
            self.source.cleanup();
        }

        let agents = self.source.agents()?;
        let pal = frame.palette();
        let fonts = self.fonts;
        let w = self.width;

        if frame.changed("header", true) {
            let reg = Region::new(5, 8, w.saturating_sub(10), 24);
            frame.painter().clear(reg);
            frame.painter().text(reg, "Agent Status Monitor", fonts.large, pal.header);
            frame.touch(reg);
        }

        let summary = summary_text(&agents);
        if frame.changed("summary", &summary) {
            let reg = Region::new(5, 35, w.saturating_sub(10), 20);
            frame.painter().clear(reg);
            frame.painter().text(reg, &summary, fonts.normal, pal.text_dim);
            frame.touch(reg);
        }

        for i in 0..NUM_ROWS {
            let key = format!("agent_{i}");
            let reg = self.row_region(i);
            match agents.get(i) {
                Some(a) => {
                    if frame.changed(&key, row_value(a)) {
                        self.draw_row(frame.painter(), reg, a);
                        frame.touch(reg);
                    }
                }
                None => {
                    if frame.changed(&key, "empty") {
                        frame.painter().clear(reg);
                        frame.touch(reg);
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agentstat::{AgentStatusError, TokensInfo, ToolsInfo};
    use crate::display::color::Palette;
    use crate::monitors::testing::{compositor, tick_draws};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Fixed {
        agents: Arc<Mutex<Vec<AgentStatus>>>,
        cleanups: Arc<Mutex<usize>>,
    }

    impl AgentSource for Fixed {
        fn agents(&mut self) -> Result<Vec<AgentStatus>, AgentStatusError> {
            Ok(self.agents.lock().unwrap().clone())
        }

        fn cleanup(&mut self) {
            *self.cleanups.lock().unwrap() += 1;
        }
    }

    fn agent(name: &str, status: &str) -> AgentStatus {
        AgentStatus {
            version: 1,
            agent: name.into(),
            instance: "i1".into(),
            status: status.into(),
            project: "lcdmon".into(),
            model: "claude-sonnet-4-20250514".into(),
            task: "Refactoring the session".into(),
            tools: Some(ToolsInfo { active: "Edit".into(), ..ToolsInfo::default() }),
            tokens: Some(TokensInfo { input: 12_400, output: 3_100, ..TokensInfo::default() }),
            cost_usd: 0.42,
            updated: 1,
            ..AgentStatus::default()
        }
    }

    #[test]
    fn test_short_model() {
        assert_eq!(short_model("claude-sonnet-4-20250514"), "sonnet-4");
        assert_eq!(short_model("gpt-4o"), "4o");
        assert_eq!(short_model("llama3"), "llama3");
    }

    #[test]
    fn test_summary() {
        assert_eq!(summary_text(&[]), "No agents reporting");
        let mut old = agent("beta", "idle");
        old.stale = true;
        assert_eq!(summary_text(&[agent("alpha", "working"), old]), "1 active, 1 stale");
    }

    #[test]
    fn test_stale_dims_status_dot() {
        assert_eq!(dim(status_color("working")), Rgb888::new(0, 127, 0));
        assert_eq!(status_color("unknown"), Rgb888::new(80, 80, 80));
    }

    #[test]
    fn test_rows_redraw_on_change_only() {
        let source = Fixed::default();
        let agents = Arc::clone(&source.agents);
        let cleanups = Arc::clone(&source.cleanups);
        agents.lock().unwrap().push(agent("claude-code", "working"));

        let (mut comp, screen) = compositor(AgentView::new(source));
        comp.init().unwrap();
        assert_eq!(*cleanups.lock().unwrap(), 1);

        // header, summary, one agent row, four vacant rows
        assert_eq!(tick_draws(&mut comp, &screen).len(), 7);
        assert!(tick_draws(&mut comp, &screen).is_empty());

        agents.lock().unwrap()[0].status = "waiting".into();
        let row0 = comp.view().row_region(0);
        assert_eq!(tick_draws(&mut comp, &screen), vec![row0]);

        // status dot sits in the row, left of the text
        let center = comp.raster().pixel(15, row0.y + row0.h / 2);
        assert_eq!(center, Some(status_color("waiting")));
        // separators survive row redraws
        let sep_y = row0.y + comp.view().row_height - 2;
        assert_eq!(comp.raster().pixel(200, sep_y), Some(Palette::default().border));
    }

    #[test]
    fn test_age_text() {
        assert_eq!(age_text(Duration::from_secs(42)), "42s ago");
        assert_eq!(age_text(Duration::from_secs(61)), "1m ago");
        assert_eq!(age_text(Duration::from_secs(179)), "2m ago");
    }

    #[test]
    fn test_every_drawn_field_redraws_row() {
        let cases: &[(&str, fn(&mut AgentStatus))] = &[
            ("project", |a| a.project = "other".into()),
            ("output tokens", |a| a.tokens = Some(TokensInfo { input: 12_400, output: 9_000, ..TokensInfo::default() })),
            ("recent tool", |a| a.tools = Some(ToolsInfo { recent: vec!["Read".into(), "Grep".into()], ..ToolsInfo::default() })),
            ("sub-cent cost", |a| a.cost_usd = 0.002),
            ("stale age", |a| a.age = Duration::from_secs(190)),
        ];

        for (field, change) in cases {
            let source = Fixed::default();
            let agents = Arc::clone(&source.agents);
            let mut a = agent("claude-code", "working");
            a.cost_usd = 0.004;
            a.stale = true;
            a.age = Duration::from_secs(70);
            agents.lock().unwrap().push(a);

            let (mut comp, screen) = compositor(AgentView::new(source));
            comp.init().unwrap();
            tick_draws(&mut comp, &screen);

            change(&mut agents.lock().unwrap()[0]);
            let row0 = comp.view().row_region(0);
            assert_eq!(tick_draws(&mut comp, &screen), vec![row0], "{field}");
        }
    }

    #[test]
    fn test_age_within_minute_does_not_redraw() {
        let source = Fixed::default();
        let agents = Arc::clone(&source.agents);
        let mut a = agent("claude-code", "idle");
        a.stale = true;
        a.age = Duration::from_secs(125);
        agents.lock().unwrap().push(a);

        let (mut comp, screen) = compositor(AgentView::new(source));
        comp.init().unwrap();
        tick_draws(&mut comp, &screen);

        agents.lock().unwrap()[0].age = Duration::from_secs(150);
        assert!(tick_draws(&mut comp, &screen).is_empty());
    }
}
