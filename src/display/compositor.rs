/*
 *  display/compositor.rs
 *
 *  lcdmon - smart screen monitor
 *  (c) 2020-26 Stuart Hunter
 *
 *  Render loop: draw into the raster, push only what changed
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

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use embedded_graphics::pixelcolor::Rgb888;
use log::{debug, error, info, warn};

use crate::display::cache::{CacheValue, RegionCache};
use crate::display::color::Palette;
use crate::display::error::{MetricsError, MonitorError, TransportError};
use crate::display::raster::Raster;
use crate::display::region::{DirtySet, Region};
use crate::display::renderer::Painter;
use crate::display::traits::{Clock, Screen};
use crate::dpms::{DpmsState, DpmsWatcher};
use crate::pacer::Pacer;

/// Shared stop flag for one monitor loop
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositorState {
    Init,
    SteadyLoop,
    Stopped,
}

/// What a single tick did
#[derive(Debug)]
pub enum TickOutcome {
    /// Rectangles pushed (possibly zero)
    Drawn(usize),
    /// Snapshot failed; nothing pushed
    Skipped(MetricsError),
    /// A push failed; the rest of the tick was dropped
    Dropped(TransportError),
    /// Host displays are asleep; panel is off
    Asleep,
}

/// A monitor screen: fixed layout, static chrome, and per-tick updates
pub trait View: Send {
    fn name(&self) -> &str;

    /// Compute fixed rectangles for the logical panel size
    fn layout(&mut self, width: u32, height: u32) -> Result<(), MetricsError>;

    /// Separators and labels drawn once on a cleared raster
    fn draw_static(&self, painter: &mut Painter<'_>);

    /// Pull a snapshot and redraw whatever the cache says changed
    fn render(&mut self, frame: &mut Frame<'_>) -> Result<(), MetricsError>;
}

impl<V: View + ?Sized> View for Box<V> {
    fn name(&self) -> &str { (**self).name() }
    fn layout(&mut self, width: u32, height: u32) -> Result<(), MetricsError> {
        (**self).layout(width, height)
    }
    fn draw_static(&self, painter: &mut Painter<'_>) { (**self).draw_static(painter) }
    fn render(&mut self, frame: &mut Frame<'_>) -> Result<(), MetricsError> { (**self).render(frame) }
}

/// Per-tick drawing context handed to [`View::render`]
pub struct Frame<'a> {
    painter: Painter<'a>,
    cache: &'a mut RegionCache,
    dirty: &'a mut DirtySet,
    width: u32,
    height: u32,
}

impl<'a> Frame<'a> {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn palette(&self) -> Palette {
        *self.painter.palette()
    }

    pub fn changed(&mut self, key: &str, value: impl Into<CacheValue>) -> bool {
        self.cache.changed(key, value)
    }

    pub fn changed_float(&mut self, key: &str, value: f64, threshold: f64) -> bool {
        self.cache.changed_float(key, value, threshold)
    }

    /// Queue a rectangle for this tick's push
    pub fn touch(&mut self, region: Region) {
        self.dirty.touch(region);
    }

    pub fn painter(&mut self) -> &mut Painter<'a> {
        &mut self.painter
    }
}

/// Owns one screen, one view, and everything needed to keep them in sync
pub struct Compositor<S: Screen, V: View> {
    screen: S,
    view: V,
    palette: Palette,
    raster: Raster,
    cache: RegionCache,
    dirty: DirtySet,
    pixels: Vec<Rgb888>,
    state: CompositorState,
    dpms: Option<DpmsWatcher>,
    asleep: bool,
}

impl<S: Screen, V: View> Compositor<S, V> {
    pub fn new(screen: S, view: V, palette: Palette) -> Self {
        let raster = Raster::new(screen.width(), screen.height(), palette.bg);
        Self {
            screen,
            view,
            palette,
            raster,
            cache: RegionCache::new(),
            dirty: DirtySet::new(),
            pixels: Vec::new(),
            state: CompositorState::Init,
            dpms: None,
            asleep: false,
        }
    }

    /// Blank the panel while the host displays sleep
    pub fn with_dpms(mut self, watcher: DpmsWatcher) -> Self {
        self.asleep = watcher.last().is_asleep();
        self.dpms = Some(watcher);
        self
    }

    pub fn state(&self) -> CompositorState {
        self.state
    }

    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn screen(&self) -> &S {
        &self.screen
    }

    /// Layout, clear, static chrome, full push
    pub fn init(&mut self) -> Result<(), MonitorError> {
        self.view.layout(self.screen.width(), self.screen.height())?;
        self.raster.fill(self.palette.bg);
        self.view.draw_static(&mut Painter::new(&mut self.raster, &self.palette));
        self.push_full().map_err(MonitorError::InitialDraw)?;
        if self.asleep {
            self.screen.screen_off().ok();
        }
        self.state = CompositorState::SteadyLoop;
        info!("{}: started on {}x{} panel", self.view.name(), self.screen.width(), self.screen.height());
        Ok(())
    }

    fn push_full(&mut self) -> Result<(), TransportError> {
        let bounds = self.raster.copy_region(self.raster.bounds(), &mut self.pixels);
        self.screen.draw_region(bounds, &self.pixels)
    }

    /// Returns false while the panel should stay dark
    fn follow_dpms(&mut self) -> Result<bool, TransportError> {
        let Some(watcher) = self.dpms.as_mut() else {
            return Ok(true);
        };
        match watcher.poll() {
            Some(s) if s.is_asleep() => {
                info!("{}: host displays {:?}, panel off", self.view.name(), s);
                self.asleep = true;
                self.screen.screen_off()?;
            }
            Some(DpmsState::On) => {
                info!("{}: host displays on, panel on", self.view.name());
                self.asleep = false;
                self.screen.screen_on()?;
                self.push_full()?;
            }
            _ => {}
        }
        Ok(!self.asleep)
    }

    /// One render cycle
    pub fn tick(&mut self) -> TickOutcome {
        match self.follow_dpms() {
            Ok(true) => {}
            Ok(false) => return TickOutcome::Asleep,
            Err(e) => return TickOutcome::Dropped(e),
        }

        self.cache.begin_cycle();
        let (width, height) = (self.raster.width(), self.raster.height());
        let rendered = {
            let mut frame = Frame {
                painter: Painter::new(&mut self.raster, &self.palette),
                cache: &mut self.cache,
                dirty: &mut self.dirty,
                width,
                height,
            };
            self.view.render(&mut frame)
        };
        let regions = self.dirty.take();

        if let Err(e) = rendered {
            // elements drawn before the failure never reached the panel
            self.cache.rollback_cycle();
            return TickOutcome::Skipped(e);
        }

        let mut sent = 0;
        for region in regions {
            let region = self.raster.copy_region(region, &mut self.pixels);
            if region.is_empty() {
                continue;
            }
            if let Err(e) = self.screen.draw_region(region, &self.pixels) {
                let forgotten = self.cache.rollback_cycle();
                debug!("{}: {} elements queued for redraw", self.view.name(), forgotten);
                return TickOutcome::Dropped(e);
            }
            sent += 1;
        }
        TickOutcome::Drawn(sent)
    }

    /// Init, then tick every `interval` until `stop` is raised.
    ///
    /// The screen is closed on every exit path.
    pub fn run(&mut self, interval: Duration, clock: &dyn Clock, stop: &StopHandle) -> Result<(), MonitorError> {
        if let Err(e) = self.init() {
            self.shutdown();
            return Err(e);
        }

        let mut pacer = Pacer::new(interval, clock.now());
        while !stop.is_stopped() {
            pacer.wait(clock);
            if stop.is_stopped() {
                break;
            }
            match self.tick() {
                TickOutcome::Drawn(0) | TickOutcome::Asleep => {}
                TickOutcome::Drawn(n) => debug!("{}: updated {} regions", self.view.name(), n),
                TickOutcome::Skipped(e) => warn!("{}: update skipped: {}", self.view.name(), e),
                TickOutcome::Dropped(e) => error!("{}: panel write failed: {}", self.view.name(), e),
            }
        }

        self.shutdown();
        Ok(())
    }

    fn shutdown(&mut self) {
        if self.state != CompositorState::Stopped {
            self.state = CompositorState::Stopped;
            self.screen.close();
            info!("{}: stopped", self.view.name());
        }
    }
}
