/*
 *  display/drivers/mock.rs
 *
 *  lcdmon - smart screen monitor
 *  (c) 2020-26 Stuart Hunter
 *
 *  Capturing serial link, fake clock and recording screen for tests
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
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use embedded_graphics::pixelcolor::Rgb888;

use crate::display::error::TransportError;
use crate::display::protocol::{self, Command};
use crate::display::region::Region;
use crate::display::traits::{Clock, LinkOpener, Screen, SerialLink, SerialSettings};

/// Everything observable on the fake wire, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    Open,
    Write(Vec<u8>),
    Close,
    Sleep(Duration),
}

impl MockEvent {
    /// A command frame with its value in the x field
    pub fn command(command: Command, x: u16) -> Self {
        MockEvent::Write(protocol::encode(command, x, 0, 0, 0).to_vec())
    }
}

/// Internal state shared by the opener, its links and the fake clock
#[derive(Debug, Default)]
pub struct MockState {
    pub events: Vec<MockEvent>,
    /// Successful opens still allowed (None = unlimited)
    pub opens_left: Option<usize>,
    /// Successful writes still allowed (None = unlimited)
    pub writes_left: Option<usize>,
    /// Links currently open
    pub live_links: usize,
    /// Bytes returned by every read; empty means the read times out
    pub reply: Vec<u8>,
    pub elapsed: Duration,
}

/// Link opener that records every open, write and close
#[derive(Debug, Clone, Default)]
pub struct MockLinkOpener {
    state: Arc<Mutex<MockState>>,
}

impl MockLinkOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get reference to state for inspection in tests
    pub fn state(&self) -> Arc<Mutex<MockState>> {
        Arc::clone(&self.state)
    }

    pub fn events(&self) -> Vec<MockEvent> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.lock().unwrap().events.clear();
    }

    pub fn open_links(&self) -> usize {
        self.state.lock().unwrap().live_links
    }

    pub fn fail_open_after(&self, successes: usize) {
        self.state.lock().unwrap().opens_left = Some(successes);
    }

    pub fn fail_writes_after(&self, successes: usize) {
        self.state.lock().unwrap().writes_left = Some(successes);
    }

    pub fn set_reply(&self, reply: &[u8]) {
        self.state.lock().unwrap().reply = reply.to_vec();
    }
}

impl LinkOpener for MockLinkOpener {
    type Link = MockLink;

    fn open(&mut self, _settings: &SerialSettings) -> io::Result<MockLink> {
        let mut state = self.state.lock().unwrap();
        if let Some(left) = state.opens_left.as_mut() {
            if *left == 0 {
                return Err(io::Error::new(io::ErrorKind::NotFound, "simulated open failure"));
            }
            *left -= 1;
        }
        state.events.push(MockEvent::Open);
        state.live_links += 1;
        Ok(MockLink { state: Arc::clone(&self.state) })
    }
}

#[derive(Debug)]
pub struct MockLink {
    state: Arc<Mutex<MockState>>,
}

impl SerialLink for MockLink {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(left) = state.writes_left.as_mut() {
            if *left == 0 {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "simulated write failure"));
            }
            *left -= 1;
        }
        state.events.push(MockEvent::Write(buf.to_vec()));
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let state = self.state.lock().unwrap();
        if state.reply.is_empty() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "simulated read timeout"));
        }
        let n = state.reply.len().min(buf.len());
        buf[..n].copy_from_slice(&state.reply[..n]);
        Ok(n)
    }
}

impl Drop for MockLink {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.events.push(MockEvent::Close);
        state.live_links -= 1;
    }
}

/// Virtual clock; sleeping advances time instantly and is recorded
#[derive(Debug, Clone)]
pub struct FakeClock {
    base: Instant,
    state: Arc<Mutex<MockState>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self { base: Instant::now(), state: Arc::default() }
    }

    /// A clock whose sleeps land in the opener's event log
    pub fn sharing(opener: &MockLinkOpener) -> Self {
        Self { base: Instant::now(), state: opener.state() }
    }

    pub fn advance(&self, d: Duration) {
        self.state.lock().unwrap().elapsed += d;
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.state
            .lock()
            .unwrap()
            .events
            .iter()
            .filter_map(|e| match e {
                MockEvent::Sleep(d) => Some(*d),
                _ => None,
            })
            .collect()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.base + self.state.lock().unwrap().elapsed
    }

    fn sleep(&self, duration: Duration) {
        let mut state = self.state.lock().unwrap();
        state.events.push(MockEvent::Sleep(duration));
        state.elapsed += duration;
    }
}

/// Recorded state of a [`MockScreen`]
#[derive(Debug, Default)]
pub struct MockScreenState {
    pub draws: Vec<Region>,
    pub last_pixels: Vec<Rgb888>,
    pub screen_on_count: usize,
    pub screen_off_count: usize,
    pub close_count: usize,
    pub simulate_draw_failure: bool,
}

/// Screen that records draw calls instead of talking to hardware
#[derive(Debug, Clone)]
pub struct MockScreen {
    width: u32,
    height: u32,
    state: Arc<Mutex<MockScreenState>>,
}

impl MockScreen {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, state: Arc::default() }
    }

    pub fn state(&self) -> Arc<Mutex<MockScreenState>> {
        Arc::clone(&self.state)
    }

    pub fn draws(&self) -> Vec<Region> {
        self.state.lock().unwrap().draws.clone()
    }

    pub fn reset_state(&self) {
        *self.state.lock().unwrap() = MockScreenState::default();
    }
}

impl Screen for MockScreen {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn draw_region(&mut self, region: Region, pixels: &[Rgb888]) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        if state.simulate_draw_failure {
            return Err(TransportError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "simulated draw failure")));
        }
        assert!(region.fits_within(self.width, self.height), "region {region} out of bounds");
        assert_eq!(pixels.len(), region.area());
        state.draws.push(region);
        state.last_pixels = pixels.to_vec();
        Ok(())
    }

    fn screen_on(&mut self) -> Result<(), TransportError> {
        self.state.lock().unwrap().screen_on_count += 1;
        Ok(())
    }

    fn screen_off(&mut self) -> Result<(), TransportError> {
        self.state.lock().unwrap().screen_off_count += 1;
        Ok(())
    }

    fn close(&mut self) {
        self.state.lock().unwrap().close_count += 1;
    }
}
