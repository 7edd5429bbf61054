/*
 *  display/session.rs
 *
 *  lcdmon - smart screen monitor
 *  (c) 2020-26 Stuart Hunter
 *
 *  Panel session: open/reset sequencing, settings and region pushes
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
use std::time::Duration;

use embedded_graphics::pixelcolor::Rgb888;
use log::{debug, info, warn};

use crate::display::color::encode_pixels;
use crate::display::error::{ConnectionError, OpenStep, TransportError};
use crate::display::protocol::{self, Command, HELLO};
use crate::display::region::Region;
use crate::display::traits::{Clock, LinkOpener, Orientation, Screen, SerialLink, SerialSettings};

/// The panel reboots after Reset and ignores the port for this long
pub const RESET_PAUSE: Duration = Duration::from_secs(5);

/// Handshake replies are read into a buffer of this size and discarded
const HELLO_REPLY_LEN: usize = 32;

/// Static panel parameters handed to [`PanelSession::open`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelConfig {
    pub port: String,
    /// Physical (portrait) width
    pub width: u32,
    /// Physical (portrait) height
    pub height: u32,
    /// 0-100, clamped
    pub brightness: u8,
    pub orientation: Orientation,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".to_string(),
            width: 320,
            height: 480,
            brightness: 30,
            orientation: Orientation::ReverseLandscape,
        }
    }
}

/// Where the open sequence currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No channel, or channel just opened and not yet greeted
    Closed,
    /// First handshake written on a fresh channel
    HandshakeSent,
    /// Reset written and channel closed; the panel is rebooting
    ResetSent,
    /// Reset pause elapsed and channel reopened
    Reopening,
    /// Second handshake and settings applied; drawing allowed
    Ready,
}

/// Map the brightness percentage onto the panel's inverted 0-255 scale
pub fn brightness_to_wire(level: u8) -> u16 {
    let level = u16::from(level.min(100));
    255 - (level * 255) / 100
}

/// Connection to one Rev A panel.
///
/// Owns the serial channel exclusively; the protocol is not reentrant so a
/// session is only ever driven from its monitor's loop.
pub struct PanelSession<O: LinkOpener, C: Clock> {
    opener: O,
    clock: C,
    settings: SerialSettings,
    link: Option<O::Link>,
    state: SessionState,
    width: u32,
    height: u32,
    orientation: Orientation,
    brightness: u8,
    scratch: Vec<u8>,
}

impl<O: LinkOpener, C: Clock> PanelSession<O, C> {
    /// Run the full open sequence: hello, reset + reopen, hello, orientation,
    /// brightness, screen on. Any failure releases the channel.
    pub fn open(config: &PanelConfig, opener: O, clock: C) -> Result<Self, ConnectionError> {
        let mut session = Self {
            opener,
            clock,
            settings: SerialSettings::new(config.port.clone()),
            link: None,
            state: SessionState::Closed,
            width: config.width,
            height: config.height,
            orientation: config.orientation,
            brightness: config.brightness.min(100),
            scratch: Vec::new(),
        };

        info!("opening panel on {} ({}x{})", session.settings.port, config.width, config.height);
        while session.state != SessionState::Ready {
            // on error `session` drops here and Drop runs close()
            session.step()?;
        }
        info!("panel {} ready, {}x{} {:?}", session.settings.port, session.width(), session.height(), session.orientation);
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn port(&self) -> &str {
        &self.settings.port
    }

    /// Advance the open sequence by one state
    fn step(&mut self) -> Result<(), ConnectionError> {
        match self.state {
            SessionState::Closed => {
                self.open_link(OpenStep::OpenPort)?;
                self.hello()?;
                self.state = SessionState::HandshakeSent;
            }
            SessionState::HandshakeSent => {
                self.send(Command::Reset, 0, 0, 0, 0)
                    .map_err(|e| self.fail(OpenStep::Reset, e))?;
                // the device drops off the bus while it reboots
                self.link = None;
                self.state = SessionState::ResetSent;
                debug!("{}: reset sent, waiting {:?}", self.settings.port, RESET_PAUSE);
            }
            SessionState::ResetSent => {
                self.clock.sleep(RESET_PAUSE);
                self.open_link(OpenStep::Reopen)?;
                self.state = SessionState::Reopening;
            }
            SessionState::Reopening => {
                self.hello()?;
                self.apply_orientation(self.orientation)
                    .map_err(|e| self.fail(OpenStep::Orientation, e))?;
                self.apply_brightness(self.brightness)
                    .map_err(|e| self.fail(OpenStep::Brightness, e))?;
                self.send(Command::ScreenOn, 0, 0, 0, 0)
                    .map_err(|e| self.fail(OpenStep::ScreenOn, e))?;
                self.state = SessionState::Ready;
            }
            SessionState::Ready => {}
        }
        Ok(())
    }

    fn fail(&self, step: OpenStep, source: io::Error) -> ConnectionError {
        ConnectionError { port: self.settings.port.clone(), step, source }
    }

    fn open_link(&mut self, step: OpenStep) -> Result<(), ConnectionError> {
        let link = self.opener.open(&self.settings).map_err(|e| self.fail(step, e))?;
        self.link = Some(link);
        Ok(())
    }

    /// Write the hello pattern and drain the reply without inspecting it
    fn hello(&mut self) -> Result<(), ConnectionError> {
        let port = self.settings.port.clone();
        let link = self.link.as_mut().ok_or_else(|| ConnectionError {
            port: port.clone(),
            step: OpenStep::Handshake,
            source: io::Error::from(io::ErrorKind::NotConnected),
        })?;
        link.write_all(&HELLO)
            .map_err(|source| ConnectionError { port: port.clone(), step: OpenStep::Handshake, source })?;

        let mut reply = [0u8; HELLO_REPLY_LEN];
        match link.read(&mut reply) {
            Ok(n) => debug!("{port}: hello reply {:02x?}", &reply[..n]),
            // a silent panel is still a listening panel
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                debug!("{port}: no hello reply");
            }
            Err(source) => return Err(ConnectionError { port, step: OpenStep::Handshake, source }),
        }
        Ok(())
    }

    fn send(&mut self, command: Command, x: u16, y: u16, ex: u16, ey: u16) -> io::Result<()> {
        let link = self.link.as_mut().ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))?;
        link.write_all(&protocol::encode(command, x, y, ex, ey))
    }

    fn apply_orientation(&mut self, orientation: Orientation) -> io::Result<()> {
        self.send(Command::SetOrientation, orientation as u16, 0, 0, 0)?;
        self.orientation = orientation;
        Ok(())
    }

    fn apply_brightness(&mut self, level: u8) -> io::Result<()> {
        let level = level.min(100);
        self.send(Command::SetBrightness, brightness_to_wire(level), 0, 0, 0)?;
        self.brightness = level;
        Ok(())
    }

    fn ready(&self) -> Result<(), TransportError> {
        if self.state == SessionState::Ready { Ok(()) } else { Err(TransportError::NotOpen) }
    }

    /// Set brightness in percent (clamped to 0-100)
    pub fn set_brightness(&mut self, level: u8) -> Result<(), TransportError> {
        self.ready()?;
        Ok(self.apply_brightness(level)?)
    }

    /// Change orientation; width/height follow immediately
    pub fn set_orientation(&mut self, orientation: Orientation) -> Result<(), TransportError> {
        self.ready()?;
        Ok(self.apply_orientation(orientation)?)
    }

    /// Clear the panel to black
    pub fn clear(&mut self) -> Result<(), TransportError> {
        self.ready()?;
        Ok(self.send(Command::Clear, 0, 0, 0, 0)?)
    }
}

impl<O: LinkOpener, C: Clock> Screen for PanelSession<O, C> {
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
        self.ready()?;

        let (width, height) = (self.width(), self.height());
        if !region.fits_within(width, height) {
            return Err(TransportError::OutOfBounds { region, width, height });
        }
        if pixels.len() != region.area() {
            return Err(TransportError::PixelCountMismatch { expected: region.area(), actual: pixels.len() });
        }

        let (ex, ey) = region.end();
        self.send(Command::DisplayBitmap, region.x as u16, region.y as u16, ex as u16, ey as u16)?;

        let mut payload = std::mem::take(&mut self.scratch);
        encode_pixels(pixels, &mut payload);
        let written = match self.link.as_mut() {
            Some(link) => link.write_all(&payload),
            None => Err(io::Error::from(io::ErrorKind::NotConnected)),
        };
        self.scratch = payload;
        written?;
        Ok(())
    }

    fn screen_on(&mut self) -> Result<(), TransportError> {
        self.ready()?;
        Ok(self.send(Command::ScreenOn, 0, 0, 0, 0)?)
    }

    fn screen_off(&mut self) -> Result<(), TransportError> {
        self.ready()?;
        Ok(self.send(Command::ScreenOff, 0, 0, 0, 0)?)
    }

    fn close(&mut self) {
        if self.link.is_some() {
            if let Err(e) = self.send(Command::ScreenOff, 0, 0, 0, 0) {
                warn!("{}: screen off on close failed: {}", self.settings.port, e);
            }
            self.link = None;
            info!("panel {} closed", self.settings.port);
        }
        self.state = SessionState::Closed;
    }
}

impl<O: LinkOpener, C: Clock> Drop for PanelSession<O, C> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::drivers::mock::{FakeClock, MockEvent, MockLinkOpener};

    fn config() -> PanelConfig {
        PanelConfig { port: "/dev/fake0".into(), orientation: Orientation::Landscape, ..Default::default() }
    }

    fn open(opener: &MockLinkOpener, clock: &FakeClock) -> PanelSession<MockLinkOpener, FakeClock> {
        PanelSession::open(&config(), opener.clone(), clock.clone()).expect("open")
    }

    #[test]
    fn test_open_sequence_order() {
        let opener = MockLinkOpener::new();
        let clock = FakeClock::sharing(&opener);
        let session = open(&opener, &clock);
        assert_eq!(session.state(), SessionState::Ready);

        let ev = opener.events();
        assert_eq!(ev[0], MockEvent::Open);
        assert_eq!(ev[1], MockEvent::Write(HELLO.to_vec()));
        assert_eq!(ev[2], MockEvent::command(Command::Reset, 0));
        assert_eq!(ev[3], MockEvent::Close);
        assert!(matches!(ev[4], MockEvent::Sleep(d) if d >= Duration::from_secs(5)));
        assert_eq!(ev[5], MockEvent::Open);
        assert_eq!(ev[6], MockEvent::Write(HELLO.to_vec()));
        assert_eq!(ev[7], MockEvent::command(Command::SetOrientation, Orientation::Landscape as u16));
        assert_eq!(ev[8], MockEvent::command(Command::SetBrightness, brightness_to_wire(30)));
        assert_eq!(ev[9], MockEvent::command(Command::ScreenOn, 0));
        assert_eq!(ev.len(), 10);
    }

    #[test]
    fn test_landscape_dimensions() {
        let opener = MockLinkOpener::new();
        let clock = FakeClock::sharing(&opener);
        let mut session = open(&opener, &clock);
        assert_eq!((session.width(), session.height()), (480, 320));

        session.set_orientation(Orientation::Portrait).unwrap();
        assert_eq!((session.width(), session.height()), (320, 480));
    }

    #[test]
    fn test_brightness_scale() {
        assert_eq!(brightness_to_wire(0), 255);
        assert_eq!(brightness_to_wire(100), 0);
        assert_eq!(brightness_to_wire(30), 179);
        assert_eq!(brightness_to_wire(250), 0);
    }

    #[test]
    fn test_open_failure_releases_channel() {
        let opener = MockLinkOpener::new();
        opener.fail_open_after(1);
        let clock = FakeClock::sharing(&opener);
        let err = PanelSession::open(&config(), opener.clone(), clock).err().expect("reopen fails");
        assert_eq!(err.step, OpenStep::Reopen);
        assert_eq!(opener.open_links(), 0);
    }

    #[test]
    fn test_handshake_write_failure() {
        let opener = MockLinkOpener::new();
        opener.fail_writes_after(0);
        let clock = FakeClock::sharing(&opener);
        let err = PanelSession::open(&config(), opener.clone(), clock).err().expect("hello fails");
        assert_eq!(err.step, OpenStep::Handshake);
        assert_eq!(opener.open_links(), 0);
    }

    #[test]
    fn test_draw_region_header_and_payload() {
        let opener = MockLinkOpener::new();
        let clock = FakeClock::sharing(&opener);
        let mut session = open(&opener, &clock);
        opener.clear_events();

        let region = Region::new(5, 8, 2, 2);
        let red = Rgb888::new(255, 0, 0);
        session.draw_region(region, &[red; 4]).unwrap();

        let ev = opener.events();
        assert_eq!(ev.len(), 2);
        assert_eq!(ev[0], MockEvent::Write(protocol::encode(Command::DisplayBitmap, 5, 8, 6, 9).to_vec()));
        assert_eq!(ev[1], MockEvent::Write([0x00, 0xF8].repeat(4)));
    }

    #[test]
    fn test_draw_region_edge_cases() {
        let opener = MockLinkOpener::new();
        let clock = FakeClock::sharing(&opener);
        let mut session = open(&opener, &clock);
        opener.clear_events();

        session.draw_region(Region::new(10, 10, 0, 5), &[]).unwrap();
        assert!(opener.events().is_empty());

        let err = session.draw_region(Region::new(470, 0, 20, 1), &[Rgb888::new(0, 0, 0); 20]).unwrap_err();
        assert!(matches!(err, TransportError::OutOfBounds { .. }));

        let err = session.draw_region(Region::new(0, 0, 2, 2), &[Rgb888::new(0, 0, 0); 3]).unwrap_err();
        assert!(matches!(err, TransportError::PixelCountMismatch { expected: 4, actual: 3 }));
        assert!(opener.events().is_empty());
    }

    #[test]
    fn test_write_failure_is_transport_error() {
        let opener = MockLinkOpener::new();
        let clock = FakeClock::sharing(&opener);
        let mut session = open(&opener, &clock);
        opener.fail_writes_after(0);
        let err = session.draw_region(Region::new(0, 0, 1, 1), &[Rgb888::new(1, 2, 3)]).unwrap_err();
        assert!(matches!(err, TransportError::Io(_)));
    }

    #[test]
    fn test_close_is_idempotent() {
        let opener = MockLinkOpener::new();
        let clock = FakeClock::sharing(&opener);
        let mut session = open(&opener, &clock);
        opener.clear_events();

        session.close();
        session.close();
        drop(session);

        let ev = opener.events();
        assert_eq!(ev, vec![MockEvent::command(Command::ScreenOff, 0), MockEvent::Close]);
    }

    #[test]
    fn test_no_drawing_after_close() {
        let opener = MockLinkOpener::new();
        let clock = FakeClock::sharing(&opener);
        let mut session = open(&opener, &clock);
        session.close();
        let err = session.draw_region(Region::new(0, 0, 1, 1), &[Rgb888::new(0, 0, 0)]).unwrap_err();
        assert!(matches!(err, TransportError::NotOpen));
    }
}
