/*
 *  display/factory.rs
 *
 *  lcdmon - smart screen monitor
 *  (c) 2020-26 Stuart Hunter
 *
 *  Screen factory - hardware panel or simulated panel from configuration
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

use log::info;

use crate::display::drivers::serial::{SerialOpener, SerialPanel};
use crate::display::drivers::simulated::SimulatedScreen;
use crate::display::error::ConnectionError;
use crate::display::session::PanelConfig;
use crate::display::traits::{Screen, SystemClock};

/// Type alias for boxed screen trait objects
pub type BoxedScreen = Box<dyn Screen>;

/// Factory for creating screens from panel configuration
pub struct ScreenFactory;

impl ScreenFactory {
    /// Open the configured panel, or a simulated one.
    ///
    /// A real panel runs the full open sequence here, including the reset
    /// pause, so this blocks for several seconds.
    pub fn create(config: &PanelConfig, simulated: bool) -> Result<BoxedScreen, ConnectionError> {
        if simulated {
            info!("Simulation mode enabled - {} will not be opened", config.port);
            return Ok(Box::new(SimulatedScreen::new(config.width, config.height, config.orientation)));
        }
        let panel: SerialPanel = SerialPanel::open(config, SerialOpener, SystemClock)?;
        Ok(Box::new(panel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::traits::Orientation;

    #[test]
    fn test_simulated_never_touches_port() {
        let config = PanelConfig {
            port: "/nonexistent/ttyACM9".into(),
            orientation: Orientation::Portrait,
            ..PanelConfig::default()
        };
        let screen = ScreenFactory::create(&config, true).unwrap();
        assert_eq!((screen.width(), screen.height()), (320, 480));
    }

    #[test]
    fn test_missing_port_is_connection_error() {
        let config = PanelConfig { port: "/nonexistent/ttyACM9".into(), ..PanelConfig::default() };
        let err = ScreenFactory::create(&config, false).err().unwrap();
        assert_eq!(err.port, "/nonexistent/ttyACM9");
    }
}
