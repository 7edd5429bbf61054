/*
 *  display/protocol.rs
 *
 *  lcdmon - smart screen monitor
 *  (c) 2020-26 Stuart Hunter
 *
 *  Turing smart screen (Rev A) command framing
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

/// Length of every command frame on the wire
pub const FRAME_LEN: usize = 6;

/// Handshake pattern sent before and after the reset
pub const HELLO: [u8; FRAME_LEN] = [0x45; FRAME_LEN];

/// Largest coordinate the 10-bit packed fields can carry
pub const MAX_COORD: u16 = 0x3FF;

/// Rev A command bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    Reset = 101,
    Clear = 102,
    ScreenOff = 108,
    ScreenOn = 109,
    SetBrightness = 110,
    SetOrientation = 121,
    DisplayBitmap = 197,
}

impl Command {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            101 => Some(Command::Reset),
            102 => Some(Command::Clear),
            108 => Some(Command::ScreenOff),
            109 => Some(Command::ScreenOn),
            110 => Some(Command::SetBrightness),
            121 => Some(Command::SetOrientation),
            197 => Some(Command::DisplayBitmap),
            _ => None,
        }
    }
}

/// A decoded command frame: the command and its two coordinate pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub command: u8,
    pub x: u16,
    pub y: u16,
    pub ex: u16,
    pub ey: u16,
}

/// Pack a command and a rectangle (x, y)..(ex, ey) into 40 bits + command byte.
///
/// Coordinates are masked to 10 bits; the panel never addresses beyond 1023.
pub fn encode(command: Command, x: u16, y: u16, ex: u16, ey: u16) -> [u8; FRAME_LEN] {
    encode_raw(command as u8, x, y, ex, ey)
}

pub fn encode_raw(command: u8, x: u16, y: u16, ex: u16, ey: u16) -> [u8; FRAME_LEN] {
    let (x, y, ex, ey) = (x & MAX_COORD, y & MAX_COORD, ex & MAX_COORD, ey & MAX_COORD);
    [
        (x >> 2) as u8,
        (((x & 3) << 6) | (y >> 4)) as u8,
        (((y & 15) << 4) | (ex >> 6)) as u8,
        (((ex & 63) << 2) | (ey >> 8)) as u8,
        (ey & 255) as u8,
        command,
    ]
}

/// Inverse of [`encode`], used by diagnostics and the capturing test link
pub fn decode(frame: &[u8; FRAME_LEN]) -> Frame {
    let b: [u16; FRAME_LEN] = frame.map(u16::from);
    Frame {
        x: (b[0] << 2) | (b[1] >> 6),
        y: ((b[1] & 0x3F) << 4) | (b[2] >> 4),
        ex: ((b[2] & 0x0F) << 6) | (b[3] >> 2),
        ey: ((b[3] & 0x03) << 8) | b[4],
        command: frame[5],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_bitmap_header() {
        // full 480x320 landscape frame
        let f = encode(Command::DisplayBitmap, 0, 0, 479, 319);
        assert_eq!(f, [0x00, 0x00, 0x07, 0x7D, 0x3F, 197]);
    }

    #[test]
    fn test_decode_recovers_inputs() {
        let cases = [
            (Command::DisplayBitmap, 0, 0, 0, 0),
            (Command::DisplayBitmap, 5, 8, 474, 31),
            (Command::DisplayBitmap, 1023, 1023, 1023, 1023),
            (Command::SetBrightness, 178, 0, 0, 0),
            (Command::SetOrientation, 3, 0, 0, 0),
            (Command::DisplayBitmap, 1, 2, 3, 4),
            (Command::DisplayBitmap, 682, 341, 170, 597),
        ];
        for (cmd, x, y, ex, ey) in cases {
            let d = decode(&encode(cmd, x, y, ex, ey));
            assert_eq!(d, Frame { command: cmd as u8, x, y, ex, ey });
            assert_eq!(Command::from_byte(d.command), Some(cmd));
        }
    }

    #[test]
    fn test_value_rides_in_x_field() {
        let f = encode(Command::SetBrightness, 255, 0, 0, 0);
        assert_eq!(f, [0x3F, 0xC0, 0x00, 0x00, 0x00, 110]);
    }

    #[test]
    fn test_unknown_command_byte() {
        assert_eq!(Command::from_byte(0x45), None);
    }
}
