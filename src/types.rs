// Shared types module - screen geometry, points, colors and host events

use anyhow::Result;

// Target geometry of the display surface; all centering math assumes it
pub const SCREEN_TOTAL_WIDTH: usize = 144;
pub const SCREEN_TOTAL_HEIGHT: usize = 168;
pub const SCREEN_MARGIN: i32 = 10;
pub const SCREEN_LEFT: i32 = 0;
pub const SCREEN_TOP: i32 = SCREEN_MARGIN;
pub const SCREEN_RIGHT: i32 = SCREEN_TOTAL_WIDTH as i32;
pub const SCREEN_BOTTOM: i32 = SCREEN_TOTAL_HEIGHT as i32 - SCREEN_MARGIN;
pub const SCREEN_CENTER_X: i32 = (SCREEN_LEFT + SCREEN_RIGHT) / 2;
pub const SCREEN_CENTER_Y: i32 = (SCREEN_TOP + SCREEN_BOTTOM) / 2;

/// Integer screen coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }
}

// Mode exit reason - why the render loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeExitReason {
    UserQuit,      // User pressed 'q', Esc or Ctrl+C
    FrameLimit,    // Requested number of frames was rendered
}

// Watch-style buttons; subscribed but behaviorally inert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Up,
    Down,
}

// Events a display host can hand back to the render loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    Quit,
    Button(Button),
}

// RGB color representation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    pub const WHITE: Rgb = Rgb { r: 255, g: 255, b: 255 };

    pub fn from_hex(hex: &str) -> Result<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if hex.len() != 6 {
            anyhow::bail!("Invalid hex color: {}", hex);
        }
        Ok(Rgb {
            r: u8::from_str_radix(&hex[0..2], 16)?,
            g: u8::from_str_radix(&hex[2..4], 16)?,
            b: u8::from_str_radix(&hex[4..6], 16)?,
        })
    }

    /// Perceived brightness (0-255), used when writing grayscale images
    pub fn luma(&self) -> u8 {
        ((self.r as u32 * 299 + self.g as u32 * 587 + self.b as u32 * 114) / 1000) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_center() {
        assert_eq!(SCREEN_CENTER_X, 72);
        assert_eq!(SCREEN_CENTER_Y, 84);
    }

    #[test]
    fn test_rgb_from_hex() {
        let c = Rgb::from_hex("#1A2b3C").unwrap();
        assert_eq!(c, Rgb { r: 0x1A, g: 0x2B, b: 0x3C });
        assert!(Rgb::from_hex("12345").is_err());
        assert!(Rgb::from_hex("GG0000").is_err());
    }

    #[test]
    fn test_luma() {
        assert_eq!(Rgb::BLACK.luma(), 0);
        assert_eq!(Rgb::WHITE.luma(), 255);
    }
}
