//! Terminal adapters, compiled with the `tui` feature.
//!
//! The core hands out [`Rgb`] values and JSON payloads only. A ratatui front end uses
//! this module to degrade those colors to what the terminal can show and to draw the
//! debug overlay.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Color,
    widgets::{Paragraph, Widget},
};
use supports_color::Stream;

use crate::color::Rgb;
use crate::debug::DebugState;

/// xterm levels of each axis of the 6x6x6 color cube.
const CUBE_LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];

const BASIC_COLORS: [(Rgb, Color); 8] = [
    (Rgb(0, 0, 0), Color::Black),
    (Rgb(205, 0, 0), Color::Red),
    (Rgb(0, 205, 0), Color::Green),
    (Rgb(205, 205, 0), Color::Yellow),
    (Rgb(0, 0, 238), Color::Blue),
    (Rgb(205, 0, 205), Color::Magenta),
    (Rgb(0, 205, 205), Color::Cyan),
    (Rgb(229, 229, 229), Color::White),
];

/// Color depth available to a terminal renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSupport {
    NoColor,
    Basic,
    Ansi256,
    TrueColor,
}

impl ColorSupport {
    /// Detect from the environment (`NO_COLOR`, then stdout capabilities).
    pub fn detect() -> Self {
        if std::env::var("NO_COLOR").is_ok() {
            return Self::NoColor;
        }
        match supports_color::on(Stream::Stdout) {
            Some(level) if level.has_16m => Self::TrueColor,
            Some(level) if level.has_256 => Self::Ansi256,
            Some(_) => Self::Basic,
            None => Self::NoColor,
        }
    }
}

fn distance(a: Rgb, b: Rgb) -> u32 {
    let d = |x: u8, y: u8| (x as i32 - y as i32).pow(2) as u32;
    d(a.0, b.0) + d(a.1, b.1) + d(a.2, b.2)
}

fn nearest_level(v: u8) -> usize {
    CUBE_LEVELS
        .iter()
        .enumerate()
        .min_by_key(|&(_, &level)| (level as i16 - v as i16).abs())
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Index into the xterm 256-color palette: the closer of the color-cube entry and the
/// grayscale ramp entry.
pub fn to_ansi256(rgb: Rgb) -> u8 {
    let (ri, gi, bi) = (nearest_level(rgb.0), nearest_level(rgb.1), nearest_level(rgb.2));
    let cube = Rgb(CUBE_LEVELS[ri], CUBE_LEVELS[gi], CUBE_LEVELS[bi]);
    let cube_index = 16 + 36 * ri as u8 + 6 * gi as u8 + bi as u8;

    let avg = (rgb.0 as u16 + rgb.1 as u16 + rgb.2 as u16) / 3;
    let step = (avg.saturating_sub(3) / 10).min(23) as u8;
    let level = 8 + 10 * step;
    let gray = Rgb(level, level, level);

    if distance(rgb, gray) < distance(rgb, cube) {
        232 + step
    } else {
        cube_index
    }
}

/// Closest of the eight basic ANSI colors.
pub fn to_basic_ansi(rgb: Rgb) -> Color {
    BASIC_COLORS
        .iter()
        .min_by_key(|(candidate, _)| distance(rgb, *candidate))
        .map(|(_, color)| *color)
        .unwrap_or(Color::Reset)
}

impl Rgb {
    /// Terminal color for the given capability.
    pub fn to_terminal_color(self, support: ColorSupport) -> Color {
        match support {
            ColorSupport::NoColor => Color::Reset,
            ColorSupport::TrueColor => Color::Rgb(self.0, self.1, self.2),
            ColorSupport::Ansi256 => Color::Indexed(to_ansi256(self)),
            ColorSupport::Basic => to_basic_ansi(self),
        }
    }
}

impl From<Rgb> for Color {
    fn from(rgb: Rgb) -> Self {
        Color::Rgb(rgb.0, rgb.1, rgb.2)
    }
}

impl Widget for &DebugState {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if !self.enabled {
            return;
        }
        Paragraph::new(self.summary()).render(area, buf);
    }
}
