//! Drawing contract consumed by widget and slider draw routines.
//!
//! The actual pixel pushing lives with the display driver; the core only
//! issues these calls.

use crate::geometry::{Color, DisplaySize};

/// Width of one character cell per text size unit.
pub const CHAR_WIDTH: u16 = 6;
/// Height of one character cell per text size unit.
pub const CHAR_HEIGHT: u16 = 8;

pub trait RenderSurface {
    /// Fill the inclusive rectangle `(x0, y0)..=(x1, y1)`.
    fn fill_rect(&mut self, x0: i16, y0: i16, x1: i16, y1: i16, color: Color);

    fn draw_text(&mut self, x: i16, y: i16, text: &str, size: u8, fg: Color, bg: Color);

    fn draw_char(&mut self, x: i16, y: i16, ch: char, size: u8, fg: Color, bg: Color);

    fn size(&self) -> DisplaySize;
}

/// Pixel extent of `len` characters drawn at text `size`.
pub fn text_extent(len: usize, size: u8) -> (u32, u32) {
    let size = u32::from(size.max(1));
    (
        len as u32 * u32::from(CHAR_WIDTH) * size,
        u32::from(CHAR_HEIGHT) * size,
    )
}

/// A surface that only logs what would be drawn. Used by the host binary
/// when no physical display is attached.
pub struct LogSurface {
    size: DisplaySize,
}

impl LogSurface {
    pub fn new(size: DisplaySize) -> Self {
        Self { size }
    }
}

impl RenderSurface for LogSurface {
    fn fill_rect(&mut self, x0: i16, y0: i16, x1: i16, y1: i16, color: Color) {
        log::trace!("fill_rect ({x0},{y0})-({x1},{y1}) {:#06x}", color.0);
    }

    fn draw_text(&mut self, x: i16, y: i16, text: &str, size: u8, _fg: Color, _bg: Color) {
        log::trace!("draw_text ({x},{y}) size {size}: {text}");
    }

    fn draw_char(&mut self, x: i16, y: i16, ch: char, size: u8, _fg: Color, _bg: Color) {
        log::trace!("draw_char ({x},{y}) size {size}: {ch}");
    }

    fn size(&self) -> DisplaySize {
        self.size
    }
}
