//! Screen geometry shared by widgets, sliders and the dispatcher.

/// A single touch position in display pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TouchPoint {
    pub x: i16,
    pub y: i16,
}

impl TouchPoint {
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle. `x`/`y` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    pub const fn new(x: i16, y: i16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Inclusive right edge.
    pub fn right(&self) -> i32 {
        i32::from(self.x) + i32::from(self.width) - 1
    }

    /// Inclusive bottom edge.
    pub fn bottom(&self) -> i32 {
        i32::from(self.y) + i32::from(self.height) - 1
    }

    pub fn center(&self) -> TouchPoint {
        TouchPoint {
            x: (i32::from(self.x) + i32::from(self.width) / 2) as i16,
            y: (i32::from(self.y) + i32::from(self.height) / 2) as i16,
        }
    }

    /// Inclusive containment test with `border` extra pixels on every side.
    ///
    /// The expanded left/top edge never goes below coordinate 0.
    pub fn contains_with_border(&self, point: TouchPoint, border: u16) -> bool {
        let border = i32::from(border);
        let left = (i32::from(self.x) - border).max(0);
        let top = (i32::from(self.y) - border).max(0);
        let right = self.right() + border;
        let bottom = self.bottom() + border;
        let (x, y) = (i32::from(point.x), i32::from(point.y));
        x >= left && x <= right && y >= top && y <= bottom
    }

    /// Move/shrink the rectangle so that it lies inside `size`.
    ///
    /// Returns the clamped rectangle and whether anything had to change.
    pub fn clamp_to(&self, size: DisplaySize) -> (Rect, Placement) {
        let max_w = i32::from(size.width);
        let max_h = i32::from(size.height);
        let width = i32::from(self.width).min(max_w);
        let height = i32::from(self.height).min(max_h);
        let x = i32::from(self.x).clamp(0, max_w - width);
        let y = i32::from(self.y).clamp(0, max_h - height);
        let clamped = Rect {
            x: x as i16,
            y: y as i16,
            width: width as u16,
            height: height as u16,
        };
        let placement = if clamped == *self {
            Placement::Fits
        } else {
            Placement::Clamped
        };
        (clamped, placement)
    }
}

/// Size of the attached display in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySize {
    pub width: u16,
    pub height: u16,
}

impl DisplaySize {
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

impl Default for DisplaySize {
    fn default() -> Self {
        Self::new(320, 240)
    }
}

/// Non-fatal geometry status returned by widget and slider configuration calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Geometry and caption were used as given.
    Fits,
    /// Geometry or caption was clamped to fit the display.
    Clamped,
}

impl Placement {
    pub fn merge(self, other: Placement) -> Placement {
        if self == Placement::Clamped || other == Placement::Clamped {
            Placement::Clamped
        } else {
            Placement::Fits
        }
    }
}

/// RGB565 colour as sent to the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color(pub u16);

impl Color {
    pub const BLACK: Color = Color(0x0000);
    pub const WHITE: Color = Color(0xFFFF);
    pub const RED: Color = Color(0xF800);
    pub const GREEN: Color = Color(0x07E0);
    pub const BLUE: Color = Color(0x001F);
    pub const GREY: Color = Color(0x8410);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color((((r as u16) & 0xF8) << 8) | (((g as u16) & 0xFC) << 3) | ((b as u16) >> 3))
    }
}
