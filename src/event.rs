//! Tagged event records consumed by the dispatcher, and swipe
//! classification - no I/O, fully testable.

use strum::{Display, IntoStaticStr};

use crate::geometry::{DisplaySize, TouchPoint};
use crate::pool::WidgetId;
use crate::slider::SliderId;

/// One event for the dispatcher, either from the local touch transport or
/// injected by a remote host.
#[derive(Debug, Clone, Copy, PartialEq, IntoStaticStr)]
pub enum TouchEvent {
    Down(TouchPoint),
    Move(TouchPoint),
    Up(TouchPoint),
    /// The transport could not read a valid sample.
    Error,
    /// Host resolved a button press: call the widget's function with `value`.
    ButtonCallback { widget: WidgetId, value: i16 },
    /// Host resolved a slider drag: apply `value` to the slider.
    SliderCallback { slider: SliderId, value: i16 },
    /// Answer to a pending number request.
    NumberCallback { value: f32 },
    /// Swipe already measured by the host.
    SwipeCallback { start: TouchPoint, dx: i16, dy: i16 },
    /// Host detected a long press at this position.
    LongPress(TouchPoint),
    ConnectionUp(DisplaySize),
    Resize(DisplaySize),
}

impl TouchEvent {
    pub fn name(&self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SwipeAxis {
    X,
    Y,
}

/// A classified swipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwipeInfo {
    pub start: TouchPoint,
    pub dx: i16,
    pub dy: i16,
    /// Axis with the larger displacement; X on a tie.
    pub axis: SwipeAxis,
    /// Absolute displacement along `axis`.
    pub magnitude: u16,
}

impl SwipeInfo {
    pub fn from_delta(start: TouchPoint, dx: i16, dy: i16) -> Self {
        let (adx, ady) = (dx.unsigned_abs(), dy.unsigned_abs());
        let (axis, magnitude) = if adx >= ady {
            (SwipeAxis::X, adx)
        } else {
            (SwipeAxis::Y, ady)
        };
        Self {
            start,
            dx,
            dy,
            axis,
            magnitude,
        }
    }
}

/// Displacement from `from` to `to`, saturated to `i16`.
pub fn delta(from: TouchPoint, to: TouchPoint) -> (i16, i16) {
    (to.x.saturating_sub(from.x), to.y.saturating_sub(from.y))
}

/// `true` while both axes moved less than `threshold` pixels.
pub fn within_threshold(from: TouchPoint, to: TouchPoint, threshold: u16) -> bool {
    let (dx, dy) = delta(from, to);
    dx.unsigned_abs() < threshold && dy.unsigned_abs() < threshold
}

/// Classify the sequence `down -> up` as a swipe if either axis moved at
/// least `threshold` pixels.
pub fn detect_swipe(down: TouchPoint, up: TouchPoint, threshold: u16) -> Option<SwipeInfo> {
    if within_threshold(down, up, threshold) {
        return None;
    }
    let (dx, dy) = delta(down, up);
    Some(SwipeInfo::from_delta(down, dx, dy))
}

/// Result of one `poll_once` call, for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum PollStatus {
    /// Nothing touch-related happened.
    #[default]
    NoTouch,
    /// A touch was handled but no widget or slider claimed it.
    TouchNoMatch,
    /// A widget or slider claimed the touch.
    TouchMatched,
}

impl PollStatus {
    /// Combine two results of the same poll; the more specific one wins.
    pub fn merge(self, other: PollStatus) -> PollStatus {
        match (self, other) {
            (PollStatus::TouchMatched, _) | (_, PollStatus::TouchMatched) => PollStatus::TouchMatched,
            (PollStatus::TouchNoMatch, _) | (_, PollStatus::TouchNoMatch) => PollStatus::TouchNoMatch,
            _ => PollStatus::NoTouch,
        }
    }
}
