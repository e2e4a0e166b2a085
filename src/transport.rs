//! Touch input sources.
//!
//! [`TouchTransport`] is the polled single-point interface the dispatcher
//! reads each loop. [`ContactTracker`] is the pure half of the Linux evdev
//! reader: it folds multi-touch protocol events into DOWN/MOVE/UP
//! transitions of the first contact, scaled to display pixels.
//! [`SharedContact`] carries the tracker's state from the reader thread to
//! the polling loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::event::TouchEvent;
use crate::geometry::{DisplaySize, TouchPoint};

/// Polled touch source reporting one contact.
pub trait TouchTransport {
    /// `true` while the panel is touched.
    fn was_touched(&mut self) -> bool;

    fn x(&self) -> i16;

    fn y(&self) -> i16;

    fn position(&self) -> TouchPoint {
        TouchPoint::new(self.x(), self.y())
    }
}

// -- Shared contact state ------------------------------------

/// Latest state of the followed contact, written by a reader thread and
/// polled through [`TouchTransport`].
///
/// Only the current state is kept, so a burst of transitions between two
/// polls collapses into the last one. A lift after a seen DOWN is never
/// lost; a whole contact shorter than one poll interval is not seen.
#[derive(Debug, Default)]
pub struct SharedContact {
    down: AtomicBool,
    lost: AtomicBool,
    /// x in the high half, y in the low half.
    position: AtomicU32,
}

impl SharedContact {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a transition reported by [`ContactTracker::feed`].
    pub fn publish(&self, event: TouchEvent) {
        match event {
            TouchEvent::Down(point) | TouchEvent::Move(point) => {
                let packed = (u32::from(point.x as u16) << 16) | u32::from(point.y as u16);
                self.position.store(packed, Ordering::Release);
                self.down.store(true, Ordering::Release);
            }
            TouchEvent::Up(_) => self.down.store(false, Ordering::Release),
            _ => {}
        }
    }

    /// The device went away; the contact ends without a regular lift.
    pub fn mark_lost(&self) {
        self.lost.store(true, Ordering::Release);
        self.down.store(false, Ordering::Release);
    }

    /// `true` once after [`mark_lost`](Self::mark_lost).
    pub fn take_lost(&self) -> bool {
        self.lost.swap(false, Ordering::AcqRel)
    }

    pub fn is_down(&self) -> bool {
        self.down.load(Ordering::Acquire)
    }

    pub fn point(&self) -> TouchPoint {
        let packed = self.position.load(Ordering::Acquire);
        TouchPoint::new((packed >> 16) as u16 as i16, packed as u16 as i16)
    }
}

impl TouchTransport for Arc<SharedContact> {
    fn was_touched(&mut self) -> bool {
        self.is_down()
    }

    fn x(&self) -> i16 {
        self.point().x
    }

    fn y(&self) -> i16 {
        self.point().y
    }

    fn position(&self) -> TouchPoint {
        self.point()
    }
}

// -- evdev ----------------------------------------------------

/// Relevant multi-touch protocol events, decoupled from `evdev` types for
/// testability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawTouchEvent {
    Slot(i32),
    PositionX(i32),
    PositionY(i32),
    TrackingId(i32),
    ContactUp,
    SynReport,
}

/// Classify a single `evdev::InputEvent`. Returns `None` for irrelevant
/// events.
pub fn classify_event(event: &evdev::InputEvent) -> Option<RawTouchEvent> {
    use evdev::{AbsoluteAxisType, InputEventKind};

    match event.kind() {
        InputEventKind::AbsAxis(axis) => match axis {
            AbsoluteAxisType::ABS_MT_SLOT => Some(RawTouchEvent::Slot(event.value())),
            AbsoluteAxisType::ABS_MT_POSITION_X => Some(RawTouchEvent::PositionX(event.value())),
            AbsoluteAxisType::ABS_MT_POSITION_Y => Some(RawTouchEvent::PositionY(event.value())),
            AbsoluteAxisType::ABS_MT_TRACKING_ID => {
                if event.value() == -1 {
                    Some(RawTouchEvent::ContactUp)
                } else {
                    Some(RawTouchEvent::TrackingId(event.value()))
                }
            }
            _ => None,
        },
        InputEventKind::Synchronization(evdev::Synchronization::SYN_REPORT) => {
            Some(RawTouchEvent::SynReport)
        }
        _ => None,
    }
}

/// Linear mapping from a device axis range to display pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisScale {
    pub min: i32,
    pub max: i32,
    pub pixels: u16,
}

impl AxisScale {
    pub fn scale(&self, raw: i32) -> i16 {
        let span = i64::from(self.max - self.min).max(1);
        let last = i64::from(self.pixels.max(1)) - 1;
        let scaled = (i64::from(raw) - i64::from(self.min)) * last / span;
        scaled.clamp(0, last) as i16
    }
}

/// Follows the contact in slot 0 and reports its transitions.
#[derive(Debug)]
pub struct ContactTracker {
    x_scale: AxisScale,
    y_scale: AxisScale,
    slot: i32,
    pending_x: Option<i32>,
    pending_y: Option<i32>,
    contact_ended: bool,
    down: bool,
    last: Option<TouchPoint>,
}

impl ContactTracker {
    pub fn new(x_range: (i32, i32), y_range: (i32, i32), display: DisplaySize) -> Self {
        Self {
            x_scale: AxisScale {
                min: x_range.0,
                max: x_range.1,
                pixels: display.width,
            },
            y_scale: AxisScale {
                min: y_range.0,
                max: y_range.1,
                pixels: display.height,
            },
            slot: 0,
            pending_x: None,
            pending_y: None,
            contact_ended: false,
            down: false,
            last: None,
        }
    }

    pub fn is_down(&self) -> bool {
        self.down
    }

    /// Feed one protocol event; a transition is reported on `SYN_REPORT`.
    pub fn feed(&mut self, event: RawTouchEvent) -> Option<TouchEvent> {
        match event {
            RawTouchEvent::Slot(slot) => self.slot = slot,
            RawTouchEvent::SynReport => return self.flush(),
            // Only slot 0 is followed; other contacts are ignored.
            _ if self.slot != 0 => {}
            RawTouchEvent::PositionX(x) => self.pending_x = Some(x),
            RawTouchEvent::PositionY(y) => self.pending_y = Some(y),
            RawTouchEvent::TrackingId(_) => self.contact_ended = false,
            RawTouchEvent::ContactUp => self.contact_ended = true,
        }
        None
    }

    fn flush(&mut self) -> Option<TouchEvent> {
        if std::mem::take(&mut self.contact_ended) {
            self.pending_x = None;
            self.pending_y = None;
            if !self.down {
                return None;
            }
            self.down = false;
            return Some(TouchEvent::Up(self.last.unwrap_or_default()));
        }

        if self.pending_x.is_none() && self.pending_y.is_none() {
            return None;
        }
        let previous = self.last.unwrap_or_default();
        let point = TouchPoint {
            x: self.pending_x.take().map_or(previous.x, |x| self.x_scale.scale(x)),
            y: self.pending_y.take().map_or(previous.y, |y| self.y_scale.scale(y)),
        };
        self.last = Some(point);

        if !self.down {
            self.down = true;
            Some(TouchEvent::Down(point))
        } else if point != previous {
            Some(TouchEvent::Move(point))
        } else {
            None
        }
    }
}
