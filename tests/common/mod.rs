//! Shared fixtures: a recording callback context, a recording render
//! surface and a scripted touch transport.
#![allow(dead_code)]

use tactile::event::SwipeInfo;
use tactile::geometry::{Color, DisplaySize, TouchPoint};
use tactile::pool::WidgetId;
use tactile::render::RenderSurface;
use tactile::slider::SliderId;
use tactile::transport::TouchTransport;

/// Callback context that records every invocation.
#[derive(Debug, Default)]
pub struct Recorder {
    pub taps: Vec<(WidgetId, i16)>,
    pub slider_values: Vec<(SliderId, i16)>,
    pub swipes: Vec<SwipeInfo>,
    pub long_presses: Vec<TouchPoint>,
    pub downs: Vec<TouchPoint>,
    pub moves: Vec<TouchPoint>,
    pub ups: Vec<TouchPoint>,
    pub numbers: Vec<f32>,
    pub connects: Vec<DisplaySize>,
    pub resizes: Vec<DisplaySize>,
}

pub fn record_tap(rec: &mut Recorder, id: WidgetId, value: i16) {
    rec.taps.push((id, value));
}

pub fn record_slider(rec: &mut Recorder, id: SliderId, value: i16) -> i16 {
    rec.slider_values.push((id, value));
    value
}

/// Slider callback that snaps to multiples of 10.
pub fn record_slider_snapped(rec: &mut Recorder, id: SliderId, value: i16) -> i16 {
    rec.slider_values.push((id, value));
    value / 10 * 10
}

pub fn record_swipe(rec: &mut Recorder, swipe: SwipeInfo) {
    rec.swipes.push(swipe);
}

pub fn record_long_press(rec: &mut Recorder, point: TouchPoint) {
    rec.long_presses.push(point);
}

pub fn record_down(rec: &mut Recorder, point: TouchPoint) {
    rec.downs.push(point);
}

pub fn record_move(rec: &mut Recorder, point: TouchPoint) {
    rec.moves.push(point);
}

pub fn record_up(rec: &mut Recorder, point: TouchPoint) {
    rec.ups.push(point);
}

pub fn record_number(rec: &mut Recorder, value: f32) {
    rec.numbers.push(value);
}

pub fn record_connect(rec: &mut Recorder, size: DisplaySize) {
    rec.connects.push(size);
}

pub fn record_resize(rec: &mut Recorder, size: DisplaySize) {
    rec.resizes.push(size);
}

pub fn noop(_: &mut (), _: WidgetId, _: i16) {}

/// Render surface that keeps every drawing call.
#[derive(Debug)]
pub struct RecordingSurface {
    pub size: DisplaySize,
    pub rects: Vec<(i16, i16, i16, i16, Color)>,
    pub texts: Vec<(i16, i16, String)>,
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self {
            size: DisplaySize::new(320, 240),
            rects: Vec::new(),
            texts: Vec::new(),
        }
    }
}

impl RenderSurface for RecordingSurface {
    fn fill_rect(&mut self, x0: i16, y0: i16, x1: i16, y1: i16, color: Color) {
        self.rects.push((x0, y0, x1, y1, color));
    }

    fn draw_text(&mut self, x: i16, y: i16, text: &str, _size: u8, _fg: Color, _bg: Color) {
        self.texts.push((x, y, text.to_string()));
    }

    fn draw_char(&mut self, x: i16, y: i16, ch: char, _size: u8, _fg: Color, _bg: Color) {
        self.texts.push((x, y, ch.to_string()));
    }

    fn size(&self) -> DisplaySize {
        self.size
    }
}

/// Transport whose state is set directly by the test.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    pub touched: bool,
    pub point: TouchPoint,
}

impl ScriptedTransport {
    pub fn press(&mut self, x: i16, y: i16) {
        self.touched = true;
        self.point = TouchPoint::new(x, y);
    }

    pub fn release(&mut self) {
        self.touched = false;
    }
}

impl TouchTransport for ScriptedTransport {
    fn was_touched(&mut self) -> bool {
        self.touched
    }

    fn x(&self) -> i16 {
        self.point.x
    }

    fn y(&self) -> i16 {
        self.point.y
    }
}
