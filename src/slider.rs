//! Sliders: draggable bars that map a touch position to a value in
//! `0..=max`.
//!
//! Sliders live in their own fixed-capacity list next to the widget pool
//! and are tested before widgets on touch-down. A slider that claims a
//! touch-down keeps receiving the moves of that sequence.

use std::fmt::{self, Write as _};

use heapless::String;
use log::{debug, warn};
use strum::{Display, EnumString};

use crate::config::TactileError;
use crate::geometry::{Color, DisplaySize, Placement, Rect, TouchPoint};
use crate::render::{self, RenderSurface};

/// Compiled upper bound for sliders.
pub const MAX_SLIDERS: usize = 16;
/// Longest formatted value text.
pub const VALUE_TEXT_CAPACITY: usize = 12;

/// Gap between the bar and its value text.
const TEXT_GAP: i16 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SliderId(pub u8);

impl fmt::Display for SliderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slider#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    /// Value grows from the bottom of the bar upwards.
    Vertical,
}

/// Change callback. The returned value is what the slider stores and
/// displays, so a handler can quantize or reject the touched value.
pub type SliderFn<C> = fn(&mut C, SliderId, i16) -> i16;

/// Optional value-to-text mapping for the caption under the bar.
pub type ValueFormatter = fn(i16) -> String<VALUE_TEXT_CAPACITY>;

pub struct SliderSpec<C> {
    /// Top-left corner of the bar.
    pub origin: TouchPoint,
    pub orientation: Orientation,
    /// Thickness of the bar across its long axis.
    pub bar_width: u16,
    /// Bar length in pixels along its long axis.
    pub length: u16,
    pub max: i16,
    /// Values above this are drawn in `threshold_color`. `max` disables it.
    pub threshold: i16,
    pub value: i16,
    pub touch_border: u16,
    pub bar_color: Color,
    pub background_color: Color,
    pub threshold_color: Color,
    pub text_color: Color,
    pub on_change: Option<SliderFn<C>>,
    pub format: Option<ValueFormatter>,
}

impl<C> SliderSpec<C> {
    /// A slider whose bar is `max + 1` pixels long, so every pixel is one
    /// value step.
    pub fn new(origin: TouchPoint, orientation: Orientation, max: i16, on_change: SliderFn<C>) -> Self {
        let max = max.max(1);
        Self {
            origin,
            orientation,
            bar_width: 10,
            length: (max as u16).saturating_add(1),
            max,
            threshold: max,
            value: 0,
            touch_border: 4,
            bar_color: Color::GREEN,
            background_color: Color::GREY,
            threshold_color: Color::RED,
            text_color: Color::BLACK,
            on_change: Some(on_change),
            format: None,
        }
    }

    pub fn with_length(mut self, length: u16) -> Self {
        self.length = length;
        self
    }

    pub fn with_bar_width(mut self, bar_width: u16) -> Self {
        self.bar_width = bar_width;
        self
    }

    pub fn with_threshold(mut self, threshold: i16) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_value(mut self, value: i16) -> Self {
        self.value = value;
        self
    }

    pub fn with_border(mut self, touch_border: u16) -> Self {
        self.touch_border = touch_border;
        self
    }

    pub fn with_format(mut self, format: ValueFormatter) -> Self {
        self.format = Some(format);
        self
    }
}

pub struct Slider<C> {
    rect: Rect,
    orientation: Orientation,
    length: u16,
    max: i16,
    threshold: i16,
    value: i16,
    touch_border: u16,
    bar_color: Color,
    background_color: Color,
    threshold_color: Color,
    text_color: Color,
    on_change: Option<SliderFn<C>>,
    format: Option<ValueFormatter>,
    active: bool,
}

impl<C> fmt::Debug for Slider<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slider")
            .field("rect", &self.rect)
            .field("orientation", &self.orientation)
            .field("max", &self.max)
            .field("threshold", &self.threshold)
            .field("value", &self.value)
            .field("active", &self.active)
            .finish()
    }
}

impl<C> Slider<C> {
    fn from_spec(spec: &SliderSpec<C>, display: DisplaySize) -> (Self, Placement) {
        let max = spec.max.max(1);
        let length = spec.length.max(1);
        let requested = match spec.orientation {
            Orientation::Horizontal => Rect::new(spec.origin.x, spec.origin.y, length, spec.bar_width),
            Orientation::Vertical => Rect::new(spec.origin.x, spec.origin.y, spec.bar_width, length),
        };
        let (rect, placement) = requested.clamp_to(display);
        let length = match spec.orientation {
            Orientation::Horizontal => rect.width,
            Orientation::Vertical => rect.height,
        };
        let slider = Self {
            rect,
            orientation: spec.orientation,
            length,
            max,
            threshold: spec.threshold.clamp(0, max),
            value: spec.value.clamp(0, max),
            touch_border: spec.touch_border,
            bar_color: spec.bar_color,
            background_color: spec.background_color,
            threshold_color: spec.threshold_color,
            text_color: spec.text_color,
            on_change: spec.on_change,
            format: spec.format,
            active: true,
        };
        (slider, placement)
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn max(&self) -> i16 {
        self.max
    }

    pub fn threshold(&self) -> i16 {
        self.threshold
    }

    pub fn value(&self) -> i16 {
        self.value
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// `true` if `point` is on the bar, touch border included.
    pub fn contains(&self, point: TouchPoint) -> bool {
        self.rect.contains_with_border(point, self.touch_border)
    }

    /// Project `point` onto the long axis and map it to `0..=max`.
    ///
    /// The first pixel of the bar (the bottom one for vertical sliders)
    /// maps to 0 and the last to `max`; anything beyond is clamped.
    pub fn value_at(&self, point: TouchPoint) -> i16 {
        let offset = match self.orientation {
            Orientation::Horizontal => i32::from(point.x) - i32::from(self.rect.x),
            Orientation::Vertical => self.rect.bottom() - i32::from(point.y),
        };
        let max = i32::from(self.max);
        let span = i32::from(self.length) - 1;
        let value = if span <= 0 {
            if offset > 0 { max } else { 0 }
        } else {
            offset * max / span
        };
        value.clamp(0, max) as i16
    }

    /// Number of bar pixels covered by `value`.
    fn pixels_for(&self, value: i16) -> i32 {
        i32::from(value.clamp(0, self.max)) * i32::from(self.length) / i32::from(self.max)
    }

    /// Fill `start..end` pixels along the long axis.
    fn fill_segment(&self, surface: &mut impl RenderSurface, start: i32, end: i32, color: Color) {
        if end <= start {
            return;
        }
        let r = self.rect;
        match self.orientation {
            Orientation::Horizontal => {
                let x = i32::from(r.x);
                surface.fill_rect(
                    (x + start) as i16,
                    r.y,
                    (x + end - 1) as i16,
                    r.bottom() as i16,
                    color,
                );
            }
            Orientation::Vertical => {
                let bottom = r.bottom();
                surface.fill_rect(
                    r.x,
                    (bottom - end + 1) as i16,
                    r.right() as i16,
                    (bottom - start) as i16,
                    color,
                );
            }
        }
    }

    /// Formatted value text shown under the bar.
    pub fn value_text(&self) -> String<VALUE_TEXT_CAPACITY> {
        if let Some(format) = self.format {
            return format(self.value);
        }
        let mut text = String::new();
        // an i16 always fits in VALUE_TEXT_CAPACITY characters
        let _ = write!(text, "{}", self.value);
        text
    }

    pub fn draw(&self, surface: &mut impl RenderSurface) {
        let filled = self.pixels_for(self.value);
        let threshold = self.pixels_for(self.threshold);
        let length = i32::from(self.length);

        self.fill_segment(surface, 0, filled.min(threshold), self.bar_color);
        if self.threshold < self.max {
            self.fill_segment(surface, threshold, filled, self.threshold_color);
        }
        self.fill_segment(surface, filled, length, self.background_color);

        let text = self.value_text();
        let (text_w, text_h) = render::text_extent(VALUE_TEXT_CAPACITY, 1);
        let y = self.rect.bottom() as i16 + TEXT_GAP;
        // blank the widest possible text first so shorter values leave no residue
        surface.fill_rect(
            self.rect.x,
            y,
            self.rect.x.saturating_add(text_w as i16 - 1),
            y.saturating_add(text_h as i16 - 1),
            self.background_color,
        );
        surface.draw_text(self.rect.x, y, &text, 1, self.text_color, self.background_color);
    }
}

pub struct SliderList<C> {
    sliders: heapless::Vec<Slider<C>, MAX_SLIDERS>,
    capacity: usize,
}

impl<C> SliderList<C> {
    pub fn new(capacity: usize) -> Self {
        Self {
            sliders: heapless::Vec::new(),
            capacity: capacity.min(MAX_SLIDERS),
        }
    }

    pub fn len(&self) -> usize {
        self.sliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sliders.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Register a slider. Geometry leaving the display is clamped and
    /// reported as [`Placement::Clamped`].
    pub fn add(
        &mut self,
        spec: &SliderSpec<C>,
        display: DisplaySize,
    ) -> Result<(SliderId, Placement), TactileError> {
        if self.sliders.len() >= self.capacity {
            warn!("Slider list full ({} sliders)", self.capacity);
            return Err(TactileError::SliderListFull {
                capacity: self.capacity,
            });
        }
        let id = SliderId(self.sliders.len() as u8);
        let (slider, placement) = Slider::from_spec(spec, display);
        if placement == Placement::Clamped {
            warn!("Slider {id} clamped to {:?}", slider.rect);
        }
        self.sliders
            .push(slider)
            .map_err(|_| TactileError::SliderListFull {
                capacity: self.capacity,
            })?;
        debug!("Added {id}");
        Ok((id, placement))
    }

    pub fn get(&self, id: SliderId) -> Option<&Slider<C>> {
        self.sliders.get(usize::from(id.0))
    }

    fn get_mut(&mut self, id: SliderId) -> Result<&mut Slider<C>, TactileError> {
        self.sliders
            .get_mut(usize::from(id.0))
            .ok_or(TactileError::UnknownSlider(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (SliderId, &Slider<C>)> {
        self.sliders
            .iter()
            .enumerate()
            .map(|(i, s)| (SliderId(i as u8), s))
    }

    pub fn set_active(&mut self, id: SliderId, active: bool) -> Result<(), TactileError> {
        self.get_mut(id)?.active = active;
        Ok(())
    }

    pub fn activate_all(&mut self) {
        for slider in self.sliders.iter_mut() {
            slider.active = true;
        }
    }

    pub fn deactivate_all(&mut self) {
        for slider in self.sliders.iter_mut() {
            slider.active = false;
        }
    }

    pub fn draw(&self, id: SliderId, surface: &mut impl RenderSurface) -> Result<(), TactileError> {
        self.get(id)
            .ok_or(TactileError::UnknownSlider(id))?
            .draw(surface);
        Ok(())
    }

    /// Run `value` through the change callback, store the echoed value and
    /// redraw. Returns the stored value.
    fn update(
        &mut self,
        ctx: &mut C,
        id: SliderId,
        value: i16,
        surface: &mut impl RenderSurface,
    ) -> Result<i16, TactileError> {
        let slider = self.get_mut(id)?;
        let value = value.clamp(0, slider.max);
        let echoed = match slider.on_change {
            Some(on_change) => on_change(ctx, id, value).clamp(0, slider.max),
            None => value,
        };
        slider.value = echoed;
        slider.draw(surface);
        Ok(echoed)
    }

    /// Claim `point` for slider `id` if it is active and the point is on its
    /// bar; on a claim the mapped value is applied.
    pub fn check(
        &mut self,
        ctx: &mut C,
        id: SliderId,
        point: TouchPoint,
        surface: &mut impl RenderSurface,
    ) -> bool {
        let Some(value) = self
            .get(id)
            .filter(|s| s.active && s.contains(point))
            .map(|s| s.value_at(point))
        else {
            return false;
        };
        self.update(ctx, id, value, surface).is_ok()
    }

    /// Test all sliders in registration order; the first claim wins.
    pub fn check_all(
        &mut self,
        ctx: &mut C,
        point: TouchPoint,
        surface: &mut impl RenderSurface,
    ) -> Option<SliderId> {
        let id = self
            .iter()
            .find(|(_, s)| s.active && s.contains(point))
            .map(|(id, _)| id)?;
        self.check(ctx, id, point, surface).then_some(id)
    }

    /// Follow a move of the owning touch. The callback only runs when the
    /// mapped value differs from the current one. Returns `true` if it ran.
    pub fn drag(
        &mut self,
        ctx: &mut C,
        id: SliderId,
        point: TouchPoint,
        surface: &mut impl RenderSurface,
    ) -> bool {
        let Some(slider) = self.get(id) else {
            return false;
        };
        let value = slider.value_at(point);
        if value == slider.value {
            return false;
        }
        self.update(ctx, id, value, surface).is_ok()
    }

    /// Apply a value that was resolved elsewhere, e.g. by a remote host.
    pub fn set_value(
        &mut self,
        ctx: &mut C,
        id: SliderId,
        value: i16,
        surface: &mut impl RenderSurface,
    ) -> Result<i16, TactileError> {
        self.update(ctx, id, value, surface)
    }
}
