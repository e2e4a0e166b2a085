//! Button-like widget records stored in the [`WidgetPool`](crate::pool::WidgetPool).

use std::fmt;

use heapless::String;

use crate::autorepeat::AutorepeatTiming;
use crate::geometry::{Color, DisplaySize, Placement, Rect};
use crate::pool::{WidgetId, WidgetKind};
use crate::render::{self, RenderSurface};

/// Longest caption a widget can hold.
pub const CAPTION_CAPACITY: usize = 24;

/// Widget callback: receives the host context, the widget and its bound value.
pub type WidgetFn<C> = fn(&mut C, WidgetId, i16);

/// Bound callback of a widget.
///
/// Autorepeat slots keep the user's function as `wrapped`; the dispatcher
/// routes the first activation to the autorepeat controller instead of
/// calling it directly.
pub enum Callback<C> {
    Plain(WidgetFn<C>),
    Autorepeat {
        wrapped: WidgetFn<C>,
        timing: AutorepeatTiming,
    },
}

impl<C> Clone for Callback<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for Callback<C> {}

impl<C> fmt::Debug for Callback<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callback::Plain(_) => f.write_str("Plain"),
            Callback::Autorepeat { timing, .. } => {
                f.debug_struct("Autorepeat").field("timing", timing).finish()
            }
        }
    }
}

impl<C> Callback<C> {
    /// The user function, whichever variant this is.
    pub fn function(&self) -> WidgetFn<C> {
        match *self {
            Callback::Plain(f) => f,
            Callback::Autorepeat { wrapped, .. } => wrapped,
        }
    }
}

/// Everything needed to set up an allocated widget.
pub struct WidgetSpec<'a, C> {
    pub rect: Rect,
    pub touch_border: u16,
    pub color: Color,
    pub caption_color: Color,
    pub caption: &'a str,
    pub caption_size: u8,
    pub value: i16,
    pub callback: Option<WidgetFn<C>>,
}

impl<'a, C> WidgetSpec<'a, C> {
    pub fn new(rect: Rect, callback: WidgetFn<C>) -> Self {
        Self {
            rect,
            touch_border: 0,
            color: Color::GREEN,
            caption_color: Color::BLACK,
            caption: "",
            caption_size: 1,
            value: 0,
            callback: Some(callback),
        }
    }

    pub fn with_caption(mut self, caption: &'a str, size: u8) -> Self {
        self.caption = caption;
        self.caption_size = size;
        self
    }

    pub fn with_border(mut self, touch_border: u16) -> Self {
        self.touch_border = touch_border;
        self
    }

    pub fn with_value(mut self, value: i16) -> Self {
        self.value = value;
        self
    }

    pub fn with_colors(mut self, color: Color, caption_color: Color) -> Self {
        self.color = color;
        self.caption_color = caption_color;
        self
    }
}

pub struct Widget<C> {
    pub(crate) rect: Rect,
    pub(crate) touch_border: u16,
    pub(crate) color: Color,
    pub(crate) caption_color: Color,
    pub(crate) caption: String<CAPTION_CAPACITY>,
    pub(crate) caption_size: u8,
    pub(crate) value: i16,
    pub(crate) active: bool,
    pub(crate) allocated: bool,
    pub(crate) kind: WidgetKind,
    pub(crate) callback: Option<Callback<C>>,
    pub(crate) next: Option<WidgetId>,
}

impl<C> fmt::Debug for Widget<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Widget")
            .field("rect", &self.rect)
            .field("touch_border", &self.touch_border)
            .field("caption", &self.caption.as_str())
            .field("value", &self.value)
            .field("active", &self.active)
            .field("allocated", &self.allocated)
            .field("kind", &self.kind)
            .field("callback", &self.callback)
            .field("next", &self.next)
            .finish()
    }
}

impl<C> Widget<C> {
    pub(crate) fn empty(kind: WidgetKind) -> Self {
        Self {
            rect: Rect::default(),
            touch_border: 0,
            color: Color::default(),
            caption_color: Color::default(),
            caption: String::new(),
            caption_size: 1,
            value: 0,
            active: false,
            allocated: false,
            kind,
            callback: None,
            next: None,
        }
    }

    /// Return the slot to its pristine state, keeping its kind and link.
    pub(crate) fn clear(&mut self) {
        let next = self.next;
        *self = Self::empty(self.kind);
        self.next = next;
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn touch_border(&self) -> u16 {
        self.touch_border
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    pub fn value(&self) -> i16 {
        self.value
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_allocated(&self) -> bool {
        self.allocated
    }

    pub fn kind(&self) -> WidgetKind {
        self.kind
    }

    pub fn is_autorepeat(&self) -> bool {
        self.kind == WidgetKind::Autorepeat
    }

    pub fn callback(&self) -> Option<Callback<C>> {
        self.callback
    }

    /// Next widget in registry order.
    pub fn next(&self) -> Option<WidgetId> {
        self.next
    }

    /// Apply `spec`, clamping geometry to `display` and truncating a
    /// caption that does not fit. The widget becomes active.
    pub(crate) fn configure(
        &mut self,
        spec: &WidgetSpec<'_, C>,
        default_timing: AutorepeatTiming,
        display: DisplaySize,
    ) -> Placement {
        let (rect, mut placement) = spec.rect.clamp_to(display);
        self.rect = rect;
        self.touch_border = spec.touch_border;
        self.color = spec.color;
        self.caption_color = spec.caption_color;
        self.value = spec.value;
        let kind = self.kind;
        self.callback = spec.callback.map(|f| match kind {
            WidgetKind::Plain => Callback::Plain(f),
            WidgetKind::Autorepeat => Callback::Autorepeat {
                wrapped: f,
                timing: default_timing,
            },
        });
        placement = placement.merge(self.set_caption_clamped(spec.caption, spec.caption_size));
        self.active = true;
        placement
    }

    /// Store `caption`, shrinking the text size and then truncating the
    /// caption until it fits inside the widget's rectangle.
    pub(crate) fn set_caption_clamped(&mut self, caption: &str, size: u8) -> Placement {
        let mut placement = Placement::Fits;
        let mut size = size.max(1);
        while size > 1 && render::text_extent(1, size).1 > u32::from(self.rect.height) {
            size -= 1;
            placement = Placement::Clamped;
        }
        if render::text_extent(1, size).1 > u32::from(self.rect.height) {
            placement = Placement::Clamped;
        }

        let (char_w, _) = render::text_extent(1, size);
        let fits = (u32::from(self.rect.width) / char_w) as usize;
        let limit = fits.min(CAPTION_CAPACITY);

        self.caption.clear();
        for (count, ch) in caption.chars().enumerate() {
            if count >= limit || self.caption.push(ch).is_err() {
                placement = Placement::Clamped;
                break;
            }
        }
        self.caption_size = size;
        placement
    }

    pub(crate) fn draw(&self, surface: &mut impl RenderSurface) {
        let r = self.rect;
        surface.fill_rect(
            r.x,
            r.y,
            r.right() as i16,
            r.bottom() as i16,
            self.color,
        );
        if self.caption.is_empty() {
            return;
        }
        let (text_w, text_h) = render::text_extent(self.caption.chars().count(), self.caption_size);
        let x = i32::from(r.x) + (i32::from(r.width) - text_w as i32) / 2;
        let y = i32::from(r.y) + (i32::from(r.height) - text_h as i32) / 2;
        surface.draw_text(
            x as i16,
            y as i16,
            &self.caption,
            self.caption_size,
            self.caption_color,
            self.color,
        );
    }
}
