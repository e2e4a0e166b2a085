//! Hit-testing of touch positions against the widget registry.

use strum::Display;

use crate::geometry::TouchPoint;
use crate::pool::{WidgetId, WidgetPool};
use crate::widget::Widget;

/// Outcome of testing one position against all widgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum HitResult {
    NotTouched,
    Touched(WidgetId),
    TouchedAutorepeat(WidgetId),
}

impl HitResult {
    pub fn widget(&self) -> Option<WidgetId> {
        match *self {
            HitResult::NotTouched => None,
            HitResult::Touched(id) | HitResult::TouchedAutorepeat(id) => Some(id),
        }
    }
}

/// `true` if `point` lies inside the widget's rectangle grown by its touch
/// border. Edges are inclusive; the border never reaches below 0.
pub fn contains<C>(widget: &Widget<C>, point: TouchPoint) -> bool {
    widget
        .rect()
        .contains_with_border(point, widget.touch_border())
}

/// `true` if the widget is allocated, active, has a callback and contains
/// `point`.
pub fn check<C>(widget: &Widget<C>, point: TouchPoint) -> bool {
    widget.is_allocated() && widget.is_active() && widget.callback().is_some() && contains(widget, point)
}

/// Like [`check`], and on a hit calls the widget's user function once with
/// its bound value.
pub fn check_and_invoke<C>(
    ctx: &mut C,
    id: WidgetId,
    widget: &Widget<C>,
    point: TouchPoint,
) -> bool {
    if !check(widget, point) {
        return false;
    }
    if let Some(callback) = widget.callback() {
        (callback.function())(ctx, id, widget.value());
    }
    true
}

/// Test `point` against the registry in link order; the first match wins.
pub fn check_all<C>(pool: &WidgetPool<C>, point: TouchPoint) -> HitResult {
    pool.iter()
        .find(|(_, widget)| check(widget, point))
        .map_or(HitResult::NotTouched, |(id, widget)| {
            if widget.is_autorepeat() {
                HitResult::TouchedAutorepeat(id)
            } else {
                HitResult::Touched(id)
            }
        })
}

/// [`check_all`] that also invokes the matched widget's function.
pub fn check_all_and_invoke<C>(ctx: &mut C, pool: &WidgetPool<C>, point: TouchPoint) -> HitResult {
    let result = check_all(pool, point);
    if let Some(id) = result.widget() {
        if let Some(widget) = pool.get(id) {
            check_and_invoke(ctx, id, widget, point);
        }
    }
    result
}
