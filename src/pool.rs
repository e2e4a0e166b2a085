//! Fixed-capacity widget pool and the registry that threads through it.
//!
//! All slots are created and linked once, at construction. Allocation and
//! release only flip the `allocated` flag, so the registry order never
//! changes: plain slots first, then autorepeat slots. Hit-testing walks the
//! same order, so among overlapping widgets the one in the earlier slot wins.

use std::fmt;

use log::{debug, error, warn};
use strum::{Display, IntoStaticStr};

use crate::autorepeat::AutorepeatTiming;
use crate::config::{PoolSettings, TactileError};
use crate::geometry::{Color, DisplaySize, Placement};
use crate::render::RenderSurface;
use crate::widget::{Callback, Widget, WidgetSpec};

/// Compiled upper bound for plain widget slots.
pub const MAX_PLAIN_WIDGETS: usize = 48;
/// Compiled upper bound for autorepeat widget slots.
pub const MAX_AUTOREPEAT_WIDGETS: usize = 16;
pub const MAX_WIDGETS: usize = MAX_PLAIN_WIDGETS + MAX_AUTOREPEAT_WIDGETS;

/// Index of a slot in the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetId(pub u16);

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum WidgetKind {
    #[strum(serialize = "plain")]
    Plain,
    #[strum(serialize = "autorepeat")]
    Autorepeat,
}

/// Occupancy snapshot for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub total: usize,
    pub free: usize,
    pub min_free: usize,
    pub active: usize,
    pub overflows: u32,
}

pub struct WidgetPool<C> {
    slots: heapless::Vec<Widget<C>, MAX_WIDGETS>,
    head: Option<WidgetId>,
    plain_capacity: usize,
    autorepeat_capacity: usize,
    free: usize,
    min_free: usize,
    overflows: u32,
    default_timing: AutorepeatTiming,
}

impl<C> WidgetPool<C> {
    /// Create and link all slots. Capacities above the compiled maximum are
    /// cut down to it.
    pub fn new(settings: &PoolSettings, default_timing: AutorepeatTiming) -> Self {
        let plain_capacity = settings.plain_widgets.min(MAX_PLAIN_WIDGETS);
        let autorepeat_capacity = settings.autorepeat_widgets.min(MAX_AUTOREPEAT_WIDGETS);
        let total = plain_capacity + autorepeat_capacity;

        let mut slots = heapless::Vec::new();
        for index in 0..total {
            let kind = if index < plain_capacity {
                WidgetKind::Plain
            } else {
                WidgetKind::Autorepeat
            };
            let mut widget = Widget::empty(kind);
            widget.next = (index + 1 < total).then(|| WidgetId((index + 1) as u16));
            // total <= MAX_WIDGETS, so this never fails
            let _ = slots.push(widget);
        }

        debug!("Widget pool: {plain_capacity} plain + {autorepeat_capacity} autorepeat slots");

        Self {
            slots,
            head: (total > 0).then_some(WidgetId(0)),
            plain_capacity,
            autorepeat_capacity,
            free: total,
            min_free: total,
            overflows: 0,
            default_timing,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn capacity_of(&self, kind: WidgetKind) -> usize {
        match kind {
            WidgetKind::Plain => self.plain_capacity,
            WidgetKind::Autorepeat => self.autorepeat_capacity,
        }
    }

    pub fn free_count(&self) -> usize {
        self.free
    }

    /// Lowest free count ever observed.
    pub fn min_free(&self) -> usize {
        self.min_free
    }

    pub fn head(&self) -> Option<WidgetId> {
        self.head
    }

    pub fn default_timing(&self) -> AutorepeatTiming {
        self.default_timing
    }

    /// Claim the first free slot of `kind` in registry order.
    pub fn allocate(&mut self, kind: WidgetKind) -> Result<WidgetId, TactileError> {
        let found = self
            .iter()
            .find(|(_, w)| w.kind == kind && !w.allocated)
            .map(|(id, _)| id);

        let Some(id) = found else {
            self.overflows = self.overflows.saturating_add(1);
            let capacity = self.capacity_of(kind);
            error!("Widget pool exhausted: no free {kind} slot (capacity {capacity})");
            return Err(TactileError::PoolExhausted { kind, capacity });
        };

        let widget = &mut self.slots[usize::from(id.0)];
        widget.clear();
        widget.allocated = true;
        self.free -= 1;
        self.min_free = self.min_free.min(self.free);
        debug!("Allocated {kind} widget {id}, {} free", self.free);
        Ok(id)
    }

    /// Like [`allocate`](Self::allocate), but on exhaustion hands out the
    /// first allocated slot of the same kind instead of failing. Every
    /// caller that hits this shares that widget, so its state is undefined;
    /// the overflow is still counted and logged. Fails only when the kind
    /// has no slots at all.
    pub fn allocate_or_shared(&mut self, kind: WidgetKind) -> Result<WidgetId, TactileError> {
        let err = match self.allocate(kind) {
            Ok(id) => return Ok(id),
            Err(e) => e,
        };
        let shared = self
            .iter()
            .find(|(_, w)| w.kind == kind && w.allocated)
            .map(|(id, _)| id)
            .ok_or(err)?;
        warn!("Returning shared {kind} widget {shared} after pool overflow");
        Ok(shared)
    }

    /// Give a slot back. Releasing a slot that is not allocated is
    /// rejected and leaves the counters untouched.
    pub fn release(&mut self, id: WidgetId) -> Result<(), TactileError> {
        let widget = self.slot_mut(id)?;
        if !widget.allocated {
            warn!("Release of widget {id} that is not allocated");
            return Err(TactileError::NotAllocated(id));
        }
        widget.clear();
        self.free += 1;
        debug_assert!(self.free <= self.capacity());
        debug!("Released widget {id}, {} free", self.free);
        Ok(())
    }

    pub fn get(&self, id: WidgetId) -> Option<&Widget<C>> {
        self.slots.get(usize::from(id.0))
    }

    fn slot_mut(&mut self, id: WidgetId) -> Result<&mut Widget<C>, TactileError> {
        self.slots
            .get_mut(usize::from(id.0))
            .ok_or(TactileError::UnknownWidget(id))
    }

    fn allocated_mut(&mut self, id: WidgetId) -> Result<&mut Widget<C>, TactileError> {
        let widget = self.slot_mut(id)?;
        if !widget.allocated {
            return Err(TactileError::NotAllocated(id));
        }
        Ok(widget)
    }

    /// Walk the registry from its head.
    pub fn iter(&self) -> RegistryIter<'_, C> {
        RegistryIter {
            pool: self,
            cursor: self.head,
        }
    }

    /// Visit every widget that is both allocated and active.
    pub fn for_each_active(&self, mut visitor: impl FnMut(WidgetId, &Widget<C>)) {
        for (id, widget) in self.iter().filter(|(_, w)| w.allocated && w.active) {
            visitor(id, widget);
        }
    }

    pub fn activate_all(&mut self) {
        for widget in self.slots.iter_mut().filter(|w| w.allocated) {
            widget.active = true;
        }
    }

    pub fn deactivate_all(&mut self) {
        for widget in self.slots.iter_mut() {
            widget.active = false;
        }
    }

    pub fn active_count(&self) -> usize {
        self.iter().filter(|(_, w)| w.allocated && w.active).count()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            total: self.capacity(),
            free: self.iter().filter(|(_, w)| !w.allocated).count(),
            min_free: self.min_free,
            active: self.active_count(),
            overflows: self.overflows,
        }
    }

    // -- Configuration --------------------------------------------

    /// Set geometry, caption, value and callback of an allocated widget and
    /// activate it. Geometry that leaves the display is clamped and reported
    /// as [`Placement::Clamped`].
    pub fn configure(
        &mut self,
        id: WidgetId,
        spec: &WidgetSpec<'_, C>,
        display: DisplaySize,
    ) -> Result<Placement, TactileError> {
        let timing = self.default_timing;
        let widget = self.allocated_mut(id)?;
        let placement = widget.configure(spec, timing, display);
        if placement == Placement::Clamped {
            warn!("Widget {id} clamped to {:?} caption '{}'", widget.rect, widget.caption);
        }
        Ok(placement)
    }

    pub fn set_autorepeat_timing(
        &mut self,
        id: WidgetId,
        timing: AutorepeatTiming,
    ) -> Result<(), TactileError> {
        let widget = self.allocated_mut(id)?;
        let wrapped = match widget.callback {
            Some(Callback::Autorepeat { wrapped, .. }) => wrapped,
            _ if widget.kind != WidgetKind::Autorepeat => {
                return Err(TactileError::WrongKind {
                    id,
                    expected: WidgetKind::Autorepeat,
                    actual: widget.kind,
                });
            }
            _ => return Err(TactileError::NoCallback(id)),
        };
        widget.callback = Some(Callback::Autorepeat {
            wrapped,
            timing: AutorepeatTiming {
                first_count: timing.first_count.max(1),
                ..timing
            },
        });
        Ok(())
    }

    pub fn set_active(&mut self, id: WidgetId, active: bool) -> Result<(), TactileError> {
        self.allocated_mut(id)?.active = active;
        Ok(())
    }

    pub fn set_value(&mut self, id: WidgetId, value: i16) -> Result<(), TactileError> {
        self.allocated_mut(id)?.value = value;
        Ok(())
    }

    pub fn set_caption(
        &mut self,
        id: WidgetId,
        caption: &str,
        size: u8,
    ) -> Result<Placement, TactileError> {
        Ok(self.allocated_mut(id)?.set_caption_clamped(caption, size))
    }

    pub fn draw(&self, id: WidgetId, surface: &mut impl RenderSurface) -> Result<(), TactileError> {
        let widget = self.get(id).ok_or(TactileError::UnknownWidget(id))?;
        if !widget.allocated {
            return Err(TactileError::NotAllocated(id));
        }
        widget.draw(surface);
        Ok(())
    }

    /// Clear the widget's area with `background` and deactivate it.
    pub fn remove(
        &mut self,
        id: WidgetId,
        surface: &mut impl RenderSurface,
        background: Color,
    ) -> Result<(), TactileError> {
        let widget = self.allocated_mut(id)?;
        let r = widget.rect;
        surface.fill_rect(r.x, r.y, r.right() as i16, r.bottom() as i16, background);
        widget.active = false;
        Ok(())
    }
}

/// Iterator over the registry in link order.
pub struct RegistryIter<'a, C> {
    pool: &'a WidgetPool<C>,
    cursor: Option<WidgetId>,
}

impl<'a, C> Iterator for RegistryIter<'a, C> {
    type Item = (WidgetId, &'a Widget<C>);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let widget = self.pool.get(id)?;
        self.cursor = widget.next;
        Some((id, widget))
    }
}
