//! Autorepeat controller: re-fires a held button's callback on a
//! two-speed schedule.
//!
//! ```text
//! DOWN ─► fire, arm(initial_delay) ─► FirstDelay
//! FirstDelay   tick ─► period = first_rate,  remaining -= 1, fire ─► FirstPeriod
//! FirstPeriod  tick ─► remaining == 0 ? period = second_rate ─► SecondPeriod
//!                                     : remaining -= 1
//!                      fire in both cases
//! SecondPeriod tick ─► fire (until touch-up cancels)
//! ```
//!
//! Only one sequence runs at a time; starting a new one replaces the old.

use log::{debug, warn};
use strum::Display;

use crate::geometry::TouchPoint;
use crate::hit;
use crate::pool::{WidgetId, WidgetPool};
use crate::timer::PeriodicTimer;
use crate::widget::Callback;

/// Timing parameters of an autorepeat widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutorepeatTiming {
    pub initial_delay_ms: u32,
    pub first_rate_ms: u32,
    /// Number of repeats at `first_rate_ms` before switching to
    /// `second_rate_ms`. Treated as at least 1.
    pub first_count: u16,
    pub second_rate_ms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Phase {
    FirstDelay,
    FirstPeriod,
    SecondPeriod,
}

#[derive(Debug, Clone, Copy)]
struct Sequence {
    widget: WidgetId,
    phase: Phase,
    remaining: u16,
    timing: AutorepeatTiming,
}

#[derive(Debug, Default)]
pub struct AutorepeatController {
    sequence: Option<Sequence>,
    timer: PeriodicTimer,
}

impl AutorepeatController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the widget's wrapped callback once and arm the repeat timer.
    ///
    /// Returns `false` if `id` is not an allocated autorepeat widget with a
    /// bound callback.
    pub fn start<C>(
        &mut self,
        ctx: &mut C,
        pool: &WidgetPool<C>,
        id: WidgetId,
        now_ms: u32,
    ) -> bool {
        let Some(widget) = pool.get(id).filter(|w| w.is_allocated()) else {
            warn!("Autorepeat start on unallocated widget {id}");
            return false;
        };
        let Some(Callback::Autorepeat { wrapped, timing }) = widget.callback() else {
            warn!("Autorepeat start on widget {id} without autorepeat callback");
            return false;
        };

        if let Some(previous) = self.sequence {
            debug!("Autorepeat on {} superseded by {id}", previous.widget);
        }

        wrapped(ctx, id, widget.value());

        self.timer.register_periodic(now_ms, timing.initial_delay_ms);
        self.sequence = Some(Sequence {
            widget: id,
            phase: Phase::FirstDelay,
            remaining: timing.first_count.max(1),
            timing,
        });
        debug!("Autorepeat started on {id}, first repeat in {} ms", timing.initial_delay_ms);
        true
    }

    /// Advance the schedule if the timer expired.
    ///
    /// `touch` is the current touch position while the sequence is still
    /// down. If the touch has left the widget's hit area (or is gone) the
    /// tick neither advances state nor fires, and the sequence is
    /// cancelled. Returns `true` if the callback fired.
    pub fn tick<C>(
        &mut self,
        ctx: &mut C,
        pool: &WidgetPool<C>,
        touch: Option<TouchPoint>,
        now_ms: u32,
    ) -> bool {
        if !self.timer.poll(now_ms) {
            return false;
        }
        let Some(mut seq) = self.sequence else {
            self.timer.disable();
            return false;
        };

        let Some(widget) = pool.get(seq.widget) else {
            self.cancel();
            return false;
        };
        if !touch.is_some_and(|point| hit::check(widget, point)) {
            debug!("Autorepeat on {} left hit area", seq.widget);
            self.cancel();
            return false;
        }
        let Some(Callback::Autorepeat { wrapped, .. }) = widget.callback() else {
            self.cancel();
            return false;
        };

        match seq.phase {
            Phase::FirstDelay => {
                self.timer.set_period(now_ms, seq.timing.first_rate_ms);
                seq.phase = Phase::FirstPeriod;
                seq.remaining = seq.remaining.saturating_sub(1);
            }
            Phase::FirstPeriod => {
                if seq.remaining == 0 {
                    self.timer.set_period(now_ms, seq.timing.second_rate_ms);
                    seq.phase = Phase::SecondPeriod;
                } else {
                    seq.remaining -= 1;
                }
            }
            Phase::SecondPeriod => {}
        }
        self.sequence = Some(seq);

        wrapped(ctx, seq.widget, widget.value());
        true
    }

    pub fn cancel(&mut self) {
        self.timer.disable();
        if let Some(seq) = self.sequence.take() {
            debug!("Autorepeat on {} cancelled in {}", seq.widget, seq.phase);
        }
    }

    pub fn is_running(&self) -> bool {
        self.sequence.is_some()
    }

    pub fn widget(&self) -> Option<WidgetId> {
        self.sequence.map(|s| s.widget)
    }

    pub fn phase(&self) -> Option<Phase> {
        self.sequence.map(|s| s.phase)
    }

    pub fn remaining(&self) -> Option<u16> {
        self.sequence.map(|s| s.remaining)
    }

    pub fn period_ms(&self) -> Option<u32> {
        self.timer.period_ms()
    }
}
