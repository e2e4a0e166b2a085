//! Software periodic timer driven by the millisecond clock handed to
//! `poll_once`.
//!
//! Mirrors the register / set-period / disable contract of a hardware
//! timer service. Firing only sets state; whoever polls the timer decides
//! what to invoke.

/// `true` if `now` is at or past `due`, tolerating `u32` wrap-around.
fn reached(now_ms: u32, due_ms: u32) -> bool {
    now_ms.wrapping_sub(due_ms) as i32 >= 0
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeriodicTimer {
    period_ms: Option<u32>,
    due_ms: u32,
}

impl PeriodicTimer {
    pub const fn new() -> Self {
        Self {
            period_ms: None,
            due_ms: 0,
        }
    }

    /// Start the timer; the first expiry is `period_ms` after `now_ms`.
    pub fn register_periodic(&mut self, now_ms: u32, period_ms: u32) {
        self.period_ms = Some(period_ms.max(1));
        self.due_ms = now_ms.wrapping_add(period_ms.max(1));
    }

    /// Reprogram the period. The next expiry is measured from `now_ms`.
    pub fn set_period(&mut self, now_ms: u32, period_ms: u32) {
        self.register_periodic(now_ms, period_ms);
    }

    pub fn disable(&mut self) {
        self.period_ms = None;
    }

    pub fn is_enabled(&self) -> bool {
        self.period_ms.is_some()
    }

    pub fn period_ms(&self) -> Option<u32> {
        self.period_ms
    }

    /// Returns `true` once per expiry. When polling fell behind by more
    /// than one period the missed expiries are collapsed into one.
    pub fn poll(&mut self, now_ms: u32) -> bool {
        let Some(period) = self.period_ms else {
            return false;
        };
        if !reached(now_ms, self.due_ms) {
            return false;
        }
        self.due_ms = self.due_ms.wrapping_add(period);
        if reached(now_ms, self.due_ms) {
            self.due_ms = now_ms.wrapping_add(period);
        }
        true
    }
}
