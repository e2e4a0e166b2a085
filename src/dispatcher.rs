//! Event dispatcher: classifies every touch sequence as tap, slider drag,
//! swipe, long press or nothing, and calls exactly the matching callbacks.
//!
//! Ownership of a sequence is decided once, at DOWN: sliders are tested
//! first, then widgets. A slider-owned sequence never produces a swipe, a
//! long press or a button tap. An autorepeat widget fires on DOWN and
//! repeats until UP; every other widget fires on UP, unless a swipe or a
//! long press already consumed the sequence.

use std::sync::Arc;

use log::{debug, info, trace, warn};

use crate::autorepeat::AutorepeatController;
use crate::config::{AppConfig, TouchSettings};
use crate::event::{self, PollStatus, SwipeInfo, TouchEvent};
use crate::geometry::{DisplaySize, TouchPoint};
use crate::hit::{self, HitResult};
use crate::mailbox::Mailbox;
use crate::pool::{WidgetId, WidgetPool};
use crate::render::RenderSurface;
use crate::slider::{SliderId, SliderList};
use crate::timer::PeriodicTimer;
use crate::transport::TouchTransport;

pub type PointHook<C> = fn(&mut C, TouchPoint);
pub type SizeHook<C> = fn(&mut C, DisplaySize);
pub type SwipeHook<C> = fn(&mut C, SwipeInfo);
pub type NumberHook<C> = fn(&mut C, f32);

/// Optional host callbacks.
pub struct Hooks<C> {
    pub connect: Option<SizeHook<C>>,
    pub resize: Option<SizeHook<C>>,
    pub touch_down: Option<PointHook<C>>,
    pub touch_move: Option<PointHook<C>>,
    pub touch_up: Option<PointHook<C>>,
    pub long_press: Option<PointHook<C>>,
    pub swipe: Option<SwipeHook<C>>,
}

impl<C> Default for Hooks<C> {
    fn default() -> Self {
        Self {
            connect: None,
            resize: None,
            touch_down: None,
            touch_move: None,
            touch_up: None,
            long_press: None,
            swipe: None,
        }
    }
}

/// Bookkeeping for the one touch sequence that can exist at a time.
/// Overwritten at every DOWN.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TouchSession {
    pub is_down: bool,
    pub down: TouchPoint,
    pub actual: TouchPoint,
    pub up: TouchPoint,
    pub slider: Option<SliderId>,
    pub slider_is_move_target: bool,
    pub autorepeat_touched: bool,
    pub nothing_touched: bool,
    pub suppress_up: bool,
    /// Set once the touch has been farther than the swipe threshold from
    /// DOWN; a long press is no longer possible.
    pub left_threshold: bool,
    /// Widget hit at DOWN, if any.
    pub widget: Option<WidgetId>,
    /// Physical touch state seen by the previous poll.
    pub transport_down: bool,
    pub last_status: PollStatus,
}

pub struct Dispatcher<C> {
    widgets: WidgetPool<C>,
    sliders: SliderList<C>,
    session: TouchSession,
    autorepeat: AutorepeatController,
    long_press: PeriodicTimer,
    hooks: Hooks<C>,
    number: Option<NumberHook<C>>,
    settings: TouchSettings,
    display: DisplaySize,
    mailbox: Arc<Mailbox>,
}

impl<C> Dispatcher<C> {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            widgets: WidgetPool::new(&config.pool, config.autorepeat),
            sliders: SliderList::new(config.pool.sliders),
            session: TouchSession::default(),
            autorepeat: AutorepeatController::new(),
            long_press: PeriodicTimer::new(),
            hooks: Hooks::default(),
            number: None,
            settings: config.touch,
            display: config.display,
            mailbox: Arc::new(Mailbox::new()),
        }
    }

    pub fn widgets(&self) -> &WidgetPool<C> {
        &self.widgets
    }

    pub fn widgets_mut(&mut self) -> &mut WidgetPool<C> {
        &mut self.widgets
    }

    pub fn sliders(&self) -> &SliderList<C> {
        &self.sliders
    }

    pub fn sliders_mut(&mut self) -> &mut SliderList<C> {
        &mut self.sliders
    }

    pub fn session(&self) -> &TouchSession {
        &self.session
    }

    pub fn autorepeat(&self) -> &AutorepeatController {
        &self.autorepeat
    }

    pub fn settings(&self) -> &TouchSettings {
        &self.settings
    }

    pub fn display_size(&self) -> DisplaySize {
        self.display
    }

    /// Producer side of the host-injected event slot.
    pub fn mailbox(&self) -> Arc<Mailbox> {
        Arc::clone(&self.mailbox)
    }

    // -- Hook registration ----------------------------------------

    pub fn set_connect_hook(&mut self, hook: Option<SizeHook<C>>) {
        self.hooks.connect = hook;
    }

    pub fn set_resize_hook(&mut self, hook: Option<SizeHook<C>>) {
        self.hooks.resize = hook;
    }

    pub fn set_touch_down_hook(&mut self, hook: Option<PointHook<C>>) {
        self.hooks.touch_down = hook;
    }

    pub fn set_touch_move_hook(&mut self, hook: Option<PointHook<C>>) {
        self.hooks.touch_move = hook;
    }

    pub fn set_touch_up_hook(&mut self, hook: Option<PointHook<C>>) {
        self.hooks.touch_up = hook;
    }

    /// Registering a long-press hook makes every DOWN arm the long-press
    /// timer.
    pub fn set_long_press_hook(&mut self, hook: Option<PointHook<C>>) {
        self.hooks.long_press = hook;
    }

    /// Swipes are only detected while a swipe hook is registered.
    pub fn set_swipe_hook(&mut self, hook: Option<SwipeHook<C>>) {
        self.hooks.swipe = hook;
    }

    /// One-shot handler for the next `NumberCallback` event.
    pub fn request_number(&mut self, handler: NumberHook<C>) {
        self.number = Some(handler);
    }

    // -- Dispatch loop --------------------------------------------

    /// One iteration of the cooperative loop: handle at most one pending
    /// host event, then at most one physical transition, then expired
    /// timers.
    pub fn poll_once(
        &mut self,
        ctx: &mut C,
        transport: &mut impl TouchTransport,
        surface: &mut impl RenderSurface,
        now_ms: u32,
    ) -> PollStatus {
        let mut status = PollStatus::NoTouch;

        if let Some(event) = self.mailbox.take() {
            status = status.merge(self.handle_event(ctx, surface, event, now_ms));
        }

        if let Some(event) = self.read_transport(transport) {
            status = status.merge(self.handle_event(ctx, surface, event, now_ms));
        }

        status = status.merge(self.run_timers(ctx, now_ms));
        self.session.last_status = status;
        status
    }

    /// Turn the transport's touched state into a DOWN/MOVE/UP transition.
    fn read_transport(&mut self, transport: &mut impl TouchTransport) -> Option<TouchEvent> {
        let touched = transport.was_touched();
        let was_touched = std::mem::replace(&mut self.session.transport_down, touched);
        match (was_touched, touched) {
            (false, true) => Some(TouchEvent::Down(transport.position())),
            (true, true) => {
                let point = transport.position();
                (point != self.session.actual).then_some(TouchEvent::Move(point))
            }
            (true, false) => Some(TouchEvent::Up(self.session.actual)),
            (false, false) => None,
        }
    }

    fn run_timers(&mut self, ctx: &mut C, now_ms: u32) -> PollStatus {
        let mut status = PollStatus::NoTouch;
        let touch = self.session.is_down.then_some(self.session.actual);
        if self.autorepeat.tick(ctx, &self.widgets, touch, now_ms) {
            status = PollStatus::TouchMatched;
        }
        if self.long_press.poll(now_ms) {
            self.long_press.disable();
            status = status.merge(self.on_long_press(ctx, self.session.actual, false));
        }
        status
    }

    /// Process one event synchronously. Used by [`poll_once`](Self::poll_once)
    /// and by hosts that deliver events themselves.
    pub fn handle_event(
        &mut self,
        ctx: &mut C,
        surface: &mut impl RenderSurface,
        event: TouchEvent,
        now_ms: u32,
    ) -> PollStatus {
        trace!("Event {event:?}");
        match event {
            TouchEvent::Down(point) => self.on_down(ctx, surface, point, now_ms),
            TouchEvent::Move(point) => self.on_move(ctx, surface, point),
            TouchEvent::Up(point) => self.on_up(ctx, point),
            TouchEvent::Error => {
                warn!("Touch transport error, resetting touch sequence");
                self.reset_session();
                PollStatus::NoTouch
            }
            TouchEvent::ButtonCallback { widget, value } => {
                self.end_sequence_remotely();
                self.invoke_widget(ctx, widget, value)
            }
            TouchEvent::SliderCallback { slider, value } => {
                self.end_sequence_remotely();
                match self.sliders.set_value(ctx, slider, value, surface) {
                    Ok(_) => PollStatus::TouchMatched,
                    Err(e) => {
                        warn!("Host slider callback dropped: {e}");
                        PollStatus::TouchNoMatch
                    }
                }
            }
            TouchEvent::NumberCallback { value } => {
                self.end_sequence_remotely();
                match self.number.take() {
                    Some(handler) => {
                        handler(ctx, value);
                        PollStatus::TouchMatched
                    }
                    None => {
                        warn!("Number {value} received without pending request");
                        PollStatus::TouchNoMatch
                    }
                }
            }
            TouchEvent::SwipeCallback { start, dx, dy } => {
                let swipe = SwipeInfo::from_delta(start, dx, dy);
                match self.hooks.swipe {
                    Some(hook) => {
                        hook(ctx, swipe);
                        PollStatus::TouchMatched
                    }
                    None => PollStatus::TouchNoMatch,
                }
            }
            TouchEvent::LongPress(point) => self.on_long_press(ctx, point, true),
            TouchEvent::ConnectionUp(size) => {
                info!("Connection up, display {}x{}", size.width, size.height);
                self.display = size;
                if let Some(hook) = self.hooks.connect {
                    hook(ctx, size);
                }
                if let Some(hook) = self.hooks.resize {
                    hook(ctx, size);
                }
                PollStatus::NoTouch
            }
            TouchEvent::Resize(size) => {
                debug!("Display resized to {}x{}", size.width, size.height);
                self.display = size;
                if let Some(hook) = self.hooks.resize {
                    hook(ctx, size);
                }
                PollStatus::NoTouch
            }
        }
    }

    // -- Touch sequence -------------------------------------------

    fn on_down(
        &mut self,
        ctx: &mut C,
        surface: &mut impl RenderSurface,
        point: TouchPoint,
        now_ms: u32,
    ) -> PollStatus {
        self.autorepeat.cancel();
        self.long_press.disable();
        self.session = TouchSession {
            is_down: true,
            down: point,
            actual: point,
            up: point,
            transport_down: self.session.transport_down,
            ..TouchSession::default()
        };

        let status = if let Some(slider) = self.sliders.check_all(ctx, point, surface) {
            debug!("DOWN at {point:?} claimed by {slider}");
            self.session.slider = Some(slider);
            self.session.slider_is_move_target = true;
            PollStatus::TouchMatched
        } else {
            match hit::check_all(&self.widgets, point) {
                HitResult::TouchedAutorepeat(id) => {
                    debug!("DOWN at {point:?} on autorepeat widget {id}");
                    self.session.widget = Some(id);
                    self.session.autorepeat_touched = true;
                    self.autorepeat.start(ctx, &self.widgets, id, now_ms);
                    PollStatus::TouchMatched
                }
                HitResult::Touched(id) => {
                    debug!("DOWN at {point:?} on widget {id}");
                    self.session.widget = Some(id);
                    PollStatus::TouchMatched
                }
                HitResult::NotTouched => {
                    self.session.nothing_touched = true;
                    PollStatus::TouchNoMatch
                }
            }
        };

        if self.hooks.long_press.is_some() {
            self.long_press
                .register_periodic(now_ms, self.settings.long_press_timeout_ms);
        }
        if let Some(hook) = self.hooks.touch_down {
            hook(ctx, point);
        }
        status
    }

    fn on_move(
        &mut self,
        ctx: &mut C,
        surface: &mut impl RenderSurface,
        point: TouchPoint,
    ) -> PollStatus {
        if !self.session.is_down {
            trace!("MOVE without DOWN ignored");
            return PollStatus::NoTouch;
        }
        self.session.actual = point;
        if !event::within_threshold(self.session.down, point, self.settings.swipe_threshold) {
            self.session.left_threshold = true;
        }
        if let Some(hook) = self.hooks.touch_move {
            hook(ctx, point);
        }
        match self.session.slider.filter(|_| self.session.slider_is_move_target) {
            Some(slider) => {
                self.sliders.drag(ctx, slider, point, surface);
                PollStatus::TouchMatched
            }
            None if self.session.nothing_touched => PollStatus::TouchNoMatch,
            None => PollStatus::TouchMatched,
        }
    }

    fn on_up(&mut self, ctx: &mut C, point: TouchPoint) -> PollStatus {
        if !self.session.is_down {
            trace!("UP without DOWN ignored");
            return PollStatus::NoTouch;
        }
        self.session.is_down = false;
        self.session.up = point;
        self.session.actual = point;
        self.autorepeat.cancel();
        self.long_press.disable();

        // swipe first: it may suppress the up callbacks
        if let Some(swipe) = self.detect_swipe() {
            if let Some(hook) = self.hooks.swipe {
                debug!("Swipe {} by {}", swipe.axis, swipe.magnitude);
                hook(ctx, swipe);
                self.session.suppress_up = true;
            }
        }

        if std::mem::take(&mut self.session.suppress_up) {
            debug!("UP at {point:?} suppressed");
            return PollStatus::TouchMatched;
        }

        let status = if self.session.slider.is_some() || self.session.autorepeat_touched {
            PollStatus::TouchMatched
        } else {
            // only the widget that owned DOWN may fire, and only if the
            // finger is still on it
            let owner = self
                .session
                .widget
                .and_then(|id| self.widgets.get(id).map(|widget| (id, widget)));
            match owner {
                Some((id, widget)) if hit::check_and_invoke(ctx, id, widget, point) => {
                    debug!("Tap on widget {id}");
                    PollStatus::TouchMatched
                }
                _ => PollStatus::TouchNoMatch,
            }
        };

        if let Some(hook) = self.hooks.touch_up {
            hook(ctx, point);
        }
        status
    }

    fn detect_swipe(&self) -> Option<SwipeInfo> {
        if self.session.slider.is_some() || self.hooks.swipe.is_none() {
            return None;
        }
        event::detect_swipe(
            self.session.down,
            self.session.up,
            self.settings.swipe_threshold,
        )
    }

    /// Fire the long-press hook if the sequence is still eligible: down,
    /// not slider-owned, not autorepeating and not moved past the swipe
    /// threshold at any point. The following UP is then suppressed.
    fn on_long_press(&mut self, ctx: &mut C, point: TouchPoint, from_host: bool) -> PollStatus {
        let session = &self.session;
        if !session.is_down || session.slider.is_some() || session.autorepeat_touched {
            return PollStatus::NoTouch;
        }
        if !from_host && session.left_threshold {
            debug!("Long press skipped, touch moved");
            return PollStatus::NoTouch;
        }
        let Some(hook) = self.hooks.long_press else {
            return PollStatus::NoTouch;
        };
        debug!("Long press at {point:?}");
        self.long_press.disable();
        hook(ctx, point);
        self.session.suppress_up = true;
        PollStatus::TouchMatched
    }

    // -- Host-resolved callbacks ----------------------------------

    /// The host already decided what the touch meant; make sure the local
    /// UP of that sequence does not fire again.
    fn end_sequence_remotely(&mut self) {
        self.session.is_down = false;
        self.autorepeat.cancel();
        self.long_press.disable();
    }

    fn invoke_widget(&mut self, ctx: &mut C, id: WidgetId, value: i16) -> PollStatus {
        let Some(callback) = self
            .widgets
            .get(id)
            .filter(|w| w.is_allocated())
            .and_then(|w| w.callback())
        else {
            warn!("Host button callback for unknown widget {id}");
            return PollStatus::TouchNoMatch;
        };
        (callback.function())(ctx, id, value);
        PollStatus::TouchMatched
    }

    fn reset_session(&mut self) {
        self.autorepeat.cancel();
        self.long_press.disable();
        self.session = TouchSession {
            transport_down: self.session.transport_down,
            ..TouchSession::default()
        };
    }
}
