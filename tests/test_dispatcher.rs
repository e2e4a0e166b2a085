//! End-to-end tests for `tactile::dispatcher` - touch sequences driven
//! through `poll_once` with a scripted transport, plus host-injected
//! events through the mailbox.

mod common;

use std::sync::Arc;

use common::*;
use tactile::config::{AppConfig, PoolSettings};
use tactile::dispatcher::Dispatcher;
use tactile::event::{PollStatus, SwipeAxis, TouchEvent};
use tactile::geometry::{DisplaySize, Rect, TouchPoint};
use tactile::manager::poll_contact;
use tactile::pool::{WidgetId, WidgetKind};
use tactile::slider::{Orientation, SliderId, SliderSpec};
use tactile::transport::SharedContact;
use tactile::widget::WidgetSpec;

// ── Helpers ──────────────────────────────────────────────────

const THRESHOLD: i16 = 30;
const BUTTON: Rect = Rect::new(100, 100, 60, 40);
const REPEAT: Rect = Rect::new(200, 100, 40, 40);

/// Dispatcher with every hook registered, a scripted transport and a
/// millisecond clock advanced by the test.
struct Rig {
    dispatcher: Dispatcher<Recorder>,
    rec: Recorder,
    surface: RecordingSurface,
    touch: ScriptedTransport,
    now: u32,
}

impl Rig {
    fn new() -> Self {
        let mut config = AppConfig::default();
        config.pool = PoolSettings {
            plain_widgets: 4,
            autorepeat_widgets: 2,
            sliders: 2,
        };
        let mut dispatcher = Dispatcher::new(&config);
        dispatcher.set_swipe_hook(Some(record_swipe));
        dispatcher.set_long_press_hook(Some(record_long_press));
        dispatcher.set_touch_down_hook(Some(record_down));
        dispatcher.set_touch_move_hook(Some(record_move));
        dispatcher.set_touch_up_hook(Some(record_up));
        dispatcher.set_connect_hook(Some(record_connect));
        dispatcher.set_resize_hook(Some(record_resize));
        Self {
            dispatcher,
            rec: Recorder::default(),
            surface: RecordingSurface::default(),
            touch: ScriptedTransport::default(),
            now: 0,
        }
    }

    fn add_widget(&mut self, kind: WidgetKind, rect: Rect, value: i16) -> WidgetId {
        let display = self.dispatcher.display_size();
        let pool = self.dispatcher.widgets_mut();
        let id = pool.allocate(kind).unwrap();
        let spec = WidgetSpec::new(rect, record_tap).with_value(value);
        pool.configure(id, &spec, display).unwrap();
        id
    }

    fn add_slider(&mut self) -> SliderId {
        let display = self.dispatcher.display_size();
        let spec = SliderSpec::new(TouchPoint::new(20, 180), Orientation::Horizontal, 160, record_slider);
        self.dispatcher.sliders_mut().add(&spec, display).unwrap().0
    }

    fn poll(&mut self) -> PollStatus {
        self.dispatcher
            .poll_once(&mut self.rec, &mut self.touch, &mut self.surface, self.now)
    }

    fn down(&mut self, x: i16, y: i16) -> PollStatus {
        self.touch.press(x, y);
        self.poll()
    }

    fn move_to(&mut self, x: i16, y: i16) -> PollStatus {
        self.touch.press(x, y);
        self.poll()
    }

    fn up(&mut self) -> PollStatus {
        self.touch.release();
        self.poll()
    }

    /// Poll with a reader-fed contact instead of the scripted transport.
    fn poll_contact(&mut self, contact: &mut Arc<SharedContact>) -> PollStatus {
        poll_contact(&mut self.dispatcher, &mut self.rec, contact, &mut self.surface, self.now)
    }

    /// Poll once per millisecond for `ms` milliseconds.
    fn advance(&mut self, ms: u32) {
        for _ in 0..ms {
            self.now += 1;
            self.poll();
        }
    }

    fn post(&mut self, event: TouchEvent) -> PollStatus {
        assert!(self.dispatcher.mailbox().post(event));
        self.poll()
    }
}

// ── Taps ─────────────────────────────────────────────────────

#[test]
fn test_idle_poll() {
    let mut rig = Rig::new();
    assert_eq!(rig.poll(), PollStatus::NoTouch);
}

#[test]
fn test_tap_fires_on_up() {
    let mut rig = Rig::new();
    let id = rig.add_widget(WidgetKind::Plain, BUTTON, 7);

    assert_eq!(rig.down(130, 120), PollStatus::TouchMatched);
    assert!(rig.rec.taps.is_empty());
    assert_eq!(rig.dispatcher.session().widget, Some(id));

    rig.advance(100);
    assert_eq!(rig.up(), PollStatus::TouchMatched);
    assert_eq!(rig.rec.taps, vec![(id, 7)]);
    assert!(rig.rec.swipes.is_empty());
    assert!(rig.rec.long_presses.is_empty());
    assert_eq!(rig.rec.downs, vec![TouchPoint::new(130, 120)]);
    assert_eq!(rig.rec.ups, vec![TouchPoint::new(130, 120)]);
}

#[test]
fn test_tap_uses_up_position() {
    let mut rig = Rig::new();
    rig.add_widget(WidgetKind::Plain, BUTTON, 7);

    rig.down(130, 120);
    // small move off the button, below the swipe threshold
    rig.move_to(130, 145);
    assert_eq!(rig.up(), PollStatus::TouchNoMatch);
    assert!(rig.rec.taps.is_empty());
    assert_eq!(rig.rec.ups.len(), 1);
}

#[test]
fn test_only_widget_owning_down_taps() {
    let mut rig = Rig::new();
    let a = rig.add_widget(WidgetKind::Plain, BUTTON, 1);
    rig.add_widget(WidgetKind::Plain, Rect::new(100, 145, 60, 40), 2);

    // DOWN on A, UP on B
    rig.down(130, 135);
    assert_eq!(rig.dispatcher.session().widget, Some(a));
    rig.move_to(130, 150);
    assert_eq!(rig.up(), PollStatus::TouchNoMatch);
    assert!(rig.rec.taps.is_empty());

    // DOWN on B, UP on A
    rig.down(130, 150);
    rig.move_to(130, 138);
    assert_eq!(rig.up(), PollStatus::TouchNoMatch);
    assert!(rig.rec.taps.is_empty());

    rig.down(130, 135);
    rig.move_to(132, 137);
    assert_eq!(rig.up(), PollStatus::TouchMatched);
    assert_eq!(rig.rec.taps, vec![(a, 1)]);
}

#[test]
fn test_down_on_empty_space_never_taps() {
    let mut rig = Rig::new();
    rig.add_widget(WidgetKind::Plain, BUTTON, 7);

    assert_eq!(rig.down(10, 10), PollStatus::TouchNoMatch);
    assert!(rig.dispatcher.session().nothing_touched);
    rig.move_to(20, 15);
    assert_eq!(rig.up(), PollStatus::TouchNoMatch);
    assert!(rig.rec.taps.is_empty());
}

#[test]
fn test_inactive_widget_not_tapped() {
    let mut rig = Rig::new();
    let id = rig.add_widget(WidgetKind::Plain, BUTTON, 7);
    rig.dispatcher.widgets_mut().set_active(id, false).unwrap();

    assert_eq!(rig.down(130, 120), PollStatus::TouchNoMatch);
    rig.up();
    assert!(rig.rec.taps.is_empty());
}

#[test]
fn test_overlap_first_registered_wins() {
    let mut rig = Rig::new();
    let first = rig.add_widget(WidgetKind::Plain, BUTTON, 1);
    rig.add_widget(WidgetKind::Plain, BUTTON, 2);

    rig.down(130, 120);
    rig.up();
    assert_eq!(rig.rec.taps, vec![(first, 1)]);
}

#[test]
fn test_move_and_up_without_down_ignored() {
    let mut rig = Rig::new();
    let mut rec = Recorder::default();
    let status = rig.dispatcher.handle_event(
        &mut rec,
        &mut rig.surface,
        TouchEvent::Move(TouchPoint::new(5, 5)),
        0,
    );
    assert_eq!(status, PollStatus::NoTouch);
    let status = rig.dispatcher.handle_event(
        &mut rec,
        &mut rig.surface,
        TouchEvent::Up(TouchPoint::new(5, 5)),
        0,
    );
    assert_eq!(status, PollStatus::NoTouch);
    assert!(rec.moves.is_empty());
    assert!(rec.ups.is_empty());
}

// ── Swipes ───────────────────────────────────────────────────

#[test]
fn test_swipe_just_below_threshold() {
    let mut rig = Rig::new();
    rig.down(10, 200);
    rig.move_to(10 + THRESHOLD - 1, 200);
    rig.up();
    assert!(rig.rec.swipes.is_empty());
    assert_eq!(rig.rec.ups.len(), 1);
}

#[test]
fn test_swipe_at_threshold() {
    let mut rig = Rig::new();
    rig.down(10, 200);
    rig.move_to(10 + THRESHOLD, 200);
    assert_eq!(rig.up(), PollStatus::TouchMatched);

    assert_eq!(rig.rec.swipes.len(), 1);
    let swipe = rig.rec.swipes[0];
    assert_eq!(swipe.axis, SwipeAxis::X);
    assert_eq!(swipe.magnitude, THRESHOLD as u16);
    assert_eq!(swipe.start, TouchPoint::new(10, 200));
    // swipe suppresses the up callbacks
    assert!(rig.rec.ups.is_empty());
}

#[test]
fn test_swipe_suppresses_tap() {
    let mut rig = Rig::new();
    rig.add_widget(WidgetKind::Plain, BUTTON, 7);

    rig.down(105, 120);
    rig.move_to(150, 120);
    rig.up();
    assert_eq!(rig.rec.swipes.len(), 1);
    assert!(rig.rec.taps.is_empty());
}

#[test]
fn test_no_swipe_without_hook() {
    let mut rig = Rig::new();
    rig.dispatcher.set_swipe_hook(None);
    let id = rig.add_widget(WidgetKind::Plain, BUTTON, 7);

    rig.down(105, 120);
    rig.move_to(150, 120);
    rig.up();
    assert!(rig.rec.swipes.is_empty());
    assert_eq!(rig.rec.taps, vec![(id, 7)]);
}

// ── Long press ───────────────────────────────────────────────

#[test]
fn test_long_press_suppresses_tap() {
    let mut rig = Rig::new();
    rig.add_widget(WidgetKind::Plain, BUTTON, 7);

    rig.down(130, 120);
    rig.advance(799);
    assert!(rig.rec.long_presses.is_empty());
    rig.advance(1);
    assert_eq!(rig.rec.long_presses, vec![TouchPoint::new(130, 120)]);

    rig.advance(1000);
    assert_eq!(rig.rec.long_presses.len(), 1);

    rig.up();
    assert!(rig.rec.taps.is_empty());
    assert!(rig.rec.ups.is_empty());
}

#[test]
fn test_long_press_cancelled_by_movement() {
    let mut rig = Rig::new();
    rig.down(50, 50);
    rig.move_to(50 + THRESHOLD, 50);
    rig.advance(1000);
    assert!(rig.rec.long_presses.is_empty());
}

#[test]
fn test_long_press_cancelled_by_excursion() {
    let mut rig = Rig::new();
    rig.down(50, 50);
    rig.move_to(50 + THRESHOLD, 50);
    // back near the start before the timeout
    rig.move_to(52, 50);
    assert!(rig.dispatcher.session().left_threshold);
    rig.advance(1000);
    assert!(rig.rec.long_presses.is_empty());
}

#[test]
fn test_long_press_survives_small_wobble() {
    let mut rig = Rig::new();
    rig.down(50, 50);
    rig.move_to(50 + THRESHOLD - 1, 50);
    rig.move_to(50, 50 - THRESHOLD + 1);
    rig.advance(1000);
    assert_eq!(rig.rec.long_presses.len(), 1);
}

#[test]
fn test_long_press_cancelled_by_up() {
    let mut rig = Rig::new();
    rig.down(50, 50);
    rig.advance(400);
    rig.up();
    rig.advance(1000);
    assert!(rig.rec.long_presses.is_empty());
}

#[test]
fn test_host_long_press() {
    let mut rig = Rig::new();
    rig.add_widget(WidgetKind::Plain, BUTTON, 7);
    rig.down(130, 120);

    let at = TouchPoint::new(131, 121);
    assert_eq!(rig.post(TouchEvent::LongPress(at)), PollStatus::TouchMatched);
    assert_eq!(rig.rec.long_presses, vec![at]);
    rig.up();
    assert!(rig.rec.taps.is_empty());
}

// ── Sliders ──────────────────────────────────────────────────

#[test]
fn test_slider_drag_owns_sequence() {
    let mut rig = Rig::new();
    rig.add_widget(WidgetKind::Plain, Rect::new(60, 160, 60, 60), 7);
    let slider = rig.add_slider();

    // slider is tested before the overlapping button
    assert_eq!(rig.down(20, 185), PollStatus::TouchMatched);
    assert_eq!(rig.dispatcher.session().slider, Some(slider));
    assert_eq!(rig.rec.slider_values, vec![(slider, 0)]);

    rig.move_to(60, 185);
    rig.move_to(60, 187);
    rig.move_to(100, 185);
    rig.advance(1000);
    rig.up();

    assert_eq!(
        rig.rec.slider_values,
        vec![(slider, 0), (slider, 40), (slider, 80)]
    );
    assert_eq!(rig.dispatcher.sliders().get(slider).unwrap().value(), 80);
    assert!(rig.rec.taps.is_empty());
    assert!(rig.rec.swipes.is_empty());
    assert!(rig.rec.long_presses.is_empty());
    assert_eq!(rig.rec.moves.len(), 3);
}

// ── Autorepeat ───────────────────────────────────────────────

#[test]
fn test_autorepeat_fires_until_up() {
    let mut rig = Rig::new();
    let id = rig.add_widget(WidgetKind::Autorepeat, REPEAT, 1);

    assert_eq!(rig.down(220, 120), PollStatus::TouchMatched);
    assert_eq!(rig.rec.taps, vec![(id, 1)]);

    rig.advance(600);
    assert_eq!(rig.rec.taps.len(), 2);
    rig.advance(200);
    assert_eq!(rig.rec.taps.len(), 4);

    rig.up();
    rig.advance(1000);
    assert_eq!(rig.rec.taps.len(), 4);
    assert!(!rig.dispatcher.autorepeat().is_running());
    // no long press on a repeating button
    assert!(rig.rec.long_presses.is_empty());
}

#[test]
fn test_autorepeat_stops_when_touch_leaves() {
    let mut rig = Rig::new();
    rig.add_widget(WidgetKind::Autorepeat, REPEAT, 1);

    rig.down(220, 120);
    rig.move_to(220, 200);
    rig.advance(1000);
    assert_eq!(rig.rec.taps.len(), 1);
    assert!(!rig.dispatcher.autorepeat().is_running());
}

// ── Host events ──────────────────────────────────────────────

#[test]
fn test_host_button_callback_ends_sequence() {
    let mut rig = Rig::new();
    let id = rig.add_widget(WidgetKind::Plain, BUTTON, 7);
    rig.down(130, 120);

    let status = rig.post(TouchEvent::ButtonCallback { widget: id, value: 42 });
    assert_eq!(status, PollStatus::TouchMatched);
    assert!(!rig.dispatcher.session().is_down);

    rig.up();
    assert_eq!(rig.rec.taps, vec![(id, 42)]);
}

#[test]
fn test_host_button_callback_unknown_widget() {
    let mut rig = Rig::new();
    let status = rig.post(TouchEvent::ButtonCallback {
        widget: WidgetId(3),
        value: 1,
    });
    assert_eq!(status, PollStatus::TouchNoMatch);
    assert!(rig.rec.taps.is_empty());
}

#[test]
fn test_host_slider_callback() {
    let mut rig = Rig::new();
    let slider = rig.add_slider();
    let status = rig.post(TouchEvent::SliderCallback { slider, value: 99 });
    assert_eq!(status, PollStatus::TouchMatched);
    assert_eq!(rig.rec.slider_values, vec![(slider, 99)]);
    assert_eq!(rig.dispatcher.sliders().get(slider).unwrap().value(), 99);
}

#[test]
fn test_number_request_is_one_shot() {
    let mut rig = Rig::new();
    rig.dispatcher.request_number(record_number);

    let status = rig.post(TouchEvent::NumberCallback { value: 3.5 });
    assert_eq!(status, PollStatus::TouchMatched);
    let status = rig.post(TouchEvent::NumberCallback { value: 4.0 });
    assert_eq!(status, PollStatus::TouchNoMatch);
    assert_eq!(rig.rec.numbers, vec![3.5]);
}

#[test]
fn test_host_swipe() {
    let mut rig = Rig::new();
    rig.post(TouchEvent::SwipeCallback {
        start: TouchPoint::new(200, 100),
        dx: -50,
        dy: 20,
    });
    assert_eq!(rig.rec.swipes.len(), 1);
    assert_eq!(rig.rec.swipes[0].axis, SwipeAxis::X);
    assert_eq!(rig.rec.swipes[0].magnitude, 50);
}

#[test]
fn test_connection_up_and_resize() {
    let mut rig = Rig::new();
    let size = DisplaySize::new(480, 320);
    rig.post(TouchEvent::ConnectionUp(size));
    assert_eq!(rig.rec.connects, vec![size]);
    assert_eq!(rig.rec.resizes, vec![size]);
    assert_eq!(rig.dispatcher.display_size(), size);

    let smaller = DisplaySize::new(320, 240);
    rig.post(TouchEvent::Resize(smaller));
    assert_eq!(rig.rec.connects.len(), 1);
    assert_eq!(rig.rec.resizes, vec![size, smaller]);
    assert_eq!(rig.dispatcher.display_size(), smaller);
}

#[test]
fn test_error_resets_sequence() {
    let mut rig = Rig::new();
    rig.add_widget(WidgetKind::Plain, BUTTON, 7);
    rig.down(130, 120);

    assert_eq!(rig.post(TouchEvent::Error), PollStatus::NoTouch);
    assert!(!rig.dispatcher.session().is_down);
    assert_eq!(rig.dispatcher.session().widget, None);

    rig.advance(1000);
    rig.up();
    assert!(rig.rec.taps.is_empty());
    assert!(rig.rec.ups.is_empty());
    assert!(rig.rec.long_presses.is_empty());
}

#[test]
fn test_host_touch_sequence_through_mailbox() {
    let mut rig = Rig::new();
    let id = rig.add_widget(WidgetKind::Plain, BUTTON, 7);

    rig.post(TouchEvent::Down(TouchPoint::new(130, 120)));
    rig.post(TouchEvent::Up(TouchPoint::new(132, 121)));
    assert_eq!(rig.rec.taps, vec![(id, 7)]);
}

#[test]
fn test_mailbox_keeps_one_event() {
    let rig = Rig::new();
    let mailbox = rig.dispatcher.mailbox();
    assert!(mailbox.post(TouchEvent::Error));
    assert!(!mailbox.post(TouchEvent::Error));
    assert_eq!(mailbox.dropped(), 1);
}

// ── Reader-fed contact ───────────────────────────────────────

#[test]
fn test_lift_between_polls_ends_autorepeat() {
    let mut rig = Rig::new();
    let id = rig.add_widget(WidgetKind::Autorepeat, REPEAT, 1);
    let mut contact = Arc::new(SharedContact::new());

    contact.publish(TouchEvent::Down(TouchPoint::new(220, 120)));
    assert_eq!(rig.poll_contact(&mut contact), PollStatus::TouchMatched);
    assert_eq!(rig.rec.taps, vec![(id, 1)]);

    // move and lift both land before the next poll
    contact.publish(TouchEvent::Move(TouchPoint::new(222, 121)));
    contact.publish(TouchEvent::Up(TouchPoint::new(222, 121)));
    rig.poll_contact(&mut contact);
    assert!(!rig.dispatcher.session().is_down);
    assert!(!rig.dispatcher.autorepeat().is_running());

    for _ in 0..2000 {
        rig.now += 1;
        rig.poll_contact(&mut contact);
    }
    assert_eq!(rig.rec.taps.len(), 1);
}

#[test]
fn test_lift_not_blocked_by_pending_host_event() {
    let mut rig = Rig::new();
    let id = rig.add_widget(WidgetKind::Plain, BUTTON, 7);
    let mut contact = Arc::new(SharedContact::new());

    contact.publish(TouchEvent::Down(TouchPoint::new(130, 120)));
    rig.poll_contact(&mut contact);
    assert!(rig.dispatcher.mailbox().post(TouchEvent::Resize(DisplaySize::new(480, 272))));
    contact.publish(TouchEvent::Up(TouchPoint::new(130, 120)));

    rig.poll_contact(&mut contact);
    assert_eq!(rig.rec.resizes, vec![DisplaySize::new(480, 272)]);
    assert_eq!(rig.rec.taps, vec![(id, 7)]);
    assert!(!rig.dispatcher.session().is_down);
}

#[test]
fn test_lost_contact_resets_without_tap() {
    let mut rig = Rig::new();
    rig.add_widget(WidgetKind::Plain, BUTTON, 7);
    let mut contact = Arc::new(SharedContact::new());

    contact.publish(TouchEvent::Down(TouchPoint::new(130, 120)));
    rig.poll_contact(&mut contact);
    contact.mark_lost();

    rig.poll_contact(&mut contact);
    assert!(!rig.dispatcher.session().is_down);
    assert!(rig.rec.taps.is_empty());
    assert!(rig.rec.ups.is_empty());
    rig.advance(1000);
    assert!(rig.rec.long_presses.is_empty());
}
