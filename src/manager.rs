//! Host runtime: evdev device discovery, the reader thread that tracks the
//! contact, and the cooperative polling loop (I/O layer).
//!
//! Event classification lives in [`crate::transport`], dispatch in
//! [`crate::dispatcher`].
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use evdev::{AbsoluteAxisType, Device};
use log::{debug, error, info, trace, warn};

use crate::config::{AppConfig, TactileError, parse_config_file};
use crate::dispatcher::Dispatcher;
use crate::event::{PollStatus, SwipeInfo, TouchEvent};
use crate::geometry::{DisplaySize, Rect, TouchPoint};
use crate::pool::{WidgetId, WidgetKind};
use crate::render::{LogSurface, RenderSurface};
use crate::slider::{Orientation, SliderId, SliderSpec};
use crate::transport::{ContactTracker, SharedContact, classify_event};
use crate::widget::WidgetSpec;

// -- TouchManager (top-level orchestrator) --------------------

/// Runs the dispatcher against a Linux touchscreen.
pub struct TouchManager {
    config: AppConfig,
    running: Arc<AtomicBool>,
}

impl TouchManager {
    pub fn new(config_path: impl AsRef<Path>) -> Result<Self, TactileError> {
        Ok(Self {
            config: parse_config_file(config_path.as_ref())?,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Open the configured device and run the polling loop until stopped.
    pub fn start(&mut self) -> Result<(), TactileError> {
        let Some(usb_id) = self.config.device_usb_id.clone() else {
            error!("No [device] usb_id configured");
            return Err(TactileError::InvalidConfig {
                key: "device.usb_id",
                message: "required to run".to_string(),
            });
        };
        let Some(device) = find_device(&usb_id) else {
            return Err(TactileError::InvalidConfig {
                key: "device.usb_id",
                message: format!("no touch device with USB ID {usb_id} found"),
            });
        };

        self.running.store(true, Ordering::Relaxed);
        info!("Starting touch loop");

        let mut dispatcher = Dispatcher::new(&self.config);
        let mut surface = LogSurface::new(self.config.display);
        let mut state = DemoState::default();
        build_demo_layout(&mut dispatcher, &mut surface)?;

        let mut contact = Arc::new(SharedContact::new());
        let shared = Arc::clone(&contact);
        let running = Arc::clone(&self.running);
        let display = self.config.display;
        let reader = thread::Builder::new()
            .name(format!("touch-{usb_id}"))
            .spawn(move || run_reader(&usb_id, device, display, &shared, &running));
        if let Err(e) = reader {
            error!("Failed to spawn reader thread: {e}");
            self.running.store(false, Ordering::Relaxed);
            return Ok(());
        }

        let interval = Duration::from_millis(u64::from(self.config.touch.poll_interval_ms));
        let epoch = Instant::now();
        while self.running.load(Ordering::Relaxed) {
            let now_ms = epoch.elapsed().as_millis() as u32;
            let status = poll_contact(&mut dispatcher, &mut state, &mut contact, &mut surface, now_ms);
            if status != PollStatus::NoTouch {
                debug!("poll: {status}");
            }
            thread::sleep(interval);
        }

        let stats = dispatcher.widgets().stats();
        info!(
            "Touch loop stopped ({} taps, {} dropped events, {}/{} widgets free, min {})",
            state.taps,
            dispatcher.mailbox().dropped(),
            stats.free,
            stats.total,
            stats.min_free
        );
        Ok(())
    }

    /// Stop the polling loop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
        info!("Touch manager stopped");
    }

    /// Shared flag; clearing it ends [`start`](Self::start).
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn config_log_level(&self) -> &str {
        &self.config.log_level
    }

    pub fn config_log_file(&self) -> Option<&str> {
        self.config.log_file.as_deref()
    }
}

/// One loop iteration fed by a reader thread's [`SharedContact`]. A contact
/// lost with its device resets the sequence before the transport is read,
/// so the dispatcher never sees it as a lift.
pub fn poll_contact<C>(
    dispatcher: &mut Dispatcher<C>,
    ctx: &mut C,
    contact: &mut Arc<SharedContact>,
    surface: &mut impl RenderSurface,
    now_ms: u32,
) -> PollStatus {
    if contact.take_lost() {
        dispatcher.handle_event(ctx, surface, TouchEvent::Error, now_ms);
    }
    dispatcher.poll_once(ctx, contact, surface, now_ms)
}

// -- Demonstration layout -------------------------------------

/// Context handed to the demonstration callbacks.
#[derive(Debug, Default)]
pub struct DemoState {
    pub taps: u32,
    pub counter: i32,
    pub level: i16,
}

fn on_tap(state: &mut DemoState, id: WidgetId, value: i16) {
    state.taps += 1;
    info!("Button {id} tapped (value {value}, {} taps)", state.taps);
}

fn on_step(state: &mut DemoState, _id: WidgetId, value: i16) {
    state.counter += i32::from(value);
    info!("Counter: {}", state.counter);
}

fn on_level(state: &mut DemoState, _id: SliderId, value: i16) -> i16 {
    // quantize to steps of 10
    let snapped = (value + 5) / 10 * 10;
    state.level = snapped;
    snapped
}

fn on_swipe(_state: &mut DemoState, swipe: SwipeInfo) {
    info!("Swipe along {} by {} px", swipe.axis, swipe.magnitude);
}

fn on_long_press(_state: &mut DemoState, point: TouchPoint) {
    info!("Long press at ({}, {})", point.x, point.y);
}

fn build_demo_layout(
    dispatcher: &mut Dispatcher<DemoState>,
    surface: &mut LogSurface,
) -> Result<(), TactileError> {
    let display = dispatcher.display_size();

    let tap = dispatcher.widgets_mut().allocate(WidgetKind::Plain)?;
    let spec = WidgetSpec::new(Rect::new(10, 10, 100, 40), on_tap).with_caption("Tap", 2);
    dispatcher.widgets_mut().configure(tap, &spec, display)?;
    dispatcher.widgets().draw(tap, surface)?;

    let step = dispatcher.widgets_mut().allocate(WidgetKind::Autorepeat)?;
    let spec = WidgetSpec::new(Rect::new(120, 10, 40, 40), on_step)
        .with_caption("+", 2)
        .with_value(1)
        .with_border(4);
    dispatcher.widgets_mut().configure(step, &spec, display)?;
    dispatcher.widgets().draw(step, surface)?;

    let spec = SliderSpec::new(TouchPoint::new(10, 80), Orientation::Horizontal, 100, on_level)
        .with_threshold(80);
    let (level, _) = dispatcher.sliders_mut().add(&spec, display)?;
    dispatcher.sliders().draw(level, surface)?;

    dispatcher.set_swipe_hook(Some(on_swipe));
    dispatcher.set_long_press_hook(Some(on_long_press));
    Ok(())
}

// -- Device I/O -----------------------------------------------

/// Parse a USB vendor:product ID string into `(vendor, product)`.
///
/// Accepts formats like `"1234:5678"` or `"USB:1234:5678"` (case-insensitive).
/// Returns `None` if the format is invalid or the hex values cannot be parsed.
pub fn parse_usb_id(raw: &str) -> Option<(u16, u16)> {
    let cleaned = raw.to_lowercase().replace("usb:", "");
    let (vendor_str, product_str) = cleaned.split_once(':')?;
    let vendor = u16::from_str_radix(vendor_str, 16).ok()?;
    let product = u16::from_str_radix(product_str, 16).ok()?;
    Some((vendor, product))
}

/// A device reporting both multi-touch position axes.
fn is_touch_device(device: &Device) -> bool {
    device.supported_absolute_axes().is_some_and(|axes| {
        axes.contains(AbsoluteAxisType::ABS_MT_POSITION_X)
            && axes.contains(AbsoluteAxisType::ABS_MT_POSITION_Y)
    })
}

/// All multi-touch devices with their node paths.
fn touch_devices() -> impl Iterator<Item = (PathBuf, Device)> {
    evdev::enumerate().filter(|(_, device)| is_touch_device(device))
}

fn find_device(usb_id: &str) -> Option<Device> {
    let Some((vendor, product)) = parse_usb_id(usb_id) else {
        warn!("Malformed USB ID '{usb_id}', expected vendor:product in hex");
        return None;
    };
    let found = touch_devices().find(|(_, device)| {
        let id = device.input_id();
        (id.vendor(), id.product()) == (vendor, product)
    });
    match found {
        Some((path, device)) => {
            info!(
                "Using {} at {} for {usb_id}",
                device.name().unwrap_or("unnamed device"),
                path.display()
            );
            Some(device)
        }
        None => {
            warn!("No multi-touch device matches {usb_id}");
            None
        }
    }
}

/// Build a tracker from the device's axis ranges.
fn make_tracker(device: &Device, display: DisplaySize) -> Option<ContactTracker> {
    let abs = match device.get_abs_state() {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to get abs state: {e}");
            return None;
        }
    };
    let x = &abs[AbsoluteAxisType::ABS_MT_POSITION_X.0 as usize];
    let y = &abs[AbsoluteAxisType::ABS_MT_POSITION_Y.0 as usize];
    debug!(
        "  X range: {}..{}, Y range: {}..{}",
        x.minimum, x.maximum, y.minimum, y.maximum
    );
    Some(ContactTracker::new(
        (x.minimum, x.maximum),
        (y.minimum, y.maximum),
        display,
    ))
}

/// Reader thread: blocks on the device and publishes the contact state.
/// Reconnects when the device disappears.
fn run_reader(
    usb_id: &str,
    mut device: Device,
    display: DisplaySize,
    contact: &SharedContact,
    running: &AtomicBool,
) {
    const MAX_RETRIES: usize = 10;
    const RETRY_INTERVAL: Duration = Duration::from_secs(5);

    'device: loop {
        let Some(mut tracker) = make_tracker(&device, display) else {
            return;
        };
        while running.load(Ordering::Relaxed) {
            let events = match device.fetch_events() {
                Ok(iter) => iter.collect::<Vec<_>>(),
                Err(e) => {
                    warn!("Device {usb_id} disconnected: {e}");
                    break;
                }
            };
            for event in &events {
                let Some(transition) = classify_event(event).and_then(|raw| tracker.feed(raw))
                else {
                    continue;
                };
                trace!("{}", transition.name());
                contact.publish(transition);
            }
        }
        if !running.load(Ordering::Relaxed) {
            return;
        }
        if tracker.is_down() {
            contact.mark_lost();
        }

        for attempt in 1..=MAX_RETRIES {
            if !running.load(Ordering::Relaxed) {
                return;
            }
            info!("Reconnect attempt {attempt}/{MAX_RETRIES} for {usb_id}...");
            thread::sleep(RETRY_INTERVAL);
            if let Some(new_device) = find_device(usb_id) {
                info!("Reconnected to {usb_id}");
                device = new_device;
                continue 'device;
            }
        }
        error!("Failed to reconnect to {usb_id} after {MAX_RETRIES} attempts");
        running.store(false, Ordering::Relaxed);
        return;
    }
}

/// Print every multi-touch device with its USB ID, for the `[device]`
/// section.
pub fn list_touch_devices() -> ExitCode {
    let devices: Vec<_> = touch_devices().collect();
    if devices.is_empty() {
        println!("No multi-touch devices found. Is the panel connected, and are you allowed to read /dev/input?");
        return ExitCode::FAILURE;
    }

    println!("{:<9} {:<24} {}", "USB ID", "Path", "Name");
    for (path, device) in &devices {
        let id = device.input_id();
        println!(
            "{:04x}:{:04x} {:<24} {}",
            id.vendor(),
            id.product(),
            path.display(),
            device.name().unwrap_or("unnamed device"),
        );
    }
    println!("\nSet one of them in tactile.toml:\n\n[device]\nusb_id = \"<USB ID>\"");
    ExitCode::SUCCESS
}
