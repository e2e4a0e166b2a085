//! tactile: touch interaction core for small embedded GUI toolkits.
//!
//! Turns single-point touch transitions into debounced widget callbacks:
//! taps, autorepeating presses, slider drags, swipes and long presses.
//! Widgets come from a fixed-capacity pool; nothing is allocated while
//! events are dispatched.

pub mod autorepeat;
pub mod config;
pub mod dispatcher;
pub mod event;
pub mod geometry;
pub mod hit;
pub mod mailbox;
pub mod manager;
pub mod pool;
pub mod render;
pub mod slider;
pub mod timer;
pub mod transport;
pub mod widget;
