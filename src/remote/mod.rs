//! Remote control subsystem for the EV3 infrared sensor
//!
//! Turns the edge-free polling stream of the four remote channels into
//! discrete button events:
//!
//! 1. [`channel_poller`] - one task per channel, samples raw values
//! 2. [`event_aggregator`] - press or release edge detection
//! 3. [`session_handle`] - startup, supervision and shutdown
//!
//! # Architecture
//!
//! ```text
//! value0 ──► Poller ─┐
//! value1 ──► Poller ─┤   mpsc(50)
//! value2 ──► Poller ─┼──────────► Aggregator ──► callback(Channel, Button)
//! value3 ──► Poller ─┘
//!            ▲                       ▲
//!            └──── CancellationToken ┘
//! ```
//!
//! Press and release detection run as separate sessions, each with its own
//! pollers and state.

pub mod channel_poller;
pub mod event_aggregator;
pub mod session_handle;
pub mod signal;


pub use event_aggregator::{ButtonCallback, EdgeDetector, EdgeKind, PressDetector, ReleaseDetector};
pub use session_handle::{RemoteError, SessionHandle, SessionSettings};
pub use signal::{Button, ButtonKey, Channel, PressedSet, RawSample, Reading};
