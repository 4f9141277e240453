//! Playback transport
//!
//! [`PlaybackClock`] maps the output device's monotonic clock onto a logical
//! position in the installed buffer, across play/pause/seek/rate changes,
//! and broadcasts the position to subscribers while playing. [`BufferSlot`]
//! is the hand-off point where the pipeline and mixer publish what to play.

pub mod clock;
pub mod slot;

pub use clock::{MonotonicClock, PlaybackClock, PlaybackError, SubscriptionId, SystemClock};
pub use slot::BufferSlot;

/// Transport state
///
/// `Stopped` is the initial state and the end-of-media state; `Paused`
/// remembers its position, `Stopped` resets it to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}
