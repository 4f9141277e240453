//! Anchor-based playback clock.
//!
//! Position is never accumulated tick by tick. While playing, the clock
//! keeps a single anchor on the device timeline and derives the position
//! on demand:
//!
//! ```text
//! position = (device_now - start_anchor) * rate
//! ```
//!
//! Every transition (play, seek, rate change) rewrites the anchor so that
//! the position is continuous across it. Tick jitter in the broadcast loop
//! therefore affects only *when* subscribers are notified, never *what*
//! position they are told.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Instant;

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::PlaybackConfig;
use crate::playback::slot::BufferSlot;
use crate::playback::PlaybackState;

/// Errors from transport control.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// `play` was requested while the buffer slot is empty.
    #[error("no buffer loaded for playback")]
    NoBufferLoaded,
}

/// Source of the device-side monotonic timeline, in seconds.
///
/// Injected so tests can drive the clock by hand; production code uses
/// [`SystemClock`].
pub trait MonotonicClock: Send + Sync {
    fn now(&self) -> f64;
}

/// [`MonotonicClock`] backed by [`Instant`].
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        SystemClock::new()
    }
}

impl MonotonicClock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Handle returned by [`PlaybackClock::subscribe`].
pub type SubscriptionId = u64;

type PositionCallback = Arc<dyn Fn(f64) + Send + Sync>;

struct TransportState {
    state: PlaybackState,
    /// Device time at which logical position zero would have started,
    /// adjusted for rate. Meaningful only while `Playing`.
    start_anchor: f64,
    /// Last position while `Paused` or `Stopped` (zero when stopped).
    paused_position: f64,
    rate: f64,
}

/// Playback transport over the installed [`BufferSlot`].
///
/// While playing, a background loop ticks at the configured rate and pushes
/// the derived position to every subscriber. The loop holds only a [`Weak`]
/// back-reference, so dropping the last strong handle to the clock also
/// ends the loop.
pub struct PlaybackClock {
    clock: Arc<dyn MonotonicClock>,
    slot: Arc<BufferSlot>,
    config: PlaybackConfig,
    transport: Mutex<TransportState>,
    subscribers: Mutex<Vec<(SubscriptionId, PositionCallback)>>,
    next_subscription: AtomicU64,
    broadcast: Mutex<Option<JoinHandle<()>>>,
}

impl PlaybackClock {
    pub fn new(
        clock: Arc<dyn MonotonicClock>,
        slot: Arc<BufferSlot>,
        config: PlaybackConfig,
    ) -> Arc<Self> {
        Arc::new(PlaybackClock {
            clock,
            slot,
            config,
            transport: Mutex::new(TransportState {
                state: PlaybackState::Stopped,
                start_anchor: 0.0,
                paused_position: 0.0,
                rate: 1.0,
            }),
            subscribers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
            broadcast: Mutex::new(None),
        })
    }

    pub fn state(&self) -> PlaybackState {
        self.transport.lock().unwrap().state
    }

    pub fn is_playing(&self) -> bool {
        self.state() == PlaybackState::Playing
    }

    pub fn rate(&self) -> f64 {
        self.transport.lock().unwrap().rate
    }

    /// Duration of the installed buffer in seconds, or zero when empty.
    pub fn duration(&self) -> f64 {
        self.slot.duration_seconds()
    }

    /// Current logical position in seconds.
    pub fn position(&self) -> f64 {
        let transport = self.transport.lock().unwrap();
        Self::position_locked(&transport, self.clock.now())
    }

    fn position_locked(transport: &TransportState, now: f64) -> f64 {
        match transport.state {
            PlaybackState::Playing => (now - transport.start_anchor) * transport.rate,
            PlaybackState::Paused | PlaybackState::Stopped => transport.paused_position,
        }
    }

    /// Start or resume playback from the remembered position.
    ///
    /// Fails fast with [`PlaybackError::NoBufferLoaded`] when nothing is
    /// installed in the slot. A no-op while already playing. Must be called
    /// inside a tokio runtime; the broadcast loop is spawned here.
    pub fn play(self: &Arc<Self>) -> Result<(), PlaybackError> {
        if self.slot.current().is_none() {
            return Err(PlaybackError::NoBufferLoaded);
        }
        {
            let mut transport = self.transport.lock().unwrap();
            if transport.state == PlaybackState::Playing {
                return Ok(());
            }
            transport.start_anchor =
                self.clock.now() - transport.paused_position / transport.rate;
            transport.state = PlaybackState::Playing;
        }
        let handle = self.spawn_broadcast_loop();
        if let Some(previous) = self.broadcast.lock().unwrap().replace(handle) {
            previous.abort();
        }
        log::info!("playback started");
        Ok(())
    }

    /// Freeze the position and stop broadcasting.
    pub fn pause(&self) {
        {
            let mut transport = self.transport.lock().unwrap();
            if transport.state != PlaybackState::Playing {
                return;
            }
            transport.paused_position = Self::position_locked(&transport, self.clock.now());
            transport.state = PlaybackState::Paused;
        }
        self.stop_broadcast_loop();
        log::debug!("playback paused");
    }

    /// Halt playback and reset the position to zero.
    pub fn stop(&self) {
        {
            let mut transport = self.transport.lock().unwrap();
            transport.state = PlaybackState::Stopped;
            transport.paused_position = 0.0;
        }
        self.stop_broadcast_loop();
        log::info!("playback stopped");
    }

    /// Jump to `position` seconds without changing the transport state.
    pub fn seek(&self, position: f64) {
        let position = position.max(0.0);
        let mut transport = self.transport.lock().unwrap();
        match transport.state {
            PlaybackState::Playing => {
                transport.start_anchor = self.clock.now() - position / transport.rate;
            }
            PlaybackState::Paused | PlaybackState::Stopped => {
                transport.paused_position = position;
            }
        }
    }

    /// Change the playback rate, clamped to the configured range.
    ///
    /// The anchor is rewritten so the position is continuous across the
    /// change; only the slope of position over device time changes.
    pub fn set_rate(&self, rate: f64) {
        let rate = rate.clamp(self.config.min_rate, self.config.max_rate);
        let mut transport = self.transport.lock().unwrap();
        if transport.state == PlaybackState::Playing {
            let now = self.clock.now();
            let position = Self::position_locked(&transport, now);
            transport.start_anchor = now - position / rate;
        }
        transport.rate = rate;
    }

    /// Register a position callback; returns the id to pass to
    /// [`unsubscribe`](Self::unsubscribe).
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .lock()
            .unwrap()
            .push((id, Arc::new(callback)));
        id
    }

    /// Remove a subscriber. Returns false when the id is unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock().unwrap();
        let before = subscribers.len();
        subscribers.retain(|(sub, _)| *sub != id);
        subscribers.len() != before
    }

    /// One broadcast step: derive the position, notify subscribers, and
    /// stop at end of media. Called from the background loop; exposed so
    /// tests can drive the clock deterministically.
    pub fn tick(&self) {
        let duration = self.slot.duration_seconds();
        let (position, ended) = {
            let transport = self.transport.lock().unwrap();
            if transport.state != PlaybackState::Playing {
                return;
            }
            let raw = Self::position_locked(&transport, self.clock.now());
            let ended = duration > 0.0 && raw >= duration;
            (if ended { duration } else { raw }, ended)
        };
        self.notify(position);
        if ended {
            // A callback may have paused or sought during notify; only
            // complete the end-of-media transition if still playing.
            let mut transport = self.transport.lock().unwrap();
            if transport.state == PlaybackState::Playing {
                transport.state = PlaybackState::Stopped;
                transport.paused_position = 0.0;
                log::debug!("playback reached end of media");
            }
        }
    }

    fn notify(&self, position: f64) {
        // Copy-on-notify: callbacks run without the subscriber lock held,
        // so they may subscribe or unsubscribe freely.
        let snapshot: Vec<PositionCallback> = self
            .subscribers
            .lock()
            .unwrap()
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for callback in snapshot {
            callback(position);
        }
    }

    fn spawn_broadcast_loop(self: &Arc<Self>) -> JoinHandle<()> {
        let weak: Weak<PlaybackClock> = Arc::downgrade(self);
        let period = self.config.tick_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let Some(clock) = weak.upgrade() else { break };
                if !clock.is_playing() {
                    break;
                }
                clock.tick();
            }
        })
    }

    fn stop_broadcast_loop(&self) {
        if let Some(handle) = self.broadcast.lock().unwrap().take() {
            handle.abort();
        }
    }
}

impl Drop for PlaybackClock {
    fn drop(&mut self) {
        self.stop_broadcast_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SampleBuffer;
    use std::sync::atomic::AtomicUsize;

    struct ManualClock {
        now: Mutex<f64>,
    }

    impl ManualClock {
        fn new() -> Arc<Self> {
            Arc::new(ManualClock {
                now: Mutex::new(0.0),
            })
        }

        fn advance(&self, secs: f64) {
            *self.now.lock().unwrap() += secs;
        }
    }

    impl MonotonicClock for ManualClock {
        fn now(&self) -> f64 {
            *self.now.lock().unwrap()
        }
    }

    fn loaded_clock(duration_secs: f64) -> (Arc<ManualClock>, Arc<PlaybackClock>) {
        let manual = ManualClock::new();
        let slot = Arc::new(BufferSlot::new());
        let samples = (duration_secs * 100.0).round() as usize;
        slot.install(Arc::new(SampleBuffer::silence(100, 1, samples)));
        let clock = PlaybackClock::new(manual.clone(), slot, PlaybackConfig::default());
        (manual, clock)
    }

    #[tokio::test]
    async fn play_without_buffer_fails_fast() {
        let manual = ManualClock::new();
        let slot = Arc::new(BufferSlot::new());
        let clock = PlaybackClock::new(manual, slot, PlaybackConfig::default());
        assert!(matches!(clock.play(), Err(PlaybackError::NoBufferLoaded)));
        assert_eq!(clock.state(), PlaybackState::Stopped);
    }

    #[tokio::test]
    async fn position_advances_with_device_time() {
        let (manual, clock) = loaded_clock(10.0);
        clock.play().unwrap();
        manual.advance(2.0);
        assert!((clock.position() - 2.0).abs() < 1e-9);
        manual.advance(0.5);
        assert!((clock.position() - 2.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn pause_freezes_and_resume_continues() {
        let (manual, clock) = loaded_clock(10.0);
        clock.play().unwrap();
        manual.advance(3.0);
        clock.pause();
        manual.advance(5.0);
        assert!((clock.position() - 3.0).abs() < 1e-9);
        clock.play().unwrap();
        manual.advance(1.0);
        assert!((clock.position() - 4.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn rate_change_is_continuous() {
        let (manual, clock) = loaded_clock(100.0);
        clock.play().unwrap();
        manual.advance(4.0);
        clock.set_rate(2.0);
        // No jump at the moment of the change.
        assert!((clock.position() - 4.0).abs() < 1e-9);
        manual.advance(3.0);
        assert!((clock.position() - 10.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn rate_is_clamped_to_configured_range() {
        let (_, clock) = loaded_clock(10.0);
        clock.set_rate(0.01);
        assert!((clock.rate() - 0.25).abs() < 1e-9);
        clock.set_rate(100.0);
        assert!((clock.rate() - 4.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn seek_while_paused_and_while_playing() {
        let (manual, clock) = loaded_clock(10.0);
        clock.seek(2.0);
        assert!((clock.position() - 2.0).abs() < 1e-9);
        clock.play().unwrap();
        clock.seek(5.0);
        manual.advance(1.0);
        assert!((clock.position() - 6.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn stop_resets_position_to_zero() {
        let (manual, clock) = loaded_clock(10.0);
        clock.play().unwrap();
        manual.advance(3.0);
        clock.stop();
        assert_eq!(clock.state(), PlaybackState::Stopped);
        assert!((clock.position()).abs() < 1e-9);
    }

    #[tokio::test]
    async fn tick_stops_at_end_of_media() {
        let (manual, clock) = loaded_clock(2.0);
        let last = Arc::new(Mutex::new(-1.0f64));
        let seen = Arc::clone(&last);
        clock.subscribe(move |pos| *seen.lock().unwrap() = pos);

        clock.play().unwrap();
        manual.advance(5.0);
        clock.tick();

        // Final notification is clamped to the duration, then the
        // transport resets.
        assert!((*last.lock().unwrap() - 2.0).abs() < 1e-9);
        assert_eq!(clock.state(), PlaybackState::Stopped);
        assert!((clock.position()).abs() < 1e-9);
    }

    #[tokio::test]
    async fn unsubscribed_callback_is_not_notified() {
        let (manual, clock) = loaded_clock(10.0);
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let id = clock.subscribe(move |_| {
            counted.fetch_add(1, Ordering::SeqCst);
        });

        clock.play().unwrap();
        manual.advance(1.0);
        clock.tick();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(clock.unsubscribe(id));
        assert!(!clock.unsubscribe(id));
        clock.tick();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn subscriber_may_pause_from_its_callback() {
        let (manual, clock) = loaded_clock(10.0);
        let inner = Arc::clone(&clock);
        clock.subscribe(move |_| inner.pause());

        clock.play().unwrap();
        manual.advance(1.0);
        clock.tick();
        assert_eq!(clock.state(), PlaybackState::Paused);
        assert!((clock.position() - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn broadcast_loop_delivers_positions() {
        tokio::time::pause();
        let (manual, clock) = loaded_clock(10.0);
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        clock.subscribe(move |_| {
            counted.fetch_add(1, Ordering::SeqCst);
        });

        clock.play().unwrap();
        manual.advance(0.1);
        for _ in 0..5 {
            tokio::time::advance(clock.config.tick_interval()).await;
            tokio::task::yield_now().await;
        }
        assert!(calls.load(Ordering::SeqCst) >= 1);
        clock.stop();
    }
}
