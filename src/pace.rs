//! Pacing between requests and human-like interaction sequences.
//!
//! The pacer owns no state beyond its configured window and RNG; it is safe
//! to share across concurrent runs. Every sleep races the run's cancellation
//! token so a cancelled run never blocks on a pending delay.

use crate::config::PaceRange;
use crate::error::FetchError;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Something that can receive cursor and scroll gestures, in practice a
/// live browser page. Gesture failures are swallowed by the caller; the
/// sequence exists only to lower the bot-detection signal.
#[async_trait]
pub trait InteractionSurface: Send + Sync {
    async fn move_cursor(&self, x: i64, y: i64) -> Result<(), FetchError>;
    async fn scroll_by(&self, dy: i64) -> Result<(), FetchError>;
}

/// Randomized, cancellable delay source.
pub struct Pacer {
    range: PaceRange,
    rng: Mutex<StdRng>,
}

impl Pacer {
    pub fn new(range: PaceRange) -> Self {
        Self {
            range,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_seed(range: PaceRange, seed: u64) -> Self {
        Self {
            range,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn draw_ms(&self, lo: u64, hi: u64) -> u64 {
        let mut rng = self.rng.lock().expect("pacer rng poisoned");
        if lo >= hi {
            lo
        } else {
            rng.gen_range(lo..=hi)
        }
    }

    fn draw_delay(&self) -> Duration {
        Duration::from_millis(self.draw_ms(
            self.range.min.as_millis() as u64,
            self.range.max.as_millis() as u64,
        ))
    }

    /// Sleep a duration drawn from the configured window, aborting promptly
    /// with [`FetchError::Cancelled`] if the token fires first.
    pub async fn pause(&self, cancel: &CancellationToken) -> Result<(), FetchError> {
        self.pause_scaled(1.0, cancel).await
    }

    /// `pause` with the drawn delay multiplied by `factor`, used to back
    /// off harder between attempts after a `Blocked` failure.
    pub async fn pause_scaled(
        &self,
        factor: f64,
        cancel: &CancellationToken,
    ) -> Result<(), FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        let delay = self.draw_delay().mul_f64(factor.max(0.0));
        if delay.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }

    /// Perform a bounded random sequence of cursor movements and scrolls on
    /// `surface`. Every step is independently allowed to fail; nothing here
    /// ever escalates. Returns early (still silently) on cancellation.
    pub async fn simulate_interaction(
        &self,
        surface: &dyn InteractionSurface,
        cancel: &CancellationToken,
    ) {
        let _ = surface.move_cursor(10, 10).await;

        let jitters = self.draw_ms(2, 4);
        for _ in 0..jitters {
            let x = self.draw_ms(0, 100) as i64 - 50;
            let y = self.draw_ms(0, 100) as i64 - 50;
            let _ = surface.move_cursor(x, y).await;
            if self.step_pause(500, 1500, cancel).await.is_err() {
                return;
            }
        }

        let scrolls = self.draw_ms(3, 5);
        for _ in 0..scrolls {
            let down = self.draw_ms(0, 1) == 1;
            let dy = if down { 600 } else { -600 };
            let _ = surface.scroll_by(dy).await;
            if self.step_pause(500, 2000, cancel).await.is_err() {
                return;
            }
        }
    }

    /// Short fixed-window sleep between interaction steps. Collapses to
    /// nothing when the pacer's own window is zero, so tests stay fast.
    async fn step_pause(
        &self,
        lo: u64,
        hi: u64,
        cancel: &CancellationToken,
    ) -> Result<(), FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        if self.range.max.is_zero() {
            return Ok(());
        }
        let delay = Duration::from_millis(self.draw_ms(lo, hi));
        tokio::select! {
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSurface {
        moves: AtomicUsize,
        scrolls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl InteractionSurface for CountingSurface {
        async fn move_cursor(&self, _x: i64, _y: i64) -> Result<(), FetchError> {
            self.moves.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(FetchError::Network("gesture lost".to_string()))
            } else {
                Ok(())
            }
        }

        async fn scroll_by(&self, _dy: i64) -> Result<(), FetchError> {
            self.scrolls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(FetchError::Network("gesture lost".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn pause_returns_cancelled_when_token_already_fired() {
        let pacer = Pacer::with_seed(PaceRange::secs(30, 60), 1);
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(pacer.pause(&cancel).await, Err(FetchError::Cancelled));
    }

    #[tokio::test]
    async fn pause_aborts_promptly_on_cancellation() {
        let pacer = Pacer::with_seed(PaceRange::secs(30, 60), 1);
        let cancel = CancellationToken::new();
        let child = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            child.cancel();
        });
        let started = std::time::Instant::now();
        assert_eq!(pacer.pause(&cancel).await, Err(FetchError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn zero_window_pause_does_not_sleep() {
        let pacer = Pacer::with_seed(PaceRange::zero(), 1);
        let cancel = CancellationToken::new();
        assert_eq!(pacer.pause(&cancel).await, Ok(()));
    }

    #[tokio::test]
    async fn interaction_runs_bounded_sequence() {
        let pacer = Pacer::with_seed(PaceRange::zero(), 9);
        let surface = CountingSurface {
            moves: AtomicUsize::new(0),
            scrolls: AtomicUsize::new(0),
            fail: false,
        };
        let cancel = CancellationToken::new();
        pacer.simulate_interaction(&surface, &cancel).await;
        // Initial move + 2..=4 jitters, then 3..=5 scrolls.
        let moves = surface.moves.load(Ordering::SeqCst);
        let scrolls = surface.scrolls.load(Ordering::SeqCst);
        assert!((3..=5).contains(&moves), "moves = {moves}");
        assert!((3..=5).contains(&scrolls), "scrolls = {scrolls}");
    }

    #[tokio::test]
    async fn interaction_swallows_gesture_failures() {
        let pacer = Pacer::with_seed(PaceRange::zero(), 9);
        let surface = CountingSurface {
            moves: AtomicUsize::new(0),
            scrolls: AtomicUsize::new(0),
            fail: true,
        };
        let cancel = CancellationToken::new();
        // Must not panic or return an error.
        pacer.simulate_interaction(&surface, &cancel).await;
        assert!(surface.moves.load(Ordering::SeqCst) > 0);
    }
}
