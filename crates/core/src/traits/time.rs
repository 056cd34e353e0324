//! Monotonic time abstraction for timeout handling.
//!
//! The parameter protocol detects loss purely by timeout, so every deadline
//! is measured against a `TimeSource`. Implementations must be monotonic:
//! wall-clock adjustments must never move a deadline.

use core::sync::atomic::{AtomicU64, Ordering};

/// Platform-agnostic monotonic time source.
///
/// - `MonotonicTime` (in the host crate) wraps `tokio::time::Instant`
/// - `MockTime` gives tests full control over time progression
///
/// # Example
///
/// ```
/// use pico_trail_gcs_core::traits::{MockTime, TimeSource};
///
/// fn timed_out<T: TimeSource>(time: &T, last_activity_us: u64, timeout_ms: u64) -> bool {
///     time.elapsed_since(last_activity_us) >= timeout_ms * 1000
/// }
///
/// let time = MockTime::new();
/// assert!(!timed_out(&time, 0, 1000));
/// time.advance(1_000_000);
/// assert!(timed_out(&time, 0, 1000));
/// ```
pub trait TimeSource: Clone + Send + Sync {
    /// Returns current time in milliseconds since the source was created.
    fn now_ms(&self) -> u64;

    /// Returns current time in microseconds since the source was created.
    fn now_us(&self) -> u64;

    /// Returns elapsed time in microseconds since a reference point.
    ///
    /// Uses saturating subtraction so a reference in the future reads as 0.
    fn elapsed_since(&self, reference_us: u64) -> u64 {
        self.now_us().saturating_sub(reference_us)
    }
}

impl<T: TimeSource> TimeSource for &T {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }

    fn now_us(&self) -> u64 {
        (**self).now_us()
    }
}

/// Mock time source with manual advancement.
///
/// Clones do not share state. Hand a `&MockTime` to the code under test to
/// keep control of the clock from the test body.
#[derive(Debug, Default)]
pub struct MockTime {
    current_us: AtomicU64,
}

impl Clone for MockTime {
    fn clone(&self) -> Self {
        Self::with_initial(self.now_us())
    }
}

impl MockTime {
    /// Creates a new `MockTime` starting at time 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new `MockTime` starting at the specified time.
    pub fn with_initial(us: u64) -> Self {
        Self {
            current_us: AtomicU64::new(us),
        }
    }

    /// Sets the current time to an absolute value.
    pub fn set(&self, us: u64) {
        self.current_us.store(us, Ordering::SeqCst);
    }

    /// Advances the current time by the specified amount of microseconds.
    pub fn advance(&self, us: u64) {
        self.current_us.fetch_add(us, Ordering::SeqCst);
    }

    /// Advances the current time by the specified amount of milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.advance(ms * 1000);
    }
}

impl TimeSource for MockTime {
    fn now_ms(&self) -> u64 {
        self.now_us() / 1000
    }

    fn now_us(&self) -> u64 {
        self.current_us.load(Ordering::SeqCst)
    }
}
