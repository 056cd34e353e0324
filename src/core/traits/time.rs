//! Host time source
//!
//! `MonotonicTime` measures from its creation using `tokio::time::Instant`,
//! which is monotonic and follows tokio's paused clock in tests.

use pico_trail_gcs_core::traits::TimeSource;
use tokio::time::Instant;

/// Monotonic time source backed by `tokio::time::Instant`
#[derive(Debug, Clone, Copy)]
pub struct MonotonicTime {
    origin: Instant,
}

impl MonotonicTime {
    /// Start a new time source; `now_us()` reads 0 at this instant
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicTime {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn now_us(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn follows_paused_clock() {
        let time = MonotonicTime::new();
        assert_eq!(time.now_us(), 0);

        tokio::time::advance(Duration::from_millis(1500)).await;
        assert_eq!(time.now_ms(), 1500);
        assert_eq!(time.elapsed_since(500_000), 1_000_000);
    }
}
