//! Admission control for the live path
//!
//! A fixed one-second window with an atomic counter gates low-value traffic
//! before it reaches the ring buffer. Warnings and above can be exempted.
//!
//! # Example
//!
//! ```
//! use diag_log_store::{LogLevel, RateLimiter};
//!
//! let limiter = RateLimiter::new(2, true);
//!
//! assert!(!limiter.should_drop(LogLevel::Info));
//! assert!(!limiter.should_drop(LogLevel::Info));
//! assert!(limiter.should_drop(LogLevel::Info));
//!
//! // Severe entries bypass the exhausted window
//! assert!(!limiter.should_drop(LogLevel::Warning));
//! ```

use super::log_level::LogLevel;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Width of one admission window
pub const RATE_WINDOW: Duration = Duration::from_millis(1000);

/// Fixed-window rate limiter
///
/// # Thread Safety
///
/// The hot path is a single atomic increment. The only lock is taken at a
/// window boundary, and the reset it guards is idempotent, so callers racing
/// on the same boundary at most reset the window twice.
pub struct RateLimiter {
    max_per_window: u32,
    bypass_severe: bool,
    window: Duration,
    /// Reference point for `window_start_nanos`
    origin: Instant,
    /// Start of the current window, in nanoseconds since `origin`
    window_start_nanos: AtomicU64,
    window_count: AtomicU32,
    reset_lock: Mutex<()>,
}

impl RateLimiter {
    /// `max_per_second == 0` disables the limiter.
    pub fn new(max_per_second: u32, bypass_severe: bool) -> Self {
        Self::with_window(max_per_second, bypass_severe, RATE_WINDOW)
    }

    /// Same limiter with a custom window width.
    pub fn with_window(max_per_window: u32, bypass_severe: bool, window: Duration) -> Self {
        Self {
            max_per_window,
            bypass_severe,
            window,
            origin: Instant::now(),
            window_start_nanos: AtomicU64::new(0),
            window_count: AtomicU32::new(0),
            reset_lock: Mutex::new(()),
        }
    }

    /// Decide whether an entry at `level` must be rejected.
    pub fn should_drop(&self, level: LogLevel) -> bool {
        if self.max_per_window == 0 {
            return false;
        }
        if self.bypass_severe && level.is_severe() {
            return false;
        }

        let now = self.now_nanos();
        if self.window_elapsed(now) {
            let _guard = self.reset_lock.lock();
            // Another caller may have reset while we waited
            if self.window_elapsed(now) {
                self.window_start_nanos.store(now, Ordering::Release);
                self.window_count.store(0, Ordering::Release);
            }
        }

        let count = self.window_count.fetch_add(1, Ordering::AcqRel).saturating_add(1);
        count > self.max_per_window
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.max_per_window > 0
    }

    pub fn max_per_window(&self) -> u32 {
        self.max_per_window
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Calls counted in the current window, including rejected ones.
    pub fn current_count(&self) -> u32 {
        self.window_count.load(Ordering::Acquire)
    }

    fn window_elapsed(&self, now: u64) -> bool {
        let start = self.window_start_nanos.load(Ordering::Acquire);
        now.saturating_sub(start) >= self.window.as_nanos() as u64
    }

    fn now_nanos(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("max_per_window", &self.max_per_window)
            .field("bypass_severe", &self.bypass_severe)
            .field("window", &self.window)
            .field("current_count", &self.current_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_disabled_admits_everything() {
        let limiter = RateLimiter::new(0, false);
        for _ in 0..10_000 {
            assert!(!limiter.should_drop(LogLevel::Trace));
        }
        assert!(!limiter.is_enabled());
    }

    #[test]
    fn test_window_budget() {
        let limiter = RateLimiter::with_window(2, true, Duration::from_secs(60));
        assert!(!limiter.should_drop(LogLevel::Info));
        assert!(!limiter.should_drop(LogLevel::Info));
        assert!(limiter.should_drop(LogLevel::Info));
        assert!(!limiter.should_drop(LogLevel::Warning));
        assert!(!limiter.should_drop(LogLevel::Critical));
    }

    #[test]
    fn test_no_bypass_counts_severe_entries() {
        let limiter = RateLimiter::with_window(1, false, Duration::from_secs(60));
        assert!(!limiter.should_drop(LogLevel::Error));
        assert!(limiter.should_drop(LogLevel::Error));
    }

    #[test]
    fn test_window_resets_after_elapsing() {
        let limiter = RateLimiter::with_window(1, false, Duration::from_millis(50));
        assert!(!limiter.should_drop(LogLevel::Info));
        assert!(limiter.should_drop(LogLevel::Info));

        thread::sleep(Duration::from_millis(80));

        assert!(!limiter.should_drop(LogLevel::Info));
        assert!(limiter.should_drop(LogLevel::Info));
    }

    #[test]
    fn test_concurrent_callers_respect_budget() {
        let limiter = Arc::new(RateLimiter::with_window(100, false, Duration::from_secs(60)));
        let admitted = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                let admitted = Arc::clone(&admitted);
                thread::spawn(move || {
                    for _ in 0..100 {
                        if !limiter.should_drop(LogLevel::Debug) {
                            admitted.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(admitted.load(Ordering::Relaxed), 100);
    }
}
