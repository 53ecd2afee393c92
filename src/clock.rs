//! Wall-clock access behind a trait.
//!
//! The scheduler reads "now" and sleeps only through [`Clock`], so session
//! timing can be driven deterministically in tests with [`ManualClock`].

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Local};

/// Source of the current time and of suspension.
pub trait Clock: Send + Sync {
    /// Current local time.
    fn now(&self) -> DateTime<Local>;

    /// Suspend for `duration`.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// The real clock, backed by `chrono::Local` and `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

fn to_delta(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or_else(|_| chrono::Duration::zero())
}

#[derive(Debug)]
struct ManualState {
    now: DateTime<Local>,
    sleeps: Vec<Duration>,
}

/// A clock that never blocks.
///
/// `sleep` returns immediately after advancing the clock's "now" by the
/// requested duration and recording it. Clones share the same state.
#[derive(Debug, Clone)]
pub struct ManualClock {
    state: Arc<Mutex<ManualState>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Local>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ManualState {
                now: start,
                sleeps: Vec::new(),
            })),
        }
    }

    /// Move "now" forward without recording a sleep.
    pub fn advance(&self, by: Duration) {
        let mut state = self.lock();
        state.now += to_delta(by);
    }

    /// Every duration passed to `sleep`, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock().sleeps.clone()
    }

    /// Sum of all recorded sleeps.
    pub fn total_slept(&self) -> Duration {
        self.lock().sleeps.iter().sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        // A poisoned lock only means a test panicked mid-update; the state
        // itself is still usable.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Local::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        self.lock().now
    }

    async fn sleep(&self, duration: Duration) {
        let mut state = self.lock();
        state.sleeps.push(duration);
        state.now += to_delta(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manual_clock_records_and_advances() {
        let start = Local::now();
        let clock = ManualClock::new(start);
        clock.sleep(Duration::from_secs(30)).await;
        clock.sleep(Duration::from_millis(500)).await;

        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(30), Duration::from_millis(500)]
        );
        assert_eq!(clock.total_slept(), Duration::from_millis(30_500));
        assert_eq!(
            clock.now() - start,
            chrono::Duration::milliseconds(30_500)
        );
    }

    #[test]
    fn advance_does_not_record_sleep() {
        let start = Local::now();
        let clock = ManualClock::new(start);
        clock.advance(Duration::from_secs(60));
        assert!(clock.sleeps().is_empty());
        assert_eq!(clock.now() - start, chrono::Duration::minutes(1));
    }

    #[test]
    fn clones_share_state() {
        let clock = ManualClock::default();
        let other = clock.clone();
        other.advance(Duration::from_secs(5));
        assert_eq!(clock.now(), other.now());
    }
}
