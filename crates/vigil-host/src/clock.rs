//! Time capability.
//!
//! Retry delays and every "within the last N hours" or "older than N days"
//! window read time through a [`Clock`], never from the system directly.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};

#[async_trait]
pub trait Clock: Send + Sync {
  /// Current instant.
  fn now(&self) -> DateTime<Utc>;

  /// Suspend the caller for `duration`.
  async fn sleep(&self, duration: Duration);
}

/// Wall-clock time backed by tokio timers.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }

  async fn sleep(&self, duration: Duration) {
    tokio::time::sleep(duration).await;
  }
}

/// A clock that only moves when told to.
///
/// `sleep` returns immediately after advancing the clock by the requested
/// duration, and records the request so tests can assert on retry delays.
#[derive(Debug)]
pub struct ManualClock {
  now: Mutex<DateTime<Utc>>,
  sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
  pub fn new(start: DateTime<Utc>) -> Self {
    Self {
      now: Mutex::new(start),
      sleeps: Mutex::new(Vec::new()),
    }
  }

  /// Move the clock forward.
  pub fn advance(&self, duration: Duration) {
    let Ok(delta) = TimeDelta::from_std(duration) else {
      return;
    };
    let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(next) = now.checked_add_signed(delta) {
      *now = next;
    }
  }

  /// Jump to an absolute instant.
  pub fn set(&self, instant: DateTime<Utc>) {
    *self.now.lock().unwrap_or_else(|e| e.into_inner()) = instant;
  }

  /// Every duration passed to `sleep`, in call order.
  pub fn sleeps(&self) -> Vec<Duration> {
    self
      .sleeps
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .clone()
  }
}

#[async_trait]
impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    *self.now.lock().unwrap_or_else(|e| e.into_inner())
  }

  async fn sleep(&self, duration: Duration) {
    self
      .sleeps
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .push(duration);
    self.advance(duration);
    tokio::task::yield_now().await;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  #[tokio::test]
  async fn test_manual_clock_sleep_advances_and_records() {
    let start = Utc.with_ymd_and_hms(2025, 11, 19, 3, 0, 0).unwrap();
    let clock = ManualClock::new(start);

    clock.sleep(Duration::from_secs(300)).await;
    clock.sleep(Duration::from_secs(600)).await;

    assert_eq!(
      clock.now(),
      Utc.with_ymd_and_hms(2025, 11, 19, 3, 15, 0).unwrap()
    );
    assert_eq!(
      clock.sleeps(),
      vec![Duration::from_secs(300), Duration::from_secs(600)]
    );
  }

  #[test]
  fn test_manual_clock_set() {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    let later = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
    clock.set(later);
    assert_eq!(clock.now(), later);
  }
}
