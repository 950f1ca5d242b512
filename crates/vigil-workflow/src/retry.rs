use std::time::Duration;

use vigil_config::RetryBackoff;

/// How often, and how far apart, a failed step is re-invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Additional attempts after the first.
  pub max_retries: u32,
  pub delay: Duration,
  pub backoff: RetryBackoff,
  /// Upper bound on any single delay.
  pub max_delay: Option<Duration>,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_retries: 2,
      delay: Duration::from_secs(5 * 60),
      backoff: RetryBackoff::Constant,
      max_delay: None,
    }
  }
}

impl RetryPolicy {
  /// Run once, never retry.
  pub fn none() -> Self {
    Self {
      max_retries: 0,
      delay: Duration::ZERO,
      ..Self::default()
    }
  }

  pub fn new(max_retries: u32, delay: Duration, backoff: RetryBackoff) -> Self {
    Self {
      max_retries,
      delay,
      backoff,
      max_delay: None,
    }
  }

  pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
    self.max_delay = Some(max_delay);
    self
  }

  /// Total invocations allowed, including the first.
  pub fn max_attempts(&self) -> u32 {
    self.max_retries.saturating_add(1)
  }

  /// Delay before the `retry`-th retry (1-based).
  pub fn delay_for(&self, retry: u32) -> Duration {
    let retry = retry.max(1);
    let delay = match self.backoff {
      RetryBackoff::Constant => self.delay,
      RetryBackoff::Linear => self.delay.saturating_mul(retry),
      RetryBackoff::Exponential => {
        let factor = 2u32.checked_pow(retry - 1).unwrap_or(u32::MAX);
        self.delay.saturating_mul(factor)
      }
    };
    match self.max_delay {
      Some(cap) => delay.min(cap),
      None => delay,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_policy() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_attempts(), 3);
    assert_eq!(policy.delay_for(1), Duration::from_secs(300));
    assert_eq!(policy.delay_for(2), Duration::from_secs(300));
  }

  #[test]
  fn test_backoff_strategies() {
    let base = Duration::from_millis(100);

    let linear = RetryPolicy::new(5, base, RetryBackoff::Linear);
    assert_eq!(linear.delay_for(1), Duration::from_millis(100));
    assert_eq!(linear.delay_for(3), Duration::from_millis(300));

    let exponential = RetryPolicy::new(5, base, RetryBackoff::Exponential);
    assert_eq!(exponential.delay_for(1), Duration::from_millis(100));
    assert_eq!(exponential.delay_for(2), Duration::from_millis(200));
    assert_eq!(exponential.delay_for(4), Duration::from_millis(800));
  }

  #[test]
  fn test_max_delay_caps_growth() {
    let policy = RetryPolicy::new(10, Duration::from_secs(1), RetryBackoff::Exponential)
      .with_max_delay(Duration::from_secs(5));
    assert_eq!(policy.delay_for(3), Duration::from_secs(4));
    assert_eq!(policy.delay_for(4), Duration::from_secs(5));
    assert_eq!(policy.delay_for(64), Duration::from_secs(5));
  }
}
