//! Pause applied between failed accepts.

use std::time::Duration;

const MIN_DELAY: Duration = Duration::from_millis(1);

/// Exponential back-off for listener `accept()` failures.
///
/// The first retry waits `initial_delay`; each further consecutive failure
/// doubles the wait up to `max_delay`. A successful accept resets the delay.
///
/// Defaults to 10 milliseconds doubling up to 1 second.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackoffConfig {
    /// Wait after the first failure.
    pub initial_delay: Duration,
    /// Upper bound on the wait.
    pub max_delay: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(1),
        }
    }
}

impl BackoffConfig {
    /// Raise both delays to at least one millisecond and order them.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use numwire::server::BackoffConfig;
    ///
    /// let backoff = BackoffConfig {
    ///     initial_delay: Duration::from_millis(50),
    ///     max_delay: Duration::ZERO,
    /// }
    /// .normalized();
    /// assert_eq!(backoff.initial_delay, Duration::from_millis(1));
    /// assert_eq!(backoff.max_delay, Duration::from_millis(50));
    /// ```
    #[must_use]
    pub fn normalized(self) -> Self {
        let a = self.initial_delay.max(MIN_DELAY);
        let b = self.max_delay.max(MIN_DELAY);
        Self {
            initial_delay: a.min(b),
            max_delay: a.max(b),
        }
    }

    /// Delay to use after another failure following a wait of `delay`.
    #[must_use]
    pub fn next_delay(&self, delay: Duration) -> Duration {
        delay.saturating_mul(2).min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(10, 20)]
    #[case(600, 1000)]
    #[case(1000, 1000)]
    fn delay_doubles_up_to_the_cap(#[case] current_ms: u64, #[case] expected_ms: u64) {
        let backoff = BackoffConfig::default();
        assert_eq!(
            backoff.next_delay(Duration::from_millis(current_ms)),
            Duration::from_millis(expected_ms)
        );
    }

    #[test]
    fn normalized_keeps_valid_config() {
        let backoff = BackoffConfig::default();
        assert_eq!(backoff.normalized(), backoff);
    }

    #[test]
    fn normalized_lifts_zero_delays() {
        let backoff = BackoffConfig {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
        .normalized();
        assert_eq!(backoff.initial_delay, MIN_DELAY);
        assert_eq!(backoff.max_delay, MIN_DELAY);
    }
}
