use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;

use time::ext::NumericalStdDuration as _;

use super::*;

/// Per-pod exponential retry delay for failed reconciliations.
///
/// The n-th consecutive failure of a pod waits `base * 2^(n-1)`, never more
/// than `max`. A successful reconcile resets the pod's count.
#[derive(Debug)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    failures: Mutex<HashMap<PodRef, u32>>,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(1.std_seconds(), 5.std_minutes())
    }
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            failures: Mutex::default(),
        }
    }

    /// Record one more failure of `pod` and return how long to wait
    pub fn next_delay(&self, pod: &PodRef) -> Duration {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        let count = failures.entry(pod.clone()).or_default();
        *count = count.saturating_add(1);
        let exponent = count.saturating_sub(1).min(31);
        let delay = self.base.saturating_mul(1 << exponent);
        delay.min(self.max)
    }

    pub fn reset(&self, pod: &PodRef) {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        failures.remove(pod);
    }

    /// Consecutive failures currently recorded for `pod`
    pub fn failures(&self, pod: &PodRef) -> u32 {
        let failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        failures.get(pod).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn web(ordinal: u32) -> PodRef {
        PodRef::new("app", format!("web-{ordinal}"))
    }

    #[test]
    fn doubles_until_max() {
        let backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(10));

        let delays = (0..6)
            .map(|_| backoff.next_delay(&web(0)))
            .map(|delay| delay.as_secs())
            .collect::<Vec<_>>();

        assert_eq!(delays, [1, 2, 4, 8, 10, 10]);
        assert_eq!(backoff.failures(&web(0)), 6);
    }

    #[test]
    fn reset_starts_over() {
        let backoff = Backoff::new(Duration::from_millis(500), Duration::from_secs(60));
        backoff.next_delay(&web(0));
        backoff.next_delay(&web(0));

        backoff.reset(&web(0));

        assert_eq!(backoff.failures(&web(0)), 0);
        assert_eq!(backoff.next_delay(&web(0)), Duration::from_millis(500));
    }

    #[test]
    fn pods_are_independent() {
        let backoff = Backoff::default();
        backoff.next_delay(&web(0));
        backoff.next_delay(&web(0));

        assert_eq!(backoff.next_delay(&web(1)), Duration::from_secs(1));
        assert_eq!(backoff.failures(&web(0)), 2);
        assert_eq!(backoff.failures(&web(1)), 1);
    }

    #[test]
    fn many_failures_do_not_overflow() {
        let backoff = Backoff::default();

        let last = (0..100).map(|_| backoff.next_delay(&web(0))).last();

        assert_eq!(last, Some(Duration::from_secs(300)));
    }

    #[test]
    fn max_below_base() {
        let backoff = Backoff::new(Duration::from_secs(10), Duration::from_secs(1));

        assert_eq!(backoff.next_delay(&web(0)), Duration::from_secs(10));
        assert_eq!(backoff.next_delay(&web(0)), Duration::from_secs(10));
    }
}
