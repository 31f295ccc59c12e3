//! The shared backoff/deadline utility for blocking acquisition loops.
//!
//! Both allocators use this identically: sweep, check the deadline, dump
//! status, sleep, sweep again. Centralizing it keeps the retry behavior of
//! single and range acquisition in lockstep.

use std::time::{Duration, Instant};

/// Retry behavior for a blocking acquire.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Sleep between acquisition sweeps.
    pub interval: Duration,

    /// Global deadline measured from the first attempt. `None` means
    /// non-blocking: fail after a single sweep.
    pub deadline: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            deadline: Some(Duration::from_secs(3600)),
        }
    }
}

impl RetryPolicy {
    /// A blocking policy with the given backoff interval and deadline.
    pub fn new(interval: Duration, deadline: Duration) -> Self {
        Self {
            interval,
            deadline: Some(deadline),
        }
    }

    /// A non-blocking policy: one sweep, then fail.
    pub fn no_wait() -> Self {
        Self {
            interval: Duration::ZERO,
            deadline: None,
        }
    }

    /// Begin a schedule; the deadline clock starts now.
    pub fn start(&self) -> RetrySchedule {
        RetrySchedule {
            interval: self.interval,
            deadline: self.deadline.map(|d| Instant::now() + d),
        }
    }
}

/// A started retry clock for one acquisition attempt.
#[derive(Debug)]
pub struct RetrySchedule {
    interval: Duration,
    deadline: Option<Instant>,
}

impl RetrySchedule {
    /// Whether the caller should give up instead of sweeping again.
    pub fn expired(&self) -> bool {
        match self.deadline {
            None => true,
            Some(deadline) => Instant::now() >= deadline,
        }
    }

    /// Sleep one backoff interval.
    pub fn pause(&self) {
        std::thread::sleep(self.interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_minute_scale() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(60));
        assert_eq!(policy.deadline, Some(Duration::from_secs(3600)));
    }

    #[test]
    fn no_wait_expires_immediately() {
        let schedule = RetryPolicy::no_wait().start();
        assert!(schedule.expired());
    }

    #[test]
    fn blocking_schedule_expires_at_deadline() {
        let policy = RetryPolicy::new(Duration::from_millis(1), Duration::from_millis(30));
        let schedule = policy.start();
        assert!(!schedule.expired());
        std::thread::sleep(Duration::from_millis(40));
        assert!(schedule.expired());
    }
}
