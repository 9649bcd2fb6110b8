use std::time::Duration;

/// Exponential retry delay for failing workers.
///
/// The first retry waits `first`, every consecutive failure multiplies the previous delay
/// by `factor`, and the result never exceeds `max`. Callers reset the sequence by passing
/// `None` again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub first: Duration,
    pub max: Duration,
    pub factor: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            first: Duration::from_millis(100),
            max: Duration::from_secs(3),
            factor: 2,
        }
    }
}

impl BackoffPolicy {
    /// Delay to apply after a failure, given the delay used for the previous one.
    pub fn next(&self, prev: Option<Duration>) -> Duration {
        match prev {
            None => self.first,
            Some(d) if d.is_zero() => self.first,
            Some(d) => d.saturating_mul(self.factor).min(self.max),
        }
    }
}
