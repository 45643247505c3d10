use std::time::Duration;

/// Shared retry/backoff shape for HTTP-backed providers (`spec.md` §4.D).
/// `aigw-provider-impl`'s OpenAI-compatible client is the only current user;
/// kept here so the backoff formula has one definition.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

impl RetryPolicy {
    /// `backoff(attempt) = min(2s, 0.2 * 2^attempt)`, `attempt` 0-based.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let secs = 0.2_f64 * 2f64.powi(attempt as i32);
        Duration::from_secs_f64(secs.min(2.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_caps_at_two_seconds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_secs_f64(0.2));
        assert_eq!(policy.backoff(1), Duration::from_secs_f64(0.4));
        assert_eq!(policy.backoff(10), Duration::from_secs_f64(2.0));
    }
}
