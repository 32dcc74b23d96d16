//! Rate-Limit Cooldown
//!
//! A single deadline shared by every symbol of a provider. While it is in
//! the future no request is issued for any symbol.

use std::time::Duration;

use tokio::time::Instant;

/// Wait applied when a 429 carries no usable `Retry-After`.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Cooldown deadline. Only ever moves forward.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cooldown {
    until: Option<Instant>,
}

impl Cooldown {
    /// Get the time left before requests may resume, if any.
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.until
            .filter(|until| *until > now)
            .map(|until| until - now)
    }

    /// Extend the deadline to at least `now + wait`.
    ///
    /// Returns the effective deadline.
    pub fn extend(&mut self, now: Instant, wait: Duration) -> Instant {
        let candidate = now + wait;
        let until = self.until.map_or(candidate, |current| current.max(candidate));
        self.until = Some(until);
        until
    }
}

/// Parse a `Retry-After` header value in (possibly fractional) seconds.
///
/// Missing, unparsable, negative and non-finite values yield
/// `DEFAULT_RETRY_AFTER`.
#[must_use]
pub fn parse_retry_after(header: Option<&str>) -> Duration {
    header
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .unwrap_or(DEFAULT_RETRY_AFTER)
}
