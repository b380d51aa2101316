use std::time::{Duration, Instant};

/// Enforces the minimum delay between receiving a continuation token and using it
///
/// The places API rejects a `pagetoken` presented too soon after it was issued,
/// so every pager arms the gate when a token arrives and waits on it before the
/// next request.
#[derive(Debug, Clone)]
pub struct TokenGate {
    /// Minimum age a token must reach before reuse
    min_delay: Duration,

    /// When the pending token was received
    issued_at: Option<Instant>,

    /// Number of tokens received over the gate's lifetime
    tokens_issued: u32,
}

impl TokenGate {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            issued_at: None,
            tokens_issued: 0,
        }
    }

    /// Records that a token was received at `now`
    pub fn arm(&mut self, now: Instant) {
        self.issued_at = Some(now);
        self.tokens_issued += 1;
    }

    /// Forgets the pending token (after it was used)
    pub fn disarm(&mut self) {
        self.issued_at = None;
    }

    /// Checks if a token may be used at `now`
    pub fn is_ready(&self, now: Instant) -> bool {
        self.time_until_ready(now).is_none()
    }

    /// Calculates how long to wait before the pending token may be used
    ///
    /// Returns None if it may be used now (or no token is pending).
    pub fn time_until_ready(&self, now: Instant) -> Option<Duration> {
        let issued = self.issued_at?;
        let elapsed = now.saturating_duration_since(issued);
        if elapsed < self.min_delay {
            Some(self.min_delay - elapsed)
        } else {
            None
        }
    }

    /// Sleeps until the pending token may be used
    pub async fn wait_ready(&self) {
        if let Some(remaining) = self.time_until_ready(Instant::now()) {
            tracing::trace!("Waiting {:?} before reusing continuation token", remaining);
            tokio::time::sleep(remaining).await;
        }
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    pub fn tokens_issued(&self) -> u32 {
        self.tokens_issued
    }
}
