use std::time::Duration;

/// Tunables for reconnection and round-robin backoff. No file or environment
/// parsing is provided — the library has no on-disk state — but collecting
/// these constants in one struct keeps them overridable for tests that
/// can't afford the real backoff schedule.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Initial reconnect/no-peer backoff interval.
    pub backoff_floor: Duration,
    /// Backoff is multiplied by this factor after every failed attempt.
    pub backoff_multiplier: f64,
    /// Backoff never grows past this value.
    pub backoff_cap: Duration,
    /// A round-robin send with no live peers gives up after this many
    /// consecutive cap-length waits.
    pub round_robin_no_peer_retries: u32,
    /// Default REQ timeout used when a call site doesn't specify one.
    pub default_request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backoff_floor: Duration::from_millis(100),
            backoff_multiplier: 1.5,
            backoff_cap: Duration::from_millis(5000),
            round_robin_no_peer_retries: 3,
            default_request_timeout: Duration::from_millis(5000),
        }
    }
}

impl Config {
    pub fn next_backoff(&self, current: Duration) -> Duration {
        let scaled = current.mul_f64(self.backoff_multiplier);
        scaled.min(self.backoff_cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_caps_out() {
        let cfg = Config::default();
        let mut d = cfg.backoff_floor;
        for _ in 0..100 {
            d = cfg.next_backoff(d);
        }
        assert_eq!(d, cfg.backoff_cap);
    }
}
