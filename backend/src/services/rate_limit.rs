//! Sliding-window rate limiting for auth endpoints

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::RateLimitConfig;

/// Rate-limited action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitedAction {
    Login,
    Register,
}

impl RateLimitedAction {
    fn as_str(&self) -> &'static str {
        match self {
            RateLimitedAction::Login => "login",
            RateLimitedAction::Register => "register",
        }
    }
}

/// Expired clients are dropped at most this often
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Default)]
struct AttemptLog {
    by_client: HashMap<(String, RateLimitedAction), Vec<Instant>>,
    last_sweep: Option<Instant>,
}

/// In-process attempt counter keyed by client and action
pub struct RateLimiter {
    limits: HashMap<RateLimitedAction, (usize, Duration)>,
    attempts: Mutex<AttemptLog>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let mut limits = HashMap::new();
        limits.insert(
            RateLimitedAction::Login,
            (
                config.login_attempts,
                Duration::from_secs(config.login_window_minutes * 60),
            ),
        );
        limits.insert(
            RateLimitedAction::Register,
            (
                config.register_attempts,
                Duration::from_secs(config.register_window_minutes * 60),
            ),
        );

        Self {
            limits,
            attempts: Mutex::new(AttemptLog::default()),
        }
    }

    /// Record an attempt; returns false when the client is over its limit
    pub fn check(&self, client: &str, action: RateLimitedAction) -> bool {
        self.check_at(client, action, Instant::now())
    }

    fn check_at(&self, client: &str, action: RateLimitedAction, now: Instant) -> bool {
        let Some(&(max_attempts, window)) = self.limits.get(&action) else {
            return true;
        };

        let mut log = self.lock();
        let due = log
            .last_sweep
            .map_or(true, |last| now.saturating_duration_since(last) >= SWEEP_INTERVAL);
        if due {
            self.sweep(&mut log, now);
        }

        let entry = log.by_client.entry((client.to_string(), action)).or_default();
        entry.retain(|t| now.saturating_duration_since(*t) < window);

        if entry.len() >= max_attempts {
            tracing::warn!(client, action = action.as_str(), "Rate limit exceeded");
            return false;
        }

        entry.push(now);
        true
    }

    /// Forget clients with no attempts left inside their window
    fn sweep(&self, log: &mut AttemptLog, now: Instant) {
        let before = log.by_client.len();
        log.by_client.retain(|(_, action), times| {
            let window = self.limits.get(action).map_or(Duration::ZERO, |&(_, w)| w);
            times.retain(|t| now.saturating_duration_since(*t) < window);
            !times.is_empty()
        });
        log.last_sweep = Some(now);

        let dropped = before - log.by_client.len();
        if dropped > 0 {
            tracing::debug!(dropped, remaining = log.by_client.len(), "Pruned expired rate-limit entries");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AttemptLog> {
        match self.attempts.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            login_attempts: 5,
            login_window_minutes: 15,
            register_attempts: 3,
            register_window_minutes: 60,
        })
    }

    #[test]
    fn test_register_allows_three_attempts() {
        let limiter = limiter();
        let now = Instant::now();
        for _ in 0..3 {
            assert!(limiter.check_at("10.0.0.1", RateLimitedAction::Register, now));
        }
        assert!(!limiter.check_at("10.0.0.1", RateLimitedAction::Register, now));
        // Other clients and actions are counted separately
        assert!(limiter.check_at("10.0.0.2", RateLimitedAction::Register, now));
        assert!(limiter.check_at("10.0.0.1", RateLimitedAction::Login, now));
    }

    #[test]
    fn test_window_expires() {
        let limiter = limiter();
        let start = Instant::now();
        for _ in 0..5 {
            assert!(limiter.check_at("c", RateLimitedAction::Login, start));
        }
        assert!(!limiter.check_at("c", RateLimitedAction::Login, start));

        let later = start + Duration::from_secs(15 * 60 + 1);
        assert!(limiter.check_at("c", RateLimitedAction::Login, later));
    }

    #[test]
    fn test_expired_clients_are_pruned() {
        let limiter = limiter();
        let start = Instant::now();
        for i in 0..10_000 {
            limiter.check_at(&format!("198.51.100.{}", i), RateLimitedAction::Login, start);
        }
        limiter.check_at("192.0.2.1", RateLimitedAction::Register, start);
        assert_eq!(limiter.lock().by_client.len(), 10_001);

        let next_day = start + Duration::from_secs(24 * 60 * 60);
        assert!(limiter.check_at("192.0.2.7", RateLimitedAction::Login, next_day));
        assert_eq!(limiter.lock().by_client.len(), 1);
    }

    #[test]
    fn test_sweep_keeps_clients_inside_their_window() {
        let limiter = limiter();
        let start = Instant::now();
        limiter.check_at("a", RateLimitedAction::Login, start);
        limiter.check_at("b", RateLimitedAction::Register, start);

        // Past the 15 minute login window, inside the 60 minute register window
        let later = start + Duration::from_secs(20 * 60);
        limiter.check_at("c", RateLimitedAction::Login, later);

        let log = limiter.lock();
        assert!(!log.by_client.contains_key(&("a".to_string(), RateLimitedAction::Login)));
        assert!(log.by_client.contains_key(&("b".to_string(), RateLimitedAction::Register)));
        assert_eq!(log.by_client.len(), 2);
    }
}
