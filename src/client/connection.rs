//! Pure connection state and retry bookkeeping
//!
//! Nothing in here performs I/O. The lifecycle driver asks
//! [`ConnectionState::on_connect_failure`] what to do and acts on the answer.

use std::time::Duration;

/// Bookkeeping flags and counters for one client instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionState {
    /// A raw connection succeeded most recently
    pub connected: bool,
    pub connecting: bool,
    /// Shutdown requested; late results must be discarded
    pub closing: bool,
    /// Terminal for scheduling: no retry may run once set
    pub closed: bool,
    /// Reserved; only ever reset
    pub publishing: bool,
    /// Retries spent since the last successful raw connection
    pub reconnect_attempts: u32,
    /// Delay before the next retry
    pub reconnect_timeout: Duration,
}

/// Coarse lifecycle phase, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Idle,
    Connecting,
    /// Raw connection up; channel or resource assertion still pending
    Connected,
    Ready,
    RetryWait,
    FailedTerminal,
    Closed,
}

/// What to do about a failed raw connect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Shutdown already requested; drop the failure on the floor
    Discard,
    /// Attempt budget spent
    GiveUp { attempts: u32 },
    /// Schedule retry number `attempt` after `delay`
    Retry { attempt: u32, delay: Duration },
}

impl ConnectionState {
    pub fn new(base_timeout: Duration) -> Self {
        Self {
            connected: false,
            connecting: false,
            closing: false,
            closed: false,
            publishing: false,
            reconnect_attempts: 0,
            reconnect_timeout: base_timeout,
        }
    }

    /// Reset after a successful raw connection
    pub fn reset(&mut self, base_timeout: Duration) {
        self.connected = false;
        self.connecting = false;
        self.publishing = false;
        self.reconnect_attempts = 0;
        self.reconnect_timeout = base_timeout;
    }

    pub fn begin_connect(&mut self) {
        self.connecting = true;
        self.closing = false;
        self.closed = false;
    }

    pub fn is_shutting_down(&self) -> bool {
        self.closing || self.closed
    }

    /// Decide how to react to a failed raw connect, updating the counters
    ///
    /// On retry the current delay is returned and the stored delay doubles,
    /// so retry `k` waits `base * 2^(k-1)`. There is no cap beyond the
    /// attempt budget.
    pub fn on_connect_failure(&mut self, limit: u32) -> ReconnectDecision {
        if self.is_shutting_down() {
            return ReconnectDecision::Discard;
        }

        if self.reconnect_attempts >= limit {
            self.connecting = false;
            return ReconnectDecision::GiveUp {
                attempts: self.reconnect_attempts,
            };
        }

        let delay = self.reconnect_timeout;
        self.reconnect_attempts += 1;
        self.reconnect_timeout = self
            .reconnect_timeout
            .checked_mul(2)
            .unwrap_or(Duration::MAX);

        ReconnectDecision::Retry {
            attempt: self.reconnect_attempts,
            delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const BASE: Duration = Duration::from_millis(50);

    #[test]
    fn test_new_state_is_idle() {
        let state = ConnectionState::new(BASE);
        assert!(!state.connected);
        assert!(!state.connecting);
        assert!(!state.is_shutting_down());
        assert_eq!(state.reconnect_attempts, 0);
        assert_eq!(state.reconnect_timeout, BASE);
    }

    #[test]
    fn test_retry_sequence_doubles() {
        let mut state = ConnectionState::new(BASE);

        assert_eq!(
            state.on_connect_failure(3),
            ReconnectDecision::Retry {
                attempt: 1,
                delay: Duration::from_millis(50)
            }
        );
        assert_eq!(
            state.on_connect_failure(3),
            ReconnectDecision::Retry {
                attempt: 2,
                delay: Duration::from_millis(100)
            }
        );
        assert_eq!(
            state.on_connect_failure(3),
            ReconnectDecision::Retry {
                attempt: 3,
                delay: Duration::from_millis(200)
            }
        );
        assert_eq!(
            state.on_connect_failure(3),
            ReconnectDecision::GiveUp { attempts: 3 }
        );
    }

    #[test]
    fn test_zero_limit_gives_up_immediately() {
        let mut state = ConnectionState::new(BASE);
        assert_eq!(
            state.on_connect_failure(0),
            ReconnectDecision::GiveUp { attempts: 0 }
        );
    }

    #[test]
    fn test_failure_while_closing_is_discarded() {
        let mut state = ConnectionState::new(BASE);
        state.closing = true;

        assert_eq!(state.on_connect_failure(5), ReconnectDecision::Discard);
        assert_eq!(state.reconnect_attempts, 0);

        state.closing = false;
        state.closed = true;
        assert_eq!(state.on_connect_failure(5), ReconnectDecision::Discard);
    }

    #[test]
    fn test_reset_restores_base_timeout() {
        let mut state = ConnectionState::new(BASE);
        state.on_connect_failure(5);
        state.on_connect_failure(5);
        state.connecting = true;

        state.reset(BASE);

        assert_eq!(state.reconnect_attempts, 0);
        assert_eq!(state.reconnect_timeout, BASE);
        assert!(!state.connecting);
    }

    #[test]
    fn test_begin_connect_clears_shutdown_flags() {
        let mut state = ConnectionState::new(BASE);
        state.closing = true;
        state.closed = true;

        state.begin_connect();

        assert!(state.connecting);
        assert!(!state.is_shutting_down());
    }

    #[test]
    fn test_doubling_saturates() {
        let mut state = ConnectionState::new(Duration::MAX);
        state.on_connect_failure(10);
        assert_eq!(state.reconnect_timeout, Duration::MAX);
    }

    proptest! {
        #[test]
        fn prop_retry_delay_matches_backoff_law(base_ms in 1u64..1_000, limit in 1u32..12) {
            let base = Duration::from_millis(base_ms);
            let mut state = ConnectionState::new(base);

            for k in 1..=limit {
                match state.on_connect_failure(limit) {
                    ReconnectDecision::Retry { attempt, delay } => {
                        prop_assert_eq!(attempt, k);
                        prop_assert_eq!(delay, base * 2u32.pow(k - 1));
                    }
                    other => prop_assert!(false, "unexpected decision {:?}", other),
                }
            }

            prop_assert_eq!(
                state.on_connect_failure(limit),
                ReconnectDecision::GiveUp { attempts: limit }
            );
        }
    }
}
