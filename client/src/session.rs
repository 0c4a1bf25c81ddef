//! Connection lifecycle: status state machine, identity token and reconnect
//! policy.

use log::{debug, warn};
use shared::CloseReason;
use std::time::Duration;

/// Where the client's connection currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Idle,
    Connecting,
    Open,
    Closed,
    Error,
}

impl ConnectionStatus {
    pub fn can_transition_to(self, next: ConnectionStatus) -> bool {
        use ConnectionStatus::*;
        matches!(
            (self, next),
            (Idle, Connecting)
                | (Connecting, Open)
                | (Connecting, Error)
                | (Open, Closed)
                | (Open, Error)
                | (Closed, Connecting)
                | (Error, Connecting)
        )
    }
}

/// Holds the status and refuses transitions that make no sense.
#[derive(Debug, Default)]
pub struct ConnectionState {
    status: ConnectionStatus,
}

impl ConnectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Moves to `next` if allowed. Returns false and leaves the state as it
    /// was otherwise.
    pub fn transition(&mut self, next: ConnectionStatus) -> bool {
        if !self.status.can_transition_to(next) {
            warn!("Ignoring status change {:?} -> {:?}", self.status, next);
            return false;
        }
        debug!("Status {:?} -> {:?}", self.status, next);
        self.status = next;
        true
    }
}

/// What to do after the connection ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Another connection owns our identity; stay down.
    Stop,
    /// We were evicted; join again without the stored token.
    Fresh,
    /// Anything else; rejoin as the same player.
    Resume,
}

impl ReconnectDecision {
    pub fn from_close_code(code: Option<u16>) -> Self {
        match code.and_then(CloseReason::from_code) {
            Some(CloseReason::Replaced) => ReconnectDecision::Stop,
            Some(CloseReason::Inactive) => ReconnectDecision::Fresh,
            None => ReconnectDecision::Resume,
        }
    }
}

/// Fixed back-off with a bounded number of consecutive attempts.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    max_attempts: u32,
    backoff: Duration,
    attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
            attempts: 0,
        }
    }

    /// Delay before the next attempt, or `None` once attempts are used up.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.max_attempts {
            return None;
        }
        self.attempts += 1;
        Some(self.backoff)
    }

    /// Called after a successful join.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
