//! Connection state machine
//!
//! ```text
//! IDLE ─dial─▶ CONNECTING ─connect─▶ CONNECTED ─connected─▶ AUTHENTICATED
//!                  │                     │                        │
//!                  └──── fail / drop ────┴────────────────────────┘
//!                                 ▼
//!                       ERROR | DISCONNECTED ─retry─▶ CONNECTING
//! any ─close─▶ CLOSED
//! ```
//!
//! Only AUTHENTICATED resets the attempt counter. A socket the server
//! accepts and then hangs up on still counts against the budget, and a
//! hang-up before the `connected` acknowledgement is an auth rejection.
//!
//! [`ChannelState::apply`] is pure: it updates the record and reports
//! whether a retry should be scheduled. The channel driver performs the
//! side effects.

use std::time::Duration;

use crate::domain::{ChannelError, ConnectionState, User};

use super::policy::ReconnectPolicy;

#[derive(Debug, Clone, PartialEq)]
pub enum StateInput {
    /// Start an attempt (initial open or a retry that came due).
    Dial,
    Connect,
    Authenticated { user: Option<User> },
    Dropped { reason: String },
    Failed(ChannelError),
    Close,
}

/// Result of one accepted input.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: ConnectionState,
    pub to: ConnectionState,
    /// Set when the new state is a failure and a retry is due after the delay.
    pub retry_in: Option<Duration>,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelState {
    pub state: ConnectionState,
    /// Automatic retries made since the channel last authenticated.
    pub attempts: u32,
    /// Delay of the retry currently scheduled, if any.
    pub next_delay: Option<Duration>,
    pub last_error: Option<ChannelError>,
    /// Identity the server resolved for the credential.
    pub user: Option<User>,
}

impl ChannelState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accepts_alerts(&self) -> bool {
        self.state == ConnectionState::Authenticated
    }

    /// Apply `input`. Returns `None` when the input is not valid in the
    /// current state; the record is then left untouched.
    pub fn apply(&mut self, input: StateInput, policy: &ReconnectPolicy) -> Option<Transition> {
        use ConnectionState::*;

        let from = self.state;
        let mut retry_in = None;

        match (from, input) {
            (Closed, _) => return None,
            (_, StateInput::Close) => {
                self.state = Closed;
                self.next_delay = None;
            }
            (Idle | Error | Disconnected, StateInput::Dial) => {
                self.state = Connecting;
                self.next_delay = None;
            }
            (Connecting, StateInput::Connect) => {
                self.state = Connected;
                self.last_error = None;
            }
            (Connected, StateInput::Authenticated { user }) => {
                self.state = Authenticated;
                self.attempts = 0;
                self.last_error = None;
                self.user = user;
            }
            (Connecting | Connected | Authenticated, StateInput::Dropped { reason }) => {
                self.user = None;
                match refusal(from, reason) {
                    Some(error) => {
                        self.state = Error;
                        self.last_error = Some(error);
                        self.next_delay = None;
                    }
                    None => {
                        self.state = Disconnected;
                        retry_in = self.schedule_retry(policy);
                    }
                }
            }
            (Connecting | Connected | Authenticated, StateInput::Failed(error)) => {
                let auth = error.is_auth();
                self.state = Error;
                self.user = None;
                self.last_error = Some(error);
                if !auth {
                    retry_in = self.schedule_retry(policy);
                } else {
                    self.next_delay = None;
                }
            }
            _ => return None,
        }

        Some(Transition {
            from,
            to: self.state,
            retry_in,
        })
    }

    fn schedule_retry(&mut self, policy: &ReconnectPolicy) -> Option<Duration> {
        if self.attempts >= policy.max_attempts {
            self.next_delay = None;
            return None;
        }
        self.attempts += 1;
        let delay = policy.delay_for(self.attempts);
        self.next_delay = Some(delay);
        Some(delay)
    }
}

/// A drop counts as an auth rejection when its reason says so, or when the
/// server hangs up between accepting the socket and acknowledging the token.
fn refusal(from: ConnectionState, reason: String) -> Option<ChannelError> {
    match ChannelError::classify(reason, None) {
        auth @ ChannelError::Auth(_) => Some(auth),
        ChannelError::Transport(reason) if from == ConnectionState::Connected => Some(
            ChannelError::Auth(format!("closed before authentication ({})", reason)),
        ),
        ChannelError::Transport(_) => None,
    }
}
