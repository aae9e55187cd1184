//! Connection state machine for one push channel.
//!
//! Transitions are pure: [`ChannelMachine::handle`] returns the effect the
//! worker has to perform, so the reconnect policy is testable without a
//! socket or a clock.

use std::time::Duration;

/// Lifecycle of a push connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Backoff,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Open => write!(f, "open"),
            ConnectionState::Backoff => write!(f, "backoff"),
        }
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEvent {
    Subscribe,
    HandshakeSucceeded,
    HandshakeFailed,
    Closed,
    TransportError,
    BackoffElapsed,
    Teardown,
}

/// What the worker must do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Open a new connection
    Connect,
    /// Wait, then deliver [`ChannelEvent::BackoffElapsed`]
    ScheduleReconnect(Duration),
    /// Close the live socket
    Close,
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid channel transition: {event:?} while {from}")]
pub struct InvalidTransition {
    pub from: ConnectionState,
    pub event: ChannelEvent,
}

/// Connection state owned by one channel.
#[derive(Debug, Clone)]
pub struct ChannelMachine {
    state: ConnectionState,
    reconnect_delay: Duration,
    torn_down: bool,
    attempts: u64,
}

impl ChannelMachine {
    pub fn new(reconnect_delay: Duration) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            reconnect_delay,
            torn_down: false,
            attempts: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Connection attempts started so far.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Apply an event.
    ///
    /// Teardown is accepted in every state and is terminal: afterwards every
    /// other event is rejected.
    pub fn handle(&mut self, event: ChannelEvent) -> Result<Effect, InvalidTransition> {
        use ChannelEvent::*;
        use ConnectionState::*;

        if event == Teardown {
            let effect = match self.state {
                Connecting | Open => Effect::Close,
                Disconnected | Backoff => Effect::Idle,
            };
            self.torn_down = true;
            self.state = Disconnected;
            return Ok(effect);
        }

        let invalid = InvalidTransition {
            from: self.state,
            event,
        };
        if self.torn_down {
            return Err(invalid);
        }

        let (next, effect) = match (self.state, event) {
            (Disconnected, Subscribe) | (Backoff, BackoffElapsed) => {
                self.attempts += 1;
                (Connecting, Effect::Connect)
            }
            (Connecting, HandshakeSucceeded) => (Open, Effect::Idle),
            (Connecting, HandshakeFailed) | (Open, Closed) | (Open, TransportError) => {
                (Backoff, Effect::ScheduleReconnect(self.reconnect_delay))
            }
            _ => return Err(invalid),
        };

        self.state = next;
        Ok(effect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ChannelEvent::*;

    const DELAY: Duration = Duration::from_secs(5);

    fn open_machine() -> ChannelMachine {
        let mut machine = ChannelMachine::new(DELAY);
        machine.handle(Subscribe).unwrap();
        machine.handle(HandshakeSucceeded).unwrap();
        machine
    }

    #[test]
    fn subscribe_and_open() {
        let mut machine = ChannelMachine::new(DELAY);
        assert_eq!(machine.handle(Subscribe), Ok(Effect::Connect));
        assert_eq!(machine.state(), ConnectionState::Connecting);
        assert_eq!(machine.handle(HandshakeSucceeded), Ok(Effect::Idle));
        assert_eq!(machine.state(), ConnectionState::Open);
        assert_eq!(machine.attempts(), 1);
    }

    #[test]
    fn close_and_error_back_off_with_fixed_delay() {
        let mut machine = open_machine();

        for round in 0..5 {
            let event = if round % 2 == 0 { Closed } else { TransportError };
            assert_eq!(machine.handle(event), Ok(Effect::ScheduleReconnect(DELAY)));
            assert_eq!(machine.state(), ConnectionState::Backoff);
            assert_eq!(machine.handle(BackoffElapsed), Ok(Effect::Connect));
            machine.handle(HandshakeSucceeded).unwrap();
        }
        assert_eq!(machine.attempts(), 6);
    }

    #[test]
    fn failed_handshake_backs_off() {
        let mut machine = ChannelMachine::new(DELAY);
        machine.handle(Subscribe).unwrap();
        assert_eq!(
            machine.handle(HandshakeFailed),
            Ok(Effect::ScheduleReconnect(DELAY))
        );
    }

    #[test]
    fn teardown_is_terminal() {
        let mut machine = open_machine();
        assert_eq!(machine.handle(Teardown), Ok(Effect::Close));
        assert_eq!(machine.state(), ConnectionState::Disconnected);
        assert!(machine.is_torn_down());

        assert!(machine.handle(Subscribe).is_err());
        assert!(machine.handle(BackoffElapsed).is_err());
        assert_eq!(machine.handle(Teardown), Ok(Effect::Idle));
    }

    #[test]
    fn teardown_during_backoff_cancels_reconnect() {
        let mut machine = open_machine();
        machine.handle(Closed).unwrap();
        assert_eq!(machine.handle(Teardown), Ok(Effect::Idle));
        assert!(machine.handle(BackoffElapsed).is_err());
    }

    #[test]
    fn invalid_transitions_are_rejected() {
        let mut machine = ChannelMachine::new(DELAY);
        let err = machine.handle(HandshakeSucceeded).unwrap_err();
        assert_eq!(err.from, ConnectionState::Disconnected);
        assert_eq!(machine.state(), ConnectionState::Disconnected);

        let mut machine = open_machine();
        assert!(machine.handle(Subscribe).is_err());
        assert!(machine.handle(BackoffElapsed).is_err());
        assert_eq!(machine.state(), ConnectionState::Open);
    }
}
