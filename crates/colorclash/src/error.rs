//! Unified error type for the Colorclash server.

use colorclash_protocol::ProtocolError;
use colorclash_room::RoomError;
use colorclash_timer::TimerError;
use colorclash_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates `From` impls, so the
/// `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ColorclashError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (full, not found, wrong state, illegal play).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A round timer lifecycle error.
    #[error(transparent)]
    Timer(#[from] TimerError),
}

#[cfg(test)]
mod tests {
    use colorclash_protocol::{GameState, RoomId};
    use colorclash_timer::TimerState;

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::AcceptFailed(std::io::Error::other("gone"));
        let err: ColorclashError = err.into();
        assert!(matches!(err, ColorclashError::Transport(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidCard("value must be 1, 5 or 10, got 7".into());
        let err: ColorclashError = err.into();
        assert!(matches!(err, ColorclashError::Protocol(_)));
    }

    #[test]
    fn test_from_room_error_is_transparent() {
        let err: ColorclashError = RoomError::WrongState {
            action: "play a card",
            state: GameState::Waiting,
        }
        .into();
        assert!(matches!(err, ColorclashError::Room(_)));
        assert_eq!(err.to_string(), "cannot play a card while the room is waiting");

        let err: ColorclashError = RoomError::NotFound(RoomId(1)).into();
        assert_eq!(err.to_string(), "room R-1 not found");
    }

    #[test]
    fn test_from_timer_error() {
        let err: ColorclashError = TimerError::NotIdle(TimerState::Running).into();
        assert!(matches!(err, ColorclashError::Timer(_)));
    }
}
