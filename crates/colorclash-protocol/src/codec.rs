//! Codec trait and implementations for serializing/deserializing messages.
//!
//! The protocol layer doesn't care HOW commands and events are serialized,
//! it only needs something that implements [`Codec`]. The server handler is
//! generic over the codec, so a binary format can replace JSON without
//! touching the room layer.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// Browser clients speak JSON natively, so this is the default.
///
/// ## Example
///
/// ```rust
/// use colorclash_protocol::{ClientCommand, Codec, JsonCodec, Team};
///
/// let codec = JsonCodec;
/// let cmd = ClientCommand::PlayCard { target_team: Team::Pink, target_slot: 2 };
///
/// let bytes = codec.encode(&cmd).unwrap();
/// let decoded: ClientCommand = codec.decode(&bytes).unwrap();
/// assert_eq!(cmd, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ClientCommand, ServerEvent};

    #[test]
    fn test_json_codec_decodes_client_command() {
        let codec = JsonCodec;
        let cmd: ClientCommand = codec
            .decode(br#"{"type":"set-ready","ready":true}"#)
            .unwrap();
        assert_eq!(cmd, ClientCommand::SetReady { ready: true });
    }

    #[test]
    fn test_json_codec_rejects_unknown_command() {
        let codec = JsonCodec;
        let result: Result<ClientCommand, _> =
            codec.decode(br#"{"type":"shuffle-deck"}"#);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_json_codec_encodes_rejection() {
        let codec = JsonCodec;
        let bytes = codec
            .encode(&ServerEvent::Rejected {
                reason: "room R-1 is full".into(),
            })
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["type"], "rejected");
        assert_eq!(json["reason"], "room R-1 is full");
    }
}
