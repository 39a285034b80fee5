//! Error types for the protocol layer.
//!
//! Each crate in Colorclash defines its own error enum. A `ProtocolError`
//! always means the problem is in turning bytes or text into wire types,
//! never in game rules (those are `RoomError`s).

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, an unknown `type` tag, missing
    /// required fields, or a team name other than yellow/pink.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A card field was outside its allowed set (face 1–8, value 1/5/10).
    #[error("invalid card: {0}")]
    InvalidCard(String),
}
