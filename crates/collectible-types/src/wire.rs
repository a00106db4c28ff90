//! JSON wire codec for [`ActionEnvelope`] frames.
//!
//! Decoding is the first validation stage on every receiver: a frame that
//! is not valid JSON, names an unknown action type, or carries a colour
//! outside [`ItemColor`](crate::ItemColor) never reaches the state stores.

use crate::actions::ActionEnvelope;

/// Upper bound on an encoded frame. Real envelopes are a few hundred bytes.
pub const MAX_FRAME_BYTES: usize = 4096;

/// Errors produced while encoding or decoding a frame.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The frame exceeds [`MAX_FRAME_BYTES`].
    #[error("frame too large: {size} bytes (limit {limit})", limit = MAX_FRAME_BYTES)]
    FrameTooLarge {
        /// Size of the offending frame.
        size: usize,
    },

    /// The frame is not a well-formed envelope.
    #[error("malformed frame: {source}")]
    Malformed {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}

/// Encode an envelope into a frame.
pub fn encode(envelope: &ActionEnvelope) -> Result<Vec<u8>, WireError> {
    let bytes = serde_json::to_vec(envelope)?;
    if bytes.len() > MAX_FRAME_BYTES {
        return Err(WireError::FrameTooLarge { size: bytes.len() });
    }
    Ok(bytes)
}

/// Decode a frame into an envelope.
pub fn decode(frame: &[u8]) -> Result<ActionEnvelope, WireError> {
    if frame.len() > MAX_FRAME_BYTES {
        return Err(WireError::FrameTooLarge { size: frame.len() });
    }
    Ok(serde_json::from_slice(frame)?)
}
