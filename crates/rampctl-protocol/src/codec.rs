//! Codec trait and the plain-text implementation used on the wire.
//!
//! A codec converts between [`Frame`]s and the raw bytes a transport
//! connection carries. The session layer only depends on the trait, so a
//! different encoding can be swapped in without touching the listener or
//! client.

use crate::{Frame, ProtocolError};

/// Encodes frames to bytes and decodes bytes back into frames.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a frame into its wire bytes.
    fn encode(&self, frame: &Frame) -> Result<Vec<u8>, ProtocolError>;

    /// Parses wire bytes into a frame.
    fn decode(&self, data: &[u8]) -> Result<Frame, ProtocolError>;
}

/// A [`Codec`] that sends each frame as its bare UTF-8 text.
///
/// Delimiting is the transport's job, so the encoded form carries no
/// terminator.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl Codec for TextCodec {
    fn encode(&self, frame: &Frame) -> Result<Vec<u8>, ProtocolError> {
        if let Frame::Action(code) = frame {
            // An action that reads as a control literal would be
            // misinterpreted by the receiver.
            if Frame::parse(code.as_str())?.is_control() {
                return Err(ProtocolError::InvalidMessage(format!(
                    "action code {code:?} collides with a reserved frame"
                )));
            }
        }
        Ok(frame.as_text().as_bytes().to_vec())
    }

    fn decode(&self, data: &[u8]) -> Result<Frame, ProtocolError> {
        let text = std::str::from_utf8(data)?;
        Frame::parse(text)
    }
}
