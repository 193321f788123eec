//! JSON message protocol
//!
//! Frames are UTF-8 text, one JSON object per frame, tagged by `type`.
//! Decoding happens once at the connection boundary; past that point requests
//! are a closed enum and dispatch is an exhaustive `match`.

pub mod codec;
pub mod message;

pub use codec::{decode, encode, DecodeError, Frame};
pub use message::{ClientMessage, ErrorCode, ServerMessage};
