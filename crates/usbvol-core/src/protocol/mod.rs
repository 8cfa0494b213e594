//! Protocol module containing the control message types and the XML line codec.

pub mod codec;
pub mod messages;

pub use codec::{decode_response, encode_request, ProtocolError};
pub use messages::*;
