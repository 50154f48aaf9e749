//! Frames LDAP messages on a byte stream.

use super::ber::{ProtocolError, TAG_SEQUENCE, parse_header};
use super::message::LdapMessage;
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Default upper bound for a single inbound message.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 8 * 1024 * 1024;

/// `tokio-util` codec shared by the listener and the client.
#[derive(Debug, Clone)]
pub struct LdapCodec {
    max_message_size: usize,
}

impl LdapCodec {
    pub fn new() -> Self {
        Self::with_max_message_size(DEFAULT_MAX_MESSAGE_SIZE)
    }

    pub fn with_max_message_size(max_message_size: usize) -> Self {
        Self { max_message_size }
    }
}

impl Default for LdapCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LdapCodec {
    type Item = LdapMessage;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(tag) = src.first()
            && *tag != TAG_SEQUENCE
        {
            return Err(ProtocolError::UnexpectedTag {
                expected: TAG_SEQUENCE,
                found: *tag,
            });
        }

        let Some((header, length)) = parse_header(src)? else {
            return Ok(None);
        };
        let total = header + length;
        if total > self.max_message_size {
            return Err(ProtocolError::TooLarge {
                size: total,
                limit: self.max_message_size,
            });
        }
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let frame = src.split_to(total);
        LdapMessage::decode(frame.chunk()).map(Some)
    }
}

impl Encoder<LdapMessage> for LdapCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: LdapMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let bytes = item.encode();
        dst.reserve(bytes.len());
        dst.put_slice(&bytes);
        Ok(())
    }
}
