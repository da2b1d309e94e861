//! Protocol codec for encoding/decoding messages
//!
//! Pure functions: a [`Message`] becomes exactly one frame and one frame
//! becomes exactly one [`Message`]. No I/O and no state.

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

use super::{AxiomId, Message, MessageType, AXIOMS_PER_ROUND, HEADER_SIZE, MAX_PAYLOAD_LEN};

/// Codec errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Truncated header: {0} bytes")]
    TruncatedHeader(usize),

    #[error("Unknown message type: 0x{0:02x}")]
    UnknownMessageType(u8),

    #[error("Truncated payload: declared {declared} bytes, {available} available")]
    TruncatedPayload { declared: usize, available: usize },

    #[error("Trailing bytes: declared {declared} bytes, {available} available")]
    TrailingBytes { declared: usize, available: usize },

    #[error("Malformed {message_type} payload: {reason}")]
    MalformedPayload {
        message_type: MessageType,
        reason: String,
    },

    #[error("Invalid {message_type} payload: {len} bytes does not fit the length field")]
    InvalidPayload { message_type: MessageType, len: usize },
}

/// Encode a message into a new frame
pub fn encode(message: &Message) -> Result<Bytes, CodecError> {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + message.message_type().payload_len());
    encode_into(message, &mut buf)?;
    Ok(buf.freeze())
}

/// Append the frame for a message to a buffer
///
/// On error nothing is written. Every current variant fits the 1-byte
/// length field, so [`CodecError::InvalidPayload`] only guards variants
/// added later with larger payloads.
pub fn encode_into(message: &Message, buf: &mut BytesMut) -> Result<(), CodecError> {
    let message_type = message.message_type();

    let mut payload = BytesMut::with_capacity(message_type.payload_len());
    write_payload(message, &mut payload);

    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(CodecError::InvalidPayload {
            message_type,
            len: payload.len(),
        });
    }

    buf.reserve(HEADER_SIZE + payload.len());
    buf.put_u8(message_type.into());
    buf.put_u8(payload.len() as u8);
    buf.put_slice(&payload);

    Ok(())
}

fn write_payload(message: &Message, payload: &mut BytesMut) {
    match message {
        Message::ReadyStatusChanged { ready } => payload.put_u8(u8::from(*ready)),
        Message::RoundInit { available_axioms } => payload.put_slice(available_axioms),
        Message::SelectionMade { selection } => payload.put_u8(*selection),
        Message::GameInit | Message::PlayerTurnStart | Message::EvaluateSelections => {}
    }
}

/// Decode one complete frame
///
/// The buffer must hold exactly one frame: missing bytes and extra bytes
/// after the declared payload are both rejected.
pub fn decode(frame: &[u8]) -> Result<Message, CodecError> {
    if frame.len() < HEADER_SIZE {
        return Err(CodecError::TruncatedHeader(frame.len()));
    }

    let message_type =
        MessageType::try_from(frame[0]).map_err(CodecError::UnknownMessageType)?;
    let declared = frame[1] as usize;
    let available = frame.len() - HEADER_SIZE;

    if available < declared {
        return Err(CodecError::TruncatedPayload { declared, available });
    }
    if available > declared {
        return Err(CodecError::TrailingBytes { declared, available });
    }

    read_payload(message_type, &frame[HEADER_SIZE..])
}

fn read_payload(message_type: MessageType, payload: &[u8]) -> Result<Message, CodecError> {
    let expected = message_type.payload_len();
    if payload.len() != expected {
        return Err(CodecError::MalformedPayload {
            message_type,
            reason: format!("expected {} bytes, got {}", expected, payload.len()),
        });
    }

    let message = match message_type {
        MessageType::ReadyStatusChanged => Message::ReadyStatusChanged {
            ready: read_bool(message_type, payload[0])?,
        },
        MessageType::GameInit => Message::GameInit,
        MessageType::RoundInit => {
            let mut available_axioms = [0 as AxiomId; AXIOMS_PER_ROUND];
            available_axioms.copy_from_slice(payload);
            Message::RoundInit { available_axioms }
        }
        MessageType::PlayerTurnStart => Message::PlayerTurnStart,
        MessageType::SelectionMade => Message::SelectionMade {
            selection: payload[0],
        },
        MessageType::EvaluateSelections => Message::EvaluateSelections,
    };

    Ok(message)
}

/// Booleans are strict: only 0x00 and 0x01 are valid
fn read_bool(message_type: MessageType, byte: u8) -> Result<bool, CodecError> {
    match byte {
        0x00 => Ok(false),
        0x01 => Ok(true),
        other => Err(CodecError::MalformedPayload {
            message_type,
            reason: format!("boolean byte 0x{:02x} is neither 0x00 nor 0x01", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_messages() -> Vec<Message> {
        vec![
            Message::ReadyStatusChanged { ready: false },
            Message::ReadyStatusChanged { ready: true },
            Message::GameInit,
            Message::RoundInit {
                available_axioms: [0x01, 0x03, 0x03, 0x05, 0x01, 0x07],
            },
            Message::PlayerTurnStart,
            Message::SelectionMade { selection: 0x04 },
            Message::EvaluateSelections,
        ]
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        for original in all_messages() {
            let frame = encode(&original).unwrap();
            assert_eq!(frame.len(), HEADER_SIZE + original.message_type().payload_len());
            assert_eq!(decode(&frame), Ok(original));
        }
    }

    #[test]
    fn test_ready_status_wire_bytes() {
        let frame = encode(&Message::ReadyStatusChanged { ready: true }).unwrap();
        assert_eq!(&frame[..], &[0x00, 0x01, 0x01]);

        let frame = encode(&Message::ReadyStatusChanged { ready: false }).unwrap();
        assert_eq!(&frame[..], &[0x00, 0x01, 0x00]);
    }

    #[test]
    fn test_round_init_wire_bytes() {
        let frame = encode(&Message::RoundInit {
            available_axioms: [0x01, 0x02, 0x03, 0x04, 0x05, 0x06],
        })
        .unwrap();
        assert_eq!(&frame[..], &[0x02, 0x06, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
    }

    #[test]
    fn test_every_variant_fits_length_field() {
        for message_type in MessageType::ALL {
            assert!(message_type.payload_len() <= MAX_PAYLOAD_LEN);
        }
        for message in all_messages() {
            assert!(!matches!(encode(&message), Err(CodecError::InvalidPayload { .. })));
        }
    }

    #[test]
    fn test_signal_has_empty_payload() {
        let frame = encode(&Message::GameInit).unwrap();
        assert_eq!(&frame[..], &[0x01, 0x00]);
    }

    #[test]
    fn test_encode_into_appends() {
        let mut buf = BytesMut::new();
        encode_into(&Message::GameInit, &mut buf).unwrap();
        encode_into(&Message::SelectionMade { selection: 9 }, &mut buf).unwrap();
        assert_eq!(&buf[..], &[0x01, 0x00, 0x04, 0x01, 0x09]);
    }

    #[test]
    fn test_truncated_header() {
        assert_eq!(decode(&[]), Err(CodecError::TruncatedHeader(0)));
        assert_eq!(decode(&[0x00]), Err(CodecError::TruncatedHeader(1)));
    }

    #[test]
    fn test_truncated_payload() {
        assert_eq!(
            decode(&[0x00, 0x01]),
            Err(CodecError::TruncatedPayload { declared: 1, available: 0 })
        );
        assert_eq!(
            decode(&[0x02, 0x06, 0x01, 0x02]),
            Err(CodecError::TruncatedPayload { declared: 6, available: 2 })
        );
    }

    #[test]
    fn test_trailing_bytes() {
        assert_eq!(
            decode(&[0x00, 0x01, 0x01, 0x00]),
            Err(CodecError::TrailingBytes { declared: 1, available: 2 })
        );
    }

    #[test]
    fn test_unknown_message_type() {
        assert_eq!(decode(&[0xFF, 0x00]), Err(CodecError::UnknownMessageType(0xFF)));
        assert_eq!(decode(&[0x06, 0x00]), Err(CodecError::UnknownMessageType(0x06)));
    }

    #[test]
    fn test_unknown_type_checked_before_length() {
        // An undefined discriminant is reported even when the payload is short
        assert_eq!(decode(&[0xFF, 0x05]), Err(CodecError::UnknownMessageType(0xFF)));
    }

    #[test]
    fn test_strict_boolean() {
        match decode(&[0x00, 0x01, 0x02]) {
            Err(CodecError::MalformedPayload { message_type, .. }) => {
                assert_eq!(message_type, MessageType::ReadyStatusChanged);
            }
            other => panic!("Expected MalformedPayload, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_payload_length_for_variant() {
        // Length field is consistent with the buffer, but the variant needs 1 byte
        assert!(matches!(
            decode(&[0x00, 0x02, 0x01, 0x01]),
            Err(CodecError::MalformedPayload { .. })
        ));
        assert!(matches!(
            decode(&[0x01, 0x01, 0x00]),
            Err(CodecError::MalformedPayload { message_type: MessageType::GameInit, .. })
        ));
        assert!(matches!(
            decode(&[0x02, 0x05, 1, 2, 3, 4, 5]),
            Err(CodecError::MalformedPayload { message_type: MessageType::RoundInit, .. })
        ));
    }

    #[test]
    fn test_error_display() {
        let err = CodecError::UnknownMessageType(0xFF);
        assert_eq!(err.to_string(), "Unknown message type: 0xff");
    }
}
