//! Wire framing — length-prefixed bincode with a magic/version header.
//!
//! Frame layout: 4 magic bytes, 2 version bytes (LE), 4 length bytes
//! (LE), then `length` payload bytes of bincode-encoded
//! [`GossipMessage`](lattice_messages::GossipMessage).

use lattice_messages::{GossipMessage, PROTOCOL_VERSION};

use crate::NetworkError;

const MAGIC: [u8; 4] = *b"LTTC";
/// Bytes before the payload: magic + version + length.
pub const FRAME_OVERHEAD: usize = 10;
/// Maximum payload size: 16 MiB.
pub const MAX_FRAME_PAYLOAD: usize = 16 * 1024 * 1024;

/// Encode a message into one wire frame.
pub fn encode_frame(message: &GossipMessage) -> Result<Vec<u8>, NetworkError> {
    let payload = bincode::serialize(message).map_err(|e| NetworkError::Codec(e.to_string()))?;
    if payload.len() > MAX_FRAME_PAYLOAD {
        return Err(NetworkError::FrameTooLarge {
            size: payload.len(),
            max: MAX_FRAME_PAYLOAD,
        });
    }
    let mut frame = Vec::with_capacity(FRAME_OVERHEAD + payload.len());
    frame.extend_from_slice(&MAGIC);
    frame.extend_from_slice(&PROTOCOL_VERSION.to_le_bytes());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Validate a frame header and return the declared payload length.
pub fn parse_header(header: &[u8; FRAME_OVERHEAD]) -> Result<usize, NetworkError> {
    if header[..4] != MAGIC {
        return Err(NetworkError::MalformedFrame("bad magic".into()));
    }
    let version = u16::from_le_bytes([header[4], header[5]]);
    if version != PROTOCOL_VERSION {
        return Err(NetworkError::MalformedFrame(format!(
            "protocol version {version} (expected {PROTOCOL_VERSION})"
        )));
    }
    let length = u32::from_le_bytes([header[6], header[7], header[8], header[9]]) as usize;
    if length > MAX_FRAME_PAYLOAD {
        return Err(NetworkError::FrameTooLarge {
            size: length,
            max: MAX_FRAME_PAYLOAD,
        });
    }
    Ok(length)
}

/// Decode one wire frame back into a message.
pub fn decode_frame(frame: &[u8]) -> Result<GossipMessage, NetworkError> {
    if frame.len() < FRAME_OVERHEAD {
        return Err(NetworkError::MalformedFrame(format!(
            "{} bytes is shorter than the frame header",
            frame.len()
        )));
    }
    let header: [u8; FRAME_OVERHEAD] = frame[..FRAME_OVERHEAD]
        .try_into()
        .expect("length checked above");
    let length = parse_header(&header)?;
    let payload = &frame[FRAME_OVERHEAD..];
    if payload.len() != length {
        return Err(NetworkError::MalformedFrame(format!(
            "declared {length} payload bytes, found {}",
            payload.len()
        )));
    }
    bincode::deserialize(payload).map_err(|e| NetworkError::Codec(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_messages::{
        KeepaliveMessage, MessageHeader, MessageKind, PeerAddress,
    };
    use lattice_types::{ClusterId, Timestamp};

    fn keepalive() -> GossipMessage {
        GossipMessage::Keepalive(KeepaliveMessage {
            header: MessageHeader::new(
                MessageKind::Keepalive,
                ClusterId::new("chat"),
                0,
                Timestamp::new(1),
            ),
            peers: vec![PeerAddress {
                ip: "10.0.0.1".into(),
                port: 7171,
            }],
        })
    }

    #[test]
    fn frame_roundtrip() {
        let frame = encode_frame(&keepalive()).unwrap();
        let decoded = decode_frame(&frame).unwrap();
        assert_eq!(decoded.kind(), MessageKind::Keepalive);
        assert_eq!(decoded.cluster_id().as_str(), "chat");
    }

    #[test]
    fn bad_magic_rejected() {
        let mut frame = encode_frame(&keepalive()).unwrap();
        frame[0] = b'X';
        assert!(matches!(
            decode_frame(&frame),
            Err(NetworkError::MalformedFrame(_))
        ));
    }

    #[test]
    fn truncated_frame_rejected() {
        let frame = encode_frame(&keepalive()).unwrap();
        assert!(decode_frame(&frame[..frame.len() - 1]).is_err());
        assert!(decode_frame(&frame[..4]).is_err());
    }

    #[test]
    fn wrong_version_rejected() {
        let mut frame = encode_frame(&keepalive()).unwrap();
        frame[4] = 0xFF;
        assert!(decode_frame(&frame).is_err());
    }
}
