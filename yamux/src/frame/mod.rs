pub mod header;

use header::{Header, Tag, HEADER_LENGTH};
use libp2prs_core::error::ConnectionFault;

/// A complete Yamux frame: header plus body (only `Data` frames carry one).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub header: Header,
    pub body: Vec<u8>,
}

impl Frame {
    pub fn data(stream_id: u32, body: Vec<u8>) -> Result<Frame, ConnectionFault> {
        let len = u32::try_from(body.len()).map_err(|_| ConnectionFault::FrameTooLarge(u32::MAX))?;
        if len > header::MAX_DATA_LENGTH {
            return Err(ConnectionFault::FrameTooLarge(len));
        }
        Ok(Frame { header: Header::data(stream_id, len), body })
    }

    pub fn window_update(stream_id: u32, delta: u32) -> Frame {
        Frame { header: Header::window_update(stream_id, delta), body: Vec::new() }
    }

    pub fn ping(nonce: u32) -> Frame {
        Frame { header: Header::ping(nonce), body: Vec::new() }
    }

    pub fn go_away(reason: u32) -> Frame {
        Frame { header: Header::go_away(reason), body: Vec::new() }
    }
}

/// Encodes and decodes Yamux frames against a caller-owned byte buffer and
/// reader index.
///
/// This is the only frame codec in the crate: an earlier, parallel
/// implementation built around an opaque `Data` wrapper type was dropped in
/// favor of this byte-buffer-with-reader-index form because it preserves
/// zero-copy payload slicing and matches the reassembly buffer the
/// connection's read loop already maintains.
pub struct FrameCodec;

impl FrameCodec {
    /// Serializes `frame` to its wire form.
    pub fn encode(frame: &Frame) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LENGTH + frame.body.len());
        frame.header.encode_into(&mut out);
        out.extend_from_slice(&frame.body);
        out
    }

    /// Attempts to decode one frame starting at `buf[*pos..]`.
    ///
    /// Returns `Ok(None)` ("need more data") without advancing `*pos` if
    /// `buf` does not yet hold a complete frame. On success `*pos` advances
    /// exactly past the consumed frame and the returned frame's body is a
    /// freshly allocated copy of the relevant slice of `buf` - the "zero
    /// copy" property refers to not re-encoding or re-parsing already
    /// consumed bytes, not to avoiding the final handoff copy a body needs
    /// to survive buffer compaction.
    pub fn decode(buf: &[u8], pos: &mut usize) -> Result<Option<Frame>, ConnectionFault> {
        let remaining = &buf[*pos..];
        if remaining.len() < HEADER_LENGTH {
            return Ok(None);
        }

        let mut header_bytes = [0u8; HEADER_LENGTH];
        header_bytes.copy_from_slice(&remaining[..HEADER_LENGTH]);
        let header = Header::decode(&header_bytes)?;

        let body_len = if header.tag == Tag::Data { header.length as usize } else { 0 };
        let total = HEADER_LENGTH + body_len;
        if remaining.len() < total {
            return Ok(None);
        }

        let body = remaining[HEADER_LENGTH..total].to_vec();
        *pos += total;
        Ok(Some(Frame { header, body }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use header::flags;

    #[test]
    fn round_trip_data_frame() {
        let mut header = Header::data(3, 5);
        header.syn();
        header.ack();
        let frame = Frame { header, body: b"hello".to_vec() };

        let bytes = FrameCodec::encode(&frame);
        assert_eq!(
            bytes,
            vec![0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x05, b'h', b'e', b'l', b'l', b'o']
        );

        let mut pos = 0;
        let decoded = FrameCodec::decode(&bytes, &mut pos).unwrap().unwrap();
        assert_eq!(decoded, frame);
        assert_eq!(pos, bytes.len());
    }

    #[test]
    fn partial_input_does_not_advance() {
        let frame = Frame::data(1, vec![1, 2, 3, 4, 5]).unwrap();
        let bytes = FrameCodec::encode(&frame);
        let mut pos = 0;
        assert_eq!(FrameCodec::decode(&bytes[..HEADER_LENGTH - 1], &mut pos).unwrap(), None);
        assert_eq!(pos, 0);
        assert_eq!(FrameCodec::decode(&bytes[..bytes.len() - 1], &mut pos).unwrap(), None);
        assert_eq!(pos, 0);
    }

    #[test]
    fn zero_length_frame_decodes() {
        let frame = Frame::data(7, Vec::new()).unwrap();
        let bytes = FrameCodec::encode(&frame);
        assert_eq!(bytes.len(), HEADER_LENGTH);
        let mut pos = 0;
        let decoded = FrameCodec::decode(&bytes, &mut pos).unwrap().unwrap();
        assert!(decoded.body.is_empty());
    }

    #[test]
    fn invalid_version_rejected() {
        let mut bytes = vec![0u8; HEADER_LENGTH];
        bytes[0] = 1;
        let mut pos = 0;
        assert!(matches!(FrameCodec::decode(&bytes, &mut pos), Err(ConnectionFault::InvalidVersion(1))));
    }

    #[test]
    fn invalid_type_rejected() {
        let mut bytes = vec![0u8; HEADER_LENGTH];
        bytes[1] = 9;
        let mut pos = 0;
        assert!(matches!(FrameCodec::decode(&bytes, &mut pos), Err(ConnectionFault::InvalidFrameType(9))));
    }

    #[test]
    fn oversized_data_frame_rejected_without_allocating() {
        let mut header = Header::data(1, 17 * 1024 * 1024);
        header.flags = 0;
        let mut bytes = Vec::new();
        header.encode_into(&mut bytes);
        let mut pos = 0;
        assert!(matches!(FrameCodec::decode(&bytes, &mut pos), Err(ConnectionFault::FrameTooLarge(_))));
    }

    #[test]
    fn all_flag_subsets_round_trip() {
        let all = [0u16, flags::SYN, flags::ACK, flags::FIN, flags::RST, flags::SYN | flags::ACK, flags::FIN | flags::RST];
        for f in all {
            let frame = Frame { header: Header::data(1, 0).with_flags(f), body: Vec::new() };
            let bytes = FrameCodec::encode(&frame);
            let mut pos = 0;
            let decoded = FrameCodec::decode(&bytes, &mut pos).unwrap().unwrap();
            assert_eq!(decoded.header.flags, f);
        }
    }
}
