//! The 12-byte Yamux frame header.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! | Version       |     Type      |          Flags                |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Stream ID                             |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Length                                |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//! All integers are big-endian.

use libp2prs_core::error::ConnectionFault;

pub const HEADER_LENGTH: usize = 12;
/// Data frames whose declared length exceeds this are rejected before any
/// allocation is made for the payload.
pub const MAX_DATA_LENGTH: u32 = 16 * 1024 * 1024;

/// The four frame types Yamux defines.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Tag {
    Data = 0,
    WindowUpdate = 1,
    Ping = 2,
    GoAway = 3,
}

impl Tag {
    fn from_u8(v: u8) -> Result<Tag, ConnectionFault> {
        match v {
            0 => Ok(Tag::Data),
            1 => Ok(Tag::WindowUpdate),
            2 => Ok(Tag::Ping),
            3 => Ok(Tag::GoAway),
            other => Err(ConnectionFault::InvalidFrameType(other)),
        }
    }
}

/// Header flag bits. A header may carry any subset of these.
pub mod flags {
    pub const SYN: u16 = 0x1;
    pub const ACK: u16 = 0x2;
    pub const FIN: u16 = 0x4;
    pub const RST: u16 = 0x8;
}

/// A parsed (or about-to-be-encoded) Yamux frame header.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub tag: Tag,
    pub flags: u16,
    pub stream_id: u32,
    pub length: u32,
}

impl Header {
    pub fn data(stream_id: u32, length: u32) -> Self {
        Header { tag: Tag::Data, flags: 0, stream_id, length }
    }

    pub fn window_update(stream_id: u32, delta: u32) -> Self {
        Header { tag: Tag::WindowUpdate, flags: 0, stream_id, length: delta }
    }

    pub fn ping(nonce: u32) -> Self {
        Header { tag: Tag::Ping, flags: 0, stream_id: 0, length: nonce }
    }

    pub fn go_away(reason: u32) -> Self {
        Header { tag: Tag::GoAway, flags: 0, stream_id: 0, length: reason }
    }

    pub fn with_flags(mut self, flags: u16) -> Self {
        self.flags |= flags;
        self
    }

    pub fn syn(&mut self) {
        self.flags |= flags::SYN;
    }

    pub fn ack(&mut self) {
        self.flags |= flags::ACK;
    }

    pub fn fin(&mut self) {
        self.flags |= flags::FIN;
    }

    pub fn rst(&mut self) {
        self.flags |= flags::RST;
    }

    pub fn has(&self, flag: u16) -> bool {
        self.flags & flag != 0
    }

    /// Writes the 12-byte wire form of this header into `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(0); // version
        out.push(self.tag as u8);
        out.extend_from_slice(&self.flags.to_be_bytes());
        out.extend_from_slice(&self.stream_id.to_be_bytes());
        out.extend_from_slice(&self.length.to_be_bytes());
    }

    /// Parses a header from exactly [`HEADER_LENGTH`] bytes.
    pub fn decode(bytes: &[u8; HEADER_LENGTH]) -> Result<Header, ConnectionFault> {
        let version = bytes[0];
        if version != 0 {
            return Err(ConnectionFault::InvalidVersion(version));
        }
        let tag = Tag::from_u8(bytes[1])?;
        let flags = u16::from_be_bytes([bytes[2], bytes[3]]);
        let stream_id = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let length = u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);

        if tag == Tag::Data && length > MAX_DATA_LENGTH {
            return Err(ConnectionFault::FrameTooLarge(length));
        }

        Ok(Header { tag, flags, stream_id, length })
    }
}
