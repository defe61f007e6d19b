use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::{Error, Result};

/// Payload length at which a frame continues in the next packet
pub const MAX_PAYLOAD_LENGTH: usize = 0xFFFFFF;

/// MySQL packet header (zero-copy)
///
/// Layout matches MySQL wire protocol:
/// - length: 3 bytes (little-endian, payload length)
/// - sequence_id: 1 byte
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, IntoBytes)]
pub struct PacketHeader {
    pub length: [u8; 3],
    pub sequence_id: u8,
}

impl PacketHeader {
    pub fn encode(length: usize, sequence_id: u8) -> Self {
        let len = u32::to_le_bytes(length as u32);
        Self {
            length: [len[0], len[1], len[2]],
            sequence_id,
        }
    }

    pub fn length(&self) -> usize {
        u32::from_le_bytes([self.length[0], self.length[1], self.length[2], 0]) as usize
    }

    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(data)
            .map(|(header, _)| header)
            .map_err(|_| Error::UnexpectedEof)
    }
}

/// Split a frame into wire packets: `(header, chunk)` pairs.
///
/// A frame whose length is a multiple of `MAX_PAYLOAD_LENGTH` ends with an
/// empty packet.
pub fn split_frame(sequence_id: u8, payload: &[u8]) -> Vec<(PacketHeader, &[u8])> {
    let mut packets = Vec::with_capacity(payload.len() / MAX_PAYLOAD_LENGTH + 1);
    let mut sequence_id = sequence_id;
    let mut remaining = payload;
    loop {
        let chunk_size = remaining.len().min(MAX_PAYLOAD_LENGTH);
        let (chunk, rest) = remaining.split_at(chunk_size);
        packets.push((PacketHeader::encode(chunk_size, sequence_id), chunk));
        sequence_id = sequence_id.wrapping_add(1);
        remaining = rest;
        if chunk_size < MAX_PAYLOAD_LENGTH {
            break;
        }
    }
    packets
}
