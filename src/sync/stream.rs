use std::io::{BufReader, Read, Write};

use auto_impl::auto_impl;
use tracing::trace;
use zerocopy::IntoBytes;

use crate::error::Result;
use crate::protocol::packet::{MAX_PAYLOAD_LENGTH, PacketHeader, split_frame};

/// Frame-level access to the server byte stream
///
/// Frames are complete logical messages: a payload spread over several
/// `0xFFFFFF`-byte packets is reassembled on read and split on write.
#[auto_impl(&mut, Box)]
pub trait Transport {
    /// Read the next frame into `buffer`, returning the sequence id of its last packet
    fn read_frame(&mut self, buffer: &mut Vec<u8>) -> Result<u8>;

    /// Write one frame starting at `sequence_id`
    fn write_frame(&mut self, sequence_id: u8, payload: &[u8]) -> Result<()>;

    fn flush(&mut self) -> Result<()>;

    /// Sequence id of the last packet read or written
    fn last_sequence_id(&self) -> u8;
}

/// `Transport` over any blocking byte stream
pub struct PacketStream<S: Read + Write> {
    stream: BufReader<S>,
    last_sequence_id: u8,
    /// Reusable buffer for building outgoing packets (reduces heap allocations)
    write_buffer: Vec<u8>,
}

impl<S: Read + Write> PacketStream<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
            last_sequence_id: 0,
            write_buffer: Vec::new(),
        }
    }

    pub fn get_ref(&self) -> &S {
        self.stream.get_ref()
    }

    pub fn get_mut(&mut self) -> &mut S {
        self.stream.get_mut()
    }

    pub fn into_inner(self) -> S {
        self.stream.into_inner()
    }

    fn read_header(&mut self) -> Result<(usize, u8)> {
        let mut header = [0u8; 4];
        self.stream.read_exact(&mut header)?;
        let header = PacketHeader::from_bytes(&header)?;
        Ok((header.length(), header.sequence_id))
    }
}

impl<S: Read + Write> Transport for PacketStream<S> {
    #[tracing::instrument(skip_all)]
    fn read_frame(&mut self, buffer: &mut Vec<u8>) -> Result<u8> {
        buffer.clear();
        loop {
            let (length, sequence_id) = self.read_header()?;
            let start = buffer.len();
            buffer.resize(start + length, 0);
            self.stream.read_exact(&mut buffer[start..])?;
            self.last_sequence_id = sequence_id;
            if length < MAX_PAYLOAD_LENGTH {
                break;
            }
        }
        trace!(len = buffer.len(), seq = self.last_sequence_id, "read frame");
        Ok(self.last_sequence_id)
    }

    #[tracing::instrument(skip_all)]
    fn write_frame(&mut self, sequence_id: u8, payload: &[u8]) -> Result<()> {
        self.write_buffer.clear();
        for (header, chunk) in split_frame(sequence_id, payload) {
            self.write_buffer.extend_from_slice(header.as_bytes());
            self.write_buffer.extend_from_slice(chunk);
            self.last_sequence_id = header.sequence_id;
        }
        self.stream.get_mut().write_all(&self.write_buffer)?;
        trace!(len = payload.len(), seq = sequence_id, "wrote frame");
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.stream.get_mut().flush()?;
        Ok(())
    }

    fn last_sequence_id(&self) -> u8 {
        self.last_sequence_id
    }
}
