//! Scripted server for driving a connection without a MySQL instance
#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use zero_mysql_cursor::col::ColumnDefinition;
use zero_mysql_cursor::constant::{ColumnType, ServerStatusFlags};
use zero_mysql_cursor::error::{Error, Result};
use zero_mysql_cursor::protocol::command::column_definition::write_column_definition;
use zero_mysql_cursor::protocol::primitive::{write_bytes_lenenc, write_int_lenenc};
use zero_mysql_cursor::sync::{Conn, Transport};
use zero_mysql_cursor::Opts;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Frames the server will send, and frames the client wrote
#[derive(Debug, Clone, Default)]
pub struct Script {
    reads: Arc<Mutex<VecDeque<Vec<u8>>>>,
    writes: Arc<Mutex<Vec<(u8, Vec<u8>)>>>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, frame: Vec<u8>) -> &Self {
        self.reads.lock().unwrap().push_back(frame);
        self
    }

    pub fn extend(&self, frames: impl IntoIterator<Item = Vec<u8>>) -> &Self {
        self.reads.lock().unwrap().extend(frames);
        self
    }

    /// Frames not read by the client yet
    pub fn unread(&self) -> usize {
        self.reads.lock().unwrap().len()
    }

    /// (sequence id, payload) of every frame written so far
    pub fn writes(&self) -> Vec<(u8, Vec<u8>)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn transport(&self) -> ScriptedTransport {
        ScriptedTransport {
            script: self.clone(),
            // the first frame read carries sequence id 0
            last_sequence_id: u8::MAX,
        }
    }

    pub fn conn(&self) -> Conn<ScriptedTransport> {
        Conn::from_transport(self.transport(), &Opts::default()).unwrap()
    }
}

#[derive(Debug)]
pub struct ScriptedTransport {
    script: Script,
    last_sequence_id: u8,
}

impl Transport for ScriptedTransport {
    fn read_frame(&mut self, buffer: &mut Vec<u8>) -> Result<u8> {
        let frame = self.script.reads.lock().unwrap().pop_front().ok_or_else(|| {
            Error::IoError(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "script exhausted",
            ))
        })?;
        buffer.clear();
        buffer.extend_from_slice(&frame);
        self.last_sequence_id = self.last_sequence_id.wrapping_add(1);
        Ok(self.last_sequence_id)
    }

    fn write_frame(&mut self, sequence_id: u8, payload: &[u8]) -> Result<()> {
        self.last_sequence_id = sequence_id;
        self.script
            .writes
            .lock()
            .unwrap()
            .push((sequence_id, payload.to_vec()));
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn last_sequence_id(&self) -> u8 {
        self.last_sequence_id
    }
}

pub fn ok(affected_rows: u64, last_insert_id: u64, status: ServerStatusFlags) -> Vec<u8> {
    let mut out = vec![0x00];
    write_int_lenenc(&mut out, affected_rows);
    write_int_lenenc(&mut out, last_insert_id);
    out.extend_from_slice(&status.bits().to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out
}

pub fn eof(warnings: u16, status: ServerStatusFlags) -> Vec<u8> {
    let mut out = vec![0xFE];
    out.extend_from_slice(&warnings.to_le_bytes());
    out.extend_from_slice(&status.bits().to_le_bytes());
    out
}

pub fn err(code: u16, sql_state: &str, message: &str) -> Vec<u8> {
    let mut out = vec![0xFF];
    out.extend_from_slice(&code.to_le_bytes());
    out.push(b'#');
    out.extend_from_slice(sql_state.as_bytes());
    out.extend_from_slice(message.as_bytes());
    out
}

pub fn text_row(cells: &[Option<&str>]) -> Vec<u8> {
    let mut out = Vec::new();
    for cell in cells {
        match cell {
            Some(text) => write_bytes_lenenc(&mut out, text.as_bytes()),
            None => out.push(0xFB),
        }
    }
    out
}

/// Header frames: column count, definitions and the classic EOF
pub fn header(columns: &[(&str, ColumnType)]) -> Vec<Vec<u8>> {
    let mut count = Vec::new();
    write_int_lenenc(&mut count, columns.len() as u64);
    let mut frames = vec![count];
    for (name, column_type) in columns {
        let mut frame = Vec::new();
        write_column_definition(&mut frame, &ColumnDefinition::new(*name, *column_type));
        frames.push(frame);
    }
    frames.push(eof(0, ServerStatusFlags::empty()));
    frames
}

/// A complete single-column BIGINT result holding `ids`
pub fn id_result(ids: impl IntoIterator<Item = i64>, status: ServerStatusFlags) -> Vec<Vec<u8>> {
    let mut frames = header(&[("id", ColumnType::MYSQL_TYPE_LONGLONG)]);
    for id in ids {
        frames.push(text_row(&[Some(&id.to_string())]));
    }
    frames.push(eof(0, status));
    frames
}
