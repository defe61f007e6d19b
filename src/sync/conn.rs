use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tracing::{debug, warn};

use crate::Opts;
use crate::col::ColumnDefinition;
use crate::constant::{CapabilityFlags, ServerStatusFlags};
use crate::error::{Error, Result, eyre};
use crate::materialize::MaterializeOptions;
use crate::protocol::RowProtocol;
use crate::protocol::command::ColumnDefinitionBytes;
use crate::protocol::command::query::{QueryResponse, read_query_response, write_query};
use crate::protocol::command::resultset::{RowFrame, read_row_frame};
use crate::protocol::command::utility::{write_ping, write_quit};
use crate::protocol::connection::{Handshake, HandshakeConfig, HandshakeResult, RedirectionInfo};
use crate::protocol::response::{ErrPayload, ErrPayloadBytes, OkPayload, OkPayloadBytes, read_eof_packet};

use super::resultset::{CursorOptions, ResultSet};
use super::stream::Transport;

/// Rows a preempted streaming cursor had not read yet, and how its stream ended
#[derive(Debug)]
pub(crate) struct Spill {
    pub rows: Vec<Vec<u8>>,
    /// Warning count of the end frame, or the error that ended the stream
    pub end: std::result::Result<u16, ErrPayload>,
}

/// Identity of a streaming cursor. The connection holds it weakly in its
/// active slot; the cursor holds the only strong reference.
#[derive(Debug, Default)]
pub(crate) struct StreamToken {
    spill: Mutex<Option<Spill>>,
}

impl StreamToken {
    fn put_spill(&self, spill: Spill) -> Result<()> {
        *self.spill.lock().map_err(Error::from_debug)? = Some(spill);
        Ok(())
    }

    pub(crate) fn take_spill(&self) -> Result<Option<Spill>> {
        Ok(self.spill.lock().map_err(Error::from_debug)?.take())
    }
}

/// First frames of a command response
#[derive(Debug)]
pub(crate) enum ResultHeader {
    Ok(OkPayload),
    Columns(Vec<ColumnDefinition>),
}

#[derive(Debug)]
pub(crate) enum StreamFrame {
    Row(Vec<u8>),
    End { warnings: u16 },
}

/// Outcome of one fetch by a streaming cursor
#[derive(Debug)]
pub(crate) enum Fetched {
    /// The limit was reached before the end frame
    Partial,
    End { warnings: u16 },
    /// Another command drained the stream into the cursor's token
    Spilled(Spill),
}

/// Wire state behind the connection lock
#[derive(Debug)]
pub struct ConnState<T> {
    transport: T,
    read_buffer: Vec<u8>,
    write_buffer: Vec<u8>,
    /// An end or OK frame announced another result of the same command
    pending_results: bool,
    active_stream: Option<Weak<StreamToken>>,
    /// A framing or IO failure left the byte stream unusable
    broken: bool,
}

impl<T: Transport> ConnState<T> {
    fn new(transport: T) -> Self {
        Self {
            transport,
            read_buffer: Vec::new(),
            write_buffer: Vec::new(),
            pending_results: false,
            active_stream: None,
            broken: false,
        }
    }

    pub fn has_pending_results(&self) -> bool {
        self.pending_results
    }

    pub(crate) fn register_active_stream(&mut self, token: &Arc<StreamToken>) -> Result<()> {
        if self
            .active_stream
            .as_ref()
            .is_some_and(|slot| slot.strong_count() > 0)
        {
            return Err(Error::LibraryBug(eyre!(
                "a streaming result set is already active"
            )));
        }
        self.active_stream = Some(Arc::downgrade(token));
        Ok(())
    }

    pub(crate) fn clear_active_stream(&mut self) {
        self.active_stream = None;
    }

    pub(crate) fn is_active_stream(&self, token: &Arc<StreamToken>) -> bool {
        self.active_stream
            .as_ref()
            .is_some_and(|slot| std::ptr::eq(slot.as_ptr(), Arc::as_ptr(token)))
    }

    /// Read the frames of the active stream so the wire is free for a new
    /// command. A live cursor receives its rows through its token; rows of a
    /// dropped cursor are discarded.
    #[tracing::instrument(skip_all)]
    pub(crate) fn drain_active_stream(&mut self) -> Result<()> {
        let Some(slot) = self.active_stream.take() else {
            return Ok(());
        };
        match slot.upgrade() {
            Some(token) => {
                let mut rows = Vec::new();
                let end = loop {
                    match self.read_stream_frame() {
                        Ok(StreamFrame::Row(row)) => rows.push(row),
                        Ok(StreamFrame::End { warnings }) => break Ok(warnings),
                        Err(Error::ServerError(err)) => break Err(err),
                        Err(err) => return Err(err),
                    }
                };
                debug!(rows = rows.len(), "spilled active stream");
                token.put_spill(Spill { rows, end })?;
            }
            None => {
                self.skip_rows()?;
                debug!("discarded rows of a dropped stream");
            }
        }
        Ok(())
    }

    /// Read and discard every result still announced by the last end frame
    #[tracing::instrument(skip_all)]
    pub(crate) fn drain_pending_results(&mut self) -> Result<()> {
        while self.pending_results {
            debug!("draining pending result");
            match self.read_result_header()? {
                ResultHeader::Ok(_) => {}
                ResultHeader::Columns(_) => {
                    self.skip_rows()?;
                }
            }
        }
        Ok(())
    }

    /// Make the wire ready for a new command. An ERR read while draining ends
    /// the exchange and is returned in place of running the command.
    fn begin_command(&mut self) -> Result<()> {
        if self.broken {
            return Err(Error::IoError(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "connection is broken",
            )));
        }
        let drained = self
            .drain_active_stream()
            .and_then(|()| self.drain_pending_results());
        match drained {
            Ok(()) => Ok(()),
            Err(Error::ServerError(err)) => {
                warn!(%err, "pending result failed while draining");
                self.pending_results = false;
                Err(Error::ServerError(err))
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Record `err` and hand it back; framing and IO errors break the connection
    pub(crate) fn fail(&mut self, err: Error) -> Error {
        if err.is_conn_broken() {
            warn!(%err, "connection broken");
            self.broken = true;
            self.active_stream = None;
            self.pending_results = false;
        }
        err
    }

    fn write_command(&mut self, build: impl FnOnce(&mut Vec<u8>)) -> Result<()> {
        self.write_buffer.clear();
        build(&mut self.write_buffer);
        self.transport.write_frame(0, &self.write_buffer)?;
        self.transport.flush()
    }

    /// Read a frame that must be OK or ERR
    fn read_ok(&mut self) -> Result<OkPayload> {
        self.transport.read_frame(&mut self.read_buffer)?;
        match self.read_buffer.first() {
            Some(0xFF) => Err(ErrPayloadBytes(&self.read_buffer).into()),
            _ => OkPayload::try_from(OkPayloadBytes(&self.read_buffer)),
        }
    }

    /// Read the OK frame or the column definitions that answer a command
    pub(crate) fn read_result_header(&mut self) -> Result<ResultHeader> {
        self.transport.read_frame(&mut self.read_buffer)?;
        let column_count = match read_query_response(&self.read_buffer) {
            Ok(QueryResponse::Ok(bytes)) => {
                let ok = OkPayload::try_from(bytes)?;
                self.pending_results = ok
                    .status_flags
                    .contains(ServerStatusFlags::SERVER_MORE_RESULTS_EXISTS);
                return Ok(ResultHeader::Ok(ok));
            }
            Ok(QueryResponse::ResultSet { column_count }) => column_count,
            Err(Error::Unsupported(msg)) => {
                // decline LOCAL INFILE with an empty file
                self.pending_results = false;
                let seq = self.transport.last_sequence_id().wrapping_add(1);
                self.transport.write_frame(seq, &[])?;
                self.transport.flush()?;
                let ok = self.read_ok()?;
                self.pending_results = ok
                    .status_flags
                    .contains(ServerStatusFlags::SERVER_MORE_RESULTS_EXISTS);
                return Err(Error::Unsupported(msg));
            }
            Err(err) => {
                self.pending_results = false;
                return Err(err);
            }
        };

        let mut columns = Vec::with_capacity(column_count);
        for _ in 0..column_count {
            self.transport.read_frame(&mut self.read_buffer)?;
            columns.push(ColumnDefinition::try_from(ColumnDefinitionBytes(
                &self.read_buffer,
            ))?);
        }
        self.transport.read_frame(&mut self.read_buffer)?;
        read_eof_packet(&self.read_buffer)?;
        Ok(ResultHeader::Columns(columns))
    }

    /// Read one frame of a row stream into an owned buffer
    pub(crate) fn read_stream_frame(&mut self) -> Result<StreamFrame> {
        let mut row = Vec::new();
        self.transport.read_frame(&mut row)?;
        let end = match read_row_frame(&row) {
            Ok(RowFrame::Row) => None,
            Ok(RowFrame::End(eof)) => Some((eof.warnings(), eof.more_results())),
            Err(err) => {
                self.pending_results = false;
                return Err(err);
            }
        };
        match end {
            None => Ok(StreamFrame::Row(row)),
            Some((warnings, more_results)) => {
                self.pending_results = more_results;
                Ok(StreamFrame::End { warnings })
            }
        }
    }

    /// Read and discard rows up to the end frame, returning its warning count
    pub(crate) fn skip_rows(&mut self) -> Result<u16> {
        loop {
            self.transport.read_frame(&mut self.read_buffer)?;
            match read_row_frame(&self.read_buffer) {
                Ok(RowFrame::Row) => {}
                Ok(RowFrame::End(eof)) => {
                    self.pending_results = eof.more_results();
                    return Ok(eof.warnings());
                }
                Err(err) => {
                    self.pending_results = false;
                    return Err(err);
                }
            }
        }
    }

    /// Read every remaining row into `rows`
    pub(crate) fn read_all_rows(&mut self, rows: &mut Vec<Vec<u8>>) -> Result<u16> {
        loop {
            match self.read_stream_frame()? {
                StreamFrame::Row(row) => rows.push(row),
                StreamFrame::End { warnings } => return Ok(warnings),
            }
        }
    }

    /// Read up to `limit` rows of the stream owned by `token`
    pub(crate) fn fetch_rows(
        &mut self,
        token: &Arc<StreamToken>,
        rows: &mut Vec<Vec<u8>>,
        limit: Option<usize>,
    ) -> Result<Fetched> {
        if !self.is_active_stream(token) {
            return match token.take_spill()? {
                Some(spill) => Ok(Fetched::Spilled(spill)),
                None => Err(Error::LibraryBug(eyre!(
                    "streaming result set is not the active stream"
                ))),
            };
        }
        let mut loaded = 0;
        while limit.is_none_or(|limit| loaded < limit) {
            match self.read_stream_frame() {
                Ok(StreamFrame::Row(row)) => {
                    rows.push(row);
                    loaded += 1;
                }
                Ok(StreamFrame::End { warnings }) => {
                    self.clear_active_stream();
                    return Ok(Fetched::End { warnings });
                }
                Err(err) => {
                    self.clear_active_stream();
                    return Err(err);
                }
            }
        }
        Ok(Fetched::Partial)
    }

    /// Give up the stream owned by `token`: its remaining frames and the
    /// results pending behind them are read and discarded
    pub(crate) fn close_stream(&mut self, token: &Arc<StreamToken>) -> Result<()> {
        let _ = token.take_spill()?;
        if !self.is_active_stream(token) {
            return Ok(());
        }
        self.clear_active_stream();
        self.skip_rows()?;
        self.drain_pending_results()
    }
}

/// Immutable facts learned during the handshake
#[derive(Debug)]
struct ConnInfo {
    server_version: String,
    connection_id: u32,
    capability_flags: CapabilityFlags,
    status_flags: ServerStatusFlags,
    redirection: Option<RedirectionInfo>,
    materialize_options: MaterializeOptions,
    default_fetch_size: usize,
}

/// A synchronous MySQL connection.
///
/// Cloning is cheap and shares the same wire; every operation that touches
/// the wire holds the connection lock for its whole duration. At most one
/// streaming result set is active at a time: any new command first drains it.
#[derive(Debug)]
pub struct Conn<T> {
    state: Arc<Mutex<ConnState<T>>>,
    info: Arc<ConnInfo>,
}

impl<T> Clone for Conn<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            info: Arc::clone(&self.info),
        }
    }
}

impl<T: Transport> Conn<T> {
    /// Authenticate over `transport`, which must be positioned at the server's
    /// initial handshake
    #[tracing::instrument(skip_all)]
    pub fn connect(mut transport: T, opts: &Opts) -> Result<Self> {
        opts.validate()?;
        let mut handshake = Handshake::new(HandshakeConfig::from(opts));
        let mut buffer = Vec::new();
        transport.read_frame(&mut buffer)?;

        let (capability_flags, initial_handshake, ok) = loop {
            match handshake.drive(&buffer)? {
                HandshakeResult::Write(data) => {
                    let seq = transport.last_sequence_id().wrapping_add(1);
                    transport.write_frame(seq, &data)?;
                    transport.flush()?;
                    transport.read_frame(&mut buffer)?;
                }
                HandshakeResult::Read => {
                    transport.read_frame(&mut buffer)?;
                }
                HandshakeResult::Connected {
                    capability_flags,
                    initial_handshake,
                    ok,
                } => break (capability_flags, initial_handshake, ok),
            }
        };

        let redirection = RedirectionInfo::parse(&ok.info)?;
        if let Some(redirection) = &redirection {
            debug!(host = %redirection.host, port = redirection.port, "server sent a redirection hint");
        }

        let conn = Self::with_info(
            transport,
            ConnInfo {
                server_version: initial_handshake.server_version,
                connection_id: initial_handshake.connection_id,
                capability_flags,
                status_flags: ok.status_flags,
                redirection,
                materialize_options: opts.materialize_options(),
                default_fetch_size: opts.default_fetch_size,
            },
        );
        if let Some(init_command) = &opts.init_command {
            conn.query_drop(init_command)?;
        }
        Ok(conn)
    }

    /// Wrap a transport whose session is already authenticated
    pub fn from_transport(transport: T, opts: &Opts) -> Result<Self> {
        opts.validate()?;
        Ok(Self::with_info(
            transport,
            ConnInfo {
                server_version: String::new(),
                connection_id: 0,
                capability_flags: opts.capabilities,
                status_flags: ServerStatusFlags::empty(),
                redirection: None,
                materialize_options: opts.materialize_options(),
                default_fetch_size: opts.default_fetch_size,
            },
        ))
    }

    fn with_info(transport: T, info: ConnInfo) -> Self {
        Self {
            state: Arc::new(Mutex::new(ConnState::new(transport))),
            info: Arc::new(info),
        }
    }

    pub fn server_version(&self) -> &str {
        &self.info.server_version
    }

    pub fn connection_id(&self) -> u32 {
        self.info.connection_id
    }

    /// Get the negotiated capability flags
    pub fn capability_flags(&self) -> CapabilityFlags {
        self.info.capability_flags
    }

    /// Server status flags of the final handshake OK frame
    pub fn status_flags(&self) -> ServerStatusFlags {
        self.info.status_flags
    }

    /// Redirection hint of the final handshake OK frame
    pub fn redirection(&self) -> Option<&RedirectionInfo> {
        self.info.redirection.as_ref()
    }

    pub fn materialize_options(&self) -> &MaterializeOptions {
        &self.info.materialize_options
    }

    /// Acquire the wire lock
    pub fn lock(&self) -> Result<MutexGuard<'_, ConnState<T>>> {
        self.state
            .lock()
            .map_err(|_| Error::LibraryBug(eyre!("connection lock poisoned")))
    }

    /// Execute a text protocol SQL query with the default fetch size
    pub fn query(&self, sql: &str) -> Result<ResultSet<T>> {
        self.query_with(
            sql,
            CursorOptions {
                fetch_size: self.info.default_fetch_size,
                ..Default::default()
            },
        )
    }

    /// Execute a text protocol SQL query
    #[tracing::instrument(skip_all)]
    pub fn query_with(&self, sql: &str, options: CursorOptions) -> Result<ResultSet<T>> {
        let mut state = self.lock()?;
        state.begin_command()?;
        let header = state
            .write_command(|out| write_query(out, sql))
            .and_then(|()| state.read_result_header())
            .map_err(|err| state.fail(err))?;
        ResultSet::open(self.clone(), &mut state, header, RowProtocol::Text, options)
    }

    /// Execute a text protocol SQL query and discard every result
    pub fn query_drop(&self, sql: &str) -> Result<()> {
        let mut state = self.lock()?;
        state.begin_command()?;
        let result = state
            .write_command(|out| write_query(out, sql))
            .and_then(|()| loop {
                if let ResultHeader::Columns(_) = state.read_result_header()? {
                    state.skip_rows()?;
                }
                if !state.has_pending_results() {
                    break Ok(());
                }
            });
        result.map_err(|err| state.fail(err))
    }

    /// Send a ping to the server to check if the connection is alive
    pub fn ping(&self) -> Result<()> {
        let mut state = self.lock()?;
        state.begin_command()?;
        let result = state
            .write_command(write_ping)
            .and_then(|()| state.read_ok());
        result.map(|_ok| ()).map_err(|err| state.fail(err))
    }

    /// Send COM_QUIT. Every later command on this connection or its clones fails.
    pub fn disconnect(&self) -> Result<()> {
        let mut state = self.lock()?;
        if state.broken {
            return Ok(());
        }
        state.active_stream = None;
        state.pending_results = false;
        state.broken = true;
        state.write_command(write_quit)
    }

    /// Another result of the last command is waiting to be read
    pub fn more_results(&self) -> Result<bool> {
        Ok(self.lock()?.has_pending_results())
    }

    /// Read the next result of a multi-statement command. A still-streaming
    /// result set of the same command first receives its remaining rows.
    #[tracing::instrument(skip_all)]
    pub fn next_result(&self, options: CursorOptions) -> Result<Option<ResultSet<T>>> {
        let mut state = self.lock()?;
        state.drain_active_stream().map_err(|err| state.fail(err))?;
        if !state.has_pending_results() {
            return Ok(None);
        }
        let header = state.read_result_header().map_err(|err| state.fail(err))?;
        ResultSet::open(self.clone(), &mut state, header, RowProtocol::Text, options).map(Some)
    }
}
