use std::sync::Arc;

use tracing::debug;

use crate::col::ColumnDefinition;
use crate::error::{Error, Result};
use crate::materialize::{FromCell, MaterializeOptions, materialize};
use crate::protocol::response::OkPayload;
use crate::protocol::{Located, RowDecoder, RowProtocol};
use crate::value::Value;

use super::conn::{Conn, ConnState, Fetched, ResultHeader, Spill, StreamToken};
use super::stream::Transport;

/// Direction a result set may be navigated in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollType {
    /// Only `next`; with a positive fetch size rows are streamed in batches
    #[default]
    ForwardOnly,
    /// Every row is buffered and navigation is free
    ScrollInsensitive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CursorOptions {
    /// Rows per streamed batch; 0 buffers the whole result
    pub fetch_size: usize,
    pub scroll: ScrollType,
}

/// Last located column, reused while the buffer and the row are unchanged
#[derive(Debug, Clone, Copy)]
struct ResumeCache {
    generation: u64,
    row: usize,
    located: Located,
}

/// A cursor over the rows of one result.
///
/// A forward-only result with a positive fetch size streams: it holds at
/// most one batch and occupies the connection's streaming slot until its
/// end frame is read. Otherwise every row is read when the result opens.
///
/// Columns are 1-based. A value is located lazily when accessed; reading
/// columns left to right continues the walk where the previous access ended.
#[derive(Debug)]
pub struct ResultSet<T> {
    conn: Option<Conn<T>>,
    columns: Vec<ColumnDefinition>,
    protocol: RowProtocol,
    options: MaterializeOptions,
    scroll: ScrollType,
    fetch_size: usize,
    rows: Vec<Vec<u8>>,
    /// -1 before the first row, `rows.len()` after the last
    row_pointer: isize,
    /// Rows dropped by earlier batches
    discarded: usize,
    /// Bumped whenever `rows` is refilled
    generation: u64,
    streaming: bool,
    /// Slot identity while the stream is still on the wire
    token: Option<Arc<StreamToken>>,
    exhausted: bool,
    warnings: u16,
    ok: Option<OkPayload>,
    closed: bool,
    last_was_null: bool,
    resume: Option<ResumeCache>,
}

fn index(len: usize) -> isize {
    isize::try_from(len).unwrap_or(isize::MAX)
}

fn forward_only() -> Error {
    Error::Unsupported("Invalid operation on a forward-only streaming result set".to_string())
}

impl<T> ResultSet<T> {
    fn empty(
        conn: Option<Conn<T>>,
        protocol: RowProtocol,
        cursor: CursorOptions,
        options: MaterializeOptions,
    ) -> Self {
        Self {
            conn,
            columns: Vec::new(),
            protocol,
            options,
            scroll: cursor.scroll,
            fetch_size: cursor.fetch_size,
            rows: Vec::new(),
            row_pointer: -1,
            discarded: 0,
            generation: 0,
            streaming: false,
            token: None,
            exhausted: false,
            warnings: 0,
            ok: None,
            closed: false,
            last_was_null: false,
            resume: None,
        }
    }

    /// A buffered result set over rows read elsewhere, e.g. binary rows of a
    /// prepared statement execution
    pub fn from_rows(
        columns: Vec<ColumnDefinition>,
        rows: Vec<Vec<u8>>,
        protocol: RowProtocol,
        options: MaterializeOptions,
    ) -> Self {
        let mut rs = Self::empty(
            None,
            protocol,
            CursorOptions {
                fetch_size: 0,
                scroll: ScrollType::ScrollInsensitive,
            },
            options,
        );
        rs.columns = columns;
        rs.rows = rows;
        rs.generation = 1;
        rs.exhausted = true;
        rs
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn protocol(&self) -> RowProtocol {
        self.protocol
    }

    pub fn scroll_type(&self) -> ScrollType {
        self.scroll
    }

    /// Affected rows of a command that returned no rows
    pub fn affected_rows(&self) -> Option<u64> {
        self.ok.as_ref().map(|ok| ok.affected_rows)
    }

    pub fn last_insert_id(&self) -> Option<u64> {
        self.ok.as_ref().map(|ok| ok.last_insert_id)
    }

    /// Warning count of the end frame, once read
    pub fn warnings(&self) -> u16 {
        self.warnings
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Rows currently held in memory
    pub fn buffered_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn fetch_size(&self) -> usize {
        self.fetch_size
    }

    /// The last value read was SQL NULL
    pub fn was_null(&self) -> bool {
        self.last_was_null
    }

    fn size(&self) -> isize {
        index(self.rows.len())
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::InvalidParameter(
                "Operation not permit on a closed resultset".to_string(),
            ));
        }
        Ok(())
    }

    fn check_scrollable(&self) -> Result<()> {
        self.check_open()?;
        if self.streaming {
            return Err(forward_only());
        }
        Ok(())
    }

    /// Move before the first row
    pub fn before_first(&mut self) -> Result<()> {
        self.check_scrollable()?;
        self.row_pointer = -1;
        Ok(())
    }

    /// Move after the last row
    pub fn after_last(&mut self) -> Result<()> {
        self.check_scrollable()?;
        self.row_pointer = self.size();
        Ok(())
    }

    pub fn first(&mut self) -> Result<bool> {
        self.check_scrollable()?;
        self.row_pointer = 0;
        Ok(!self.rows.is_empty())
    }

    pub fn last(&mut self) -> Result<bool> {
        self.check_scrollable()?;
        self.row_pointer = self.size() - 1;
        Ok(!self.rows.is_empty())
    }

    pub fn previous(&mut self) -> Result<bool> {
        self.check_scrollable()?;
        if self.row_pointer > -1 {
            self.row_pointer -= 1;
            return Ok(self.row_pointer != -1);
        }
        Ok(false)
    }

    /// Move to the 1-based `row`; negative values count from the end.
    /// Out-of-range targets park the cursor before the first or after the
    /// last row and return `false`.
    pub fn absolute(&mut self, row: i64) -> Result<bool> {
        self.check_scrollable()?;
        let size = i64::try_from(self.rows.len()).unwrap_or(i64::MAX);
        let target = if row >= 0 { row - 1 } else { size + row };
        self.row_pointer = isize::try_from(target.clamp(-1, size)).unwrap_or(-1);
        Ok((0..size).contains(&target))
    }

    /// Move `rows` rows from the current position, stopping before the first
    /// or after the last row
    pub fn relative(&mut self, rows: i64) -> Result<bool> {
        self.check_scrollable()?;
        let size = i64::try_from(self.rows.len()).unwrap_or(i64::MAX);
        let current = i64::try_from(self.row_pointer).unwrap_or(-1);
        let target = current.saturating_add(rows);
        self.row_pointer = isize::try_from(target.clamp(-1, size)).unwrap_or(-1);
        Ok((0..size).contains(&target))
    }

    pub fn is_before_first(&self) -> Result<bool> {
        self.check_open()?;
        Ok(self.row_pointer == -1 && !self.rows.is_empty())
    }

    pub fn is_after_last(&self) -> Result<bool> {
        self.check_open()?;
        Ok(self.row_pointer >= self.size() && self.rows.len() + self.discarded > 0)
    }

    pub fn is_first(&self) -> Result<bool> {
        self.check_open()?;
        Ok(self.discarded == 0 && self.row_pointer == 0 && !self.rows.is_empty())
    }

    /// Current 1-based row number; 0 while streaming
    pub fn row(&self) -> Result<usize> {
        self.check_open()?;
        if self.streaming {
            return Ok(0);
        }
        Ok(usize::try_from(self.row_pointer + 1).unwrap_or(0))
    }

    /// 1-based index of the column labelled `label`, ignoring case.
    /// `table.column` and the original column name also match.
    pub fn find_column(&self, label: &str) -> Result<usize> {
        self.check_open()?;
        let by_name = self
            .columns
            .iter()
            .position(|col| col.name.eq_ignore_ascii_case(label));
        let by_table = || {
            let (table, name) = label.split_once('.')?;
            self.columns.iter().position(|col| {
                col.table.eq_ignore_ascii_case(table) && col.name.eq_ignore_ascii_case(name)
            })
        };
        let by_org_name = || {
            self.columns
                .iter()
                .position(|col| !col.org_name.is_empty() && col.org_name.eq_ignore_ascii_case(label))
        };
        by_name
            .or_else(by_table)
            .or_else(by_org_name)
            .map(|idx| idx + 1)
            .ok_or_else(|| Error::InvalidParameter(format!("No such column: {label}")))
    }

    /// Index of the current row, checked for column access
    fn current_row(&self) -> Result<usize> {
        self.check_open()?;
        if self.row_pointer < 0 {
            return Err(Error::InvalidParameter(
                "Current position is before the first row".to_string(),
            ));
        }
        if self.row_pointer >= self.size() {
            return Err(Error::InvalidParameter(
                "Current position is after the last row".to_string(),
            ));
        }
        usize::try_from(self.row_pointer).map_err(Error::from_debug)
    }

    /// Locate 1-based column `index` in the current row
    fn locate(&mut self, index: usize) -> Result<(usize, Located)> {
        let row = self.current_row()?;
        if index == 0 || index > self.columns.len() {
            return Err(Error::InvalidParameter(format!("No such column: {index}")));
        }
        let column = index - 1;
        let decoder = RowDecoder::new(self.protocol, &self.columns);

        let resume = match self.resume {
            Some(cache) if cache.generation == self.generation && cache.row == row => {
                if cache.located.column() == column {
                    return Ok((row, cache.located));
                }
                if cache.located.column() < column {
                    cache.located.resume_point()
                } else {
                    decoder.start()
                }
            }
            _ => decoder.start(),
        };

        let located = decoder.locate(&self.rows[row], column, resume)?;
        self.resume = Some(ResumeCache {
            generation: self.generation,
            row,
            located,
        });
        Ok((row, located))
    }

    /// Read 1-based column `index` of the current row as `V`; `None` is SQL NULL
    pub fn get<V: FromCell>(&mut self, index: usize) -> Result<Option<V>> {
        let (row, located) = self.locate(index)?;
        let value = materialize(
            &self.rows[row],
            &located,
            &self.columns[index - 1],
            self.protocol,
            &self.options,
        )?;
        self.last_was_null = value.is_none();
        Ok(value)
    }

    /// Read 1-based column `index` as the `Value` its column type maps to
    pub fn get_value(&mut self, index: usize) -> Result<Value> {
        Ok(self.get::<Value>(index)?.unwrap_or(Value::Null))
    }

    pub fn get_by_name<V: FromCell>(&mut self, label: &str) -> Result<Option<V>> {
        let index = self.find_column(label)?;
        self.get(index)
    }

    /// Take over rows another command drained on this cursor's behalf
    fn absorb(&mut self, spill: Spill) -> Result<()> {
        debug!(rows = spill.rows.len(), "absorbing drained rows");
        self.rows.extend(spill.rows);
        self.streaming = false;
        self.exhausted = true;
        self.token = None;
        match spill.end {
            Ok(warnings) => {
                self.warnings = warnings;
                Ok(())
            }
            Err(err) => Err(Error::ServerError(err)),
        }
    }
}

impl<T: Transport> ResultSet<T> {
    /// Build the cursor answering a command whose header was just read
    pub(crate) fn open(
        conn: Conn<T>,
        state: &mut ConnState<T>,
        header: ResultHeader,
        protocol: RowProtocol,
        cursor: CursorOptions,
    ) -> Result<Self> {
        let options = *conn.materialize_options();
        let mut rs = Self::empty(Some(conn), protocol, cursor, options);
        match header {
            ResultHeader::Ok(ok) => {
                rs.warnings = ok.warnings;
                rs.ok = Some(ok);
                rs.exhausted = true;
            }
            ResultHeader::Columns(columns) => {
                rs.columns = columns;
                if cursor.scroll == ScrollType::ForwardOnly && cursor.fetch_size > 0 {
                    let token = Arc::new(StreamToken::default());
                    state.register_active_stream(&token)?;
                    rs.token = Some(token);
                    rs.streaming = true;
                    rs.pull(state, Some(cursor.fetch_size))?;
                } else {
                    rs.warnings = state
                        .read_all_rows(&mut rs.rows)
                        .map_err(|err| state.fail(err))?;
                    rs.generation = 1;
                    rs.exhausted = true;
                }
            }
        }
        Ok(rs)
    }

    /// Append up to `limit` streamed rows to the buffer
    fn pull(&mut self, state: &mut ConnState<T>, limit: Option<usize>) -> Result<()> {
        let Some(token) = self.token.clone() else {
            self.exhausted = true;
            return Ok(());
        };
        let before = self.rows.len();
        self.generation += 1;
        match state.fetch_rows(&token, &mut self.rows, limit) {
            Ok(Fetched::Partial) => {}
            Ok(Fetched::End { warnings }) => {
                self.warnings = warnings;
                self.exhausted = true;
                self.token = None;
            }
            Ok(Fetched::Spilled(spill)) => return self.absorb(spill),
            Err(err) => {
                self.exhausted = true;
                self.token = None;
                return Err(state.fail(err));
            }
        }
        debug!(rows = self.rows.len() - before, exhausted = self.exhausted, "fetched batch");
        Ok(())
    }

    /// Fetch the next batch. `keep_current` keeps the current row (moved to
    /// index 0) in front of the new rows.
    fn fetch_batch(&mut self, keep_current: bool) -> Result<()> {
        let Some(conn) = self.conn.clone() else {
            self.exhausted = true;
            return Ok(());
        };
        let mut state = conn.lock()?;
        let keep_from = match usize::try_from(self.row_pointer) {
            Ok(current) if keep_current => current.min(self.rows.len()),
            _ => self.rows.len(),
        };
        self.rows.drain(..keep_from);
        self.discarded += keep_from;
        self.resume = None;
        // the pointer must match the new buffer even when the fetch fails
        self.row_pointer = if keep_current && !self.rows.is_empty() { 0 } else { -1 };
        let fetch_size = self.fetch_size;
        self.pull(&mut state, Some(fetch_size))
    }

    /// Advance to the next row; `false` once past the last row
    pub fn next(&mut self) -> Result<bool> {
        self.check_open()?;
        if self.row_pointer < self.size() - 1 {
            self.row_pointer += 1;
            return Ok(true);
        }
        if self.streaming && !self.exhausted {
            self.fetch_batch(false)?;
            self.row_pointer = 0;
            return Ok(!self.rows.is_empty());
        }
        self.row_pointer = self.size();
        Ok(false)
    }

    /// On the last row. A streaming cursor on the last row of its batch reads
    /// ahead to find out.
    pub fn is_last(&mut self) -> Result<bool> {
        self.check_open()?;
        let last = self.size() - 1;
        if self.streaming && !self.exhausted && self.row_pointer == last && last >= 0 {
            self.fetch_batch(true)?;
        }
        Ok(self.exhausted && self.row_pointer == self.size() - 1 && !self.rows.is_empty())
    }

    /// Read every remaining row into the buffer and stop streaming
    pub fn fetch_remaining(&mut self) -> Result<()> {
        self.check_open()?;
        if self.streaming && !self.exhausted {
            if let Some(conn) = self.conn.clone() {
                let mut state = conn.lock()?;
                self.pull(&mut state, None)?;
            }
        }
        self.streaming = false;
        Ok(())
    }

    /// Change the batch size of later fetches; 0 on a streaming cursor reads
    /// everything now
    pub fn set_fetch_size(&mut self, fetch_size: usize) -> Result<()> {
        self.check_open()?;
        if self.streaming && fetch_size == 0 {
            self.fetch_remaining()?;
        }
        self.fetch_size = fetch_size;
        Ok(())
    }

    /// Close the cursor. A cursor still streaming drains its frames, and the
    /// results pending behind them, while holding the connection lock.
    #[tracing::instrument(skip_all)]
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.rows.clear();
        self.resume = None;
        let (Some(conn), Some(token)) = (self.conn.as_ref(), self.token.take()) else {
            return Ok(());
        };
        let mut state = conn.lock()?;
        state.close_stream(&token).map_err(|err| state.fail(err))
    }
}
