//! The session: owns the transport, drives the handshake, serializes
//! commands under one mutex and classifies every inbound packet against the
//! set the current command allows.

use std::collections::VecDeque;
use std::io::BufReader;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use tracing::{debug, trace};

use crate::constant::{
    CapabilityFlags, CommandByte, Protocol, Refresh, StatusFlags, MAX_PACKET_SIZE,
};
use crate::error::{Error, Result};
use crate::opts::Opts;
use crate::protocol::command::{self, Field, QueryResponse};
use crate::protocol::handshake;
use crate::protocol::packet;
use crate::protocol::response::{self, EofPayload, OkPayload};
use crate::result::ResultSet;
use crate::row::Row;
use crate::scramble::{scramble_323, scramble_41};
use crate::stmt::Stmt;
use crate::stream::NetStream;

/// Lock a session, tolerating poisoning: the protocol state is explicit in
/// `ConnInner`, so a panicked holder leaves nothing half-updated that the
/// error paths don't already handle.
pub(crate) fn lock_inner(inner: &Mutex<ConnInner>) -> MutexGuard<'_, ConnInner> {
    match inner.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Result lifecycle inside the session slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResultMode {
    Unused,
    Stored,
    Used,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResultPhase {
    /// Field packets still on the wire
    Fields,
    /// Row packets on the wire
    Rows,
    /// Terminating EOF consumed
    Done,
}

/// The session's current-result slot. At most one exists per session; while
/// it does, no new command may start.
pub(crate) struct ActiveResult {
    pub(crate) id: u64,
    pub(crate) binary: bool,
    pub(crate) field_count: usize,
    pub(crate) fields: Arc<Vec<Field>>,
    pub(crate) phase: ResultPhase,
    pub(crate) mode: ResultMode,
    pub(crate) all_rows_read: bool,
}

pub(crate) struct ConnInner {
    opts: Opts,
    stream: Option<BufReader<NetStream>>,
    seq: u8,
    /// Whether the current command round has seen any response byte;
    /// gates the reconnect retry.
    observed: bool,
    protocol: Protocol,
    server_caps: CapabilityFlags,
    client_flags: CapabilityFlags,
    pub(crate) status: StatusFlags,
    charset: u8,
    server_version: String,
    /// Seed from the init packet; re-used by change-user auth
    scramble: Vec<u8>,
    pub(crate) connected: bool,
    /// Bumped on every reconnect; statements prepared under an older
    /// generation are invalid.
    pub(crate) generation: u64,
    pub(crate) affected_rows: u64,
    pub(crate) last_insert_id: u64,
    pub(crate) warning_count: u16,
    message: Option<String>,
    pub(crate) current: Option<ActiveResult>,
    result_counter: u64,
    /// Whether the most recent result-producing command used the binary row
    /// format; follow-up result sets of a multi-statement batch share it.
    last_binary: bool,
    buf: Vec<u8>,
}

impl ConnInner {
    fn new(opts: Opts) -> Self {
        Self {
            opts,
            stream: None,
            seq: 0,
            observed: false,
            protocol: Protocol::V41,
            server_caps: CapabilityFlags::empty(),
            client_flags: CapabilityFlags::empty(),
            status: StatusFlags::empty(),
            charset: 0,
            server_version: String::new(),
            scramble: Vec::new(),
            connected: false,
            generation: 0,
            affected_rows: 0,
            last_insert_id: 0,
            warning_count: 0,
            message: None,
            current: None,
            result_counter: 0,
            last_binary: false,
            buf: Vec::new(),
        }
    }

    // ─── Frame I/O ───────────────────────────────────────────────────────

    fn read_packet(&mut self) -> Result<()> {
        let mut seq = self.seq;
        let mut observed = self.observed;
        let mut buf = std::mem::take(&mut self.buf);

        let result = match self.stream.as_mut() {
            Some(stream) => packet::read_packet(stream, &mut seq, &mut buf, &mut observed),
            None => Err(Error::ServerLost),
        };

        self.seq = seq;
        self.observed = observed;
        self.buf = buf;
        result.map_err(|err| self.net_fail(err, false))
    }

    pub(crate) fn send(&mut self, payload: &[u8]) -> Result<()> {
        let mut seq = self.seq;
        let result = match self.stream.as_mut() {
            Some(stream) => packet::write_packet(stream.get_mut(), &mut seq, payload),
            None => Err(Error::ServerGone),
        };
        self.seq = seq;
        result.map_err(|err| self.net_fail(err, true))
    }

    /// Translate a transport fault into the stable taxonomy and terminate
    /// the session. Non-transport errors pass through.
    fn net_fail(&mut self, err: Error, writing: bool) -> Error {
        match err {
            Error::Io(_) => {
                let was_connected = self.connected;
                self.terminate();
                if !was_connected {
                    Error::HandshakeError
                } else if writing {
                    Error::ServerGone
                } else {
                    Error::ServerLost
                }
            }
            other => other,
        }
    }

    pub(crate) fn terminate(&mut self) {
        if let Some(stream) = &self.stream {
            stream.get_ref().shutdown();
        }
        self.stream = None;
        self.connected = false;
        self.current = None;
    }

    // ─── Handshake ───────────────────────────────────────────────────────

    fn dial_and_handshake(&mut self) -> Result<()> {
        let stream = NetStream::dial(&self.opts)?;
        self.stream = Some(BufReader::new(stream));
        self.seq = 0;
        self.observed = false;
        self.handshake()
    }

    fn handshake(&mut self) -> Result<()> {
        self.read_packet()?;
        if self.buf.first() == Some(&0xFF) {
            // Refused before auth (host blocked, too many connections)
            return Err(Error::Server(response::read_err(&self.buf, Protocol::V41)?));
        }

        let init = handshake::read_init(&self.buf).map_err(|_| Error::HandshakeError)?;
        let (protocol, flags) = handshake::negotiate(init.capabilities, self.opts.db.is_some());
        debug!(
            version = %init.server_version,
            ?protocol,
            "received init packet"
        );

        self.protocol = protocol;
        self.server_caps = init.capabilities;
        self.client_flags = flags;
        self.charset = self.opts.charset.unwrap_or(init.charset);
        self.server_version = init.server_version;
        self.scramble = init.scramble.clone();
        self.status = init.status;

        let password = self.opts.password.clone().unwrap_or_default();
        let mut payload = Vec::new();
        match protocol {
            Protocol::V41 => {
                let token = scramble_41(&init.scramble, &password);
                let db = if flags.contains(CapabilityFlags::CONNECT_WITH_DB) {
                    self.opts.db.as_deref()
                } else {
                    None
                };
                handshake::write_auth_41(
                    &mut payload,
                    flags,
                    MAX_PACKET_SIZE,
                    self.charset,
                    &self.opts.user,
                    &token,
                    db,
                );
            }
            Protocol::V40 => {
                let token = scramble_323(&init.scramble, &password);
                handshake::write_auth_40(
                    &mut payload,
                    flags,
                    MAX_PACKET_SIZE,
                    &self.opts.user,
                    &token,
                );
            }
        }
        self.send(&payload)?;

        self.read_packet()?;
        match self.buf.first() {
            Some(0x00) => {
                let ok = response::read_ok(&self.buf, self.protocol)?;
                self.apply_ok(&ok);
            }
            Some(0xFF) => {
                return Err(Error::Server(response::read_err(&self.buf, self.protocol)?));
            }
            Some(0xFE) if response::is_eof(&self.buf) => {
                // Server wants the pre-4.1 scramble instead.
                debug!("server requested old-password authentication");
                let token = scramble_323(&init.scramble, &password);
                let mut payload = Vec::new();
                handshake::write_old_password(&mut payload, &token);
                self.send(&payload)?;

                self.read_packet()?;
                match self.buf.first() {
                    Some(0x00) => {
                        let ok = response::read_ok(&self.buf, self.protocol)?;
                        self.apply_ok(&ok);
                    }
                    Some(0xFF) => {
                        return Err(Error::Server(response::read_err(
                            &self.buf,
                            self.protocol,
                        )?));
                    }
                    _ => return Err(Error::HandshakeError),
                }
            }
            _ => return Err(Error::HandshakeError),
        }

        self.connected = true;
        debug!("handshake complete");
        Ok(())
    }

    /// Close the transport, dial anew with the cached credentials and run
    /// the handshake again, up to the configured attempt count. Statement
    /// handles from the previous connection become invalid.
    fn reconnect(&mut self) -> Result<()> {
        self.terminate();
        let attempts = self.opts.reconnect_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.dial_and_handshake() {
                Ok(()) => break,
                Err(err) if attempt < attempts => {
                    trace!(%err, attempt, "reconnect attempt failed");
                    thread::sleep(self.opts.reconnect_delay);
                }
                Err(err) => return Err(err),
            }
        }
        self.generation += 1;
        debug!(generation = self.generation, "reconnected");
        Ok(())
    }

    // ─── Command Plumbing ────────────────────────────────────────────────

    /// Entry check for every command: the session must be connected and not
    /// hold a result. Resets the sequence for the new round-trip.
    pub(crate) fn begin_command(&mut self) -> Result<()> {
        if !self.connected {
            return Err(Error::ServerGone);
        }
        if self.current.is_some() {
            return Err(Error::CommandsOutOfSync);
        }
        self.seq = 0;
        self.observed = false;
        Ok(())
    }

    /// One command round-trip with the single reconnect retry: eligible only
    /// when the failure is a network fault and no response byte was seen.
    pub(crate) fn run_command<T>(
        &mut self,
        payload: &[u8],
        mut read: impl FnMut(&mut ConnInner) -> Result<T>,
    ) -> Result<T> {
        self.begin_command()?;
        match self.attempt(payload, &mut read) {
            Err(err) if self.opts.reconnect && err.is_network() && !self.observed => {
                debug!(%err, "network fault before any response byte; retrying once");
                self.reconnect()?;
                self.seq = 0;
                self.observed = false;
                self.attempt(payload, &mut read)
            }
            other => other,
        }
    }

    fn attempt<T>(
        &mut self,
        payload: &[u8],
        read: &mut impl FnMut(&mut ConnInner) -> Result<T>,
    ) -> Result<T> {
        self.send(payload)?;
        read(self)
    }

    fn apply_ok(&mut self, ok: &OkPayload) {
        self.affected_rows = ok.affected_rows;
        self.last_insert_id = ok.last_insert_id;
        self.warning_count = ok.warnings;
        self.message = ok.message.clone();
        self.status = ok.status;
    }

    fn apply_eof(&mut self, eof: &EofPayload) {
        if self.protocol == Protocol::V41 {
            self.warning_count = eof.warnings;
            self.status = eof.status;
        }
    }

    // ─── Response Readers ────────────────────────────────────────────────

    /// Read a response restricted to {OK, Error}.
    pub(crate) fn read_ok_response(&mut self) -> Result<()> {
        self.read_packet()?;
        match self.buf.first() {
            Some(0x00) => {
                let ok = response::read_ok(&self.buf, self.protocol)?;
                self.apply_ok(&ok);
                Ok(())
            }
            Some(0xFF) => Err(Error::Server(response::read_err(&self.buf, self.protocol)?)),
            _ => Err(Error::MalformedPacket),
        }
    }

    /// Read a response restricted to {OK, Error, ResultSet}. On a result-set
    /// header the session moves to reading-fields and holds the new result
    /// slot. Returns whether a result set was opened.
    pub(crate) fn read_query_result(&mut self, binary: bool) -> Result<bool> {
        self.read_packet()?;
        match command::read_query_response(&self.buf, self.protocol)? {
            QueryResponse::Ok(ok) => {
                self.apply_ok(&ok);
                self.last_binary = binary;
                Ok(false)
            }
            QueryResponse::ResultSet { field_count, .. } => {
                self.result_counter += 1;
                self.current = Some(ActiveResult {
                    id: self.result_counter,
                    binary,
                    field_count: field_count as usize,
                    fields: Arc::new(Vec::new()),
                    phase: ResultPhase::Fields,
                    mode: ResultMode::Unused,
                    all_rows_read: false,
                });
                self.last_binary = binary;
                trace!(field_count, binary, "result set started");
                Ok(true)
            }
        }
    }

    /// Read the COM_STMT_PREPARE response: PrepareOK, then parameter
    /// descriptors (read and discarded) to EOF, then field descriptors to
    /// EOF.
    pub(crate) fn read_prepare_response(&mut self) -> Result<PreparedInfo> {
        self.read_packet()?;
        if self.buf.first() == Some(&0xFF) {
            return Err(Error::Server(response::read_err(&self.buf, self.protocol)?));
        }
        let info = {
            let ok = command::read_prepare_ok(&self.buf)?;
            PreparedInfo {
                statement_id: ok.statement_id.get(),
                num_columns: usize::from(ok.num_columns.get()),
                num_params: usize::from(ok.num_params.get()),
                warnings: ok.warning_count.get(),
            }
        };

        // Parameter packets are opaque; the server's own client ignores
        // them too.
        if info.num_params > 0 {
            self.skip_to_eof()?;
        }
        if info.num_columns > 0 {
            self.skip_to_eof()?;
        }

        trace!(
            statement_id = info.statement_id,
            params = info.num_params,
            columns = info.num_columns,
            "statement prepared"
        );
        Ok(info)
    }

    fn skip_to_eof(&mut self) -> Result<()> {
        loop {
            self.read_packet()?;
            if response::is_eof(&self.buf) {
                let eof = response::read_eof(&self.buf, self.protocol)?;
                self.apply_eof(&eof);
                return Ok(());
            }
            if self.buf.first() == Some(&0xFF) {
                return Err(Error::Server(response::read_err(&self.buf, self.protocol)?));
            }
        }
    }

    // ─── Result Reading ──────────────────────────────────────────────────

    /// Drain the field packets of the current result, if still pending.
    fn read_fields(&mut self) -> Result<()> {
        let field_count = match &self.current {
            Some(current) if current.phase == ResultPhase::Fields => current.field_count,
            Some(_) => return Ok(()),
            None => return Err(Error::NoResultSet),
        };

        let mut fields = Vec::with_capacity(field_count);
        loop {
            self.read_packet()?;
            if response::is_eof(&self.buf) {
                let eof = response::read_eof(&self.buf, self.protocol)?;
                self.apply_eof(&eof);
                break;
            }
            match self.buf.first() {
                Some(0xFF) => {
                    return Err(Error::Server(response::read_err(&self.buf, self.protocol)?))
                }
                _ => fields.push(command::read_field(&self.buf)?),
            }
        }
        if fields.len() != field_count {
            return Err(Error::MalformedPacket);
        }

        if let Some(current) = self.current.as_mut() {
            current.fields = Arc::new(fields);
            current.phase = ResultPhase::Rows;
        }
        Ok(())
    }

    /// Pull one row off the wire; `None` at the terminating EOF.
    pub(crate) fn read_row(&mut self) -> Result<Option<Row>> {
        let (binary, fields) = {
            let current = self.current.as_ref().ok_or(Error::NoResultSet)?;
            match current.phase {
                ResultPhase::Fields => return Err(Error::CommandsOutOfSync),
                ResultPhase::Done => return Ok(None),
                ResultPhase::Rows => {}
            }
            (current.binary, Arc::clone(&current.fields))
        };

        self.read_packet()?;
        if response::is_eof(&self.buf) {
            let eof = response::read_eof(&self.buf, self.protocol)?;
            self.apply_eof(&eof);
            if let Some(current) = self.current.as_mut() {
                current.phase = ResultPhase::Done;
                current.all_rows_read = true;
            }
            return Ok(None);
        }
        if self.buf.first() == Some(&0xFF) {
            return Err(Error::Server(response::read_err(&self.buf, self.protocol)?));
        }

        let row = if binary {
            command::read_binary_row(&self.buf, &fields)?
        } else {
            command::read_text_row(&self.buf, &fields)?
        };
        Ok(Some(row))
    }

    pub(crate) fn store_result_inner(
        &mut self,
    ) -> Result<(u64, Arc<Vec<Field>>, VecDeque<Row>)> {
        match &self.current {
            None => return Err(Error::NoResultSet),
            Some(current) if current.mode != ResultMode::Unused => {
                return Err(Error::CommandsOutOfSync)
            }
            Some(_) => {}
        }

        self.read_fields()?;
        let mut rows = VecDeque::new();
        while let Some(row) = self.read_row()? {
            rows.push_back(row);
        }

        let current = self.current.as_mut().ok_or(Error::NoResultSet)?;
        current.mode = ResultMode::Stored;
        trace!(rows = rows.len(), "result stored");
        Ok((current.id, Arc::clone(&current.fields), rows))
    }

    pub(crate) fn use_result_inner(&mut self) -> Result<(u64, Arc<Vec<Field>>)> {
        match &self.current {
            None => return Err(Error::NoResultSet),
            Some(current) if current.mode != ResultMode::Unused => {
                return Err(Error::CommandsOutOfSync)
            }
            Some(_) => {}
        }

        self.read_fields()?;
        let current = self.current.as_mut().ok_or(Error::NoResultSet)?;
        current.mode = ResultMode::Used;
        Ok((current.id, Arc::clone(&current.fields)))
    }

    /// Drain whatever the current result still has on the wire and release
    /// the slot. A no-op without a result.
    pub(crate) fn free_result_inner(&mut self) -> Result<()> {
        let Some(current) = &self.current else {
            return Ok(());
        };
        let pending_fields = current.phase == ResultPhase::Fields;
        let pending_rows = !current.all_rows_read;

        if pending_fields {
            self.read_fields()?;
        }
        if pending_rows {
            while self.read_row()?.is_some() {}
        }
        self.current = None;
        Ok(())
    }

    /// Step to the next result set of a multi-statement batch. The sequence
    /// continues within the same round-trip.
    pub(crate) fn next_result_inner(&mut self) -> Result<bool> {
        if !self.connected {
            return Err(Error::ServerGone);
        }
        if self.current.is_some() {
            return Err(Error::CommandsOutOfSync);
        }
        if !self.status.contains(StatusFlags::MORE_RESULTS_EXISTS) {
            return Err(Error::CommandsOutOfSync);
        }
        self.read_query_result(self.last_binary)
    }

    /// Re-authenticate the session as another user without tearing the
    /// connection down. The server discards prepared statements and
    /// temporary state, so the statement generation advances.
    fn change_user_inner(&mut self, user: &str, password: &str, db: Option<&str>) -> Result<()> {
        self.begin_command()?;

        let token = match self.protocol {
            Protocol::V41 => scramble_41(&self.scramble, password),
            Protocol::V40 => scramble_323(&self.scramble, password),
        };
        let mut payload = Vec::new();
        command::write_change_user(
            &mut payload,
            self.protocol,
            user,
            &token,
            db.unwrap_or(""),
            self.charset,
        );
        self.send(&payload)?;

        self.read_packet()?;
        match self.buf.first() {
            Some(0x00) => {
                let ok = response::read_ok(&self.buf, self.protocol)?;
                self.apply_ok(&ok);
            }
            Some(0xFF) => {
                return Err(Error::Server(response::read_err(&self.buf, self.protocol)?));
            }
            Some(0xFE) if response::is_eof(&self.buf) => {
                let token = scramble_323(&self.scramble, password);
                let mut payload = Vec::new();
                handshake::write_old_password(&mut payload, &token);
                self.send(&payload)?;
                self.read_ok_response()?;
            }
            _ => return Err(Error::MalformedPacket),
        }

        // Reconnects from here on authenticate as the new identity.
        self.opts.user = user.to_string();
        self.opts.password = (!password.is_empty()).then(|| password.to_string());
        self.opts.db = db.map(ToString::to_string);
        self.generation += 1;
        debug!(user, "changed user");
        Ok(())
    }

    /// List the columns of a table, with an optional name wildcard.
    fn field_list_inner(&mut self, table: &str, wildcard: Option<&str>) -> Result<Vec<Field>> {
        self.begin_command()?;
        let mut payload = Vec::new();
        command::write_field_list(&mut payload, table, wildcard);
        self.send(&payload)?;

        let mut fields = Vec::new();
        loop {
            self.read_packet()?;
            if response::is_eof(&self.buf) {
                let eof = response::read_eof(&self.buf, self.protocol)?;
                self.apply_eof(&eof);
                return Ok(fields);
            }
            match self.buf.first() {
                Some(0xFF) => {
                    return Err(Error::Server(response::read_err(&self.buf, self.protocol)?))
                }
                _ => fields.push(command::read_field(&self.buf)?),
            }
        }
    }

    /// Fetch the server's one-line statistics string.
    fn statistics_inner(&mut self) -> Result<String> {
        self.begin_command()?;
        let mut payload = Vec::new();
        command::write_command(&mut payload, CommandByte::Statistics);
        self.send(&payload)?;

        self.read_packet()?;
        if self.buf.first() == Some(&0xFF) {
            return Err(Error::Server(response::read_err(&self.buf, self.protocol)?));
        }
        Ok(String::from_utf8_lossy(&self.buf).into_owned())
    }

    pub(crate) fn check_statement(&self, generation: u64) -> Result<()> {
        if !self.connected {
            return Err(Error::ServerLost);
        }
        if generation != self.generation {
            return Err(Error::StatementInvalidated);
        }
        Ok(())
    }
}

/// One session against a MySQL server.
///
/// All operations serialize on an internal mutex; concurrent callers block
/// FIFO. A result obtained from [`Conn::use_result`] pins the session until
/// drained or freed.
pub struct Conn {
    inner: Arc<Mutex<ConnInner>>,
}

impl Conn {
    /// Create an idle session. Nothing is dialed until [`Conn::connect`].
    pub fn new(opts: Opts) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ConnInner::new(opts))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ConnInner> {
        lock_inner(&self.inner)
    }

    /// Dial the endpoint and authenticate.
    pub fn connect(&self) -> Result<()> {
        let mut inner = self.lock();
        if inner.connected {
            return Err(Error::AlreadyConnected);
        }
        inner.dial_and_handshake()
    }

    /// Send COM_QUIT and drop the transport. Idempotent.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.lock();
        if !inner.connected {
            return Ok(());
        }
        debug!("closing session");
        inner.seq = 0;
        let mut payload = Vec::new();
        command::write_command(&mut payload, CommandByte::Quit);
        // The server answers quit by closing; a failed write changes nothing.
        let _ = inner.send(&payload);
        inner.terminate();
        Ok(())
    }

    pub fn ping(&self) -> Result<()> {
        let mut payload = Vec::new();
        command::write_command(&mut payload, CommandByte::Ping);
        self.lock()
            .run_command(&payload, |inner| inner.read_ok_response())
    }

    /// Select another default database.
    pub fn change_db(&self, db: &str) -> Result<()> {
        let mut payload = Vec::new();
        command::write_command_str(&mut payload, CommandByte::InitDb, db);
        self.lock()
            .run_command(&payload, |inner| inner.read_ok_response())
    }

    /// Re-authenticate as another user on the same connection. Prepared
    /// statements do not survive it.
    pub fn change_user(&self, user: &str, password: &str, db: Option<&str>) -> Result<()> {
        self.lock().change_user_inner(user, password, db)
    }

    /// Column descriptors of a table, optionally filtered by a name
    /// wildcard.
    pub fn field_list(&self, table: &str, wildcard: Option<&str>) -> Result<Vec<Field>> {
        self.lock().field_list_inner(table, wildcard)
    }

    /// The server's statistics line (uptime, thread count, ...).
    pub fn statistics(&self) -> Result<String> {
        self.lock().statistics_inner()
    }

    /// Ask the server to kill the connection or query of another thread.
    pub fn kill(&self, thread_id: u32) -> Result<()> {
        let mut payload = Vec::new();
        command::write_command_u32(&mut payload, CommandByte::ProcessKill, thread_id);
        self.lock()
            .run_command(&payload, |inner| inner.read_ok_response())
    }

    /// Flush server-side caches.
    pub fn refresh(&self, what: Refresh) -> Result<()> {
        let mut payload = Vec::new();
        command::write_command_u8(&mut payload, CommandByte::Refresh, what.bits());
        self.lock()
            .run_command(&payload, |inner| inner.read_ok_response())
    }

    /// Send textual SQL. On a row-producing statement the session moves to
    /// reading-fields; follow with [`Conn::store_result`] or
    /// [`Conn::use_result`], and free the result before the next command.
    pub fn query(&self, sql: &str) -> Result<()> {
        trace!(len = sql.len(), "query");
        let mut payload = Vec::new();
        command::write_query(&mut payload, sql);
        self.lock()
            .run_command(&payload, |inner| inner.read_query_result(false))?;
        Ok(())
    }

    /// Buffer the pending result entirely: fields, then every row to EOF.
    pub fn store_result(&self) -> Result<ResultSet> {
        let mut inner = self.lock();
        let (id, fields, rows) = inner.store_result_inner()?;
        Ok(ResultSet::new_stored(
            Arc::downgrade(&self.inner),
            id,
            fields,
            rows,
        ))
    }

    /// Start streaming the pending result: fields are read, rows stay on
    /// the wire and arrive one per fetch. The session accepts no other
    /// command until the result is drained or freed.
    pub fn use_result(&self) -> Result<ResultSet> {
        let mut inner = self.lock();
        let (id, fields) = inner.use_result_inner()?;
        Ok(ResultSet::new_used(Arc::downgrade(&self.inner), id, fields))
    }

    /// Drain and release the pending result, if any.
    pub fn free_result(&self) -> Result<()> {
        self.lock().free_result_inner()
    }

    /// Whether the server announced another result set after the current
    /// one.
    pub fn more_results(&self) -> bool {
        self.lock().status.contains(StatusFlags::MORE_RESULTS_EXISTS)
    }

    /// Advance to the next result set of a multi-statement batch. Returns
    /// whether it produces rows. Requires [`Conn::more_results`] and a freed
    /// current result.
    pub fn next_result(&self) -> Result<bool> {
        self.lock().next_result_inner()
    }

    /// Create an unprepared statement handle.
    pub fn init_stmt(&self) -> Stmt {
        Stmt::new(Arc::downgrade(&self.inner))
    }

    /// Prepare `sql` as a server-side statement.
    pub fn prepare(&self, sql: &str) -> Result<Stmt> {
        let mut stmt = self.init_stmt();
        stmt.prepare(sql)?;
        Ok(stmt)
    }

    /// Backslash-escape unescaped quote characters. Idempotent. Do not use
    /// with `NO_BACKSLASH_ESCAPES` sql mode.
    pub fn escape(&self, s: &str) -> String {
        escape(s)
    }

    pub fn set_autocommit(&self, on: bool) -> Result<()> {
        self.query(if on { "SET AUTOCOMMIT=1" } else { "SET AUTOCOMMIT=0" })
    }

    pub fn start(&self) -> Result<()> {
        self.query("START TRANSACTION")
    }

    pub fn commit(&self) -> Result<()> {
        self.query("COMMIT")
    }

    pub fn rollback(&self) -> Result<()> {
        self.query("ROLLBACK")
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn connected(&self) -> bool {
        self.lock().connected
    }

    /// Rows touched by the most recent non-result-producing command.
    pub fn affected_rows(&self) -> u64 {
        self.lock().affected_rows
    }

    pub fn last_insert_id(&self) -> u64 {
        self.lock().last_insert_id
    }

    pub fn warning_count(&self) -> u16 {
        self.lock().warning_count
    }

    /// Optional human-readable message of the last OK packet.
    pub fn info(&self) -> Option<String> {
        self.lock().message.clone()
    }

    pub fn server_version(&self) -> String {
        self.lock().server_version.clone()
    }

    pub fn server_status(&self) -> StatusFlags {
        self.lock().status
    }

    /// Capabilities the server advertised in its init packet.
    pub fn server_capabilities(&self) -> CapabilityFlags {
        self.lock().server_caps
    }

    /// Capabilities this client requested during the handshake.
    pub fn client_capabilities(&self) -> CapabilityFlags {
        self.lock().client_flags
    }

    /// Character set id in effect: the configured override, or whatever the
    /// server advertised.
    pub fn charset(&self) -> u8 {
        self.lock().charset
    }
}

/// Statement info extracted from a PrepareOK round-trip.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PreparedInfo {
    pub(crate) statement_id: u32,
    pub(crate) num_columns: usize,
    pub(crate) num_params: usize,
    pub(crate) warnings: u16,
}

/// Backslash-escape `'` and `"` unless already escaped. Leaves every other
/// byte alone, NUL and newline included.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    let mut prev = '\0';
    for c in s.chars() {
        if (c == '\'' || c == '"') && prev != '\\' {
            out.push('\\');
        }
        out.push(c);
        prev = c;
    }
    out
}
