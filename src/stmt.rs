//! Server-side prepared statements.

use std::sync::{Arc, Mutex, Weak};

use tracing::{debug, trace};

use crate::conn::{lock_inner, ConnInner};
use crate::constant::{ColumnType, LONG_DATA_CHUNK};
use crate::error::{Error, Result};
use crate::protocol::command::{
    write_close_statement, write_execute, write_long_data, write_prepare, write_reset_statement,
};
use crate::value::Value;

/// A server-side prepared statement.
///
/// The handle references its session weakly: it yields `ServerLost` once the
/// session is gone and `StatementInvalidated` after a reconnect replaced the
/// connection it was prepared on. The server-side handle is released exactly
/// once, by the first successful [`Stmt::close`].
pub struct Stmt {
    conn: Weak<Mutex<ConnInner>>,
    /// Session generation this statement was prepared under
    generation: u64,
    statement_id: u32,
    param_count: usize,
    column_count: usize,
    prepared: bool,
    params_bound: bool,
    /// Forces the next execute to carry the parameter type vector
    params_rebound: bool,
    param_types: Vec<[u8; 2]>,
    param_values: Vec<Vec<u8>>,
    affected_rows: u64,
    last_insert_id: u64,
    warnings: u16,
}

impl Stmt {
    pub(crate) fn new(conn: Weak<Mutex<ConnInner>>) -> Self {
        Self {
            conn,
            generation: 0,
            statement_id: 0,
            param_count: 0,
            column_count: 0,
            prepared: false,
            params_bound: false,
            params_rebound: false,
            param_types: Vec::new(),
            param_values: Vec::new(),
            affected_rows: 0,
            last_insert_id: 0,
            warnings: 0,
        }
    }

    fn session(&self) -> Result<Arc<Mutex<ConnInner>>> {
        self.conn.upgrade().ok_or(Error::ServerLost)
    }

    /// Prepare `sql`. A handle that was already prepared on this connection
    /// releases its old server-side statement first.
    pub fn prepare(&mut self, sql: &str) -> Result<()> {
        let conn = self.session()?;
        let mut inner = lock_inner(&conn);

        if self.prepared && self.generation == inner.generation && inner.connected {
            inner.begin_command()?;
            let mut payload = Vec::new();
            write_close_statement(&mut payload, self.statement_id);
            inner.send(&payload)?;
            self.prepared = false;
        }

        let mut payload = Vec::new();
        write_prepare(&mut payload, sql);
        let info = inner.run_command(&payload, |inner| inner.read_prepare_response())?;

        self.generation = inner.generation;
        self.statement_id = info.statement_id;
        self.param_count = info.num_params;
        self.column_count = info.num_columns;
        self.warnings = info.warnings;
        self.prepared = true;
        self.params_bound = false;
        self.params_rebound = false;
        self.param_types.clear();
        self.param_values.clear();
        debug!(statement_id = self.statement_id, "prepared statement");
        Ok(())
    }

    /// Bind one value per parameter marker. Values are classified and
    /// encoded immediately; the wire sees them on the next execute, together
    /// with the refreshed type vector.
    pub fn bind_params(&mut self, params: &[Value]) -> Result<()> {
        if !self.prepared {
            return Err(Error::NoPrepareStmt);
        }
        if params.len() != self.param_count {
            return Err(Error::InvalidParameterNo {
                expected: self.param_count,
                actual: params.len(),
            });
        }

        let mut types = Vec::with_capacity(params.len());
        let mut values = Vec::with_capacity(params.len());
        for (index, param) in params.iter().enumerate() {
            types.push(param.wire_type(index)?);
            let mut body = Vec::new();
            param.encode_into(&mut body);
            values.push(body);
        }

        self.param_types = types;
        self.param_values = values;
        self.params_bound = true;
        self.params_rebound = true;
        Ok(())
    }

    /// Stream a long string/blob parameter body ahead of execute. The server
    /// concatenates the chunks of successive calls for the same index.
    pub fn send_long_data(&mut self, param_index: u16, data: &[u8]) -> Result<()> {
        if !self.prepared {
            return Err(Error::NoPrepareStmt);
        }
        if usize::from(param_index) >= self.param_count {
            return Err(Error::InvalidParameterNo {
                expected: self.param_count,
                actual: usize::from(param_index) + 1,
            });
        }
        if self.params_bound {
            let type_code = self.param_types[usize::from(param_index)][0];
            if type_code != ColumnType::String as u8 && type_code != ColumnType::Blob as u8 {
                return Err(Error::UnsupportedParamType(usize::from(param_index)));
            }
        }

        let conn = self.session()?;
        let mut inner = lock_inner(&conn);
        inner.check_statement(self.generation)?;

        let mut chunks = data.chunks(LONG_DATA_CHUNK);
        let mut payload = Vec::new();
        loop {
            let chunk = chunks.next().unwrap_or(&[]);
            // Each chunk is its own command packet; no response follows.
            inner.begin_command()?;
            payload.clear();
            write_long_data(&mut payload, self.statement_id, param_index, chunk);
            inner.send(&payload)?;
            trace!(param_index, len = chunk.len(), "sent long data chunk");
            if chunks.len() == 0 {
                break;
            }
        }
        Ok(())
    }

    /// Execute the prepared statement. A row-producing statement leaves the
    /// session holding a binary-format result; follow with store/use on the
    /// session. Otherwise the execute stats land on this handle.
    pub fn execute(&mut self) -> Result<()> {
        if !self.prepared {
            return Err(Error::NoPrepareStmt);
        }
        if self.param_count > 0 && !self.params_bound {
            return Err(Error::ParamsNotBound);
        }

        let conn = self.session()?;
        let mut inner = lock_inner(&conn);
        inner.check_statement(self.generation)?;
        inner.begin_command()?;

        let mut payload = Vec::new();
        write_execute(
            &mut payload,
            self.statement_id,
            &self.param_types,
            &self.param_values,
            self.params_rebound,
        );
        inner.send(&payload)?;
        let has_result = inner.read_query_result(true)?;

        self.params_rebound = false;
        if !has_result {
            self.affected_rows = inner.affected_rows;
            self.last_insert_id = inner.last_insert_id;
            self.warnings = inner.warning_count;
        }
        Ok(())
    }

    /// Reset the statement on the server, discarding accumulated long data.
    /// The next execute re-sends the type vector.
    pub fn reset(&mut self) -> Result<()> {
        if !self.prepared {
            return Err(Error::NoPrepareStmt);
        }
        let conn = self.session()?;
        let mut inner = lock_inner(&conn);
        inner.check_statement(self.generation)?;
        inner.begin_command()?;

        let mut payload = Vec::new();
        write_reset_statement(&mut payload, self.statement_id);
        inner.send(&payload)?;
        inner.read_ok_response()?;

        self.params_rebound = true;
        Ok(())
    }

    /// Release the server-side handle. No reply follows; repeated calls and
    /// calls after the connection went away are no-ops.
    pub fn close(&mut self) -> Result<()> {
        if !self.prepared {
            return Ok(());
        }
        let Some(conn) = self.conn.upgrade() else {
            self.prepared = false;
            return Ok(());
        };
        let mut inner = lock_inner(&conn);
        if !inner.connected || inner.generation != self.generation {
            self.prepared = false;
            return Ok(());
        }

        inner.begin_command()?;
        let mut payload = Vec::new();
        write_close_statement(&mut payload, self.statement_id);
        inner.send(&payload)?;
        self.prepared = false;
        debug!(statement_id = self.statement_id, "closed statement");
        Ok(())
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn param_count(&self) -> usize {
        self.param_count
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// Stats of the most recent non-result-producing execute.
    pub fn affected_rows(&self) -> u64 {
        self.affected_rows
    }

    pub fn last_insert_id(&self) -> u64 {
        self.last_insert_id
    }

    pub fn warnings(&self) -> u16 {
        self.warnings
    }
}
