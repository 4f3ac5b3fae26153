//! Result-set handles: fully buffered or streamed row access.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, Weak};

use crate::conn::{lock_inner, ConnInner};
use crate::error::{Error, Result};
use crate::protocol::command::Field;
use crate::row::Row;
use crate::value::Value;

/// Rows and column descriptors of one result set.
///
/// A stored result owns its rows; a streamed (`use_result`) one pulls each
/// row from the wire and pins its session until drained or freed. The handle
/// points at its session weakly and is revoked when the session terminates
/// or the slot is reused.
impl std::fmt::Debug for ResultSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultSet")
            .field("id", &self.id)
            .field("fields", &self.fields)
            .field("rows", &self.rows)
            .field("total_rows", &self.total_rows)
            .field("stored", &self.stored)
            .finish()
    }
}

pub struct ResultSet {
    conn: Weak<Mutex<ConnInner>>,
    id: u64,
    fields: Arc<Vec<Field>>,
    rows: VecDeque<Row>,
    total_rows: u64,
    stored: bool,
}

impl ResultSet {
    pub(crate) fn new_stored(
        conn: Weak<Mutex<ConnInner>>,
        id: u64,
        fields: Arc<Vec<Field>>,
        rows: VecDeque<Row>,
    ) -> Self {
        let total_rows = rows.len() as u64;
        Self {
            conn,
            id,
            fields,
            rows,
            total_rows,
            stored: true,
        }
    }

    pub(crate) fn new_used(
        conn: Weak<Mutex<ConnInner>>,
        id: u64,
        fields: Arc<Vec<Field>>,
    ) -> Self {
        Self {
            conn,
            id,
            fields,
            rows: VecDeque::new(),
            total_rows: 0,
            stored: false,
        }
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Total row count; known for stored results only.
    pub fn row_count(&self) -> Option<u64> {
        self.stored.then_some(self.total_rows)
    }

    /// Next row, or `None` once the result is exhausted.
    pub fn fetch_row(&mut self) -> Result<Option<Row>> {
        if self.stored {
            return Ok(self.rows.pop_front());
        }

        let conn = self.conn.upgrade().ok_or(Error::ServerLost)?;
        let mut inner = lock_inner(&conn);
        if !inner.connected {
            return Err(Error::ServerLost);
        }
        match &inner.current {
            Some(current) if current.id == self.id => {}
            _ => return Err(Error::NoResultSet),
        }
        inner.read_row()
    }

    /// Next row keyed by field name. Duplicate column names collapse,
    /// last write wins.
    pub fn fetch_map(&mut self) -> Result<Option<HashMap<String, Value>>> {
        let Some(row) = self.fetch_row()? else {
            return Ok(None);
        };
        let mut map = HashMap::with_capacity(self.fields.len());
        for (field, value) in self.fields.iter().zip(row.into_values()) {
            map.insert(field.name.clone(), value);
        }
        Ok(Some(map))
    }

    /// Release the result: unread rows are drained off the wire and the
    /// session accepts commands again.
    pub fn free(mut self) -> Result<()> {
        self.rows.clear();
        let Some(conn) = self.conn.upgrade() else {
            return Ok(());
        };
        let mut inner = lock_inner(&conn);
        let still_current = matches!(&inner.current, Some(current) if current.id == self.id);
        if still_current {
            inner.free_result_inner()
        } else {
            Ok(())
        }
    }
}
