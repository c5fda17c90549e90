use modelbase_foundation::{EntityKind, Error, Result};
use modelbase_storage::Document;
use serde_json::Value as Json;

use crate::lazy::LazySlot;
use crate::persist::Persist;
use crate::session::Session;

/// Cell contents of a result table.
#[derive(Debug, Clone, Default)]
pub struct TableData {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    dirty: bool,
}

impl PartialEq for TableData {
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header && self.rows == other.rows
    }
}

impl TableData {
    /// Creates an unstored table.
    #[must_use]
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            header,
            rows,
            dirty: true,
        }
    }

    /// Column titles.
    #[must_use]
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Rows of cells.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of columns: the widest of the header and every row.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.header.len()))
            .max()
            .unwrap_or(0)
    }

    /// Replaces the header.
    pub fn set_header(&mut self, header: Vec<String>) {
        self.header = header;
        self.dirty = true;
    }

    /// Appends a row.
    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
        self.dirty = true;
    }

    /// Sets one cell, growing the table as needed.
    pub fn set_cell(&mut self, row: usize, column: usize, value: impl Into<String>) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= column {
            cells.resize(column + 1, String::new());
        }
        cells[column] = value.into();
        self.dirty = true;
    }
}

impl Persist for TableData {
    fn type_name(&self) -> &'static str {
        "EntityTableData"
    }

    fn write_fields(&self, doc: &mut Document) -> Result<()> {
        doc.insert("Header", self.header.clone());
        let rows: Vec<Json> = self.rows.iter().map(|row| Json::from(row.clone())).collect();
        doc.insert("Rows", rows);
        Ok(())
    }

    fn read_fields(&mut self, doc: &Document, _session: &Session) -> Result<()> {
        let invalid = || Error::invalid_field("Rows", "array of string arrays");
        self.header = doc.get_string_array("Header")?;
        self.rows = doc
            .get_array("Rows")?
            .iter()
            .map(|row| {
                row.as_array()
                    .ok_or_else(invalid)?
                    .iter()
                    .map(|cell| cell.as_str().map(str::to_owned).ok_or_else(invalid))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(())
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn mark_persisted(&mut self) {
        self.dirty = false;
    }
}

/// A solver result presented as a table; the cells are loaded on demand.
#[derive(Debug, Clone, Default)]
pub struct ResultTable {
    table: LazySlot<TableData>,
    rows: u64,
    columns: u64,
}

/// Compares stored state: the cells by reference, not by content.
impl PartialEq for ResultTable {
    fn eq(&self, other: &Self) -> bool {
        self.table.identity() == other.table.identity()
            && self.rows == other.rows
            && self.columns == other.columns
    }
}

impl ResultTable {
    /// Creates a result table over the given cells.
    #[must_use]
    pub fn new(table: TableData) -> Self {
        Self {
            rows: table.rows().len() as u64,
            columns: table.column_count() as u64,
            table: LazySlot::with_value(table),
        }
    }

    /// The cell slot.
    #[must_use]
    pub fn table(&self) -> &LazySlot<TableData> {
        &self.table
    }

    /// The cell slot, for loading or releasing.
    pub fn table_mut(&mut self) -> &mut LazySlot<TableData> {
        &mut self.table
    }

    /// Row count as of the last store.
    #[must_use]
    pub fn row_count(&self) -> u64 {
        self.rows
    }

    /// Column count as of the last store.
    #[must_use]
    pub fn column_count(&self) -> u64 {
        self.columns
    }
}

impl Persist for ResultTable {
    fn type_name(&self) -> &'static str {
        "EntityResultTable"
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Topology
    }

    fn write_fields(&self, doc: &mut Document) -> Result<()> {
        super::write_slot_ref(doc, "TableData", &self.table);
        doc.insert("RowCount", self.rows);
        doc.insert("ColumnCount", self.columns);
        Ok(())
    }

    fn read_fields(&mut self, doc: &Document, _session: &Session) -> Result<()> {
        self.table = super::read_slot_ref(doc, "TableData")?;
        self.rows = doc.get_u64("RowCount")?;
        self.columns = doc.get_u64("ColumnCount")?;
        Ok(())
    }

    fn store_owned(&mut self, session: &Session) -> Result<bool> {
        let mut changed = self.table.store_for_owner(session)?;
        if let Some(record) = self.table.loaded() {
            let rows = record.body().rows().len() as u64;
            let columns = record.body().column_count() as u64;
            if (rows, columns) != (self.rows, self.columns) {
                self.rows = rows;
                self.columns = columns;
                changed = true;
            }
        }
        Ok(changed)
    }

    fn is_dirty(&self) -> bool {
        self.table.is_dirty()
    }
}
