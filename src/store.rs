//! Session table storage.
//!
//! [`TableStore`] owns the working table of one session together with its
//! edit history. Every successful load or transformation replaces the table
//! wholesale; failures leave the stored table exactly as it was.

use encoding_rs::{Encoding, UTF_8};
use log::{debug, info, warn};

use crate::{
    data::parse_typed_value,
    dataset::{Column, Table},
    error::{EditError, EmptyStore, ParseError},
    io_utils::{self, Delimiter},
    schema::TypeCandidate,
    transform::{self, TransformOp, TransformReport},
};

pub const DEFAULT_PREVIEW_ROWS: usize = 10;

#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    pub delimiter: Delimiter,
    pub encoding: &'static Encoding,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: Delimiter::Comma,
            encoding: UTF_8,
        }
    }
}

#[derive(Debug, Clone)]
struct Edit {
    description: String,
    previous: Table,
}

#[derive(Debug, Default)]
pub struct TableStore {
    table: Option<Table>,
    history: Vec<Edit>,
}

impl TableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, bytes: &[u8], delimiter: Delimiter) -> Result<&Table, ParseError> {
        let options = LoadOptions {
            delimiter,
            ..LoadOptions::default()
        };
        self.load_with(bytes, &options)
    }

    pub fn load_with(&mut self, bytes: &[u8], options: &LoadOptions) -> Result<&Table, ParseError> {
        let table = parse_table(bytes, options)?;
        info!(
            "Loaded {} row(s) across {} column(s) (delimiter '{}')",
            table.row_count(),
            table.column_count(),
            options.delimiter
        );
        self.history.clear();
        Ok(self.table.insert(table))
    }

    pub fn is_loaded(&self) -> bool {
        self.table.is_some()
    }

    pub fn get(&self) -> Result<&Table, EmptyStore> {
        self.table.as_ref().ok_or(EmptyStore)
    }

    pub fn replace(&mut self, table: Table) {
        self.commit("replace table".to_string(), table);
    }

    /// Runs `op` against the current table and commits the result only on success.
    pub fn apply(&mut self, op: &TransformOp) -> Result<TransformReport, EditError> {
        let current = self.get()?;
        let outcome = transform::apply(current, op)?;
        self.commit(op.to_string(), outcome.table);
        Ok(outcome.report)
    }

    pub fn history(&self) -> Vec<&str> {
        self.history
            .iter()
            .map(|edit| edit.description.as_str())
            .collect()
    }

    /// Restores the table as it was before the last edit, returning that edit's description.
    pub fn undo(&mut self) -> Option<String> {
        let edit = self.history.pop()?;
        debug!("Undoing '{}'", edit.description);
        self.table = Some(edit.previous);
        Some(edit.description)
    }

    pub fn reset(&mut self) {
        self.table = None;
        self.history.clear();
    }

    pub fn preview(&self, rows: usize) -> Result<Vec<Vec<String>>, EmptyStore> {
        Ok(self.get()?.head(rows))
    }

    pub fn export_csv(&self) -> anyhow::Result<Vec<u8>> {
        io_utils::table_to_csv_bytes(self.get()?)
    }

    fn commit(&mut self, description: String, table: Table) {
        match self.table.replace(table) {
            Some(previous) => self.history.push(Edit {
                description,
                previous,
            }),
            None => warn!("'{description}' committed to an empty store; nothing to undo"),
        }
    }
}

/// Parses delimited bytes into a typed table. The first record is the header.
pub fn parse_table(bytes: &[u8], options: &LoadOptions) -> Result<Table, ParseError> {
    let text =
        io_utils::decode_bytes(bytes, options.encoding).ok_or_else(|| ParseError::Encoding {
            encoding: options.encoding.name().to_string(),
        })?;
    let mut reader = io_utils::open_csv_reader(text.as_bytes(), options.delimiter);
    let headers = reader
        .headers()
        .map_err(map_csv_error)?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    if headers.is_empty() {
        return Err(ParseError::MissingHeader);
    }

    let mut fields: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    let mut candidates = vec![TypeCandidate::new(); headers.len()];
    for record in reader.records() {
        let record = record.map_err(map_csv_error)?;
        for (idx, field) in record.iter().enumerate() {
            candidates[idx].observe(field);
            fields[idx].push(field.to_string());
        }
    }

    let columns = headers
        .into_iter()
        .zip(fields)
        .zip(candidates)
        .map(|((name, raw), candidate)| {
            let data_type = candidate.decide();
            debug!("Column '{name}' inferred as {data_type}");
            let cells = raw
                .iter()
                .map(|field| parse_typed_value(field, data_type))
                .collect::<anyhow::Result<Vec<_>>>()
                .map_err(|err| ParseError::Malformed(format!("column '{name}': {err}")))?;
            Ok(Column::new(name, data_type, cells))
        })
        .collect::<Result<Vec<_>, ParseError>>()?;
    Table::new(columns)
}

fn map_csv_error(err: csv::Error) -> ParseError {
    match err.kind() {
        csv::ErrorKind::UnequalLengths {
            pos,
            expected_len,
            len,
        } => ParseError::FieldCount {
            line: pos.as_ref().map(|p| p.line()).unwrap_or_default(),
            expected: *expected_len as usize,
            found: *len as usize,
        },
        _ => ParseError::Malformed(err.to_string()),
    }
}
