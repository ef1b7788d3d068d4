//! I/O utilities for CSV reading, writing, encoding, and delimiter handling.
//!
//! All byte-level work in csv-dashboard flows through this module. It provides:
//!
//! - **Delimiters**: the [`Delimiter`] choices accepted for uploads (comma,
//!   semicolon, tab).
//! - **Encoding**: input decoding via `encoding_rs`, defaulting to UTF-8.
//! - **Reader/writer construction**: strict readers that refuse ragged rows and
//!   writers producing the export format (comma, header row, minimal quoting).
//! - **stdin/stdout**: the `-` path convention routes through standard streams.

use std::{
    fmt,
    fs::File,
    io::{self, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use serde::{Deserialize, Serialize};

use crate::dataset::Table;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    #[default]
    Comma,
    Semicolon,
    Tab,
}

impl Delimiter {
    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Semicolon => b';',
            Delimiter::Tab => b'\t',
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let printable = match self {
            Delimiter::Comma => ",",
            Delimiter::Semicolon => ";",
            Delimiter::Tab => "\\t",
        };
        f.write_str(printable)
    }
}

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

/// Reads the whole input (file or stdin) into memory.
pub fn read_input(path: &Path) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    if is_dash(path) {
        io::stdin()
            .lock()
            .read_to_end(&mut bytes)
            .context("Reading stdin")?;
    } else {
        File::open(path)
            .with_context(|| format!("Opening input file {path:?}"))?
            .read_to_end(&mut bytes)
            .with_context(|| format!("Reading input file {path:?}"))?;
    }
    Ok(bytes)
}

/// Decodes `bytes` to UTF-8 text, stripping a byte-order mark. `None` on invalid input.
pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Option<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    (!had_errors).then(|| text.into_owned())
}

pub fn open_csv_reader<R>(reader: R, delimiter: Delimiter) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter.as_byte())
        .double_quote(true)
        .flexible(false);
    builder.from_reader(reader)
}

pub fn open_csv_writer<W>(writer: W) -> csv::Writer<W>
where
    W: Write,
{
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(b',')
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true);
    builder.from_writer(writer)
}

/// Writes `table` as UTF-8 CSV: header row, no index column, missing cells empty.
pub fn write_table<W>(table: &Table, writer: W) -> Result<()>
where
    W: Write,
{
    let mut writer = open_csv_writer(writer);
    writer
        .write_record(table.headers())
        .context("Writing output headers")?;
    for row in 0..table.row_count() {
        writer
            .write_record(table.row_display(row))
            .with_context(|| format!("Writing output row {}", row + 2))?;
    }
    writer.flush().context("Flushing output writer")?;
    Ok(())
}

pub fn table_to_csv_bytes(table: &Table) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_table(table, &mut buffer)?;
    Ok(buffer)
}

/// Writes `table` to `path`, or stdout when the path is absent or `-`.
pub fn write_table_to_path(table: &Table, path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) if !is_dash(p) => {
            let file =
                File::create(p).with_context(|| format!("Creating output file {p:?}"))?;
            write_table(table, BufWriter::new(file))
        }
        _ => write_table(table, io::stdout().lock()),
    }
}

/// Writes text to `path`, or stdout when the path is absent or `-`.
pub fn write_text(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(p) if !is_dash(p) => {
            std::fs::write(p, text).with_context(|| format!("Writing output file {p:?}"))
        }
        _ => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(text.as_bytes()).context("Writing stdout")?;
            stdout.flush().context("Flushing stdout")
        }
    }
}
