#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use csv_dashboard::{dataset::Table, io_utils::Delimiter, store::TableStore};
use tempfile::{TempDir, tempdir};

pub const SALES_CSV: &str = "\
region,product,units,price,notes
north,widget,5,2.5,
south,gadget,12,4.0,NA
north,gadget,8,,late
east,widget,,3.25,
south,widget,3,1.75,
";

/// Loads `csv` into a fresh store with the comma delimiter.
pub fn store_from(csv: &str) -> TableStore {
    let mut store = TableStore::new();
    store
        .load(csv.as_bytes(), Delimiter::Comma)
        .expect("load csv");
    store
}

pub fn table_from(csv: &str) -> Table {
    store_from(csv).get().expect("table loaded").clone()
}

/// Display values of `column`, missing cells as empty strings.
pub fn column_display(table: &Table, column: &str) -> Vec<String> {
    let column = table.column(column).expect("column exists");
    (0..column.len()).map(|row| column.display_cell(row)).collect()
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}
