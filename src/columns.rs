//! Column listing for a loaded CSV file.
//!
//! Renders one row per column with its inferred type, its chart role and the
//! summary statistics of its values.

use anyhow::Result;
use log::info;

use crate::{cli::ColumnsArgs, load_store, schema, stats, table};

pub fn execute(args: &ColumnsArgs) -> Result<()> {
    let store = load_store(&args.source)?;
    let data = store.get()?;
    if data.column_count() == 0 {
        info!("{:?} does not contain any columns", args.source.input);
        return Ok(());
    }

    let roles = schema::classify(data);
    let rows = stats::summarize(data, &roles)
        .iter()
        .zip(data.columns())
        .map(|(summary, column)| summary.render_row(&column.data_type.to_string()))
        .collect::<Vec<_>>();

    let headers = [
        "name", "type", "role", "count", "missing", "min", "max", "mean", "median",
    ]
    .map(String::from);
    table::print_table(&headers, &rows);
    info!(
        "Listed {} column(s): {} numeric, {} categorical",
        data.column_count(),
        roles.numeric.len(),
        roles.categorical.len()
    );
    Ok(())
}
