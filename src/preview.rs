use anyhow::Result;
use log::info;

use crate::{cli::PreviewArgs, load_store, schema, table};

pub fn execute(args: &PreviewArgs) -> Result<()> {
    let store = load_store(&args.source)?;
    let data = store.get()?;
    table::print_dataset(data, Some(args.rows));

    info!(
        "Displayed {} of {} row(s) across {} column(s) from {:?}",
        data.row_count().min(args.rows),
        data.row_count(),
        data.column_count(),
        args.source.input
    );
    let missing = schema::missing_columns(data);
    if !missing.is_empty() {
        info!("Columns with missing values: {}", missing.join(", "));
    }
    Ok(())
}
