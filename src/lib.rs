pub mod chart;
pub mod cli;
pub mod columns;
pub mod config;
pub mod data;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod io_utils;
pub mod pipeline;
pub mod preview;
pub mod schema;
pub mod stats;
pub mod store;
pub mod table;
pub mod transform;

use std::{env, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info, warn};
use serde::Serialize;

use crate::{
    chart::ChartSpec,
    cli::{ChartArgs, Cli, Commands, FilterArgs, FilterSelectionArgs, InputArgs, TransformArgs},
    config::DashboardConfig,
    dataset::Table,
    filter::{AnchoredBounds, CategorySelection, RangeSelection},
    store::{LoadOptions, TableStore},
    transform::TransformOp,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_dashboard", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Preview(args) => preview::execute(&args),
        Commands::Columns(args) => columns::execute(&args),
        Commands::Chart(args) => handle_chart(&args),
        Commands::Filter(args) => handle_filter(&args),
        Commands::Transform(args) => handle_transform(&args),
    }
}

/// Reads and parses the input of a command into a fresh store.
pub(crate) fn load_store(source: &InputArgs) -> Result<TableStore> {
    let options = LoadOptions {
        delimiter: source.delimiter,
        encoding: io_utils::resolve_encoding(source.input_encoding.as_deref())?,
    };
    info!(
        "Reading '{}' with delimiter '{}'",
        source.input.display(),
        options.delimiter
    );
    let bytes = io_utils::read_input(&source.input)?;
    let mut store = TableStore::new();
    store
        .load_with(&bytes, &options)
        .with_context(|| format!("Loading {:?}", source.input))?;
    Ok(store)
}

fn parse_filter_selections(
    args: &FilterSelectionArgs,
) -> Result<(Vec<RangeSelection>, Vec<CategorySelection>)> {
    let ranges = args
        .ranges
        .iter()
        .map(|spec| filter::parse_range(spec))
        .collect::<Result<Vec<_>>>()?;
    let includes = args
        .includes
        .iter()
        .map(|spec| filter::parse_include(spec))
        .collect::<Result<Vec<_>>>()?;
    Ok((ranges, includes))
}

#[derive(Debug, Serialize)]
struct ChartOutput<'a> {
    chart: &'a ChartSpec,
    rows: usize,
}

fn handle_chart(args: &ChartArgs) -> Result<()> {
    let store = load_store(&args.source)?;
    let config = match &args.config {
        Some(path) => DashboardConfig::load(path)?,
        None => DashboardConfig::default(),
    };
    let (ranges, includes) = parse_filter_selections(&args.filters)?;
    let request =
        config.into_request(args.kind, args.selections(), args.labels(), ranges, includes)?;
    debug!("Dashboard request: {request:?}");

    let pass = pipeline::render(store.get()?, &request)
        .with_context(|| format!("Building {} for {:?}", request.kind, args.source.input))?;
    let output = ChartOutput {
        chart: &pass.chart,
        rows: pass.filtered.row_count(),
    };
    let json = serde_json::to_string_pretty(&output).context("Serializing chart to JSON")?;
    io_utils::write_text(args.output.as_deref(), &format!("{json}\n"))?;
    if let Some(path) = &args.filtered_output {
        io_utils::write_table_to_path(&pass.filtered, Some(path))?;
        info!(
            "Filtered {} row(s) written to {:?}",
            pass.filtered.row_count(),
            path
        );
    }
    Ok(())
}

fn handle_filter(args: &FilterArgs) -> Result<()> {
    let store = load_store(&args.source)?;
    let table = store.get()?;
    let (ranges, includes) = parse_filter_selections(&args.filters)?;
    let roles = schema::classify(table);
    let bounds = AnchoredBounds::capture(table, &roles);
    let spec = pipeline::filter_spec(&ranges, &includes, &roles, &bounds)?;
    let filtered = filter::apply(table, &spec)?;
    info!(
        "Kept {} of {} row(s) after {} filter(s)",
        filtered.row_count(),
        table.row_count(),
        spec.constraints().len()
    );
    emit_table(&filtered, args.table, args.output.as_deref())
}

fn handle_transform(args: &TransformArgs) -> Result<()> {
    let mut store = load_store(&args.source)?;
    let mut ops = Vec::new();
    for spec in &args.converts {
        ops.push(TransformOp::parse_convert(spec)?);
    }
    for spec in &args.imputes {
        ops.push(TransformOp::parse_impute(spec)?);
    }
    for spec in &args.derives {
        ops.push(TransformOp::parse_derive(spec)?);
    }
    if ops.is_empty() {
        warn!("No transformations requested; writing the input unchanged");
    }
    for op in &ops {
        store
            .apply(op)
            .with_context(|| format!("Failed to {op}"))?;
    }
    debug!("Applied edits: {:?}", store.history());
    emit_table(store.get()?, args.table, args.output.as_deref())
}

fn emit_table(table: &Table, as_text: bool, output: Option<&Path>) -> Result<()> {
    if as_text {
        table::print_dataset(table, None);
        return Ok(());
    }
    io_utils::write_table_to_path(table, output)?;
    if let Some(path) = output {
        info!("Wrote {} row(s) to {:?}", table.row_count(), path);
    }
    Ok(())
}
