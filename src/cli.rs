use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{
    chart::{ChartKind, ChartLabels, ColumnSelections},
    io_utils::Delimiter,
    store::DEFAULT_PREVIEW_ROWS,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Explore, filter, transform and chart CSV data", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Preview the first few rows of a CSV file in a formatted table
    Preview(PreviewArgs),
    /// List every column with its type, role and summary statistics
    Columns(ColumnsArgs),
    /// Filter the data and emit a chart specification as JSON
    Chart(ChartArgs),
    /// Filter rows by numeric ranges and category membership
    Filter(FilterArgs),
    /// Convert column types, fill missing values and derive new columns
    Transform(TransformArgs),
}

#[derive(Debug, Clone, Args)]
pub struct InputArgs {
    /// Input CSV file (`-` reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter (comma, semicolon or tab)
    #[arg(long, value_parser = parse_delimiter, default_value = "comma")]
    pub delimiter: Delimiter,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub source: InputArgs,
    /// Number of rows to display
    #[arg(long, default_value_t = DEFAULT_PREVIEW_ROWS)]
    pub rows: usize,
}

#[derive(Debug, Args)]
pub struct ColumnsArgs {
    #[command(flatten)]
    pub source: InputArgs,
}

#[derive(Debug, Clone, Default, Args)]
pub struct FilterSelectionArgs {
    /// Inclusive numeric range `column=min..max`; either bound may be omitted
    #[arg(long = "range", action = clap::ArgAction::Append)]
    pub ranges: Vec<String>,
    /// Allowed categories `column=a,b,c`
    #[arg(long = "include", action = clap::ArgAction::Append)]
    pub includes: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ChartArgs {
    #[command(flatten)]
    pub source: InputArgs,
    /// YAML dashboard file; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Chart kind
    #[arg(long, value_enum)]
    pub kind: Option<ChartKind>,
    /// Numeric column for the x axis (scatter and bubble charts)
    #[arg(long)]
    pub x: Option<String>,
    /// Numeric column for the y axis (scatter and bubble charts)
    #[arg(long)]
    pub y: Option<String>,
    /// Numeric value column
    #[arg(long)]
    pub value: Option<String>,
    /// Categorical column naming bars, slices or treemap paths
    #[arg(long)]
    pub category: Option<String>,
    /// Categorical column used to colour marks
    #[arg(long)]
    pub color: Option<String>,
    /// Categorical column splitting stacked bars
    #[arg(long)]
    pub stack: Option<String>,
    /// Numeric column sizing bubbles
    #[arg(long)]
    pub size: Option<String>,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long = "x-label")]
    pub x_label: Option<String>,
    #[arg(long = "y-label")]
    pub y_label: Option<String>,
    #[arg(long = "legend-label")]
    pub legend_label: Option<String>,
    #[command(flatten)]
    pub filters: FilterSelectionArgs,
    /// Output JSON file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Also write the filtered rows as CSV
    #[arg(long = "filtered-output")]
    pub filtered_output: Option<PathBuf>,
}

impl ChartArgs {
    pub fn selections(&self) -> ColumnSelections {
        ColumnSelections {
            x: self.x.clone(),
            y: self.y.clone(),
            value: self.value.clone(),
            category: self.category.clone(),
            color: self.color.clone(),
            stack: self.stack.clone(),
            size: self.size.clone(),
        }
    }

    pub fn labels(&self) -> ChartLabels {
        ChartLabels {
            title: self.title.clone(),
            x_label: self.x_label.clone(),
            y_label: self.y_label.clone(),
            legend_label: self.legend_label.clone(),
        }
    }
}

#[derive(Debug, Args)]
pub struct FilterArgs {
    #[command(flatten)]
    pub source: InputArgs,
    #[command(flatten)]
    pub filters: FilterSelectionArgs,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Render output as an elastic table to stdout
    #[arg(long = "table")]
    pub table: bool,
}

#[derive(Debug, Args)]
pub struct TransformArgs {
    #[command(flatten)]
    pub source: InputArgs,
    /// Type conversion `column:integer|float|string`
    #[arg(long = "convert", action = clap::ArgAction::Append)]
    pub converts: Vec<String>,
    /// Missing-value fill `column:mean`, `column:median` or `column:value=TEXT`
    #[arg(long = "impute", action = clap::ArgAction::Append)]
    pub imputes: Vec<String>,
    /// Derived column using `name=formula`
    #[arg(long = "derive", action = clap::ArgAction::Append)]
    pub derives: Vec<String>,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Render output as an elastic table to stdout
    #[arg(long = "table")]
    pub table: bool,
}

pub fn parse_delimiter(value: &str) -> Result<Delimiter, String> {
    match value {
        "comma" | "," => Ok(Delimiter::Comma),
        "semicolon" | ";" => Ok(Delimiter::Semicolon),
        "tab" | "\t" | "\\t" => Ok(Delimiter::Tab),
        "" => Err("Delimiter cannot be empty".to_string()),
        other => Err(format!(
            "Unsupported delimiter '{other}' (expected comma, semicolon or tab)"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_delimiter_accepts_names_and_characters() {
        assert_eq!(parse_delimiter("comma"), Ok(Delimiter::Comma));
        assert_eq!(parse_delimiter(";"), Ok(Delimiter::Semicolon));
        assert_eq!(parse_delimiter("tab"), Ok(Delimiter::Tab));
        assert!(parse_delimiter("|").is_err());
    }
}
