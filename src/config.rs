//! YAML dashboard files for the `chart` command.
//!
//! A file holds any subset of a [`DashboardRequest`]; command-line flags fill
//! in or override what it leaves out.
//!
//! ```yaml
//! kind: scatter_plot
//! selections:
//!   x: price
//!   y: units
//!   color: region
//! labels:
//!   title: Price vs units
//! numeric_filters:
//!   - column: price
//!     min: 10
//! categorical_filters:
//!   - column: region
//!     values: [north, south]
//! ```

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::{
    chart::{ChartKind, ChartLabels, ColumnSelections},
    filter::{CategorySelection, RangeSelection},
    pipeline::DashboardRequest,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    pub kind: Option<ChartKind>,
    pub selections: ColumnSelections,
    pub labels: ChartLabels,
    pub numeric_filters: Vec<RangeSelection>,
    pub categorical_filters: Vec<CategorySelection>,
}

impl DashboardConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("Opening dashboard file {path:?}"))?;
        serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing dashboard YAML {path:?}"))
    }

    pub fn from_yaml_str(input: &str) -> Result<Self> {
        serde_yaml::from_str(input).context("Parsing dashboard YAML")
    }

    /// Merges command-line values over this file.
    ///
    /// Selections and labels given on the command line win slot by slot.
    /// Filters given on the command line replace those of the file for the
    /// same column and are appended otherwise.
    pub fn into_request(
        self,
        kind: Option<ChartKind>,
        selections: ColumnSelections,
        labels: ChartLabels,
        numeric_filters: Vec<RangeSelection>,
        categorical_filters: Vec<CategorySelection>,
    ) -> Result<DashboardRequest> {
        let kind = kind.or(self.kind).ok_or_else(|| {
            anyhow!("No chart kind given (use --kind or set 'kind' in the dashboard file)")
        })?;
        Ok(DashboardRequest {
            kind,
            selections: selections.or(self.selections),
            labels: labels.or(self.labels),
            numeric_filters: merge_by_column(self.numeric_filters, numeric_filters, |r| &r.column),
            categorical_filters: merge_by_column(
                self.categorical_filters,
                categorical_filters,
                |c| &c.column,
            ),
        })
    }
}

fn merge_by_column<T>(base: Vec<T>, overrides: Vec<T>, column: impl Fn(&T) -> &String) -> Vec<T> {
    let mut merged = base
        .into_iter()
        .filter(|item| !overrides.iter().any(|o| column(o) == column(item)))
        .collect::<Vec<_>>();
    merged.extend(overrides);
    merged
}
