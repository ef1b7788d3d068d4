//! One dashboard render pass over the current table.
//!
//! The pass runs classify, anchor, filter and chart in that order. The stored
//! table is only read; every derived value is rebuilt from scratch.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    chart::{self, ChartKind, ChartLabels, ChartSpec, ColumnSelections},
    dataset::Table,
    error::ValidationError,
    filter::{self, AnchoredBounds, CategorySelection, FilterSpec, RangeSelection},
    schema::{self, ColumnRoles},
};

/// Everything a caller chose for one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardRequest {
    pub kind: ChartKind,
    #[serde(default)]
    pub selections: ColumnSelections,
    #[serde(default)]
    pub labels: ChartLabels,
    #[serde(default)]
    pub numeric_filters: Vec<RangeSelection>,
    #[serde(default)]
    pub categorical_filters: Vec<CategorySelection>,
}

impl DashboardRequest {
    pub fn new(kind: ChartKind) -> Self {
        Self {
            kind,
            selections: ColumnSelections::default(),
            labels: ChartLabels::default(),
            numeric_filters: Vec::new(),
            categorical_filters: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderPass {
    pub roles: ColumnRoles,
    pub bounds: AnchoredBounds,
    pub filtered: Table,
    pub chart: ChartSpec,
}

/// Builds a filter from selections, defaulting open range bounds from `bounds`.
pub fn filter_spec(
    numeric: &[RangeSelection],
    categorical: &[CategorySelection],
    roles: &ColumnRoles,
    bounds: &AnchoredBounds,
) -> Result<FilterSpec, ValidationError> {
    let mut spec = FilterSpec::new();
    for range in numeric {
        spec.range_or_anchored(roles, bounds, &range.column, range.min, range.max)?;
    }
    for include in categorical {
        spec.include(roles, &include.column, include.values.iter().cloned())?;
    }
    Ok(spec)
}

pub fn render(table: &Table, request: &DashboardRequest) -> Result<RenderPass, ValidationError> {
    let roles = schema::classify(table);
    debug!(
        "Classified {} numeric and {} categorical column(s)",
        roles.numeric.len(),
        roles.categorical.len()
    );
    let bounds = AnchoredBounds::capture(table, &roles);
    let spec = filter_spec(
        &request.numeric_filters,
        &request.categorical_filters,
        &roles,
        &bounds,
    )?;
    let filtered = filter::apply(table, &spec)?;
    let chart = chart::build(request.kind, &request.selections, &roles, &request.labels)?;
    info!(
        "Rendered {} over {} of {} row(s)",
        request.kind,
        filtered.row_count(),
        table.row_count()
    );
    Ok(RenderPass {
        roles,
        bounds,
        filtered,
        chart,
    })
}
