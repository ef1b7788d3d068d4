//! Row filtering by numeric ranges and categorical membership.
//!
//! A [`FilterSpec`] holds at most one constraint per column and is rebuilt on
//! every pass from the caller's current selections. Default range bounds come
//! from [`AnchoredBounds`], captured once from the unfiltered table before any
//! constraint is applied, so every numeric column always offers its full
//! observed range.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Result, anyhow, bail};
use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    data::Value,
    dataset::Table,
    error::ValidationError,
    schema::{ColumnRole, ColumnRoles},
    stats,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumericBounds {
    pub min: f64,
    pub max: f64,
}

/// Observed min/max of every numeric column of an unfiltered table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnchoredBounds(BTreeMap<String, NumericBounds>);

impl AnchoredBounds {
    pub fn capture(table: &Table, roles: &ColumnRoles) -> Self {
        let mut bounds = BTreeMap::new();
        for name in &roles.numeric {
            let Some(column) = table.column(name) else {
                continue;
            };
            if let Some((min, max)) = stats::min_max(&stats::numeric_values(column)) {
                bounds.insert(name.clone(), NumericBounds { min, max });
            }
        }
        Self(bounds)
    }

    pub fn get(&self, column: &str) -> Option<NumericBounds> {
        self.0.get(column).copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    NumericRange {
        column: String,
        min: f64,
        max: f64,
    },
    CategoricalSet {
        column: String,
        allowed: BTreeSet<String>,
    },
}

impl Constraint {
    pub fn column(&self) -> &str {
        match self {
            Constraint::NumericRange { column, .. } | Constraint::CategoricalSet { column, .. } => {
                column
            }
        }
    }

    fn admits(&self, value: Option<&Value>) -> bool {
        match self {
            Constraint::NumericRange { min, max, .. } => value
                .and_then(Value::as_f64)
                .is_some_and(|v| *min <= v && v <= *max),
            Constraint::CategoricalSet { allowed, .. } => {
                allowed.is_empty()
                    || value.is_some_and(|v| allowed.contains(v.as_display().as_str()))
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    constraints: Vec<Constraint>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn constrains(&self, column: &str) -> bool {
        self.constraints.iter().any(|c| c.column() == column)
    }

    /// Numeric columns still free to receive a filter.
    pub fn available_numeric<'a>(&self, roles: &'a ColumnRoles) -> Vec<&'a str> {
        self.available(roles, ColumnRole::Numeric)
    }

    /// Categorical columns still free to receive a filter.
    pub fn available_categorical<'a>(&self, roles: &'a ColumnRoles) -> Vec<&'a str> {
        self.available(roles, ColumnRole::Categorical)
    }

    fn available<'a>(&self, roles: &'a ColumnRoles, role: ColumnRole) -> Vec<&'a str> {
        roles
            .candidates(role)
            .iter()
            .map(String::as_str)
            .filter(|column| !self.constrains(column))
            .collect()
    }

    fn check_column(
        &self,
        roles: &ColumnRoles,
        column: &str,
        expected: ColumnRole,
    ) -> Result<(), ValidationError> {
        let actual = roles
            .role_of(column)
            .ok_or_else(|| ValidationError::UnknownColumn(column.to_string()))?;
        if actual != expected {
            return Err(ValidationError::WrongRole {
                slot: "filter",
                column: column.to_string(),
                expected,
                actual,
            });
        }
        if self.constrains(column) {
            return Err(ValidationError::DuplicateFilter(column.to_string()));
        }
        Ok(())
    }

    /// Adds an inclusive range on a numeric column.
    pub fn range(
        &mut self,
        roles: &ColumnRoles,
        column: &str,
        min: f64,
        max: f64,
    ) -> Result<&mut Self, ValidationError> {
        self.check_column(roles, column, ColumnRole::Numeric)?;
        if min.is_nan() || max.is_nan() {
            return Err(ValidationError::NonFiniteBound(column.to_string()));
        }
        if min > max {
            return Err(ValidationError::InvertedRange {
                column: column.to_string(),
                min,
                max,
            });
        }
        self.constraints.push(Constraint::NumericRange {
            column: column.to_string(),
            min,
            max,
        });
        Ok(self)
    }

    /// Adds a range whose omitted bounds default to the column's anchored range.
    pub fn range_or_anchored(
        &mut self,
        roles: &ColumnRoles,
        bounds: &AnchoredBounds,
        column: &str,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<&mut Self, ValidationError> {
        self.check_column(roles, column, ColumnRole::Numeric)?;
        let anchored = bounds
            .get(column)
            .ok_or_else(|| ValidationError::NoBounds(column.to_string()))?;
        let min = min.unwrap_or(anchored.min);
        let max = max.unwrap_or(anchored.max);
        debug!("Range filter on '{column}': [{min}, {max}]");
        self.range(roles, column, min, max)
    }

    /// Adds a membership filter; an empty value list restricts nothing.
    pub fn include<I, S>(
        &mut self,
        roles: &ColumnRoles,
        column: &str,
        values: I,
    ) -> Result<&mut Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.check_column(roles, column, ColumnRole::Categorical)?;
        self.constraints.push(Constraint::CategoricalSet {
            column: column.to_string(),
            allowed: values.into_iter().map(Into::into).collect(),
        });
        Ok(self)
    }
}

/// Returns the rows of `table` admitted by every constraint of `spec`.
///
/// Numeric constraints run first, then categorical ones; the input is never modified.
pub fn apply(table: &Table, spec: &FilterSpec) -> Result<Table, ValidationError> {
    if spec.is_empty() {
        return Ok(table.clone());
    }
    let ordered = spec
        .constraints
        .iter()
        .sorted_by_key(|c| matches!(c, Constraint::CategoricalSet { .. }))
        .map(|constraint| {
            table
                .column(constraint.column())
                .map(|column| (constraint, column))
                .ok_or_else(|| ValidationError::UnknownColumn(constraint.column().to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut rows: Vec<usize> = (0..table.row_count()).collect();
    for (constraint, column) in ordered {
        rows.retain(|&row| constraint.admits(column.cells[row].as_ref()));
    }
    debug!(
        "Filters kept {} of {} row(s)",
        rows.len(),
        table.row_count()
    );
    Ok(table.select_rows(&rows))
}

/// Distinct non-missing display values of `column` in first-appearance order.
pub fn distinct_values(table: &Table, column: &str) -> Option<Vec<String>> {
    let column = table.column(column)?;
    Some(
        column
            .cells
            .iter()
            .flatten()
            .map(Value::as_display)
            .unique()
            .collect(),
    )
}

/// A numeric filter selection as given on the command line or in a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeSelection {
    pub column: String,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

/// A categorical filter selection as given on the command line or in a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySelection {
    pub column: String,
    #[serde(default)]
    pub values: Vec<String>,
}

/// Parses `column=min..max`; either bound may be omitted (`price=10..`).
pub fn parse_range(spec: &str) -> Result<RangeSelection> {
    let (column, range) = split_assignment(spec)?;
    let (min, max) = range
        .split_once("..")
        .ok_or_else(|| anyhow!("Range '{spec}' must look like column=min..max"))?;
    Ok(RangeSelection {
        column: column.to_string(),
        min: parse_bound(min, spec)?,
        max: parse_bound(max, spec)?,
    })
}

/// Parses `column=a,b,c`; an empty list (`column=`) restricts nothing.
pub fn parse_include(spec: &str) -> Result<CategorySelection> {
    let (column, values) = split_assignment(spec)?;
    Ok(CategorySelection {
        column: column.to_string(),
        values: values
            .split(',')
            .map(unquote)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect(),
    })
}

fn split_assignment(spec: &str) -> Result<(&str, &str)> {
    let trimmed = spec.trim();
    let Some((column, rest)) = trimmed.split_once('=') else {
        bail!("Failed to parse filter '{trimmed}' (expected column=...)");
    };
    let column = unquote(column);
    if column.is_empty() {
        bail!("Filter '{trimmed}' is missing a column name");
    }
    Ok((column, rest.trim()))
}

fn parse_bound(raw: &str, spec: &str) -> Result<Option<f64>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|_| anyhow!("Invalid bound '{raw}' in range '{spec}'"))
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    if value.len() >= 2 {
        let bytes = value.as_bytes();
        if (bytes[0] == b'"' && bytes[value.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[value.len() - 1] == b'\'')
        {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_range_allows_open_bounds() {
        let range = parse_range("price=10..").unwrap();
        assert_eq!(range.column, "price");
        assert_eq!(range.min, Some(10.0));
        assert_eq!(range.max, None);

        let range = parse_range("'unit price' = -1.5..2").unwrap();
        assert_eq!(range.column, "unit price");
        assert_eq!(range.min, Some(-1.5));
        assert_eq!(range.max, Some(2.0));

        assert!(parse_range("price=10").is_err());
        assert!(parse_range("price=a..b").is_err());
    }

    #[test]
    fn parse_include_splits_values() {
        let include = parse_include("city=Paris, \"Lyon\"").unwrap();
        assert_eq!(include.column, "city");
        assert_eq!(include.values, vec!["Paris", "Lyon"]);
        assert!(parse_include("city=").unwrap().values.is_empty());
        assert!(parse_include("=Paris").is_err());
    }
}
