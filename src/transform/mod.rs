//! Single-step column transformations.
//!
//! Every [`TransformOp`] is all-or-nothing: [`apply`] either returns a new
//! table with the change applied or an error, and never touches its input.

pub mod formula;

use std::fmt;

use anyhow::{Result, anyhow, bail};
use log::{debug, info, warn};

use crate::{
    data::{ColumnType, Value, is_missing_token, parse_float, parse_integer},
    dataset::{Column, Table},
    error::TransformError,
    stats,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Imputation {
    Mean,
    Median,
    FixedValue(String),
}

impl fmt::Display for Imputation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Imputation::Mean => f.write_str("mean"),
            Imputation::Median => f.write_str("median"),
            Imputation::FixedValue(value) => write!(f, "value '{value}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransformOp {
    Convert {
        column: String,
        target: ColumnType,
    },
    Impute {
        column: String,
        method: Imputation,
    },
    DeriveColumn {
        name: String,
        formula: String,
    },
}

impl fmt::Display for TransformOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformOp::Convert { column, target } => write!(f, "convert '{column}' to {target}"),
            TransformOp::Impute { column, method } => {
                write!(f, "fill missing '{column}' with {method}")
            }
            TransformOp::DeriveColumn { name, formula } => write!(f, "derive '{name}' = {formula}"),
        }
    }
}

impl TransformOp {
    /// Parses `column:type`, e.g. `price:float`.
    pub fn parse_convert(spec: &str) -> Result<Self> {
        let (column, target) = split_column_spec(spec, "conversion")?;
        Ok(TransformOp::Convert {
            column: column.to_string(),
            target: target.parse()?,
        })
    }

    /// Parses `column:mean`, `column:median` or `column:value=TEXT`.
    pub fn parse_impute(spec: &str) -> Result<Self> {
        let (column, method) = split_column_spec(spec, "imputation")?;
        let method = match method.to_ascii_lowercase().as_str() {
            "mean" => Imputation::Mean,
            "median" => Imputation::Median,
            _ => match method.split_once('=') {
                Some((key, value)) if key.trim().eq_ignore_ascii_case("value") => {
                    if value.is_empty() {
                        bail!("Imputation '{spec}' is missing a fill value");
                    }
                    Imputation::FixedValue(value.to_string())
                }
                _ => bail!(
                    "Unknown imputation method '{method}' (expected mean, median or value=TEXT)"
                ),
            },
        };
        Ok(TransformOp::Impute {
            column: column.to_string(),
            method,
        })
    }

    /// Parses `name=formula`.
    pub fn parse_derive(spec: &str) -> Result<Self> {
        let mut parts = spec.splitn(2, '=');
        let name = parts
            .next()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("Derived column is missing a name"))?;
        let formula = parts
            .next()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("Derived column '{name}' is missing a formula"))?;
        Ok(TransformOp::DeriveColumn {
            name: name.to_string(),
            formula: formula.to_string(),
        })
    }
}

fn split_column_spec<'a>(spec: &'a str, what: &str) -> Result<(&'a str, &'a str)> {
    let (column, rest) = spec
        .split_once(':')
        .ok_or_else(|| anyhow!("Invalid {what} '{spec}' (expected column:option)"))?;
    let column = column.trim();
    if column.is_empty() {
        bail!("Invalid {what} '{spec}': column name is empty");
    }
    Ok((column, rest.trim()))
}

/// What a successful transformation did, for user-facing reporting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformReport {
    pub column: String,
    pub changed_cells: usize,
    /// Rows whose non-numeric value was dropped while coercing to numbers.
    pub coerced_rows: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct TransformOutcome {
    pub table: Table,
    pub report: TransformReport,
}

pub fn apply(table: &Table, op: &TransformOp) -> Result<TransformOutcome, TransformError> {
    let outcome = match op {
        TransformOp::Convert { column, target } => convert(table, column, *target)?,
        TransformOp::Impute { column, method } => impute(table, column, method)?,
        TransformOp::DeriveColumn { name, formula } => {
            let column = formula::derive_column(table, name, formula)?;
            let replaced = table.column_index(name).is_some();
            let changed_cells = column.len();
            if replaced {
                debug!("Derived column '{name}' overwrites the existing column");
            }
            TransformOutcome {
                table: table.with_column(column)?,
                report: TransformReport {
                    column: name.clone(),
                    changed_cells,
                    coerced_rows: Vec::new(),
                },
            }
        }
    };
    info!(
        "Applied {op}: {} cell(s) changed",
        outcome.report.changed_cells
    );
    Ok(outcome)
}

fn find_column<'a>(table: &'a Table, name: &str) -> Result<&'a Column, TransformError> {
    table
        .column(name)
        .ok_or_else(|| TransformError::UnknownColumn(name.to_string()))
}

fn convert(table: &Table, name: &str, target: ColumnType) -> Result<TransformOutcome, TransformError> {
    let column = find_column(table, name)?;
    let mut cells = Vec::with_capacity(column.len());
    let mut changed_cells = 0usize;
    for (row, cell) in column.cells.iter().enumerate() {
        let converted = match cell {
            None => None,
            Some(value) => Some(convert_value(value, target).ok_or_else(|| {
                TransformError::CastFailure {
                    row,
                    value: value.as_display(),
                    target,
                }
            })?),
        };
        if converted != *cell {
            changed_cells += 1;
        }
        cells.push(converted);
    }
    Ok(TransformOutcome {
        table: table.with_column(Column::new(name, target, cells))?,
        report: TransformReport {
            column: name.to_string(),
            changed_cells,
            coerced_rows: Vec::new(),
        },
    })
}

fn convert_value(value: &Value, target: ColumnType) -> Option<Value> {
    match target {
        ColumnType::Integer => match value {
            Value::Integer(i) => Some(Value::Integer(*i)),
            Value::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Some(Value::Integer(*f as i64))
            }
            Value::Float(_) => None,
            Value::Text(s) => parse_integer(s).map(Value::Integer),
        },
        ColumnType::Float => match value {
            Value::Integer(i) => Some(Value::Float(*i as f64)),
            Value::Float(f) => Some(Value::Float(*f)),
            Value::Text(s) => parse_float(s).map(Value::Float),
        },
        ColumnType::Text => Some(Value::Text(value.as_display())),
    }
}

fn impute(table: &Table, name: &str, method: &Imputation) -> Result<TransformOutcome, TransformError> {
    let column = find_column(table, name)?;
    match method {
        Imputation::Mean | Imputation::Median => impute_statistic(table, column, method),
        Imputation::FixedValue(value) => impute_fixed(table, column, value),
    }
}

fn impute_statistic(
    table: &Table,
    column: &Column,
    method: &Imputation,
) -> Result<TransformOutcome, TransformError> {
    let mut coerced_rows = Vec::new();
    let numbers = column
        .cells
        .iter()
        .enumerate()
        .map(|(row, cell)| match cell {
            None => None,
            Some(Value::Text(s)) => {
                let parsed = parse_float(s);
                if parsed.is_none() {
                    coerced_rows.push(row);
                }
                parsed
            }
            Some(value) => value.as_f64(),
        })
        .collect::<Vec<_>>();

    let present = numbers.iter().flatten().copied().collect::<Vec<_>>();
    let statistic = match method {
        Imputation::Mean => stats::mean(&present),
        _ => stats::median(&present),
    }
    .ok_or_else(|| TransformError::EmptyColumn(column.name.clone()))?;

    if !coerced_rows.is_empty() {
        warn!(
            "{} non-numeric value(s) in '{}' were treated as missing (rows {:?})",
            coerced_rows.len(),
            column.name,
            coerced_rows
        );
    }

    let changed_cells = numbers.iter().filter(|n| n.is_none()).count();
    if changed_cells == 0 && column.data_type.is_numeric() {
        debug!("Column '{}' has no missing values", column.name);
        return Ok(TransformOutcome {
            table: table.clone(),
            report: TransformReport {
                column: column.name.clone(),
                ..TransformReport::default()
            },
        });
    }

    debug!("Filling '{}' with {method} {statistic}", column.name);
    let cells = numbers
        .into_iter()
        .map(|n| Some(Value::Float(n.unwrap_or(statistic))))
        .collect();
    Ok(TransformOutcome {
        table: table.with_column(Column::new(column.name.clone(), ColumnType::Float, cells))?,
        report: TransformReport {
            column: column.name.clone(),
            changed_cells,
            coerced_rows,
        },
    })
}

fn impute_fixed(table: &Table, column: &Column, value: &str) -> Result<TransformOutcome, TransformError> {
    if is_missing_token(value) {
        return Err(TransformError::MissingFill(value.to_string()));
    }
    let missing_rows = column
        .cells
        .iter()
        .enumerate()
        .filter(|(_, cell)| cell.is_none())
        .map(|(row, _)| row)
        .collect::<Vec<_>>();
    let Some(&first_missing) = missing_rows.first() else {
        return Ok(TransformOutcome {
            table: table.clone(),
            report: TransformReport {
                column: column.name.clone(),
                ..TransformReport::default()
            },
        });
    };

    let fill = match column.data_type {
        ColumnType::Text => Some(Value::Text(value.to_string())),
        ColumnType::Integer => parse_integer(value).map(Value::Integer),
        ColumnType::Float => parse_float(value).map(Value::Float),
    }
    .ok_or_else(|| TransformError::CastFailure {
        row: first_missing,
        value: value.to_string(),
        target: column.data_type,
    })?;

    let cells = column
        .cells
        .iter()
        .map(|cell| cell.clone().or_else(|| Some(fill.clone())))
        .collect();
    Ok(TransformOutcome {
        table: table.with_column(Column::new(column.name.clone(), column.data_type, cells))?,
        report: TransformReport {
            column: column.name.clone(),
            changed_cells: missing_rows.len(),
            coerced_rows: Vec::new(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_convert_accepts_type_labels() {
        assert_eq!(
            TransformOp::parse_convert("price:float").unwrap(),
            TransformOp::Convert {
                column: "price".into(),
                target: ColumnType::Float
            }
        );
        assert!(TransformOp::parse_convert("price").is_err());
        assert!(TransformOp::parse_convert("price:date").is_err());
    }

    #[test]
    fn parse_impute_supports_fixed_values() {
        assert_eq!(
            TransformOp::parse_impute("city:value=Unknown").unwrap(),
            TransformOp::Impute {
                column: "city".into(),
                method: Imputation::FixedValue("Unknown".into())
            }
        );
        assert_eq!(
            TransformOp::parse_impute("age:Median").unwrap(),
            TransformOp::Impute {
                column: "age".into(),
                method: Imputation::Median
            }
        );
        assert!(TransformOp::parse_impute("age:mode").is_err());
    }

    #[test]
    fn parse_derive_splits_on_first_equals() {
        assert_eq!(
            TransformOp::parse_derive("flag = a == b").unwrap(),
            TransformOp::DeriveColumn {
                name: "flag".into(),
                formula: "a == b".into()
            }
        );
        assert!(TransformOp::parse_derive("=a + b").is_err());
        assert!(TransformOp::parse_derive("total=").is_err());
    }

    #[test]
    fn convert_value_rejects_fractional_integers() {
        assert_eq!(
            convert_value(&Value::Float(3.0), ColumnType::Integer),
            Some(Value::Integer(3))
        );
        assert_eq!(convert_value(&Value::Float(3.5), ColumnType::Integer), None);
        assert_eq!(
            convert_value(&Value::Integer(2), ColumnType::Text),
            Some(Value::Text("2".into()))
        );
    }
}
