use crate::{
    data::Value,
    dataset::{Column, Table},
    schema::{ColumnRole, ColumnRoles},
};

/// Summary of one column as shown by the `columns` command.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub name: String,
    pub role: ColumnRole,
    pub count: usize,
    pub missing: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
}

impl ColumnSummary {
    pub fn render_row(&self, data_type: &str) -> Vec<String> {
        vec![
            self.name.clone(),
            data_type.to_string(),
            self.role.to_string(),
            self.count.to_string(),
            self.missing.to_string(),
            format_metric(self.min),
            format_metric(self.max),
            format_metric(self.mean),
            format_metric(self.median),
        ]
    }
}

pub fn summarize(table: &Table, roles: &ColumnRoles) -> Vec<ColumnSummary> {
    table
        .columns()
        .iter()
        .map(|column| {
            let role = roles
                .role_of(&column.name)
                .unwrap_or(ColumnRole::Categorical);
            let missing = column.missing_count();
            let count = column.len() - missing;
            if role == ColumnRole::Numeric {
                let values = numeric_values(column);
                let (min, max) = min_max(&values).unzip();
                ColumnSummary {
                    name: column.name.clone(),
                    role,
                    count,
                    missing,
                    min,
                    max,
                    mean: mean(&values),
                    median: median(&values),
                }
            } else {
                ColumnSummary {
                    name: column.name.clone(),
                    role,
                    count,
                    missing,
                    min: None,
                    max: None,
                    mean: None,
                    median: None,
                }
            }
        })
        .collect()
}

/// Non-missing numeric cells of `column` as floats; text cells are skipped.
pub fn numeric_values(column: &Column) -> Vec<f64> {
    column
        .cells
        .iter()
        .flatten()
        .filter_map(Value::as_f64)
        .collect()
}

pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    values.iter().fold(None, |acc, &value| match acc {
        None => Some((value, value)),
        Some((lo, hi)) => Some((lo.min(value), hi.max(value))),
    })
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len().is_multiple_of(2) {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.4}")
    }
}

fn format_metric(metric: Option<f64>) -> String {
    metric.map(format_number).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_handles_even_and_odd_lengths() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn mean_and_bounds_cover_all_values() {
        let values = [1.0, 2.0, 6.0];
        assert_eq!(mean(&values), Some(3.0));
        assert_eq!(min_max(&values), Some((1.0, 6.0)));
        assert_eq!(min_max(&[]), None);
    }
}
