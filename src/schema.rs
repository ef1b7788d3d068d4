//! Column type inference and role classification.
//!
//! Inference runs once at load time and fixes each column's declared
//! [`ColumnType`]. Classification runs on every pass and splits the columns
//! into numeric and categorical roles, in table order, so that every choice a
//! caller is offered is deterministic.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    data::{ColumnType, is_missing_token, parse_float, parse_integer},
    dataset::Table,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnRole {
    Numeric,
    Categorical,
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRole::Numeric => f.write_str("numeric"),
            ColumnRole::Categorical => f.write_str("categorical"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnRoles {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
}

impl ColumnRoles {
    pub fn role_of(&self, column: &str) -> Option<ColumnRole> {
        if self.numeric.iter().any(|c| c == column) {
            Some(ColumnRole::Numeric)
        } else if self.categorical.iter().any(|c| c == column) {
            Some(ColumnRole::Categorical)
        } else {
            None
        }
    }

    pub fn candidates(&self, role: ColumnRole) -> &[String] {
        match role {
            ColumnRole::Numeric => &self.numeric,
            ColumnRole::Categorical => &self.categorical,
        }
    }
}

/// Numeric iff the declared type is numeric and at least one value is present.
pub fn classify(table: &Table) -> ColumnRoles {
    let mut roles = ColumnRoles::default();
    for column in table.columns() {
        if column.data_type.is_numeric() && column.has_values() {
            roles.numeric.push(column.name.clone());
        } else {
            roles.categorical.push(column.name.clone());
        }
    }
    roles
}

/// Columns holding at least one missing cell, in table order.
pub fn missing_columns(table: &Table) -> Vec<String> {
    table
        .columns()
        .iter()
        .filter(|column| column.missing_count() > 0)
        .map(|column| column.name.clone())
        .collect()
}

#[derive(Debug, Clone)]
pub(crate) struct TypeCandidate {
    possible_integer: bool,
    possible_float: bool,
    observed: bool,
}

impl TypeCandidate {
    pub(crate) fn new() -> Self {
        Self {
            possible_integer: true,
            possible_float: true,
            observed: false,
        }
    }

    pub(crate) fn observe(&mut self, value: &str) {
        if is_missing_token(value) {
            return;
        }
        self.observed = true;
        if self.possible_integer && parse_integer(value).is_none() {
            self.possible_integer = false;
        }
        if self.possible_float && parse_float(value).is_none() {
            self.possible_float = false;
        }
    }

    pub(crate) fn decide(&self) -> ColumnType {
        if !self.observed {
            ColumnType::Text
        } else if self.possible_integer {
            ColumnType::Integer
        } else if self.possible_float {
            ColumnType::Float
        } else {
            ColumnType::Text
        }
    }
}

/// Infers a column type from raw fields.
pub fn infer_column_type<'a, I>(values: I) -> ColumnType
where
    I: IntoIterator<Item = &'a str>,
{
    let mut candidate = TypeCandidate::new();
    for value in values {
        candidate.observe(value);
    }
    candidate.decide()
}
