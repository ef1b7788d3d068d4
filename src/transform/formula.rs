//! Row-wise formula evaluation for derived columns.
//!
//! Formulas are parsed with `evalexpr` and then restricted to literals, column
//! references, arithmetic, comparison and boolean operators. Assignments,
//! chains, tuples and function calls are rejected before any row is
//! evaluated, so a formula can only read the current row.
//!
//! Identifiers resolve to columns by exact name first, then by their
//! normalized form (`Unit Price` is reachable as `unit_price`) when that form
//! is unambiguous.
//!
//! The checked tree is evaluated here rather than by `evalexpr`: numbers
//! compare by value whether they are integers or floats, and `/` is always
//! true division. Integer `+ - * %` stay exact and fail on overflow.

use std::{cmp::Ordering, collections::HashMap};

use evalexpr::{
    Context, ContextWithMutableVariables, HashMapContext, Node, Operator, Value as EvalValue,
    build_operator_tree,
};
use itertools::Itertools;
use log::debug;

use crate::{
    data::{Cell, ColumnType, Value, is_missing_token, normalize_column_name, value_to_evalexpr},
    dataset::{Column, Table},
    error::TransformError,
};

fn formula_error(detail: impl Into<String>) -> TransformError {
    TransformError::FormulaError(detail.into())
}

struct FormulaScope<'a> {
    table: &'a Table,
    aliases: HashMap<String, Option<usize>>,
}

impl<'a> FormulaScope<'a> {
    fn new(table: &'a Table) -> Self {
        let mut aliases: HashMap<String, Option<usize>> = HashMap::new();
        for (idx, column) in table.columns().iter().enumerate() {
            let alias = normalize_column_name(&column.name);
            if alias == column.name {
                continue;
            }
            aliases
                .entry(alias)
                .and_modify(|slot| *slot = None)
                .or_insert(Some(idx));
        }
        Self { table, aliases }
    }

    fn resolve(&self, identifier: &str) -> Result<usize, TransformError> {
        if let Some(idx) = self.table.column_index(identifier) {
            return Ok(idx);
        }
        match self.aliases.get(identifier) {
            Some(Some(idx)) => Ok(*idx),
            Some(None) => Err(formula_error(format!(
                "identifier '{identifier}' matches more than one column"
            ))),
            None => Err(formula_error(format!("unknown column '{identifier}'"))),
        }
    }
}

fn is_permitted(operator: &Operator) -> bool {
    matches!(
        operator,
        Operator::RootNode
            | Operator::Add
            | Operator::Sub
            | Operator::Neg
            | Operator::Mul
            | Operator::Div
            | Operator::Mod
            | Operator::Exp
            | Operator::Eq
            | Operator::Neq
            | Operator::Gt
            | Operator::Lt
            | Operator::Geq
            | Operator::Leq
            | Operator::And
            | Operator::Or
            | Operator::Not
            | Operator::Const { .. }
            | Operator::VariableIdentifierRead { .. }
    )
}

/// Parses and checks `formula`, returning its tree and the columns it reads.
fn compile(
    formula: &str,
    scope: &FormulaScope<'_>,
) -> Result<(Node, Vec<(String, usize)>), TransformError> {
    let parsed: Result<Node, _> = build_operator_tree(formula);
    let tree = parsed.map_err(|err| formula_error(format!("cannot parse '{formula}': {err}")))?;

    if let Some(node) = tree.iter().find(|node| !is_permitted(node.operator())) {
        return Err(formula_error(format!(
            "'{formula}' uses an unsupported construct ({:?}); only arithmetic and comparisons over columns are allowed",
            node.operator()
        )));
    }

    let references = tree
        .iter()
        .filter_map(|node| match node.operator() {
            Operator::VariableIdentifierRead { identifier } => Some(identifier.clone()),
            _ => None,
        })
        .unique()
        .map(|identifier| scope.resolve(&identifier).map(|idx| (identifier, idx)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((tree, references))
}

/// Evaluates `formula` for every row of `table` and returns the resulting column.
///
/// Rows where a referenced cell is missing produce a missing cell. Any
/// evaluation failure aborts the whole column.
pub fn derive_column(table: &Table, name: &str, formula: &str) -> Result<Column, TransformError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(formula_error("derived column name must not be empty"));
    }
    let scope = FormulaScope::new(table);
    let (tree, references) = compile(formula, &scope)?;
    debug!(
        "Deriving '{name}' from {} column reference(s)",
        references.len()
    );

    let columns = table.columns();
    let mut results = Vec::with_capacity(table.row_count());
    for row in 0..table.row_count() {
        let mut context: HashMapContext = HashMapContext::new();
        let mut complete = true;
        for (identifier, idx) in &references {
            let Some(value) = &columns[*idx].cells[row] else {
                complete = false;
                break;
            };
            context
                .set_value(identifier.clone(), value_to_evalexpr(value))
                .map_err(|err| formula_error(format!("binding '{identifier}': {err}")))?;
        }
        if !complete {
            results.push(None);
            continue;
        }
        let evaluated =
            evaluate(&tree, &context).map_err(|err| formula_error(format!("row {row}: {err}")))?;
        results.push(from_eval_value(evaluated, row)?);
    }

    let data_type = unify_types(&results)?;
    let cells = results
        .into_iter()
        .map(|cell| match (cell, data_type) {
            (Some(Value::Integer(i)), ColumnType::Float) => Some(Value::Float(i as f64)),
            (cell, _) => cell,
        })
        .collect();
    Ok(Column::new(name, data_type, cells))
}

/// Evaluates `node` against the bindings of one row.
fn evaluate(node: &Node, context: &HashMapContext) -> Result<EvalValue, String> {
    let args = node
        .children()
        .iter()
        .map(|child| evaluate(child, context))
        .collect::<Result<Vec<_>, _>>()?;
    match (node.operator(), args.as_slice()) {
        (Operator::RootNode, [value]) => Ok(value.clone()),
        (Operator::Const { value }, []) => Ok(value.clone()),
        (Operator::VariableIdentifierRead { identifier }, []) => context
            .get_value(identifier)
            .cloned()
            .ok_or_else(|| format!("no value bound for '{identifier}'")),
        (Operator::Neg, [EvalValue::Int(a)]) => a
            .checked_neg()
            .map(EvalValue::Int)
            .ok_or_else(|| format!("integer overflow negating {a}")),
        (Operator::Neg, [a]) => Ok(EvalValue::Float(-number(a)?)),
        (Operator::Not, [a]) => Ok(EvalValue::Boolean(!boolean(a)?)),
        (Operator::And, [a, b]) => Ok(EvalValue::Boolean(boolean(a)? && boolean(b)?)),
        (Operator::Or, [a, b]) => Ok(EvalValue::Boolean(boolean(a)? || boolean(b)?)),
        (Operator::Add, [EvalValue::String(a), EvalValue::String(b)]) => {
            Ok(EvalValue::String(format!("{a}{b}")))
        }
        (Operator::Add, [a, b]) => arithmetic("+", a, b, i64::checked_add, |x, y| x + y),
        (Operator::Sub, [a, b]) => arithmetic("-", a, b, i64::checked_sub, |x, y| x - y),
        (Operator::Mul, [a, b]) => arithmetic("*", a, b, i64::checked_mul, |x, y| x * y),
        (Operator::Mod, [a, b]) => arithmetic("%", a, b, i64::checked_rem, |x, y| x % y),
        (Operator::Div, [a, b]) => Ok(EvalValue::Float(number(a)? / number(b)?)),
        (Operator::Exp, [a, b]) => Ok(EvalValue::Float(number(a)?.powf(number(b)?))),
        (Operator::Eq, [a, b]) => Ok(EvalValue::Boolean(equal(a, b))),
        (Operator::Neq, [a, b]) => Ok(EvalValue::Boolean(!equal(a, b))),
        (Operator::Gt, [a, b]) => Ok(EvalValue::Boolean(compare(a, b)?.is_gt())),
        (Operator::Lt, [a, b]) => Ok(EvalValue::Boolean(compare(a, b)?.is_lt())),
        (Operator::Geq, [a, b]) => Ok(EvalValue::Boolean(compare(a, b)?.is_ge())),
        (Operator::Leq, [a, b]) => Ok(EvalValue::Boolean(compare(a, b)?.is_le())),
        (operator, args) => Err(format!(
            "{operator:?} cannot be applied to {} operand(s)",
            args.len()
        )),
    }
}

fn number(value: &EvalValue) -> Result<f64, String> {
    match value {
        EvalValue::Int(i) => Ok(*i as f64),
        EvalValue::Float(f) => Ok(*f),
        other => Err(format!("expected a number, found {other}")),
    }
}

fn boolean(value: &EvalValue) -> Result<bool, String> {
    match value {
        EvalValue::Boolean(b) => Ok(*b),
        other => Err(format!("expected true or false, found {other}")),
    }
}

fn arithmetic(
    symbol: &str,
    a: &EvalValue,
    b: &EvalValue,
    integer: fn(i64, i64) -> Option<i64>,
    float: fn(f64, f64) -> f64,
) -> Result<EvalValue, String> {
    match (a, b) {
        (EvalValue::Int(x), EvalValue::Int(y)) => integer(*x, *y)
            .map(EvalValue::Int)
            .ok_or_else(|| format!("{x} {symbol} {y} overflows or divides by zero")),
        _ => Ok(EvalValue::Float(float(number(a)?, number(b)?))),
    }
}

/// Numbers are equal by value across integer and float; other values must match exactly.
fn equal(a: &EvalValue, b: &EvalValue) -> bool {
    match (a, b) {
        (EvalValue::Int(x), EvalValue::Int(y)) => x == y,
        (EvalValue::Int(_) | EvalValue::Float(_), EvalValue::Int(_) | EvalValue::Float(_)) => {
            number(a).ok() == number(b).ok()
        }
        _ => a == b,
    }
}

fn compare(a: &EvalValue, b: &EvalValue) -> Result<Ordering, String> {
    match (a, b) {
        (EvalValue::Int(x), EvalValue::Int(y)) => Ok(x.cmp(y)),
        (EvalValue::String(x), EvalValue::String(y)) => Ok(x.cmp(y)),
        _ => number(a)?
            .partial_cmp(&number(b)?)
            .ok_or_else(|| format!("cannot order {a} and {b}")),
    }
}

/// Text results that read as missing are stored as missing so an export reloads unchanged.
fn from_eval_value(value: EvalValue, row: usize) -> Result<Cell, TransformError> {
    match value {
        EvalValue::Int(i) => Ok(Some(Value::Integer(i))),
        EvalValue::Float(f) if f.is_finite() => Ok(Some(Value::Float(f))),
        EvalValue::Float(_) => Err(formula_error(format!(
            "row {row}: division by zero or non-finite result"
        ))),
        EvalValue::String(s) if is_missing_token(&s) => Ok(None),
        EvalValue::String(s) => Ok(Some(Value::Text(s))),
        EvalValue::Boolean(b) => Ok(Some(Value::Text(b.to_string()))),
        EvalValue::Tuple(_) | EvalValue::Empty => Err(formula_error(format!(
            "row {row}: formula did not produce a single value"
        ))),
    }
}

fn unify_types(results: &[Option<Value>]) -> Result<ColumnType, TransformError> {
    let mut unified: Option<ColumnType> = None;
    for value in results.iter().flatten() {
        let ty = value.column_type();
        unified = Some(match unified {
            None => ty,
            Some(current) if current == ty => current,
            Some(current) if current.is_numeric() && ty.is_numeric() => ColumnType::Float,
            Some(current) => {
                return Err(formula_error(format!(
                    "formula produced both {current} and {ty} values"
                )));
            }
        });
    }
    Ok(unified.unwrap_or(ColumnType::Text))
}
