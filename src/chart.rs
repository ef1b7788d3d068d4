//! Declarative chart specifications.
//!
//! [`build`] checks a chart kind against the columns a caller selected and
//! the roles of the current table, and produces a backend-independent
//! [`ChartSpec`]. Each kind declares its slots in [`ChartKind::slots`]; a
//! required slot left unselected takes the first column of its role.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    error::ValidationError,
    schema::{ColumnRole, ColumnRoles},
};

pub const HISTOGRAM_BINS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "kebab-case")]
pub enum ChartKind {
    Histogram,
    BoxPlot,
    ScatterPlot,
    BubbleChart,
    BarChart,
    StackedBarChart,
    Treemap,
    PieChart,
}

impl ChartKind {
    pub fn label(self) -> &'static str {
        match self {
            ChartKind::Histogram => "Histogram",
            ChartKind::BoxPlot => "Box Plot",
            ChartKind::ScatterPlot => "Scatter Plot",
            ChartKind::BubbleChart => "Bubble Chart",
            ChartKind::BarChart => "Bar Chart",
            ChartKind::StackedBarChart => "Stacked Bar Chart",
            ChartKind::Treemap => "Treemap",
            ChartKind::PieChart => "Pie Chart",
        }
    }

    pub fn aggregation(self) -> Aggregation {
        match self {
            ChartKind::Histogram
            | ChartKind::BoxPlot
            | ChartKind::ScatterPlot
            | ChartKind::BubbleChart => Aggregation::None,
            ChartKind::BarChart
            | ChartKind::StackedBarChart
            | ChartKind::Treemap
            | ChartKind::PieChart => Aggregation::Sum,
        }
    }

    pub fn slots(self) -> &'static [SlotRule] {
        match self {
            ChartKind::Histogram | ChartKind::BoxPlot => DISTRIBUTION_SLOTS,
            ChartKind::ScatterPlot => SCATTER_SLOTS,
            ChartKind::BubbleChart => BUBBLE_SLOTS,
            ChartKind::BarChart | ChartKind::Treemap | ChartKind::PieChart => PART_SLOTS,
            ChartKind::StackedBarChart => STACKED_SLOTS,
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    X,
    Y,
    Value,
    Category,
    Color,
    Stack,
    Size,
}

impl Slot {
    pub const ALL: [Slot; 7] = [
        Slot::X,
        Slot::Y,
        Slot::Value,
        Slot::Category,
        Slot::Color,
        Slot::Stack,
        Slot::Size,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Slot::X => "x",
            Slot::Y => "y",
            Slot::Value => "value",
            Slot::Category => "category",
            Slot::Color => "color",
            Slot::Stack => "stack",
            Slot::Size => "size",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRule {
    pub slot: Slot,
    pub role: ColumnRole,
    pub required: bool,
}

const fn required(slot: Slot, role: ColumnRole) -> SlotRule {
    SlotRule {
        slot,
        role,
        required: true,
    }
}

const fn optional(slot: Slot, role: ColumnRole) -> SlotRule {
    SlotRule {
        slot,
        role,
        required: false,
    }
}

const DISTRIBUTION_SLOTS: &[SlotRule] = &[
    required(Slot::Value, ColumnRole::Numeric),
    optional(Slot::Color, ColumnRole::Categorical),
];
const SCATTER_SLOTS: &[SlotRule] = &[
    required(Slot::X, ColumnRole::Numeric),
    required(Slot::Y, ColumnRole::Numeric),
    optional(Slot::Color, ColumnRole::Categorical),
];
const BUBBLE_SLOTS: &[SlotRule] = &[
    required(Slot::X, ColumnRole::Numeric),
    required(Slot::Y, ColumnRole::Numeric),
    required(Slot::Size, ColumnRole::Numeric),
    optional(Slot::Color, ColumnRole::Categorical),
];
const PART_SLOTS: &[SlotRule] = &[
    required(Slot::Category, ColumnRole::Categorical),
    required(Slot::Value, ColumnRole::Numeric),
];
const STACKED_SLOTS: &[SlotRule] = &[
    required(Slot::Category, ColumnRole::Categorical),
    required(Slot::Value, ColumnRole::Numeric),
    required(Slot::Stack, ColumnRole::Categorical),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    None,
    Sum,
}

/// Columns chosen by the caller, one optional entry per slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSelections {
    pub x: Option<String>,
    pub y: Option<String>,
    pub value: Option<String>,
    pub category: Option<String>,
    pub color: Option<String>,
    pub stack: Option<String>,
    pub size: Option<String>,
}

impl ColumnSelections {
    pub fn get(&self, slot: Slot) -> Option<&str> {
        match slot {
            Slot::X => self.x.as_deref(),
            Slot::Y => self.y.as_deref(),
            Slot::Value => self.value.as_deref(),
            Slot::Category => self.category.as_deref(),
            Slot::Color => self.color.as_deref(),
            Slot::Stack => self.stack.as_deref(),
            Slot::Size => self.size.as_deref(),
        }
    }

    /// Fills every slot left empty here from `fallback`.
    pub fn or(self, fallback: ColumnSelections) -> ColumnSelections {
        ColumnSelections {
            x: self.x.or(fallback.x),
            y: self.y.or(fallback.y),
            value: self.value.or(fallback.value),
            category: self.category.or(fallback.category),
            color: self.color.or(fallback.color),
            stack: self.stack.or(fallback.stack),
            size: self.size.or(fallback.size),
        }
    }
}

/// Label overrides; `None` keeps the kind's default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartLabels {
    pub title: Option<String>,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub legend_label: Option<String>,
}

impl ChartLabels {
    pub fn or(self, fallback: ChartLabels) -> ChartLabels {
        ChartLabels {
            title: self.title.or(fallback.title),
            x_label: self.x_label.or(fallback.x_label),
            y_label: self.y_label.or(fallback.y_label),
            legend_label: self.legend_label.or(fallback.legend_label),
        }
    }
}

/// Backend-independent chart description.
///
/// For pie charts and treemaps `x` names the names/path column and `y` the
/// values column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub x: Option<String>,
    pub y: Option<String>,
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub legend_label: String,
    pub aggregation: Aggregation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bins: Option<usize>,
}

#[derive(Debug, Default)]
struct Resolved {
    x: Option<String>,
    y: Option<String>,
    value: Option<String>,
    category: Option<String>,
    color: Option<String>,
    stack: Option<String>,
    size: Option<String>,
}

impl Resolved {
    fn set(&mut self, slot: Slot, column: String) {
        let target = match slot {
            Slot::X => &mut self.x,
            Slot::Y => &mut self.y,
            Slot::Value => &mut self.value,
            Slot::Category => &mut self.category,
            Slot::Color => &mut self.color,
            Slot::Stack => &mut self.stack,
            Slot::Size => &mut self.size,
        };
        *target = Some(column);
    }
}

fn resolve_slot(
    rule: &SlotRule,
    selected: Option<&str>,
    roles: &ColumnRoles,
) -> Result<Option<String>, ValidationError> {
    match selected {
        Some(column) => {
            let actual = roles
                .role_of(column)
                .ok_or_else(|| ValidationError::UnknownColumn(column.to_string()))?;
            if actual != rule.role {
                return Err(ValidationError::WrongRole {
                    slot: rule.slot.name(),
                    column: column.to_string(),
                    expected: rule.role,
                    actual,
                });
            }
            Ok(Some(column.to_string()))
        }
        None if rule.required => roles
            .candidates(rule.role)
            .first()
            .cloned()
            .map(Some)
            .ok_or(ValidationError::NoCandidate {
                slot: rule.slot.name(),
                role: rule.role,
            }),
        None => Ok(None),
    }
}

pub fn build(
    kind: ChartKind,
    selections: &ColumnSelections,
    roles: &ColumnRoles,
    labels: &ChartLabels,
) -> Result<ChartSpec, ValidationError> {
    let rules = kind.slots();
    if let Some(slot) = Slot::ALL
        .iter()
        .find(|slot| selections.get(**slot).is_some() && !rules.iter().any(|r| r.slot == **slot))
    {
        return Err(ValidationError::UnusedSlot {
            kind: kind.label(),
            slot: slot.name(),
        });
    }

    let mut resolved = Resolved::default();
    for rule in rules {
        if let Some(column) = resolve_slot(rule, selections.get(rule.slot), roles)? {
            resolved.set(rule.slot, column);
        }
    }

    let (x, y, color) = match kind {
        ChartKind::Histogram => (resolved.value, None, resolved.color),
        ChartKind::BoxPlot => (None, resolved.value, resolved.color),
        ChartKind::ScatterPlot | ChartKind::BubbleChart => (resolved.x, resolved.y, resolved.color),
        ChartKind::BarChart | ChartKind::Treemap | ChartKind::PieChart => {
            (resolved.category, resolved.value, None)
        }
        ChartKind::StackedBarChart => (resolved.category, resolved.value, resolved.stack),
    };

    let (default_x_label, default_y_label) = match kind {
        ChartKind::Histogram | ChartKind::Treemap | ChartKind::PieChart => {
            (x.clone().unwrap_or_default(), String::new())
        }
        ChartKind::BoxPlot => (String::new(), y.clone().unwrap_or_default()),
        _ => (x.clone().unwrap_or_default(), y.clone().unwrap_or_default()),
    };

    Ok(ChartSpec {
        kind,
        x,
        y,
        color,
        size: resolved.size,
        title: labels.title.clone().unwrap_or_default(),
        x_label: labels.x_label.clone().unwrap_or(default_x_label),
        y_label: labels.y_label.clone().unwrap_or(default_y_label),
        legend_label: labels.legend_label.clone().unwrap_or_default(),
        aggregation: kind.aggregation(),
        bins: (kind == ChartKind::Histogram).then_some(HISTOGRAM_BINS),
    })
}
