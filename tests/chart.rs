mod common;

use common::{SALES_CSV, table_from};
use csv_dashboard::{
    chart::{Aggregation, ChartKind, ChartLabels, ColumnSelections, HISTOGRAM_BINS, build},
    dataset::{Column, Table},
    error::ValidationError,
    schema::{ColumnRole, ColumnRoles, classify},
};

fn sales_roles() -> ColumnRoles {
    classify(&table_from(SALES_CSV))
}

fn select(configure: impl FnOnce(&mut ColumnSelections)) -> ColumnSelections {
    let mut selections = ColumnSelections::default();
    configure(&mut selections);
    selections
}

#[test]
fn histogram_defaults_to_first_numeric_column() {
    let spec = build(
        ChartKind::Histogram,
        &ColumnSelections::default(),
        &sales_roles(),
        &ChartLabels::default(),
    )
    .expect("histogram");
    assert_eq!(spec.x.as_deref(), Some("units"));
    assert_eq!(spec.y, None);
    assert_eq!(spec.x_label, "units");
    assert_eq!(spec.y_label, "");
    assert_eq!(spec.title, "");
    assert_eq!(spec.bins, Some(HISTOGRAM_BINS));
    assert_eq!(spec.aggregation, Aggregation::None);
}

#[test]
fn histogram_without_numeric_columns_fails() {
    let table = Table::new(vec![Column::texts("name", &[Some("a"), Some("b")])]).expect("table");
    let err = build(
        ChartKind::Histogram,
        &ColumnSelections::default(),
        &classify(&table),
        &ChartLabels::default(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        ValidationError::NoCandidate {
            slot: "value",
            role: ColumnRole::Numeric
        }
    );
}

#[test]
fn box_plot_puts_values_on_y() {
    let spec = build(
        ChartKind::BoxPlot,
        &select(|s| {
            s.value = Some("price".into());
            s.color = Some("region".into());
        }),
        &sales_roles(),
        &ChartLabels::default(),
    )
    .expect("box plot");
    assert_eq!(spec.x, None);
    assert_eq!(spec.y.as_deref(), Some("price"));
    assert_eq!(spec.color.as_deref(), Some("region"));
    assert_eq!((spec.x_label.as_str(), spec.y_label.as_str()), ("", "price"));
}

#[test]
fn scatter_rejects_categorical_axis() {
    let err = build(
        ChartKind::ScatterPlot,
        &select(|s| {
            s.x = Some("units".into());
            s.y = Some("region".into());
        }),
        &sales_roles(),
        &ChartLabels::default(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        ValidationError::WrongRole {
            slot: "y",
            column: "region".into(),
            expected: ColumnRole::Numeric,
            actual: ColumnRole::Categorical,
        }
    );
}

#[test]
fn unknown_column_is_reported() {
    let err = build(
        ChartKind::BarChart,
        &select(|s| s.category = Some("country".into())),
        &sales_roles(),
        &ChartLabels::default(),
    )
    .unwrap_err();
    assert_eq!(err, ValidationError::UnknownColumn("country".into()));
}

#[test]
fn slots_outside_the_kind_are_rejected() {
    let err = build(
        ChartKind::PieChart,
        &select(|s| s.color = Some("region".into())),
        &sales_roles(),
        &ChartLabels::default(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        ValidationError::UnusedSlot {
            kind: "Pie Chart",
            slot: "color"
        }
    );
}

#[test]
fn stacked_bar_uses_stack_as_color_and_sums() {
    let spec = build(
        ChartKind::StackedBarChart,
        &select(|s| {
            s.category = Some("region".into());
            s.value = Some("units".into());
            s.stack = Some("product".into());
        }),
        &sales_roles(),
        &ChartLabels {
            title: Some("Units by region".into()),
            legend_label: Some("Product".into()),
            ..ChartLabels::default()
        },
    )
    .expect("stacked bar");
    assert_eq!(spec.x.as_deref(), Some("region"));
    assert_eq!(spec.y.as_deref(), Some("units"));
    assert_eq!(spec.color.as_deref(), Some("product"));
    assert_eq!(spec.aggregation, Aggregation::Sum);
    assert_eq!(spec.title, "Units by region");
    assert_eq!(spec.legend_label, "Product");
    assert_eq!(spec.bins, None);
}

#[test]
fn pie_and_treemap_map_names_and_values() {
    for kind in [ChartKind::PieChart, ChartKind::Treemap] {
        let spec = build(
            kind,
            &ColumnSelections::default(),
            &sales_roles(),
            &ChartLabels::default(),
        )
        .expect("part-to-whole chart");
        assert_eq!(spec.x.as_deref(), Some("region"));
        assert_eq!(spec.y.as_deref(), Some("units"));
        assert_eq!(spec.x_label, "region");
        assert_eq!(spec.y_label, "");
        assert_eq!(spec.aggregation, Aggregation::Sum);
    }
}

#[test]
fn bubble_chart_requires_numeric_size() {
    let spec = build(
        ChartKind::BubbleChart,
        &select(|s| {
            s.x = Some("price".into());
            s.y = Some("units".into());
            s.size = Some("units".into());
        }),
        &sales_roles(),
        &ChartLabels {
            x_label: Some("Price".into()),
            ..ChartLabels::default()
        },
    )
    .expect("bubble");
    assert_eq!(spec.size.as_deref(), Some("units"));
    assert_eq!(spec.x_label, "Price");
    assert_eq!(spec.y_label, "units");

    let err = build(
        ChartKind::BubbleChart,
        &select(|s| s.size = Some("notes".into())),
        &sales_roles(),
        &ChartLabels::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ValidationError::WrongRole { slot: "size", .. }));
}

#[test]
fn chart_spec_serializes_to_json() {
    let spec = build(
        ChartKind::ScatterPlot,
        &ColumnSelections::default(),
        &sales_roles(),
        &ChartLabels::default(),
    )
    .expect("scatter");
    let json = serde_json::to_value(&spec).expect("json");
    assert_eq!(json["kind"], "scatter_plot");
    assert_eq!(json["x"], "units");
    assert_eq!(json["y"], "units");
    assert_eq!(json["aggregation"], "none");
    assert!(json.get("bins").is_none());
}
