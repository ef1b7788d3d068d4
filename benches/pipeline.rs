use std::fmt::Write as _;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use csv_dashboard::{
    chart::ChartKind,
    filter::{CategorySelection, RangeSelection},
    io_utils::Delimiter,
    pipeline::{self, DashboardRequest},
    store::TableStore,
    transform::TransformOp,
};

fn generate_orders(rows: usize) -> String {
    let mut csv = String::from("id,region,units,price\n");
    for i in 0..rows {
        let region = match i % 3 {
            0 => "north",
            1 => "south",
            _ => "east",
        };
        let units = if i % 17 == 0 {
            String::new()
        } else {
            (i % 40).to_string()
        };
        let _ = writeln!(csv, "{i},{region},{units},{}.{:02}", i % 90, i % 100);
    }
    csv
}

fn loaded_store(csv: &str) -> TableStore {
    let mut store = TableStore::new();
    store
        .load(csv.as_bytes(), Delimiter::Comma)
        .expect("load orders");
    store
}

fn bench_render(c: &mut Criterion) {
    let store = loaded_store(&generate_orders(50_000));
    let table = store.get().expect("loaded");
    let mut request = DashboardRequest::new(ChartKind::BarChart);
    request.numeric_filters.push(RangeSelection {
        column: "units".into(),
        min: Some(5.0),
        max: None,
    });
    request.categorical_filters.push(CategorySelection {
        column: "region".into(),
        values: vec!["north".into(), "east".into()],
    });

    c.bench_function("render_filtered_bar_chart", |b| {
        b.iter(|| pipeline::render(table, &request).expect("render"))
    });
}

fn bench_derive(c: &mut Criterion) {
    let csv = generate_orders(20_000);
    let op = TransformOp::DeriveColumn {
        name: "revenue".into(),
        formula: "units * price / 2".into(),
    };

    c.bench_function("derive_revenue_column", |b| {
        b.iter_batched(
            || loaded_store(&csv),
            |mut store| store.apply(&op).expect("derive"),
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, bench_render, bench_derive);
criterion_main!(benches);
