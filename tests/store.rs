mod common;

use common::{SALES_CSV, column_display, store_from};
use csv_dashboard::{
    data::{ColumnType, MISSING_PLACEHOLDERS, Value, is_missing_token},
    dataset::{Column, Table},
    error::{EditError, EmptyStore, ParseError, TransformError},
    io_utils::{Delimiter, resolve_encoding},
    store::{LoadOptions, TableStore},
    transform::{Imputation, TransformOp},
};
use proptest::prelude::*;

#[test]
fn load_infers_types_and_missing_values() {
    let store = store_from(SALES_CSV);
    let table = store.get().expect("loaded");
    assert_eq!(table.row_count(), 5);
    assert_eq!(
        table.headers(),
        vec!["region", "product", "units", "price", "notes"]
    );
    let types = table
        .columns()
        .iter()
        .map(|c| c.data_type)
        .collect::<Vec<_>>();
    assert_eq!(
        types,
        vec![
            ColumnType::Text,
            ColumnType::Text,
            ColumnType::Integer,
            ColumnType::Float,
            ColumnType::Text
        ]
    );
    let units = table.column("units").expect("units");
    assert_eq!(units.cells[1], Some(Value::Integer(12)));
    assert_eq!(units.cells[3], None);
    assert_eq!(table.column("notes").expect("notes").missing_count(), 4);
}

#[test]
fn load_with_semicolon_delimiter() {
    let mut store = TableStore::new();
    let table = store
        .load(b"a;b\n1;x\n2;y\n", Delimiter::Semicolon)
        .expect("load");
    assert_eq!(table.headers(), vec!["a", "b"]);
    assert_eq!(table.column("a").expect("a").data_type, ColumnType::Integer);
}

#[test]
fn load_decodes_declared_encoding() {
    let mut store = TableStore::new();
    let options = LoadOptions {
        delimiter: Delimiter::Comma,
        encoding: resolve_encoding(Some("windows-1252")).expect("encoding"),
    };
    let table = store
        .load_with(b"city\nS\xe8te\n", &options)
        .expect("load");
    assert_eq!(column_display(table, "city"), vec!["Sète"]);
}

#[test]
fn ragged_rows_are_rejected() {
    let mut store = TableStore::new();
    let err = store
        .load(b"a,b\n1,2\n3\n", Delimiter::Comma)
        .unwrap_err();
    assert!(matches!(
        err,
        ParseError::FieldCount {
            expected: 2,
            found: 1,
            ..
        }
    ));
    assert!(!store.is_loaded());
}

#[test]
fn duplicate_headers_are_rejected() {
    let mut store = TableStore::new();
    let err = store.load(b"a,a\n1,2\n", Delimiter::Comma).unwrap_err();
    assert_eq!(err, ParseError::DuplicateHeader("a".into()));
}

#[test]
fn empty_input_has_no_header() {
    let mut store = TableStore::new();
    assert_eq!(
        store.load(b"", Delimiter::Comma).unwrap_err(),
        ParseError::MissingHeader
    );
}

#[test]
fn invalid_utf8_is_an_encoding_error() {
    let mut store = TableStore::new();
    let err = store
        .load(b"name\n\xff\xfe\xfa\n", Delimiter::Comma)
        .unwrap_err();
    assert!(matches!(err, ParseError::Encoding { .. }));
}

#[test]
fn failed_load_keeps_previous_table() {
    let mut store = store_from(SALES_CSV);
    assert!(store.load(b"a,b\n1\n", Delimiter::Comma).is_err());
    assert_eq!(store.get().expect("still loaded").row_count(), 5);
}

#[test]
fn empty_store_reports_no_data() {
    let mut store = TableStore::new();
    assert_eq!(store.get().unwrap_err(), EmptyStore);
    assert_eq!(store.get().unwrap_err().to_string(), "No data loaded yet");
    assert_eq!(store.preview(5).unwrap_err(), EmptyStore);
    let op = TransformOp::DeriveColumn {
        name: "x".into(),
        formula: "1".into(),
    };
    assert_eq!(store.apply(&op).unwrap_err(), EditError::Empty(EmptyStore));
}

#[test]
fn failed_edit_leaves_table_and_history_untouched() {
    let mut store = store_from(SALES_CSV);
    let before = store.get().expect("loaded").clone();
    let op = TransformOp::Convert {
        column: "region".into(),
        target: ColumnType::Integer,
    };
    let err = store.apply(&op).unwrap_err();
    assert!(matches!(
        err,
        EditError::Transform(TransformError::CastFailure { row: 0, .. })
    ));
    assert_eq!(store.get().expect("loaded"), &before);
    assert!(store.history().is_empty());
}

#[test]
fn undo_restores_previous_edit() {
    let mut store = store_from(SALES_CSV);
    let original = store.get().expect("loaded").clone();
    store
        .apply(&TransformOp::Impute {
            column: "units".into(),
            method: Imputation::FixedValue("0".into()),
        })
        .expect("impute");
    store
        .apply(&TransformOp::DeriveColumn {
            name: "revenue".into(),
            formula: "units * price".into(),
        })
        .expect("derive");
    assert_eq!(store.history().len(), 2);
    assert!(store.get().expect("loaded").column("revenue").is_some());

    let undone = store.undo().expect("undo derive");
    assert!(undone.contains("revenue"));
    assert!(store.get().expect("loaded").column("revenue").is_none());
    store.undo().expect("undo impute");
    assert_eq!(store.get().expect("loaded"), &original);
    assert!(store.undo().is_none());
}

#[test]
fn reload_clears_history() {
    let mut store = store_from(SALES_CSV);
    store
        .apply(&TransformOp::Convert {
            column: "units".into(),
            target: ColumnType::Float,
        })
        .expect("convert");
    store.load(b"a\n1\n", Delimiter::Comma).expect("reload");
    assert!(store.history().is_empty());
    store.reset();
    assert!(!store.is_loaded());
}

#[test]
fn preview_returns_leading_rows() {
    let store = store_from(SALES_CSV);
    let rows = store.preview(2).expect("preview");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], vec!["north", "widget", "5", "2.5", ""]);
    assert_eq!(store.preview(50).expect("preview").len(), 5);
}

#[test]
fn export_round_trips_through_load() {
    let mut store = store_from(SALES_CSV);
    store
        .apply(&TransformOp::Convert {
            column: "units".into(),
            target: ColumnType::Float,
        })
        .expect("convert");
    let exported = store.export_csv().expect("export");
    let text = String::from_utf8(exported.clone()).expect("utf8");
    assert!(text.starts_with("region,product,units,price,notes\n"));
    assert!(text.contains("north,widget,5.0,2.5,\n"));

    let mut reloaded = TableStore::new();
    reloaded
        .load(&exported, Delimiter::Comma)
        .expect("reload export");
    assert_eq!(reloaded.get().expect("loaded"), store.get().expect("loaded"));
}

fn reload(store: &TableStore) -> TableStore {
    let exported = store.export_csv().expect("export");
    let mut reloaded = TableStore::new();
    reloaded
        .load(&exported, Delimiter::Comma)
        .expect("reload export");
    reloaded
}

#[test]
fn fill_values_that_read_as_missing_are_rejected() {
    let mut store = store_from("code,n\n,1\nx,2\n");
    for fill in ["NA", "", "  ", "null"] {
        let err = store
            .apply(&TransformOp::Impute {
                column: "code".into(),
                method: Imputation::FixedValue(fill.into()),
            })
            .unwrap_err();
        assert_eq!(
            err,
            EditError::Transform(TransformError::MissingFill(fill.into()))
        );
    }
    assert!(store.history().is_empty());
    let code = store.get().expect("loaded").column("code").expect("code");
    assert_eq!(code.missing_count(), 1);
}

#[test]
fn large_integral_floats_reload_as_floats() {
    let mut store = TableStore::new();
    store.replace(
        Table::new(vec![Column::floats("big", &[Some(1e15), Some(-2e20), None])]).expect("table"),
    );
    let reloaded = reload(&store);
    let big = reloaded.get().expect("loaded").column("big").expect("big");
    assert_eq!(big.data_type, ColumnType::Float);
    assert_eq!(big, store.get().expect("loaded").column("big").expect("big"));
}

#[test]
fn export_quotes_only_when_needed() {
    let store = store_from("name,comment\nann,\"hello, world\"\nbob,plain\n");
    let text = String::from_utf8(store.export_csv().expect("export")).expect("utf8");
    assert_eq!(text, "name,comment\nann,\"hello, world\"\nbob,plain\n");
}

fn text_cell() -> impl Strategy<Value = Option<String>> {
    proptest::option::of("[a-z]{1,6}( [a-z]{1,4})?")
}

fn fill_value() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,6}".prop_map(String::from),
        proptest::sample::select(MISSING_PLACEHOLDERS).prop_map(String::from),
        Just(String::new()),
    ]
}

proptest! {
    #[test]
    fn filled_text_columns_survive_export(
        cells in proptest::collection::vec(text_cell(), 1..20),
        fill in fill_value(),
    ) {
        let mut csv = String::from("code,n\n");
        for (row, cell) in cells.iter().enumerate() {
            csv.push_str(&format!("{},{row}\n", cell.as_deref().unwrap_or("")));
        }
        let mut store = store_from(&csv);
        let imputed = store.apply(&TransformOp::Impute {
            column: "code".into(),
            method: Imputation::FixedValue(fill.clone()),
        });
        prop_assert_eq!(imputed.is_err(), is_missing_token(&fill));
        let reloaded = reload(&store);
        prop_assert_eq!(reloaded.get().expect("loaded"), store.get().expect("loaded"));
    }
}
