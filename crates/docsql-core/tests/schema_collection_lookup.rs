use docsql_core::schema::{Field, Schema, Table, Type};
use std_util::prelude::*;

fn schema() -> Schema {
    let mut schema = Schema::new();
    assert_ok!(schema.add_table(assert_ok!(Table::builder("TestCollection")
        .field(Field::new("a", Type::Float))
        .build())));
    assert_ok!(schema.add_table(assert_ok!(Table::builder("TestCollection2")
        .field(Field::new("data", Type::String))
        .build())));
    schema
}

#[test]
fn exact_lookup() {
    let schema = schema();
    assert!(schema.table("TestCollection2").is_some());
    assert!(schema.table("testcollection2").is_none());
}

#[test]
fn collection_lookup_ignores_case() {
    let schema = schema();
    let table = schema.collection("testcollection2").unwrap();
    assert_eq!(table.name(), "TestCollection2");
}

#[test]
fn duplicate_tables_are_rejected() {
    let mut schema = schema();
    let table = assert_ok!(Table::builder("testCollection").build());
    let err = assert_err!(schema.add_table(table));
    assert!(err.is_invalid_schema());
}

#[test]
fn invalid_names_are_rejected() {
    assert!(Table::builder("Bad.Name").build().unwrap_err().is_invalid_schema());
    assert!(Table::builder("Posts")
        .field(Field::new("a'b", Type::String))
        .build()
        .unwrap_err()
        .is_invalid_schema());
}
