use std::sync::Arc;

use serde_json::json;

use tabflow::testing::{customers_schema, orders_schema};
use tabflow::{
    Catalog, Column, ColumnGenerator, ColumnType, ForeignKey, MemoryTable, Schema, TableLoader,
    TableOverride, TabflowError,
};

fn register(catalog: &Catalog, name: &str, schema: Schema) -> Arc<MemoryTable> {
    let table = Arc::new(MemoryTable::new(name, schema));
    catalog.register(table.clone());
    table
}

#[test]
fn test_empty_parent_with_loading_disabled_fails() {
    let catalog = Catalog::new();
    register(&catalog, "customers", customers_schema());
    register(&catalog, "orders", orders_schema());

    let err = TableLoader::new(catalog).populate(&["orders"]).unwrap_err();
    match err {
        TabflowError::UnloadableParent { child, parent } => {
            assert_eq!(child, "orders");
            assert_eq!(parent, "customers");
        }
        other => panic!("expected UnloadableParent, got {other}"),
    }
}

#[test]
fn test_parent_loading_populates_parent_first() {
    let catalog = Catalog::new();
    let customers = register(&catalog, "customers", customers_schema());
    let orders = register(&catalog, "orders", orders_schema());

    let report = TableLoader::new(catalog)
        .load_parents(true)
        .default_row_count(4)
        .populate(&["orders"])
        .unwrap();

    let loaded: Vec<&str> = report.loaded.iter().map(|t| t.table.as_str()).collect();
    assert_eq!(loaded, vec!["customers", "orders"]);
    assert_eq!(customers.rows().len(), 4);
    assert_eq!(orders.rows().len(), 4);
}

#[test]
fn test_foreign_key_values_stay_in_the_parent_domain() {
    let catalog = Catalog::new();
    let customers = register(&catalog, "customers", customers_schema());
    let orders = register(&catalog, "orders", orders_schema());

    TableLoader::new(catalog)
        .load_parents(true)
        .default_row_count(6)
        .populate(&["orders"])
        .unwrap();

    let customer_count = customers.rows().len() as i64;
    let fk_position = orders_schema().position_of("customer_id").unwrap();
    for row in orders.rows() {
        let fk = row[fk_position].as_i64().expect("an integer key");
        assert!(
            (1..=customer_count).contains(&fk),
            "customer_id {fk} must reference an existing customer"
        );
    }
}

#[test]
fn test_parent_with_existing_rows_is_not_repopulated() {
    let catalog = Catalog::new();
    let customers = Arc::new(
        MemoryTable::new("customers", customers_schema())
            .with_rows(vec![vec![json!(1), json!("acme")]])
            .unwrap(),
    );
    catalog.register(customers.clone());
    register(&catalog, "orders", orders_schema());

    let report = TableLoader::new(catalog)
        .default_row_count(3)
        .populate(&["orders"])
        .unwrap();

    let loaded: Vec<&str> = report.loaded.iter().map(|t| t.table.as_str()).collect();
    assert_eq!(loaded, vec!["orders"], "a non-empty parent needs no loading");
    assert_eq!(customers.rows().len(), 1, "the existing parent rows are untouched");
}

#[test]
fn test_diamond_dependency_populates_the_shared_parent_once() {
    // invoices -> customers, shipments -> customers
    let catalog = Catalog::new();
    let customers = register(&catalog, "customers", customers_schema());
    let child_schema = || {
        Schema::new(vec![
            Column::new("id", ColumnType::Integer).primary_key(),
            Column::new("customer_id", ColumnType::Integer),
        ])
        .with_foreign_key(ForeignKey::new("customer_id", "customers", "id"))
    };
    register(&catalog, "invoices", child_schema());
    register(&catalog, "shipments", child_schema());

    let report = TableLoader::new(catalog)
        .load_parents(true)
        .default_row_count(2)
        .populate(&["invoices", "shipments"])
        .unwrap();

    let loaded: Vec<&str> = report.loaded.iter().map(|t| t.table.as_str()).collect();
    assert_eq!(
        loaded,
        vec!["customers", "invoices", "shipments"],
        "the shared parent is populated exactly once"
    );
    assert_eq!(customers.rows().len(), 2);
}

#[test]
fn test_cyclic_foreign_keys_error_instead_of_recursing() {
    let catalog = Catalog::new();
    let a = Schema::new(vec![
        Column::new("id", ColumnType::Integer).primary_key(),
        Column::new("b_id", ColumnType::Integer),
    ])
    .with_foreign_key(ForeignKey::new("b_id", "b", "id"));
    let b = Schema::new(vec![
        Column::new("id", ColumnType::Integer).primary_key(),
        Column::new("a_id", ColumnType::Integer),
    ])
    .with_foreign_key(ForeignKey::new("a_id", "a", "id"));
    register(&catalog, "a", a);
    register(&catalog, "b", b);

    let err = TableLoader::new(catalog)
        .load_parents(true)
        .populate(&["a"])
        .unwrap_err();
    assert!(matches!(err, TabflowError::CycleDetected { .. }), "got {err}");
}

#[test]
fn test_row_count_and_column_overrides() {
    let catalog = Catalog::new();
    let customers = register(&catalog, "customers", customers_schema());

    TableLoader::new(catalog)
        .default_row_count(10)
        .override_table(
            "customers",
            TableOverride::default()
                .rows(3)
                .column("name", ColumnGenerator::Constant(json!("fixed"))),
        )
        .populate(&["customers"])
        .unwrap();

    let rows = customers.rows();
    assert_eq!(rows.len(), 3, "the per-table row count wins over the default");
    for row in &rows {
        assert_eq!(row[1], json!("fixed"), "the column override applies");
    }
}

#[test]
fn test_unknown_table_is_a_typed_error() {
    let catalog = Catalog::new();
    let err = TableLoader::new(catalog).populate(&["ghost"]).unwrap_err();
    assert!(
        err.to_string().contains("ghost"),
        "the error names the table: {err}"
    );
}
