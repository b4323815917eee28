use std::sync::Arc;

use serde_json::json;

use tabflow::testing::{customers_schema, orders_schema};
use tabflow::{
    Catalog, Column, ColumnType, FillOptions, FillPlanner, GeneratorResource, MemoryTable,
    ProcessingType, Schema, TabflowError, TabularResource,
};

fn planner(catalog: &Catalog, options: FillOptions) -> FillPlanner {
    FillPlanner::new(catalog.clone(), options)
}

fn simple_schema() -> Schema {
    Schema::new(vec![
        Column::new("id", ColumnType::Integer).primary_key(),
        Column::new("label", ColumnType::Text),
    ])
}

#[test]
fn test_generator_pairs_with_target_by_logical_name() {
    let catalog = Catalog::new();
    let target = MemoryTable::new("a", simple_schema()).into_handle();
    let generator = GeneratorResource::from_schema("a", simple_schema(), Some(5)).into_handle();

    let plan = planner(&catalog, FillOptions::default())
        .pair(vec![target], vec![generator])
        .unwrap();
    assert_eq!(plan.pairs.len(), 1);
    assert_eq!(plan.pairs[0].generator.logical_name(), "a");
    assert_eq!(plan.pairs[0].target.logical_name(), "a");
}

#[test]
fn test_unresolved_generator_lists_alternatives() {
    let catalog = Catalog::new();
    let a = MemoryTable::new("a", simple_schema()).into_handle();
    // b has no columns at all, so no dummy generator can be synthesized.
    let b = MemoryTable::new("b", Schema::empty()).into_handle();
    let gen_a = GeneratorResource::from_schema("a", simple_schema(), Some(5)).into_handle();

    let err = planner(&catalog, FillOptions::default())
        .pair(vec![a, b], vec![gen_a])
        .unwrap_err();
    match err {
        TabflowError::UnresolvedGenerator { target, known } => {
            assert_eq!(target, "b");
            assert_eq!(known, vec!["a".to_string()], "the resolved generators are listed");
        }
        other => panic!("expected UnresolvedGenerator, got {other}"),
    }
}

#[test]
fn test_unresolved_generator_without_any_generators_mentions_selectors() {
    let catalog = Catalog::new();
    let b = MemoryTable::new("b", Schema::empty()).into_handle();
    let err = planner(&catalog, FillOptions::default())
        .pair(vec![b], vec![])
        .unwrap_err();
    assert!(
        err.to_string().contains("generator selectors"),
        "with nothing resolved, the error instructs the caller: {err}"
    );
}

#[test]
fn test_target_with_columns_gets_a_synthesized_generator() {
    let catalog = Catalog::new();
    let target = Arc::new(MemoryTable::new("c", simple_schema()));
    let options = FillOptions {
        max_record_count: Some(4),
        ..FillOptions::default()
    };
    let plan = planner(&catalog, options)
        .pair(vec![target.clone()], vec![])
        .unwrap();
    assert_eq!(plan.pairs.len(), 1);
    assert_eq!(
        plan.pairs[0].generator.logical_name(),
        "c",
        "the dummy generator is bound to the target's name and schema"
    );

    let reports = plan.execute().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].rows, 4, "the dummy generator uses the default cap");
    assert_eq!(target.rows().len(), 4);
    // Values are shaped by the target's own schema.
    assert_eq!(target.rows()[0], vec![json!(1), json!("label-1")]);
}

#[test]
fn test_mono_fill_shortcut_ignores_name_mismatch() {
    let catalog = Catalog::new();
    let target = MemoryTable::new("completely-different", simple_schema()).into_handle();
    let generator = GeneratorResource::from_schema("gen", simple_schema(), Some(3)).into_handle();

    let plan = planner(&catalog, FillOptions::default())
        .pair(vec![target], vec![generator])
        .unwrap();
    assert_eq!(plan.pairs.len(), 1);
    assert_eq!(plan.pairs[0].generator.logical_name(), "gen");
    assert_eq!(plan.pairs[0].target.logical_name(), "completely-different");
}

#[test]
fn test_mono_fill_assigns_default_cap_to_uncapped_generator() {
    let catalog = Catalog::new();
    let target = Arc::new(MemoryTable::new("t", simple_schema()));
    let generator = GeneratorResource::from_schema("gen", simple_schema(), None).into_handle();
    let options = FillOptions {
        max_record_count: Some(7),
        ..FillOptions::default()
    };
    let plan = planner(&catalog, options)
        .pair(vec![target.clone()], vec![generator])
        .unwrap();
    plan.execute().unwrap();
    assert_eq!(
        target.rows().len(),
        7,
        "an uncapped generator receives the scheduler default"
    );
}

#[test]
fn test_explicit_generator_cap_wins_over_default() {
    let catalog = Catalog::new();
    let target = Arc::new(MemoryTable::new("t", simple_schema()));
    let generator = GeneratorResource::from_schema("gen", simple_schema(), Some(2)).into_handle();
    let options = FillOptions {
        max_record_count: Some(50),
        ..FillOptions::default()
    };
    let plan = planner(&catalog, options)
        .pair(vec![target.clone()], vec![generator])
        .unwrap();
    plan.execute().unwrap();
    assert_eq!(target.rows().len(), 2);
}

#[test]
fn test_multi_connection_fill_is_rejected() {
    let catalog = Catalog::new();
    let here = MemoryTable::new("here", simple_schema())
        .with_connection("memory")
        .into_handle();
    let there = MemoryTable::new("there", simple_schema())
        .with_connection("warehouse")
        .into_handle();
    let err = planner(&catalog, FillOptions::default())
        .pair(vec![here, there], vec![])
        .unwrap_err();
    match err {
        TabflowError::MultiConnectionFill { connections } => {
            assert_eq!(connections, vec!["memory".to_string(), "warehouse".to_string()]);
        }
        other => panic!("expected MultiConnectionFill, got {other}"),
    }
}

#[test]
fn test_fill_executes_parents_before_children() {
    let catalog = Catalog::new();
    let customers = Arc::new(MemoryTable::new("customers", customers_schema()));
    let orders = Arc::new(MemoryTable::new("orders", orders_schema()));

    let options = FillOptions {
        max_record_count: Some(5),
        ..FillOptions::default()
    };
    // Children first in input order; the plan must still fill customers
    // first.
    let plan = planner(&catalog, options)
        .pair(vec![orders.clone(), customers.clone()], vec![])
        .unwrap();
    let reports = plan.execute().unwrap();
    let executed: Vec<&str> = reports.iter().map(|r| r.target.as_str()).collect();
    assert_eq!(executed, vec!["customers", "orders"]);
    assert_eq!(customers.rows().len(), 5);
    assert_eq!(orders.rows().len(), 5);
}

#[test]
fn test_fill_resolves_selectors_through_the_catalog() {
    let catalog = Catalog::new();
    catalog.register(MemoryTable::new("sales_2024", simple_schema()).into_handle());
    catalog.register(MemoryTable::new("sales_2025", simple_schema()).into_handle());
    // Generators live in their own namespace, so a generator can carry the
    // same logical name as the table it fills.
    let generators = Catalog::new();
    generators
        .register(GeneratorResource::from_schema("sales_2024", simple_schema(), Some(3)).into_handle());

    let options = FillOptions {
        data_selectors: vec!["sales_2024".to_string()],
        generator_selectors: vec!["sales_*".to_string()],
        ..FillOptions::default()
    };
    let plan = planner(&catalog, options)
        .with_generator_catalog(generators)
        .resolve()
        .unwrap();
    assert_eq!(plan.pairs.len(), 1);
    assert_eq!(plan.pairs[0].target.logical_name(), "sales_2024");
    assert_eq!(plan.pairs[0].generator.logical_name(), "sales_2024");
}

#[test]
fn test_strict_selection_fails_on_empty_match() {
    let catalog = Catalog::new();
    let options = FillOptions {
        data_selectors: vec!["nothing-*".to_string()],
        ..FillOptions::default()
    };
    let err = planner(&catalog, options).resolve().unwrap_err();
    assert!(matches!(err, TabflowError::EmptySelection { .. }), "got {err}");
}

#[test]
fn test_stream_processing_fills_through_the_queue() {
    let catalog = Catalog::new();
    let target = Arc::new(MemoryTable::new("t", simple_schema()));
    let generator = GeneratorResource::from_schema("t", simple_schema(), Some(20)).into_handle();
    let options = FillOptions {
        processing_type: ProcessingType::Stream,
        ..FillOptions::default()
    };
    let plan = planner(&catalog, options)
        .pair(vec![target.clone()], vec![generator])
        .unwrap();
    plan.execute().unwrap();
    assert_eq!(target.rows().len(), 20);
    assert_eq!(target.rows()[19][0], json!(20), "order survives the queue");
}
