mod common;

use common::{shop_definitions, shop_registry};
use object_sdk::definition::{FieldDefinition, FieldType, ObjectDefinition};
use object_sdk::schema::{generate_schema, order_by_dependencies, render_ddl, render_statements, SchemaGenerator};
use serde_json::json;

fn article() -> ObjectDefinition {
    ObjectDefinition::new("Article")
        .with_field(FieldDefinition::text("title").required())
        .with_field(FieldDefinition::text("body"))
}

#[test]
fn article_ddl_end_to_end() {
    let ddl = render_ddl(&generate_schema(&article()).unwrap());

    assert!(ddl.contains(r#"CREATE TABLE IF NOT EXISTS "articles""#));
    assert!(ddl.contains(r#""id" TEXT PRIMARY KEY"#));
    assert!(ddl.contains(r#""title" TEXT NOT NULL"#));
    assert!(ddl.contains(r#""body" TEXT"#));
    assert_eq!(ddl.matches(r#""created_at" DATETIME"#).count(), 1);
    assert_eq!(ddl.matches(r#""updated_at" DATETIME"#).count(), 1);
    assert!(ddl.contains(r#"CREATE TRIGGER IF NOT EXISTS "trg_articles_updated_at""#));
    assert!(ddl.contains(r#"CREATE INDEX IF NOT EXISTS "idx_articles_updated_at""#));
}

#[test]
fn redeclared_system_columns_appear_once() {
    let def = article()
        .with_field(FieldDefinition::new("created_at", FieldType::Datetime))
        .with_field(FieldDefinition::new("updated_at", FieldType::Text).required())
        .with_field(FieldDefinition::new("id", FieldType::Integer));
    let schema = generate_schema(&def).unwrap();
    let names: Vec<&str> = schema.column_names().collect();
    assert_eq!(names, vec!["id", "created_at", "updated_at", "title", "body"]);

    let ddl = render_ddl(&schema);
    assert_eq!(ddl.matches(r#""created_at""#).count(), 1);
    assert!(ddl.contains(r#""id" TEXT PRIMARY KEY"#));
}

#[test]
fn generation_is_deterministic() {
    let registry = shop_registry();
    let first: Vec<String> = SchemaGenerator::new(&registry)
        .generate_all()
        .unwrap()
        .iter()
        .map(render_ddl)
        .collect();
    let second: Vec<String> = SchemaGenerator::new(&shop_registry())
        .generate_all()
        .unwrap()
        .iter()
        .map(render_ddl)
        .collect();
    assert_eq!(first, second);
}

#[test]
fn every_statement_is_idempotent() {
    let registry = shop_registry();
    let product = SchemaGenerator::new(&registry).generate("Product").unwrap();
    let statements = render_statements(&product);
    assert!(statements.len() >= 4);
    assert!(statements.iter().all(|s| s.contains("IF NOT EXISTS")));
    assert!(statements[0].contains(
        r#"FOREIGN KEY ("category_id") REFERENCES "categories" ("id") ON DELETE CASCADE ON UPDATE CASCADE"#
    ));
    assert!(statements.iter().any(|s| s.contains(r#""idx_products_category_id""#)));
    assert!(statements.iter().any(|s| s.contains(r#"CREATE UNIQUE INDEX IF NOT EXISTS "idx_products_sku_unique""#)));
}

#[test]
fn column_types_and_defaults() {
    let registry = shop_registry();
    let ddl = render_ddl(&SchemaGenerator::new(&registry).generate("Product").unwrap());
    assert!(ddl.contains(r#""price" REAL"#));
    assert!(ddl.contains(r#""stock" INTEGER DEFAULT 0"#));
    assert!(ddl.contains(r#""active" BOOLEAN"#));
    assert!(ddl.contains(r#""attributes" JSON"#));
    assert!(ddl.contains(r#""category_id" TEXT,"#));
    assert!(ddl.contains(r#""sku" TEXT NOT NULL DEFAULT ''"#));
}

#[test]
fn referenced_tables_are_created_first() {
    let registry = shop_registry();
    let schemas = SchemaGenerator::new(&registry).generate_all().unwrap();
    let order: Vec<&str> = order_by_dependencies(&schemas)
        .iter()
        .map(|s| s.table_name.as_str())
        .collect();
    let pos = |t: &str| order.iter().position(|x| *x == t).unwrap();
    assert!(pos("categories") < pos("products"));
    assert_eq!(order.len(), shop_definitions().len());
}

#[test]
fn explicit_null_default_keeps_text_nullable() {
    let def = ObjectDefinition::new("Note").with_field(FieldDefinition::text("summary").with_default(json!(null)));
    let schema = generate_schema(&def).unwrap();
    let summary = &schema.columns["summary"];
    assert!(!summary.not_null);
    assert_eq!(summary.default_value, None);
}
