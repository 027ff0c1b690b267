//! Object definition -> `SchemaDefinition`.
//!
//! Deterministic: output depends only on the class name, its resolved fields (in declaration
//! order) and its inheritance chain. The storage engine's iteration order never leaks in.

use crate::definition::{FieldDefinition, FieldType, ObjectDefinition, OrderedMap};
use crate::error::ConfigError;
use crate::registry::MetadataRegistry;
use crate::schema::types::*;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

pub const ID_COLUMN: &str = "id";
pub const CREATED_AT_COLUMN: &str = "created_at";
pub const UPDATED_AT_COLUMN: &str = "updated_at";

/// Columns every table carries exactly once.
pub const SYSTEM_COLUMNS: [&str; 3] = [ID_COLUMN, CREATED_AT_COLUMN, UPDATED_AT_COLUMN];

/// Field names that are unique by convention.
const CONVENTIONALLY_UNIQUE: [&str; 2] = ["slug", "email"];

const FK_ACTION: &str = "CASCADE";

/// Generates schemas for registered classes, resolving inheritance through the registry.
pub struct SchemaGenerator<'a> {
    registry: &'a MetadataRegistry,
}

impl<'a> SchemaGenerator<'a> {
    pub fn new(registry: &'a MetadataRegistry) -> Self {
        Self { registry }
    }

    pub fn generate(&self, class_name: &str) -> Result<SchemaDefinition, ConfigError> {
        let def = self.registry.get_definition(class_name).ok_or_else(|| ConfigError::NoFields {
            class_name: class_name.to_string(),
        })?;
        let fields = self.registry.resolved_fields(class_name);
        let chain = self.registry.inheritance_chain(class_name);
        let parent_table = def.parent_class().map(|p| self.registry.table_for_class(p));
        build_schema(def, &fields, &chain[1..], parent_table)
    }

    /// Schemas for every registered class, in registration order.
    pub fn generate_all(&self) -> Result<Vec<SchemaDefinition>, ConfigError> {
        self.registry
            .definitions()
            .map(|d| self.generate(&d.class_name))
            .collect()
    }
}

/// Generate a schema from a standalone definition (own fields only, no registry lookup).
pub fn generate_schema(def: &ObjectDefinition) -> Result<SchemaDefinition, ConfigError> {
    let ancestors: Vec<String> = def.parent_class().map(|p| vec![p.to_string()]).unwrap_or_default();
    let parent_table = def.parent_class().map(|p| crate::case::table_name_for(p, None));
    build_schema(def, &def.fields, &ancestors, parent_table)
}

fn build_schema(
    def: &ObjectDefinition,
    fields: &OrderedMap<FieldDefinition>,
    ancestors: &[String],
    parent_table: Option<String>,
) -> Result<SchemaDefinition, ConfigError> {
    if fields.is_empty() {
        return Err(ConfigError::NoFields {
            class_name: def.class_name.clone(),
        });
    }
    let table = def.table_name();

    let mut columns: IndexMap<String, ColumnDefinition> = IndexMap::new();
    for name in SYSTEM_COLUMNS {
        columns.entry(name.to_string()).or_insert_with(|| system_column(name));
    }

    let mut foreign_keys = Vec::new();
    for (name, field) in fields {
        if SYSTEM_COLUMNS.contains(&name.as_str()) {
            tracing::debug!(class = %def.class_name, column = %name, "system column redeclared; keeping canonical definition");
            continue;
        }
        let column = field_column(def, name, field)?;
        if let Some(fk) = &column.foreign_key {
            foreign_keys.push(fk.clone());
        }
        columns.insert(name.clone(), column);
    }

    let mut indexes = Vec::new();
    for fk in &foreign_keys {
        indexes.push(IndexDefinition {
            name: format!("idx_{}_{}", table, fk.column),
            columns: vec![fk.column.clone()],
            unique: false,
        });
    }
    indexes.push(IndexDefinition {
        name: format!("idx_{}_{}", table, UPDATED_AT_COLUMN),
        columns: vec![UPDATED_AT_COLUMN.to_string()],
        unique: false,
    });
    for col in columns.values().filter(|c| c.unique && !c.primary_key) {
        indexes.push(IndexDefinition {
            name: format!("idx_{}_{}_unique", table, col.name),
            columns: vec![col.name.clone()],
            unique: true,
        });
    }

    let triggers = vec![updated_at_trigger(&table)];

    let mut deps: BTreeSet<String> = foreign_keys
        .iter()
        .map(|fk| fk.table.clone())
        .filter(|t| *t != table)
        .collect();
    if let Some(parent) = parent_table.filter(|p| *p != table) {
        deps.insert(parent);
    }

    Ok(SchemaDefinition {
        table_name: table,
        class_name: def.class_name.clone(),
        columns,
        indexes,
        triggers,
        foreign_keys,
        dependencies: deps.into_iter().collect(),
        version: schema_version(&def.class_name, fields, ancestors)?,
        package_name: def.package_name.clone(),
        base_class: def.extends.clone(),
    })
}

fn system_column(name: &str) -> ColumnDefinition {
    if name == ID_COLUMN {
        ColumnDefinition {
            name: name.to_string(),
            sql_type: SqlType::Text,
            primary_key: true,
            not_null: true,
            default_value: None,
            unique: false,
            foreign_key: None,
        }
    } else {
        ColumnDefinition {
            name: name.to_string(),
            sql_type: SqlType::Datetime,
            primary_key: false,
            not_null: true,
            default_value: Some("CURRENT_TIMESTAMP".into()),
            unique: false,
            foreign_key: None,
        }
    }
}

pub fn sql_type_for(class_name: &str, field: &FieldDefinition) -> SqlType {
    match &field.field_type {
        FieldType::Text | FieldType::ForeignKey => SqlType::Text,
        FieldType::Integer => SqlType::Integer,
        FieldType::Decimal => SqlType::Real,
        FieldType::Boolean => SqlType::Boolean,
        FieldType::Datetime => SqlType::Datetime,
        FieldType::Json => SqlType::Json,
        FieldType::Other(raw) => {
            tracing::warn!(class = %class_name, field = %field.name, field_type = %raw, "unknown field type; using TEXT");
            SqlType::Text
        }
    }
}

fn field_column(def: &ObjectDefinition, name: &str, field: &FieldDefinition) -> Result<ColumnDefinition, ConfigError> {
    let sql_type = sql_type_for(&def.class_name, field);
    let mut not_null = field.required;
    let mut default_value = field.default.as_ref().and_then(|d| render_default(d, sql_type));
    let explicit_null_default = matches!(field.default, Some(Value::Null));

    let unique = field.unique || CONVENTIONALLY_UNIQUE.contains(&name);

    // Plain strings are never NULL: optional text without a default becomes NOT NULL DEFAULT ''.
    if sql_type == SqlType::Text
        && field.field_type != FieldType::ForeignKey
        && !field.required
        && field.default.is_none()
    {
        not_null = true;
        default_value = Some("''".into());
    }
    if explicit_null_default {
        not_null = false;
    }

    let foreign_key = if field.field_type == FieldType::ForeignKey {
        let (table, column) = field.related_target().ok_or_else(|| ConfigError::InvalidRelated {
            class_name: def.class_name.clone(),
            field: name.to_string(),
            related: field.related.clone().unwrap_or_default(),
        })?;
        Some(ForeignKeyDefinition {
            column: name.to_string(),
            table,
            references: column,
            on_delete: FK_ACTION.into(),
            on_update: FK_ACTION.into(),
        })
    } else {
        None
    };

    Ok(ColumnDefinition {
        name: name.to_string(),
        sql_type,
        primary_key: false,
        not_null,
        default_value,
        unique,
        foreign_key,
    })
}

/// Render a JSON default as a SQL literal. `None` for an explicit null default.
fn render_default(value: &Value, sql_type: SqlType) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(if *b { "1".into() } else { "0".into() }),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => {
            if sql_type == SqlType::Datetime
                && (s.eq_ignore_ascii_case("now") || s.eq_ignore_ascii_case("current_timestamp"))
            {
                Some("CURRENT_TIMESTAMP".into())
            } else {
                Some(sql_string_literal(s))
            }
        }
        Value::Array(_) | Value::Object(_) => Some(sql_string_literal(&value.to_string())),
    }
}

fn sql_string_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// AFTER UPDATE: SQLite cannot assign NEW columns in a BEFORE trigger, so the trigger
/// issues its own UPDATE (recursive_triggers is off). RETURNING does not see its write.
fn updated_at_trigger(table: &str) -> TriggerDefinition {
    TriggerDefinition {
        name: format!("trg_{}_updated_at", table),
        when: TriggerTiming::After,
        event: "UPDATE".into(),
        body: format!(
            "UPDATE \"{t}\" SET \"{u}\" = CURRENT_TIMESTAMP WHERE \"{id}\" = NEW.\"{id}\";",
            t = table,
            u = UPDATED_AT_COLUMN,
            id = ID_COLUMN
        ),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VersionInput<'a> {
    class_name: &'a str,
    fields: &'a OrderedMap<FieldDefinition>,
    extends: &'a [String],
}

/// SHA-256 over the canonical JSON of (class name, fields, inheritance chain).
pub fn schema_version(
    class_name: &str,
    fields: &OrderedMap<FieldDefinition>,
    ancestors: &[String],
) -> Result<String, ConfigError> {
    let input = VersionInput {
        class_name,
        fields,
        extends: ancestors,
    };
    let bytes = serde_json::to_vec(&input).map_err(|e| ConfigError::Validation(e.to_string()))?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn article() -> ObjectDefinition {
        ObjectDefinition::new("Article")
            .with_field(FieldDefinition::text("title").required())
            .with_field(FieldDefinition::text("body"))
    }

    #[test]
    fn system_columns_seeded_first() {
        let schema = generate_schema(&article()).unwrap();
        let names: Vec<&str> = schema.column_names().collect();
        assert_eq!(names, vec!["id", "created_at", "updated_at", "title", "body"]);
        assert!(schema.columns["id"].primary_key);
        assert_eq!(schema.columns["updated_at"].default_value.as_deref(), Some("CURRENT_TIMESTAMP"));
    }

    #[test]
    fn redeclared_system_columns_appear_once() {
        let def = article()
            .with_field(FieldDefinition::new("created_at", FieldType::Datetime))
            .with_field(FieldDefinition::new("updated_at", FieldType::Datetime).required())
            .with_field(FieldDefinition::new("id", FieldType::Integer));
        let schema = generate_schema(&def).unwrap();
        assert_eq!(schema.columns.len(), 5);
        assert_eq!(schema.columns["id"].sql_type, SqlType::Text);
        assert!(schema.columns["id"].primary_key);
    }

    #[test]
    fn optional_text_is_not_null_with_empty_default() {
        let schema = generate_schema(&article()).unwrap();
        let body = &schema.columns["body"];
        assert!(body.not_null);
        assert_eq!(body.default_value.as_deref(), Some("''"));

        let title = &schema.columns["title"];
        assert!(title.not_null);
        assert_eq!(title.default_value, None);
    }

    #[test]
    fn type_mapping_and_unknown_fallback() {
        let def = ObjectDefinition::new("Product")
            .with_field(FieldDefinition::new("qty", FieldType::Integer))
            .with_field(FieldDefinition::new("price", FieldType::Decimal))
            .with_field(FieldDefinition::new("active", FieldType::Boolean).with_default(json!(true)))
            .with_field(FieldDefinition::new("meta", FieldType::Json))
            .with_field(FieldDefinition::new("released", FieldType::Datetime).with_default(json!("now")))
            .with_field(FieldDefinition::new("location", FieldType::Other("geopoint".into())));
        let schema = generate_schema(&def).unwrap();
        assert_eq!(schema.columns["qty"].sql_type, SqlType::Integer);
        assert!(!schema.columns["qty"].not_null);
        assert_eq!(schema.columns["price"].sql_type, SqlType::Real);
        assert_eq!(schema.columns["active"].default_value.as_deref(), Some("1"));
        assert_eq!(schema.columns["meta"].sql_type, SqlType::Json);
        assert_eq!(schema.columns["released"].default_value.as_deref(), Some("CURRENT_TIMESTAMP"));
        assert_eq!(schema.columns["location"].sql_type, SqlType::Text);
    }

    #[test]
    fn slug_and_email_are_unique_with_indexes() {
        let def = ObjectDefinition::new("User")
            .with_field(FieldDefinition::text("email").required())
            .with_field(FieldDefinition::text("slug"))
            .with_field(FieldDefinition::text("handle").unique())
            .with_field(FieldDefinition::text("bio"));
        let schema = generate_schema(&def).unwrap();
        let unique: Vec<&str> = schema.unique_columns().map(|c| c.name.as_str()).collect();
        assert_eq!(unique, vec!["email", "slug", "handle"]);
        assert_eq!(schema.columns["slug"].default_value.as_deref(), Some("''"));
        let index_names: Vec<&str> = schema.indexes.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(
            index_names,
            vec![
                "idx_users_updated_at",
                "idx_users_email_unique",
                "idx_users_slug_unique",
                "idx_users_handle_unique"
            ]
        );
    }

    #[test]
    fn foreign_keys_produce_cascade_index_and_dependency() {
        let def = ObjectDefinition::new("Comment")
            .with_field(FieldDefinition::text("body").required())
            .with_field(FieldDefinition::foreign_key("post_id", "posts.id"))
            .with_field(FieldDefinition::foreign_key("author_id", "users"))
            .with_field(FieldDefinition::foreign_key("parent_id", "comments.id"));
        let schema = generate_schema(&def).unwrap();

        let fk = schema.columns["post_id"].foreign_key.as_ref().unwrap();
        assert_eq!((fk.table.as_str(), fk.references.as_str()), ("posts", "id"));
        assert_eq!(fk.on_delete, "CASCADE");
        assert_eq!(fk.on_update, "CASCADE");
        assert!(!schema.columns["post_id"].not_null);
        assert_eq!(schema.columns["post_id"].default_value, None);

        assert_eq!(schema.foreign_keys.len(), 3);
        assert!(schema.indexes.iter().any(|i| i.name == "idx_comments_post_id"));
        assert_eq!(schema.dependencies, vec!["posts", "users"]);
    }

    #[test]
    fn malformed_related_fails() {
        let def = ObjectDefinition::new("Comment").with_field(FieldDefinition::foreign_key("post_id", "posts.id.x"));
        assert!(matches!(generate_schema(&def), Err(ConfigError::InvalidRelated { .. })));
    }

    #[test]
    fn zero_fields_fail_loudly() {
        let err = generate_schema(&ObjectDefinition::new("Ghost")).unwrap_err();
        match err {
            ConfigError::NoFields { class_name } => assert_eq!(class_name, "Ghost"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unregistered_class_fails_through_generator() {
        let registry = MetadataRegistry::new();
        let err = SchemaGenerator::new(&registry).generate("Ghost").unwrap_err();
        assert!(matches!(err, ConfigError::NoFields { .. }));
    }

    #[test]
    fn version_tracks_inputs() {
        let base = generate_schema(&article()).unwrap();
        let again = generate_schema(&article()).unwrap();
        assert_eq!(base.version, again.version);
        assert_eq!(base.version.len(), 64);

        let renamed = generate_schema(&ObjectDefinition {
            class_name: "Story".into(),
            ..article()
        })
        .unwrap();
        assert_ne!(base.version, renamed.version);

        let changed_field = generate_schema(&article().with_field(FieldDefinition::text("body").required())).unwrap();
        assert_ne!(base.version, changed_field.version);

        let inherited = generate_schema(&article().extending("Content")).unwrap();
        assert_ne!(base.version, inherited.version);
        assert_eq!(inherited.dependencies, vec!["contents"]);

        let base_parent = generate_schema(&article().extending("BaseObject")).unwrap();
        assert!(base_parent.dependencies.is_empty());
    }

    #[test]
    fn generator_resolves_parent_fields_and_table() {
        let mut registry = MetadataRegistry::new();
        registry.register(
            ObjectDefinition::new("Content")
                .with_table_name("content_items")
                .with_field(FieldDefinition::text("slug")),
        );
        registry.register(article().extending("Content"));
        let schema = SchemaGenerator::new(&registry).generate("Article").unwrap();
        assert!(schema.has_column("slug"));
        assert_eq!(schema.dependencies, vec!["content_items"]);
        assert_eq!(schema.base_class.as_deref(), Some("Content"));
        assert_eq!(SchemaGenerator::new(&registry).generate_all().unwrap().len(), 2);
    }
}
