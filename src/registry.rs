//! Metadata registry: class name -> field definitions and method signatures.
//!
//! Populated once during warm-up (from the scanned manifest, or `register` for ad hoc classes),
//! then shared read-only behind an `Arc`. Mutation needs `&mut self`, so a registry that has been
//! handed out is immutable by construction.

use crate::case::table_name_for;
use crate::definition::{FieldDefinition, FieldType, Manifest, MethodDefinition, ObjectDefinition, OrderedMap};
use crate::error::ConfigError;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Clone, Debug, Default)]
pub struct MetadataRegistry {
    by_class: OrderedMap<Arc<ObjectDefinition>>,
    class_by_table: HashMap<String, String>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_manifest(manifest: Manifest) -> Self {
        let mut registry = Self::new();
        for def in manifest.objects {
            registry.register(def);
        }
        registry
    }

    /// Register a definition. Re-registering a class replaces the previous entry in place,
    /// so repeated warm-ups never grow duplicate field lists.
    pub fn register(&mut self, mut def: ObjectDefinition) -> Option<Arc<ObjectDefinition>> {
        def.normalize();
        let class_name = def.class_name.clone();
        let table = def.table_name();
        let previous = self.by_class.insert(class_name.clone(), Arc::new(def));
        if let Some(prev) = &previous {
            tracing::warn!(class = %class_name, "replacing registered definition");
            let prev_table = prev.table_name();
            if prev_table != table {
                self.class_by_table.remove(&prev_table);
            }
        }
        self.class_by_table.insert(table, class_name);
        previous
    }

    /// Field definitions declared on the class. Empty (not an error) for unknown classes.
    pub fn get_fields(&self, class_name: &str) -> OrderedMap<FieldDefinition> {
        self.by_class
            .get(class_name)
            .map(|d| d.fields.clone())
            .unwrap_or_default()
    }

    pub fn get_methods(&self, class_name: &str) -> &[MethodDefinition] {
        self.by_class
            .get(class_name)
            .map(|d| d.methods.as_slice())
            .unwrap_or(&[])
    }

    pub fn get_definition(&self, class_name: &str) -> Option<&Arc<ObjectDefinition>> {
        self.by_class.get(class_name)
    }

    pub fn definition_by_table(&self, table: &str) -> Option<&Arc<ObjectDefinition>> {
        self.class_by_table.get(table).and_then(|c| self.by_class.get(c))
    }

    /// Definitions in registration order.
    pub fn definitions(&self) -> impl Iterator<Item = &Arc<ObjectDefinition>> {
        self.by_class.values()
    }

    pub fn len(&self) -> usize {
        self.by_class.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_class.is_empty()
    }

    /// Table name for a class; falls back to the naming rule for unregistered classes.
    pub fn table_for_class(&self, class_name: &str) -> String {
        self.by_class
            .get(class_name)
            .map(|d| d.table_name())
            .unwrap_or_else(|| table_name_for(class_name, None))
    }

    /// The class followed by its registered ancestors, nearest first. Stops at the base class,
    /// at an unregistered parent, or on a cycle.
    pub fn inheritance_chain(&self, class_name: &str) -> Vec<String> {
        let mut chain = vec![class_name.to_string()];
        let mut seen: HashSet<String> = chain.iter().cloned().collect();
        let mut current = self.by_class.get(class_name).and_then(|d| d.parent_class().map(str::to_string));
        while let Some(parent) = current {
            if !seen.insert(parent.clone()) {
                tracing::warn!(class = %class_name, parent = %parent, "inheritance cycle; stopping");
                break;
            }
            chain.push(parent.clone());
            current = match self.by_class.get(&parent) {
                Some(def) => def.parent_class().map(str::to_string),
                None => {
                    tracing::debug!(class = %class_name, parent = %parent, "parent class not registered");
                    None
                }
            };
        }
        chain
    }

    /// Fields including inherited ones: ancestors first, child declarations override by name.
    pub fn resolved_fields(&self, class_name: &str) -> OrderedMap<FieldDefinition> {
        let mut fields = OrderedMap::new();
        for class in self.inheritance_chain(class_name).iter().rev() {
            if let Some(def) = self.by_class.get(class) {
                for (name, field) in &def.fields {
                    fields.insert(name.clone(), field.clone());
                }
            }
        }
        fields
    }
}

/// Infer field definitions from a sample value, for ad hoc classes that never went through the
/// manifest. Field order follows serialisation order.
pub fn extract_fields<T: Serialize>(sample: &T) -> Result<OrderedMap<FieldDefinition>, ConfigError> {
    let value = serde_json::to_value(sample).map_err(|e| ConfigError::Validation(e.to_string()))?;
    let Value::Object(map) = value else {
        return Err(ConfigError::Validation("sample must serialize to an object".into()));
    };
    let mut fields = OrderedMap::new();
    for (name, v) in map {
        let (field_type, required) = match &v {
            Value::Null => (FieldType::Text, false),
            Value::Bool(_) => (FieldType::Boolean, true),
            Value::Number(n) if n.is_i64() || n.is_u64() => (FieldType::Integer, true),
            Value::Number(_) => (FieldType::Decimal, true),
            Value::String(_) => (FieldType::Text, true),
            Value::Array(_) | Value::Object(_) => (FieldType::Json, true),
        };
        let mut field = FieldDefinition::new(name.clone(), field_type);
        field.required = required;
        fields.insert(name, field);
    }
    Ok(fields)
}

/// Convenience for tests and scripts: register a class whose fields come from a sample value.
pub fn register_from_sample<T: Serialize>(
    registry: &mut MetadataRegistry,
    class_name: &str,
    sample: &T,
) -> Result<(), ConfigError> {
    let mut def = ObjectDefinition::new(class_name);
    def.fields = extract_fields(sample)?;
    registry.register(def);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    fn article() -> ObjectDefinition {
        ObjectDefinition::new("Article")
            .with_field(FieldDefinition::text("title").required())
            .with_field(FieldDefinition::text("body"))
    }

    #[test]
    fn unknown_class_has_no_fields() {
        let registry = MetadataRegistry::new();
        assert!(registry.get_fields("Nope").is_empty());
        assert!(registry.get_methods("Nope").is_empty());
    }

    #[test]
    fn repeated_registration_replaces() {
        let mut registry = MetadataRegistry::new();
        registry.register(article());
        registry.register(article());
        registry.register(article().with_field(FieldDefinition::text("summary")));

        assert_eq!(registry.len(), 1);
        let fields = registry.get_fields("Article");
        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["title", "body", "summary"]);
    }

    #[test]
    fn replacing_with_new_table_name_drops_old_mapping() {
        let mut registry = MetadataRegistry::new();
        registry.register(article());
        registry.register(article().with_table_name("posts"));
        assert!(registry.definition_by_table("articles").is_none());
        assert_eq!(registry.definition_by_table("posts").unwrap().class_name, "Article");
    }

    #[test]
    fn resolved_fields_merge_parent_chain() {
        let mut registry = MetadataRegistry::new();
        registry.register(
            ObjectDefinition::new("Content")
                .with_field(FieldDefinition::text("slug"))
                .with_field(FieldDefinition::text("title")),
        );
        registry.register(
            ObjectDefinition::new("Article")
                .extending("Content")
                .with_field(FieldDefinition::text("title").required())
                .with_field(FieldDefinition::text("body")),
        );

        let fields = registry.resolved_fields("Article");
        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["slug", "title", "body"]);
        assert!(fields["title"].required);
        assert_eq!(registry.inheritance_chain("Article"), vec!["Article", "Content"]);
    }

    #[test]
    fn inheritance_cycles_terminate() {
        let mut registry = MetadataRegistry::new();
        registry.register(ObjectDefinition::new("A").extending("B").with_field(FieldDefinition::text("a")));
        registry.register(ObjectDefinition::new("B").extending("A").with_field(FieldDefinition::text("b")));
        assert_eq!(registry.inheritance_chain("A"), vec!["A", "B"]);
        assert_eq!(registry.resolved_fields("A").len(), 2);
    }

    #[derive(Serialize)]
    struct Probe {
        name: String,
        count: i64,
        ratio: f64,
        active: bool,
        tags: Vec<String>,
        note: Option<String>,
    }

    #[test]
    fn extract_fields_from_sample() {
        let probe = Probe {
            name: "x".into(),
            count: 1,
            ratio: 0.5,
            active: true,
            tags: vec![],
            note: None,
        };
        let fields = extract_fields(&probe).unwrap();
        assert_eq!(
            fields.keys().collect::<Vec<_>>(),
            vec!["name", "count", "ratio", "active", "tags", "note"]
        );
        assert_eq!(fields["count"].field_type, FieldType::Integer);
        assert_eq!(fields["ratio"].field_type, FieldType::Decimal);
        assert_eq!(fields["active"].field_type, FieldType::Boolean);
        assert_eq!(fields["tags"].field_type, FieldType::Json);
        assert!(!fields["note"].required);

        let mut registry = MetadataRegistry::new();
        register_from_sample(&mut registry, "Probe", &probe).unwrap();
        assert_eq!(registry.get_fields("Probe").len(), 6);
    }

    #[test]
    fn extract_fields_rejects_scalars() {
        assert!(extract_fields(&42).is_err());
    }
}
