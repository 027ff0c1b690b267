//! Manifest validation: identifiers, foreign-key targets, relation references.

use crate::case::is_identifier;
use crate::definition::types::{FieldType, Manifest, RelationKind};
use crate::error::ConfigError;
use std::collections::HashSet;

pub const SUPPORTED_MANIFEST_VERSION: u32 = 1;

pub fn validate_manifest(manifest: &Manifest) -> Result<(), ConfigError> {
    if manifest.version != SUPPORTED_MANIFEST_VERSION {
        return Err(ConfigError::UnsupportedVersion(manifest.version));
    }

    let class_names: HashSet<&str> = manifest.objects.iter().map(|o| o.class_name.as_str()).collect();

    for def in &manifest.objects {
        if !is_identifier(&def.class_name) {
            return Err(ConfigError::InvalidIdentifier(format!("class name '{}'", def.class_name)));
        }
        let table = def.table_name();
        if !is_identifier(&table) {
            return Err(ConfigError::InvalidIdentifier(format!(
                "table name '{}' for {}",
                table, def.class_name
            )));
        }

        for (key, field) in &def.fields {
            if !is_identifier(key) {
                return Err(ConfigError::InvalidIdentifier(format!("{}.{}", def.class_name, key)));
            }
            if field.field_type == FieldType::ForeignKey {
                let target = field.related_target().ok_or_else(|| ConfigError::InvalidRelated {
                    class_name: def.class_name.clone(),
                    field: key.clone(),
                    related: field.related.clone().unwrap_or_default(),
                })?;
                if !is_identifier(&target.0) || !is_identifier(&target.1) {
                    return Err(ConfigError::InvalidRelated {
                        class_name: def.class_name.clone(),
                        field: key.clone(),
                        related: field.related.clone().unwrap_or_default(),
                    });
                }
            }
            if let (Some(min), Some(max)) = (field.min_length, field.max_length) {
                if min > max {
                    return Err(ConfigError::Validation(format!(
                        "{}.{}: minLength {} exceeds maxLength {}",
                        def.class_name, key, min, max
                    )));
                }
            }
        }

        for (name, rel) in &def.relations {
            if !class_names.contains(rel.target.as_str()) {
                return Err(ConfigError::MissingReference {
                    kind: "relation target class",
                    id: format!("{}.{} -> {}", def.class_name, name, rel.target),
                });
            }
            match rel.kind {
                RelationKind::OneToMany => {
                    let fk = rel.foreign_key.as_deref().unwrap_or_default();
                    if !is_identifier(fk) {
                        return Err(ConfigError::Validation(format!(
                            "{}.{}: oneToMany relation needs a foreignKey column",
                            def.class_name, name
                        )));
                    }
                }
                RelationKind::ManyToMany => {
                    if rel.through.as_deref().map(str::trim).unwrap_or_default().is_empty() {
                        return Err(ConfigError::Validation(format!(
                            "{}.{}: manyToMany relation needs a through table",
                            def.class_name, name
                        )));
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{FieldDefinition, ObjectDefinition, RelationDefinition};

    fn manifest(objects: Vec<ObjectDefinition>) -> Manifest {
        Manifest { version: 1, objects }
    }

    #[test]
    fn accepts_well_formed_manifest() {
        let user = ObjectDefinition::new("User")
            .with_field(FieldDefinition::text("email"))
            .with_relation("posts", RelationDefinition::one_to_many("Post", "author_id"));
        let post = ObjectDefinition::new("Post").with_field(FieldDefinition::foreign_key("author_id", "users.id"));
        assert!(validate_manifest(&manifest(vec![user, post])).is_ok());
    }

    #[test]
    fn rejects_unsupported_version() {
        let m = Manifest { version: 7, objects: vec![] };
        assert!(matches!(validate_manifest(&m), Err(ConfigError::UnsupportedVersion(7))));
    }

    #[test]
    fn rejects_foreign_key_without_related() {
        let mut field = FieldDefinition::foreign_key("author_id", "");
        field.related = None;
        let post = ObjectDefinition::new("Post").with_field(field);
        assert!(matches!(
            validate_manifest(&manifest(vec![post])),
            Err(ConfigError::InvalidRelated { .. })
        ));
    }

    #[test]
    fn rejects_injection_in_identifiers() {
        let post = ObjectDefinition::new("Post").with_field(FieldDefinition::text("title\"; DROP"));
        assert!(matches!(
            validate_manifest(&manifest(vec![post])),
            Err(ConfigError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn rejects_dangling_relation_target() {
        let user = ObjectDefinition::new("User")
            .with_field(FieldDefinition::text("email"))
            .with_relation("posts", RelationDefinition::one_to_many("Post", "author_id"));
        assert!(matches!(
            validate_manifest(&manifest(vec![user])),
            Err(ConfigError::MissingReference { .. })
        ));
    }

    #[test]
    fn many_to_many_needs_through() {
        let tag = ObjectDefinition::new("Tag").with_field(FieldDefinition::text("label"));
        let mut rel = RelationDefinition::many_to_many("Tag", "post_tags");
        rel.through = None;
        let post = ObjectDefinition::new("Post")
            .with_field(FieldDefinition::text("title"))
            .with_relation("tags", rel);
        assert!(matches!(
            validate_manifest(&manifest(vec![tag, post])),
            Err(ConfigError::Validation(_))
        ));
    }
}
