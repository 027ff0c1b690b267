//! Batched relationship loading: one query per requested relationship, whatever the row count.

use crate::definition::{FieldDefinition, FieldType, ObjectDefinition, OrderedMap, RelationKind};
use crate::error::{AppError, ConfigError, QueryError};
use crate::registry::MetadataRegistry;
use crate::schema::{SchemaDefinition, SchemaGenerator, ID_COLUMN};
use crate::service::executor::SqlExecutor;
use crate::service::instance::{Instance, Related};
use crate::sql::{select_by_column_in, QueryBuf};
use futures::future::try_join_all;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// How one requested relationship will be fetched.
#[derive(Debug)]
pub(crate) enum RelationPlan {
    /// Foreign key on our table: fetch targets WHERE `references` IN (our column values).
    ManyToOne {
        name: String,
        column: String,
        references: String,
        target: SchemaDefinition,
    },
    /// Foreign key on the target table: fetch targets WHERE `foreign_key` IN (our ids).
    OneToMany {
        name: String,
        foreign_key: String,
        target: SchemaDefinition,
    },
}

impl RelationPlan {
    fn name(&self) -> &str {
        match self {
            RelationPlan::ManyToOne { name, .. } | RelationPlan::OneToMany { name, .. } => name,
        }
    }
}

pub(crate) struct RelationLoader<'a> {
    pub registry: &'a MetadataRegistry,
    pub executor: &'a dyn SqlExecutor,
    pub definition: &'a ObjectDefinition,
    pub fields: &'a OrderedMap<FieldDefinition>,
}

/// Map key for a column value; ids are strings, but integer keys are tolerated.
fn value_key(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn distinct(values: impl Iterator<Item = Value>) -> Vec<Value> {
    let mut seen = HashSet::new();
    values
        .filter(|v| value_key(v).map(|k| seen.insert(k)).unwrap_or(false))
        .collect()
}

impl<'a> RelationLoader<'a> {
    /// Resolve every requested name before any query runs, so an unsupported or unknown
    /// relationship fails the whole call instead of returning partial data.
    pub fn plan(&self, names: &[String]) -> Result<Vec<RelationPlan>, AppError> {
        let mut seen = HashSet::new();
        names
            .iter()
            .filter(|n| seen.insert(n.as_str()))
            .map(|n| self.plan_one(n))
            .collect()
    }

    fn plan_one(&self, name: &str) -> Result<RelationPlan, AppError> {
        let class_name = &self.definition.class_name;
        if let Some(rel) = self.definition.relations.get(name) {
            return match rel.kind {
                RelationKind::ManyToMany => Err(QueryError::Unsupported(format!(
                    "many-to-many eager loading ({}.{})",
                    class_name, name
                ))
                .into()),
                RelationKind::OneToMany => {
                    let foreign_key = rel.foreign_key.clone().ok_or_else(|| {
                        ConfigError::Validation(format!("{}.{}: oneToMany needs foreignKey", class_name, name))
                    })?;
                    let target = self.target_by_class(&rel.target)?;
                    if !target.has_column(&foreign_key) {
                        return Err(QueryError::UnknownField {
                            table: target.table_name.clone(),
                            field: foreign_key,
                        }
                        .into());
                    }
                    Ok(RelationPlan::OneToMany {
                        name: name.to_string(),
                        foreign_key,
                        target,
                    })
                }
            };
        }

        // `include: ["author"]` resolves to an `author` or `author_id` foreign key field.
        let field = [name.to_string(), format!("{}_id", name)]
            .into_iter()
            .find_map(|candidate| {
                self.fields
                    .get(&candidate)
                    .filter(|f| f.field_type == FieldType::ForeignKey)
                    .map(|f| (candidate, f))
            });
        let Some((column, field)) = field else {
            return Err(QueryError::UnknownRelation {
                class_name: class_name.clone(),
                relation: name.to_string(),
            }
            .into());
        };
        let (table, references) = field.related_target().ok_or_else(|| ConfigError::InvalidRelated {
            class_name: class_name.clone(),
            field: column.clone(),
            related: field.related.clone().unwrap_or_default(),
        })?;
        let target_def = self
            .registry
            .definition_by_table(&table)
            .ok_or(ConfigError::MissingReference { kind: "table", id: table })?;
        let target = SchemaGenerator::new(self.registry).generate(&target_def.class_name)?;
        Ok(RelationPlan::ManyToOne {
            name: name.to_string(),
            column,
            references,
            target,
        })
    }

    fn target_by_class(&self, class: &str) -> Result<SchemaDefinition, AppError> {
        if self.registry.get_definition(class).is_none() {
            return Err(ConfigError::MissingReference {
                kind: "class",
                id: class.to_string(),
            }
            .into());
        }
        Ok(SchemaGenerator::new(self.registry).generate(class)?)
    }

    fn batch_query(plan: &RelationPlan, instances: &[Instance]) -> QueryBuf {
        match plan {
            RelationPlan::ManyToOne {
                column,
                references,
                target,
                ..
            } => {
                let keys = distinct(instances.iter().filter_map(|i| i.get(column).cloned()));
                select_by_column_in(target, references, &keys)
            }
            RelationPlan::OneToMany {
                foreign_key, target, ..
            } => {
                let ids = distinct(instances.iter().filter_map(|i| i.get(ID_COLUMN).cloned()));
                select_by_column_in(target, foreign_key, &ids)
            }
        }
    }

    /// Run one batch per plan (concurrently), then attach results to every instance.
    pub async fn attach(&self, instances: &mut [Instance], plans: &[RelationPlan]) -> Result<(), AppError> {
        if plans.is_empty() {
            return Ok(());
        }
        let queries: Vec<QueryBuf> = plans.iter().map(|p| Self::batch_query(p, instances)).collect();
        let results = try_join_all(queries.iter().map(|q| self.executor.query(&q.sql, &q.params))).await?;

        for (plan, rows) in plans.iter().zip(results) {
            tracing::debug!(
                class = %self.definition.class_name,
                relation = %plan.name(),
                parents = instances.len(),
                fetched = rows.len(),
                "eager loaded"
            );
            match plan {
                RelationPlan::ManyToOne {
                    name,
                    column,
                    references,
                    target,
                } => {
                    let mut by_key: HashMap<String, Instance> = HashMap::new();
                    for row in rows {
                        let inst = Instance::from_row(target, row);
                        if let Some(k) = inst.get(references).and_then(value_key) {
                            by_key.entry(k).or_insert(inst);
                        }
                    }
                    for inst in instances.iter_mut() {
                        let hit = inst
                            .get(column)
                            .and_then(value_key)
                            .and_then(|k| by_key.get(&k).cloned())
                            .map(Box::new);
                        inst.set_related(name.clone(), Related::One(hit));
                    }
                }
                RelationPlan::OneToMany {
                    name,
                    foreign_key,
                    target,
                } => {
                    let mut groups: HashMap<String, Vec<Instance>> = HashMap::new();
                    for row in rows {
                        let child = Instance::from_row(target, row);
                        if let Some(k) = child.get(foreign_key).and_then(value_key) {
                            groups.entry(k).or_default().push(child);
                        }
                    }
                    for inst in instances.iter_mut() {
                        let children = inst
                            .get(ID_COLUMN)
                            .and_then(value_key)
                            .and_then(|k| groups.get(&k).cloned())
                            .unwrap_or_default();
                        inst.set_related(name.clone(), Related::Many(children));
                    }
                }
            }
        }
        Ok(())
    }
}
