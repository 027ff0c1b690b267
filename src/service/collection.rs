//! Collection: list/get/count/create/update/delete/getOrUpsert over one registered class.

use crate::definition::{FieldDefinition, ObjectDefinition, OrderedMap};
use crate::error::{AppError, ConfigError, QueryError};
use crate::registry::MetadataRegistry;
use crate::schema::{SchemaDefinition, SchemaGenerator, CREATED_AT_COLUMN, ID_COLUMN, UPDATED_AT_COLUMN};
use crate::service::eager::RelationLoader;
use crate::service::executor::SqlExecutor;
use crate::service::instance::{hydrate_value, Instance, Related};
use crate::service::validation::RequestValidator;
use crate::sql::{self, encode_value, parse_order_by, parse_where, QueryBuf};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Query options for `list` (and the `where` part for `count`).
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOptions {
    #[serde(default, rename = "where")]
    pub filter: Map<String, Value>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
    /// `"field"`, `"field DESC"`; a single string or an array.
    #[serde(default, deserialize_with = "one_or_many")]
    pub order_by: Vec<String>,
    /// Relationship names to eager-load.
    #[serde(default, deserialize_with = "one_or_many")]
    pub include: Vec<String>,
}

fn one_or_many<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }
    Ok(match OneOrMany::deserialize(d)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.filter.insert(key.into(), value);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn order_by(mut self, entry: impl Into<String>) -> Self {
        self.order_by.push(entry.into());
        self
    }

    pub fn include(mut self, relation: impl Into<String>) -> Self {
        self.include.push(relation.into());
        self
    }
}

/// What `get` looks up by.
#[derive(Clone, Debug, PartialEq)]
pub enum GetFilter {
    /// An id, or a slug when the table has a `slug` column.
    Key(String),
    Where(Map<String, Value>),
}

impl From<&str> for GetFilter {
    fn from(s: &str) -> Self {
        GetFilter::Key(s.to_string())
    }
}

impl From<String> for GetFilter {
    fn from(s: String) -> Self {
        GetFilter::Key(s)
    }
}

impl From<Map<String, Value>> for GetFilter {
    fn from(m: Map<String, Value>) -> Self {
        GetFilter::Where(m)
    }
}

/// Outcome of `get_or_upsert`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum UpsertAction {
    Created,
    Updated { changed: Vec<String> },
    Unchanged,
}

#[derive(Clone)]
pub struct Collection {
    definition: Arc<ObjectDefinition>,
    schema: Arc<SchemaDefinition>,
    fields: Arc<OrderedMap<FieldDefinition>>,
    registry: Arc<MetadataRegistry>,
    executor: Arc<dyn SqlExecutor>,
}

impl Collection {
    pub fn new(
        registry: Arc<MetadataRegistry>,
        executor: Arc<dyn SqlExecutor>,
        class_name: &str,
    ) -> Result<Self, AppError> {
        let definition = registry
            .get_definition(class_name)
            .cloned()
            .ok_or_else(|| ConfigError::NoFields {
                class_name: class_name.to_string(),
            })?;
        let schema = SchemaGenerator::new(&registry).generate(class_name)?;
        let fields = registry.resolved_fields(class_name);
        Ok(Self {
            definition,
            schema: Arc::new(schema),
            fields: Arc::new(fields),
            registry,
            executor,
        })
    }

    /// Collection for a table/collection name (`articles`), as used in URL paths.
    pub fn for_table(
        registry: Arc<MetadataRegistry>,
        executor: Arc<dyn SqlExecutor>,
        table: &str,
    ) -> Result<Self, AppError> {
        let class_name = registry
            .definition_by_table(table)
            .map(|d| d.class_name.clone())
            .ok_or_else(|| AppError::NotFound(format!("collection {}", table)))?;
        Self::new(registry, executor, &class_name)
    }

    pub fn class_name(&self) -> &str {
        &self.definition.class_name
    }

    pub fn table_name(&self) -> &str {
        &self.schema.table_name
    }

    pub fn definition(&self) -> &ObjectDefinition {
        &self.definition
    }

    pub fn schema(&self) -> &SchemaDefinition {
        &self.schema
    }

    fn loader(&self) -> RelationLoader<'_> {
        RelationLoader {
            registry: &self.registry,
            executor: self.executor.as_ref(),
            definition: &self.definition,
            fields: &self.fields,
        }
    }

    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<Instance>, AppError> {
        let rows = self.executor.query(&q.sql, &q.params).await?;
        Ok(rows.into_iter().map(|r| Instance::from_row(&self.schema, r)).collect())
    }

    async fn fetch_one(&self, q: &QueryBuf) -> Result<Option<Instance>, AppError> {
        Ok(self.fetch_all(q).await?.into_iter().next())
    }

    /// Rows matching `where`, paged and ordered as asked, with relationships eager-loaded.
    /// Without `orderBy` rows come back in storage order.
    pub async fn list(&self, options: &ListOptions) -> Result<Vec<Instance>, AppError> {
        let predicates = parse_where(&self.schema, &options.filter)?;
        let order = parse_order_by(&self.schema, &options.order_by)?;
        let loader = self.loader();
        let plans = loader.plan(&options.include)?;

        let q = sql::select_list(&self.schema, &predicates, &order, options.limit, options.offset);
        let mut instances = self.fetch_all(&q).await?;
        loader.attach(&mut instances, &plans).await?;
        Ok(instances)
    }

    /// Cardinality of `where`; limit, offset, ordering and includes are ignored.
    pub async fn count(&self, options: &ListOptions) -> Result<u64, AppError> {
        let predicates = parse_where(&self.schema, &options.filter)?;
        let q = sql::count(&self.schema, &predicates);
        let rows = self.executor.query(&q.sql, &q.params).await?;
        Ok(rows
            .first()
            .and_then(|r| r.get("count"))
            .and_then(Value::as_u64)
            .unwrap_or(0))
    }

    /// One instance or None. Never an error for "not found".
    pub async fn get(&self, filter: impl Into<GetFilter>) -> Result<Option<Instance>, AppError> {
        let q = match filter.into() {
            GetFilter::Key(key) => sql::select_by_key(&self.schema, &key),
            GetFilter::Where(map) => {
                let predicates = parse_where(&self.schema, &map)?;
                sql::select_list(&self.schema, &predicates, &[], Some(1), None)
            }
        };
        self.fetch_one(&q).await
    }

    /// Null for a NOT NULL column with a default: omitted on insert, '' on update of text columns.
    fn normalize_nulls(&self, data: &mut Map<String, Value>, creating: bool) {
        let nulled: Vec<String> = data
            .iter()
            .filter(|(k, v)| {
                v.is_null()
                    && self
                        .schema
                        .column(k)
                        .is_some_and(|c| c.not_null && c.default_value.is_some())
            })
            .map(|(k, _)| k.clone())
            .collect();
        for k in nulled {
            let empty_text = self
                .schema
                .column(&k)
                .is_some_and(|c| c.default_value.as_deref() == Some("''"));
            if creating {
                data.remove(&k);
            } else if empty_text {
                data.insert(k, Value::String(String::new()));
            }
        }
    }

    /// Validate and insert. A missing or empty `id` gets a fresh UUID v4.
    pub async fn create(&self, mut data: Map<String, Value>) -> Result<Instance, AppError> {
        RequestValidator::validate(&data, &self.fields)?;
        self.normalize_nulls(&mut data, true);
        let has_id = data
            .get(ID_COLUMN)
            .and_then(Value::as_str)
            .is_some_and(|s| !s.is_empty());
        if !has_id {
            data.insert(ID_COLUMN.to_string(), Value::String(uuid::Uuid::new_v4().to_string()));
        }
        let q = sql::insert(&self.schema, &data);
        self.fetch_one(&q)
            .await?
            .ok_or_else(|| AppError::Db(sqlx::Error::RowNotFound))
    }

    /// Update exactly the given fields and return the stored row. With nothing to write,
    /// returns the current row.
    pub async fn update(&self, id: &str, mut changes: Map<String, Value>) -> Result<Option<Instance>, AppError> {
        RequestValidator::validate_partial(&changes, &self.fields)?;
        self.normalize_nulls(&mut changes, false);
        let id = Value::String(id.to_string());
        if let Some(q) = sql::update(&self.schema, &id, &changes) {
            // RETURNING predates the updated_at trigger; re-read below.
            if self.fetch_one(&q).await?.is_none() {
                return Ok(None);
            }
        }
        self.fetch_one(&sql::select_by_id(&self.schema, &id)).await
    }

    /// Delete by id, returning the removed row.
    pub async fn delete(&self, id: &str) -> Result<Option<Instance>, AppError> {
        let q = sql::delete(&self.schema, &Value::String(id.to_string()));
        self.fetch_one(&q).await
    }

    /// Identify by `id`, else by the first unique column (schema order) present in `data`.
    fn identifying_filter(&self, data: &Map<String, Value>) -> Result<Map<String, Value>, AppError> {
        let mut filter = Map::new();
        if let Some(id) = data.get(ID_COLUMN).filter(|v| !v.is_null()) {
            filter.insert(ID_COLUMN.to_string(), id.clone());
            return Ok(filter);
        }
        for col in self.schema.unique_columns() {
            if let Some(v) = data.get(&col.name).filter(|v| !v.is_null()) {
                filter.insert(col.name.clone(), v.clone());
                return Ok(filter);
            }
        }
        Err(QueryError::NoIdentifyingFields(self.class_name().to_string()).into())
    }

    /// Fields of `data` whose stored form differs from `current`.
    fn diff(&self, current: &Instance, data: &Map<String, Value>) -> Result<Map<String, Value>, AppError> {
        let mut changes = Map::new();
        for (k, v) in data {
            if k == ID_COLUMN || k == CREATED_AT_COLUMN || k == UPDATED_AT_COLUMN {
                continue;
            }
            let column = self.schema.column(k).ok_or_else(|| QueryError::UnknownField {
                table: self.schema.table_name.clone(),
                field: k.clone(),
            })?;
            let wanted = hydrate_value(column, encode_value(Some(column), v));
            if !same_value(current.get(k).unwrap_or(&Value::Null), &wanted) {
                changes.insert(k.clone(), v.clone());
            }
        }
        Ok(changes)
    }

    /// Find by identifying fields; update only the changed fields, or create from
    /// `defaults` overlaid with `data`. Unchanged data performs no write.
    pub async fn get_or_upsert(
        &self,
        data: Map<String, Value>,
        defaults: Map<String, Value>,
    ) -> Result<(Instance, UpsertAction), AppError> {
        let filter = self.identifying_filter(&data)?;
        match self.get(filter).await? {
            Some(current) => {
                let mut wanted = data;
                self.normalize_nulls(&mut wanted, false);
                let changes = self.diff(&current, &wanted)?;
                if changes.is_empty() {
                    return Ok((current, UpsertAction::Unchanged));
                }
                let id = current
                    .id()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::NotFound(format!("{} without id", self.class_name())))?;
                let changed: Vec<String> = changes.keys().cloned().collect();
                tracing::debug!(class = %self.class_name(), id = %id, changed = ?changed, "upsert: updating");
                let updated = self
                    .update(&id, changes)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("{} {}", self.class_name(), id)))?;
                Ok((updated, UpsertAction::Updated { changed }))
            }
            None => {
                let mut merged = defaults;
                for (k, v) in data {
                    merged.insert(k, v);
                }
                let created = self.create(merged).await?;
                Ok((created, UpsertAction::Created))
            }
        }
    }

    /// Load one relationship onto an instance unless it is already loaded.
    pub async fn load_related<'i>(&self, instance: &'i mut Instance, name: &str) -> Result<&'i Related, AppError> {
        if !instance.is_related_loaded(name) {
            let loader = self.loader();
            let plans = loader.plan(&[name.to_string()])?;
            loader.attach(std::slice::from_mut(instance), &plans).await?;
        }
        instance.get_related(name).ok_or_else(|| {
            QueryError::UnknownRelation {
                class_name: self.class_name().to_string(),
                relation: name.to_string(),
            }
            .into()
        })
    }
}

/// Equality with numbers compared by value (1 == 1.0).
fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_options_deserialize_string_or_array() {
        let opts: ListOptions = serde_json::from_value(json!({
            "where": {"price >": 100},
            "limit": 5,
            "orderBy": "price DESC",
            "include": ["category", "tags"]
        }))
        .unwrap();
        assert_eq!(opts.order_by, vec!["price DESC"]);
        assert_eq!(opts.include, vec!["category", "tags"]);
        assert_eq!(opts.limit, Some(5));
        assert_eq!(opts.filter["price >"], json!(100));

        let empty: ListOptions = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty, ListOptions::default());
    }

    #[test]
    fn builder_accumulates() {
        let opts = ListOptions::new()
            .filter("status", json!("published"))
            .order_by("created_at DESC")
            .include("author")
            .limit(10)
            .offset(20);
        assert_eq!(opts.filter.len(), 1);
        assert_eq!(opts.order_by.len(), 1);
        assert_eq!((opts.limit, opts.offset), (Some(10), Some(20)));
    }

    #[test]
    fn numbers_compare_by_value() {
        assert!(same_value(&json!(1), &json!(1.0)));
        assert!(!same_value(&json!(1), &json!("1")));
    }

    #[test]
    fn upsert_action_serializes_tagged() {
        assert_eq!(
            serde_json::to_value(UpsertAction::Updated { changed: vec!["title".into()] }).unwrap(),
            json!({"action": "updated", "changed": ["title"]})
        );
    }
}
