//! Table creation order: referenced tables first.

use crate::schema::types::SchemaDefinition;
use std::collections::HashSet;

/// Topological order over `dependencies`. Dependencies outside the given set are treated as
/// already present. Cycles are tolerated: the remaining tables are appended in name order.
pub fn order_by_dependencies(schemas: &[SchemaDefinition]) -> Vec<&SchemaDefinition> {
    let known: HashSet<&str> = schemas.iter().map(|s| s.table_name.as_str()).collect();
    let mut order: Vec<&SchemaDefinition> = Vec::with_capacity(schemas.len());
    let mut done: HashSet<&str> = HashSet::new();

    while order.len() < schemas.len() {
        let mut made_progress = false;
        for schema in schemas {
            if done.contains(schema.table_name.as_str()) {
                continue;
            }
            let ready = schema
                .dependencies
                .iter()
                .filter(|d| known.contains(d.as_str()))
                .all(|d| done.contains(d.as_str()));
            if ready {
                order.push(schema);
                done.insert(schema.table_name.as_str());
                made_progress = true;
            }
        }
        if !made_progress {
            let mut rest: Vec<&SchemaDefinition> = schemas
                .iter()
                .filter(|s| !done.contains(s.table_name.as_str()))
                .collect();
            rest.sort_by(|a, b| a.table_name.cmp(&b.table_name));
            tracing::warn!(
                tables = ?rest.iter().map(|s| s.table_name.as_str()).collect::<Vec<_>>(),
                "dependency cycle between tables; creating in name order"
            );
            order.extend(rest);
            break;
        }
    }
    order
}
