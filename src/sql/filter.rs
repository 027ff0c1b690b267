//! Where-clause grammar and ORDER BY parsing.
//!
//! A where key is a bare field name (implicit `=`) or `"field <op>"` with `<op>` one of
//! `=`, `!=`, `>`, `>=`, `<`, `<=`, `like`, `in`. Keys are ANDed in map order. Anything that does
//! not parse is rejected; nothing is ever interpolated into SQL.

use crate::error::QueryError;
use crate::schema::SchemaDefinition;
use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
    In,
}

impl Operator {
    pub fn parse(token: &str) -> Option<Self> {
        Some(match token.to_ascii_lowercase().as_str() {
            "=" => Operator::Eq,
            "!=" => Operator::Ne,
            ">" => Operator::Gt,
            ">=" => Operator::Ge,
            "<" => Operator::Lt,
            "<=" => Operator::Le,
            "like" => Operator::Like,
            "in" => Operator::In,
            _ => return None,
        })
    }

    pub fn sql(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Like => "LIKE",
            Operator::In => "IN",
        }
    }

    pub fn is_in(self) -> bool {
        self == Operator::In
    }

    pub fn is_negated(self) -> bool {
        self == Operator::Ne
    }
}

/// One validated `column op value` condition.
#[derive(Clone, Debug, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub op: Operator,
    pub value: Value,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

fn split_key(key: &str) -> Result<(&str, Operator), QueryError> {
    let mut parts = key.split_whitespace();
    let field = parts
        .next()
        .ok_or_else(|| QueryError::MalformedOperator(key.to_string()))?;
    let op = match parts.next() {
        None => Operator::Eq,
        Some(tok) => Operator::parse(tok).ok_or_else(|| QueryError::MalformedOperator(key.to_string()))?,
    };
    if parts.next().is_some() || !crate::case::is_identifier(field) {
        return Err(QueryError::MalformedOperator(key.to_string()));
    }
    Ok((field, op))
}

fn known_column(schema: &SchemaDefinition, field: &str) -> Result<(), QueryError> {
    if schema.has_column(field) {
        Ok(())
    } else {
        Err(QueryError::UnknownField {
            table: schema.table_name.clone(),
            field: field.to_string(),
        })
    }
}

/// Parse a where map into predicates against the schema's columns.
pub fn parse_where(schema: &SchemaDefinition, filter: &Map<String, Value>) -> Result<Vec<Predicate>, QueryError> {
    let mut out = Vec::with_capacity(filter.len());
    for (key, value) in filter {
        let (field, op) = split_key(key)?;
        known_column(schema, field)?;
        match (op, value) {
            (Operator::In, Value::Array(items)) => {
                if items.iter().any(|v| v.is_array() || v.is_object()) {
                    return Err(QueryError::InvalidValue {
                        key: key.clone(),
                        reason: "`in` items must be scalars".into(),
                    });
                }
            }
            (Operator::In, _) => {
                return Err(QueryError::InvalidValue {
                    key: key.clone(),
                    reason: "`in` expects an array".into(),
                })
            }
            (Operator::Eq | Operator::Ne, Value::Null) => {}
            (_, Value::Null) => {
                return Err(QueryError::InvalidValue {
                    key: key.clone(),
                    reason: "null only compares with = or !=".into(),
                })
            }
            (Operator::Like, v) if !v.is_string() => {
                return Err(QueryError::InvalidValue {
                    key: key.clone(),
                    reason: "`like` expects a string pattern".into(),
                })
            }
            _ => {}
        }
        out.push(Predicate {
            column: field.to_string(),
            op,
            value: value.clone(),
        });
    }
    Ok(out)
}

/// Parse `"field"`, `"field ASC"` or `"field DESC"` entries.
pub fn parse_order_by(schema: &SchemaDefinition, entries: &[String]) -> Result<Vec<OrderBy>, QueryError> {
    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        let mut parts = entry.split_whitespace();
        let invalid = || QueryError::InvalidValue {
            key: "orderBy".into(),
            reason: format!("cannot parse '{}'", entry),
        };
        let field = parts.next().ok_or_else(invalid)?;
        let descending = match parts.next() {
            None => false,
            Some(dir) if dir.eq_ignore_ascii_case("asc") => false,
            Some(dir) if dir.eq_ignore_ascii_case("desc") => true,
            Some(_) => return Err(invalid()),
        };
        if parts.next().is_some() {
            return Err(invalid());
        }
        known_column(schema, field)?;
        out.push(OrderBy {
            column: field.to_string(),
            descending,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{FieldDefinition, FieldType, ObjectDefinition};
    use crate::schema::generate_schema;
    use serde_json::json;

    fn schema() -> SchemaDefinition {
        generate_schema(
            &ObjectDefinition::new("Product")
                .with_field(FieldDefinition::new("price", FieldType::Decimal))
                .with_field(FieldDefinition::text("category")),
        )
        .unwrap()
    }

    fn filter(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_operators_parse() {
        let preds = parse_where(
            &schema(),
            &filter(json!({"price >": 100, "price <=": 200, "category in": ["A", "B"], "category LIKE": "A%"})),
        )
        .unwrap();
        let ops: Vec<Operator> = preds.iter().map(|p| p.op).collect();
        assert_eq!(ops, vec![Operator::Gt, Operator::Le, Operator::In, Operator::Like]);
    }

    #[test]
    fn test_malformed_operators_rejected() {
        for key in ["price ~", "price > 1", "price; DROP", "price >>", "", "1price"] {
            let mut where_map = Map::new();
            where_map.insert(key.to_string(), json!(1));
            let err = parse_where(&schema(), &where_map).unwrap_err();
            assert!(matches!(err, QueryError::MalformedOperator(_)), "{key}: {err}");
        }
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = parse_where(&schema(), &filter(json!({"colour": "red"}))).unwrap_err();
        assert!(matches!(err, QueryError::UnknownField { .. }));
    }

    #[test]
    fn test_value_shape_checked() {
        assert!(parse_where(&schema(), &filter(json!({"category in": "A"}))).is_err());
        assert!(parse_where(&schema(), &filter(json!({"price >": null}))).is_err());
        assert!(parse_where(&schema(), &filter(json!({"category !=": null}))).is_ok());
    }

    #[test]
    fn test_order_by() {
        let order = parse_order_by(&schema(), &["price desc".into(), "category".into()]).unwrap();
        assert_eq!(
            order,
            vec![
                OrderBy { column: "price".into(), descending: true },
                OrderBy { column: "category".into(), descending: false },
            ]
        );
        assert!(parse_order_by(&schema(), &["price sideways".into()]).is_err());
        assert!(parse_order_by(&schema(), &["nope".into()]).is_err());
    }
}
