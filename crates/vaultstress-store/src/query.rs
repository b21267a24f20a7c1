//! Attribute query evaluation for the in-memory backend
//!
//! Supports the subset of the wallet query language the harness sends:
//! equality, `$neq`, `$in`, `$like`, string range operators, and the
//! `$and` / `$or` / `$not` combinators. `{}` matches every item.

use serde_json::{Map, Value};
use vaultstress_core::Attributes;

use crate::error::{Result, StoreError};

/// A parsed attribute query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    And(Vec<Query>),
    Or(Vec<Query>),
    Not(Box<Query>),
    Eq(String, String),
    Neq(String, String),
    Gt(String, String),
    Gte(String, String),
    Lt(String, String),
    Lte(String, String),
    In(String, Vec<String>),
    Like(String, String),
}

impl Query {
    /// Parse query JSON; an empty string is the match-all query
    pub fn parse(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(Query::And(Vec::new()));
        }
        let value: Value = serde_json::from_str(json)
            .map_err(|e| StoreError::InvalidQuery(e.to_string()))?;
        match value {
            Value::Object(map) => parse_object(&map),
            other => Err(invalid(format!("expected object, got {}", other))),
        }
    }

    /// Whether an item with `tags` satisfies the query
    pub fn matches(&self, tags: &Attributes) -> bool {
        match self {
            Query::And(parts) => parts.iter().all(|q| q.matches(tags)),
            Query::Or(parts) => parts.iter().any(|q| q.matches(tags)),
            Query::Not(inner) => !inner.matches(tags),
            Query::Eq(k, v) => tags.get(k) == Some(v),
            Query::Neq(k, v) => tags.get(k).is_some_and(|t| t != v),
            Query::Gt(k, v) => tags.get(k).is_some_and(|t| t > v),
            Query::Gte(k, v) => tags.get(k).is_some_and(|t| t >= v),
            Query::Lt(k, v) => tags.get(k).is_some_and(|t| t < v),
            Query::Lte(k, v) => tags.get(k).is_some_and(|t| t <= v),
            Query::In(k, values) => tags.get(k).is_some_and(|t| values.contains(t)),
            Query::Like(k, pattern) => tags.get(k).is_some_and(|t| like(t, pattern)),
        }
    }
}

fn invalid(msg: impl Into<String>) -> StoreError {
    StoreError::InvalidQuery(msg.into())
}

fn parse_object(map: &Map<String, Value>) -> Result<Query> {
    let mut parts = Vec::with_capacity(map.len());
    for (key, value) in map {
        let part = match key.as_str() {
            "$and" => Query::And(parse_list(value)?),
            "$or" => Query::Or(parse_list(value)?),
            "$not" => match value {
                Value::Object(inner) => Query::Not(Box::new(parse_object(inner)?)),
                _ => return Err(invalid("$not expects an object")),
            },
            op if op.starts_with('$') => return Err(invalid(format!("unknown operator {}", op))),
            tag => parse_condition(tag, value)?,
        };
        parts.push(part);
    }

    Ok(if parts.len() == 1 {
        parts.remove(0)
    } else {
        Query::And(parts)
    })
}

fn parse_list(value: &Value) -> Result<Vec<Query>> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(map) => parse_object(map),
                _ => Err(invalid("combinator operands must be objects")),
            })
            .collect(),
        _ => Err(invalid("combinator expects an array")),
    }
}

fn parse_condition(tag: &str, value: &Value) -> Result<Query> {
    let tag = tag.to_string();
    match value {
        Value::String(s) => Ok(Query::Eq(tag, s.clone())),
        Value::Object(ops) if ops.len() == 1 => {
            let (op, operand) = ops.iter().next().ok_or_else(|| invalid("empty condition"))?;
            match op.as_str() {
                "$eq" => Ok(Query::Eq(tag, as_string(operand)?)),
                "$neq" => Ok(Query::Neq(tag, as_string(operand)?)),
                "$gt" => Ok(Query::Gt(tag, as_string(operand)?)),
                "$gte" => Ok(Query::Gte(tag, as_string(operand)?)),
                "$lt" => Ok(Query::Lt(tag, as_string(operand)?)),
                "$lte" => Ok(Query::Lte(tag, as_string(operand)?)),
                "$like" => Ok(Query::Like(tag, as_string(operand)?)),
                "$in" => match operand {
                    Value::Array(values) => Ok(Query::In(
                        tag,
                        values.iter().map(as_string).collect::<Result<_>>()?,
                    )),
                    _ => Err(invalid("$in expects an array")),
                },
                other => Err(invalid(format!("unknown operator {}", other))),
            }
        }
        _ => Err(invalid(format!("unsupported condition for tag {}", tag))),
    }
}

fn as_string(value: &Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid(format!("expected string operand, got {}", value)))
}

/// SQL `LIKE` with `%` as the only wildcard
fn like(text: &str, pattern: &str) -> bool {
    let segments: Vec<&str> = pattern.split('%').collect();
    if segments.len() == 1 {
        return text == pattern;
    }

    let first = segments[0];
    let last = segments[segments.len() - 1];
    if !text.starts_with(first) || text.len() < first.len() + last.len() {
        return false;
    }

    let mut rest = &text[first.len()..];
    for segment in &segments[1..segments.len() - 1] {
        match rest.find(segment) {
            Some(pos) => rest = &rest[pos + segment.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_query_matches_everything() {
        for json in ["", "{}"] {
            let query = Query::parse(json).unwrap();
            assert!(query.matches(&Attributes::new()));
            assert!(query.matches(&tags(&[("a", "b")])));
        }
    }

    #[test]
    fn test_equality_and_implicit_and() {
        let query = Query::parse(r#"{"name": "John", "country": "Serbia"}"#).unwrap();
        assert!(query.matches(&tags(&[("name", "John"), ("country", "Serbia")])));
        assert!(!query.matches(&tags(&[("name", "John"), ("country", "Spain")])));
        assert!(!query.matches(&tags(&[("name", "John")])));
    }

    #[test]
    fn test_operators() {
        let item = tags(&[("name", "john"), ("age", "30")]);

        assert!(Query::parse(r#"{"name": {"$in": ["John", "john"]}}"#).unwrap().matches(&item));
        assert!(Query::parse(r#"{"name": {"$neq": "John"}}"#).unwrap().matches(&item));
        assert!(Query::parse(r#"{"age": {"$gte": "30"}}"#).unwrap().matches(&item));
        assert!(!Query::parse(r#"{"age": {"$lt": "30"}}"#).unwrap().matches(&item));
        assert!(Query::parse(r#"{"name": {"$like": "jo%"}}"#).unwrap().matches(&item));
        assert!(Query::parse(r#"{"$not": {"name": "John"}}"#).unwrap().matches(&item));
        assert!(Query::parse(r#"{"$or": [{"name": "x"}, {"age": "30"}]}"#).unwrap().matches(&item));
    }

    #[test]
    fn test_malformed_queries() {
        for json in [
            "not json",
            "[1, 2]",
            r#"{"$bogus": []}"#,
            r#"{"name": {"$in": "John"}}"#,
            r#"{"name": 5}"#,
            r#"{"$and": {"a": "b"}}"#,
        ] {
            assert!(
                matches!(Query::parse(json), Err(StoreError::InvalidQuery(_))),
                "{} should be rejected",
                json
            );
        }
    }

    #[test]
    fn test_like() {
        assert!(like("abcdef", "abc%"));
        assert!(like("abcdef", "%def"));
        assert!(like("abcdef", "a%c%f"));
        assert!(like("abc", "abc"));
        assert!(!like("abc", "abd"));
        assert!(!like("ab", "a%b%c"));
        assert!(!like("a", "a%a"));
    }
}
