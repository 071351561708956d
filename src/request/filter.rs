//! Filter expressions
//!
//! Normalizes the different ways a caller can describe a filter (single
//! clauses, bare lists of clauses, positional `[field, operator, value]`
//! triples, explicit `{logic, filters}` groups) into one canonical tree.

use anyhow::{bail, Context, Result};
use serde_json::{json, Map, Value};

/// Logical operator joining the members of a filter group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    And,
    Or,
}

impl Logic {
    pub fn as_str(self) -> &'static str {
        match self {
            Logic::And => "and",
            Logic::Or => "or",
        }
    }

    fn parse(raw: &Value) -> Result<Self> {
        let text = raw
            .as_str()
            .with_context(|| format!("Filter logic must be a string, got {}", raw))?;
        match text.to_ascii_lowercase().as_str() {
            "and" => Ok(Logic::And),
            "or" => Ok(Logic::Or),
            other => bail!("Unknown filter logic: {}", other),
        }
    }
}

/// A single `field operator value` condition
#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause {
    pub field: String,
    pub operator: String,
    pub value: Value,
}

impl FilterClause {
    pub fn new(field: &str, operator: &str, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_string(),
            operator: operator.to_string(),
            value: value.into(),
        }
    }

    fn to_value(&self) -> Value {
        json!({
            "field": self.field,
            "operator": self.operator,
            "value": self.value,
        })
    }
}

/// Member of a filter group: either a leaf clause or a nested group
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    Clause(FilterClause),
    Group(FilterExpression),
}

impl FilterNode {
    fn to_value(&self) -> Value {
        match self {
            FilterNode::Clause(clause) => clause.to_value(),
            FilterNode::Group(group) => group.to_value(),
        }
    }

    /// Normalize one raw element of a `filters` list.
    fn from_raw(raw: &Value) -> Result<Self> {
        match raw {
            Value::Array(items) => match items.as_slice() {
                [Value::String(field), Value::String(operator), value] => {
                    Ok(FilterNode::Clause(FilterClause::new(field, operator, value.clone())))
                },
                _ => bail!("Positional filter must be [field, operator, value], got {}", raw),
            },
            Value::Object(map) if is_group(map) => {
                let mut group = FilterExpression::default();
                group.merge_from(raw)?;
                Ok(FilterNode::Group(group))
            },
            Value::Object(map) => Ok(FilterNode::Clause(named_clause(map)?)),
            _ => bail!("Unsupported filter element: {}", raw),
        }
    }
}

fn is_group(map: &Map<String, Value>) -> bool {
    map.contains_key("filters") || map.contains_key("logic")
}

fn named_clause(map: &Map<String, Value>) -> Result<FilterClause> {
    let field = map
        .get("field")
        .and_then(Value::as_str)
        .with_context(|| format!("Filter clause is missing a string `field`: {:?}", map))?;
    let operator = map
        .get("operator")
        .and_then(Value::as_str)
        .with_context(|| format!("Filter clause is missing a string `operator`: {:?}", map))?;
    let value = map
        .get("value")
        .cloned()
        .with_context(|| format!("Filter clause is missing `value`: {:?}", map))?;
    Ok(FilterClause::new(field, operator, value))
}

/// Canonical filter tree sent as the `filter` query parameter
///
/// The root starts without a logic operator; the first clause or merge
/// decides it and later merges never override it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterExpression {
    logic: Option<Logic>,
    filters: Vec<FilterNode>,
}

impl FilterExpression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logic(&self) -> Option<Logic> {
        self.logic
    }

    pub fn filters(&self) -> &[FilterNode] {
        &self.filters
    }

    pub fn is_empty(&self) -> bool {
        self.logic.is_none() && self.filters.is_empty()
    }

    /// Append a clause to the root group (defaults the logic to `and`)
    pub fn add_clause(&mut self, field: &str, operator: &str, value: impl Into<Value>) {
        self.logic.get_or_insert(Logic::And);
        self.filters
            .push(FilterNode::Clause(FilterClause::new(field, operator, value)));
    }

    /// Merge a raw filter description into the root group.
    ///
    /// Accepts a bare list of clauses, an explicit `{logic, filters}` group or
    /// a single named clause. Positional triples are rewritten to named
    /// clauses and nested groups are kept as sub-trees. Nothing is appended
    /// if any element fails to normalize.
    pub fn merge_from(&mut self, raw: &Value) -> Result<()> {
        let (logic, elements): (Option<Logic>, Vec<FilterNode>) = match raw {
            Value::Array(items) => (None, normalize_all(items)?),
            Value::Object(map) => match map.get("filters") {
                Some(Value::Array(items)) => {
                    let logic = map.get("logic").map(Logic::parse).transpose()?;
                    (logic, normalize_all(items)?)
                },
                Some(other) => bail!("Filter group `filters` must be a list, got {}", other),
                None if map.contains_key("logic") && map.len() == 1 => {
                    (map.get("logic").map(Logic::parse).transpose()?, Vec::new())
                },
                None => (None, vec![FilterNode::Clause(named_clause(map)?)]),
            },
            Value::Null => return Ok(()),
            _ => bail!("Unsupported filter description: {}", raw),
        };

        self.logic.get_or_insert(logic.unwrap_or(Logic::And));
        self.filters.extend(elements);
        Ok(())
    }

    /// JSON form of the tree; an untouched expression is `{}`
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        if let Some(logic) = self.logic {
            map.insert("logic".to_string(), Value::String(logic.as_str().to_string()));
        }
        if self.logic.is_some() || !self.filters.is_empty() {
            map.insert(
                "filters".to_string(),
                Value::Array(self.filters.iter().map(FilterNode::to_value).collect()),
            );
        }
        Value::Object(map)
    }
}

fn normalize_all(items: &[Value]) -> Result<Vec<FilterNode>> {
    items.iter().map(FilterNode::from_raw).collect()
}
