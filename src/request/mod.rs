//! Request descriptions
//!
//! A [`Request`] describes one intended operation on an entity model. It is
//! built by the caller, handed to [`crate::Client::execute`] and afterwards
//! carries the cached [`ApiResponse`] of its single execution.
//!
//! # Module Structure
//!
//! - [`filter`] - Filter expression normalization
//! - [`attributes`] - Typed attribute values for create/update bodies
//!
//! # Example
//!
//! ```ignore
//! use daktela_v6::{Client, Request};
//!
//! fn example(client: &Client) {
//!     let mut request = Request::read_all("CampaignsRecords")
//!         .filter("created", "gte", "2020-11-01 00:00:00")
//!         .take(500);
//!     let response = client.execute(&mut request);
//! }
//! ```

pub mod attributes;
pub mod filter;

use crate::api::response::ApiResponse;
use anyhow::Result;
use serde_json::{json, Map, Value};

pub use attributes::{AttributeValue, Attributes};
pub use filter::{FilterClause, FilterExpression, FilterNode, Logic};

/// Default page size of read requests
pub const DEFAULT_TAKE: u32 = 100;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl std::str::FromStr for SortDirection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(anyhow::anyhow!("Unknown sort direction: {}", other)),
        }
    }
}

/// One sort condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOrder {
    pub field: String,
    pub dir: SortDirection,
}

/// Pagination window, filter and sort shared by the collection reads
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub filter: FilterExpression,
    pub sort: Vec<SortOrder>,
    pub skip: u32,
    pub take: u32,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            filter: FilterExpression::default(),
            sort: Vec::new(),
            skip: 0,
            take: DEFAULT_TAKE,
        }
    }
}

impl Query {
    /// Query parameters for one page starting at `skip`
    pub fn params(&self, skip: u64) -> Vec<(String, Value)> {
        let sort: Vec<Value> = self
            .sort
            .iter()
            .map(|s| json!({"field": s.field, "dir": s.dir.as_str()}))
            .collect();
        vec![
            ("skip".to_string(), Value::from(skip)),
            ("take".to_string(), Value::from(self.take)),
            ("filter".to_string(), self.filter.to_value()),
            ("sort".to_string(), Value::Array(sort)),
        ]
    }
}

/// Parent object and relation name of a relation read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub object_id: String,
    pub name: String,
}

/// Read sub-type selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadKind {
    Single,
    Multiple,
    Relation { object_id: String, relation: String },
    All,
}

/// The operation a request performs
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Create {
        attributes: Attributes,
    },
    Update {
        object_id: Option<String>,
        attributes: Attributes,
    },
    Delete {
        object_id: Option<String>,
    },
    ReadSingle {
        object_id: Option<String>,
    },
    ReadMultiple {
        query: Query,
    },
    ReadRelation {
        object_id: Option<String>,
        relation: String,
        query: Query,
    },
    /// Every page of a collection, fetched sequentially
    ReadAll {
        relation: Option<Relation>,
        query: Query,
        skip_error_pages: bool,
    },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Create { .. } => "create",
            Operation::Update { .. } => "update",
            Operation::Delete { .. } => "delete",
            Operation::ReadSingle { .. } => "read-single",
            Operation::ReadMultiple { .. } => "read-multiple",
            Operation::ReadRelation { .. } => "read-relation",
            Operation::ReadAll { .. } => "read-all",
        }
    }

    fn query_mut(&mut self) -> Option<&mut Query> {
        match self {
            Operation::ReadMultiple { query }
            | Operation::ReadRelation { query, .. }
            | Operation::ReadAll { query, .. } => Some(query),
            _ => None,
        }
    }

    fn attributes_mut(&mut self) -> Option<&mut Attributes> {
        match self {
            Operation::Create { attributes } | Operation::Update { attributes, .. } => {
                Some(attributes)
            },
            _ => None,
        }
    }
}

/// Description of one operation on an entity model
///
/// Unexecuted until passed to [`crate::Client::execute`]; once executed the
/// response is cached and builder calls no longer change anything.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    model: String,
    operation: Operation,
    outcome: Option<ApiResponse>,
}

impl Request {
    fn new(model: &str, operation: Operation) -> Self {
        Self {
            model: model.to_string(),
            operation,
            outcome: None,
        }
    }

    pub fn create(model: &str) -> Self {
        Self::new(
            model,
            Operation::Create {
                attributes: Attributes::new(),
            },
        )
    }

    pub fn update(model: &str) -> Self {
        Self::new(
            model,
            Operation::Update {
                object_id: None,
                attributes: Attributes::new(),
            },
        )
    }

    pub fn delete(model: &str) -> Self {
        Self::new(model, Operation::Delete { object_id: None })
    }

    pub fn read(model: &str, kind: ReadKind) -> Self {
        let operation = match kind {
            ReadKind::Single => Operation::ReadSingle { object_id: None },
            ReadKind::Multiple => Operation::ReadMultiple {
                query: Query::default(),
            },
            ReadKind::Relation { object_id, relation } => Operation::ReadRelation {
                object_id: Some(object_id),
                relation,
                query: Query::default(),
            },
            ReadKind::All => Operation::ReadAll {
                relation: None,
                query: Query::default(),
                skip_error_pages: false,
            },
        };
        Self::new(model, operation)
    }

    pub fn read_single(model: &str, object_id: &str) -> Self {
        Self::read(model, ReadKind::Single).object_id(object_id)
    }

    pub fn read_multiple(model: &str) -> Self {
        Self::read(model, ReadKind::Multiple)
    }

    pub fn read_relation(model: &str, object_id: &str, relation: &str) -> Self {
        Self::read(
            model,
            ReadKind::Relation {
                object_id: object_id.to_string(),
                relation: relation.to_string(),
            },
        )
    }

    pub fn read_all(model: &str) -> Self {
        Self::read(model, ReadKind::All)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn is_executed(&self) -> bool {
        self.outcome.is_some()
    }

    /// Cached response of the execution, if the request has run
    pub fn response(&self) -> Option<&ApiResponse> {
        self.outcome.as_ref()
    }

    /// Store the outcome of the first execution; later outcomes are ignored.
    pub(crate) fn record(&mut self, response: ApiResponse) {
        if self.outcome.is_none() {
            self.outcome = Some(response);
        }
    }

    fn edit(mut self, setting: &str, apply: impl FnOnce(&mut Operation) -> bool) -> Self {
        if self.is_executed() {
            tracing::warn!(
                "Ignoring {} on already executed {} request for {}",
                setting,
                self.operation.name(),
                self.model
            );
            return self;
        }
        if !apply(&mut self.operation) {
            tracing::debug!(
                "{} does not apply to {} requests",
                setting,
                self.operation.name()
            );
        }
        self
    }

    /// Object identifier for update, delete, single and relation reads
    pub fn object_id(self, object_id: &str) -> Self {
        self.edit("object_id", |operation| match operation {
            Operation::Update { object_id: id, .. }
            | Operation::Delete { object_id: id }
            | Operation::ReadSingle { object_id: id }
            | Operation::ReadRelation { object_id: id, .. } => {
                *id = Some(object_id.to_string());
                true
            },
            _ => false,
        })
    }

    /// Read a relation of one object instead of the model itself.
    /// Turns a multiple read into a relation read.
    pub fn relation(self, object_id: &str, relation: &str) -> Self {
        self.edit("relation", |operation| match operation {
            Operation::ReadMultiple { query } => {
                *operation = Operation::ReadRelation {
                    object_id: Some(object_id.to_string()),
                    relation: relation.to_string(),
                    query: std::mem::take(query),
                };
                true
            },
            Operation::ReadRelation {
                object_id: id,
                relation: name,
                ..
            } => {
                *id = Some(object_id.to_string());
                *name = relation.to_string();
                true
            },
            Operation::ReadAll { relation: target, .. } => {
                *target = Some(Relation {
                    object_id: object_id.to_string(),
                    name: relation.to_string(),
                });
                true
            },
            _ => false,
        })
    }

    pub fn attribute(self, key: &str, value: impl Into<AttributeValue>) -> Self {
        let value = value.into();
        self.edit("attribute", |operation| match operation.attributes_mut() {
            Some(attributes) => {
                attributes.insert(key, value);
                true
            },
            None => false,
        })
    }

    /// Add every entry of a JSON object as an attribute, tagged by value kind
    pub fn attributes(self, map: Map<String, Value>) -> Self {
        self.edit("attributes", |operation| match operation.attributes_mut() {
            Some(attributes) => {
                attributes.extend_from_json(map);
                true
            },
            None => false,
        })
    }

    pub fn filter(self, field: &str, operator: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.edit("filter", |operation| match operation.query_mut() {
            Some(query) => {
                query.filter.add_clause(field, operator, value);
                true
            },
            None => false,
        })
    }

    /// Merge a raw filter description (see [`FilterExpression::merge_from`])
    pub fn merge_filter(self, raw: &Value) -> Result<Self> {
        let mut outcome = Ok(());
        let request = self.edit("filter", |operation| match operation.query_mut() {
            Some(query) => {
                outcome = query.filter.merge_from(raw);
                true
            },
            None => false,
        });
        outcome.map(|_| request)
    }

    pub fn sort(self, field: &str, dir: SortDirection) -> Self {
        self.edit("sort", |operation| match operation.query_mut() {
            Some(query) => {
                query.sort.push(SortOrder {
                    field: field.to_string(),
                    dir,
                });
                true
            },
            None => false,
        })
    }

    pub fn skip(self, skip: u32) -> Self {
        self.edit("skip", |operation| match operation.query_mut() {
            Some(query) => {
                query.skip = skip;
                true
            },
            None => false,
        })
    }

    /// Page size; zero is rejected and keeps the previous value
    pub fn take(self, take: u32) -> Self {
        if take == 0 {
            tracing::warn!("Ignoring take of 0 for {}", self.model);
            return self;
        }
        self.edit("take", |operation| match operation.query_mut() {
            Some(query) => {
                query.take = take;
                true
            },
            None => false,
        })
    }

    /// Keep paging past pages that report errors (read-all only)
    pub fn skip_error_pages(self, skip: bool) -> Self {
        self.edit("skip_error_pages", |operation| match operation {
            Operation::ReadAll {
                skip_error_pages, ..
            } => {
                *skip_error_pages = skip;
                true
            },
            _ => false,
        })
    }
}
