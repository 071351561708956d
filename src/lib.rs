//! Typed client for the Daktela V6 REST API.
//!
//! Callers describe an operation as a [`Request`], hand it to
//! [`Client::execute`] and receive an [`ApiResponse`]. Transport failures,
//! malformed responses and remote errors are all reported through the
//! response rather than raised.
//!
//! - [`request`] - Request descriptions, filters and attributes
//! - [`api`] - Transport, response envelope and dispatcher
//! - [`registry`] - Shared client per instance and access token
//! - [`format`] - Phone number normalization
//! - [`config`] - Persistent connection settings

pub mod api;
pub mod config;
pub mod format;
pub mod registry;
pub mod request;

pub use api::client::{Client, READ_LIMIT};
pub use api::http::{ClientConfig, HttpTransport, QueryParams, Transport};
pub use api::response::{ApiResponse, NO_TOTAL};
pub use registry::{Instance, InstanceRegistry};
pub use request::{
    AttributeValue, Attributes, FilterClause, FilterExpression, FilterNode, Logic, Operation,
    Query, ReadKind, Relation, Request, SortDirection, SortOrder,
};
