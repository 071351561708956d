//! Uniform outcome of one logical API operation

use serde::Serialize;
use serde_json::Value;

/// `total` value meaning the remote service returned no authoritative count
pub const NO_TOTAL: i64 = -1;

/// Immutable result of a request
///
/// Every failure mode (local validation, transport, malformed envelope,
/// remote-reported error) is represented here; nothing is raised.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    data: Option<Value>,
    total: i64,
    errors: Vec<String>,
    http_status: u16,
}

impl ApiResponse {
    pub fn new(data: Option<Value>, total: i64, errors: Vec<String>, http_status: u16) -> Self {
        Self {
            data,
            total,
            errors,
            http_status,
        }
    }

    /// Failure detected before anything was sent
    pub fn local_error(total: i64, message: &str) -> Self {
        Self::new(None, total, vec![message.to_string()], 0)
    }

    /// Transport or parse failure; `http_status` is the last status seen, or 0
    pub fn failure(http_status: u16, message: String) -> Self {
        Self::new(None, NO_TOTAL, vec![message], http_status)
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Option<Value> {
        self.data
    }

    /// Data as a list of records, when the payload is a collection
    pub fn items(&self) -> Option<&[Value]> {
        self.data.as_ref()?.as_array().map(Vec::as_slice)
    }

    pub fn total(&self) -> i64 {
        self.total
    }

    pub fn has_total(&self) -> bool {
        self.total != NO_TOTAL
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn http_status(&self) -> u16 {
        self.http_status
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}
