//! Daktela V6 Client
//!
//! Dispatches [`Request`] values to the transport and pages through
//! collections for read-all requests.

use super::http::{ClientConfig, HttpTransport, Transport};
use super::response::{ApiResponse, NO_TOTAL};
use crate::request::{Operation, Query, Relation, Request};
use anyhow::Result;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;

/// Maximum number of pages fetched by a read-all request
pub const READ_LIMIT: u32 = 999;

pub const NO_MODEL: &str = "No model specified";
pub const NO_OBJECT_NAME: &str = "No object name specified";
pub const NO_RELATION_NAME: &str = "No relation name specified";

/// Request dispatcher over a shared transport
pub struct Client<T: Transport = HttpTransport> {
    transport: Arc<T>,
}

impl<T: Transport> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl Client<HttpTransport> {
    /// Create a client for an instance with default connection settings
    pub fn connect(instance: &str, access_token: &str) -> Result<Self> {
        Ok(Self::new(Arc::new(HttpTransport::new(instance, access_token)?)))
    }

    pub fn connect_with_config(
        instance: &str,
        access_token: &str,
        config: &ClientConfig,
    ) -> Result<Self> {
        let transport = HttpTransport::with_config(instance, access_token, config)?;
        Ok(Self::new(Arc::new(transport)))
    }
}

impl<T: Transport> Client<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Execute a request once.
    ///
    /// The first call performs the HTTP call(s) and caches the response on the
    /// request; later calls return the cached response without any I/O.
    pub fn execute(&self, request: &mut Request) -> ApiResponse {
        if let Some(response) = request.response() {
            tracing::debug!("{} {} already executed", request.operation().name(), request.model());
            return response.clone();
        }

        let response = self.dispatch(request);
        request.record(response.clone());
        response
    }

    fn dispatch(&self, request: &Request) -> ApiResponse {
        let model = request.model();
        if model.is_empty() {
            return ApiResponse::local_error(0, NO_MODEL);
        }

        match request.operation() {
            Operation::Create { attributes } => {
                self.transport
                    .send(Method::POST, model, Vec::new(), Some(attributes.to_value()))
            },
            Operation::Update {
                object_id,
                attributes,
            } => match object_path(model, object_id.as_deref()) {
                Some(endpoint) => self.transport.send(
                    Method::PUT,
                    &endpoint,
                    Vec::new(),
                    Some(attributes.to_value()),
                ),
                None => ApiResponse::local_error(NO_TOTAL, NO_OBJECT_NAME),
            },
            Operation::Delete { object_id } => match object_path(model, object_id.as_deref()) {
                Some(endpoint) => self.transport.send(Method::DELETE, &endpoint, Vec::new(), None),
                None => ApiResponse::local_error(NO_TOTAL, NO_OBJECT_NAME),
            },
            Operation::ReadSingle { object_id } => {
                match object_path(model, object_id.as_deref()) {
                    Some(endpoint) => self.transport.send(Method::GET, &endpoint, Vec::new(), None),
                    None => ApiResponse::local_error(NO_TOTAL, NO_OBJECT_NAME),
                }
            },
            Operation::ReadMultiple { query } => self.transport.send(
                Method::GET,
                model,
                query.params(u64::from(query.skip)),
                None,
            ),
            Operation::ReadRelation {
                object_id,
                relation,
                query,
            } => match relation_path(model, object_id.as_deref(), relation) {
                Ok(endpoint) => self.transport.send(
                    Method::GET,
                    &endpoint,
                    query.params(u64::from(query.skip)),
                    None,
                ),
                Err(message) => ApiResponse::local_error(NO_TOTAL, message),
            },
            Operation::ReadAll {
                relation,
                query,
                skip_error_pages,
            } => {
                let endpoint = match relation {
                    Some(Relation { object_id, name }) => {
                        match relation_path(model, Some(object_id.as_str()), name) {
                            Ok(endpoint) => endpoint,
                            Err(message) => return ApiResponse::local_error(NO_TOTAL, message),
                        }
                    },
                    None => model.to_string(),
                };
                self.read_all(&endpoint, query, *skip_error_pages)
            },
        }
    }

    /// Fetch pages sequentially until a short page or [`READ_LIMIT`].
    ///
    /// Without `skip_error_pages` the first page with errors or a
    /// non-collection payload is returned as-is and earlier pages are
    /// discarded. With it, such a page ends the loop and the pages gathered
    /// so far are returned.
    fn read_all(&self, endpoint: &str, query: &Query, skip_error_pages: bool) -> ApiResponse {
        let take = u64::from(query.take);
        let mut items: Vec<Value> = Vec::new();
        let mut last_page: Option<ApiResponse> = None;

        for page in 0..u64::from(READ_LIMIT) {
            let current = self
                .transport
                .send(Method::GET, endpoint, query.params(page * take), None);

            if !current.errors().is_empty() {
                if !skip_error_pages {
                    return current;
                }
                tracing::warn!("Stopping read-all of {} at page {} after errors", endpoint, page);
                break;
            }

            let Some(page_items) = current.items() else {
                if !skip_error_pages {
                    return current;
                }
                tracing::warn!(
                    "Stopping read-all of {} at page {}: payload is not a collection",
                    endpoint,
                    page
                );
                break;
            };

            let page_len = page_items.len() as u64;
            items.extend(page_items.iter().cloned());
            tracing::debug!("read-all {} page {}: {} items", endpoint, page, page_len);
            last_page = Some(current);

            if page_len < take {
                break;
            }
        }

        match last_page {
            Some(last) => ApiResponse::new(
                Some(Value::Array(items)),
                last.total(),
                last.errors().to_vec(),
                last.http_status(),
            ),
            None => ApiResponse::new(Some(Value::Array(items)), 0, Vec::new(), 0),
        }
    }
}

/// `model/object_id`, or `None` when the identifier is missing or empty.
/// The identifier is percent-encoded as a single path segment.
fn object_path(model: &str, object_id: Option<&str>) -> Option<String> {
    object_id
        .filter(|id| !id.is_empty())
        .map(|id| format!("{}/{}", model, urlencoding::encode(id)))
}

/// `model/object_id/relation`, or the local error message for a missing part
fn relation_path(
    model: &str,
    object_id: Option<&str>,
    relation: &str,
) -> std::result::Result<String, &'static str> {
    let endpoint = object_path(model, object_id).ok_or(NO_OBJECT_NAME)?;
    if relation.is_empty() {
        return Err(NO_RELATION_NAME);
    }
    Ok(format!("{}/{}", endpoint, urlencoding::encode(relation)))
}
