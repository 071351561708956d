//! Daktela V6 API interaction module
//!
//! This module performs the HTTP side of the connector: sending one request,
//! interpreting the response envelope and dispatching request descriptions.
//!
//! # Module Structure
//!
//! - [`client`] - Request dispatcher with read-all pagination
//! - [`http`] - Transport trait and the blocking reqwest transport
//! - [`response`] - Uniform response value
//!
//! # Example
//!
//! ```ignore
//! use daktela_v6::{Client, Request};
//!
//! fn example() -> anyhow::Result<()> {
//!     let client = Client::connect("my.daktela.com", "access-token")?;
//!     let response = client.execute(&mut Request::read_single("Users", "john"));
//!     println!("{:?}", response.data());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod http;
pub mod response;
