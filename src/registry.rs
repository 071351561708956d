//! Instance Registry
//!
//! Hands out one shared client/transport pair per instance and access token.
//! The registry is owned by the caller; entries live as long as the registry.

use crate::api::client::Client;
use crate::api::http::{normalize_url, ClientConfig, HttpTransport};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Registry key: normalized instance URL and access token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct InstanceKey {
    instance: String,
    access_token: String,
}

impl InstanceKey {
    fn new(instance: &str, access_token: &str) -> Self {
        Self {
            instance: normalize_url(instance),
            access_token: access_token.to_string(),
        }
    }
}

/// Shared client and the transport it dispatches through
#[derive(Clone)]
pub struct Instance {
    pub client: Arc<Client>,
    pub transport: Arc<HttpTransport>,
}

/// Cache of clients keyed by (instance, access token)
#[derive(Default)]
pub struct InstanceRegistry {
    config: ClientConfig,
    entries: Mutex<HashMap<InstanceKey, Instance>>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose transports all use the given connection settings
    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the pair for this instance and token, creating it on first use.
    ///
    /// Population happens under the registry lock, so concurrent callers
    /// for the same key all receive the same pair.
    pub fn get_or_create(&self, instance: &str, access_token: &str) -> Result<Instance> {
        let key = InstanceKey::new(instance, access_token);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = entries.get(&key) {
            return Ok(existing.clone());
        }

        tracing::info!("Creating client for {}", key.instance);
        let transport = Arc::new(HttpTransport::with_config(
            &key.instance,
            access_token,
            &self.config,
        )?);
        let entry = Instance {
            client: Arc::new(Client::new(Arc::clone(&transport))),
            transport,
        };
        entries.insert(key, entry.clone());
        Ok(entry)
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
