use crate::connection::{FeedClient, DEFAULT_ENTITY_TIMEOUT};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;


/// Registry lookup errors
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryError {
    /// Lookup without an endpoint before any instance exists; programmer
    /// misuse, surfaced loudly
    NotInitialized,
    /// Lookup without an endpoint while several instances are registered;
    /// the caller must name one explicitly
    AmbiguousDefault(usize),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::NotInitialized => {
                write!(f, "no feed client registered; provide an endpoint")
            }
            RegistryError::AmbiguousDefault(count) => {
                write!(
                    f,
                    "{} feed clients registered; endpoint required to pick one",
                    count
                )
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Registry of independently connected feed clients.
///
/// Instances are keyed by a monotonically increasing counter, so lookups
/// and test assertions are reproducible. The registry shares clients by
/// `Arc`; each client's internal state stays its own.
pub struct FeedRegistry {
    instances: Mutex<HashMap<u64, Arc<FeedClient>>>,
    next_key: AtomicU64,
}

impl FeedRegistry {
    pub fn new() -> Self {
        Self {
            instances: Mutex::new(HashMap::new()),
            next_key: AtomicU64::new(0),
        }
    }

    /// Return the client bound to `endpoint`, constructing and registering
    /// one when none exists or `force_new` is set.
    ///
    /// Without an endpoint the sole registered instance is returned; an
    /// empty registry is `NotInitialized` and a populated one with several
    /// instances is `AmbiguousDefault`.
    pub fn get_or_create(
        &self,
        endpoint: Option<&str>,
        entity_timeout: Option<Duration>,
        force_new: bool,
    ) -> Result<Arc<FeedClient>, RegistryError> {
        let mut instances = self.instances.lock();

        let Some(endpoint) = endpoint else {
            let mut values = instances.values();
            return match (values.next(), values.next()) {
                (None, _) => Err(RegistryError::NotInitialized),
                (Some(only), None) => Ok(Arc::clone(only)),
                (Some(_), Some(_)) => Err(RegistryError::AmbiguousDefault(instances.len())),
            };
        };

        if !force_new {
            if let Some(existing) = instances.values().find(|c| c.endpoint() == endpoint) {
                return Ok(Arc::clone(existing));
            }
        }

        let client = FeedClient::new(
            endpoint,
            entity_timeout.unwrap_or(DEFAULT_ENTITY_TIMEOUT),
        );
        let key = self.next_key.fetch_add(1, Ordering::Relaxed);
        instances.insert(key, Arc::clone(&client));
        info!(endpoint, key, "Feed client registered");
        Ok(client)
    }

    /// Disconnect and deregister one instance, or every instance when
    /// `None`.
    pub fn reset(&self, instance: Option<&Arc<FeedClient>>) {
        let mut instances = self.instances.lock();
        match instance {
            Some(target) => {
                instances.retain(|_, client| {
                    if Arc::ptr_eq(client, target) {
                        client.disconnect();
                        false
                    } else {
                        true
                    }
                });
            }
            None => {
                for client in instances.values() {
                    client.disconnect();
                }
                instances.clear();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.instances.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.lock().is_empty()
    }
}

impl Default for FeedRegistry {
    fn default() -> Self {
        Self::new()
    }
}
