//! Courier registry
//!
//! Maps a caller-chosen reference to a courier. Registration is idempotent:
//! the first courier registered under a reference wins and later attempts are
//! ignored.

use crate::clock::Clock;
use crate::config::CourierConfig;
use crate::courier::Courier;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Couriers keyed by reference
///
/// Iteration is ordered by reference so batch close visits couriers in a
/// stable order.
#[derive(Debug, Clone, Default)]
pub struct CourierRegistry {
    couriers: BTreeMap<String, Arc<Courier>>,
}

impl CourierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from configured couriers
    ///
    /// Duplicate references keep the first entry.
    pub fn from_config(couriers: &[CourierConfig], clock: Arc<dyn Clock>) -> Self {
        let mut registry = Self::new();
        for config in couriers {
            let courier = Courier::from_config(config, clock.clone());
            if !registry.register(config.reference(), courier) {
                warn!(reference = config.reference(), "Duplicate courier reference in config, keeping the first");
            }
        }
        registry
    }

    /// Insert `courier` under `reference` unless the reference is taken
    ///
    /// # Returns
    /// `true` if the courier was inserted, `false` if the reference already existed
    pub fn register(&mut self, reference: impl Into<String>, courier: Courier) -> bool {
        let reference = reference.into();
        if self.couriers.contains_key(&reference) {
            debug!(reference = %reference, "Courier already registered, ignoring");
            return false;
        }
        debug!(reference = %reference, courier = courier.name(), "Courier registered");
        self.couriers.insert(reference, Arc::new(courier));
        true
    }

    /// Remove the courier under `reference`; absent references are ignored
    pub fn remove(&mut self, reference: &str) -> Option<Arc<Courier>> {
        self.couriers.remove(reference)
    }

    pub fn lookup(&self, reference: &str) -> Option<&Arc<Courier>> {
        self.couriers.get(reference)
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.couriers.contains_key(reference)
    }

    /// All couriers, ordered by reference
    pub fn all(&self) -> &BTreeMap<String, Arc<Courier>> {
        &self.couriers
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Courier>)> {
        self.couriers.iter().map(|(reference, courier)| (reference.as_str(), courier))
    }

    pub fn len(&self) -> usize {
        self.couriers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.couriers.is_empty()
    }
}
