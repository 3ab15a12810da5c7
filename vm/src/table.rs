//! Host helper tables
//!
//! A `HelperTable` maps helper identifiers to host routines. It is built at
//! host start-up and only read while invocations run. Hosts that need to
//! change bindings while invocations may be in flight go through
//! `SharedHelperTable`, which swaps whole snapshots.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::error::{RegistryError, RuntimeError};
use crate::helper::HelperObj;
use crate::program::Signature;
use crate::specs::HELPER_UNSPEC;
use crate::stdlib;

#[derive(Debug, Clone, Default)]
pub struct HelperTable {
    helpers: BTreeMap<u32, HelperObj>,
}

/// Trait for helper registration
pub trait HelperRegistry {
    fn define_helper<F>(
        &mut self,
        id: u32,
        name: &str,
        signature: Signature,
        func: F,
    ) -> Result<Option<HelperObj>, RegistryError>
    where
        F: Fn(&[u64]) -> Result<u64, RuntimeError> + Send + Sync + 'static;

    fn bootstrap_helpers(&mut self);
}

impl HelperTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table preloaded with the catalog routines that own a well-known id.
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        table.bootstrap_helpers();
        table
    }

    /// Bind `id` to a helper. Replacing an existing binding returns it.
    pub fn register(&mut self, id: u32, helper: HelperObj) -> Result<Option<HelperObj>, RegistryError> {
        if id == HELPER_UNSPEC {
            return Err(RegistryError::Reserved(id));
        }
        Ok(self.insert(id, helper))
    }

    fn insert(&mut self, id: u32, helper: HelperObj) -> Option<HelperObj> {
        debug!(id, name = %helper.name, signature = %helper.signature, "helper registered");
        self.helpers.insert(id, helper)
    }

    /// Bind `id` to a named routine from the host catalog.
    pub fn register_routine(&mut self, id: u32, routine: &str) -> Result<Option<HelperObj>, RegistryError> {
        let helper = stdlib::routine(routine)
            .ok_or_else(|| RegistryError::UnknownRoutine(routine.to_string()))?;
        self.register(id, helper)
    }

    pub fn remove(&mut self, id: u32) -> Option<HelperObj> {
        self.helpers.remove(&id)
    }

    pub fn get(&self, id: u32) -> Option<&HelperObj> {
        self.helpers.get(&id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.helpers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.helpers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.helpers.is_empty()
    }

    /// Entries in identifier order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &HelperObj)> {
        self.helpers.iter().map(|(id, h)| (*id, h))
    }
}

impl HelperRegistry for HelperTable {
    fn define_helper<F>(
        &mut self,
        id: u32,
        name: &str,
        signature: Signature,
        func: F,
    ) -> Result<Option<HelperObj>, RegistryError>
    where
        F: Fn(&[u64]) -> Result<u64, RuntimeError> + Send + Sync + 'static,
    {
        self.register(id, HelperObj::new(name, signature, func))
    }

    fn bootstrap_helpers(&mut self) {
        for (id, helper) in stdlib::well_known_routines() {
            debug_assert_ne!(id, HELPER_UNSPEC, "catalog routine on the reserved id");
            self.insert(id, helper);
        }
    }
}

/// Helper table that can be updated while invocations are in flight.
///
/// Readers take an `Arc` snapshot and keep it for the whole invocation;
/// writers clone the current table, mutate the clone and swap it in, so no
/// reader ever sees a partially updated mapping.
#[derive(Debug, Default)]
pub struct SharedHelperTable {
    current: RwLock<Arc<HelperTable>>,
}

impl SharedHelperTable {
    pub fn new(table: HelperTable) -> Self {
        Self {
            current: RwLock::new(Arc::new(table)),
        }
    }

    pub fn snapshot(&self) -> Arc<HelperTable> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Apply `f` to a copy of the current table and publish the result.
    /// Nothing is published when `f` fails.
    pub fn update<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut HelperTable) -> Result<T, E>,
    {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut next = HelperTable::clone(&guard);
        let out = f(&mut next)?;
        *guard = Arc::new(next);
        Ok(out)
    }
}
