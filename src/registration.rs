//! Service registration storage for the built-in backend.

use std::collections::HashMap;

use once_cell::sync::OnceCell;

use crate::descriptors::{AnyArc, Ctor, ServiceDescriptor};
use crate::key::Key;
use crate::lifetime::Lifetime;

/// Service registration with lifetime, constructor and runtime cache slots
pub(crate) struct Registration {
    /// Position in registration order, unique within the registry
    pub(crate) id: usize,
    pub(crate) lifetime: Lifetime,
    pub(crate) ctor: Ctor,
    /// Singleton cache, initialized at most once
    pub(crate) singleton: Option<OnceCell<AnyArc>>,
    /// Index into each scope's slot table
    pub(crate) scoped_slot: Option<usize>,
}

impl Registration {
    fn new(id: usize, descriptor: &ServiceDescriptor) -> Self {
        let singleton = match descriptor.lifetime() {
            Lifetime::Singleton => Some(OnceCell::new()),
            _ => None,
        };
        Self {
            id,
            lifetime: descriptor.lifetime(),
            ctor: descriptor.implementation().ctor(),
            singleton,
            scoped_slot: None,
        }
    }
}

/// Service registry holding all registrations, in registration order per key
#[derive(Default)]
pub(crate) struct Registry {
    entries: HashMap<Key, Vec<Registration>>,
    /// Total count of scoped registrations for slot allocation
    pub(crate) scoped_count: usize,
}

impl Registry {
    /// Builds the runtime registry from recorded descriptors, assigning one
    /// scoped slot per Scoped registration.
    pub(crate) fn finalize(descriptors: &[ServiceDescriptor]) -> Self {
        let mut registry = Registry::default();
        for (id, descriptor) in descriptors.iter().enumerate() {
            let mut registration = Registration::new(id, descriptor);
            if registration.lifetime == Lifetime::Scoped {
                registration.scoped_slot = Some(registry.scoped_count);
                registry.scoped_count += 1;
            }
            registry.entries.entry(*descriptor.key()).or_default().push(registration);
        }
        registry
    }

    /// Last registration wins.
    #[inline(always)]
    pub(crate) fn get(&self, key: &Key) -> Option<&Registration> {
        self.entries.get(key).and_then(|regs| regs.last())
    }

    pub(crate) fn get_all(&self, key: &Key) -> &[Registration] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&Key, &Registration)> {
        self.entries
            .iter()
            .flat_map(|(key, regs)| regs.iter().map(move |reg| (key, reg)))
    }
}
