//! Reference-counted registry of live handles.
//!
//! Handles are keyed by UUID. Lookups and creations acquire a reference;
//! undefine and explicit release drop one. An entry disappears when its last
//! reference is released.

use std::collections::HashMap;

use qemud_protocol::Uuid;
use thiserror::Error;

/// Errors raised by [`ObjectRegistry`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{kind} {uuid} is registered as '{existing}', not '{requested}'")]
    NameConflict {
        kind: &'static str,
        uuid: Uuid,
        existing: String,
        requested: String,
    },
    #[error("{kind} {uuid} is not registered")]
    Unknown { kind: &'static str, uuid: Uuid },
}

#[derive(Debug)]
struct Entry {
    name: String,
    references: usize,
}

/// Tracks handles of one kind (domains or networks).
#[derive(Debug)]
pub struct ObjectRegistry {
    kind: &'static str,
    entries: HashMap<Uuid, Entry>,
}

impl ObjectRegistry {
    /// Creates an empty registry for objects described as `kind`.
    #[must_use]
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: HashMap::new(),
        }
    }

    /// Takes a reference on `uuid`, registering it under `name` if new.
    pub fn acquire(&mut self, uuid: Uuid, name: &str) -> Result<usize, RegistryError> {
        let entry = self.entries.entry(uuid).or_insert_with(|| Entry {
            name: name.to_owned(),
            references: 0,
        });
        if entry.name != name {
            return Err(RegistryError::NameConflict {
                kind: self.kind,
                uuid,
                existing: entry.name.clone(),
                requested: name.to_owned(),
            });
        }
        entry.references += 1;
        Ok(entry.references)
    }

    /// Drops one reference; returns how many remain.
    pub fn release(&mut self, uuid: Uuid) -> Result<usize, RegistryError> {
        let entry = self.entries.get_mut(&uuid).ok_or(RegistryError::Unknown {
            kind: self.kind,
            uuid,
        })?;
        entry.references = entry.references.saturating_sub(1);
        let remaining = entry.references;
        if remaining == 0 {
            self.entries.remove(&uuid);
        }
        Ok(remaining)
    }

    /// Live references held on `uuid`.
    #[must_use]
    pub fn references(&self, uuid: Uuid) -> usize {
        self.entries.get(&uuid).map_or(0, |entry| entry.references)
    }

    /// Whether `uuid` has a live entry.
    #[must_use]
    pub fn contains(&self, uuid: Uuid) -> bool {
        self.entries.contains_key(&uuid)
    }

    /// Number of distinct registered objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no object is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    const GUEST: Uuid = Uuid::from_bytes([7; 16]);

    #[fixture]
    fn registry() -> ObjectRegistry {
        ObjectRegistry::new("domain")
    }

    #[rstest]
    fn counts_references_until_last_release(mut registry: ObjectRegistry) {
        assert_eq!(registry.acquire(GUEST, "guest"), Ok(1));
        assert_eq!(registry.acquire(GUEST, "guest"), Ok(2));
        assert_eq!(registry.release(GUEST), Ok(1));
        assert!(registry.contains(GUEST));
        assert_eq!(registry.release(GUEST), Ok(0));
        assert!(registry.is_empty());
    }

    #[rstest]
    fn rejects_renamed_uuid(mut registry: ObjectRegistry) {
        registry.acquire(GUEST, "guest").expect("first acquire");
        assert!(matches!(
            registry.acquire(GUEST, "impostor"),
            Err(RegistryError::NameConflict { .. })
        ));
        assert_eq!(registry.references(GUEST), 1);
    }

    #[rstest]
    fn releasing_unknown_handle_fails(mut registry: ObjectRegistry) {
        assert_eq!(
            registry.release(GUEST),
            Err(RegistryError::Unknown {
                kind: "domain",
                uuid: GUEST
            })
        );
    }
}
