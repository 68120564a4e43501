//! Named entities and the sets the planner compares.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::value::CanonicalValue;

/// Opaque optimistic-concurrency token read from the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteVersion(String);

impl RemoteVersion {
    /// Wraps a token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RemoteVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One deployable unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    /// Fully-qualified name, unique within a scope.
    pub name: String,
    /// Canonical specification.
    pub spec: CanonicalValue,
    /// Control-plane id (observed entities only).
    pub remote_id: Option<String>,
    /// Version token (observed entities only).
    pub remote_version: Option<RemoteVersion>,
}

impl Entity {
    /// A desired entity.
    #[must_use]
    pub fn new(name: impl Into<String>, spec: CanonicalValue) -> Self {
        Self {
            name: name.into(),
            spec,
            remote_id: None,
            remote_version: None,
        }
    }

    /// An observed entity carrying its remote identity.
    #[must_use]
    pub fn observed(
        name: impl Into<String>,
        spec: CanonicalValue,
        remote_id: impl Into<String>,
        remote_version: RemoteVersion,
    ) -> Self {
        Self {
            name: name.into(),
            spec,
            remote_id: Some(remote_id.into()),
            remote_version: Some(remote_version),
        }
    }
}

/// Entities keyed by name, iterated in lexicographic order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntitySet {
    entities: BTreeMap<String, Entity>,
}

impl EntitySet {
    /// An empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
        }
    }

    /// Inserts an entity, returning the one it replaced.
    pub fn insert(&mut self, entity: Entity) -> Option<Entity> {
        self.entities.insert(entity.name.clone(), entity)
    }

    /// Looks up an entity by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Entity> {
        self.entities.get(name)
    }

    /// Returns true if the name is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Names in lexicographic order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }
}

impl FromIterator<Entity> for EntitySet {
    fn from_iter<I: IntoIterator<Item = Entity>>(iter: I) -> Self {
        let mut set = Self::new();
        for entity in iter {
            set.insert(entity);
        }
        set
    }
}

impl IntoIterator for EntitySet {
    type Item = Entity;
    type IntoIter = std::collections::btree_map::IntoValues<String, Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.into_values()
    }
}
