//! Spec hashing for change detection.
//!
//! Fingerprints are computed over the public part of canonical trees. They
//! change whenever a public value changes; internal fields never move them.
//! Presence is hashed too, so an absent optional and a present zero value
//! fingerprint differently even though the diff engine reports no change.

use sha2::{Digest, Sha256};

use crate::canonical::{CanonicalValue, EntitySet, ScalarKind};

/// Hasher for canonical specs and entity sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecHasher;

impl SpecHasher {
    /// Creates a new spec hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the hash of a single canonical tree.
    #[must_use]
    pub fn hash_value(&self, value: &CanonicalValue) -> String {
        let mut hasher = Sha256::new();
        Self::feed(&mut hasher, value);
        hex::encode(hasher.finalize())
    }

    /// Computes the hash of an entity set (names and specs, in name order).
    #[must_use]
    pub fn hash_set(&self, set: &EntitySet) -> String {
        let mut hasher = Sha256::new();
        for entity in set.iter() {
            hasher.update(entity.name.as_bytes());
            hasher.update([0u8]);
            Self::feed(&mut hasher, &entity.spec);
        }
        hex::encode(hasher.finalize())
    }

    /// Feeds a tree into the hasher with a tag byte per node.
    fn feed(hasher: &mut Sha256, value: &CanonicalValue) {
        match value {
            CanonicalValue::Scalar { kind, text } => {
                let tag = match kind {
                    ScalarKind::Text => b's',
                    ScalarKind::Integer => b'i',
                    ScalarKind::Boolean => b'b',
                };
                hasher.update([tag]);
                hasher.update((text.len() as u64).to_be_bytes());
                hasher.update(text.as_bytes());
            }
            CanonicalValue::Sequence(items) => {
                hasher.update([b'[']);
                hasher.update((items.len() as u64).to_be_bytes());
                for item in items {
                    Self::feed(hasher, item);
                }
            }
            CanonicalValue::Mapping(entries) => {
                hasher.update([b'{']);
                hasher.update((entries.len() as u64).to_be_bytes());
                for (key, item) in entries {
                    hasher.update((key.len() as u64).to_be_bytes());
                    hasher.update(key.as_bytes());
                    Self::feed(hasher, item);
                }
            }
            CanonicalValue::Optional(inner) => match inner {
                Some(item) => {
                    hasher.update([b'?', 1]);
                    Self::feed(hasher, item);
                }
                None => hasher.update([b'?', 0]),
            },
            CanonicalValue::Record(fields) => {
                hasher.update([b'(']);
                for field in fields.iter().filter(|f| f.is_public()) {
                    hasher.update(field.label.as_bytes());
                    hasher.update([b'=']);
                    Self::feed(hasher, &field.value);
                }
                hasher.update([b')']);
            }
        }
    }
}
