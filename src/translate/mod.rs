//! Translation between bundles, swarm specs and canonical trees.

mod canonical;
mod export;
mod stack;

pub use export::{DEFAULT_EXPORT_STACK, bundle_service, export_bundles, write_bundles};
pub use stack::{StackTranslator, TranslatedStack};
