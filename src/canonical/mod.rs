//! Canonical specification trees.
//!
//! Every service specification is normalised into a [`CanonicalValue`]
//! before it reaches the planner, so that desired and observed state can be
//! compared without knowing anything about the control plane's types.

mod entity;
mod path;
mod value;

pub use entity::{Entity, EntitySet, RemoteVersion};
pub use path::{PathSegment, SpecPath};
pub use value::{CanonicalValue, Field, ScalarKind, ToCanonical, Visibility};
