//! Configuration module for whaleprint.
//!
//! This module handles all configuration-related functionality:
//! - Locating and deserializing `.dab` bundle files
//! - Validation of bundle contents
//! - Control-plane settings from the environment
//! - Hashing canonical specs for change detection

mod hash;
mod parser;
mod settings;
mod spec;
mod validator;

pub use hash::SpecHasher;
pub use parser::{BUNDLE_EXTENSION, BundleLocation, BundleParser, find_bundle_file};
pub use settings::{DEFAULT_API_VERSION, DEFAULT_DOCKER_HOST, DEFAULT_TIMEOUT_SECS, Settings};
pub use spec::{BUNDLE_VERSION, BundlePort, BundleService, Bundlefile, Stack};
pub use validator::{BundleValidator, ValidationError, ValidationResult};
