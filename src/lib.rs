// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Whaleprint
//!
//! Plan and apply Docker stack bundles against a swarm, with field-level diffs.
//!
//! ## Overview
//!
//! Whaleprint brings a plan/apply workflow to Docker swarm stacks:
//!
//! - Declare a stack's services in a bundle (`.dab`) file
//! - See exactly which service properties would change before touching the swarm
//! - Apply the plan, creating, updating and removing services as needed
//! - Export running stacks back into bundle files
//!
//! ## Architecture
//!
//! Every run is one reconciliation cycle:
//!
//! 1. **Desired state**: the bundle, translated into swarm service specs
//! 2. **Observed state**: the stack's services as reported by the Engine API
//! 3. **Plan**: both sides are normalised into canonical trees, compared leaf
//!    by leaf and sorted into create, update, delete and unchanged actions
//! 4. **Apply**: the executor runs the plan through a [`planner::Backend`]
//!
//! ## Modules
//!
//! - [`canonical`]: Canonical specification trees
//! - [`config`]: Bundle parsing, validation, hashing and settings
//! - [`translate`]: Bundle to swarm translation and export
//! - [`swarm`]: Docker Engine API client and backend
//! - [`planner`]: Diff engine, planner and executor
//! - [`reconciler`]: One reconciliation cycle for a stack
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```json
//! {
//!   "Version": "0.1",
//!   "Services": {
//!     "web": {
//!       "Image": "nginx:1.11",
//!       "Networks": ["front"],
//!       "Ports": [{ "Protocol": "tcp", "Port": 80 }]
//!     }
//!   }
//! }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod canonical;
pub mod cli;
pub mod config;
pub mod error;
pub mod planner;
pub mod reconciler;
pub mod swarm;
pub mod translate;

// ============================================================================
// Re-exports
// ============================================================================

pub use canonical::{CanonicalValue, Entity, EntitySet, ToCanonical};
pub use cli::{Cli, Commands, OutputFormatter, RenderConfig};
pub use config::{BundleParser, BundleValidator, Bundlefile, Settings, SpecHasher, Stack};
pub use error::{Result, WhaleprintError};
pub use planner::{Backend, DiffEngine, Executor, Planner, ReconciliationPlan};
pub use reconciler::Reconciler;
pub use swarm::{SwarmBackend, SwarmClient};
pub use translate::StackTranslator;
