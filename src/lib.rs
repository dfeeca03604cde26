// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
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

//! # Registry Synth
//!
//! Declarative synthesis of registry API server deployments.
//!
//! ## Overview
//!
//! Given a `Registry` manifest, registry-synth produces everything the
//! registry API server needs to run:
//!
//! - A canonical server configuration document with a content checksum
//! - A Pod template for the server, merged with any user override
//! - A persisted configuration artifact, written only when it changed
//!
//! ## Architecture
//!
//! The pipeline runs in three stages:
//!
//! 1. **Resolve**: the manifest is validated and turned into a [`config::Config`]
//! 2. **Synthesize**: default Pod options are folded into a template and merged
//!    with the user's template by key
//! 3. **Persist**: the configuration is upserted with optimistic concurrency,
//!    retrying the whole read-compare-write cycle on conflict
//!
//! ## Modules
//!
//! - [`config`]: Manifest parsing, resolution and checksums
//! - [`pod`]: Pod template types, builder options and keyed merge
//! - [`persist`]: Artifact stores (memory, local, S3) and the upsert protocol
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! apiVersion: registry.dev/v1alpha1
//! kind: Registry
//! metadata:
//!   name: my-registry
//!   namespace: tools
//! spec:
//!   registries:
//!     - name: primary
//!       configMapRef:
//!         name: primary-registry
//!         key: registry.json
//!       syncPolicy:
//!         interval: 5m
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod persist;
pub mod pod;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{Config, ConfigHasher, ConfigResolver, RegistryManifest, SpecParser};
pub use error::{Result, SynthError};
pub use persist::{ArtifactStore, ConfigPersister, UpsertOutcome};
pub use pod::{PodTemplateBuilder, PodTemplateSpec, synthesize_pod_template};
