//! # capsule-core -- Foundational Types for Capsule Manifests
//!
//! Defines the data model shared by every part of the capsule stack: the
//! manifest document that groups a capsule's files, the file references that
//! link logical paths to content ids, and the helpers that keep historical
//! manifest shapes readable.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** A `ContentId` is validated at
//!    construction. No bare strings for content addresses.
//!
//! 2. **One resolver for every descriptor shape.** File descriptors evolved
//!    through several incompatible shapes. They are modelled as a tagged
//!    [`Descriptor`] and resolved by a single recursive function that never
//!    fails.
//!
//! 3. **Manifests are immutable values.** Every change produces a new manifest
//!    with a back-link to the one it was derived from.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `capsule-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod cid;
pub mod error;
pub mod manifest;
pub mod path;
pub mod reference;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use cid::{looks_like_cid, ContentId};
pub use error::CoreError;
pub use manifest::{FileEntry, FileReference, Manifest};
pub use path::FileCategory;
pub use reference::{resolve, resolve_value, Descriptor, ResolvedReference};
pub use temporal::Timestamp;
