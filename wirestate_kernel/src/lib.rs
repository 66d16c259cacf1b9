#![forbid(unsafe_code)]

//! Wirestate kernel — the protocol data model.
//!
//! Pure data and pure functions: live property values, snapshots,
//! effects, the pass-scoped store, dotted paths and the integrity
//! checksum. No I/O and no async; the runtime crate drives all of it.

/// Wire protocol revision, surfaced by tooling.
pub const PROTOCOL_VERSION: u32 = 1;

pub mod context;
pub mod domain;
pub mod hashing;
pub mod invariants;
pub mod path;
pub mod store;
pub mod wire;
