//! Trellis Types
//!
//! This crate defines the data types shared by the Trellis crates: fact values and
//! their normalised equality keys, fact handles, facts, and the fact-type schemas the
//! network compiler resolves field accessors against. Keeping them here lets
//! `trellis-core` and `trellis-cli` agree on one representation.

#![deny(missing_docs)]

mod schema;
mod types;

pub use schema::{FactSchema, SchemaRegistry};
pub use types::{Fact, FactHandle, FactValue, ValueKey, ValueKind};
