//! Core runtime for kvrel: model identity, relation resolution, reverse
//! accessors, delete cascades, the store boundary, and observability.
#![warn(unreachable_pub)]

pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod obs;
pub mod registry;
pub mod relation;
pub mod store;

// test
#[cfg(test)]
pub(crate) mod test_support;

pub use error::{Error, ErrorClass, ErrorOrigin};

///
/// CONSTANTS
///

/// Separator between namespace and model name in a canonical model key.
pub const NAMESPACE_SEPARATOR: char = ':';

/// Literal target marker for a relation pointing at its own model.
pub const SELF_MARKER: &str = "self";

/// Maximum length for namespaces, model names, and related names.
pub const MAX_NAME_LEN: usize = 64;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, stores, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        db::{Db, Instance, RelationValue},
        model::{Model, ModelDef, ModelKey, OnDelete, RelationFieldDef, RelationKind},
        relation::{ReverseAccessor, TargetSpec},
        store::{Pk, Store},
    };
}
