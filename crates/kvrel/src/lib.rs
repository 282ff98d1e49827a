//! ## Crate layout
//! - `core`: model identity, relation fields, reverse accessors, delete
//!   cascades, the store boundary, and observability.
//!
//! The `prelude` module carries the vocabulary needed to define models and
//! work with related instances; stores, middlewares, and metrics are reached
//! through their modules.

pub use kvrel_core as core;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use core::{Error, ErrorClass, ErrorOrigin, config::RelationConfig, db::Db};

pub mod store {
    pub use crate::core::store::{
        MemoryStore, Pk, Store, StoreError,
        middleware::{LoggingMiddleware, Middleware, MiddlewareStore},
    };
}

pub mod obs {
    pub use crate::core::obs::{
        EventReport, MetricsEvent, MetricsSink, metrics_report, metrics_reset_all,
        with_metrics_sink,
    };
}

///
/// Prelude
///

pub mod prelude {
    pub use crate::core::prelude::*;
    pub use crate::{Db, RelationConfig, store::MemoryStore};
}
