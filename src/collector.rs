//! Collector Layer
//!
//! The contract between the collection engine and vendor adapters, plus the
//! support types adapters build on.
//!
//! # Architecture
//!
//! - [`SourceCollector`]: hook trait every vendor adapter implements
//! - [`SourceResponses`] / [`RawResponse`]: raw payloads from one invocation
//! - [`ReportCache`]: bounded, expiring cache for cross-call lookups
//! - [`flatten_tree`]: iterative traversal of nested API responses

mod cache;
mod traits;
mod traversal;

pub use cache::ReportCache;
pub use traits::{CollectError, RawResponse, SourceCollector, SourceResponses};
pub use traversal::flatten_tree;
