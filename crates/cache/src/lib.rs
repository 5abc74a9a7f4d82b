//! Bounded cache with async compute-on-miss and least-recently-used eviction.
//!
//! Used by the document fetcher so that re-opening a citation does not
//! download the same document twice. The cache is generic over the value
//! type and knows nothing about documents.

pub mod lru;

pub use lru::{BoundedAsyncCache, CacheError};
