//! Query caching module.
//!
//! This module provides the `QueryCache` for keeping fetched lists in
//! memory between screens. Entries are considered stale after 5 minutes
//! and are dropped whenever a mutation touches the same data.
//!
//! Cached queries include:
//! - Members and a parent's children
//! - Contributions (all, or by person and year) and their payments
//! - Districts, tributes and administrators

pub mod manager;

pub use manager::{CacheKey, CacheKind, CachedData, QueryCache};
