//! Raw Zepp export schema
//!
//! This module defines the loosely typed input records produced by the
//! retrieval layer and the adapter that loads them from JSON.

mod adapter;
mod raw_activity;

pub use adapter::*;
pub use raw_activity::*;
