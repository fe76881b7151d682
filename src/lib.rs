//! Change hierarchy graph engine.
//!
//! Organizes the hunks of a code change into a typed, multi-level hierarchy and
//! derives review views from it: a linear narrative of chapters, alternate nested
//! chapter views, community clusters, and generation dependency sets.

pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod query;
pub mod snapshot;

pub use error::{GraphError, Result};
pub use graph::{HierarchyGraph, HierarchySnapshot};
