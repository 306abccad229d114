//! Resolve recipes into a deduplicated package graph, query it, and check
//! source checkouts against the SCM specs of their packages.

pub mod config;
pub mod env;
pub mod error;
pub mod format;
pub mod graph;
pub mod recipe;
pub mod scm;
pub mod variant;

pub use error::{Error, Result};
