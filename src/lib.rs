//! cfgtree: a hierarchical configuration tree.
//!
//! Leaves hold scalar values, parents hold ordered children. Values are
//! addressed by case-insensitive dotted paths, the tree round-trips through
//! a JSON export envelope, and every leaf can be turned into a command
//! descriptor.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
