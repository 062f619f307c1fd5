//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, StateStore)
//! but are themselves concrete structs, not traits.

mod tree;

pub use tree::{CancelFlag, TreeService};
