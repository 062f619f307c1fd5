//! Domain layer: the configuration tree and its pure operations
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod codec;
pub mod commands;
pub mod error;
pub mod node;
pub mod resolver;
pub mod signal;
pub mod store;
pub mod tree_traits;

pub use codec::{Envelope, NodeJson, FORMAT_VERSION, MAX_DEPTH};
pub use commands::{generate_commands, CommandDescriptor, LeafCommand, RESOLVE_COMMAND};
pub use error::{DomainError, DomainResult};
pub use node::{validate_label, ExpansionHint, Node, NodeId, ScalarValue, PATH_SEPARATOR};
pub use resolver::ResolveArgs;
pub use signal::{ChangeSignal, SubscriptionId, TreeChange};
pub use store::{DepthFirst, TreeStore, Visit};
pub use tree_traits::TreeDisplay;
