//! Change notification for tree mutations.

use std::fmt;
use std::sync::Arc;

use crate::domain::node::NodeId;

/// What changed in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeChange {
    Added(NodeId),
    Removed(NodeId),
    ValueSet(NodeId),
    Renamed(NodeId),
    Cleared,
    /// The whole tree was swapped for a freshly loaded one.
    Replaced,
}

/// Token returned by [`ChangeSignal::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&TreeChange) + Send + Sync>;

/// Single change-event stream with zero or more subscribers.
///
/// Cloning shares the listeners, so a copy can be published from after the
/// lock guarding the original is released.
#[derive(Clone, Default)]
pub struct ChangeSignal {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
}

impl fmt::Debug for ChangeSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeSignal")
            .field("subscribers", &self.listeners.len())
            .finish()
    }
}

impl ChangeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&TreeChange) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Arc::new(listener)));
        id
    }

    /// Returns whether the subscription existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    pub fn publish(&self, change: TreeChange) {
        for (_, listener) in &self.listeners {
            listener(&change);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }
}
