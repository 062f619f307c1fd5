//! Configuration tree service
//!
//! Owns the tree behind a single read/write lock, auto-saves every successful
//! mutation to the key-value state store, and handles file export/import.
//! Change subscribers are called after the lock is released, so they may read
//! the tree from inside the callback.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::codec;
use crate::domain::{
    generate_commands, ChangeSignal, CommandDescriptor, DomainResult, NodeId, NodeJson,
    ResolveArgs, ScalarValue, SubscriptionId, TreeChange, TreeStore,
};
use crate::infrastructure::traits::{FileSystem, StateStore};

/// Cooperative cancellation for export/import.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Service for mutating, querying and persisting the configuration tree.
pub struct TreeService {
    store: RwLock<TreeStore>,
    signal: Mutex<ChangeSignal>,
    /// Events raised by the store under the write lock, not yet delivered.
    pending: Arc<Mutex<Vec<TreeChange>>>,
    fs: Arc<dyn FileSystem>,
    state: Arc<dyn StateStore>,
    state_key: String,
}

impl TreeService {
    /// Create a service over an empty tree.
    pub fn new(
        fs: Arc<dyn FileSystem>,
        state: Arc<dyn StateStore>,
        state_key: impl Into<String>,
    ) -> Self {
        let pending = Arc::new(Mutex::new(Vec::new()));
        let mut store = TreeStore::new();
        let sink = Arc::clone(&pending);
        store.subscribe(move |change| lock(&*sink).push(*change));
        Self {
            store: RwLock::new(store),
            signal: Mutex::new(ChangeSignal::new()),
            pending,
            fs,
            state,
            state_key: state_key.into(),
        }
    }

    // A panic mid-mutation cannot leave a torn tree: every store operation
    // validates before it touches the structure.
    fn read_store(&self) -> RwLockReadGuard<'_, TreeStore> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_store(&self) -> RwLockWriteGuard<'_, TreeStore> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take the events of the mutation that just ran; call with the write lock held.
    fn drain_pending(&self) -> Vec<TreeChange> {
        std::mem::take(&mut *lock(&*self.pending))
    }

    /// Deliver events to subscribers. Must not be called with the store locked.
    fn notify(&self, changes: Vec<TreeChange>) {
        if changes.is_empty() {
            return;
        }
        let signal = lock(&self.signal).clone();
        for change in changes {
            signal.publish(change);
        }
    }

    /// Load the last auto-saved tree from the state store.
    ///
    /// Missing or unreadable state leaves the current tree as is; failures
    /// are logged, not returned. Returns whether a tree was restored.
    pub fn restore(&self) -> bool {
        let text = match self.state.get(&self.state_key) {
            Ok(Some(text)) => text,
            Ok(None) => {
                debug!("restore: no saved state under '{}'", self.state_key);
                return false;
            }
            Err(e) => {
                warn!("restore: cannot read saved state: {e}");
                return false;
            }
        };
        match codec::parse_import(&text).and_then(|nodes| codec::deserialize(&nodes)) {
            Ok(fresh) => {
                debug!("restore: loaded {} items", fresh.len());
                let changes = {
                    let mut store = self.write_store();
                    store.replace_with(fresh);
                    self.drain_pending()
                };
                self.notify(changes);
                true
            }
            Err(e) => {
                warn!("restore: ignoring saved state: {e}");
                false
            }
        }
    }

    /// Run `f` against a consistent view of the tree.
    pub fn read<R>(&self, f: impl FnOnce(&TreeStore) -> R) -> R {
        let store = self.read_store();
        f(&*store)
    }

    /// Apply one mutation under the write lock, then auto-save and notify.
    ///
    /// The state snapshot and the raised events are taken before the lock is
    /// released, so both always match the tree right after this mutation.
    fn mutate<R>(&self, f: impl FnOnce(&mut TreeStore) -> DomainResult<R>) -> ApplicationResult<R> {
        let (result, snapshot, changes) = {
            let mut store = self.write_store();
            let result = f(&mut *store);
            let snapshot = result.is_ok().then(|| codec::encode_state(&*store));
            (result, snapshot, self.drain_pending())
        };
        if let Some(snapshot) = snapshot {
            self.persist(snapshot);
        }
        self.notify(changes);
        Ok(result?)
    }

    fn persist(&self, snapshot: DomainResult<String>) {
        let outcome = snapshot
            .map_err(|e| e.to_string())
            .and_then(|text| {
                self.state
                    .update(&self.state_key, &text)
                    .map_err(|e| e.to_string())
            });
        if let Err(e) = outcome {
            warn!("auto-save failed, in-memory tree kept: {e}");
        }
    }

    /// Listeners run on the mutating thread once the tree is unlocked and saved.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&TreeChange) + Send + Sync + 'static,
    {
        let mut signal = lock(&self.signal);
        let id = signal.subscribe(listener);
        debug!("subscribe: {} listener(s)", signal.subscriber_count());
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        lock(&self.signal).unsubscribe(id)
    }

    pub fn add_root_item(&self, label: &str) -> ApplicationResult<NodeId> {
        debug!("add_root_item: label={label}");
        self.mutate(|store| store.add_root_item(label))
    }

    pub fn add_child_to_item(
        &self,
        parent: NodeId,
        label: &str,
        value: Option<ScalarValue>,
    ) -> ApplicationResult<NodeId> {
        debug!("add_child_to_item: label={label}");
        self.mutate(|store| store.add_child_to_item(parent, label, value))
    }

    pub fn remove_item(&self, id: NodeId) -> ApplicationResult<bool> {
        self.mutate(|store| Ok(store.remove_item(id)))
    }

    pub fn set_item_value(&self, id: NodeId, value: ScalarValue) -> ApplicationResult<()> {
        self.mutate(|store| store.set_item_value(id, value))
    }

    pub fn rename_item(&self, id: NodeId, label: &str) -> ApplicationResult<()> {
        self.mutate(|store| store.rename_item(id, label))
    }

    pub fn clear(&self) -> ApplicationResult<()> {
        self.mutate(|store| {
            store.clear();
            Ok(())
        })
    }

    /// Address any node (leaf or parent) by dotted path.
    pub fn locate(&self, path: &str) -> ApplicationResult<NodeId> {
        Ok(self.read(|store| store.locate(path))?)
    }

    /// Path resolution entry point.
    pub fn resolve(&self, args: &ResolveArgs) -> ApplicationResult<String> {
        debug!("resolve: path={}", args.path);
        Ok(self.read(|store| store.resolve(&args.path).map(str::to_string))?)
    }

    pub fn generate_commands(&self) -> Vec<CommandDescriptor> {
        self.read(|store| generate_commands(store).map(CommandDescriptor::from).collect())
    }

    pub fn snapshot(&self) -> Vec<NodeJson> {
        self.read(codec::serialize)
    }

    /// Write the tree as an export envelope, creating parent directories.
    pub fn export_to_file(&self, path: &Path, cancel: &CancelFlag) -> ApplicationResult<()> {
        let text = self.read(|store| codec::encode_export(store, Utc::now()))?;
        if cancel.is_cancelled() {
            return Err(ApplicationError::Cancelled("export"));
        }
        self.fs
            .ensure_parent(path)
            .with_path_context("create export directory", path)?;
        self.fs
            .write(path, &text)
            .with_path_context("write export", path)?;
        info!("exported tree to {}", path.display());
        Ok(())
    }

    /// Replace the whole tree with the contents of an export (or bare array) file.
    ///
    /// The payload is parsed and validated before the write lock is taken;
    /// on any failure or cancellation the current tree is untouched.
    /// Returns the number of imported items.
    pub fn import_from_file(&self, path: &Path, cancel: &CancelFlag) -> ApplicationResult<usize> {
        let text = self
            .fs
            .read_to_string(path)
            .with_path_context("read import", path)?;
        if cancel.is_cancelled() {
            return Err(ApplicationError::Cancelled("import"));
        }
        let fresh = codec::decode_import(&text)?;
        if cancel.is_cancelled() {
            return Err(ApplicationError::Cancelled("import"));
        }
        let count = fresh.len();
        self.mutate(|store| {
            store.replace_with(fresh);
            Ok(())
        })?;
        info!("imported {count} items from {}", path.display());
        Ok(count)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
