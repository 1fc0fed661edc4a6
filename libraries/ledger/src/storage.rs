use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use crate::data_model::{ListenerKey, Listeners, flush};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage is unavailable: {0}")]
    Unavailable(String),
    #[error("failed to write {key}: {reason}")]
    Write { key: String, reason: String },
    #[error("failed to serialize: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// What a [`KeyValueStore`] listener is told about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageChange {
    Key(String),
    /// Every key may have changed, e.g. the whole store was cleared.
    All,
}

impl StorageChange {
    pub fn affects(&self, key: &str) -> bool {
        match self {
            StorageChange::Key(changed) => changed == key,
            StorageChange::All => true,
        }
    }
}

/// A string key-value store whose writes are observable.
///
/// Listeners receive what changed. They are called after the write has landed
/// and after every internal borrow has been released, so a listener may read or write
/// the store again.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
    /// Removes every key.
    fn clear(&self) -> Result<(), StorageError>;

    fn subscribe(&self, listener: Box<dyn Fn(ListenerKey, &StorageChange)>) -> ListenerKey;
    fn unsubscribe(&self, key: ListenerKey);
}

/// In-process store used natively and in tests.
#[derive(Default)]
pub struct MemoryStore {
    entries: RefCell<BTreeMap<String, String>>,
    listeners: RefCell<Listeners<StorageChange>>,
    read_only: Cell<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail, like a full browser quota.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.set(read_only);
    }

    fn check_writable(&self, key: &str) -> Result<(), StorageError> {
        if self.read_only.get() {
            return Err(StorageError::Write {
                key: key.to_string(),
                reason: "store is read-only".to_string(),
            });
        }
        Ok(())
    }

    fn changed(&self, change: StorageChange) {
        let notifications = self.listeners.borrow().notifications(&change, None);
        flush(notifications);
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_writable(key)?;
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self.changed(StorageChange::Key(key.to_string()));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check_writable(key)?;
        let removed = self.entries.borrow_mut().remove(key);
        if removed.is_some() {
            self.changed(StorageChange::Key(key.to_string()));
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.check_writable("*")?;
        self.entries.borrow_mut().clear();
        self.changed(StorageChange::All);
        Ok(())
    }

    fn subscribe(&self, listener: Box<dyn Fn(ListenerKey, &StorageChange)>) -> ListenerKey {
        self.listeners.borrow_mut().register(listener)
    }

    fn unsubscribe(&self, key: ListenerKey) {
        self.listeners.borrow_mut().unregister(key);
    }
}
