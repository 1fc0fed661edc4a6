//! `window.localStorage` as a [`KeyValueStore`].
//!
//! The browser only fires `storage` events in *other* tabs, so writes made through this
//! handle notify local subscribers directly, and a window listener forwards writes made elsewhere.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast as _;
use wasm_bindgen::prelude::*;

use crate::data_model::{ListenerKey, Listeners, flush};
use crate::storage::{KeyValueStore, StorageChange, StorageError};

pub struct LocalStorage {
    storage: web_sys::Storage,
    listeners: Rc<RefCell<Listeners<StorageChange>>>,
    on_storage_event: Closure<dyn Fn(web_sys::StorageEvent)>,
}

impl LocalStorage {
    pub fn new() -> Result<Self, StorageError> {
        let window = web_sys::window()
            .ok_or_else(|| StorageError::Unavailable("no window".to_string()))?;
        let storage = window
            .local_storage()
            .map_err(|e| StorageError::Unavailable(format!("{e:?}")))?
            .ok_or_else(|| StorageError::Unavailable("localStorage is disabled".to_string()))?;

        let listeners: Rc<RefCell<Listeners<StorageChange>>> = Rc::new(RefCell::new(Listeners::default()));
        let forward_to = listeners.clone();
        let on_storage_event = Closure::<dyn Fn(web_sys::StorageEvent)>::new(
            move |event: web_sys::StorageEvent| {
                // `key` is null when another tab called `localStorage.clear()`
                let change = match event.key() {
                    Some(key) => StorageChange::Key(key),
                    None => StorageChange::All,
                };
                let notifications = forward_to.borrow().notifications(&change, None);
                flush(notifications);
            },
        );
        window
            .add_event_listener_with_callback("storage", on_storage_event.as_ref().unchecked_ref())
            .map_err(|e| StorageError::Unavailable(format!("{e:?}")))?;

        Ok(Self {
            storage,
            listeners,
            on_storage_event,
        })
    }

    fn changed(&self, change: StorageChange) {
        let notifications = self.listeners.borrow().notifications(&change, None);
        flush(notifications);
    }
}

impl Drop for LocalStorage {
    fn drop(&mut self) {
        if let Some(window) = web_sys::window() {
            let _ = window.remove_event_listener_with_callback(
                "storage",
                self.on_storage_event.as_ref().unchecked_ref(),
            );
        }
    }
}

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage
            .get_item(key)
            .map_err(|e| StorageError::Unavailable(format!("{e:?}")))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage
            .set_item(key, value)
            .map_err(|e| StorageError::Write {
                key: key.to_string(),
                reason: format!("{e:?}"),
            })?;
        self.changed(StorageChange::Key(key.to_string()));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.storage
            .remove_item(key)
            .map_err(|e| StorageError::Write {
                key: key.to_string(),
                reason: format!("{e:?}"),
            })?;
        self.changed(StorageChange::Key(key.to_string()));
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.storage
            .clear()
            .map_err(|e| StorageError::Write {
                key: "*".to_string(),
                reason: format!("{e:?}"),
            })?;
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
