//! # Listeners
//! A registry of change callbacks keyed by [`ListenerKey`].
//! Callbacks are never invoked while the registry (or anything owning it) is borrowed:
//! [`Listeners::notifications`] snapshots the callbacks into closures that the caller runs
//! once it has released its borrows. This guarantees the absence of "already borrowed" panics
//! when a callback re-enters the store.

use std::rc::Rc;

use crate::data_model::ListenerKey;

pub struct Listeners<T> {
    listeners: slotmap::SlotMap<slotmap::DefaultKey, Rc<dyn Fn(ListenerKey, &T)>>,
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self {
            listeners: Default::default(),
        }
    }
}

impl<T: Clone + 'static> Listeners<T> {
    pub fn register(&mut self, listener: impl Fn(ListenerKey, &T) + 'static) -> ListenerKey {
        ListenerKey(self.listeners.insert(Rc::new(listener)))
    }

    /// Returns true if the listener was registered.
    pub fn unregister(&mut self, key: ListenerKey) -> bool {
        self.listeners.remove(key.0).is_some()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Pending calls for every listener except `except` (usually whoever caused the change).
    pub fn notifications(&self, value: &T, except: Option<ListenerKey>) -> Vec<Box<dyn FnOnce()>> {
        let mut notifications: Vec<Box<dyn FnOnce()>> = Vec::new();
        for (key, listener) in self.listeners.iter() {
            let listener_key = ListenerKey(key);
            if except == Some(listener_key) {
                continue;
            }
            let listener = listener.clone();
            let value = value.clone();
            notifications.push(Box::new(move || listener(listener_key, &value)));
        }
        notifications
    }
}

/// Run notifications collected by [`Listeners::notifications`].
pub fn flush(notifications: Vec<Box<dyn FnOnce()>>) {
    for notify in notifications {
        notify();
    }
}
