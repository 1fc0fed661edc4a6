use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::rc::Rc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::data_model::{Event, EventLog, ListenerKey};
use crate::storage::{KeyValueStore, StorageError};

fn read_json(store: &dyn KeyValueStore, key: &str) -> Option<serde_json::Value> {
    let raw = store
        .get(key)
        .inspect_err(|e| log::warn!("Failed to read {key}: {e:?}"))
        .ok()??;
    serde_json::from_str(&raw)
        .inspect_err(|e| log::error!("Malformed JSON under {key}: {e:?}"))
        .ok()
}

fn subscribe_to_key(
    store: &dyn KeyValueStore,
    key: &str,
    listener: impl Fn() + 'static,
) -> ListenerKey {
    let key = key.to_string();
    store.subscribe(Box::new(move |_, changed| {
        if changed.affects(&key) {
            listener();
        }
    }))
}

/// A JSON object of records stored under one key, e.g. recordings by word id.
///
/// Every write re-reads the key first and only replaces its own entry, so concurrent
/// writers (other tabs, other components) lose at most a same-entry race.
pub struct RecordStore<V> {
    store: Rc<dyn KeyValueStore>,
    key: String,
    _marker: PhantomData<fn() -> V>,
}

impl<V> Clone for RecordStore<V> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            key: self.key.clone(),
            _marker: PhantomData,
        }
    }
}

impl<V: Serialize + DeserializeOwned> RecordStore<V> {
    pub fn new(store: Rc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn read_raw(&self) -> BTreeMap<String, serde_json::Value> {
        match read_json(self.store.as_ref(), &self.key) {
            Some(serde_json::Value::Object(map)) => map.into_iter().collect(),
            Some(other) => {
                log::error!("Expected an object under {}, found {other}", self.key);
                BTreeMap::new()
            }
            None => BTreeMap::new(),
        }
    }

    fn write_raw(&self, map: &BTreeMap<String, serde_json::Value>) -> Result<(), StorageError> {
        let serialized = serde_json::to_string(map)?;
        self.store.set(&self.key, &serialized)
    }

    fn parse(&self, id: &str, value: serde_json::Value) -> Option<V> {
        serde_json::from_value(value)
            .inspect_err(|e| log::error!("Malformed record {id} under {}: {e:?}", self.key))
            .ok()
    }

    /// Every well-formed record.
    pub fn all(&self) -> BTreeMap<String, V> {
        self.read_raw()
            .into_iter()
            .filter_map(|(id, value)| {
                let record = self.parse(&id, value)?;
                Some((id, record))
            })
            .collect()
    }

    /// `None` when the record is absent, malformed, or the store can't be read.
    pub fn get(&self, id: &str) -> Option<V> {
        let value = self.read_raw().remove(id)?;
        self.parse(id, value)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn set(&self, id: &str, record: &V) -> Result<(), StorageError> {
        let mut map = self.read_raw();
        map.insert(id.to_string(), serde_json::to_value(record)?);
        self.write_raw(&map)
    }

    pub fn clear(&self, id: &str) -> Result<(), StorageError> {
        let mut map = self.read_raw();
        if map.remove(id).is_some() {
            self.write_raw(&map)?;
        }
        Ok(())
    }

    /// Called after any write to this store's key.
    pub fn subscribe(&self, listener: impl Fn() + 'static) -> ListenerKey {
        subscribe_to_key(self.store.as_ref(), &self.key, listener)
    }

    pub fn unsubscribe(&self, key: ListenerKey) {
        self.store.unsubscribe(key);
    }
}

/// An [`EventLog`] stored as a JSON array under one key.
pub struct LogStore<E> {
    store: Rc<dyn KeyValueStore>,
    key: String,
    _marker: PhantomData<fn() -> E>,
}

impl<E> Clone for LogStore<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            key: self.key.clone(),
            _marker: PhantomData,
        }
    }
}

impl<E: Event> LogStore<E> {
    pub fn new(store: Rc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            _marker: PhantomData,
        }
    }

    pub fn load(&self) -> EventLog<E> {
        read_json(self.store.as_ref(), &self.key)
            .map(|json| EventLog::from_json(&json))
            .unwrap_or_default()
    }

    pub fn append(&self, event: E) -> Result<(), StorageError> {
        let mut log = self.load();
        log.push(event);
        let serialized = serde_json::to_string(&log.to_json()?)?;
        self.store.set(&self.key, &serialized)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(&self.key)
    }

    pub fn subscribe(&self, listener: impl Fn() + 'static) -> ListenerKey {
        subscribe_to_key(self.store.as_ref(), &self.key, listener)
    }

    pub fn unsubscribe(&self, key: ListenerKey) {
        self.store.unsubscribe(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use std::cell::Cell;

    #[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Clip {
        data: String,
    }

    fn clip(data: &str) -> Clip {
        Clip {
            data: data.to_string(),
        }
    }

    #[test]
    fn test_set_preserves_other_records() {
        let store: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
        let a = RecordStore::<Clip>::new(store.clone(), "clips");
        let b = RecordStore::<Clip>::new(store.clone(), "clips");

        a.set("1", &clip("one")).unwrap();
        b.set("2", &clip("two")).unwrap();

        assert_eq!(a.get("1"), Some(clip("one")));
        assert_eq!(a.get("2"), Some(clip("two")));
        assert_eq!(a.all().len(), 2);
    }

    #[test]
    fn test_malformed_storage_means_absent() {
        let store: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
        store.set("clips", "not json").unwrap();
        let records = RecordStore::<Clip>::new(store.clone(), "clips");
        assert_eq!(records.get("1"), None);
        assert!(records.all().is_empty());

        // a writer recovers by replacing the unreadable value
        records.set("1", &clip("one")).unwrap();
        assert_eq!(records.get("1"), Some(clip("one")));
    }

    #[test]
    fn test_malformed_record_does_not_hide_others() {
        let store: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
        store
            .set("clips", r#"{"1": {"data": "one"}, "2": 42}"#)
            .unwrap();
        let records = RecordStore::<Clip>::new(store.clone(), "clips");
        assert_eq!(records.get("1"), Some(clip("one")));
        assert_eq!(records.get("2"), None);

        records.set("3", &clip("three")).unwrap();
        let raw = store.get("clips").unwrap().unwrap();
        assert!(raw.contains("\"2\":42"));
    }

    #[test]
    fn test_clear_and_subscribe() {
        let store: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
        let records = RecordStore::<Clip>::new(store.clone(), "clips");
        let changes = Rc::new(Cell::new(0));
        let counter = changes.clone();
        records.subscribe(move || counter.set(counter.get() + 1));

        records.set("1", &clip("one")).unwrap();
        store.set("unrelated", "x").unwrap();
        records.clear("1").unwrap();
        records.clear("1").unwrap();

        assert_eq!(records.get("1"), None);
        assert_eq!(changes.get(), 2);
    }
}
