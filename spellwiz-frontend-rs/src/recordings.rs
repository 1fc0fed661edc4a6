//! Pronunciations recorded by a parent or tutor, keyed by word id.

use std::rc::Rc;

use base64::Engine;
use ledger::{KeyValueStore, ListenerKey, RecordStore, StorageError};

pub const RECORDINGS_STORAGE_KEY: &str = "wordRecordings";

/// An audio clip stored as a `data:` URL, which the browser can play directly.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Recording {
    pub data_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RecordingError {
    #[error("not a base64 data URL")]
    NotADataUrl,
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl Recording {
    pub fn from_audio(mime_type: &str, bytes: &[u8]) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Self {
            data_url: format!("data:{mime_type};base64,{encoded}"),
        }
    }

    pub fn mime_type(&self) -> Option<&str> {
        let (header, _) = self.data_url.strip_prefix("data:")?.split_once(',')?;
        header.strip_suffix(";base64")
    }

    pub fn audio(&self) -> Result<Vec<u8>, RecordingError> {
        let (header, payload) = self
            .data_url
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(','))
            .ok_or(RecordingError::NotADataUrl)?;
        if !header.ends_with(";base64") {
            return Err(RecordingError::NotADataUrl);
        }
        Ok(base64::engine::general_purpose::STANDARD.decode(payload)?)
    }
}

/// All recordings live under one storage key, shared by every tab and component.
#[derive(Clone)]
pub struct Recordings {
    records: RecordStore<Recording>,
}

impl Recordings {
    pub fn new(store: Rc<dyn KeyValueStore>) -> Self {
        Self {
            records: RecordStore::new(store, RECORDINGS_STORAGE_KEY),
        }
    }

    /// `None` if there is no recording or it can't be read.
    pub fn get(&self, word_id: &str) -> Option<Recording> {
        self.records.get(word_id)
    }

    pub fn has(&self, word_id: &str) -> bool {
        self.records.contains(word_id)
    }

    pub fn word_ids(&self) -> Vec<String> {
        self.records.all().into_keys().collect()
    }

    pub fn set(&self, word_id: &str, recording: &Recording) -> Result<(), StorageError> {
        log::info!("Saving recording for word {word_id}");
        self.records.set(word_id, recording)
    }

    pub fn clear(&self, word_id: &str) -> Result<(), StorageError> {
        log::info!("Deleting recording for word {word_id}");
        self.records.clear(word_id)
    }

    pub fn subscribe(&self, listener: impl Fn() + 'static) -> ListenerKey {
        self.records.subscribe(listener)
    }

    pub fn unsubscribe(&self, key: ListenerKey) {
        self.records.unsubscribe(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger::MemoryStore;

    #[test]
    fn test_data_url_round_trip() {
        let recording = Recording::from_audio("audio/webm", b"\x1aE\xdf\xa3");
        assert!(recording.data_url.starts_with("data:audio/webm;base64,"));
        assert_eq!(recording.mime_type(), Some("audio/webm"));
        assert_eq!(recording.audio().unwrap(), b"\x1aE\xdf\xa3".to_vec());
    }

    #[test]
    fn test_rejects_non_data_urls() {
        let recording = Recording {
            data_url: "blob:https://example.com/123".to_string(),
        };
        assert!(matches!(recording.audio(), Err(RecordingError::NotADataUrl)));
        assert_eq!(recording.mime_type(), None);
    }

    #[test]
    fn test_stored_as_plain_strings() {
        let store: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
        let recordings = Recordings::new(store.clone());
        recordings
            .set("7", &Recording::from_audio("audio/webm", b"hi"))
            .unwrap();
        let raw = store.get(RECORDINGS_STORAGE_KEY).unwrap().unwrap();
        assert_eq!(raw, r#"{"7":"data:audio/webm;base64,aGk="}"#);
        assert!(recordings.has("7"));
        assert_eq!(recordings.word_ids(), vec!["7".to_string()]);

        recordings.clear("7").unwrap();
        assert!(!recordings.has("7"));
    }

    #[test]
    fn test_legacy_entries_are_readable() {
        let store: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
        store
            .set(RECORDINGS_STORAGE_KEY, r#"{"3": "data:audio/mp3;base64,SUQz", "4": null}"#)
            .unwrap();
        let recordings = Recordings::new(store);
        assert_eq!(recordings.get("3").unwrap().audio().unwrap(), b"ID3".to_vec());
        assert_eq!(recordings.get("4"), None);
    }
}
