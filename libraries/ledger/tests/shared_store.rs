use std::cell::RefCell;
use std::rc::Rc;

use ledger::{Event, KeyValueStore, LogStore, MemoryStore, RecordStore};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
struct Note {
    text: String,
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(tag = "version")]
enum VersionedNote {
    V1(Note),
}

impl Event for Note {
    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(VersionedNote::V1(self.clone()))
    }

    fn from_json(json: &serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value::<VersionedNote>(json.clone()).map(|VersionedNote::V1(note)| note)
    }
}

fn note(text: &str) -> Note {
    Note {
        text: text.to_string(),
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_two_handles_see_each_others_writes() {
    init_logging();
    let store: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
    let writer = RecordStore::<Note>::new(store.clone(), "notes");
    let reader = RecordStore::<Note>::new(store.clone(), "notes");

    let observed = Rc::new(RefCell::new(Vec::new()));
    let sink = observed.clone();
    let reader_clone = reader.clone();
    reader.subscribe(move || {
        sink.borrow_mut().push(reader_clone.get("a").map(|n| n.text));
    });

    writer.set("a", &note("first")).unwrap();
    writer.set("a", &note("second")).unwrap();
    writer.clear("a").unwrap();

    assert_eq!(
        *observed.borrow(),
        vec![Some("first".to_string()), Some("second".to_string()), None]
    );
}

#[test]
fn test_log_store_appends_newest_first() {
    init_logging();
    let store: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
    let log = LogStore::<Note>::new(store.clone(), "history");

    log.append(note("one")).unwrap();
    log.append(note("two")).unwrap();

    let loaded = log.load();
    let texts: Vec<_> = loaded.iter().map(|n| n.text.as_str()).collect();
    assert_eq!(texts, vec!["two", "one"]);

    let raw = store.get("history").unwrap().unwrap();
    assert!(raw.contains("\"version\":\"V1\""));

    log.clear().unwrap();
    assert!(log.load().is_empty());
}

#[test]
fn test_failed_write_leaves_previous_value() {
    init_logging();
    let memory = Rc::new(MemoryStore::new());
    let store: Rc<dyn KeyValueStore> = memory.clone();
    let log = LogStore::<Note>::new(store, "history");
    log.append(note("kept")).unwrap();

    memory.set_read_only(true);
    assert!(log.append(note("lost")).is_err());
    assert_eq!(log.load().len(), 1);
}

#[test]
fn test_clearing_the_store_reaches_record_subscribers() {
    init_logging();
    let store: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
    let records = RecordStore::<Note>::new(store.clone(), "notes");
    records.set("a", &note("kept")).unwrap();

    let observed = Rc::new(RefCell::new(Vec::new()));
    let sink = observed.clone();
    let reader = records.clone();
    records.subscribe(move || sink.borrow_mut().push(reader.get("a").map(|n| n.text)));

    store.clear().unwrap();
    assert_eq!(*observed.borrow(), vec![None]);
}
