//! # EventLog
//! An append-only history of events, stored newest first.
//! Loading is lenient: an entry that fails to parse is dropped (and logged) instead of
//! poisoning the entire history.

use crate::PartialAppState;
use crate::data_model::Event;

#[derive(Clone, Debug, PartialEq)]
pub struct EventLog<E> {
    events: Vec<E>,
}

impl<E> Default for EventLog<E> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

impl<E: Event> EventLog<E> {
    pub fn from_json(json: &serde_json::Value) -> Self {
        let Some(entries) = json.as_array() else {
            log::error!("Expected an array of events, found {json}");
            return Self::default();
        };
        let events = entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                E::from_json(entry)
                    .inspect_err(|e| log::error!("Skipping malformed event {index}: {e:?}"))
                    .ok()
            })
            .collect();
        Self { events }
    }

    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        let entries = self
            .events
            .iter()
            .map(Event::to_json)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(serde_json::Value::Array(entries))
    }

    pub fn push(&mut self, event: E) {
        self.events.insert(0, event);
    }

    /// Newest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &E> + ExactSizeIterator {
        self.events.iter()
    }

    pub fn newest(&self) -> Option<&E> {
        self.events.first()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Replays the history, oldest first, into a derived state.
    pub fn state<S: PartialAppState<Event = E>>(&self) -> S
    where
        S::Partial: Default,
    {
        let partial = self
            .events
            .iter()
            .rev()
            .fold(S::Partial::default(), S::process_event);
        S::finalize(partial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Scored {
        score: u32,
    }

    impl Event for Scored {
        fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
            serde_json::to_value(self)
        }

        fn from_json(json: &serde_json::Value) -> Result<Self, serde_json::Error> {
            serde_json::from_value(json.clone())
        }
    }

    struct Total(Vec<u32>);

    impl PartialAppState for Total {
        type Event = Scored;
        type Partial = Vec<u32>;

        fn process_event(mut partial: Vec<u32>, event: &Scored) -> Vec<u32> {
            partial.push(event.score);
            partial
        }

        fn finalize(partial: Vec<u32>) -> Self {
            Total(partial)
        }
    }

    #[test]
    fn test_push_is_newest_first() {
        let mut log = EventLog::default();
        log.push(Scored { score: 1 });
        log.push(Scored { score: 2 });
        assert_eq!(log.newest(), Some(&Scored { score: 2 }));
        let scores: Vec<_> = log.iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![2, 1]);
    }

    #[test]
    fn test_state_replays_oldest_first() {
        let mut log = EventLog::default();
        log.push(Scored { score: 1 });
        log.push(Scored { score: 2 });
        log.push(Scored { score: 3 });
        let Total(order) = log.state::<Total>();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let json = serde_json::json!([{ "score": 4 }, { "points": 9 }, "garbage", { "score": 5 }]);
        let log = EventLog::<Scored>::from_json(&json);
        let scores: Vec<_> = log.iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![4, 5]);
    }

    #[test]
    fn test_non_array_is_empty() {
        let log = EventLog::<Scored>::from_json(&serde_json::json!({ "score": 4 }));
        assert!(log.is_empty());
    }
}
