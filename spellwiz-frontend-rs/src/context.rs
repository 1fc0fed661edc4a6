//! The word currently on screen, shared between the session and the practice view.

use std::cell::RefCell;
use std::rc::Rc;

use language_utils::Word;
use ledger::data_model::flush;
use ledger::{ListenerKey, Listeners};

#[derive(Default)]
struct Inner {
    current: Option<Word>,
    listeners: Listeners<Option<Word>>,
}

#[derive(Clone, Default)]
pub struct WordContext {
    inner: Rc<RefCell<Inner>>,
}

impl WordContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Word> {
        self.inner.borrow().current.clone()
    }

    /// Replaces the current word and tells every subscriber, even if the word didn't change.
    pub fn set(&self, word: Option<Word>) {
        let notifications = {
            let mut inner = self.inner.borrow_mut();
            inner.current = word.clone();
            inner.listeners.notifications(&word, None)
        };
        flush(notifications);
    }

    pub fn subscribe(&self, listener: impl Fn(ListenerKey, &Option<Word>) + 'static) -> ListenerKey {
        self.inner.borrow_mut().listeners.register(listener)
    }

    pub fn unsubscribe(&self, key: ListenerKey) {
        self.inner.borrow_mut().listeners.unregister(key);
    }
}
