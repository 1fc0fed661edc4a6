//! The event loop the practice driver runs on.
//!
//! In the browser this is `setTimeout` plus `spawn_local`. [`ManualHost`] is a deterministic
//! stand-in whose clock only moves when told to, for tests and headless runs.

use std::cell::{Cell, RefCell};

use futures::channel::oneshot;
use futures::executor::{LocalPool, LocalSpawner};
use futures::future::LocalBoxFuture;
use futures::task::LocalSpawnExt as _;

pub trait Host {
    fn now_ms(&self) -> u64;
    fn schedule(&self, after_ms: u64, task: Box<dyn FnOnce()>);
    fn spawn(&self, future: LocalBoxFuture<'static, ()>);

    fn sleep(&self, after_ms: u64) -> LocalBoxFuture<'static, ()> {
        let (tx, rx) = oneshot::channel();
        self.schedule(
            after_ms,
            Box::new(move || {
                let _ = tx.send(());
            }),
        );
        Box::pin(async move {
            let _ = rx.await;
        })
    }
}

struct Pending {
    due_ms: u64,
    sequence: u64,
    task: Box<dyn FnOnce()>,
}

pub struct ManualHost {
    now_ms: Cell<u64>,
    sequence: Cell<u64>,
    pending: RefCell<Vec<Pending>>,
    pool: RefCell<LocalPool>,
    spawner: LocalSpawner,
}

impl Default for ManualHost {
    fn default() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            now_ms: Cell::new(0),
            sequence: Cell::new(0),
            pending: RefCell::new(Vec::new()),
            pool: RefCell::new(pool),
            spawner,
        }
    }
}

impl ManualHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_tasks(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Polls spawned futures until none can make progress.
    pub fn run_until_stalled(&self) {
        self.pool.borrow_mut().run_until_stalled();
    }

    /// Moves the clock forward, running every task that falls due, in order.
    pub fn advance(&self, ms: u64) {
        let target = self.now_ms.get() + ms;
        self.run_until_stalled();
        while let Some(task) = self.pop_due(target) {
            task();
            self.run_until_stalled();
        }
        self.now_ms.set(target);
    }

    fn pop_due(&self, target: u64) -> Option<Box<dyn FnOnce()>> {
        let mut pending = self.pending.borrow_mut();
        let next = pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.due_ms <= target)
            .min_by_key(|(_, p)| (p.due_ms, p.sequence))
            .map(|(index, _)| index)?;
        let Pending { due_ms, task, .. } = pending.swap_remove(next);
        self.now_ms.set(due_ms.max(self.now_ms.get()));
        Some(task)
    }
}

impl Host for ManualHost {
    fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }

    fn schedule(&self, after_ms: u64, task: Box<dyn FnOnce()>) {
        let sequence = self.sequence.get();
        self.sequence.set(sequence + 1);
        self.pending.borrow_mut().push(Pending {
            due_ms: self.now_ms.get() + after_ms,
            sequence,
            task,
        });
    }

    fn spawn(&self, future: LocalBoxFuture<'static, ()>) {
        if let Err(e) = self.spawner.spawn_local(future) {
            log::error!("Failed to spawn task: {e:?}");
        }
    }
}
