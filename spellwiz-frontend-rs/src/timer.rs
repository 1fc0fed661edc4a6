//! The per-stage countdown.
//!
//! The timer doesn't own a clock. Callers tell it the current time, and it answers with the
//! delay until it next wants to be woken plus a generation number. A wake-up carrying an old
//! generation is stale and is ignored, which is how stop/pause/restart cancel pending ticks.

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TimerSignal {
    Tick { remaining: u32 },
    /// Raised once per activation, on the tick that crosses the warning threshold.
    Warning { remaining: u32 },
    /// Raised exactly once per activation unless the timer is stopped first.
    Expired,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Wakeup {
    pub generation: u64,
    pub after_ms: u64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum TimerState {
    Idle,
    Running { next_tick_at_ms: u64 },
    Paused { until_next_tick_ms: u64 },
    Expired,
}

const TICK_MS: u64 = 1000;

#[derive(Clone, Debug)]
pub struct StageTimer<K> {
    duration_seconds: u32,
    warning_seconds: u32,
    remaining: u32,
    warned: bool,
    state: TimerState,
    key: Option<K>,
    generation: u64,
}

impl<K: PartialEq + Clone> StageTimer<K> {
    pub fn new(duration_seconds: u32, warning_seconds: u32) -> Self {
        Self {
            duration_seconds,
            warning_seconds,
            remaining: duration_seconds,
            warned: false,
            state: TimerState::Idle,
            key: None,
            generation: 0,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, TimerState::Running { .. })
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.state, TimerState::Paused { .. })
    }

    pub fn key(&self) -> Option<&K> {
        self.key.as_ref()
    }

    fn bump(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Starts a fresh countdown. Starting again with the key of the activation that is already
    /// running does nothing and returns `None`.
    pub fn start(&mut self, key: K, now_ms: u64) -> Option<Wakeup> {
        if self.is_running() && self.key.as_ref() == Some(&key) {
            return None;
        }
        self.key = Some(key);
        self.remaining = self.duration_seconds;
        self.warned = false;
        self.state = TimerState::Running {
            next_tick_at_ms: now_ms + TICK_MS,
        };
        Some(Wakeup {
            generation: self.bump(),
            after_ms: TICK_MS,
        })
    }

    pub fn stop(&mut self) {
        self.state = TimerState::Idle;
        self.bump();
    }

    pub fn pause(&mut self, now_ms: u64) {
        if let TimerState::Running { next_tick_at_ms } = self.state {
            self.state = TimerState::Paused {
                until_next_tick_ms: next_tick_at_ms.saturating_sub(now_ms),
            };
            self.bump();
        }
    }

    /// Continues from exactly where `pause` left off, including the partial second.
    pub fn resume(&mut self, now_ms: u64) -> Option<Wakeup> {
        let TimerState::Paused { until_next_tick_ms } = self.state else {
            return None;
        };
        self.state = TimerState::Running {
            next_tick_at_ms: now_ms + until_next_tick_ms,
        };
        Some(Wakeup {
            generation: self.bump(),
            after_ms: until_next_tick_ms,
        })
    }

    /// Handles a wake-up previously requested through a [`Wakeup`].
    pub fn on_wakeup(&mut self, generation: u64) -> (Vec<TimerSignal>, Option<Wakeup>) {
        let TimerState::Running { next_tick_at_ms } = self.state else {
            return (Vec::new(), None);
        };
        if generation != self.generation {
            return (Vec::new(), None);
        }

        let previous = self.remaining;
        self.remaining = self.remaining.saturating_sub(1);
        let mut signals = vec![TimerSignal::Tick {
            remaining: self.remaining,
        }];

        if !self.warned && previous > self.warning_seconds && self.remaining <= self.warning_seconds
        {
            self.warned = true;
            signals.push(TimerSignal::Warning {
                remaining: self.remaining,
            });
        }

        if self.remaining == 0 {
            self.state = TimerState::Expired;
            self.bump();
            signals.push(TimerSignal::Expired);
            return (signals, None);
        }

        self.state = TimerState::Running {
            next_tick_at_ms: next_tick_at_ms + TICK_MS,
        };
        let wakeup = Wakeup {
            generation: self.bump(),
            after_ms: TICK_MS,
        };
        (signals, Some(wakeup))
    }
}
