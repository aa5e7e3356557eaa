//! `ResultChannel` — single-slot, overwrite-on-write publication of the
//! latest recognized text and the latest error message.
//!
//! Two independent slots so an error never clobbers a pending result and
//! vice versa. Publication policy is most-recent-wins: no queueing, values
//! published between two polls are overwritten unobserved. Both slots are
//! clear-on-read: the error slot could alternatively stay sticky until the
//! next error, but the consume-once contract keeps the two polls symmetric.
//!
//! Each slot is guarded by its own `parking_lot::Mutex`, so a publish that
//! races a take is fully ordered — a reader observes either the previous
//! complete string or the next one, never a mix. There is no ordering
//! guarantee *between* the two slots.

use parking_lot::Mutex;

/// Thread-safe hand-off point between the worker (publisher) and the
/// polling caller (consumer). Returned strings are independently owned
/// copies; internal storage is never exposed by reference.
#[derive(Default)]
pub struct ResultChannel {
    text: Mutex<String>,
    error: Mutex<String>,
}

impl ResultChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the latest-result slot.
    pub fn publish_text(&self, text: impl Into<String>) {
        *self.text.lock() = text.into();
    }

    /// Overwrite the latest-error slot.
    pub fn publish_error(&self, message: impl Into<String>) {
        *self.error.lock() = message.into();
    }

    /// Take and clear the latest result; empty when nothing new was
    /// published since the previous take. Never blocks beyond the slot lock.
    pub fn take_text(&self) -> String {
        std::mem::take(&mut *self.text.lock())
    }

    /// Take and clear the latest error; empty when none is pending.
    pub fn take_error(&self) -> String {
        std::mem::take(&mut *self.error.lock())
    }
}
