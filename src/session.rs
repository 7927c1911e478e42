//! Conversational session state
//!
//! A single process-wide awake flag. Set when the wake word arrives without
//! a trailing command, cleared after the next utterance is dispatched.

use std::sync::atomic::{AtomicBool, Ordering};

/// Shared wake-word session state
///
/// There is at most one pending "awake, no command yet" state process-wide,
/// regardless of which capture source or client woke the assistant.
#[derive(Debug, Default)]
pub struct SessionState {
    awake: AtomicBool,
}

impl SessionState {
    /// Create a new session in the idle state
    #[must_use]
    pub const fn new() -> Self {
        Self {
            awake: AtomicBool::new(false),
        }
    }

    /// Whether a wake word was heard and a command is expected
    #[must_use]
    pub fn is_awake(&self) -> bool {
        self.awake.load(Ordering::SeqCst)
    }

    /// Mark the session awake (wake word with no trailing command)
    pub fn wake(&self) {
        self.awake.store(true, Ordering::SeqCst);
    }

    /// Clear the awake flag (a turn completed)
    pub fn sleep(&self) {
        self.awake.store(false, Ordering::SeqCst);
    }
}
