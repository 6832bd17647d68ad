//! Typing presence: outbound debounce and the inbound status line.
//!
//! The local side holds a single idle deadline. A keystroke while idle
//! signals `typing=true`; every keystroke pushes the deadline out; the
//! deadline passing signals `typing=false`. The event loop sleeps until
//! [`PresenceSignaler::deadline`] and then calls [`PresenceSignaler::poll`].

use std::time::{Duration, Instant};

/// Idle window after the last keystroke before `typing=false` is sent.
pub const DEFAULT_TYPING_IDLE: Duration = Duration::from_millis(2000);

/// Debounced local typing state plus the remote typing label.
#[derive(Debug)]
pub struct PresenceSignaler {
    idle: Duration,
    typing: bool,
    deadline: Option<Instant>,
    remote_label: String,
}

impl PresenceSignaler {
    /// Create a signaler with the given idle window.
    #[must_use]
    pub const fn new(idle: Duration) -> Self {
        Self {
            idle,
            typing: false,
            deadline: None,
            remote_label: String::new(),
        }
    }

    /// Whether `typing=true` is currently signaled.
    #[must_use]
    pub const fn is_typing(&self) -> bool {
        self.typing
    }

    /// When the pending `typing=false` fires, if one is scheduled.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The rendered remote typing line; empty when nobody is typing.
    #[must_use]
    pub fn remote_label(&self) -> &str {
        &self.remote_label
    }

    /// Record local input activity.
    ///
    /// Returns `Some(true)` when `typing=true` must be emitted, `None` when
    /// the signal is already up.
    pub fn input_changed(&mut self, now: Instant) -> Option<bool> {
        self.deadline = Some(now + self.idle);
        if self.typing {
            None
        } else {
            self.typing = true;
            Some(true)
        }
    }

    /// Fire the idle deadline if it has passed.
    ///
    /// Returns `Some(false)` exactly once per typing burst.
    pub fn poll(&mut self, now: Instant) -> Option<bool> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.typing = false;
                Some(false)
            }
            _ => None,
        }
    }

    /// A message was sent: cancel the deadline and drop the signal.
    ///
    /// The caller always emits `typing=false` alongside the message.
    pub const fn message_sent(&mut self) {
        self.deadline = None;
        self.typing = false;
    }

    /// Apply an inbound typing event. Only one remote typist is tracked.
    pub fn remote_typing(&mut self, sender_name: &str, is_typing: bool) {
        self.remote_label.clear();
        if is_typing {
            self.remote_label = format!("{sender_name} is typing...");
        }
    }

    /// Forget all typing state (entering a new room).
    pub fn reset(&mut self) {
        self.typing = false;
        self.deadline = None;
        self.remote_label.clear();
    }
}

impl Default for PresenceSignaler {
    fn default() -> Self {
        Self::new(DEFAULT_TYPING_IDLE)
    }
}
