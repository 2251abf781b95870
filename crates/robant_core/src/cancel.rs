//! Cooperative cancellation and deadlines for one load cycle.
//!
//! # Responsibility
//! - Carry the caller's cancellation request into the loader walk and the
//!   integration imports, the only two places that perform I/O.
//!
//! # Invariants
//! - Cancellation is sticky: once tripped a token never resets.
//! - Clones share the same flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation for every holder of this token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Reason a bounded operation stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    Cancelled,
    TimedOut,
}

/// Caller-supplied bounds for one load cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleLimits {
    /// Cancels the whole cycle when tripped.
    pub cancel: CancelToken,
    /// Absolute deadline for the whole cycle.
    pub deadline: Option<Instant>,
}

impl CycleLimits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a deadline relative to now.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Returns why the cycle must stop, if it must.
    ///
    /// Cancellation wins over an expired deadline.
    pub fn interruption(&self) -> Option<Interruption> {
        if self.cancel.is_cancelled() {
            return Some(Interruption::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Interruption::TimedOut),
            _ => None,
        }
    }

    /// Earliest of the cycle deadline and `now + budget`.
    pub fn bounded_deadline(&self, budget: Duration) -> Instant {
        let local = Instant::now() + budget;
        match self.deadline {
            Some(deadline) if deadline < local => deadline,
            _ => local,
        }
    }
}
