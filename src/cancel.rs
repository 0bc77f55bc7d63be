//! Cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A shared flag a caller sets to ask a running fit to stop.
///
/// Clones share the same flag. Backends poll it at their natural checkpoints
/// (once per generation or iteration, or inside the residual callback) and
/// stop early; nothing is interrupted forcibly.
///
/// # Examples
///
/// ```
/// use eisfit_rs::cancel::CancellationToken;
///
/// let token = CancellationToken::new();
/// let shared = token.clone();
/// shared.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancel_requested: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancel_requested.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_requested.load(Ordering::Relaxed)
    }
}

/// Whether an optional token has been cancelled.
pub(crate) fn is_cancelled(token: Option<&CancellationToken>) -> bool {
    token.map_or(false, CancellationToken::is_cancelled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_cancel_is_visible_across_threads() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());

        let remote = token.clone();
        thread::spawn(move || remote.cancel()).join().unwrap();

        assert!(token.is_cancelled());
        assert!(is_cancelled(Some(&token)));
        assert!(!is_cancelled(None));
    }
}
