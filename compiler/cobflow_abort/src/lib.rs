//! Contains the definition of [`Abort`] and [`Cancellation`].

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// The translation was cancelled from the outside and cannot continue.
///
/// The error is never caught inside the translator; it travels up through every
/// level of the descent until it reaches whoever requested the cancellation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    thiserror::Error,
)]
#[error("the translation was cancelled and cannot continue")]
pub struct Abort;

impl From<Abort> for std::fmt::Error {
    fn from(Abort: Abort) -> Self { Self }
}

/// A cooperative cancellation token.
///
/// Clones share the same flag: cancelling any clone is observed by all of
/// them. The token is polled with [`Cancellation::check`] at the start of every
/// descent step.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    cancelled: Arc<AtomicBool>,
}

impl Cancellation {
    /// Creates a new token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Requests the cancellation. It can't be undone.
    pub fn cancel(&self) { self.cancelled.store(true, Ordering::Relaxed); }

    /// Returns `true` if [`Cancellation::cancel`] has been called on this token
    /// or any of its clones.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Polls the token.
    ///
    /// # Errors
    ///
    /// Returns [`Abort`] once the cancellation has been requested.
    pub fn check(&self) -> Result<(), Abort> {
        if self.is_cancelled() {
            Err(Abort)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Abort, Cancellation};

    #[test]
    fn clones_share_the_flag() {
        let token = Cancellation::new();
        let clone = token.clone();

        assert_eq!(clone.check(), Ok(()));

        token.cancel();

        assert!(clone.is_cancelled());
        assert_eq!(clone.check(), Err(Abort));
    }
}
