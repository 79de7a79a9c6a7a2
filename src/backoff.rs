//! Exponential backoff for spin-wait loops.
//!
//! Contended CAS loops in the arrive/depart protocols use [`Backoff`] to
//! spread retries apart. The delay schedule is delegated to
//! [`crossbeam_utils::Backoff`]: each call to [`Backoff::backoff`] spins
//! for an exponentially growing number of pause cycles, and once the
//! delay outgrows the spin threshold every further call yields the thread
//! to the scheduler instead. The pause cycle lowers to the architectural
//! spin hint where one exists (PAUSE on x86, YIELD on ARM) and to a cheap
//! no-op elsewhere; correctness never depends on the exact duration of a
//! pause.
//!
//! The wrapper adds the reset-and-reuse surface the retry loops expect
//! and keeps the call sites independent of the delegate's API.

/// Per-call-site exponential backoff state.
///
/// Create one outside the retry loop, call [`backoff`](Self::backoff) on
/// each failed attempt, and [`reset`](Self::reset) after a success if the
/// same instance is reused.
///
/// ```rust
/// use snzi::backoff::Backoff;
///
/// let mut backoff = Backoff::new();
/// while !backoff.is_yielding() {
///     backoff.backoff();
/// }
///
/// backoff.reset();
/// assert!(!backoff.is_yielding());
/// ```
#[derive(Debug)]
pub struct Backoff {
    inner: crossbeam_utils::Backoff,
}

impl Backoff {
    /// A backoff at its initial delay.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: crossbeam_utils::Backoff::new(),
        }
    }

    /// Wait out the current delay and grow it for the next call.
    ///
    /// Spins for an exponentially growing number of pause cycles while
    /// the delay is below the yield threshold; past it every call becomes
    /// a cooperative yield to the scheduler.
    #[inline]
    pub fn backoff(&mut self) {
        self.inner.snooze();
    }

    /// Restore the initial delay.
    #[inline]
    pub fn reset(&mut self) {
        self.inner.reset();
    }

    /// Whether the delay has outgrown the spin phase, i.e. further calls
    /// yield instead of spinning.
    #[inline]
    #[must_use]
    pub fn is_yielding(&self) -> bool {
        self.inner.is_completed()
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Generous bound on the number of spin rounds before the delegate
    /// switches to yielding.
    const MAX_SPIN_ROUNDS: usize = 64;

    #[test]
    fn test_new_is_not_yielding() {
        let backoff = Backoff::new();
        assert!(!backoff.is_yielding());
    }

    #[test]
    fn test_delay_grows_into_yielding() {
        let mut backoff = Backoff::new();

        for _ in 0..MAX_SPIN_ROUNDS {
            if backoff.is_yielding() {
                break;
            }
            backoff.backoff();
        }

        assert!(backoff.is_yielding());

        // Further calls stay in yield mode.
        backoff.backoff();
        assert!(backoff.is_yielding());
    }

    #[test]
    fn test_reset_restores_spinning() {
        let mut backoff = Backoff::new();
        while !backoff.is_yielding() {
            backoff.backoff();
        }

        backoff.reset();
        assert!(!backoff.is_yielding());
    }

    #[test]
    fn test_default_matches_new() {
        assert!(!Backoff::default().is_yielding());
    }
}
