//! Shared poller state
//!
//! The running flag and counters are the only state shared between the poll
//! loop and its concurrent per-message tasks, so they are plain atomics.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub(crate) struct PollerState {
    running: AtomicBool,
    in_flight: AtomicUsize,
    last_batch_size: AtomicUsize,
    /// Bumped on every start/resume; a loop only keeps going while its
    /// session is the current one
    session: AtomicU64,
}

impl PollerState {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Sets the running flag, returning false if it was already set
    pub fn begin(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Clears the running flag, returning false if it was already clear
    pub fn halt(&self) -> bool {
        self.running.swap(false, Ordering::SeqCst)
    }

    /// Starts a new session and returns its id
    pub fn next_session(&self) -> u64 {
        self.session.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether a loop belonging to `session` should schedule another iteration
    pub fn is_current(&self, session: u64) -> bool {
        self.is_running() && self.session.load(Ordering::SeqCst) == session
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn last_batch_size(&self) -> usize {
        self.last_batch_size.load(Ordering::SeqCst)
    }

    pub fn record_batch(&self, size: usize) {
        self.last_batch_size.store(size, Ordering::SeqCst);
    }
}

/// In-flight accounting for fetched messages
///
/// Admitting a batch bumps the counter once; dropping the guard releases its
/// share exactly once, whichever path (success, failure, panic) ends the work.
#[derive(Debug)]
pub(crate) struct InFlight {
    state: Arc<PollerState>,
    count: usize,
}

impl InFlight {
    pub fn admit(state: &Arc<PollerState>, count: usize) -> Self {
        state.in_flight.fetch_add(count, Ordering::SeqCst);
        Self {
            state: Arc::clone(state),
            count,
        }
    }

    /// Splits the guard into one guard per message
    pub fn into_units(mut self) -> Vec<InFlight> {
        let count = std::mem::take(&mut self.count);
        (0..count)
            .map(|_| InFlight {
                state: Arc::clone(&self.state),
                count: 1,
            })
            .collect()
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.count > 0 {
            self.state.in_flight.fetch_sub(self.count, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = PollerState::default();
        assert!(!state.is_running());
        assert_eq!(state.in_flight(), 0);
        assert_eq!(state.last_batch_size(), 0);
    }

    #[test]
    fn test_running_transitions() {
        let state = PollerState::default();
        assert!(state.begin());
        assert!(!state.begin());
        assert!(state.halt());
        assert!(!state.halt());
    }

    #[test]
    fn test_session_tracking() {
        let state = PollerState::default();
        state.begin();
        let first = state.next_session();
        assert!(state.is_current(first));

        let second = state.next_session();
        assert!(!state.is_current(first));
        assert!(state.is_current(second));

        state.halt();
        assert!(!state.is_current(second));
    }

    #[test]
    fn test_in_flight_guard_releases_once() {
        let state = Arc::new(PollerState::default());

        let batch = InFlight::admit(&state, 4);
        assert_eq!(state.in_flight(), 4);

        let mut units = batch.into_units();
        assert_eq!(units.len(), 4);
        assert_eq!(state.in_flight(), 4);

        units.pop();
        assert_eq!(state.in_flight(), 3);

        drop(units);
        assert_eq!(state.in_flight(), 0);
    }

    #[test]
    fn test_in_flight_guard_released_on_panic() {
        let state = Arc::new(PollerState::default());
        let guard = InFlight::admit(&state, 2);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = guard;
            panic!("handler blew up");
        }));

        assert!(result.is_err());
        assert_eq!(state.in_flight(), 0);
    }
}
