//! Pause gate
//!
//! Synchronous gate the decode thread passes through between chunks. Pausing
//! arms the gate; the decode thread parks on it at its next chunk boundary
//! and stays parked until the gate reopens. Stop forces the gate open so a
//! paused session can still be torn down.

use std::sync::{Condvar, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    /// Samples flow freely.
    Open,
    /// Pause requested; the decode thread will block at its next boundary.
    Armed,
    /// The decode thread is parked on the gate.
    Blocked,
}

/// Tri-state gate between the decode loop and pause control.
#[derive(Debug)]
pub struct PauseGate {
    state: Mutex<GateState>,
    cv: Condvar,
}

impl Default for PauseGate {
    fn default() -> Self {
        Self::new()
    }
}

impl PauseGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState::Open),
            cv: Condvar::new(),
        }
    }

    /// Toggle the gate. Returns the new paused-ness: `true` if the gate is
    /// now armed/closed, `false` if it reopened.
    pub fn toggle(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        match *state {
            GateState::Open => {
                *state = GateState::Armed;
                true
            }
            GateState::Armed | GateState::Blocked => {
                *state = GateState::Open;
                self.cv.notify_one();
                false
            }
        }
    }

    /// Called by the decode thread at each chunk boundary. Blocks while the
    /// gate is armed, returns immediately while it is open.
    pub fn wait_if_armed(&self) {
        let mut state = self.state.lock().unwrap();
        if *state == GateState::Open {
            return;
        }
        *state = GateState::Blocked;
        while *state != GateState::Open {
            state = self.cv.wait(state).unwrap();
        }
    }

    /// Unconditionally open the gate, releasing a parked decode thread.
    /// Used during session teardown.
    pub fn force_open(&self) {
        let mut state = self.state.lock().unwrap();
        *state = GateState::Open;
        self.cv.notify_all();
    }

    /// True if a pause is requested or in effect.
    pub fn is_armed(&self) -> bool {
        *self.state.lock().unwrap() != GateState::Open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn toggle_alternates() {
        let gate = PauseGate::new();
        assert!(!gate.is_armed());
        assert!(gate.toggle());
        assert!(gate.is_armed());
        assert!(!gate.toggle());
        assert!(!gate.is_armed());
    }

    #[test]
    fn open_gate_does_not_block() {
        let gate = PauseGate::new();
        gate.wait_if_armed(); // returns immediately
    }

    #[test]
    fn armed_gate_blocks_until_reopened() {
        let gate = Arc::new(PauseGate::new());
        let passed = Arc::new(AtomicBool::new(false));

        gate.toggle();

        let g = Arc::clone(&gate);
        let p = Arc::clone(&passed);
        let handle = thread::spawn(move || {
            g.wait_if_armed();
            p.store(true, Ordering::SeqCst);
        });

        thread::sleep(Duration::from_millis(50));
        assert!(!passed.load(Ordering::SeqCst));

        gate.toggle();
        handle.join().unwrap();
        assert!(passed.load(Ordering::SeqCst));
    }

    #[test]
    fn force_open_releases_parked_thread() {
        let gate = Arc::new(PauseGate::new());
        gate.toggle();

        let g = Arc::clone(&gate);
        let handle = thread::spawn(move || g.wait_if_armed());

        thread::sleep(Duration::from_millis(50));
        gate.force_open();
        handle.join().unwrap();
        assert!(!gate.is_armed());
    }
}
