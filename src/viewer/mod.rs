// src/viewer/mod.rs

pub mod spikes;
pub mod traces;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Flags shared between a viewer window and its receive thread. The receive
/// loop polls these; pausing is a polling sleep, not a channel handshake.
pub struct ControlFlags {
    paused: AtomicBool,
    running: AtomicBool,
}

impl ControlFlags {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            paused: AtomicBool::new(false),
            running: AtomicBool::new(true),
        })
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::Relaxed);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::Relaxed);
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_start_running_and_unpaused() {
        let flags = ControlFlags::new();
        assert!(flags.is_running());
        assert!(!flags.is_paused());

        flags.pause();
        assert!(flags.is_paused());
        flags.resume();
        assert!(!flags.is_paused());

        flags.stop();
        assert!(!flags.is_running());
    }
}
