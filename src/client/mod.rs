// src/client/mod.rs

pub mod spikes;
pub mod traces;

use std::time::Duration;

/// How long a paused receive loop sleeps between flag polls.
pub(crate) const PAUSE_POLL: Duration = Duration::from_millis(100);

/// Read timeout on the feed socket, so a quiet feed still lets the loop
/// notice pause and quit flags.
pub(crate) const READ_TIMEOUT: Duration = Duration::from_millis(500);
