// src/buffers/traces.rs

use std::sync::{Arc, Mutex};

/// Fixed-size rolling history of the most recent samples on every channel.
///
/// One pre-allocated row per channel; each incoming chunk shifts its row left
/// and lands at the tail, so a row always reads oldest-to-newest.
pub struct TraceStore {
    num_channels: usize,
    samples_per_trace: usize,
    rows: Vec<Vec<f32>>,
}

impl TraceStore {
    pub fn new(num_channels: usize, samples_per_trace: usize) -> Self {
        Self {
            num_channels,
            samples_per_trace,
            rows: vec![vec![0.0; samples_per_trace]; num_channels],
        }
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    pub fn samples_per_trace(&self) -> usize {
        self.samples_per_trace
    }

    /// Appends a chunk to one channel's history. Returns false when the
    /// channel index is outside the probe instead of panicking, so a stray
    /// header cannot take the receive loop down.
    pub fn push(&mut self, channel: usize, samples: &[f32]) -> bool {
        let Some(row) = self.rows.get_mut(channel) else {
            return false;
        };

        let n = samples.len();
        if n >= self.samples_per_trace {
            // Chunk covers the whole row: keep only its tail.
            row.copy_from_slice(&samples[n - self.samples_per_trace..]);
        } else {
            row.copy_within(n.., 0);
            row[self.samples_per_trace - n..].copy_from_slice(samples);
        }
        true
    }

    pub fn row(&self, channel: usize) -> Option<&[f32]> {
        self.rows.get(channel).map(Vec::as_slice)
    }

    /// Largest valid start for a window of `window_size` channels.
    pub fn max_start(&self, window_size: usize) -> usize {
        self.num_channels.saturating_sub(window_size)
    }
}

pub type SharedTraces = Arc<Mutex<TraceStore>>;

pub fn shared(num_channels: usize, samples_per_trace: usize) -> SharedTraces {
    Arc::new(Mutex::new(TraceStore::new(num_channels, samples_per_trace)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_chunk_shifts_left_and_appends() {
        let mut store = TraceStore::new(4, 6);
        store.push(2, &[1.0, 2.0, 3.0]);
        store.push(2, &[4.0, 5.0]);

        assert_eq!(store.row(2).unwrap(), &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        // other channels untouched
        assert_eq!(store.row(0).unwrap(), &[0.0; 6]);
    }

    #[test]
    fn oversized_chunk_keeps_its_tail() {
        let mut store = TraceStore::new(1, 4);
        let chunk: Vec<f32> = (0..10).map(|i| i as f32).collect();
        store.push(0, &chunk);

        assert_eq!(store.row(0).unwrap(), &[6.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn exact_chunk_replaces_the_row() {
        let mut store = TraceStore::new(1, 4);
        store.push(0, &[9.0, 9.0, 9.0, 9.0]);
        store.push(0, &[1.0, 2.0, 3.0, 4.0]);

        assert_eq!(store.row(0).unwrap(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn out_of_range_channel_is_rejected() {
        let mut store = TraceStore::new(8, 4);
        assert!(!store.push(8, &[1.0]));
        assert!(store.row(8).is_none());
    }

    #[test]
    fn window_start_clamps_to_probe_size() {
        let store = TraceStore::new(384, 10);
        assert_eq!(store.max_start(30), 354);
        assert_eq!(store.max_start(384), 0);
        assert_eq!(store.max_start(500), 0);
    }
}
