// src/buffers/spikes.rs

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One detected spike: which electrode fired, the sorter's unit id, and the
/// waveform snippet (one row per recorded channel).
#[derive(Debug, Clone, PartialEq)]
pub struct SpikeEvent {
    pub electrode: usize,
    pub sorted_id: u32,
    pub waveform: Vec<Vec<f32>>,
}

/// Everything one grid cell needs to draw: every waveform row from recent
/// spikes on that electrode, plus the average of their primary rows.
pub struct ChannelOverlay {
    pub traces: Vec<Vec<f32>>,
    pub average: Option<Vec<f32>>,
    pub spike_count: usize,
}

/// Capped store of the most recent spike events, oldest dropped first.
pub struct SpikeStore {
    max_events: usize,
    overlay_window: usize,
    events: VecDeque<SpikeEvent>,
}

impl SpikeStore {
    pub fn new(max_events: usize, overlay_window: usize) -> Self {
        Self {
            max_events,
            overlay_window,
            events: VecDeque::with_capacity(max_events),
        }
    }

    pub fn push(&mut self, event: SpikeEvent) {
        if self.events.len() == self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The slice of recent events the overlay draws from.
    fn recent(&self) -> impl Iterator<Item = &SpikeEvent> {
        let skip = self.events.len().saturating_sub(self.overlay_window);
        self.events.iter().skip(skip)
    }

    /// Collects the overlay for one electrode from the recent window.
    pub fn overlay(&self, electrode: usize) -> ChannelOverlay {
        let mut traces = Vec::new();
        let mut primaries: Vec<&[f32]> = Vec::new();
        let mut spike_count = 0;

        for event in self.recent().filter(|e| e.electrode == electrode) {
            spike_count += 1;
            for row in &event.waveform {
                traces.push(row.clone());
            }
            if let Some(first) = event.waveform.first() {
                primaries.push(first);
            }
        }

        ChannelOverlay {
            traces,
            average: mean_trace(&primaries),
            spike_count,
        }
    }

    /// How many recent spikes fall inside a window of consecutive electrodes.
    pub fn count_in_view(&self, offset: usize, span: usize) -> usize {
        self.recent()
            .filter(|e| e.electrode >= offset && e.electrode < offset + span)
            .count()
    }
}

/// Elementwise mean over slices, truncated to the shortest one.
fn mean_trace(rows: &[&[f32]]) -> Option<Vec<f32>> {
    let shortest = rows.iter().map(|r| r.len()).min()?;
    if shortest == 0 {
        return None;
    }

    let mut sums = vec![0.0f32; shortest];
    for row in rows {
        for (sum, value) in sums.iter_mut().zip(row.iter()) {
            *sum += value;
        }
    }
    let n = rows.len() as f32;
    for sum in &mut sums {
        *sum /= n;
    }
    Some(sums)
}

pub type SharedSpikes = Arc<Mutex<SpikeStore>>;

pub fn shared(max_events: usize, overlay_window: usize) -> SharedSpikes {
    Arc::new(Mutex::new(SpikeStore::new(max_events, overlay_window)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spike(electrode: usize, value: f32) -> SpikeEvent {
        SpikeEvent {
            electrode,
            sorted_id: 0,
            waveform: vec![vec![value; 8], vec![-value; 8]],
        }
    }

    #[test]
    fn store_caps_at_max_events() {
        let mut store = SpikeStore::new(3, 3);
        for i in 0..5 {
            store.push(spike(i, 1.0));
        }
        assert_eq!(store.len(), 3);
        // oldest two fell off
        assert_eq!(store.count_in_view(0, 2), 0);
        assert_eq!(store.count_in_view(2, 3), 3);
    }

    #[test]
    fn overlay_collects_all_waveform_rows() {
        let mut store = SpikeStore::new(10, 10);
        store.push(spike(5, 1.0));
        store.push(spike(5, 3.0));
        store.push(spike(6, 9.0));

        let overlay = store.overlay(5);
        assert_eq!(overlay.spike_count, 2);
        assert_eq!(overlay.traces.len(), 4); // two rows per event
        let average = overlay.average.expect("average of primary rows");
        assert_eq!(average, vec![2.0; 8]);
    }

    #[test]
    fn overlay_ignores_events_outside_the_window() {
        let mut store = SpikeStore::new(10, 2);
        store.push(spike(1, 100.0));
        store.push(spike(1, 1.0));
        store.push(spike(1, 3.0));

        let overlay = store.overlay(1);
        assert_eq!(overlay.spike_count, 2);
        assert_eq!(overlay.average.expect("average"), vec![2.0; 8]);
    }

    #[test]
    fn empty_channel_yields_no_average() {
        let store = SpikeStore::new(4, 4);
        let overlay = store.overlay(0);
        assert!(overlay.traces.is_empty());
        assert!(overlay.average.is_none());
        assert_eq!(overlay.spike_count, 0);
    }

    #[test]
    fn mean_trace_truncates_to_shortest_row() {
        let a = [1.0f32, 2.0, 3.0];
        let b = [3.0f32, 4.0];
        let mean = mean_trace(&[&a, &b]).expect("mean");
        assert_eq!(mean, vec![2.0, 3.0]);
    }

    #[test]
    fn view_count_matches_electrode_range() {
        let mut store = SpikeStore::new(10, 10);
        store.push(spike(159, 1.0));
        store.push(spike(160, 1.0));
        store.push(spike(175, 1.0));
        store.push(spike(176, 1.0));

        assert_eq!(store.count_in_view(160, 16), 2);
    }
}
