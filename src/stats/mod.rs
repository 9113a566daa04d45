// src/stats/mod.rs
//
// Console rate statistics for the trace feed. Mirrors what the acquisition
// console shows: once per second, how many full channel sweeps and how many
// samples arrived, and the average sampling rate the headers claimed.

use colored::Colorize;
use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::utils::log::log_csv;

const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// One closed reporting interval.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalReport {
    pub elapsed_secs: f64,
    pub cycles: u32,
    pub samples: u64,
    pub avg_sample_rate: f64,
}

pub struct RateStatistics {
    channels_per_cycle: usize,
    seen_channels: HashSet<usize>,
    cycles: u32,
    samples: u64,
    rate_sum: f64,
    rate_count: u64,
    interval_start: Instant,
    header_printed: bool,
    debug_csv: bool,
}

impl RateStatistics {
    pub fn new(channels_per_cycle: usize, debug_csv: bool) -> Self {
        Self {
            channels_per_cycle,
            seen_channels: HashSet::with_capacity(channels_per_cycle),
            cycles: 0,
            samples: 0,
            rate_sum: 0.0,
            rate_count: 0,
            interval_start: Instant::now(),
            header_printed: false,
            debug_csv,
        }
    }

    /// Feeds one data message into the counters. A cycle completes when every
    /// distinct channel of the probe has reported since the last completion.
    pub fn record(&mut self, channel: usize, num_samples: usize, sample_rate: f64) {
        self.samples += num_samples as u64;
        self.rate_sum += sample_rate;
        self.rate_count += 1;

        self.seen_channels.insert(channel);
        if self.seen_channels.len() == self.channels_per_cycle {
            self.cycles += 1;
            self.seen_channels.clear();
        }
    }

    /// Closes the interval and resets counters if at least a second passed.
    pub fn tick(&mut self) -> Option<IntervalReport> {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> Option<IntervalReport> {
        let elapsed = now.duration_since(self.interval_start);
        if elapsed < REPORT_INTERVAL {
            return None;
        }

        let report = IntervalReport {
            elapsed_secs: elapsed.as_secs_f64(),
            cycles: self.cycles,
            samples: self.samples,
            avg_sample_rate: if self.rate_count > 0 {
                self.rate_sum / self.rate_count as f64
            } else {
                0.0
            },
        };

        self.cycles = 0;
        self.samples = 0;
        self.rate_sum = 0.0;
        self.rate_count = 0;
        self.interval_start = now;

        Some(report)
    }

    /// Prints one report row, with the table header the first time through.
    pub fn print(&mut self, report: &IntervalReport) {
        if !self.header_printed {
            println!(
                "{:>12} | {:>10} | {:>15} | {:>12}",
                "Elapsed (s)".bold(),
                "Cycles/sec".bold(),
                "Samples/sec".bold(),
                "Avg rate (Hz)".bold()
            );
            println!("{}", "-".repeat(60));
            self.header_printed = true;
        }

        println!(
            "{:>12.2} | {:>10} | {:>15} | {:>12.1}",
            report.elapsed_secs, report.cycles, report.samples, report.avg_sample_rate
        );

        if self.debug_csv {
            let _ = log_csv(
                "trace_rates.csv",
                &["elapsed_s", "cycles", "samples", "avg_rate_hz"],
                &[
                    &format!("{:.3}", report.elapsed_secs),
                    &report.cycles.to_string(),
                    &report.samples.to_string(),
                    &format!("{:.1}", report.avg_sample_rate),
                ],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_completes_on_distinct_channels_only() {
        let mut stats = RateStatistics::new(3, false);
        stats.record(0, 10, 30000.0);
        stats.record(0, 10, 30000.0); // repeat does not advance the sweep
        stats.record(1, 10, 30000.0);
        assert_eq!(stats.cycles, 0);

        stats.record(2, 10, 30000.0);
        assert_eq!(stats.cycles, 1);

        // the tracking set was cleared for the next sweep
        stats.record(0, 10, 30000.0);
        assert_eq!(stats.cycles, 1);
    }

    #[test]
    fn tick_before_interval_reports_nothing() {
        let mut stats = RateStatistics::new(4, false);
        stats.record(0, 100, 30000.0);
        let now = stats.interval_start + Duration::from_millis(200);
        assert!(stats.tick_at(now).is_none());
        // counters survive until the interval closes
        assert_eq!(stats.samples, 100);
    }

    #[test]
    fn closing_an_interval_resets_counters() {
        let mut stats = RateStatistics::new(2, false);
        stats.record(0, 100, 20000.0);
        stats.record(1, 100, 40000.0);

        let now = stats.interval_start + Duration::from_secs(2);
        let report = stats.tick_at(now).expect("interval closed");
        assert_eq!(report.cycles, 1);
        assert_eq!(report.samples, 200);
        assert_eq!(report.avg_sample_rate, 30000.0);
        assert!((report.elapsed_secs - 2.0).abs() < 1e-9);

        // fresh interval
        assert_eq!(stats.samples, 0);
        assert_eq!(stats.cycles, 0);
        let later = now + Duration::from_secs(1);
        let empty = stats.tick_at(later).expect("next interval closed");
        assert_eq!(empty.samples, 0);
        assert_eq!(empty.avg_sample_rate, 0.0);
    }
}
