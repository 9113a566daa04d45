// src/config/mod.rs
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub feed: FeedConfig,
    pub traces: TracesConfig,
    pub spikes: SpikesConfig,
    pub viewer: ViewerConfig,
    pub sim: SimConfig,
    pub enable_debug_logging: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct FeedConfig {
    pub host: String,
    pub data_port: u16,
    pub heartbeat: bool,
    pub application_name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct TracesConfig {
    pub num_channels: usize,
    pub samples_per_trace: usize,
    pub window_size: usize,
    pub grid_rows: usize,
    pub grid_cols: usize,
    pub channels_per_cycle: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SpikesConfig {
    pub max_channels: usize,
    pub grid_channels: usize,
    pub start_offset: usize,
    pub max_events: usize,
    pub overlay_window: usize,
    pub redraw_interval_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SimConfig {
    /// Replay columns of this CSV as channels instead of synthesizing.
    pub csv_path: Option<String>,
    pub chunk_samples: usize,
    pub sample_rate: f64,
    pub sweep_interval_ms: u64,
    pub spike_chance_percent: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ViewerConfig {
    pub window_width: u32,
    pub window_height: u32,
    pub repaint_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed: FeedConfig::default(),
            traces: TracesConfig::default(),
            spikes: SpikesConfig::default(),
            viewer: ViewerConfig::default(),
            sim: SimConfig::default(),
            enable_debug_logging: false,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            data_port: 5556,
            heartbeat: true,
            application_name: "probe-scope".to_string(),
        }
    }
}

impl FeedConfig {
    /// Heartbeats go out on the port above the data port.
    pub fn event_port(&self) -> u16 {
        self.data_port + 1
    }
}

impl Default for TracesConfig {
    fn default() -> Self {
        Self {
            num_channels: 384,
            samples_per_trace: 1000,
            window_size: 30,
            grid_rows: 5,
            grid_cols: 6,
            channels_per_cycle: 384,
        }
    }
}

impl Default for SpikesConfig {
    fn default() -> Self {
        Self {
            max_channels: 384,
            grid_channels: 16,
            start_offset: 160,
            max_events: 1000,
            overlay_window: 500,
            redraw_interval_ms: 200,
        }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            csv_path: None,
            chunk_samples: 100,
            sample_rate: 30000.0,
            sweep_interval_ms: 10,
            spike_chance_percent: 20,
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window_width: 1500,
            window_height: 1000,
            repaint_interval_ms: 100,
        }
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, String> {
    let config_str =
        fs::read_to_string(path).map_err(|e| format!("Failed to read config file: {}", e))?;

    serde_yaml::from_str(&config_str).map_err(|e| format!("Failed to parse config file: {}", e))
}

pub fn save_config<P: AsRef<Path>>(config: &Config, path: P) -> Result<(), String> {
    let yaml =
        serde_yaml::to_string(config).map_err(|e| format!("Failed to serialize config: {}", e))?;

    fs::write(path, yaml).map_err(|e| format!("Failed to write config file: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_probe_geometry() {
        let config = Config::default();
        assert_eq!(config.traces.num_channels, 384);
        assert_eq!(config.traces.samples_per_trace, 1000);
        assert_eq!(config.traces.grid_rows * config.traces.grid_cols, 30);
        assert_eq!(config.spikes.grid_channels, 16);
        assert_eq!(config.feed.data_port, 5556);
        assert_eq!(config.feed.event_port(), 5557);
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let yaml = "feed:\n  host: rig-pc\n  data_port: 6000\ntraces:\n  window_size: 12\n";
        let config: Config = serde_yaml::from_str(yaml).expect("partial config should parse");
        assert_eq!(config.feed.host, "rig-pc");
        assert_eq!(config.feed.data_port, 6000);
        assert_eq!(config.traces.window_size, 12);
        // untouched sections keep their defaults
        assert_eq!(config.traces.num_channels, 384);
        assert_eq!(config.spikes.max_events, 1000);
    }

    #[test]
    fn round_trips_through_yaml() {
        let mut config = Config::default();
        config.feed.application_name = "bench-rig".to_string();
        config.spikes.start_offset = 32;

        let yaml = serde_yaml::to_string(&config).expect("serialize");
        let back: Config = serde_yaml::from_str(&yaml).expect("parse");
        assert_eq!(back.feed.application_name, "bench-rig");
        assert_eq!(back.spikes.start_offset, 32);
    }
}
