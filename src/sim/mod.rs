// src/sim/mod.rs
//
// Local feed simulator so both viewers run without an acquisition rig. Binds
// the data port, serves every subscriber from its own thread, and either
// synthesizes per-channel signals or replays CSV columns. A second listener
// on the event port prints client heartbeats the way the acquisition GUI
// lists connected apps.

use colored::Colorize;
use rand::rngs::ThreadRng;
use rand::Rng;
use std::error::Error;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::Config;
use crate::feed::message::{encode_data, encode_spike};
use crate::feed::subscriber::write_message;

// -----------------------------------------------------------------------------
// SIMULATED SIGNAL RECIPE
// -----------------------------------------------------------------------------

const BASELINE_AMPLITUDE: f32 = 70.0;
const SLOW_DRIFT_FREQ: f32 = 0.5;
const FIELD_POTENTIAL_FREQ: f32 = 4.0;
const RIPPLE_FREQ: f32 = 140.0;

const SPIKE_ROWS: usize = 4;
const SPIKE_SAMPLES: usize = 48;

pub fn run(config: &Config) -> Result<(), String> {
    let event_listener = TcpListener::bind(("0.0.0.0", config.feed.event_port()))
        .map_err(|e| format!("Failed to bind event port: {}", e))?;
    thread::spawn(move || heartbeat_listener(event_listener));

    let listener = TcpListener::bind(("0.0.0.0", config.feed.data_port))
        .map_err(|e| format!("Failed to bind data port: {}", e))?;
    println!(
        "{}",
        format!("Simulated feed on port {}", config.feed.data_port).green()
    );

    let replay: Option<Arc<Vec<Vec<f32>>>> = match &config.sim.csv_path {
        Some(path) => Some(Arc::new(
            read_signals_from_csv(path).map_err(|e| format!("Failed to read {}: {}", path, e))?,
        )),
        None => None,
    };

    for stream in listener.incoming() {
        let stream = stream.map_err(|e| format!("Accept failed: {}", e))?;
        if let Ok(peer) = stream.peer_addr() {
            println!("Subscriber connected: {}", peer);
        }

        let config = config.clone();
        let replay = replay.clone();
        thread::spawn(move || {
            let result = match replay {
                Some(signals) => replay_loop(stream, &config, &signals),
                None => simulated_loop(stream, &config),
            };
            if let Err(e) = result {
                println!("{}", format!("Subscriber dropped: {}", e).yellow());
            }
        });
    }

    Ok(())
}

// -----------------------------------------------------------------------------
// SIMULATED MODE
// -----------------------------------------------------------------------------

fn simulated_loop(mut stream: TcpStream, config: &Config) -> std::io::Result<()> {
    let mut rng = rand::thread_rng();
    let num_channels = config.traces.num_channels;
    let chunk = config.sim.chunk_samples;
    let dt = 1.0 / config.sim.sample_rate as f32;
    let mut time = 0.0f32;

    loop {
        for channel in 0..num_channels {
            let samples = synth_chunk(channel, time, chunk, dt, &mut rng);
            write_message(
                &mut stream,
                &encode_data(channel, config.sim.sample_rate, &samples),
            )?;
        }

        if rng.gen_range(0..100) < config.sim.spike_chance_percent {
            let electrode = rng.gen_range(0..num_channels);
            let sorted_id = rng.gen_range(1..4);
            let waveform = synth_spike(&mut rng);
            write_message(&mut stream, &encode_spike(electrode, sorted_id, &waveform))?;
        }

        thread::sleep(Duration::from_millis(config.sim.sweep_interval_ms));
        time += chunk as f32 * dt;
    }
}

/// One chunk of background signal: slow drift plus a field-potential band and
/// a faint ripple, phase-shifted per channel, with random noise on top.
fn synth_chunk(
    channel: usize,
    start_time: f32,
    num_samples: usize,
    dt: f32,
    rng: &mut ThreadRng,
) -> Vec<f32> {
    let phase = channel as f32 * 0.37;
    let tau = 2.0 * std::f32::consts::PI;

    (0..num_samples)
        .map(|i| {
            let t = start_time + i as f32 * dt;
            let noise = rng.gen_range(-10.0..10.0);
            BASELINE_AMPLITUDE / 2.0 * (tau * SLOW_DRIFT_FREQ * t + phase).sin()
                + 10.0 * (tau * FIELD_POTENTIAL_FREQ * t + phase).sin()
                + 5.0 * (tau * RIPPLE_FREQ * t).sin()
                + noise
        })
        .collect()
}

/// A burst waveform: damped oscillation on the primary row, attenuated copies
/// on the neighbor rows.
fn synth_spike(rng: &mut ThreadRng) -> Vec<Vec<f32>> {
    let amplitude = rng.gen_range(40.0..90.0f32);
    let tau = 2.0 * std::f32::consts::PI;

    let primary: Vec<f32> = (0..SPIKE_SAMPLES)
        .map(|i| {
            let t = i as f32 / SPIKE_SAMPLES as f32;
            let decay = (-4.0 * t).exp();
            -amplitude * decay * (tau * 1.5 * t).sin() + rng.gen_range(-3.0..3.0)
        })
        .collect();

    (0..SPIKE_ROWS)
        .map(|row| {
            let attenuation = 1.0 / (1.0 + row as f32);
            primary.iter().map(|v| v * attenuation).collect()
        })
        .collect()
}

// -----------------------------------------------------------------------------
// CSV REPLAY MODE
// -----------------------------------------------------------------------------

/// Reads a CSV of samples, one column per channel, one row per time step.
fn read_signals_from_csv(file_path: &str) -> Result<Vec<Vec<f32>>, Box<dyn Error>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(File::open(file_path)?);

    let mut data: Vec<Vec<f32>> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if data.is_empty() {
            data = vec![Vec::new(); record.len()];
        }
        for (index, value) in record.iter().enumerate() {
            if index < data.len() {
                data[index].push(value.trim().parse()?);
            }
        }
    }

    if data.is_empty() || data[0].is_empty() {
        return Err("CSV contained no samples".into());
    }
    Ok(data)
}

/// Streams CSV columns as channels, looping from the top when the file runs
/// out.
fn replay_loop(
    mut stream: TcpStream,
    config: &Config,
    signals: &[Vec<f32>],
) -> std::io::Result<()> {
    let chunk = config.sim.chunk_samples;
    let total = signals[0].len();
    let mut cursor = 0usize;

    loop {
        for (channel, column) in signals.iter().enumerate() {
            let samples: Vec<f32> = (0..chunk)
                .map(|i| column[(cursor + i) % total])
                .collect();
            write_message(
                &mut stream,
                &encode_data(channel, config.sim.sample_rate, &samples),
            )?;
        }

        cursor = (cursor + chunk) % total;
        thread::sleep(Duration::from_millis(config.sim.sweep_interval_ms));
    }
}

// -----------------------------------------------------------------------------
// HEARTBEAT LISTENER
// -----------------------------------------------------------------------------

/// Accepts heartbeat connections and prints which applications are alive.
fn heartbeat_listener(listener: TcpListener) {
    for stream in listener.incoming() {
        let Ok(stream) = stream else { continue };
        thread::spawn(move || {
            let mut name = String::from("unknown");
            let reader = BufReader::new(stream);
            for line in reader.lines() {
                let Ok(line) = line else { break };
                if let Ok(beat) = serde_json::from_str::<serde_json::Value>(&line) {
                    if let Some(app) = beat.get("application").and_then(|v| v.as_str()) {
                        if name != app {
                            name = app.to_string();
                            println!("{}", format!("App alive: {}", name).green());
                        }
                    }
                }
            }
            println!("{}", format!("App lost: {}", name).red());
        });
    }
}
