// src/client/traces.rs
//
// Receive loop and wiring for the rolling trace viewer: one worker thread
// blocks on the feed and fills the shared trace store while the GUI owns the
// main thread.

use colored::Colorize;
use std::io;
use std::sync::Arc;
use std::thread;

use super::{PAUSE_POLL, READ_TIMEOUT};
use crate::buffers::traces::{self, SharedTraces};
use crate::config::Config;
use crate::feed::heartbeat;
use crate::feed::message::{decode_message, Decoded};
use crate::feed::subscriber::Subscriber;
use crate::stats::RateStatistics;
use crate::utils::log::log_to_file;
use crate::viewer::{traces::TraceGridWindow, ControlFlags};

pub fn run(config: &Config) -> Result<(), String> {
    let store = traces::shared(config.traces.num_channels, config.traces.samples_per_trace);
    let flags = ControlFlags::new();

    if config.feed.heartbeat {
        heartbeat::spawn(
            config.feed.host.clone(),
            config.feed.event_port(),
            config.feed.application_name.clone(),
        );
    }

    println!(
        "{}",
        format!(
            "Probe trace viewer started, feed at {}:{}",
            config.feed.host, config.feed.data_port
        )
        .green()
    );

    let rx_store = Arc::clone(&store);
    let rx_flags = Arc::clone(&flags);
    let rx_config = config.clone();
    let feed_thread = thread::spawn(move || {
        if let Err(e) = receive_loop(rx_store, rx_flags, &rx_config) {
            eprintln!("{}", format!("Feed stopped: {}", e).red());
        }
    });

    let result = TraceGridWindow::run(store, Arc::clone(&flags), config).map_err(|e| e.to_string());

    flags.stop();
    let _ = feed_thread.join();
    result
}

fn receive_loop(store: SharedTraces, flags: Arc<ControlFlags>, config: &Config) -> io::Result<()> {
    let mut subscriber = Subscriber::connect(&config.feed.host, config.feed.data_port)?;
    subscriber.set_read_timeout(READ_TIMEOUT)?;

    let mut stats = RateStatistics::new(
        config.traces.channels_per_cycle,
        config.enable_debug_logging,
    );
    let mut retried = false;

    while flags.is_running() {
        if flags.is_paused() {
            thread::sleep(PAUSE_POLL);
            continue;
        }

        let parts = match subscriber.recv() {
            Ok(parts) => {
                retried = false;
                parts
            }
            Err(e) if is_idle(&e) => continue,
            Err(e) => {
                // Single retry: reconnect once, a second failure ends the loop.
                if retried {
                    return Err(e);
                }
                eprintln!(
                    "{}",
                    format!("Feed read failed ({}), reconnecting", e).yellow()
                );
                retried = true;
                subscriber.reconnect()?;
                subscriber.set_read_timeout(READ_TIMEOUT)?;
                continue;
            }
        };

        match decode_message(&parts) {
            Ok(Decoded::Data {
                channel,
                sample_rate,
                samples,
            }) => {
                stats.record(channel, samples.len(), sample_rate);
                if !store.lock().unwrap().push(channel, &samples) {
                    eprintln!(
                        "{}",
                        format!("Channel {} outside the configured probe", channel).yellow()
                    );
                }
                if let Some(report) = stats.tick() {
                    stats.print(&report);
                }
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}", e.yellow());
                if config.enable_debug_logging {
                    let _ = log_to_file("trace_feed.log", &e);
                }
            }
        }
    }

    Ok(())
}

pub(crate) fn is_idle(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}
