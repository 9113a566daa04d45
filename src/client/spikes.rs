// src/client/spikes.rs

use colored::Colorize;
use std::io;
use std::sync::Arc;
use std::thread;

use super::traces::is_idle;
use super::{PAUSE_POLL, READ_TIMEOUT};
use crate::buffers::spikes::{self, SharedSpikes};
use crate::config::Config;
use crate::feed::heartbeat;
use crate::feed::message::{decode_message, Decoded};
use crate::feed::subscriber::Subscriber;
use crate::utils::log::log_to_file;
use crate::viewer::{spikes::SpikeGridWindow, ControlFlags};

pub fn run(config: &Config) -> Result<(), String> {
    let store = spikes::shared(config.spikes.max_events, config.spikes.overlay_window);
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
            "Spike viewer started, waiting for spikes from {}:{}",
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

    let result = SpikeGridWindow::run(store, Arc::clone(&flags), config).map_err(|e| e.to_string());

    flags.stop();
    let _ = feed_thread.join();
    result
}

fn receive_loop(store: SharedSpikes, flags: Arc<ControlFlags>, config: &Config) -> io::Result<()> {
    let mut subscriber = Subscriber::connect(&config.feed.host, config.feed.data_port)?;
    subscriber.set_read_timeout(READ_TIMEOUT)?;

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
            Ok(Decoded::Spike(event)) => {
                if config.enable_debug_logging {
                    let _ = log_to_file(
                        "spike_feed.log",
                        &format!(
                            "electrode={} sorted_id={} rows={}",
                            event.electrode,
                            event.sorted_id,
                            event.waveform.len()
                        ),
                    );
                }
                store.lock().unwrap().push(event);
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}", e.yellow());
                if config.enable_debug_logging {
                    let _ = log_to_file("spike_feed.log", &e);
                }
            }
        }
    }

    Ok(())
}
