// src/feed/heartbeat.rs
//
// Best-effort client registration. The acquisition GUI lists connected
// applications and marks them alive while heartbeats keep arriving on the
// event port. Losing the heartbeat connection never disturbs the data path:
// the thread logs once and retires.

use rand::Rng;
use serde_json::json;
use std::io::Write;
use std::net::TcpStream;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::utils::log::log_to_file;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(2);

/// Random session id so the acquisition side can tell two instances of the
/// same application apart.
fn session_uuid() -> String {
    let mut rng = rand::thread_rng();
    (0..32)
        .map(|_| format!("{:x}", rng.gen_range(0..16)))
        .collect()
}

pub fn spawn(host: String, port: u16, application: String) -> JoinHandle<()> {
    thread::spawn(move || {
        let uuid = session_uuid();
        let mut stream = match TcpStream::connect((host.as_str(), port)) {
            Ok(stream) => stream,
            Err(e) => {
                let _ = log_to_file(
                    "heartbeat.log",
                    &format!("No heartbeat listener on {}:{} ({})", host, port, e),
                );
                return;
            }
        };

        let beat = json!({
            "application": application,
            "uuid": uuid,
            "type": "heartbeat",
        })
        .to_string();

        loop {
            if writeln!(stream, "{}", beat).is_err() {
                let _ = log_to_file("heartbeat.log", "Heartbeat connection lost");
                return;
            }
            thread::sleep(HEARTBEAT_INTERVAL);
        }
    })
}
