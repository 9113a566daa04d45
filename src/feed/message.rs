// src/feed/message.rs
//
// The feed carries framed multipart messages: an opaque envelope part, a JSON
// header part, and (for data and spike messages) a packed little-endian f32
// payload part. This module owns both directions: decoding for the viewers
// and encoding for the local simulator.

use serde::Deserialize;
use serde_json::json;

use crate::buffers::spikes::SpikeEvent;

/// Envelope tag on every published message. Clients ignore it; it exists so
/// the stream stays compatible with topic-filtering subscribers.
pub const ENVELOPE: &[u8] = b"probe";

/// One decoded feed message.
#[derive(Debug)]
pub enum Decoded {
    /// A chunk of continuous samples for one channel.
    Data {
        channel: usize,
        sample_rate: f64,
        samples: Vec<f32>,
    },
    /// One detected spike with its waveform snippet.
    Spike(SpikeEvent),
    /// Valid message of a type this client does not render.
    Skipped,
}

#[derive(Debug, Deserialize)]
struct Header {
    #[serde(rename = "type")]
    kind: String,
    content: Option<DataContent>,
    spike: Option<SpikeContent>,
}

#[derive(Debug, Deserialize)]
struct DataContent {
    #[serde(default)]
    num_samples: usize,
    #[serde(default)]
    channel_num: usize,
    #[serde(default)]
    sample_rate: f64,
}

#[derive(Debug, Deserialize)]
struct SpikeContent {
    electrode: ElectrodeField,
    #[serde(default)]
    sorted_id: u32,
    num_channels: usize,
    num_samples: usize,
}

/// The acquisition side labels spikes either with a bare electrode index or
/// with a display string like "Electrode 12".
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ElectrodeField {
    Index(usize),
    Name(String),
}

impl ElectrodeField {
    fn resolve(&self) -> Result<usize, String> {
        match self {
            ElectrodeField::Index(n) => Ok(*n),
            ElectrodeField::Name(name) => name
                .split_whitespace()
                .last()
                .and_then(|token| token.parse().ok())
                .ok_or_else(|| format!("Unparseable electrode label: {:?}", name)),
        }
    }
}

/// Decodes one multipart message into a renderable event.
///
/// Returns `Err` for malformed messages (missing parts, bad JSON, payload
/// length mismatches). Callers are expected to warn and keep receiving.
pub fn decode_message(parts: &[Vec<u8>]) -> Result<Decoded, String> {
    if parts.len() < 2 {
        return Err(format!("Message with {} part(s), need at least 2", parts.len()));
    }

    let header: Header = serde_json::from_slice(&parts[1])
        .map_err(|e| format!("Bad message header: {}", e))?;

    match header.kind.as_str() {
        "data" => {
            let content = header
                .content
                .ok_or_else(|| "Data message without content".to_string())?;
            let samples = decode_payload(parts.get(2).map(Vec::as_slice).unwrap_or(&[]));

            if samples.len() != content.num_samples {
                return Err(format!(
                    "Data mismatch Ch {}: expected {}, got {}",
                    content.channel_num,
                    content.num_samples,
                    samples.len()
                ));
            }

            Ok(Decoded::Data {
                channel: content.channel_num,
                sample_rate: content.sample_rate,
                samples,
            })
        }
        "spike" => {
            let content = header
                .spike
                .ok_or_else(|| "Spike message without spike block".to_string())?;
            let electrode = content.electrode.resolve()?;
            let samples = decode_payload(parts.get(2).map(Vec::as_slice).unwrap_or(&[]));

            let expected = content.num_channels * content.num_samples;
            if samples.len() != expected || content.num_samples == 0 {
                return Err(format!(
                    "Spike waveform mismatch electrode {}: expected {}x{}, got {} samples",
                    electrode,
                    content.num_channels,
                    content.num_samples,
                    samples.len()
                ));
            }

            // Row-major reshape into num_channels rows of num_samples.
            let waveform: Vec<Vec<f32>> = samples
                .chunks(content.num_samples)
                .take(content.num_channels)
                .map(|row| row.to_vec())
                .collect();

            Ok(Decoded::Spike(SpikeEvent {
                electrode,
                sorted_id: content.sorted_id,
                waveform,
            }))
        }
        _ => Ok(Decoded::Skipped),
    }
}

/// Unpacks a little-endian f32 payload. A trailing partial word is dropped,
/// which the length checks above then report as a mismatch.
pub fn decode_payload(payload: &[u8]) -> Vec<f32> {
    payload
        .chunks_exact(4)
        .map(|word| f32::from_le_bytes([word[0], word[1], word[2], word[3]]))
        .collect()
}

pub fn encode_payload(samples: &[f32]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(samples.len() * 4);
    for sample in samples {
        payload.extend_from_slice(&sample.to_le_bytes());
    }
    payload
}

/// Builds the three parts of a continuous-data message.
pub fn encode_data(channel: usize, sample_rate: f64, samples: &[f32]) -> Vec<Vec<u8>> {
    let header = json!({
        "type": "data",
        "content": {
            "num_samples": samples.len(),
            "channel_num": channel,
            "sample_rate": sample_rate,
        },
    });

    vec![
        ENVELOPE.to_vec(),
        header.to_string().into_bytes(),
        encode_payload(samples),
    ]
}

/// Builds the three parts of a spike message. The waveform rows must share
/// one length.
pub fn encode_spike(electrode: usize, sorted_id: u32, waveform: &[Vec<f32>]) -> Vec<Vec<u8>> {
    let num_samples = waveform.first().map(Vec::len).unwrap_or(0);
    let header = json!({
        "type": "spike",
        "spike": {
            "electrode": format!("Electrode {}", electrode),
            "sorted_id": sorted_id,
            "num_channels": waveform.len(),
            "num_samples": num_samples,
        },
    });

    let mut samples = Vec::with_capacity(waveform.len() * num_samples);
    for row in waveform {
        samples.extend_from_slice(row);
    }

    vec![
        ENVELOPE.to_vec(),
        header.to_string().into_bytes(),
        encode_payload(&samples),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_message_round_trips() {
        let samples: Vec<f32> = (0..25).map(|i| i as f32 * 0.5).collect();
        let parts = encode_data(42, 30000.0, &samples);

        match decode_message(&parts).expect("decode") {
            Decoded::Data {
                channel,
                sample_rate,
                samples: decoded,
            } => {
                assert_eq!(channel, 42);
                assert_eq!(sample_rate, 30000.0);
                assert_eq!(decoded, samples);
            }
            other => panic!("expected data message, got {:?}", other),
        }
    }

    #[test]
    fn data_length_mismatch_is_an_error() {
        let mut parts = encode_data(7, 30000.0, &[1.0, 2.0, 3.0, 4.0]);
        parts[2].truncate(8); // now carries 2 samples, header says 4

        let err = decode_message(&parts).unwrap_err();
        assert!(err.contains("Ch 7"), "unexpected error: {}", err);
    }

    #[test]
    fn spike_message_reshapes_row_major() {
        let waveform = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]];
        let parts = encode_spike(160, 3, &waveform);

        match decode_message(&parts).expect("decode") {
            Decoded::Spike(event) => {
                assert_eq!(event.electrode, 160);
                assert_eq!(event.sorted_id, 3);
                assert_eq!(event.waveform, waveform);
            }
            other => panic!("expected spike message, got {:?}", other),
        }
    }

    #[test]
    fn electrode_arrives_as_string_or_index() {
        let header = br#"{"type": "spike", "spike": {"electrode": "Electrode 5", "sorted_id": 1, "num_channels": 1, "num_samples": 2}}"#;
        let parts = vec![
            ENVELOPE.to_vec(),
            header.to_vec(),
            encode_payload(&[0.5, -0.5]),
        ];
        match decode_message(&parts).expect("decode") {
            Decoded::Spike(event) => assert_eq!(event.electrode, 5),
            other => panic!("expected spike message, got {:?}", other),
        }

        let header = br#"{"type": "spike", "spike": {"electrode": 9, "num_channels": 1, "num_samples": 1}}"#;
        let parts = vec![ENVELOPE.to_vec(), header.to_vec(), encode_payload(&[1.0])];
        match decode_message(&parts).expect("decode") {
            Decoded::Spike(event) => {
                assert_eq!(event.electrode, 9);
                assert_eq!(event.sorted_id, 0); // defaulted
            }
            other => panic!("expected spike message, got {:?}", other),
        }
    }

    #[test]
    fn unknown_types_are_skipped_not_fatal() {
        let header = br#"{"type": "event", "content": null}"#;
        let parts = vec![ENVELOPE.to_vec(), header.to_vec()];
        assert!(matches!(decode_message(&parts), Ok(Decoded::Skipped)));
    }

    #[test]
    fn garbage_header_is_an_error() {
        let parts = vec![ENVELOPE.to_vec(), b"not json".to_vec()];
        assert!(decode_message(&parts).is_err());

        // missing header part entirely
        assert!(decode_message(&[ENVELOPE.to_vec()]).is_err());
    }

    #[test]
    fn payload_decode_drops_partial_words() {
        let mut payload = encode_payload(&[1.5, -2.5]);
        payload.push(0xFF);
        assert_eq!(decode_payload(&payload), vec![1.5, -2.5]);
    }
}
