// src/feed/subscriber.rs

use std::io::{self, Read, Write};
use std::net::TcpStream;

/// Upper bound on a single message part. Anything larger is a torn frame or
/// a stream that is not speaking our framing.
const MAX_PART_SIZE: u32 = 16 * 1024 * 1024;
const MAX_PARTS: u8 = 8;

/// Blocking subscriber for the multipart probe feed.
///
/// Wire framing, per message:
///   part_count: u8, then for each part: len: u32 little-endian, bytes[len]
pub struct Subscriber {
    stream: TcpStream,
    host: String,
    port: u16,
}

impl Subscriber {
    pub fn connect(host: &str, port: u16) -> io::Result<Self> {
        let stream = TcpStream::connect((host, port))?;
        Ok(Self {
            stream,
            host: host.to_string(),
            port,
        })
    }

    /// Drops the current stream and dials the same address again.
    pub fn reconnect(&mut self) -> io::Result<()> {
        self.stream = TcpStream::connect((self.host.as_str(), self.port))?;
        Ok(())
    }

    /// A read timeout keeps a quiet feed from blocking the receive loop
    /// forever; timed-out reads surface as `WouldBlock`/`TimedOut`.
    pub fn set_read_timeout(&self, timeout: std::time::Duration) -> io::Result<()> {
        self.stream.set_read_timeout(Some(timeout))
    }

    /// Blocks until one whole multipart message has been read.
    pub fn recv(&mut self) -> io::Result<Vec<Vec<u8>>> {
        read_message(&mut self.stream)
    }
}

pub fn read_message<R: Read>(reader: &mut R) -> io::Result<Vec<Vec<u8>>> {
    let mut count = [0u8; 1];
    reader.read_exact(&mut count)?;
    let count = count[0];
    if count == 0 || count > MAX_PARTS {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Implausible part count: {}", count),
        ));
    }

    let mut parts = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let mut len = [0u8; 4];
        reader.read_exact(&mut len)?;
        let len = u32::from_le_bytes(len);
        if len > MAX_PART_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Part of {} bytes exceeds frame limit", len),
            ));
        }

        let mut part = vec![0u8; len as usize];
        reader.read_exact(&mut part)?;
        parts.push(part);
    }

    Ok(parts)
}

/// Publisher-side counterpart used by the simulator.
pub fn write_message<W: Write>(writer: &mut W, parts: &[Vec<u8>]) -> io::Result<()> {
    debug_assert!(!parts.is_empty() && parts.len() <= MAX_PARTS as usize);

    writer.write_all(&[parts.len() as u8])?;
    for part in parts {
        writer.write_all(&(part.len() as u32).to_le_bytes())?;
        writer.write_all(part)?;
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn framed_message_round_trips() {
        let parts = vec![b"probe".to_vec(), b"{}".to_vec(), vec![0u8; 40]];
        let mut wire = Vec::new();
        write_message(&mut wire, &parts).expect("write");

        let mut reader = Cursor::new(wire);
        let back = read_message(&mut reader).expect("read");
        assert_eq!(back, parts);
    }

    #[test]
    fn consecutive_messages_stay_aligned() {
        let first = vec![b"a".to_vec(), b"1".to_vec()];
        let second = vec![b"bb".to_vec(), b"22".to_vec(), b"333".to_vec()];
        let mut wire = Vec::new();
        write_message(&mut wire, &first).expect("write");
        write_message(&mut wire, &second).expect("write");

        let mut reader = Cursor::new(wire);
        assert_eq!(read_message(&mut reader).expect("read"), first);
        assert_eq!(read_message(&mut reader).expect("read"), second);
    }

    #[test]
    fn zero_part_count_is_rejected() {
        let mut reader = Cursor::new(vec![0u8]);
        assert!(read_message(&mut reader).is_err());
    }

    #[test]
    fn oversized_part_is_rejected() {
        let mut wire = vec![1u8];
        wire.extend_from_slice(&u32::MAX.to_le_bytes());
        let mut reader = Cursor::new(wire);
        assert!(read_message(&mut reader).is_err());
    }

    #[test]
    fn truncated_stream_reports_eof() {
        let parts = vec![b"probe".to_vec(), b"{}".to_vec()];
        let mut wire = Vec::new();
        write_message(&mut wire, &parts).expect("write");
        wire.truncate(wire.len() - 1);

        let mut reader = Cursor::new(wire);
        let err = read_message(&mut reader).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }
}
