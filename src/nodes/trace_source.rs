//! Trace sources with a reader thread
//!
//! A source owns one background thread that reads raw sniffer output and
//! hands it to the decoder loop over a bounded channel. Chunks are passed on
//! exactly as read; the decoder does not care where they split.
//!
//! The live source also appends every chunk verbatim to a capture file, so
//! a session can later be replayed through [`TraceSource::file`] with
//! identical results.

use crate::runtime::{Receiver, Sender, WorkResult, channel};
use crate::{Result, SnifferError};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Bytes requested per read
pub const CHUNK_SIZE: usize = 4096;

/// Chunks in flight between the reader thread and the decoder
const CHANNEL_DEPTH: usize = 16;

/// Pause after a read that returned nothing yet
const IDLE_BACKOFF: Duration = Duration::from_millis(10);

struct ReaderConfig {
    name: String,
    reader: Box<dyn Read + Send>,
    capture: Option<Box<dyn Write + Send>>,
    sender: Sender<Vec<u8>>,
    shutdown: Arc<AtomicBool>,
    chunk_size: usize,
}

/// Raw trace bytes from a capture file or a live sniffer port
pub struct TraceSource {
    name: String,
    receiver: Receiver<Vec<u8>>,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TraceSource {
    /// Replay a capture file
    pub fn file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            SnifferError::Source(format!("cannot open capture {}: {e}", path.display()))
        })?;
        info!("Reading from {}", path.display());
        Self::spawn(path.display().to_string(), Box::new(file), None, CHUNK_SIZE)
    }

    /// Read a live sniffer port, appending everything read to `capture`
    pub fn port<P: AsRef<Path>, Q: AsRef<Path>>(device: P, capture: Q) -> Result<Self> {
        let (device, capture) = (device.as_ref(), capture.as_ref());
        let port = File::open(device).map_err(|e| {
            SnifferError::Source(format!("cannot open port {}: {e}", device.display()))
        })?;
        let capture_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(capture)
            .map_err(|e| {
                SnifferError::Source(format!("cannot open capture {}: {e}", capture.display()))
            })?;
        info!(
            "Reading from {}, capturing to {}",
            device.display(),
            capture.display()
        );
        Self::spawn(
            device.display().to_string(),
            Box::new(port),
            Some(Box::new(capture_file)),
            CHUNK_SIZE,
        )
    }

    /// Read from any byte stream, in chunks of at most `chunk_size`
    pub fn from_reader(
        name: impl Into<String>,
        reader: impl Read + Send + 'static,
        chunk_size: usize,
    ) -> Result<Self> {
        Self::spawn(name.into(), Box::new(reader), None, chunk_size)
    }

    fn spawn(
        name: String,
        reader: Box<dyn Read + Send>,
        capture: Option<Box<dyn Write + Send>>,
        chunk_size: usize,
    ) -> Result<Self> {
        let (sender, receiver) = channel(CHANNEL_DEPTH);
        let shutdown = Arc::new(AtomicBool::new(false));
        let config = ReaderConfig {
            name: name.clone(),
            reader,
            capture,
            sender,
            shutdown: Arc::clone(&shutdown),
            chunk_size: chunk_size.max(1),
        };
        let handle = std::thread::Builder::new()
            .name(format!("trace_reader:{name}"))
            .spawn(move || Self::reader_thread(config))?;

        Ok(Self {
            name,
            receiver,
            shutdown,
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Next chunk; `WorkError::Shutdown` once the source is exhausted
    pub fn recv(&mut self) -> WorkResult<Vec<u8>> {
        self.receiver.recv()
    }

    /// Ask the reader thread to stop after its current read
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    fn reader_thread(config: ReaderConfig) {
        let ReaderConfig {
            name,
            mut reader,
            mut capture,
            sender,
            shutdown,
            chunk_size,
        } = config;
        let mut buffer = vec![0u8; chunk_size];
        let mut total: u64 = 0;

        debug!("[{name}] Starting reader thread");

        loop {
            if shutdown.load(Ordering::Relaxed) {
                debug!("[{name}] Shutdown signal received after {total} bytes");
                break;
            }

            let count = match reader.read(&mut buffer) {
                Ok(0) => {
                    debug!("[{name}] End of input");
                    break;
                }
                Ok(count) => count,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    std::thread::sleep(IDLE_BACKOFF);
                    continue;
                }
                Err(e) => {
                    warn!("[{name}] Read failed: {e}");
                    break;
                }
            };
            let chunk = buffer[..count].to_vec();
            total += count as u64;
            debug!("[{name}] got {count} bytes");

            if let Some(file) = capture.as_mut()
                && let Err(e) = file.write_all(&chunk).and_then(|()| file.flush())
            {
                warn!("[{name}] Capture write failed, capture stopped: {e}");
                capture = None;
            }

            if sender.send(chunk).is_err() {
                debug!("[{name}] Receiver disconnected after {total} bytes");
                return;
            }
        }

        info!("[{name}] Reader complete: {total} bytes");
        sender.close();
    }
}

impl Drop for TraceSource {
    fn drop(&mut self) {
        self.stop();
        // A live port read may block indefinitely; only reap a finished thread
        if let Some(handle) = self.handle.take()
            && handle.is_finished()
        {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::WorkError;
    use std::io::Cursor;
    use std::path::PathBuf;

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "cc1101_sniff_{}_{}_{tag}",
            std::process::id(),
            std::thread::current().name().unwrap_or("test").replace("::", "_")
        ))
    }

    fn drain(source: &mut TraceSource) -> Vec<Vec<u8>> {
        let mut chunks = Vec::new();
        loop {
            match source.recv() {
                Ok(chunk) => chunks.push(chunk),
                Err(WorkError::Shutdown) => return chunks,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
    }

    #[test]
    fn test_reader_source_chunks() {
        let data = b"[0A0F 050F]\n[8A0F 0005]\n".to_vec();
        let mut source = TraceSource::from_reader("memory", Cursor::new(data.clone()), 5).unwrap();
        assert_eq!(source.name(), "memory");

        let chunks = drain(&mut source);
        assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= 5));
        assert_eq!(chunks.concat(), data);
    }

    #[test]
    fn test_file_source_replays_file() {
        let path = temp_path("replay.dat");
        let data: Vec<u8> = b"w3.t250.[360F]\n".repeat(1000);
        std::fs::write(&path, &data).unwrap();

        let mut source = TraceSource::file(&path).unwrap();
        let chunks = drain(&mut source);
        assert_eq!(chunks.concat(), data);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file_is_a_source_error() {
        let result = TraceSource::file(temp_path("does_not_exist.dat"));
        assert!(matches!(result, Err(SnifferError::Source(_))));
    }

    #[test]
    fn test_port_source_appends_to_capture() {
        let device = temp_path("device");
        let capture = temp_path("capture.dat");
        std::fs::write(&device, b"[0A0F 050F]\n").unwrap();
        std::fs::write(&capture, b"SPI Sniffer\n").unwrap();

        let mut source = TraceSource::port(&device, &capture).unwrap();
        let chunks = drain(&mut source);
        drop(source);

        assert_eq!(chunks.concat(), b"[0A0F 050F]\n");
        assert_eq!(
            std::fs::read(&capture).unwrap(),
            b"SPI Sniffer\n[0A0F 050F]\n"
        );

        std::fs::remove_file(&device).unwrap();
        std::fs::remove_file(&capture).unwrap();
    }
}
