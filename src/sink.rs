//! Append-only byte sinks.

use crate::error::{DriverError, Result};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Ordered, append-only byte consumer.
pub trait Sink {
    /// Append `bytes`, returning how many were accepted.
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        (**self).write(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

impl Sink for Vec<u8> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.extend_from_slice(bytes);
        Ok(bytes.len())
    }
}

/// Sink over any [`Write`] implementation.
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    inner: W,
    written: u64,
}

impl<W: Write> WriterSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    /// Total bytes accepted so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Sink for WriterSink<W> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.inner.write_all(bytes)?;
        self.written += bytes.len() as u64;
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Buffered file sink. The file is created, or truncated, when opened.
pub type FileSink = WriterSink<BufWriter<File>>;

impl FileSink {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| DriverError::SinkOpenFailed {
            path: path.display().to_string(),
            source,
        })?;
        Ok(WriterSink::new(BufWriter::new(file)))
    }
}

/// In-memory sink that records the stream size after every write.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    data: Vec<u8>,
    sizes: Vec<usize>,
    chunk_limit: Option<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept at most `limit` bytes per write, producing short writes.
    pub fn with_chunk_limit(limit: usize) -> Self {
        Self {
            chunk_limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Stream length after each write, in write order.
    pub fn write_log(&self) -> &[usize] {
        &self.sizes
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl Sink for MemorySink {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        let accepted = match self.chunk_limit {
            Some(limit) => bytes.len().min(limit),
            None => bytes.len(),
        };
        self.data.extend_from_slice(&bytes[..accepted]);
        self.sizes.push(self.data.len());
        Ok(accepted)
    }
}

/// Write all of `bytes`, treating a partial write as fatal.
pub fn write_all<S: Sink + ?Sized>(sink: &mut S, bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        return Ok(());
    }
    let written = sink.write(bytes).map_err(DriverError::SinkWriteFailed)?;
    if written != bytes.len() {
        return Err(DriverError::short_write(written, bytes.len()));
    }
    Ok(())
}
