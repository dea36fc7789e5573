// src/provision/chunked.rs

use std::io::Write;

use anyhow::{Context, Result};

use super::ProgressFn;

/// Buffers incoming body bytes and writes them out in fixed-size chunks,
/// reporting progress after every chunk that reaches the destination.
pub struct ChunkedWriter {
    inner: Box<dyn Write + Send>,
    chunk_size: usize,
    buf: Vec<u8>,
    written: u64,
    total: u64,
    on_progress: Option<ProgressFn>,
}

impl ChunkedWriter {
    pub fn new(
        inner: Box<dyn Write + Send>,
        chunk_size: usize,
        total: u64,
        on_progress: Option<ProgressFn>,
    ) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            inner,
            chunk_size,
            buf: Vec::with_capacity(chunk_size),
            written: 0,
            total,
            on_progress,
        }
    }

    pub fn push(&mut self, bytes: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(bytes);
        while self.buf.len() >= self.chunk_size {
            let chunk: Vec<u8> = self.buf.drain(..self.chunk_size).collect();
            self.write_out(&chunk)?;
        }
        Ok(())
    }

    /// Write any buffered tail, flush, and return the total bytes written.
    pub fn finish(mut self) -> Result<u64> {
        if !self.buf.is_empty() {
            let tail = std::mem::take(&mut self.buf);
            self.write_out(&tail)?;
        }
        self.inner.flush().context("flushing artifact file")?;
        Ok(self.written)
    }

    fn write_out(&mut self, chunk: &[u8]) -> Result<()> {
        self.inner
            .write_all(chunk)
            .context("writing artifact chunk")?;
        self.written += chunk.len() as u64;
        if let Some(cb) = &self.on_progress {
            cb(self.written, self.total);
        }
        Ok(())
    }
}
