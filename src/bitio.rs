//! Chunked bit I/O over arbitrary `Read`/`Write` sources, built on top of
//! [`BitStream`]'s fixed-buffer primitives.
//!
//! Mirrors the reference implementation's `safe_read_lsbf`/`safe_write_lsbf`
//! continuation contract (see `deflate.c`/`inflate.c`): a read or write that
//! runs past the end of the current chunk drains/refills once and retries
//! with the leftover bit count, rather than requiring the caller to manage
//! buffer boundaries itself.

use std::io::{Read, Write};

use crate::bitstream::{BitStream, Mode};
use crate::constants::CHUNK_SIZE;
use crate::error::{Error, Result};

/// Fill `buf` with up to [`CHUNK_SIZE`] bytes from `source`, looping on
/// short reads; `buf` is truncated to the actual count, which is less than
/// `CHUNK_SIZE` only at end of stream.
pub(crate) fn read_chunk<R: Read>(source: &mut R, buf: &mut Vec<u8>) -> Result<()> {
    buf.resize(CHUNK_SIZE, 0);
    let mut total = 0;
    while total < buf.len() {
        match source.read(&mut buf[total..])? {
            0 => break,
            n => total += n,
        }
    }
    buf.truncate(total);
    Ok(())
}

/// Bit-level writer that drains full chunks to a `Write` sink as it fills.
pub(crate) struct BitSink<'a, W: Write> {
    stream: BitStream,
    sink: &'a mut W,
}

impl<'a, W: Write> BitSink<'a, W> {
    pub(crate) fn new(sink: &'a mut W) -> Self {
        let mut stream = BitStream::new(Mode::Write);
        stream.assign(vec![0u8; CHUNK_SIZE]);
        Self { stream, sink }
    }

    fn drain(&mut self) -> Result<()> {
        let used = self.stream.used_bytes();
        let buf = self.stream.assign(vec![0u8; CHUNK_SIZE]);
        self.sink.write_all(&buf[..used])?;
        Ok(())
    }

    pub(crate) fn write_lsbf(&mut self, mut value: u32, mut nbits: u32) -> Result<()> {
        loop {
            let missing = self.stream.write_lsbf(value, nbits).expect("stream in write mode");
            if missing == 0 {
                return Ok(());
            }
            let written = nbits - missing;
            value >>= written;
            nbits = missing;
            self.drain()?;
        }
    }

    pub(crate) fn write_msbf(&mut self, value: u32, mut nbits: u32) -> Result<()> {
        let mut value = value;
        loop {
            let missing = self.stream.write_msbf(value, nbits).expect("stream in write mode");
            if missing == 0 {
                return Ok(());
            }
            let mask = if missing >= 32 { u32::MAX } else { (1u32 << missing) - 1 };
            value &= mask;
            nbits = missing;
            self.drain()?;
        }
    }

    /// Advance to the next byte boundary, zero-padding the current byte.
    pub(crate) fn align(&mut self) {
        self.stream.flush();
    }

    /// Write raw already byte-aligned bytes (used for stored-block payloads
    /// and the trailing Adler-32 checksum).
    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        for &b in bytes {
            self.write_lsbf(b as u32, 8)?;
        }
        Ok(())
    }

    /// Flush any partial byte and drain the remaining buffered bytes.
    pub(crate) fn finish(mut self) -> Result<()> {
        self.stream.flush();
        self.drain()
    }
}

/// Bit-level reader that refills from a `Read` source as its chunk empties.
pub(crate) struct BitSource<'a, R: Read> {
    stream: BitStream,
    source: &'a mut R,
}

impl<'a, R: Read> BitSource<'a, R> {
    pub(crate) fn new(source: &'a mut R) -> Result<Self> {
        let mut buf = Vec::new();
        read_chunk(source, &mut buf)?;
        let mut stream = BitStream::new(Mode::Read);
        stream.assign(buf);
        Ok(Self { stream, source })
    }

    fn refill(&mut self) -> Result<bool> {
        let mut buf = Vec::new();
        read_chunk(self.source, &mut buf)?;
        let got_any = !buf.is_empty();
        self.stream.assign(buf);
        Ok(got_any)
    }

    pub(crate) fn read_lsbf(&mut self, nbits: u32) -> Result<u32> {
        let mut value = 0u32;
        let mut shift = 0u32;
        let mut remaining = nbits;
        loop {
            let (partial, missing) = self.stream.read_lsbf(remaining).expect("stream in read mode");
            value |= partial << shift;
            if missing == 0 {
                return Ok(value);
            }
            shift += remaining - missing;
            remaining = missing;
            if !self.refill()? {
                return Err(Error::StreamTooShort { needed: remaining as usize });
            }
        }
    }

    pub(crate) fn read_msbf(&mut self, nbits: u32) -> Result<u32> {
        let mut value = 0u32;
        let mut remaining = nbits;
        loop {
            let (partial, missing) = self.stream.read_msbf(remaining).expect("stream in read mode");
            let got = remaining - missing;
            value = (value << got) | partial;
            if missing == 0 {
                return Ok(value);
            }
            remaining = missing;
            if !self.refill()? {
                return Err(Error::StreamTooShort { needed: remaining as usize });
            }
        }
    }

    /// Read a single bit for the Huffman decoder; `None` only at true EOS.
    pub(crate) fn read_bit(&mut self) -> Result<u32> {
        self.read_msbf(1)
    }

    /// Advance to the next byte boundary, discarding any unread bits in it.
    pub(crate) fn align(&mut self) {
        self.stream.flush();
    }

    /// Read `n` already byte-aligned bytes (stored-block payloads).
    pub(crate) fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(self.read_lsbf(8)? as u8);
        }
        Ok(out)
    }
}
