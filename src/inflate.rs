//! DEFLATE decompression (RFC 1951) plus the zlib (RFC 1950) wrapper.
//!
//! Unlike the encoder, the decoder makes no assumption about how the stream
//! being read was produced: dynamic Huffman tables are parsed generically
//! from whatever HLIT/HDIST/HCLEN values and code lengths are present,
//! matching `read_huffman_codes`/`inflate_block` in the reference
//! `inflate.c`. Stored blocks (BTYPE=00) are only ever decoded here, never
//! emitted by `deflate`.

use std::io::{Read, Write};

use crate::adler32::Adler32;
use crate::bitio::BitSource;
use crate::circular_buffer::CircularBuffer;
use crate::constants::{BTYPE_DYNAMIC, BTYPE_FIXED, BTYPE_STORED, CODE_LENGTH_ORDER, END_OF_BLOCK, MAX_WINDOW_SIZE};
use crate::error::{Error, Result};
use crate::huffman::{self, Node};
use crate::tables;

/// Decompress a complete zlib stream from `src` into `dest`.
pub fn inflate<R: Read, W: Write>(src: &mut R, dest: &mut W) -> Result<()> {
    let mut header = [0u8; 2];
    src.read_exact(&mut header)?;
    let (cmf, flg) = (header[0], header[1]);

    if cmf & 0x0F != 8 {
        log::error!("compression method {} is not DEFLATE (8)", cmf & 0x0F);
        return Err(Error::InvalidCompMethod);
    }
    if cmf >> 4 > 7 {
        log::error!("window size field {} exceeds the 32 KiB limit", cmf >> 4);
        return Err(Error::InvalidWindowSize);
    }
    if (u16::from(cmf) * 256 + u16::from(flg)) % 31 != 0 {
        log::error!("zlib header check failed for cmf={cmf:#04x} flg={flg:#04x}");
        return Err(Error::CorruptZlibHeader);
    }
    if (flg >> 5) & 1 == 1 {
        log::error!("stream requests a preset dictionary, which is unsupported");
        return Err(Error::DictIsUsed);
    }

    log::debug!("zlib header ok, entering block loop");
    let mut source = BitSource::new(src)?;
    let mut window: CircularBuffer<u8> = CircularBuffer::create(MAX_WINDOW_SIZE);
    let mut adler = Adler32::new();

    loop {
        let bfinal = source.read_lsbf(1)?;
        let btype = source.read_lsbf(2)?;
        log::debug!("inflate: block header bfinal={bfinal} btype={btype}");

        match btype {
            BTYPE_STORED => inflate_stored_block(&mut source, dest, &mut window, &mut adler)?,
            BTYPE_FIXED => {
                let litlen_table = huffman::canonical_table(&tables::fixed_litlen_lengths());
                let dist_table = huffman::canonical_table(&tables::fixed_dist_lengths());
                let litlen_tree = huffman::build_decoder_tree(&litlen_table);
                let dist_tree = huffman::build_decoder_tree(&dist_table);
                inflate_huffman_block(&mut source, dest, &mut window, &mut adler, &litlen_tree, &dist_tree)?;
            }
            BTYPE_DYNAMIC => {
                let (litlen_tree, dist_tree) = read_dynamic_tables(&mut source)?;
                inflate_huffman_block(&mut source, dest, &mut window, &mut adler, &litlen_tree, &dist_tree)?;
            }
            _ => {
                log::error!("illegal btype 3 (reserved)");
                return Err(Error::IllegalBtype);
            }
        }

        if bfinal == 1 {
            break;
        }
    }

    log::debug!("block loop done, checking Adler-32 trailer");
    source.align();
    let trailer = source.read_bytes(4)?;
    let expected = u32::from_be_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let computed = adler.finish();
    if expected != computed {
        log::error!("Adler-32 mismatch: expected {expected:#010x}, computed {computed:#010x}");
        return Err(Error::AdlerChecksumErr { expected, computed });
    }
    Ok(())
}

/// Decompress an in-memory zlib stream into a freshly allocated buffer.
pub fn inflate_slice(data: &[u8]) -> Result<Vec<u8>> {
    let mut src = data;
    let mut out = Vec::new();
    inflate(&mut src, &mut out)?;
    Ok(out)
}

fn emit_byte<W: Write>(b: u8, dest: &mut W, window: &mut CircularBuffer<u8>, adler: &mut Adler32) -> Result<()> {
    dest.write_all(&[b])?;
    adler.update(&[b]);
    window.push(b);
    Ok(())
}

fn inflate_stored_block<R: Read, W: Write>(
    source: &mut BitSource<R>,
    dest: &mut W,
    window: &mut CircularBuffer<u8>,
    adler: &mut Adler32,
) -> Result<()> {
    source.align();
    let len = source.read_lsbf(16)? as u16;
    let nlen = source.read_lsbf(16)? as u16;
    if nlen != !len {
        log::error!("stored block LEN={len} does not match ~NLEN={nlen}");
        return Err(Error::LenCheckFail);
    }
    log::debug!("stored block, {len} raw bytes");
    let bytes = source.read_bytes(len as usize)?;
    for b in bytes {
        emit_byte(b, dest, window, adler)?;
    }
    Ok(())
}

/// Walk a decode tree one bit at a time via `source`, translating the
/// underlying stream's `Result`-based bit reads into the `Option`-based
/// interface [`huffman::decode_symbol`] expects.
fn decode_symbol_from<R: Read>(tree: &Node, source: &mut BitSource<R>) -> Result<u32> {
    let mut io_err = None;
    let sym = huffman::decode_symbol(tree, || match source.read_bit() {
        Ok(bit) => Some(bit),
        Err(e) => {
            io_err = Some(e);
            None
        }
    });
    if let Some(e) = io_err {
        return Err(e);
    }
    sym
}

fn read_dynamic_tables<R: Read>(source: &mut BitSource<R>) -> Result<(Box<Node>, Box<Node>)> {
    let hlit = source.read_lsbf(5)? as usize + 257;
    let hdist = source.read_lsbf(5)? as usize + 1;
    let hclen = source.read_lsbf(4)? as usize + 4;
    log::debug!("dynamic block: hlit={hlit} hdist={hdist} hclen={hclen}");

    let mut clen_lengths = vec![0u32; CODE_LENGTH_ORDER.len()];
    for &symbol in CODE_LENGTH_ORDER.iter().take(hclen) {
        clen_lengths[symbol] = source.read_lsbf(3)?;
    }
    let clen_table = huffman::canonical_table(&clen_lengths);
    let clen_tree = huffman::build_decoder_tree(&clen_table);

    let mut lengths = Vec::with_capacity(hlit + hdist);
    while lengths.len() < hlit + hdist {
        let sym = decode_symbol_from(&clen_tree, source)?;
        match sym {
            0..=15 => lengths.push(sym),
            16 => {
                let repeat = source.read_lsbf(2)? + 3;
                let prev = *lengths.last().ok_or_else(|| {
                    log::error!("repeat-previous code length with no preceding length");
                    Error::CorruptZlibHeader
                })?;
                for _ in 0..repeat {
                    lengths.push(prev);
                }
            }
            17 => {
                let repeat = source.read_lsbf(3)? + 3;
                lengths.resize(lengths.len() + repeat as usize, 0);
            }
            18 => {
                let repeat = source.read_lsbf(7)? + 11;
                lengths.resize(lengths.len() + repeat as usize, 0);
            }
            _ => {
                log::error!("code-length alphabet decoded an impossible symbol {sym}");
                return Err(Error::CorruptZlibHeader);
            }
        }
    }
    if lengths.len() != hlit + hdist {
        log::error!("code-length run overshot hlit+hdist ({} != {})", lengths.len(), hlit + hdist);
        return Err(Error::CorruptZlibHeader);
    }

    let litlen_table = huffman::canonical_table(&lengths[..hlit]);
    let dist_table = huffman::canonical_table(&lengths[hlit..]);
    Ok((huffman::build_decoder_tree(&litlen_table), huffman::build_decoder_tree(&dist_table)))
}

fn inflate_huffman_block<R: Read, W: Write>(
    source: &mut BitSource<R>,
    dest: &mut W,
    window: &mut CircularBuffer<u8>,
    adler: &mut Adler32,
    litlen_tree: &Node,
    dist_tree: &Node,
) -> Result<()> {
    log::debug!("entering huffman-coded block payload loop");
    loop {
        let sym = decode_symbol_from(litlen_tree, source)?;
        if sym == END_OF_BLOCK {
            return Ok(());
        }
        if sym < 256 {
            emit_byte(sym as u8, dest, window, adler)?;
            continue;
        }

        let extra_bits = tables::lit_extra_bits(sym);
        let extra = if extra_bits > 0 { source.read_lsbf(extra_bits)? } else { 0 };
        let length = tables::len_base(sym) + extra;

        let dsym = decode_symbol_from(dist_tree, source)?;
        let dextra_bits = tables::dist_extra_bits(dsym);
        let dextra = if dextra_bits > 0 { source.read_lsbf(dextra_bits)? } else { 0 };
        let distance = tables::dist_base(dsym) + dextra;

        if distance as usize > window.len() {
            log::error!("match distance {distance} exceeds window size {}", window.len());
            return Err(Error::InvalidMatchLen { distance: distance as usize, window_size: window.len() });
        }
        for _ in 0..length {
            let b = window.get_from_back(distance as usize - 1);
            emit_byte(b, dest, window, adler)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deflate::deflate_slice;

    #[test]
    fn rejects_bad_compression_method() {
        let mut src: &[u8] = &[0x77, 0x9C, 0, 0, 0, 0];
        let mut out = Vec::new();
        assert!(matches!(inflate(&mut src, &mut out), Err(Error::InvalidCompMethod)));
    }

    #[test]
    fn rejects_header_checksum_failure() {
        let mut src: &[u8] = &[0x78, 0x9D];
        let mut out = Vec::new();
        assert!(matches!(inflate(&mut src, &mut out), Err(Error::CorruptZlibHeader)));
    }

    #[test]
    fn hello_world_roundtrips_with_known_adler() {
        // The trailing Adler-32 for "Hello, world!" is the well-known
        // constant 0x205E048A (RFC 1950 §9) regardless of which encoder
        // produced the stream.
        let compressed = deflate_slice(b"Hello, world!").unwrap();
        assert_eq!(&compressed[0..2], &[0x78, 0x9C]);
        let trailer = &compressed[compressed.len() - 4..];
        assert_eq!(u32::from_be_bytes(trailer.try_into().unwrap()), 0x205E048A);
        assert_eq!(inflate_slice(&compressed).unwrap(), b"Hello, world!");
    }

    #[test]
    fn decodes_externally_produced_zlib_stream() {
        // A single fixed-Huffman block built by hand from the RFC 1951
        // §3.2.6 fixed code table (13 literals + end-of-block, no
        // back-references needed), not produced by this crate's own
        // encoder — the only way to pin decoder conformance to the wire
        // format rather than to self-consistency with our own Huffman
        // table construction.
        let compressed = hex::decode("789cf348cdc9c9d75128cf2fca49510400205e048a").unwrap();
        let mut out = Vec::new();
        inflate(&mut &compressed[..], &mut out).unwrap();
        assert_eq!(out, b"Hello, world!");
    }

    #[test]
    fn detects_corrupted_adler_trailer() {
        let mut compressed = deflate_slice(b"roundtrip me").unwrap();
        let last = compressed.len() - 1;
        compressed[last] ^= 0xFF;
        assert!(matches!(inflate_slice(&compressed), Err(Error::AdlerChecksumErr { .. })));
    }

    #[test]
    fn stored_block_len_mismatch_is_rejected() {
        // BFINAL=1, BTYPE=00 (stored), then LEN=5 with a wrong NLEN.
        let mut payload = vec![0x78, 0x9C];
        payload.push(0b0000_0001); // bfinal=1, btype=00, padding bits zero
        payload.extend_from_slice(&5u16.to_le_bytes());
        payload.extend_from_slice(&0xFFF8u16.to_le_bytes()); // should be 0xFFFA
        payload.extend_from_slice(b"hello");
        payload.extend_from_slice(&Adler32::new().finish().to_be_bytes());
        let mut src: &[u8] = &payload;
        let mut out = Vec::new();
        assert!(matches!(inflate(&mut src, &mut out), Err(Error::LenCheckFail)));
    }
}
