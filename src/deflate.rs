//! DEFLATE compression (RFC 1951) plus the zlib (RFC 1950) wrapper.
//!
//! One DEFLATE block is emitted per [`CHUNK_SIZE`]-sized read from the
//! source, matching `deflate_block`'s loop in the reference implementation:
//! fixed Huffman for small blocks, dynamic Huffman above
//! [`DYNAMIC_BLOCK_THRESHOLD`] bytes. Stored blocks (BTYPE=00) are never
//! emitted, only decoded — see `inflate`.

use std::io::{Read, Write};

use crate::adler32::Adler32;
use crate::bitio::{read_chunk, BitSink};
use crate::constants::{
    BTYPE_DYNAMIC, BTYPE_FIXED, CHUNK_SIZE, CODE_LENGTH_ALPHABET_LENGTHS, CODE_LENGTH_ORDER,
    DEFLATE_HEADER_BITS, DYNAMIC_BLOCK_THRESHOLD, END_OF_BLOCK, HCLEN_BITS, HDIST_BITS, HLIT_BITS,
    MAX_LITLEN_CODES,
};
use crate::error::Result;
use crate::huffman::{self, CodeTuple};
use crate::lz77::{BacklinkLog, MatchFinder};
use crate::tables::{self, DIST_ALPHABET_SIZE};

/// Compress `src` into a complete zlib stream written to `dest`.
pub fn deflate<R: Read, W: Write>(src: &mut R, dest: &mut W) -> Result<()> {
    log::debug!("deflate: writing zlib header");
    dest.write_all(&[0x78, 0x9C])?;

    let mut sink = BitSink::new(dest);
    let mut finder = MatchFinder::new();
    let mut adler = Adler32::new();
    let mut total_in = 0u64;

    log::debug!("entering loop over chunks");
    loop {
        let mut chunk = Vec::new();
        read_chunk(src, &mut chunk)?;
        let is_last = chunk.len() < CHUNK_SIZE;
        adler.update(&chunk);

        encode_block(&mut sink, &mut finder, &chunk, total_in, is_last)?;
        finder.commit(&chunk);
        total_in += chunk.len() as u64;

        if is_last {
            log::debug!("last chunk, {total_in} bytes read in total");
            break;
        }
    }

    sink.finish()?;
    dest.write_all(&adler.finish().to_be_bytes())?;
    log::debug!("deflate complete, adler={:#010x}", adler.finish());
    Ok(())
}

/// Compress an in-memory buffer into a freshly allocated zlib stream.
pub fn deflate_slice(data: &[u8]) -> Result<Vec<u8>> {
    let mut src = data;
    let mut out = Vec::new();
    deflate(&mut src, &mut out)?;
    Ok(out)
}

fn scan_block(chunk: &[u8], base_pos: u64, finder: &mut MatchFinder) -> (BacklinkLog, Vec<u64>, Vec<u64>) {
    let mut log = BacklinkLog::new();
    let mut litlen_freq = vec![0u64; MAX_LITLEN_CODES];
    let mut dist_freq = vec![0u64; DIST_ALPHABET_SIZE];
    let total_len = base_pos + chunk.len() as u64;

    let mut i = 0usize;
    while i < chunk.len() {
        if let Some(m) = finder.find_match(chunk, base_pos, i) {
            litlen_freq[tables::len_code(m.length) as usize] += 1;
            dist_freq[tables::dist_code(m.distance) as usize] += 1;
            for k in 0..m.length as usize {
                finder.mark(chunk, base_pos, i + k, total_len);
            }
            log.push(i as u32, m);
            i += m.length as usize;
        } else {
            litlen_freq[chunk[i] as usize] += 1;
            finder.mark(chunk, base_pos, i, total_len);
            i += 1;
        }
    }
    litlen_freq[END_OF_BLOCK as usize] += 1;

    (log, litlen_freq, dist_freq)
}

fn encode_block<W: Write>(
    sink: &mut BitSink<W>,
    finder: &mut MatchFinder,
    chunk: &[u8],
    base_pos: u64,
    bfinal: bool,
) -> Result<()> {
    let (log, litlen_freq, dist_freq) = scan_block(chunk, base_pos, finder);

    let use_dynamic = chunk.len() > DYNAMIC_BLOCK_THRESHOLD;
    let btype = if use_dynamic { BTYPE_DYNAMIC } else { BTYPE_FIXED };
    log::debug!("encode_block: {} bytes, bfinal={bfinal}, dynamic={use_dynamic}", chunk.len());
    let header = (bfinal as u32) | (btype << 1);
    sink.write_lsbf(header, DEFLATE_HEADER_BITS)?;

    if use_dynamic {
        let litlen_lengths = huffman::code_lengths(&litlen_freq, 15);
        let dist_lengths = ensure_min_dist_code(huffman::code_lengths(&dist_freq, 15));

        let hlit = (num_used(&litlen_lengths, 257) - 257) as u32;
        let hdist = (num_used(&dist_lengths, 1) - 1) as u32;
        log::debug!("dynamic tables: hlit={hlit} hdist={hdist}");

        write_dynamic_header(sink, hlit, hdist)?;

        let mut combined = litlen_lengths[..257 + hlit as usize].to_vec();
        combined.extend_from_slice(&dist_lengths[..1 + hdist as usize]);
        let rle = rle_encode_lengths(&combined);
        write_rle_sequence(sink, &rle, clen_table())?;

        let litlen_table = huffman::canonical_table(&litlen_lengths);
        let dist_table = huffman::canonical_table(&dist_lengths);
        write_payload(sink, chunk, &log, &litlen_table, &dist_table)?;
    } else {
        let litlen_table = huffman::canonical_table(&tables::fixed_litlen_lengths());
        let dist_table = huffman::canonical_table(&tables::fixed_dist_lengths());
        write_payload(sink, chunk, &log, &litlen_table, &dist_table)?;
    }

    Ok(())
}

/// Interleave literal bytes and back-references from `log` over `chunk`,
/// writing each as a canonical Huffman codeword plus any extra bits.
fn write_payload<W: Write>(
    sink: &mut BitSink<W>,
    chunk: &[u8],
    log: &BacklinkLog,
    litlen_table: &[CodeTuple],
    dist_table: &[CodeTuple],
) -> Result<()> {
    let mut entries = log.iter().peekable();
    let mut i = 0usize;
    while i < chunk.len() {
        if let Some(entry) = entries.peek() {
            if entry.pos as usize == i {
                let (distance, length) = (entry.distance(), entry.length());

                let lcode = tables::len_code(length);
                let lct = &litlen_table[lcode as usize];
                sink.write_msbf(lct.code, lct.length)?;
                let lextra = tables::lit_extra_bits(lcode);
                if lextra > 0 {
                    sink.write_lsbf(length - tables::len_base(lcode), lextra)?;
                }

                let dcode = tables::dist_code(distance);
                let dct = &dist_table[dcode as usize];
                sink.write_msbf(dct.code, dct.length)?;
                let dextra = tables::dist_extra_bits(dcode);
                if dextra > 0 {
                    sink.write_lsbf(distance - tables::dist_base(dcode), dextra)?;
                }

                i += length as usize;
                entries.next();
                continue;
            }
        }

        let ct = &litlen_table[chunk[i] as usize];
        sink.write_msbf(ct.code, ct.length)?;
        i += 1;
    }

    let eob = &litlen_table[END_OF_BLOCK as usize];
    sink.write_msbf(eob.code, eob.length)?;
    Ok(())
}

fn num_used(lengths: &[u32], min_count: usize) -> usize {
    lengths.iter().rposition(|&l| l != 0).map(|i| i + 1).unwrap_or(0).max(min_count)
}

/// RFC 1951 requires at least one distance code; when a block has no
/// matches at all, fabricate a length-1 dummy code for symbol 0 rather than
/// emit an invalid length-0 single-code table.
fn ensure_min_dist_code(mut lengths: Vec<u32>) -> Vec<u32> {
    if lengths.iter().all(|&l| l == 0) {
        lengths[0] = 1;
    }
    lengths
}

fn write_dynamic_header<W: Write>(sink: &mut BitSink<W>, hlit: u32, hdist: u32) -> Result<()> {
    sink.write_lsbf(hlit, HLIT_BITS)?;
    sink.write_lsbf(hdist, HDIST_BITS)?;
    sink.write_lsbf((CODE_LENGTH_ALPHABET_LENGTHS.len() - 4) as u32, HCLEN_BITS)?;
    for &len in CODE_LENGTH_ALPHABET_LENGTHS.iter() {
        sink.write_lsbf(len, 3)?;
    }
    Ok(())
}

enum RleSym {
    Literal(u32),
    Repeat16(u32),
    Repeat17(u32),
    Repeat18(u32),
}

/// RLE-encode a concatenated litlen+dist code-length sequence using DEFLATE's
/// three repeat symbols (16/17/18), matching `gen_clen_codes` in the
/// reference `deflate.c`.
fn rle_encode_lengths(lengths: &[u32]) -> Vec<RleSym> {
    let mut out = Vec::new();
    let n = lengths.len();
    let mut i = 0;
    while i < n {
        let cur = lengths[i];
        let mut run = 1;
        while i + run < n && lengths[i + run] == cur {
            run += 1;
        }

        if cur == 0 {
            let mut remaining = run;
            while remaining > 0 {
                if remaining >= 11 {
                    let take = remaining.min(138);
                    out.push(RleSym::Repeat18((take - 11) as u32));
                    remaining -= take;
                } else if remaining >= 3 {
                    let take = remaining.min(10);
                    out.push(RleSym::Repeat17((take - 3) as u32));
                    remaining -= take;
                } else {
                    for _ in 0..remaining {
                        out.push(RleSym::Literal(0));
                    }
                    remaining = 0;
                }
            }
        } else {
            out.push(RleSym::Literal(cur));
            let mut remaining = run - 1;
            while remaining > 0 {
                if remaining >= 3 {
                    let take = remaining.min(6);
                    out.push(RleSym::Repeat16((take - 3) as u32));
                    remaining -= take;
                } else {
                    for _ in 0..remaining {
                        out.push(RleSym::Literal(cur));
                    }
                    remaining = 0;
                }
            }
        }
        i += run;
    }
    out
}

fn write_rle_sequence<W: Write>(sink: &mut BitSink<W>, seq: &[RleSym], table: &[CodeTuple]) -> Result<()> {
    for sym in seq {
        match *sym {
            RleSym::Literal(v) => {
                let ct = &table[v as usize];
                sink.write_msbf(ct.code, ct.length)?;
            }
            RleSym::Repeat16(extra) => {
                let ct = &table[16];
                sink.write_msbf(ct.code, ct.length)?;
                sink.write_lsbf(extra, 2)?;
            }
            RleSym::Repeat17(extra) => {
                let ct = &table[17];
                sink.write_msbf(ct.code, ct.length)?;
                sink.write_lsbf(extra, 3)?;
            }
            RleSym::Repeat18(extra) => {
                let ct = &table[18];
                sink.write_msbf(ct.code, ct.length)?;
                sink.write_lsbf(extra, 7)?;
            }
        }
    }
    Ok(())
}

fn clen_table() -> &'static Vec<CodeTuple> {
    static TABLE: std::sync::OnceLock<Vec<CodeTuple>> = std::sync::OnceLock::new();
    TABLE.get_or_init(|| {
        let mut lengths = vec![0u32; CODE_LENGTH_ORDER.len()];
        for (i, &symbol) in CODE_LENGTH_ORDER.iter().enumerate() {
            lengths[symbol] = CODE_LENGTH_ALPHABET_LENGTHS[i];
        }
        huffman::canonical_table(&lengths)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inflate::inflate_slice;

    fn roundtrip(data: &[u8]) {
        let compressed = deflate_slice(data).unwrap();
        assert_eq!(compressed[0], 0x78);
        assert_eq!(compressed[1], 0x9C);
        let decompressed = inflate_slice(&compressed).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn empty_input_roundtrips() {
        roundtrip(b"");
    }

    #[test]
    fn single_byte_roundtrips() {
        roundtrip(b"a");
    }

    #[test]
    fn repeated_byte_uses_a_back_reference() {
        let data = vec![b'a'; 256];
        roundtrip(&data);
    }

    #[test]
    fn repeating_pattern_roundtrips() {
        roundtrip(b"abcabcabcabc");
    }

    #[test]
    fn large_dynamic_block_roundtrips() {
        let mut data = Vec::new();
        for i in 0..5000u32 {
            data.push((i % 251) as u8);
        }
        roundtrip(&data);
    }

    #[test]
    fn rle_encode_handles_long_zero_run() {
        let mut lengths = vec![0u32; 140];
        lengths[0] = 4;
        let rle = rle_encode_lengths(&lengths);
        assert!(matches!(rle[0], RleSym::Literal(4)));
        assert!(rle.len() <= 4);
    }
}
