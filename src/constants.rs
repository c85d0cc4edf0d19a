//! Shared constants for the zlib/DEFLATE wire format.

/// Number of bytes pulled from the source (and buffered for the sink) per
/// block-processing iteration.
pub(crate) const CHUNK_SIZE: usize = 1 << 17; // 131072

/// Maximum DEFLATE back-reference distance / sliding window size.
pub(crate) const MAX_WINDOW_SIZE: usize = 32768;

/// Chain length cap for the match finder's hash table.
pub(crate) const MAX_MARKS: usize = 256;

/// Longest match the LZ77 stage will report.
pub(crate) const MAX_MATCH_LEN: usize = 258;

/// Shortest match length the wire format can express as a length code.
pub(crate) const MIN_MATCH_LEN: usize = 3;

/// Shortest match length the encoder will accept as worth a back-reference
/// over emitting literals; matches 3 long are legal on the wire but too
/// cheap to pay for a length+distance pair.
pub(crate) const MIN_ENCODE_MATCH_LEN: usize = 4;

/// Above this many bytes in a block, emit dynamic Huffman; otherwise fixed.
pub(crate) const DYNAMIC_BLOCK_THRESHOLD: usize = 1024;

pub(crate) const DEFLATE_HEADER_BITS: u32 = 3;

pub(crate) const HLIT_BITS: u32 = 5;
pub(crate) const HDIST_BITS: u32 = 5;
pub(crate) const HCLEN_BITS: u32 = 4;

pub(crate) const MAX_LITLEN_CODES: usize = 288;
pub(crate) const MAX_DIST_CODES: usize = 32;
pub(crate) const MAX_TOTAL_CODES: usize = MAX_LITLEN_CODES + MAX_DIST_CODES;
pub(crate) const CODE_LENGTH_ALPHABET_SIZE: usize = 19;

pub(crate) const BTYPE_STORED: u32 = 0;
pub(crate) const BTYPE_FIXED: u32 = 1;
pub(crate) const BTYPE_DYNAMIC: u32 = 2;
pub(crate) const BTYPE_RESERVED: u32 = 3;

pub(crate) const END_OF_BLOCK: u32 = 256;

/// Order in which dynamic blocks store the 19 code-length-alphabet lengths.
pub(crate) const CODE_LENGTH_ORDER: [usize; CODE_LENGTH_ALPHABET_SIZE] =
    [16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15];

/// Fixed (non-optimized) lengths assigned to the code-length alphabet when
/// emitting a dynamic block's HCLEN table. Preserved as observed in the
/// reference implementation rather than computed from frequencies.
pub(crate) const CODE_LENGTH_ALPHABET_LENGTHS: [u32; CODE_LENGTH_ALPHABET_SIZE] =
    [3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5];
