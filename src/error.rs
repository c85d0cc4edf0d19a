//! Error kinds surfaced by the codec.

/// Errors that can arise while inflating or deflating a zlib stream.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid compression method (CM != 8)")]
    InvalidCompMethod,
    #[error("invalid window size (> 32 KiB)")]
    InvalidWindowSize,
    #[error("corrupt zlib header")]
    CorruptZlibHeader,
    #[error("unexpected end of stream, needed {needed} more bits")]
    StreamTooShort { needed: usize },
    #[error("stored block LEN/~NLEN mismatch")]
    LenCheckFail,
    #[error("preset dictionaries are not supported")]
    DictIsUsed,
    #[error("illegal BTYPE (3, reserved)")]
    IllegalBtype,
    #[error("match distance {distance} exceeds window size {window_size}")]
    InvalidMatchLen { distance: usize, window_size: usize },
    #[error("Adler-32 checksum mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    AdlerChecksumErr { expected: u32, computed: u32 },
    #[error("I/O error")]
    FileError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
