//! # zlibcodec
//!
//! A streaming zlib (RFC 1950) / DEFLATE (RFC 1951) codec: bit-level I/O, a
//! length-limited canonical Huffman engine, an LZ77 match finder, and the
//! DEFLATE block coder tying them together, with Adler-32 end-to-end
//! integrity checking.
//!
//! ## File example
//!
//! ```rs
//! use zlibcodec::deflate;
//! let mut in_file = std::fs::File::open("some_input_path").expect("open failed");
//! let mut out_file = std::fs::File::create("some_output_path").expect("create failed");
//! deflate(&mut in_file, &mut out_file).expect("compression failed");
//! ```
//!
//! ## Buffer example
//!
//! ```rs
//! use zlibcodec::{deflate_slice, inflate_slice};
//! let data = b"the quick brown fox jumps over the lazy dog";
//! let compressed = deflate_slice(data).expect("compression failed");
//! let restored = inflate_slice(&compressed).expect("decompression failed");
//! assert_eq!(restored, data);
//! ```

mod adler32;
mod bitio;
mod bitstream;
mod circular_buffer;
mod constants;
pub mod deflate;
mod error;
mod huffman;
pub mod inflate;
mod lz77;
mod tables;

pub use deflate::{deflate, deflate_slice};
pub use error::Error;
pub use inflate::{inflate, inflate_slice};
