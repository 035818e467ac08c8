pub mod direct;
pub mod indexed;
pub mod rle;

use thiserror::Error;

pub use direct::{pack_direct, unpack_direct, DirectFormat};
pub use indexed::{pack_indices, unpack_indices, IndexedBuffer, PixelDepth};
pub use rle::{rle_compression, rle_decompression, rle_is_lossless};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PackError {
    #[error("Index {index} at pixel {position} does not fit a {window}-color window")]
    IndexOutOfRange {
        position: usize,
        index: u8,
        window: usize,
    },
    #[error("Expected {expected} indices for the buffer dimensions, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("Packed data too short: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
}
