//! Byte-run codec used for D2 payloads.
//!
//! Runs of 2..=255 identical bytes become a `(length, value)` pair, anything
//! else is written raw. The decoder treats any byte greater than 1 that has a
//! successor as a run length, so a raw byte > 1 followed by another byte is
//! misread as a run. [`rle_is_lossless`] tells whether a buffer is affected.

/// Compresses `data` into `(length, value)` pairs and raw bytes.
///
/// # Arguments
/// * `data` - Bytes to compress
///
/// # Returns
/// * `Vec<u8>` - Encoded stream, empty for empty input
pub fn rle_compression(data: &[u8]) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        let value = data[i];
        let mut run = 1;
        while i + run < data.len() && data[i + run] == value && run < u8::MAX as usize {
            run += 1;
        }

        if run > 1 {
            encoded.push(run as u8);
            encoded.push(value);
        } else {
            encoded.push(value);
        }
        i += run;
    }

    encoded
}

/// Expands a stream produced by [`rle_compression`].
///
/// # Arguments
/// * `data` - Encoded stream
///
/// # Returns
/// * `Vec<u8>` - Decoded bytes
pub fn rle_decompression(data: &[u8]) -> Vec<u8> {
    let mut decoded = Vec::with_capacity(data.len() * 2);
    let mut i = 0;

    while i < data.len() {
        let current = data[i];
        match data.get(i + 1) {
            Some(&value) if current > 1 => {
                decoded.resize(decoded.len() + current as usize, value);
                i += 2;
            }
            _ => {
                decoded.push(current);
                i += 1;
            }
        }
    }

    decoded
}

/// True when `data` survives a compress/decompress cycle unchanged.
pub fn rle_is_lossless(data: &[u8]) -> bool {
    rle_decompression(&rle_compression(data)) == data
}
