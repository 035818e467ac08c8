use serde::{Deserialize, Serialize};

use super::PackError;

/// Bit depth of an indexed buffer. The window size is the number of palette
/// entries a single pixel can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelDepth {
    Bpp1,
    Bpp2,
    Bpp4,
    Bpp8,
}

impl PixelDepth {
    pub const ALL: [PixelDepth; 4] = [Self::Bpp1, Self::Bpp2, Self::Bpp4, Self::Bpp8];

    pub const fn bits(self) -> usize {
        match self {
            Self::Bpp1 => 1,
            Self::Bpp2 => 2,
            Self::Bpp4 => 4,
            Self::Bpp8 => 8,
        }
    }

    pub const fn window_size(self) -> usize {
        1 << self.bits()
    }

    pub const fn pixels_per_byte(self) -> usize {
        8 / self.bits()
    }

    const fn mask(self) -> u8 {
        ((1u16 << self.bits()) - 1) as u8
    }

    /// `ceil(pixel_count * bits / 8)`.
    pub const fn packed_len(self, pixel_count: usize) -> usize {
        (pixel_count * self.bits() + 7) / 8
    }
}

/// Packed indexed pixels plus the geometry needed to unpack them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedBuffer {
    pub width: u32,
    pub height: u32,
    pub depth: PixelDepth,
    pub data: Vec<u8>,
}

impl IndexedBuffer {
    pub fn pack(
        width: u32,
        height: u32,
        depth: PixelDepth,
        indices: &[u8],
    ) -> Result<Self, PackError> {
        let expected = width as usize * height as usize;
        if indices.len() != expected {
            return Err(PackError::LengthMismatch {
                expected,
                actual: indices.len(),
            });
        }
        Ok(Self {
            width,
            height,
            depth,
            data: pack_indices(indices, depth)?,
        })
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn indices(&self) -> Result<Vec<u8>, PackError> {
        unpack_indices(&self.data, self.depth, self.pixel_count())
    }
}

/// Packs palette indices LSB-first: pixel `i` lands in byte `i / per_byte`
/// at bit shift `(i % per_byte) * bits`. Unused trailing bits stay zero.
pub fn pack_indices(indices: &[u8], depth: PixelDepth) -> Result<Vec<u8>, PackError> {
    if depth == PixelDepth::Bpp8 {
        return Ok(indices.to_vec());
    }

    let per_byte = depth.pixels_per_byte();
    let bits = depth.bits();
    let mut packed = vec![0u8; depth.packed_len(indices.len())];

    for (i, &index) in indices.iter().enumerate() {
        if index as usize >= depth.window_size() {
            return Err(PackError::IndexOutOfRange {
                position: i,
                index,
                window: depth.window_size(),
            });
        }
        packed[i / per_byte] |= index << ((i % per_byte) * bits);
    }

    Ok(packed)
}

/// Inverse of [`pack_indices`] for the first `pixel_count` pixels.
pub fn unpack_indices(
    packed: &[u8],
    depth: PixelDepth,
    pixel_count: usize,
) -> Result<Vec<u8>, PackError> {
    let expected = depth.packed_len(pixel_count);
    if packed.len() < expected {
        return Err(PackError::Truncated {
            expected,
            actual: packed.len(),
        });
    }

    let per_byte = depth.pixels_per_byte();
    let bits = depth.bits();
    let mask = depth.mask();

    Ok((0..pixel_count)
        .map(|i| (packed[i / per_byte] >> ((i % per_byte) * bits)) & mask)
        .collect())
}
