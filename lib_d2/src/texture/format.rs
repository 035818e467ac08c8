use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::color::Palette;
use crate::compression::{DirectFormat, PixelDepth};
use crate::constants::MAGIC_HEADER;

pub const FLAG_RLE: u8 = 0b0000_0001;
pub const FLAG_PALETTE: u8 = 0b0000_0010;
pub const FLAG_PALETTE_NAME: u8 = 0b0000_0100;
pub const ROTATION_SHIFT: u8 = 3;
pub const ROTATION_MASK: u8 = 0b0001_1000;
pub const RESERVED_MASK: u8 = 0b1110_0000;

/// Pixel layout of a D2 payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureFormat {
    Indexed(PixelDepth),
    Direct(DirectFormat),
}

impl TextureFormat {
    pub const ALL: [TextureFormat; 15] = [
        Self::Indexed(PixelDepth::Bpp1),
        Self::Indexed(PixelDepth::Bpp2),
        Self::Indexed(PixelDepth::Bpp4),
        Self::Indexed(PixelDepth::Bpp8),
        Self::Direct(DirectFormat::Rgb565),
        Self::Direct(DirectFormat::Argb1555),
        Self::Direct(DirectFormat::Argb8888),
        Self::Direct(DirectFormat::Rgb888),
        Self::Direct(DirectFormat::Argb4444),
        Self::Direct(DirectFormat::Rgb444),
        Self::Direct(DirectFormat::Ai44),
        Self::Direct(DirectFormat::Rgba8888),
        Self::Direct(DirectFormat::Rgba4444),
        Self::Direct(DirectFormat::Rgba5551),
        Self::Direct(DirectFormat::Alpha8),
    ];

    /// Wire tag: position in [`TextureFormat::ALL`].
    pub fn tag(self) -> u8 {
        Self::ALL
            .iter()
            .position(|&format| format == self)
            .unwrap_or_default() as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Indexed(PixelDepth::Bpp1) => "I1",
            Self::Indexed(PixelDepth::Bpp2) => "I2",
            Self::Indexed(PixelDepth::Bpp4) => "I4",
            Self::Indexed(PixelDepth::Bpp8) => "I8",
            Self::Direct(DirectFormat::Rgb565) => "RGB565",
            Self::Direct(DirectFormat::Argb1555) => "ARGB1555",
            Self::Direct(DirectFormat::Argb8888) => "ARGB8888",
            Self::Direct(DirectFormat::Rgb888) => "RGB888",
            Self::Direct(DirectFormat::Argb4444) => "ARGB4444",
            Self::Direct(DirectFormat::Rgb444) => "RGB444",
            Self::Direct(DirectFormat::Ai44) => "AI44",
            Self::Direct(DirectFormat::Rgba8888) => "RGBA8888",
            Self::Direct(DirectFormat::Rgba4444) => "RGBA4444",
            Self::Direct(DirectFormat::Rgba5551) => "RGBA5551",
            Self::Direct(DirectFormat::Alpha8) => "ALPHA8",
        }
    }

    pub fn is_indexed(self) -> bool {
        matches!(self, Self::Indexed(_))
    }

    /// Number of palette entries an embedded palette must carry.
    pub fn palette_entries(self) -> Option<usize> {
        match self {
            Self::Indexed(depth) => Some(depth.window_size()),
            Self::Direct(_) => None,
        }
    }

    pub fn payload_len(self, pixel_count: usize) -> usize {
        match self {
            Self::Indexed(depth) => depth.packed_len(pixel_count),
            Self::Direct(format) => format.packed_len(pixel_count),
        }
    }
}

impl fmt::Display for TextureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TextureFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|format| format.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown texture format '{}'", s))
    }
}

/// Clockwise quarter turns applied to the pixels before storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    pub fn quarter_turns(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Cw90 => 1,
            Self::Cw180 => 2,
            Self::Cw270 => 3,
        }
    }

    pub fn from_quarter_turns(turns: u8) -> Self {
        match turns % 4 {
            0 => Self::None,
            1 => Self::Cw90,
            2 => Self::Cw180,
            _ => Self::Cw270,
        }
    }

    pub fn from_degrees(degrees: u32) -> Option<Self> {
        match degrees {
            0 => Some(Self::None),
            90 => Some(Self::Cw90),
            180 => Some(Self::Cw180),
            270 => Some(Self::Cw270),
            _ => None,
        }
    }

    pub fn inverse(self) -> Self {
        Self::from_quarter_turns(4 - self.quarter_turns())
    }

    /// Rotates a row-major buffer of `bytes_per_pixel`-sized pixels and
    /// returns it with its new dimensions.
    pub fn rotate(
        self,
        pixels: &[u8],
        width: usize,
        height: usize,
        bytes_per_pixel: usize,
    ) -> (Vec<u8>, usize, usize) {
        let mut current = (pixels.to_vec(), width, height);
        for _ in 0..self.quarter_turns() {
            current = rotate_cw(&current.0, current.1, current.2, bytes_per_pixel);
        }
        current
    }
}

fn rotate_cw(pixels: &[u8], width: usize, height: usize, bpp: usize) -> (Vec<u8>, usize, usize) {
    let (new_width, new_height) = (height, width);
    let mut rotated = vec![0u8; pixels.len()];
    for y in 0..height {
        for x in 0..width {
            let src = (y * width + x) * bpp;
            let dst = (x * new_width + (height - 1 - y)) * bpp;
            rotated[dst..dst + bpp].copy_from_slice(&pixels[src..src + bpp]);
        }
    }
    (rotated, new_width, new_height)
}

/// In-memory form of a D2 file. `payload` is always the uncompressed pixel data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct D2Texture {
    pub magic: [u8; 2],
    pub format: TextureFormat,
    pub width: u16,
    pub height: u16,
    pub rle: bool,
    pub rotation: Rotation,
    pub palette_name: Option<String>,
    pub palette: Option<Palette>,
    pub payload: Vec<u8>,
}

impl D2Texture {
    pub const MAGIC_SIZE: usize = MAGIC_HEADER.len();
    pub const FORMAT_TAG_SIZE: usize = std::mem::size_of::<u8>();
    pub const WIDTH_HEIGHT_SIZE: usize = std::mem::size_of::<u16>();
    pub const FLAGS_SIZE: usize = std::mem::size_of::<u8>();
    pub const HEADER_SIZE: usize = Self::MAGIC_SIZE
        + Self::FORMAT_TAG_SIZE
        + 2 * Self::WIDTH_HEIGHT_SIZE
        + Self::FLAGS_SIZE;
    pub const MAX_NAME_LEN: usize = u8::MAX as usize;

    pub fn new(format: TextureFormat, width: u16, height: u16, payload: Vec<u8>) -> Self {
        Self {
            magic: MAGIC_HEADER,
            format,
            width,
            height,
            rle: false,
            rotation: Rotation::None,
            palette_name: None,
            palette: None,
            payload,
        }
    }

    pub fn with_rle(mut self, rle: bool) -> Self {
        self.rle = rle;
        self
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = Some(palette);
        self
    }

    pub fn with_palette_name(mut self, name: impl Into<String>) -> Self {
        self.palette_name = Some(name.into());
        self
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn flags(&self) -> u8 {
        let mut flags = self.rotation.quarter_turns() << ROTATION_SHIFT;
        if self.rle {
            flags |= FLAG_RLE;
        }
        if self.palette.is_some() {
            flags |= FLAG_PALETTE;
        }
        if self.palette_name.is_some() {
            flags |= FLAG_PALETTE_NAME;
        }
        flags
    }
}
