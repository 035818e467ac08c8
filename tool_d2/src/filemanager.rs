use image::ImageError;
use lib_d2::color::{Palette, SourceBitmap};
use lib_d2::constants::FILE_EXT;
use lib_d2::pipeline::{bitmap_from_rgba, PipelineError};
use lib_d2::texture::DecodeError;
use lib_d2::{decode, D2Texture};
use log::debug;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use thiserror::Error;

use crate::palfile::{self, PalFileError};

#[derive(Error, Debug)]
pub enum FileError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    #[error("D2 decode error: {0}")]
    DecodeError(#[from] DecodeError),

    #[error("Palette file error: {0}")]
    PaletteError(#[from] PalFileError),

    #[error("Source image rejected: {0}")]
    SourceError(#[from] PipelineError),

    #[error("Unsupported file extension")]
    UnsupportedExtension,
}

/// Loads a standard image file as RGBA. D2 files are rejected; use [`open_texture`].
pub fn open_image(path: &Path) -> Result<SourceBitmap, FileError> {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or(FileError::UnsupportedExtension)?
        .to_ascii_lowercase();

    match ext.as_str() {
        "png" | "jpg" | "jpeg" | "bmp" | "webp" | "tga" | "gif" => {
            let image = image::open(path)?.into_rgba8();
            let (width, height) = image.dimensions();
            debug!("Opened {}x{} image {}", width, height, path.display());
            Ok(bitmap_from_rgba(width, height, image.into_raw())?)
        }
        _ => Err(FileError::UnsupportedExtension),
    }
}

pub fn open_texture(path: &Path) -> Result<D2Texture, FileError> {
    if path.extension().and_then(|ext| ext.to_str()) != Some(FILE_EXT) {
        debug!("Reading {} as D2 despite its extension", path.display());
    }
    let mut file = File::open(path)?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;

    Ok(decode(&buffer)?)
}

pub fn open_palette(path: Option<&Path>) -> Result<Option<Palette>, FileError> {
    Ok(path.map(palfile::load).transpose()?)
}

pub fn save_texture(path: &Path, encoded_data: &[u8]) -> Result<(), FileError> {
    let mut file = File::create(path)?;
    file.write_all(encoded_data)?;
    println!("File saved successfully to {}", path.display());
    Ok(())
}

pub fn save_preview(
    path: &Path,
    width: usize,
    height: usize,
    rgba: &[u8],
) -> Result<(), FileError> {
    image::save_buffer(
        path,
        rgba,
        width as u32,
        height as u32,
        image::ExtendedColorType::Rgba8,
    )?;
    println!("Preview saved successfully to {}", path.display());
    Ok(())
}
