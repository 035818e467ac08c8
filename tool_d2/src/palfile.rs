//! JASC-PAL palette files.
//!
//! ```text
//! JASC-PAL
//! 0100
//! 3
//! 0 0 0
//! 255 0 0
//! 0 0 255 128
//! ```

use std::fs;
use std::io;
use std::path::Path;

use lib_d2::color::{Color, Palette};
use log::{debug, warn};
use thiserror::Error;

const MAGIC: &str = "JASC-PAL";
const VERSION: &str = "0100";

#[derive(Error, Debug)]
pub enum PalFileError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Missing JASC-PAL header")]
    MissingHeader,
    #[error("Unsupported JASC-PAL version {0:?}")]
    UnsupportedVersion(String),
    #[error("Invalid color count {0:?}")]
    InvalidCount(String),
    #[error("Line {line}: expected `r g b` or `r g b a`, got {text:?}")]
    InvalidColor { line: usize, text: String },
    #[error("Expected {expected} colors, found {actual}")]
    CountMismatch { expected: usize, actual: usize },
}

pub fn load(path: &Path) -> Result<Palette, PalFileError> {
    let text = fs::read_to_string(path)?;
    let palette = parse(&text)?;
    debug!("Loaded {} colors from {}", palette.len(), path.display());
    Ok(palette)
}

pub fn parse(text: &str) -> Result<Palette, PalFileError> {
    let mut lines = text.lines().map(str::trim).enumerate();

    match lines.next() {
        Some((_, MAGIC)) => {}
        _ => return Err(PalFileError::MissingHeader),
    }
    match lines.next() {
        Some((_, VERSION)) => {}
        Some((_, other)) => return Err(PalFileError::UnsupportedVersion(other.to_owned())),
        None => return Err(PalFileError::MissingHeader),
    }
    let count = match lines.next() {
        Some((_, count)) => count
            .parse::<usize>()
            .map_err(|_| PalFileError::InvalidCount(count.to_owned()))?,
        None => return Err(PalFileError::MissingHeader),
    };

    let mut palette = Palette::new();
    for (index, line) in lines.filter(|(_, line)| !line.is_empty()) {
        palette.push(parse_color(line).ok_or_else(|| PalFileError::InvalidColor {
            line: index + 1,
            text: line.to_owned(),
        })?);
    }

    if palette.len() < count {
        return Err(PalFileError::CountMismatch {
            expected: count,
            actual: palette.len(),
        });
    }
    if palette.len() > count {
        warn!(
            "Palette file lists {} colors but declares {}, ignoring the rest",
            palette.len(),
            count
        );
        let mut colors = palette.into_colors();
        colors.truncate(count);
        palette = Palette::from_colors(colors);
    }
    Ok(palette)
}

fn parse_color(line: &str) -> Option<Color> {
    let channels = line
        .split_whitespace()
        .map(|value| value.parse::<u8>().ok())
        .collect::<Option<Vec<u8>>>()?;
    match channels[..] {
        [r, g, b] => Some(Color::rgb(r, g, b)),
        [r, g, b, a] => Some(Color::new(r, g, b, a)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rgb_and_rgba_lines() {
        let palette = parse("JASC-PAL\n0100\n3\n0 0 0\n255 0 0\r\n0 0 255 128\n").unwrap();
        assert_eq!(
            palette.colors(),
            &[
                Color::rgb(0, 0, 0),
                Color::rgb(255, 0, 0),
                Color::new(0, 0, 255, 128)
            ]
        );
    }

    #[test]
    fn test_parse_rejects_bad_header() {
        assert!(matches!(
            parse("RIFF\n0100\n1\n0 0 0\n"),
            Err(PalFileError::MissingHeader)
        ));
        assert!(matches!(
            parse("JASC-PAL\n0200\n1\n0 0 0\n"),
            Err(PalFileError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_parse_rejects_bad_color() {
        assert!(matches!(
            parse("JASC-PAL\n0100\n1\n0 300 0\n"),
            Err(PalFileError::InvalidColor { line: 4, .. })
        ));
    }

    #[test]
    fn test_parse_count_mismatch() {
        assert!(matches!(
            parse("JASC-PAL\n0100\n2\n0 0 0\n"),
            Err(PalFileError::CountMismatch {
                expected: 2,
                actual: 1
            })
        ));
        let palette = parse("JASC-PAL\n0100\n1\n1 2 3\n4 5 6\n").unwrap();
        assert_eq!(palette.len(), 1);
    }
}
