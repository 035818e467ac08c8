pub mod cache;
pub mod color;
pub mod compression;
pub mod constants;
pub mod histogram;
pub mod matcher;
pub mod pipeline;
pub mod quantize;
pub mod settings;
pub mod task;
pub mod texture;

use log::*;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

pub use crate::color::{Color, Palette, SourceBitmap};
pub use crate::pipeline::{preview, PipelineError, TextureConverter};
pub use crate::settings::TextureSettings;
pub use crate::texture::format::{D2Texture, TextureFormat};
pub use crate::texture::{decode, encode};

/// Routes library logs to `target`, or stderr when `None`.
pub fn init_logging(target: Option<&Path>) -> io::Result<()> {
    let mut builder = env_logger::Builder::new();
    if let Some(path) = target {
        let file = Box::new(File::create(path)?);
        builder.target(env_logger::Target::Pipe(file));
    }

    builder
        .filter(Some("lib_d2"), LevelFilter::Debug)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}:{}] {}",
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        });

    if builder.try_init().is_err() {
        warn!("Logger already initialized");
    }
    Ok(())
}
