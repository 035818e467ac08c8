pub mod decoder;
pub mod encoder;
pub mod format;

pub use decoder::{decode, DecodeError};
pub use encoder::{encode, EncodingError};
pub use format::{D2Texture, Rotation, TextureFormat};
