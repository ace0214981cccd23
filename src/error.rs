use thiserror::Error;

use crate::display::DisplayId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to allocate render surface {width}x{height}")]
    ResourceExhausted { width: u32, height: u32 },
    #[error("Invalid surface size: {width}x{height}")]
    InvalidSurfaceSize { width: u32, height: u32 },
    #[error("Pixel readback failed: {0}")]
    PixelReadback(String),
    #[error("GPU error: {0}")]
    Gpu(String),
    #[error("Failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
    #[error("Unknown display object: {0:?}")]
    UnknownDisplayObject(DisplayId),
    #[error("Display object {0:?} cannot hold children")]
    NotAContainer(DisplayId),
    #[error("{child:?} is not a child of {parent:?}")]
    NotAChild { parent: DisplayId, child: DisplayId },
}

pub type Result<T> = std::result::Result<T, Error>;
