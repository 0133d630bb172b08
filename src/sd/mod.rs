mod driver;
mod sdcard;

extern crate log;

/// Use a block size of 512 bytes
pub const BLOCK_SIZE: usize = 512;

pub use driver::{SdDriver, SdError};
pub use sdcard::{install_driver, SdCard};
