//! Request and response records exchanged with the daemon

mod container;
mod image;
mod system;

pub use container::*;
pub use image::*;
pub use system::*;
