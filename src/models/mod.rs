pub mod api;
pub mod dish;
pub mod image;
pub mod text;

pub use api::*;
pub use dish::*;
pub use image::*;
pub use text::*;
