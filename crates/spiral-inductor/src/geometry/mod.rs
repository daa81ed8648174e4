pub mod point;
pub mod spiral;

pub use point::Point;
pub use spiral::{spiral_path, ArcSegment, SpiralPath};
