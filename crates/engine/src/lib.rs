pub mod audio;
pub mod captions;
pub mod fit;
pub mod merger;
pub mod render;
pub mod segmenter;
pub mod timeline;

pub use timeline::*;
