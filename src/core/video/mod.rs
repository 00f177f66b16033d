pub mod ffmpeg;
pub mod frame;
pub mod source;

pub use ffmpeg::{FfmpegSource, FfmpegTools};
pub use frame::Frame;
pub use source::{MemorySource, VideoInfo, VideoSource};
