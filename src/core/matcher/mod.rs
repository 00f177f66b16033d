//! 帧评分 - 将视频帧与参考图比较，输出匹配布尔信号

pub mod reference;
pub mod scorer;
pub mod threshold;

pub use reference::ReferenceImage;
pub use scorer::{CcoeffNormedScorer, FrameScorer, MockScorer};
pub use threshold::{Threshold, DEFAULT_THRESHOLD};
