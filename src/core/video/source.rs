use super::frame::Frame;
use crate::core::error::SourceError;
use serde::Serialize;
use std::collections::VecDeque;

/// 视频元数据
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoInfo {
    pub frame_count: u64,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

impl VideoInfo {
    /// Rejects metadata that cannot produce a time-based result.
    pub fn validate(&self) -> Result<(), SourceError> {
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(SourceError::InvalidFrameRate(self.fps));
        }
        if self.frame_count == 0 {
            return Err(SourceError::NoFrames);
        }
        Ok(())
    }
}

/// Sequential, finite frame stream.
pub trait VideoSource {
    fn info(&self) -> &VideoInfo;

    /// Next decoded frame, `Ok(None)` at end of stream.
    fn read_next(&mut self) -> Result<Option<Frame>, SourceError>;
}

/// 内存帧源（测试和库调用方使用）
pub struct MemorySource {
    info: VideoInfo,
    frames: VecDeque<Frame>,
    fail_at: Option<u64>,
}

impl MemorySource {
    pub fn new(fps: f64, frames: Vec<Frame>) -> Self {
        let (width, height) = frames
            .first()
            .map(|f| (f.width, f.height))
            .unwrap_or((0, 0));
        let info = VideoInfo {
            frame_count: frames.len() as u64,
            fps,
            width,
            height,
        };
        Self::with_info(info, frames)
    }

    pub fn with_info(info: VideoInfo, frames: Vec<Frame>) -> Self {
        Self {
            info,
            frames: frames.into(),
            fail_at: None,
        }
    }

    /// Makes `read_next` fail when the frame with this index is due.
    pub fn failing_at(mut self, index: u64) -> Self {
        self.fail_at = Some(index);
        self
    }
}

impl VideoSource for MemorySource {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn read_next(&mut self) -> Result<Option<Frame>, SourceError> {
        if let (Some(fail_at), Some(next)) = (self.fail_at, self.frames.front()) {
            if next.index == fail_at {
                return Err(SourceError::Read {
                    index: fail_at,
                    source: std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "simulated decode failure",
                    ),
                });
            }
        }
        Ok(self.frames.pop_front())
    }
}
