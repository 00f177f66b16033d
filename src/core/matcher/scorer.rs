use super::reference::{channel_means, ReferenceImage};
use super::threshold::Threshold;
use crate::core::error::ScoreError;
use crate::core::video::Frame;

/// 帧评分器 - 纯函数，不持有输入图像
pub trait FrameScorer: Send + Sync {
    fn score(&self, frame: &Frame, reference: &ReferenceImage) -> Result<f64, ScoreError>;

    fn matches(
        &self,
        frame: &Frame,
        reference: &ReferenceImage,
        threshold: Threshold,
    ) -> Result<bool, ScoreError> {
        Ok(threshold.is_met_by(self.score(frame, reference)?))
    }
}

/// Normalized correlation coefficient (`TM_CCOEFF_NORMED` for equal-size images).
///
/// The frame is resized to the reference's dimensions, then both images are
/// centered on their per-channel means and correlated over all RGB samples.
/// Scores lie in [-1, 1]; an image with zero variance scores 0.
#[derive(Debug, Default, Clone, Copy)]
pub struct CcoeffNormedScorer;

impl CcoeffNormedScorer {
    pub fn new() -> Self {
        Self
    }
}

impl FrameScorer for CcoeffNormedScorer {
    fn score(&self, frame: &Frame, reference: &ReferenceImage) -> Result<f64, ScoreError> {
        if reference.width == 0 || reference.height == 0 || reference.data.is_empty() {
            return Err(ScoreError::EmptyReference);
        }
        frame.validate()?;

        let resized = frame.resize_to(reference.width, reference.height)?;
        let frame_means = channel_means(&resized.data);
        let ref_means = reference.means();

        let mut cross = 0.0f64;
        let mut frame_sq = 0.0f64;
        for (f_px, r_px) in resized
            .data
            .chunks_exact(3)
            .zip(reference.data.chunks_exact(3))
        {
            for c in 0..3 {
                let f = f_px[c] as f64 - frame_means[c];
                let r = r_px[c] as f64 - ref_means[c];
                cross += f * r;
                frame_sq += f * f;
            }
        }

        let denom = (frame_sq * reference.centered_sq_sum()).sqrt();
        if denom <= f64::EPSILON {
            return Ok(0.0);
        }

        Ok((cross / denom).clamp(-1.0, 1.0))
    }
}

/// 模拟评分器，按帧序号返回分数
pub struct MockScorer {
    pattern: Box<dyn Fn(u64) -> Result<f64, ScoreError> + Send + Sync>,
}

impl MockScorer {
    pub fn with_pattern<F>(pattern: F) -> Self
    where
        F: Fn(u64) -> bool + Send + Sync + 'static,
    {
        Self {
            pattern: Box::new(move |index| Ok(if pattern(index) { 1.0 } else { 0.0 })),
        }
    }

    pub fn with_fixed_frames(frames: Vec<u64>) -> Self {
        Self::with_pattern(move |index| frames.contains(&index))
    }

    /// Scores taken from a list by frame index; frames past the end score 0.
    pub fn with_scores(scores: Vec<f64>) -> Self {
        Self {
            pattern: Box::new(move |index| Ok(scores.get(index as usize).copied().unwrap_or(0.0))),
        }
    }

    /// Fails with `ScoreError::EmptyFrame` on the listed frames, matches everything else.
    pub fn failing_on(frames: Vec<u64>) -> Self {
        Self {
            pattern: Box::new(move |index| {
                if frames.contains(&index) {
                    Err(ScoreError::EmptyFrame(index))
                } else {
                    Ok(1.0)
                }
            }),
        }
    }
}

impl FrameScorer for MockScorer {
    fn score(&self, frame: &Frame, _reference: &ReferenceImage) -> Result<f64, ScoreError> {
        (self.pattern)(frame.index)
    }
}
