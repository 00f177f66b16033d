//! 扫描管线：视频源 → 帧评分 → 区间检测
//!
//! 帧按批读取，批内用 rayon 并行评分（collect 保持顺序），
//! 再严格按帧序号逐个送入状态机。

use crate::core::config::ScanConfig;
use crate::core::error::SourceError;
use crate::core::matcher::{CcoeffNormedScorer, FrameScorer, ReferenceImage};
use crate::core::runs::{MatchSample, RunDetector, RunSet};
use crate::core::video::{Frame, VideoInfo, VideoSource};
use log::{debug, info, warn};
use rayon::prelude::*;

#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub info: VideoInfo,
    pub runs: RunSet,
    /// false when the source failed mid-stream; `runs` covers the frames read before that
    pub complete: bool,
}

struct Progress {
    total: u64,
    next_pct: u64,
}

impl Progress {
    fn new(total: u64) -> Self {
        Self {
            total: total.max(1),
            next_pct: 10,
        }
    }

    fn update(&mut self, index: u64) {
        let pct = ((index + 1) * 100 / self.total).min(100);
        if pct >= self.next_pct {
            info!("⏳ Processing... {:02}%", pct);
            self.next_pct = pct / 10 * 10 + 10;
        }
    }
}

fn encode_snapshot(frame: &Frame) -> Option<Vec<u8>> {
    match frame.encode_png() {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            warn!("⚠️ Failed to encode snapshot for frame {}: {}", frame.index, e);
            None
        }
    }
}

pub struct Scanner<S: FrameScorer = CcoeffNormedScorer> {
    config: ScanConfig,
    scorer: S,
}

impl Scanner<CcoeffNormedScorer> {
    pub fn new(config: ScanConfig) -> Self {
        Self::with_scorer(config, CcoeffNormedScorer::new())
    }
}

impl<S: FrameScorer> Scanner<S> {
    pub fn with_scorer(config: ScanConfig, scorer: S) -> Self {
        Self { config, scorer }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scores one batch. A `ScoreError` marks that frame as non-matching.
    fn score_batch(&self, batch: &[Frame], reference: &ReferenceImage) -> Vec<bool> {
        let threshold = self.config.threshold;
        let score_one = |frame: &Frame| match self.scorer.matches(frame, reference, threshold) {
            Ok(matched) => matched,
            Err(e) => {
                warn!("⚠️ Frame {} treated as non-matching: {}", frame.index, e);
                false
            }
        };

        if batch.len() <= 1 {
            batch.iter().map(score_one).collect()
        } else {
            batch.par_iter().map(score_one).collect()
        }
    }

    pub fn scan(
        &self,
        source: &mut dyn VideoSource,
        reference: &ReferenceImage,
    ) -> Result<ScanOutcome, SourceError> {
        let info = source.info().clone();
        info.validate()?;

        info!(
            "🔍 Scanning {} frames @ {:.3} fps (threshold {}, batch {})",
            info.frame_count, info.fps, self.config.threshold, self.config.batch_size
        );

        let batch_size = self.config.batch_size.max(1);
        let mut detector =
            RunDetector::with_config(self.config.end_convention, self.config.snapshot_policy);
        let mut progress = Progress::new(info.frame_count);
        let mut read_error: Option<SourceError> = None;
        let mut batch: Vec<Frame> = Vec::with_capacity(batch_size);

        loop {
            batch.clear();
            let mut stream_ended = false;

            while batch.len() < batch_size {
                match source.read_next() {
                    Ok(Some(frame)) => batch.push(frame),
                    Ok(None) => {
                        stream_ended = true;
                        break;
                    }
                    Err(e) => {
                        warn!("❌ Video stream failed: {}", e);
                        read_error = Some(e);
                        stream_ended = true;
                        break;
                    }
                }
            }

            let matches = self.score_batch(&batch, reference);
            for (frame, matched) in batch.iter().zip(matches) {
                detector.process_sample(MatchSample::new(frame.index, matched), || {
                    encode_snapshot(frame)
                });
                progress.update(frame.index);
            }

            if stream_ended {
                break;
            }
        }

        if detector.frame_count() == 0 {
            return Err(read_error.unwrap_or(SourceError::NoFrames));
        }

        let complete = read_error.is_none();
        let runs = detector.finish();
        debug!(
            "Scan finished: {} frames, {} matched, {} runs",
            runs.processed_frames(),
            runs.matched_frames(),
            runs.len()
        );
        if !complete {
            warn!(
                "⚠️ Scan incomplete: {} of {} frames processed",
                runs.processed_frames(),
                info.frame_count
            );
        }

        Ok(ScanOutcome {
            info,
            runs,
            complete,
        })
    }
}
