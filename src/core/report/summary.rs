use super::timing::{format_clock, format_seconds, frames_to_seconds, RunTiming};
use crate::core::runs::{Run, RunSet};
use crate::core::video::VideoInfo;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::PathBuf;

const RULE: &str = "----------";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub start_index: u64,
    pub end_index: u64,
    pub length_frames: u64,
    pub start_secs: f64,
    pub elapsed_secs: f64,
    pub snapshot: Option<PathBuf>,
}

impl RunReport {
    pub fn new(run: &Run, fps: f64) -> Self {
        let timing = RunTiming::of(run, fps);
        Self {
            start_index: run.start_index(),
            end_index: run.end_index(),
            length_frames: run.length(),
            start_secs: timing.start_secs,
            elapsed_secs: timing.elapsed_secs,
            snapshot: None,
        }
    }
}

/// 扫描结果报告
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanReport {
    pub video: String,
    pub fps: f64,
    pub frame_count: u64,
    pub processed_frames: u64,
    pub runs: Vec<RunReport>,
    pub matched_frames: u64,
    pub matched_secs: f64,
    /// false when the video stream failed before its end
    pub complete: bool,
}

impl ScanReport {
    /// `info` must already be validated (positive fps).
    pub fn build(video: impl Into<String>, info: &VideoInfo, runs: &RunSet, complete: bool) -> Self {
        let fps = info.fps;
        Self {
            video: video.into(),
            fps,
            frame_count: info.frame_count,
            processed_frames: runs.processed_frames(),
            runs: runs.iter().map(|run| RunReport::new(run, fps)).collect(),
            matched_frames: runs.matched_frames(),
            matched_secs: frames_to_seconds(runs.matched_frames(), fps),
            complete,
        }
    }

    /// Plain-text rendering, one line per run plus totals.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", RULE);
        for run in &self.runs {
            let _ = writeln!(
                out,
                "{} (for {} seconds)",
                format_clock(run.start_secs),
                format_seconds(run.elapsed_secs)
            );
        }
        let _ = writeln!(out, "{}", RULE);
        let _ = writeln!(out);
        let _ = writeln!(out, "Total Frames: {}", self.matched_frames);
        let _ = writeln!(out, "Total Time: {}", format_clock(self.matched_secs));
        if !self.complete {
            let _ = writeln!(
                out,
                "(incomplete: stopped after {} of {} frames)",
                self.processed_frames, self.frame_count
            );
        }
        out
    }
}
