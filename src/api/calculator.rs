//! 帧时间计算器 - 扫描、导出快照、生成报告

use crate::core::config::{ConfigError, ScanConfig};
use crate::core::download::Downloader;
use crate::core::error::{DownloadError, InputError, SourceError};
use crate::core::matcher::{ReferenceImage, Threshold};
use crate::core::report::{ScanReport, SnapshotExporter};
use crate::core::runs::SnapshotPolicy;
use crate::core::scan::{ScanOutcome, Scanner};
use crate::core::video::{FfmpegSource, VideoSource};
use log::{info, warn};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Download(#[from] DownloadError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Input closed before a valid value was entered")]
    InputClosed,
}

/// 运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Process,
    DownloadThenProcess,
    DownloadOnly,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Process, Mode::DownloadThenProcess, Mode::DownloadOnly];

    pub fn label(self) -> &'static str {
        match self {
            Mode::Process => "Process",
            Mode::DownloadThenProcess => "Download then Process",
            Mode::DownloadOnly => "Download only",
        }
    }
}

pub struct FrameTimeCalculator {
    config: ScanConfig,
    output_dir: PathBuf,
    export: bool,
}

impl FrameTimeCalculator {
    pub fn create<P: AsRef<Path>>(config: ScanConfig, output_dir: P) -> Self {
        Self {
            config,
            output_dir: output_dir.as_ref().to_path_buf(),
            export: true,
        }
    }

    pub fn without_export(mut self) -> Self {
        self.export = false;
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn set_threshold(&mut self, threshold: Threshold) {
        self.config.threshold = threshold;
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn load_reference<P: AsRef<Path>>(&self, path: P) -> Result<ReferenceImage, InputError> {
        ReferenceImage::load(path, self.config.reference_reduction)
    }

    /// Opens the video with ffmpeg and scans it. The decoder is released on return.
    pub fn process(&self, video: &Path, reference: &ReferenceImage) -> Result<ScanReport, AppError> {
        let mut source = FfmpegSource::open(video)?;
        self.process_source(&mut source, video, reference)
    }

    pub fn process_source(
        &self,
        source: &mut dyn VideoSource,
        video: &Path,
        reference: &ReferenceImage,
    ) -> Result<ScanReport, AppError> {
        let scanner = Scanner::new(self.config.clone());
        let outcome = scanner.scan(source, reference)?;

        let video_name = video
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| video.display().to_string());
        let mut report =
            ScanReport::build(video_name, &outcome.info, &outcome.runs, outcome.complete);

        if self.export && self.config.snapshot_policy != SnapshotPolicy::None {
            self.export_snapshots(&outcome, video, &mut report);
        }

        info!(
            "✅ Found {} runs, {} matching frames",
            report.runs.len(),
            report.matched_frames
        );
        Ok(report)
    }

    /// Export failures are logged and skipped.
    fn export_snapshots(&self, outcome: &ScanOutcome, video: &Path, report: &mut ScanReport) {
        let exporter = SnapshotExporter::new(&self.output_dir, video);
        let fps = outcome.info.fps;

        for (run, entry) in outcome.runs.iter().zip(report.runs.iter_mut()) {
            match exporter.export_start(run, fps) {
                Ok(path) => entry.snapshot = Some(path),
                Err(e) => warn!("⚠️ Snapshot skipped: {}", e),
            }

            if self.config.snapshot_policy == SnapshotPolicy::StartAndEnd {
                if let Err(e) = exporter.export_end(run, fps) {
                    warn!("⚠️ End snapshot skipped: {}", e);
                }
            }
        }
    }

    pub fn download(&self, url_text: &str) -> Result<PathBuf, DownloadError> {
        Downloader::new(&self.output_dir)?.fetch(url_text)
    }
}
