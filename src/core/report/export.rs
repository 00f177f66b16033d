use super::timing::clock_parts;
use crate::core::error::ExportError;
use crate::core::runs::Run;
use log::{debug, info};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

pub const SNAPSHOT_DIR: &str = "Snapshots";

/// 写入新文件，目标已存在时返回 `AlreadyExists` 且不改动原文件
pub fn write_new_file(bytes: &[u8], path: &Path) -> Result<(), ExportError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            fs::create_dir_all(parent).map_err(|source| ExportError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|source| {
            if source.kind() == ErrorKind::AlreadyExists {
                ExportError::AlreadyExists(path.to_path_buf())
            } else {
                ExportError::Write {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

    file.write_all(bytes)
        .and_then(|_| file.flush())
        .map_err(|source| ExportError::Write {
            path: path.to_path_buf(),
            source,
        })
}

/// Folder name for a video's snapshots: trimmed stem, spaces replaced by `_`.
pub fn snapshot_folder_name(video_path: &Path) -> String {
    let stem = video_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name: String = stem
        .trim()
        .chars()
        .map(|c| if c == ' ' { '_' } else { c })
        .collect();
    if name.is_empty() {
        "video".to_string()
    } else {
        name
    }
}

pub fn snapshot_file_name(index: u64, start_secs: f64, suffix: &str) -> String {
    let (hours, minutes, secs, _) = clock_parts(start_secs);
    format!(
        "Frame{}_{:02}-{:02}-{:02}{}.png",
        index, hours, minutes, secs, suffix
    )
}

/// 快照导出器：<output>/Snapshots/<视频名>/Frame<idx>_<hh>-<mm>-<ss>.png
#[derive(Debug, Clone)]
pub struct SnapshotExporter {
    dir: PathBuf,
}

impl SnapshotExporter {
    pub fn new<P: AsRef<Path>, V: AsRef<Path>>(output_dir: P, video_path: V) -> Self {
        let dir = output_dir
            .as_ref()
            .join(SNAPSHOT_DIR)
            .join(snapshot_folder_name(video_path.as_ref()));
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes the run's starting snapshot.
    pub fn export_start(&self, run: &Run, fps: f64) -> Result<PathBuf, ExportError> {
        let image = run
            .start()
            .image
            .as_ref()
            .ok_or(ExportError::MissingSnapshot(run.start_index()))?;
        let start_secs = run.start_index() as f64 / fps;
        let path = self
            .dir
            .join(snapshot_file_name(run.start_index(), start_secs, ""));

        write_new_file(image, &path)?;
        info!("📸 Exported snapshot {:?}", path);
        Ok(path)
    }

    /// Writes the run's ending snapshot, named after the end frame.
    pub fn export_end(&self, run: &Run, fps: f64) -> Result<PathBuf, ExportError> {
        let image = run
            .end()
            .image
            .as_ref()
            .ok_or(ExportError::MissingSnapshot(run.end_index()))?;
        let end_secs = run.end_index() as f64 / fps;
        let path = self
            .dir
            .join(snapshot_file_name(run.end_index(), end_secs, "_end"));

        write_new_file(image, &path)?;
        debug!("Exported end snapshot {:?}", path);
        Ok(path)
    }
}
