use std::path::PathBuf;
use thiserror::Error;

/// 用户输入错误 - 交互模式下重新提示，不会终止程序
#[derive(Debug, Error)]
pub enum InputError {
    #[error("File at \"{0}\" not found")]
    FileNotFound(PathBuf),
    #[error("Path is empty")]
    EmptyPath,
    #[error("Invalid threshold \"{0}\" (expected 0.00 - 1.00)")]
    InvalidThreshold(String),
    #[error("Option \"{0}\" was invalid")]
    InvalidOption(String),
    #[error("Failed to load reference image {path:?}: {source}")]
    Reference {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Reference image {0:?} has zero size")]
    EmptyReference(PathBuf),
}

/// 单帧评分错误 - 该帧按不匹配处理，扫描继续
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreError {
    #[error("frame {0} has zero size")]
    EmptyFrame(u64),
    #[error("reference image has zero size")]
    EmptyReference,
    #[error("frame {index} buffer holds {actual} bytes, expected {expected}")]
    MalformedBuffer {
        index: u64,
        expected: usize,
        actual: usize,
    },
}

/// 视频源错误 - 整个扫描失败
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to open video {path:?}: {reason}")]
    Open { path: PathBuf, reason: String },
    #[error("Failed to probe video metadata: {0}")]
    Probe(String),
    #[error("Video reports no frames")]
    NoFrames,
    #[error("Video reports invalid frame rate {0}")]
    InvalidFrameRate(f64),
    #[error("Failed to read frame {index}: {source}")]
    Read {
        index: u64,
        #[source]
        source: std::io::Error,
    },
    #[error("Decoder stopped at frame {index} ({status}): {message}")]
    Decode {
        index: u64,
        status: String,
        message: String,
    },
}

/// 快照导出错误 - 单个快照跳过，不影响报告
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Snapshot {0:?} already exists")]
    AlreadyExists(PathBuf),
    #[error("Failed to create snapshot directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write snapshot {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Frame {0} has no retained snapshot")]
    MissingSnapshot(u64),
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("No URL found in \"{0}\"")]
    NoUrl(String),
    #[error("URL pattern error: {0}")]
    Pattern(String),
    #[error("\"{url}\" is not a video (content type {content_type})")]
    NotVideo { url: String, content_type: String },
    #[error("yt-dlp failed: {0}")]
    Tool(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
