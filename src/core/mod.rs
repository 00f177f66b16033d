pub mod config;
pub mod download;
pub mod error;
pub mod matcher;
pub mod report;
pub mod runs;
pub mod scan;
pub mod video;

pub use config::ScanConfig;
pub use error::{DownloadError, ExportError, InputError, ScoreError, SourceError};
pub use scan::{ScanOutcome, Scanner};
