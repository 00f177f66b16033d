pub mod export;
pub mod summary;
pub mod timing;

pub use export::{write_new_file, SnapshotExporter};
pub use summary::{RunReport, ScanReport};
pub use timing::{format_clock, format_seconds, frames_to_seconds, RunTiming};
