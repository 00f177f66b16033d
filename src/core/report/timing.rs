use crate::core::runs::Run;
use serde::Serialize;

/// Frame count (or index) to seconds. `fps` must be positive.
pub fn frames_to_seconds(frames: u64, fps: f64) -> f64 {
    debug_assert!(fps > 0.0);
    frames as f64 / fps
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunTiming {
    pub start_secs: f64,
    pub elapsed_secs: f64,
}

impl RunTiming {
    pub fn of(run: &Run, fps: f64) -> Self {
        Self {
            start_secs: frames_to_seconds(run.start_index(), fps),
            elapsed_secs: frames_to_seconds(run.length(), fps),
        }
    }
}

/// (hours, minutes, seconds, millis), rounded to the nearest millisecond.
pub fn clock_parts(seconds: f64) -> (u64, u64, u64, u64) {
    let total_ms = if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    };
    let hours = total_ms / 3_600_000;
    let minutes = total_ms / 60_000 % 60;
    let secs = total_ms / 1000 % 60;
    let millis = total_ms % 1000;
    (hours, minutes, secs, millis)
}

/// Format seconds to hh:mm:ss.fff
pub fn format_clock(seconds: f64) -> String {
    let (hours, minutes, secs, millis) = clock_parts(seconds);
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}

pub fn format_seconds(seconds: f64) -> String {
    format!("{:.3}", seconds)
}
