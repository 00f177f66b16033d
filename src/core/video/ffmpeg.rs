//! ffmpeg 子进程帧源
//!
//! 元数据来自 `ffprobe -of json`，帧数据由 `ffmpeg` 以 rgb24 原始格式写入管道。

use super::frame::Frame;
use super::source::{VideoInfo, VideoSource};
use crate::core::error::SourceError;
use log::{debug, error, info, warn};
use serde::Deserialize;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Parses an ffprobe rational such as `30000/1001`. `0/0` yields `None`.
fn parse_rational(value: &str) -> Option<f64> {
    let (num, den) = match value.split_once('/') {
        Some((num, den)) => (num.trim().parse::<f64>().ok()?, den.trim().parse::<f64>().ok()?),
        None => (value.trim().parse::<f64>().ok()?, 1.0),
    };
    if den == 0.0 {
        return None;
    }
    let rate = num / den;
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

/// 解析 ffprobe JSON 输出。帧率非法时返回 0，由调用方校验。
pub fn parse_probe(json: &str) -> Result<VideoInfo, SourceError> {
    let probe: ProbeOutput =
        serde_json::from_str(json).map_err(|e| SourceError::Probe(e.to_string()))?;

    let stream = probe
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| SourceError::Probe("no video stream".to_string()))?;

    let fps = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_rational)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_rational))
        .unwrap_or(0.0);

    let duration = probe
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0);

    let frame_count = match stream.nb_frames.as_deref().and_then(|n| n.trim().parse::<u64>().ok()) {
        Some(count) => count,
        None => match duration {
            Some(duration) if fps > 0.0 => (duration * fps).round() as u64,
            _ => 0,
        },
    };

    Ok(VideoInfo {
        frame_count,
        fps,
        width: stream.width.unwrap_or(0),
        height: stream.height.unwrap_or(0),
    })
}

/// ffprobe / ffmpeg 可执行文件位置，默认从 PATH 查找
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegTools {
    pub ffprobe: PathBuf,
    pub ffmpeg: PathBuf,
}

impl Default for FfmpegTools {
    fn default() -> Self {
        Self {
            ffprobe: PathBuf::from("ffprobe"),
            ffmpeg: PathBuf::from("ffmpeg"),
        }
    }
}

fn probe(ffprobe: &Path, path: &Path) -> Result<VideoInfo, SourceError> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,avg_frame_rate,r_frame_rate,nb_frames:format=duration",
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .map_err(|e| SourceError::Open {
            path: path.to_path_buf(),
            reason: format!("failed to run ffprobe: {}", e),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SourceError::Probe(stderr.trim().to_string()));
    }

    parse_probe(&String::from_utf8_lossy(&output.stdout))
}

/// Reads until `buf` is full or the stream ends. Returns the byte count read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// ffmpeg 解码帧源，子进程随 drop 终止
pub struct FfmpegSource {
    path: PathBuf,
    info: VideoInfo,
    child: Child,
    stdout: BufReader<ChildStdout>,
    /// drains ffmpeg's stderr so the child never blocks on a full pipe
    stderr: Option<JoinHandle<String>>,
    frame_len: usize,
    next_index: u64,
    finished: bool,
}

impl FfmpegSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        Self::open_with(path, &FfmpegTools::default())
    }

    pub fn open_with<P: AsRef<Path>>(path: P, tools: &FfmpegTools) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(SourceError::Open {
                path,
                reason: "file not found".to_string(),
            });
        }

        let info = probe(&tools.ffprobe, &path)?;
        if info.width == 0 || info.height == 0 {
            return Err(SourceError::Probe(format!(
                "video stream has invalid size {}x{}",
                info.width, info.height
            )));
        }

        info!(
            "🎬 Opened {:?}: {}x{}, {} frames @ {:.3} fps",
            path, info.width, info.height, info.frame_count, info.fps
        );

        let mut child = Command::new(&tools.ffmpeg)
            .args(["-v", "error", "-nostdin", "-noautorotate", "-i"])
            .arg(&path)
            .args(["-map", "0:v:0", "-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SourceError::Open {
                path: path.clone(),
                reason: format!("failed to spawn ffmpeg: {}", e),
            })?;

        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(SourceError::Open {
                    path,
                    reason: "could not get ffmpeg stdout handle".to_string(),
                });
            }
        };

        let stderr = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut text = String::new();
                if let Err(e) = pipe.read_to_string(&mut text) {
                    debug!("ffmpeg stderr closed: {}", e);
                }
                text
            })
        });

        let frame_len = info.width as usize * info.height as usize * 3;

        Ok(Self {
            path,
            info,
            child,
            stdout: BufReader::with_capacity(frame_len.min(1 << 22), stdout),
            stderr,
            frame_len,
            next_index: 0,
            finished: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reaps ffmpeg once stdout is exhausted. A failed exit or a partial
    /// last frame is a decode error, not the end of the video.
    fn finish_stream(&mut self, index: u64, partial: usize) -> Result<Option<Frame>, SourceError> {
        self.finished = true;

        let status = self
            .child
            .wait()
            .map_err(|source| SourceError::Read { index, source })?;
        let stderr = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        let stderr = stderr.trim();

        if !status.success() {
            let message = if stderr.is_empty() {
                "no diagnostic output".to_string()
            } else {
                stderr.to_string()
            };
            error!("❌ ffmpeg failed at frame {}: {}", index, message);
            return Err(SourceError::Decode {
                index,
                status: status.to_string(),
                message,
            });
        }

        if partial > 0 {
            warn!(
                "⚠️ Truncated frame {} ({} of {} bytes)",
                index, partial, self.frame_len
            );
            return Err(SourceError::Decode {
                index,
                status: status.to_string(),
                message: format!("truncated frame: {} of {} bytes", partial, self.frame_len),
            });
        }

        if !stderr.is_empty() {
            debug!("ffmpeg: {}", stderr);
        }
        debug!("ffmpeg stream ended after {} frames", index);
        Ok(None)
    }
}

impl VideoSource for FfmpegSource {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn read_next(&mut self) -> Result<Option<Frame>, SourceError> {
        if self.finished {
            return Ok(None);
        }

        let index = self.next_index;
        let mut buf = vec![0u8; self.frame_len];
        let read = read_full(&mut self.stdout, &mut buf).map_err(|source| {
            self.finished = true;
            SourceError::Read { index, source }
        })?;

        if read < self.frame_len {
            return self.finish_stream(index, read);
        }

        self.next_index += 1;
        Ok(Some(Frame::new(self.info.width, self.info.height, buf, index)))
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        if let Err(e) = self.child.kill() {
            debug!("ffmpeg already exited: {}", e);
        }
        let _ = self.child.wait();
        debug!("🗑️ FfmpegSource: released {:?}", self.path);
    }
}
