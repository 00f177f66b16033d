use crate::core::error::DownloadError;
use log::{debug, info, warn};
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36";
const DEFAULT_FILE_NAME: &str = "video.mp4";
const YOUTUBE_HOSTS: [&str; 4] = ["youtube.com", "youtu.be", "music.youtube.com", "youtube-nocookie.com"];

/// 从粘贴的文本中提取第一个 http(s) 链接
pub fn extract_url(text: &str) -> Result<String, DownloadError> {
    let regex = Regex::new(r#"https?://[^\s"'<>]+"#)
        .map_err(|e| DownloadError::Pattern(e.to_string()))?;

    regex
        .find(text)
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| DownloadError::NoUrl(text.trim().to_string()))
}

fn host_of(url: &str) -> &str {
    let after_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let authority = after_scheme
        .split(&['/', '?', '#'][..])
        .next()
        .unwrap_or(after_scheme);
    let host = authority.rsplit('@').next().unwrap_or(authority);
    host.split(':').next().unwrap_or(host)
}

/// YouTube 页面链接需要先解析出真实视频流
pub fn is_youtube(url: &str) -> bool {
    let host = host_of(url).to_ascii_lowercase();
    let host = host
        .strip_prefix("www.")
        .or_else(|| host.strip_prefix("m."))
        .unwrap_or(&host);
    YOUTUBE_HOSTS.contains(&host)
}

/// A missing content type is accepted; HTML pages and other documents are not.
pub fn is_video_content_type(content_type: Option<&str>) -> bool {
    let Some(value) = content_type else {
        return true;
    };
    let mime = value
        .split(';')
        .next()
        .unwrap_or(value)
        .trim()
        .to_ascii_lowercase();
    mime.starts_with("video/")
        || matches!(
            mime.as_str(),
            "application/octet-stream" | "binary/octet-stream" | "application/mp4"
        )
}

/// Local file name for a URL: last path segment without query, or `video.mp4`.
pub fn file_name_for(url: &str) -> String {
    let without_query = url.split(&['?', '#'][..]).next().unwrap_or(url);
    let after_scheme = without_query
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(without_query);

    let segment = after_scheme
        .split_once('/')
        .and_then(|(_, path)| path.rsplit('/').find(|s| !s.is_empty()))
        .unwrap_or("");

    let cleaned: String = segment
        .chars()
        .filter(|c| !matches!(*c, '\\' | ':' | '*' | '"' | '<' | '>' | '|'))
        .collect();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        DEFAULT_FILE_NAME.to_string()
    } else {
        cleaned
    }
}

/// Creates `dir/name`, or `dir/<stem> (n).<ext>` when that name is taken.
fn create_unique(dir: &Path, name: &str) -> Result<(PathBuf, File), DownloadError> {
    let original = Path::new(name);
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let ext = original.extension().map(|e| e.to_string_lossy().into_owned());

    for n in 0..1000u32 {
        let candidate = match (n, &ext) {
            (0, _) => name.to_string(),
            (_, Some(ext)) => format!("{} ({}).{}", stem, n, ext),
            (_, None) => format!("{} ({})", stem, n),
        };
        let path = dir.join(candidate);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(std::io::Error::new(
        ErrorKind::AlreadyExists,
        format!("no free file name for {:?} in {:?}", name, dir),
    )
    .into())
}

/// 视频下载器：YouTube 链接交给 yt-dlp，其余链接直接 HTTP 下载
pub struct Downloader {
    client: Client,
    dest_dir: PathBuf,
    ytdlp: PathBuf,
}

impl Downloader {
    pub fn new<P: AsRef<Path>>(dest_dir: P) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self::with_client(client, dest_dir))
    }

    pub fn with_client<P: AsRef<Path>>(client: Client, dest_dir: P) -> Self {
        Self {
            client,
            dest_dir: dest_dir.as_ref().to_path_buf(),
            ytdlp: PathBuf::from("yt-dlp"),
        }
    }

    /// Program used for YouTube links. Defaults to `yt-dlp` on `PATH`.
    pub fn with_ytdlp<P: Into<PathBuf>>(mut self, program: P) -> Self {
        self.ytdlp = program.into();
        self
    }

    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }

    /// Downloads `text`'s first URL into the destination directory.
    pub fn fetch(&self, text: &str) -> Result<PathBuf, DownloadError> {
        let url = extract_url(text)?;
        info!("⬇️ Downloading {} to {:?}...", url, self.dest_dir);
        std::fs::create_dir_all(&self.dest_dir)?;

        let path = if is_youtube(&url) {
            self.fetch_with_ytdlp(&url)?
        } else {
            self.fetch_http(&url)?
        };

        info!("✅ Download complete: {:?}", path);
        Ok(path)
    }

    fn fetch_with_ytdlp(&self, url: &str) -> Result<PathBuf, DownloadError> {
        let output = Command::new(&self.ytdlp)
            .args([
                "--no-playlist",
                "--no-progress",
                "--no-overwrites",
                "-f",
                "b[ext=mp4]/b",
                "-o",
                "%(title)s.%(ext)s",
                "--print",
                "after_move:filepath",
                "-P",
            ])
            .arg(&self.dest_dir)
            .arg(url)
            .output()
            .map_err(|e| DownloadError::Tool(format!("could not run {:?}: {}", self.ytdlp, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DownloadError::Tool(stderr.trim().to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let path = stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .map(PathBuf::from)
            .ok_or_else(|| DownloadError::Tool("no output file reported".to_string()))?;

        if !path.is_file() {
            return Err(DownloadError::Tool(format!("reported file {:?} is missing", path)));
        }
        Ok(path)
    }

    fn fetch_http(&self, url: &str) -> Result<PathBuf, DownloadError> {
        let mut resp = self.client.get(url).send()?.error_for_status()?;

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if !is_video_content_type(content_type.as_deref()) {
            return Err(DownloadError::NotVideo {
                url: url.to_string(),
                content_type: content_type.unwrap_or_default(),
            });
        }

        let (path, file) = create_unique(&self.dest_dir, &file_name_for(resp.url().as_str()))?;
        let mut writer = BufWriter::new(file);
        let written = resp
            .copy_to(&mut writer)
            .map_err(DownloadError::from)
            .and_then(|n| writer.flush().map(|_| n).map_err(DownloadError::from));

        match written {
            Ok(n) => {
                debug!("Wrote {} bytes", n);
                Ok(path)
            }
            Err(e) => {
                drop(writer);
                if let Err(rm) = std::fs::remove_file(&path) {
                    warn!("⚠️ Could not remove partial download {:?}: {}", path, rm);
                }
                Err(e)
            }
        }
    }
}
