//! 交互式输入：菜单、路径、阈值、下载链接
//!
//! 无效输入打印错误后重新提示，输入流关闭时返回 `AppError::InputClosed`。

use super::calculator::{AppError, Mode};
use crate::core::error::{DownloadError, InputError};
use crate::core::matcher::{ReferenceImage, Threshold};
use std::fmt::Display;
use std::io::{BufRead, Write};
use std::path::PathBuf;

/// Trims whitespace and surrounding quotes from a pasted path.
pub fn clean_path(raw: &str) -> String {
    raw.trim().trim_matches(|c| c == '"' || c == '\'').trim().to_string()
}

pub fn parse_existing_file(raw: &str) -> Result<PathBuf, InputError> {
    let cleaned = clean_path(raw);
    if cleaned.is_empty() {
        return Err(InputError::EmptyPath);
    }
    let path = PathBuf::from(cleaned);
    if !path.is_file() {
        return Err(InputError::FileNotFound(path));
    }
    Ok(path)
}

/// Empty input selects `default`.
pub fn parse_threshold(raw: &str, default: Threshold) -> Result<Threshold, InputError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Ok(default)
    } else {
        trimmed.parse()
    }
}

/// Menu choice `1`-`3`; empty input selects processing.
pub fn parse_mode(raw: &str) -> Result<Mode, InputError> {
    match raw.trim() {
        "" | "1" => Ok(Mode::Process),
        "2" => Ok(Mode::DownloadThenProcess),
        "3" => Ok(Mode::DownloadOnly),
        other => Err(InputError::InvalidOption(other.to_string())),
    }
}

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn read_line(&mut self) -> Result<String, AppError> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(AppError::InputClosed);
        }
        Ok(line)
    }

    /// Asks until `parse` accepts the answer.
    pub fn ask_with<T, E, F>(&mut self, prompt: &str, mut parse: F) -> Result<T, AppError>
    where
        E: Display,
        F: FnMut(&str) -> Result<T, E>,
    {
        loop {
            write!(self.output, "{}", prompt)?;
            self.output.flush()?;
            let line = self.read_line()?;
            match parse(&line) {
                Ok(value) => return Ok(value),
                Err(e) => writeln!(self.output, "{}\n", e)?,
            }
        }
    }

    pub fn select_mode(&mut self) -> Result<Mode, AppError> {
        writeln!(self.output, "Select an option:")?;
        for (i, mode) in Mode::ALL.iter().enumerate() {
            writeln!(self.output, "  {}. {}", i + 1, mode.label())?;
        }
        self.ask_with("Choice [1]: ", parse_mode)
    }

    pub fn ask_video(&mut self) -> Result<PathBuf, AppError> {
        self.ask_with("Path to video file: ", parse_existing_file)
    }

    /// Re-asks until the file decodes as an image.
    pub fn ask_reference(&mut self, reduction: u32) -> Result<(PathBuf, ReferenceImage), AppError> {
        self.ask_with("Path to reference image: ", |raw| {
            let path = parse_existing_file(raw)?;
            let image = ReferenceImage::load(&path, reduction)?;
            Ok::<_, InputError>((path, image))
        })
    }

    pub fn ask_threshold(&mut self, default: Threshold) -> Result<Threshold, AppError> {
        let prompt = format!("Match threshold 0.00 - 1.00 [{}]: ", default);
        self.ask_with(&prompt, |raw| parse_threshold(raw, default))
    }

    /// Re-asks until `fetch` succeeds with the entered text.
    pub fn ask_download<F>(&mut self, fetch: F) -> Result<PathBuf, AppError>
    where
        F: FnMut(&str) -> Result<PathBuf, DownloadError>,
    {
        self.ask_with("Video URL: ", fetch)
    }

    pub fn say(&mut self, message: &str) -> Result<(), AppError> {
        writeln!(self.output, "{}", message)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn output(p: Prompter<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8(p.into_output()).unwrap()
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path("  \"C:/videos/a b.mp4\"  \n"), "C:/videos/a b.mp4");
        assert_eq!(clean_path("'clip.mp4'"), "clip.mp4");
        assert_eq!(clean_path("   "), "");
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode("\n").unwrap(), Mode::Process);
        assert_eq!(parse_mode(" 2 ").unwrap(), Mode::DownloadThenProcess);
        assert_eq!(parse_mode("3").unwrap(), Mode::DownloadOnly);
        assert!(matches!(parse_mode("4"), Err(InputError::InvalidOption(_))));
    }

    #[test]
    fn test_parse_threshold() {
        let default = Threshold::default();
        assert_eq!(parse_threshold("  \n", default).unwrap(), default);
        assert_eq!(parse_threshold("0.75", default).unwrap().value(), 0.75);
        assert!(matches!(
            parse_threshold("1.5", default),
            Err(InputError::InvalidThreshold(_))
        ));
        assert!(parse_threshold("abc", default).is_err());
    }

    #[test]
    fn test_parse_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("clip.mp4");
        std::fs::write(&file, b"x").unwrap();

        let quoted = format!("\"{}\"\n", file.display());
        assert_eq!(parse_existing_file(&quoted).unwrap(), file);
        assert!(matches!(parse_existing_file(""), Err(InputError::EmptyPath)));
        assert!(matches!(
            parse_existing_file(&dir.path().join("nope.mp4").to_string_lossy()),
            Err(InputError::FileNotFound(_))
        ));
        assert!(matches!(
            parse_existing_file(&dir.path().to_string_lossy()),
            Err(InputError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_select_mode_reprompts() {
        let mut p = prompter("9\n2\n");
        assert_eq!(p.select_mode().unwrap(), Mode::DownloadThenProcess);

        let out = output(p);
        assert!(out.contains("1. Process"));
        assert!(out.contains("Option \"9\" was invalid"));
        assert_eq!(out.matches("Choice [1]: ").count(), 2);
    }

    #[test]
    fn test_ask_video_reprompts_until_found() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("clip.mp4");
        std::fs::write(&file, b"x").unwrap();

        let input = format!("\n{}\n  '{}'  \n", dir.path().join("x.mp4").display(), file.display());
        let mut p = prompter(&input);
        assert_eq!(p.ask_video().unwrap(), file);

        let out = output(p);
        assert!(out.contains("Path is empty"));
        assert!(out.contains("not found"));
    }

    #[test]
    fn test_ask_reference_rejects_non_image() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("ref.png");
        std::fs::write(&bogus, b"not an image").unwrap();
        let good = dir.path().join("good.png");
        image::RgbImage::from_fn(4, 4, |x, _| image::Rgb([(x * 60) as u8, 0, 0]))
            .save(&good)
            .unwrap();

        let input = format!("{}\n{}\n", bogus.display(), good.display());
        let mut p = prompter(&input);
        let (path, reference) = p.ask_reference(1).unwrap();
        assert_eq!(path, good);
        assert_eq!((reference.width, reference.height), (4, 4));
        assert!(output(p).contains("Failed to load reference image"));
    }

    #[test]
    fn test_ask_threshold_default_and_retry() {
        let mut p = prompter("\n");
        assert_eq!(p.ask_threshold(Threshold::default()).unwrap().value(), 0.6);

        let mut p = prompter("-1\n0.9\n");
        assert_eq!(p.ask_threshold(Threshold::default()).unwrap().value(), 0.9);
        assert!(output(p).contains("[0.60]"));
    }

    #[test]
    fn test_ask_download_retries() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("video.mp4");
        let mut attempts = 0;

        let mut p = prompter("nothing here\nhttps://example.com/video.mp4\n");
        let path = p
            .ask_download(|text| {
                attempts += 1;
                crate::core::download::extract_url(text).map(|_| target.clone())
            })
            .unwrap();

        assert_eq!(path, target);
        assert_eq!(attempts, 2);
        assert!(output(p).contains("No URL found"));
    }

    #[test]
    fn test_closed_input() {
        let mut p = prompter("");
        assert!(matches!(p.select_mode(), Err(AppError::InputClosed)));

        let mut p = prompter("bad\n");
        assert!(matches!(p.ask_video(), Err(AppError::InputClosed)));
    }
}
