//! 一次运行：解析模式 → 收集输入（命令行优先，缺失或无效时提示）→ 下载/扫描

use super::calculator::{AppError, FrameTimeCalculator, Mode};
use super::prompt::{parse_existing_file, Prompter};
use crate::core::matcher::{ReferenceImage, Threshold};
use crate::core::report::ScanReport;
use log::warn;
use std::io::{BufRead, Write};
use std::path::PathBuf;

/// Values supplied up front. Anything missing is asked for.
#[derive(Debug, Clone, Default)]
pub struct SessionRequest {
    pub mode: Option<Mode>,
    pub video: Option<PathBuf>,
    pub reference: Option<PathBuf>,
    pub url: Option<String>,
    pub threshold: Option<Threshold>,
    /// Ask for the threshold instead of falling back to the configured one.
    pub ask_threshold: bool,
}

#[derive(Debug)]
pub enum SessionOutcome {
    Scanned(ScanReport),
    Downloaded(PathBuf),
}

pub fn run_session<R: BufRead, W: Write>(
    calculator: &mut FrameTimeCalculator,
    request: SessionRequest,
    prompter: &mut Prompter<R, W>,
) -> Result<SessionOutcome, AppError> {
    let mode = match request.mode {
        Some(mode) => mode,
        None => prompter.select_mode()?,
    };

    let downloaded = match mode {
        Mode::Process => None,
        Mode::DownloadThenProcess | Mode::DownloadOnly => {
            Some(resolve_download(calculator, request.url.as_deref(), prompter)?)
        }
    };

    let video = match (mode, downloaded) {
        (Mode::DownloadOnly, Some(path)) => return Ok(SessionOutcome::Downloaded(path)),
        (_, Some(path)) => path,
        (_, None) => resolve_video(request.video, prompter)?,
    };

    let reference = resolve_reference(calculator, request.reference, prompter)?;

    let threshold = match request.threshold {
        Some(threshold) => threshold,
        None if request.ask_threshold => prompter.ask_threshold(calculator.config().threshold)?,
        None => calculator.config().threshold,
    };
    calculator.set_threshold(threshold);

    let report = calculator.process(&video, &reference)?;
    Ok(SessionOutcome::Scanned(report))
}

fn resolve_download<R: BufRead, W: Write>(
    calculator: &FrameTimeCalculator,
    url: Option<&str>,
    prompter: &mut Prompter<R, W>,
) -> Result<PathBuf, AppError> {
    if let Some(url) = url {
        match calculator.download(url) {
            Ok(path) => return Ok(path),
            Err(e) => {
                warn!("⚠️ Download failed: {}", e);
                prompter.say(&format!("{}\n", e))?;
            }
        }
    }
    prompter.ask_download(|text| calculator.download(text))
}

fn resolve_video<R: BufRead, W: Write>(
    given: Option<PathBuf>,
    prompter: &mut Prompter<R, W>,
) -> Result<PathBuf, AppError> {
    if let Some(path) = given {
        match parse_existing_file(&path.to_string_lossy()) {
            Ok(path) => return Ok(path),
            Err(e) => prompter.say(&format!("{}\n", e))?,
        }
    }
    prompter.ask_video()
}

fn resolve_reference<R: BufRead, W: Write>(
    calculator: &FrameTimeCalculator,
    given: Option<PathBuf>,
    prompter: &mut Prompter<R, W>,
) -> Result<ReferenceImage, AppError> {
    if let Some(path) = given {
        match calculator.load_reference(&path) {
            Ok(reference) => return Ok(reference),
            Err(e) => prompter.say(&format!("{}\n", e))?,
        }
    }
    let reduction = calculator.config().reference_reduction;
    let (_, reference) = prompter.ask_reference(reduction)?;
    Ok(reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ScanConfig;
    use std::io::Cursor;

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_download_only_without_url_input_closes() {
        let dir = tempfile::tempdir().unwrap();
        let mut calculator = FrameTimeCalculator::create(ScanConfig::default(), dir.path());
        let request = SessionRequest {
            mode: Some(Mode::DownloadOnly),
            ..Default::default()
        };

        let mut p = prompter("no link\n");
        let result = run_session(&mut calculator, request, &mut p);
        assert!(matches!(result, Err(AppError::InputClosed)));
        let out = String::from_utf8(p.into_output()).unwrap();
        assert!(out.contains("No URL found"));
    }

    #[test]
    fn test_invalid_given_video_reprompts() {
        let dir = tempfile::tempdir().unwrap();
        let mut calculator = FrameTimeCalculator::create(ScanConfig::default(), dir.path());
        let request = SessionRequest {
            mode: Some(Mode::Process),
            video: Some(dir.path().join("missing.mp4")),
            ..Default::default()
        };

        let mut p = prompter("");
        let result = run_session(&mut calculator, request, &mut p);
        assert!(matches!(result, Err(AppError::InputClosed)));
        let out = String::from_utf8(p.into_output()).unwrap();
        assert!(out.contains("not found"));
        assert!(out.contains("Path to video file: "));
    }

    #[test]
    fn test_menu_selection_drives_mode() {
        let dir = tempfile::tempdir().unwrap();
        let mut calculator = FrameTimeCalculator::create(ScanConfig::default(), dir.path());

        let mut p = prompter("1\n");
        let result = run_session(&mut calculator, SessionRequest::default(), &mut p);
        assert!(matches!(result, Err(AppError::InputClosed)));
        let out = String::from_utf8(p.into_output()).unwrap();
        assert!(out.contains("Select an option:"));
        assert!(out.contains("Path to video file: "));
    }
}
