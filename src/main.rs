use clap::{Parser, Subcommand, ValueEnum};
use frame_time::api::{run_session, AppError, FrameTimeCalculator, Mode, Prompter, SessionOutcome, SessionRequest};
use frame_time::core::matcher::Threshold;
use frame_time::core::runs::{EndConvention, SnapshotPolicy};
use frame_time::core::ScanConfig;
use log::error;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "frame-time", version, about = "Finds where a reference image appears in a video")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// JSON scan configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for snapshots and downloads
    #[arg(long, global = true, default_value = ".")]
    output_dir: PathBuf,

    /// Print the report as JSON
    #[arg(long, global = true)]
    json: bool,

    #[arg(short, long, global = true)]
    verbose: bool,

    /// Skip writing snapshot images
    #[arg(long, global = true)]
    no_export: bool,

    #[arg(long, global = true, value_enum)]
    end_convention: Option<EndConventionArg>,

    #[arg(long, global = true, value_enum)]
    snapshots: Option<SnapshotArg>,

    /// Frames scored in parallel per batch
    #[arg(long, global = true)]
    batch_size: Option<usize>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scan a local video
    Process {
        #[arg(long)]
        video: Option<PathBuf>,
        #[arg(long)]
        reference: Option<PathBuf>,
        #[arg(long)]
        threshold: Option<Threshold>,
    },
    /// Download a video, then scan it
    DownloadProcess {
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        reference: Option<PathBuf>,
        #[arg(long)]
        threshold: Option<Threshold>,
    },
    /// Download a video only
    Download {
        #[arg(long)]
        url: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EndConventionArg {
    FirstNonMatching,
    LastMatching,
}

impl From<EndConventionArg> for EndConvention {
    fn from(arg: EndConventionArg) -> Self {
        match arg {
            EndConventionArg::FirstNonMatching => EndConvention::FirstNonMatching,
            EndConventionArg::LastMatching => EndConvention::LastMatching,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SnapshotArg {
    None,
    Start,
    StartAndEnd,
}

impl From<SnapshotArg> for SnapshotPolicy {
    fn from(arg: SnapshotArg) -> Self {
        match arg {
            SnapshotArg::None => SnapshotPolicy::None,
            SnapshotArg::Start => SnapshotPolicy::Start,
            SnapshotArg::StartAndEnd => SnapshotPolicy::StartAndEnd,
        }
    }
}

impl Cli {
    fn scan_config(&self) -> Result<ScanConfig, AppError> {
        let mut config = match &self.config {
            Some(path) => ScanConfig::from_json_file(path)?,
            None => ScanConfig::default(),
        };
        if let Some(convention) = self.end_convention {
            config.end_convention = convention.into();
        }
        if let Some(policy) = self.snapshots {
            config.snapshot_policy = policy.into();
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size.max(1);
        }
        Ok(config)
    }

    fn request(&self) -> SessionRequest {
        match &self.command {
            None => SessionRequest {
                ask_threshold: true,
                ..Default::default()
            },
            Some(Command::Process {
                video,
                reference,
                threshold,
            }) => SessionRequest {
                mode: Some(Mode::Process),
                video: video.clone(),
                reference: reference.clone(),
                threshold: *threshold,
                ..Default::default()
            },
            Some(Command::DownloadProcess {
                url,
                reference,
                threshold,
            }) => SessionRequest {
                mode: Some(Mode::DownloadThenProcess),
                url: url.clone(),
                reference: reference.clone(),
                threshold: *threshold,
                ..Default::default()
            },
            Some(Command::Download { url }) => SessionRequest {
                mode: Some(Mode::DownloadOnly),
                url: url.clone(),
                ..Default::default()
            },
        }
    }
}

fn run(cli: &Cli) -> Result<(), AppError> {
    let mut calculator = FrameTimeCalculator::create(cli.scan_config()?, &cli.output_dir);
    if cli.no_export {
        calculator = calculator.without_export();
    }

    let stdin = io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), io::stdout());

    match run_session(&mut calculator, cli.request(), &mut prompter)? {
        SessionOutcome::Scanned(report) => {
            if cli.json {
                let json = serde_json::to_string_pretty(&report)
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
                println!("{}", json);
            } else {
                print!("{}", report.render_text());
            }
        }
        SessionOutcome::Downloaded(path) => println!("Downloaded to {}", path.display()),
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    frame_time::init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ {}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
