pub mod calculator;
pub mod prompt;
pub mod session;

pub use calculator::{AppError, FrameTimeCalculator, Mode};
pub use prompt::Prompter;
pub use session::{run_session, SessionOutcome, SessionRequest};
