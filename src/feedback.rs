//! User feedback signals (success, error, selection) as an injected capability.
use log::debug;

/// Receives feedback signals from the stores and the front end.
pub trait Feedback: Send + Sync {
    fn success(&self);

    fn error(&self);

    fn selection(&self);
}

/// Ignores every signal.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFeedback;

impl Feedback for NoFeedback {
    fn success(&self) {}

    fn error(&self) {}

    fn selection(&self) {}
}

/// Writes every signal to the debug log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFeedback;

impl Feedback for LogFeedback {
    fn success(&self) {
        debug!("feedback: success");
    }

    fn error(&self) {
        debug!("feedback: error");
    }

    fn selection(&self) {
        debug!("feedback: selection");
    }
}
