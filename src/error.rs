use thiserror::Error;

use crate::identity::ProjectContext;

#[derive(Debug, Error)]
pub enum DashboardError {
    /// Warnings and errors have no place on the dashboard.
    #[error("unsupported event: {kind} ({message})")]
    UnsupportedEvent { kind: &'static str, message: String },

    #[error("{event} references {context:?}, which was never started")]
    MissingContext {
        event: &'static str,
        context: ProjectContext,
    },

    #[error("the logger has already been initialized")]
    AlreadyInitialized,

    #[error("Couldn't write to the terminal.\n{0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Couldn't read the recording.\n{0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed event on line {line}.\n{source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },
}
