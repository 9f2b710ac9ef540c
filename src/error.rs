use thiserror::Error;

/// Failures raised by the simulation core.
///
/// `InvalidArgument` and `InvalidRunMode` abort a run before any step is
/// committed. `MissingNode` and `MissingEdge` are recoverable: the stepping
/// loop logs them and skips the offending pair.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid run mode '{0}'")]
    InvalidRunMode(String),

    #[error("county '{0}' does not exist in the network")]
    MissingNode(String),

    #[error("no edge between '{from}' and '{to}'")]
    MissingEdge { from: String, to: String },

    #[error("result column has {found} values, expected {expected}")]
    TableShape { expected: usize, found: usize },

    #[error("state io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("result export error: {0}")]
    Export(#[from] csv::Error),
}

impl SimulationError {
    /// Whether the stepping loop may log and continue past this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SimulationError::MissingNode(_) | SimulationError::MissingEdge { .. }
        )
    }
}

pub type SimResult<T> = Result<T, SimulationError>;
