use thiserror::Error;

/// Faults raised by an environment implementation. They are never handled by
/// the training code; they abort the run.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("environment fault: {0}")]
    Fault(String),
    #[error("action has {got} dims, environment expects {expected}")]
    ActionDim { expected: usize, got: usize },
}

#[derive(Debug, Error)]
pub enum TrainError {
    /// A log-probability or importance ratio went non-finite during the
    /// policy update. Training cannot continue from this state.
    #[error("non-finite {quantity} at batch index {index}: {value}")]
    NumericValidity {
        quantity: &'static str,
        index: usize,
        value: f32,
    },
    #[error(transparent)]
    Env(#[from] EnvError),
    #[error("tensor data conversion failed: {0}")]
    TensorData(String),
    #[error("shape mismatch: {0}")]
    Shape(String),
    #[error("failed to persist policy parameters: {0}")]
    Persist(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TrainError {
    pub fn is_numeric_failure(&self) -> bool {
        matches!(self, TrainError::NumericValidity { .. })
    }
}

pub type TrainResult<T> = Result<T, TrainError>;
