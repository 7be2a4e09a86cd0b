use thiserror::Error;

#[derive(Error, Debug)]
pub enum DealSignalError {
    /// The request had the wrong shape or out-of-range values. The only
    /// error a sourcing run surfaces to its caller.
    #[error("Validation error: {0}")]
    Validation(String),
}

impl DealSignalError {
    pub fn validation(message: impl Into<String>) -> Self {
        DealSignalError::Validation(message.into())
    }
}
