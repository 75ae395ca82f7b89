use thiserror::Error;

/// A native API call failed. The backend cannot recover from this on its own.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{call} failed: {reason}")]
pub struct NativeError {
  pub call: &'static str,
  pub reason: String
}

impl NativeError {
  pub fn new(call: &'static str, reason: impl Into<String>) -> Self {
    Self {
      call,
      reason: reason.into()
    }
  }
}
