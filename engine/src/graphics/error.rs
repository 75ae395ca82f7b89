use kiln_core::gpu::NativeError;
use thiserror::Error;

use super::HandleKind;

#[derive(Debug, Error)]
pub enum DeviceError {
    /// A fence reported the removal sentinel. There is no way back from this.
    #[error("the GPU device was removed")]
    DeviceLost,
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),
    #[error(transparent)]
    Native(#[from] NativeError),
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum HandleError {
    #[error("expected a {expected:?} handle but got a {found:?} handle")]
    KindMismatch { expected: HandleKind, found: HandleKind },
    #[error("the {0:?} handle was already destroyed")]
    Destroyed(HandleKind),
}
