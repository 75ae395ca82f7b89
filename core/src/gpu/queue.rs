use super::*;

pub trait Queue<B: GPUBackend> {
  unsafe fn execute(&self, command_buffers: &[&B::CommandBuffer]) -> Result<(), NativeError>;
  unsafe fn signal(&self, fence: &B::Fence, value: u64) -> Result<(), NativeError>;
}
