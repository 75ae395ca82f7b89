use super::*;

// WANT https://github.com/rust-lang/rust/issues/44265
pub trait GPUBackend: 'static + Sized {
  type Device: Device<Self> + Send + Sync;
  type Queue: Queue<Self> + Send + Sync;
  type CommandPool: CommandPool<Self>;
  type CommandBuffer: CommandBuffer<Self>;
  type Fence: Fence + Send + Sync;
  type Buffer: Buffer + Send + Sync;
  type Texture: Texture + Send + Sync;
  type Sampler: Send + Sync;
  type Shader: Send + Sync;
  type GraphicsPipeline: Send + Sync;
  type ComputePipeline: Send + Sync;
  type CommandSignature: CommandSignature + Send + Sync;

  fn name() -> &'static str;
}
