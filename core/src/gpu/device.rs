use super::*;

pub trait Device<B: GPUBackend> {
  unsafe fn create_queue(&self, queue_type: QueueType) -> Result<B::Queue, NativeError>;
  unsafe fn create_command_pool(&self, queue_type: QueueType) -> Result<B::CommandPool, NativeError>;
  /// Creates a command list that is open for recording.
  unsafe fn create_command_buffer(&self, pool: &mut B::CommandPool, queue_type: QueueType, name: Option<&str>) -> Result<B::CommandBuffer, NativeError>;
  unsafe fn create_fence(&self, initial_value: u64) -> Result<B::Fence, NativeError>;
  unsafe fn create_buffer(&self, info: &BufferInfo, initial_state: ResourceState, name: Option<&str>) -> Result<B::Buffer, NativeError>;
  unsafe fn create_texture(&self, info: &TextureInfo, initial_state: ResourceState, name: Option<&str>) -> Result<B::Texture, NativeError>;
  unsafe fn create_sampler(&self, info: &SamplerInfo) -> Result<B::Sampler, NativeError>;
  unsafe fn create_shader(&self, shader_type: ShaderType, bytecode: &[u8], name: Option<&str>) -> Result<B::Shader, NativeError>;
  unsafe fn create_graphics_pipeline(&self, info: &GraphicsPipelineInfo<B>, name: Option<&str>) -> Result<B::GraphicsPipeline, NativeError>;
  unsafe fn create_compute_pipeline(&self, info: &ComputePipelineInfo<B>, name: Option<&str>) -> Result<B::ComputePipeline, NativeError>;
  unsafe fn create_command_signature(&self, stride: u32) -> Result<B::CommandSignature, NativeError>;

  /// Layout of the given subresources when copied into a linear buffer, plus the total buffer size required.
  fn copyable_footprints(&self, info: &TextureInfo, first_subresource: u32, subresource_count: u32) -> (Vec<CopyableFootprint>, u64);
}
