use super::*;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
  pub position: [f32; 2],
  pub extent: [f32; 2],
  pub min_depth: f32,
  pub max_depth: f32
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Scissor {
  pub position: [i32; 2],
  pub extent: [u32; 2]
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum IndexFormat {
  U16,
  U32
}

impl IndexFormat {
  pub fn size(&self) -> u32 {
    match self {
      IndexFormat::U16 => 2,
      IndexFormat::U32 => 4,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueType {
  Graphics,
  Compute,
  Copy
}

impl QueueType {
  pub const ALL: [QueueType; 3] = [QueueType::Graphics, QueueType::Compute, QueueType::Copy];

  pub fn index(&self) -> usize {
    match self {
      QueueType::Graphics => 0,
      QueueType::Compute => 1,
      QueueType::Copy => 2,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindPoint {
  Graphics,
  Compute
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferTextureCopyRegion {
  pub buffer_offset: u64,
  pub buffer_row_pitch: u64,
  pub texture_subresource: TextureSubresource,
  pub texture_offset: [u32; 2],
  pub texture_extent: [u32; 2],
}

impl BufferTextureCopyRegion {
  pub fn from_footprint(footprint: &CopyableFootprint, subresource: TextureSubresource) -> Self {
    Self {
      buffer_offset: footprint.offset,
      buffer_row_pitch: footprint.row_pitch,
      texture_subresource: subresource,
      texture_offset: [0, 0],
      texture_extent: [footprint.width, footprint.height],
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferCopyRegion {
  pub src_offset: u64,
  pub dst_offset: u64,
  pub size: u64
}

pub enum Barrier<'a, B: GPUBackend> {
  TextureBarrier {
    old_state: ResourceState,
    new_state: ResourceState,
    texture: &'a B::Texture,
  },
  BufferBarrier {
    old_state: ResourceState,
    new_state: ResourceState,
    buffer: &'a B::Buffer,
  }
}

pub trait CommandPool<B: GPUBackend> : Send {
  /// Frees the memory of every command list recorded from this pool. The lists must not be executing.
  unsafe fn reset(&mut self) -> Result<(), NativeError>;
}

/// Arguments of an indirect indexed draw, laid out the way the GPU consumes them.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrawIndexedIndirectArguments {
  pub index_count: u32,
  pub instance_count: u32,
  pub first_index: u32,
  pub vertex_offset: i32,
  pub first_instance: u32,
}

pub trait CommandSignature {
  fn stride(&self) -> u32;
}

pub trait CommandBuffer<B: GPUBackend> : Send {
  /// Reopens a closed list for recording with memory from `pool`.
  unsafe fn reset(&mut self, pool: &mut B::CommandPool) -> Result<(), NativeError>;
  unsafe fn close(&mut self) -> Result<(), NativeError>;

  unsafe fn barrier(&mut self, barriers: &[Barrier<B>]);

  unsafe fn copy_buffer(&mut self, src: &B::Buffer, dst: &B::Buffer, region: &BufferCopyRegion);
  unsafe fn copy_buffer_to_texture(&mut self, src: &B::Buffer, dst: &B::Texture, region: &BufferTextureCopyRegion);
  unsafe fn copy_texture_to_buffer(&mut self, src: &B::Texture, dst: &B::Buffer, region: &BufferTextureCopyRegion);
  unsafe fn resolve_texture(&mut self, src: &B::Texture, dst: &B::Texture, subresource: TextureSubresource);
  unsafe fn fill_buffer(&mut self, buffer: &B::Buffer, offset: u64, length: u64, value: u8);

  unsafe fn set_graphics_pipeline(&mut self, pipeline: &B::GraphicsPipeline);
  unsafe fn set_compute_pipeline(&mut self, pipeline: &B::ComputePipeline);
  unsafe fn set_render_targets(&mut self, render_targets: &[&B::Texture], depth_stencil: Option<&B::Texture>);
  unsafe fn clear_render_target(&mut self, render_target: &B::Texture, color: [f32; 4]);
  unsafe fn clear_depth_stencil(&mut self, depth_stencil: &B::Texture, depth: f32, stencil: u8);
  unsafe fn set_viewports(&mut self, viewports: &[ Viewport ]);
  unsafe fn set_scissors(&mut self, scissors: &[ Scissor ]);
  unsafe fn set_vertex_buffer(&mut self, slot: u32, vertex_buffer: &B::Buffer, offset: u64, stride: u32);
  unsafe fn set_index_buffer(&mut self, index_buffer: &B::Buffer, offset: u64, format: IndexFormat);

  unsafe fn bind_buffer(&mut self, bind_point: BindPoint, root_index: u32, kind: BindingKind, buffer: &B::Buffer, offset: u64);
  unsafe fn bind_texture(&mut self, bind_point: BindPoint, root_index: u32, kind: BindingKind, texture: &B::Texture);
  unsafe fn bind_sampler(&mut self, bind_point: BindPoint, root_index: u32, sampler: &B::Sampler);

  unsafe fn draw(&mut self, vertices: u32, instances: u32, first_vertex: u32, first_instance: u32);
  unsafe fn draw_indexed(&mut self, indices: u32, instances: u32, first_index: u32, vertex_offset: i32, first_instance: u32);
  unsafe fn draw_indexed_indirect(&mut self, signature: &B::CommandSignature, draw_buffer: &B::Buffer, draw_buffer_offset: u64, max_draw_count: u32);
  unsafe fn dispatch(&mut self, group_count_x: u32, group_count_y: u32, group_count_z: u32);
}
