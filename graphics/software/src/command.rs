use std::sync::Arc;

use kiln_core::gpu;
use smallvec::SmallVec;

use super::*;

pub struct SoftwareCommandPool {
    queue_type: gpu::QueueType,
    reset_count: u64,
}

impl SoftwareCommandPool {
    pub(crate) fn new(queue_type: gpu::QueueType) -> Self {
        Self {
            queue_type,
            reset_count: 0,
        }
    }

    pub fn queue_type(&self) -> gpu::QueueType {
        self.queue_type
    }

    pub fn reset_count(&self) -> u64 {
        self.reset_count
    }
}

impl gpu::CommandPool<SoftwareBackend> for SoftwareCommandPool {
    unsafe fn reset(&mut self) -> Result<(), gpu::NativeError> {
        self.reset_count += 1;
        Ok(())
    }
}

#[derive(Clone)]
pub(crate) enum TransitionTarget {
    Buffer(SoftwareBuffer),
    Texture(SoftwareTexture),
}

#[derive(Clone)]
pub(crate) struct Transition {
    pub(crate) target: TransitionTarget,
    pub(crate) old_state: gpu::ResourceState,
    pub(crate) new_state: gpu::ResourceState,
}

#[derive(Clone)]
pub(crate) enum BoundResource {
    Buffer(SoftwareBuffer),
    Texture(SoftwareTexture),
    Sampler,
}

pub(crate) enum Command {
    Barrier(SmallVec<[Transition; 4]>),
    CopyBuffer { src: SoftwareBuffer, dst: SoftwareBuffer, region: gpu::BufferCopyRegion },
    CopyBufferToTexture { src: SoftwareBuffer, dst: SoftwareTexture, region: gpu::BufferTextureCopyRegion },
    CopyTextureToBuffer { src: SoftwareTexture, dst: SoftwareBuffer, region: gpu::BufferTextureCopyRegion },
    Resolve { src: SoftwareTexture, dst: SoftwareTexture, subresource: gpu::TextureSubresource },
    FillBuffer { buffer: SoftwareBuffer, offset: u64, length: u64, value: u8 },
    SetGraphicsPipeline(SoftwareGraphicsPipeline),
    SetComputePipeline(SoftwareComputePipeline),
    SetRenderTargets { render_targets: SmallVec<[SoftwareTexture; 8]>, depth_stencil: Option<SoftwareTexture> },
    ClearRenderTarget { texture: SoftwareTexture, color: [f32; 4] },
    ClearDepthStencil { texture: SoftwareTexture, depth: f32, stencil: u8 },
    SetViewports(SmallVec<[gpu::Viewport; 4]>),
    SetScissors(SmallVec<[gpu::Scissor; 4]>),
    SetVertexBuffer { slot: u32, buffer: SoftwareBuffer, offset: u64, stride: u32 },
    SetIndexBuffer { buffer: SoftwareBuffer, offset: u64, format: gpu::IndexFormat },
    Bind { bind_point: gpu::BindPoint, root_index: u32, kind: Option<gpu::BindingKind>, resource: BoundResource },
    Draw { vertices: u32, instances: u32 },
    DrawIndexed { indices: u32, instances: u32, first_index: u32 },
    DrawIndexedIndirect { stride: u32, buffer: SoftwareBuffer, offset: u64, max_draw_count: u32 },
    Dispatch { x: u32, y: u32, z: u32 },
}

impl Command {
    fn allowed_on(&self, queue_type: gpu::QueueType) -> bool {
        match queue_type {
            gpu::QueueType::Graphics => true,
            gpu::QueueType::Compute => !matches!(self,
                Command::Resolve { .. }
                | Command::SetGraphicsPipeline(_)
                | Command::SetRenderTargets { .. }
                | Command::ClearRenderTarget { .. }
                | Command::ClearDepthStencil { .. }
                | Command::SetViewports(_)
                | Command::SetScissors(_)
                | Command::SetVertexBuffer { .. }
                | Command::SetIndexBuffer { .. }
                | Command::Draw { .. }
                | Command::DrawIndexed { .. }
                | Command::DrawIndexedIndirect { .. }
                | Command::Bind { bind_point: gpu::BindPoint::Graphics, .. }),
            gpu::QueueType::Copy => matches!(self,
                Command::Barrier(_)
                | Command::CopyBuffer { .. }
                | Command::CopyBufferToTexture { .. }
                | Command::CopyTextureToBuffer { .. }),
        }
    }
}

pub struct SoftwareCommandBuffer {
    queue_type: gpu::QueueType,
    commands: Vec<Command>,
    closed: bool,
    misuse: Option<String>,
    shared: Arc<DeviceShared>,
    name: Option<String>,
}

impl SoftwareCommandBuffer {
    pub(crate) fn new(shared: &Arc<DeviceShared>, queue_type: gpu::QueueType, name: Option<&str>) -> Self {
        Self {
            queue_type,
            commands: Vec::new(),
            closed: false,
            misuse: None,
            shared: shared.clone(),
            name: name.map(|n| n.to_string()),
        }
    }

    pub fn queue_type(&self) -> gpu::QueueType {
        self.queue_type
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    pub(crate) fn commands(&self) -> &[Command] {
        &self.commands
    }

    fn push(&mut self, command: Command) {
        if self.closed {
            log::error!("Recording into closed command list {:?}", self.name);
            self.misuse.get_or_insert_with(|| "recorded into a closed command list".to_string());
            return;
        }
        if !command.allowed_on(self.queue_type) {
            log::error!("Command is not supported on a {:?} command list {:?}", self.queue_type, self.name);
            self.misuse.get_or_insert_with(|| format!("command not supported on a {:?} list", self.queue_type));
            return;
        }
        self.commands.push(command);
    }
}

impl gpu::CommandBuffer<SoftwareBackend> for SoftwareCommandBuffer {
    unsafe fn reset(&mut self, pool: &mut SoftwareCommandPool) -> Result<(), gpu::NativeError> {
        if !self.closed {
            return Err(gpu::NativeError::new("ID3D12GraphicsCommandList::Reset", "command list was not closed"));
        }
        if pool.queue_type() != self.queue_type {
            return Err(gpu::NativeError::new("ID3D12GraphicsCommandList::Reset", "allocator type does not match the list type"));
        }
        if self.shared.take_reset_failure() {
            return Err(gpu::NativeError::new("ID3D12GraphicsCommandList::Reset", "E_OUTOFMEMORY"));
        }
        self.commands.clear();
        self.misuse = None;
        self.closed = false;
        Ok(())
    }

    unsafe fn close(&mut self) -> Result<(), gpu::NativeError> {
        if self.closed {
            return Err(gpu::NativeError::new("ID3D12GraphicsCommandList::Close", "command list is already closed"));
        }
        self.closed = true;
        if let Some(misuse) = self.misuse.take() {
            return Err(gpu::NativeError::new("ID3D12GraphicsCommandList::Close", misuse));
        }
        Ok(())
    }

    unsafe fn barrier(&mut self, barriers: &[gpu::Barrier<SoftwareBackend>]) {
        let mut transitions = SmallVec::<[Transition; 4]>::new();
        for barrier in barriers {
            let (target, old_state, new_state) = match barrier {
                gpu::Barrier::BufferBarrier { old_state, new_state, buffer } => (TransitionTarget::Buffer((*buffer).clone()), *old_state, *new_state),
                gpu::Barrier::TextureBarrier { old_state, new_state, texture } => (TransitionTarget::Texture((*texture).clone()), *old_state, *new_state),
            };
            if self.queue_type == gpu::QueueType::Compute && !(old_state.is_compute_compatible() && new_state.is_compute_compatible()) {
                log::error!("Transition from {:?} to {:?} is not allowed on a compute command list", old_state, new_state);
                self.misuse.get_or_insert_with(|| "graphics state transition on a compute list".to_string());
                continue;
            }
            transitions.push(Transition { target, old_state, new_state });
        }
        if !transitions.is_empty() {
            self.push(Command::Barrier(transitions));
        }
    }

    unsafe fn copy_buffer(&mut self, src: &SoftwareBuffer, dst: &SoftwareBuffer, region: &gpu::BufferCopyRegion) {
        self.push(Command::CopyBuffer { src: src.clone(), dst: dst.clone(), region: *region });
    }

    unsafe fn copy_buffer_to_texture(&mut self, src: &SoftwareBuffer, dst: &SoftwareTexture, region: &gpu::BufferTextureCopyRegion) {
        self.push(Command::CopyBufferToTexture { src: src.clone(), dst: dst.clone(), region: *region });
    }

    unsafe fn copy_texture_to_buffer(&mut self, src: &SoftwareTexture, dst: &SoftwareBuffer, region: &gpu::BufferTextureCopyRegion) {
        self.push(Command::CopyTextureToBuffer { src: src.clone(), dst: dst.clone(), region: *region });
    }

    unsafe fn resolve_texture(&mut self, src: &SoftwareTexture, dst: &SoftwareTexture, subresource: gpu::TextureSubresource) {
        self.push(Command::Resolve { src: src.clone(), dst: dst.clone(), subresource });
    }

    unsafe fn fill_buffer(&mut self, buffer: &SoftwareBuffer, offset: u64, length: u64, value: u8) {
        self.push(Command::FillBuffer { buffer: buffer.clone(), offset, length, value });
    }

    unsafe fn set_graphics_pipeline(&mut self, pipeline: &SoftwareGraphicsPipeline) {
        self.push(Command::SetGraphicsPipeline(pipeline.clone()));
    }

    unsafe fn set_compute_pipeline(&mut self, pipeline: &SoftwareComputePipeline) {
        self.push(Command::SetComputePipeline(pipeline.clone()));
    }

    unsafe fn set_render_targets(&mut self, render_targets: &[&SoftwareTexture], depth_stencil: Option<&SoftwareTexture>) {
        self.push(Command::SetRenderTargets {
            render_targets: render_targets.iter().map(|rt| (*rt).clone()).collect(),
            depth_stencil: depth_stencil.cloned(),
        });
    }

    unsafe fn clear_render_target(&mut self, render_target: &SoftwareTexture, color: [f32; 4]) {
        self.push(Command::ClearRenderTarget { texture: render_target.clone(), color });
    }

    unsafe fn clear_depth_stencil(&mut self, depth_stencil: &SoftwareTexture, depth: f32, stencil: u8) {
        self.push(Command::ClearDepthStencil { texture: depth_stencil.clone(), depth, stencil });
    }

    unsafe fn set_viewports(&mut self, viewports: &[gpu::Viewport]) {
        self.push(Command::SetViewports(viewports.iter().copied().collect()));
    }

    unsafe fn set_scissors(&mut self, scissors: &[gpu::Scissor]) {
        self.push(Command::SetScissors(scissors.iter().copied().collect()));
    }

    unsafe fn set_vertex_buffer(&mut self, slot: u32, vertex_buffer: &SoftwareBuffer, offset: u64, stride: u32) {
        self.push(Command::SetVertexBuffer { slot, buffer: vertex_buffer.clone(), offset, stride });
    }

    unsafe fn set_index_buffer(&mut self, index_buffer: &SoftwareBuffer, offset: u64, format: gpu::IndexFormat) {
        self.push(Command::SetIndexBuffer { buffer: index_buffer.clone(), offset, format });
    }

    unsafe fn bind_buffer(&mut self, bind_point: gpu::BindPoint, root_index: u32, kind: gpu::BindingKind, buffer: &SoftwareBuffer, _offset: u64) {
        self.push(Command::Bind { bind_point, root_index, kind: Some(kind), resource: BoundResource::Buffer(buffer.clone()) });
    }

    unsafe fn bind_texture(&mut self, bind_point: gpu::BindPoint, root_index: u32, kind: gpu::BindingKind, texture: &SoftwareTexture) {
        self.push(Command::Bind { bind_point, root_index, kind: Some(kind), resource: BoundResource::Texture(texture.clone()) });
    }

    unsafe fn bind_sampler(&mut self, bind_point: gpu::BindPoint, root_index: u32, _sampler: &SoftwareSampler) {
        self.push(Command::Bind { bind_point, root_index, kind: None, resource: BoundResource::Sampler });
    }

    unsafe fn draw(&mut self, vertices: u32, instances: u32, _first_vertex: u32, _first_instance: u32) {
        self.push(Command::Draw { vertices, instances });
    }

    unsafe fn draw_indexed(&mut self, indices: u32, instances: u32, first_index: u32, _vertex_offset: i32, _first_instance: u32) {
        self.push(Command::DrawIndexed { indices, instances, first_index });
    }

    unsafe fn draw_indexed_indirect(&mut self, signature: &SoftwareCommandSignature, draw_buffer: &SoftwareBuffer, draw_buffer_offset: u64, max_draw_count: u32) {
        self.push(Command::DrawIndexedIndirect { stride: signature.stride, buffer: draw_buffer.clone(), offset: draw_buffer_offset, max_draw_count });
    }

    unsafe fn dispatch(&mut self, group_count_x: u32, group_count_y: u32, group_count_z: u32) {
        self.push(Command::Dispatch { x: group_count_x, y: group_count_y, z: group_count_z });
    }
}
