use std::sync::Arc;

use kiln_core::gpu::{
    BindPoint,
    CommandBuffer as _,
    GPUBackend,
    IndexFormat,
    QueueType,
    ResourceState,
    SampleCount,
    Scissor,
    Viewport,
};
use smallvec::SmallVec;

use super::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadOp<T> {
    Load,
    Clear(T),
}

pub struct ColorAttachment<'a, B: GPUBackend> {
    pub texture: &'a Handle<Texture<B>>,
    /// Single sampled texture the multisampled attachment is resolved into after the pass.
    pub resolve_target: Option<&'a Handle<Texture<B>>>,
    pub load_op: LoadOp<[f32; 4]>,
}

pub struct DepthAttachment<'a, B: GPUBackend> {
    pub texture: &'a Handle<Texture<B>>,
    pub load_op: LoadOp<f32>,
}

pub struct GraphicsEncoderDesc<'a, B: GPUBackend> {
    pub color_attachments: &'a [ColorAttachment<'a, B>],
    pub depth_attachment: Option<DepthAttachment<'a, B>>,
}

struct Attachment<B: GPUBackend> {
    texture: Arc<Texture<B>>,
    resolve_target: Option<Arc<Texture<B>>>,
    clear: Option<[f32; 4]>,
}

struct DepthTarget<B: GPUBackend> {
    texture: Arc<Texture<B>>,
    clear: Option<f32>,
}

struct VertexBuffer<B: GPUBackend> {
    buffer: Arc<Buffer<B>>,
    offset: u64,
    stride: u32,
}

impl<B: GPUBackend> Clone for VertexBuffer<B> {
    fn clone(&self) -> Self {
        Self { buffer: self.buffer.clone(), offset: self.offset, stride: self.stride }
    }
}

struct IndexBuffer<B: GPUBackend> {
    buffer: Arc<Buffer<B>>,
    offset: u64,
    format: IndexFormat,
}

impl<B: GPUBackend> Clone for IndexBuffer<B> {
    fn clone(&self) -> Self {
        Self { buffer: self.buffer.clone(), offset: self.offset, format: self.format }
    }
}

enum DrawCall<B: GPUBackend> {
    Draw { vertices: u32, instances: u32, first_vertex: u32, first_instance: u32 },
    Indexed { indices: u32, instances: u32, first_index: u32, vertex_offset: i32, first_instance: u32 },
    IndexedIndirect { buffer: Arc<Buffer<B>>, offset: u64, draw_count: u32, stride: u32 },
}

enum GraphicsOp<B: GPUBackend> {
    BindPipeline(Arc<GraphicsPipeline<B>>),
    BindResources(Arc<ResourceBindings<B>>),
    SetConstantValues(Vec<u8>),
    BindVertexBuffers { first_slot: u32, buffers: SmallVec<[VertexBuffer<B>; 4]> },
    BindIndexBuffer(IndexBuffer<B>),
    SetViewport(Viewport),
    SetScissor(Scissor),
    Draw(DrawCall<B>),
}

struct ReplayState<B: GPUBackend> {
    pipeline: Option<Arc<GraphicsPipeline<B>>>,
    bindings: Option<Arc<ResourceBindings<B>>>,
    constants: Option<Constants<B>>,
    vertex_buffers: SmallVec<[Option<VertexBuffer<B>>; 4]>,
    index_buffer: Option<IndexBuffer<B>>,
    viewport: Option<Viewport>,
    scissor: Option<Scissor>,
}

/// Records a render pass. Nothing touches a command list until [`GraphicsEncoder::submit`].
pub struct GraphicsEncoder<B: GPUBackend> {
    device: Arc<Device<B>>,
    attachments: SmallVec<[Attachment<B>; 8]>,
    depth: Option<DepthTarget<B>>,
    ops: Vec<GraphicsOp<B>>,
}

fn attachment_texture<B: GPUBackend>(handle: &Handle<Texture<B>>) -> Result<Arc<Texture<B>>, DeviceError> {
    handle.resource().cloned().map_err(|e| {
        log::error!("Graphics encoder attachment: {}", e);
        DeviceError::InvalidDescriptor(e.to_string())
    })
}

impl<B: GPUBackend> GraphicsEncoder<B> {
    pub(in super::super) fn new(device: &Arc<Device<B>>, desc: &GraphicsEncoderDesc<B>) -> Result<Self, DeviceError> {
        let mut attachments = SmallVec::<[Attachment<B>; 8]>::new();
        for attachment in desc.color_attachments {
            let texture = attachment_texture(attachment.texture)?;
            if texture.info().format.is_depth() {
                log::error!("Texture {:?} has a depth format and can not be used as a color attachment", texture.name());
                return Err(DeviceError::InvalidDescriptor(format!("color attachment {:?} has a depth format", texture.name())));
            }
            let resolve_target = match attachment.resolve_target {
                Some(handle) => {
                    let target = attachment_texture(handle)?;
                    if texture.info().samples == SampleCount::Samples1 || target.info().samples != SampleCount::Samples1 {
                        log::error!("Resolving {:?} into {:?} needs a multisampled attachment and a single sampled target", texture.name(), target.name());
                        return Err(DeviceError::InvalidDescriptor(format!("invalid resolve target {:?}", target.name())));
                    }
                    Some(target)
                }
                None => None,
            };
            attachments.push(Attachment {
                texture,
                resolve_target,
                clear: match attachment.load_op {
                    LoadOp::Clear(color) => Some(color),
                    LoadOp::Load => None,
                },
            });
        }

        let depth = match &desc.depth_attachment {
            Some(attachment) => {
                let texture = attachment_texture(attachment.texture)?;
                if !texture.info().format.is_depth() {
                    log::error!("Texture {:?} has no depth format and can not be used as a depth attachment", texture.name());
                    return Err(DeviceError::InvalidDescriptor(format!("depth attachment {:?} has no depth format", texture.name())));
                }
                Some(DepthTarget {
                    texture,
                    clear: match attachment.load_op {
                        LoadOp::Clear(depth) => Some(depth),
                        LoadOp::Load => None,
                    },
                })
            }
            None => None,
        };

        Ok(Self {
            device: device.clone(),
            attachments,
            depth,
            ops: Vec::new(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn bind_pipeline(&mut self, pipeline: &Handle<GraphicsPipeline<B>>) {
        if let Some(pipeline) = live(pipeline, "bind_pipeline") {
            self.ops.push(GraphicsOp::BindPipeline(pipeline));
        }
    }

    pub fn bind_resources(&mut self, bindings: &Handle<ResourceBindings<B>>) {
        if let Some(bindings) = live(bindings, "bind_resources") {
            self.ops.push(GraphicsOp::BindResources(bindings));
        }
    }

    /// Bound at `BindingSlot::ConstantValues` for the following draws.
    pub fn set_constant_values(&mut self, data: &[u8]) {
        self.ops.push(GraphicsOp::SetConstantValues(data.to_vec()));
    }

    /// Binds `(buffer, offset, stride)` triples to consecutive slots.
    pub fn bind_vertex_buffers(&mut self, first_slot: u32, buffers: &[(&Handle<Buffer<B>>, u64, u32)]) {
        let mut bound = SmallVec::<[VertexBuffer<B>; 4]>::new();
        for (buffer, offset, stride) in buffers {
            let Some(buffer) = live(*buffer, "bind_vertex_buffers") else {
                return;
            };
            bound.push(VertexBuffer { buffer, offset: *offset, stride: *stride });
        }
        self.ops.push(GraphicsOp::BindVertexBuffers { first_slot, buffers: bound });
    }

    pub fn bind_index_buffer(&mut self, buffer: &Handle<Buffer<B>>, offset: u64, format: IndexFormat) {
        if let Some(buffer) = live(buffer, "bind_index_buffer") {
            self.ops.push(GraphicsOp::BindIndexBuffer(IndexBuffer { buffer, offset, format }));
        }
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.ops.push(GraphicsOp::SetViewport(viewport));
    }

    pub fn set_scissor(&mut self, scissor: Scissor) {
        self.ops.push(GraphicsOp::SetScissor(scissor));
    }

    pub fn draw(&mut self, vertices: u32, instances: u32, first_vertex: u32, first_instance: u32) {
        self.ops.push(GraphicsOp::Draw(DrawCall::Draw { vertices, instances, first_vertex, first_instance }));
    }

    pub fn draw_indexed(&mut self, indices: u32, instances: u32, first_index: u32, vertex_offset: i32, first_instance: u32) {
        self.ops.push(GraphicsOp::Draw(DrawCall::Indexed { indices, instances, first_index, vertex_offset, first_instance }));
    }

    /// `buffer` holds `draw_count` `DrawIndexedIndirectArguments` that are `stride` bytes apart.
    pub fn draw_indexed_indirect(&mut self, buffer: &Handle<Buffer<B>>, offset: u64, draw_count: u32, stride: u32) {
        if let Some(buffer) = live(buffer, "draw_indexed_indirect") {
            self.ops.push(GraphicsOp::Draw(DrawCall::IndexedIndirect { buffer, offset, draw_count, stride }));
        }
    }

    /// Replays the recorded operations on the graphics queue, then resolves multisampled attachments.
    /// Returns false without touching the queue if nothing was recorded.
    pub fn submit(self) -> Result<bool, DeviceError> {
        if self.ops.is_empty() {
            return Ok(false);
        }
        let GraphicsEncoder { device, attachments, depth, ops } = self;
        let submit_each_draw = device.settings().submit_each_draw;
        let mut slot = ListSlot::new(&device, QueueType::Graphics, "graphics encoder submission");
        let mut submitted = false;

        // Draws are only valid once the attachments are transitioned, so the whole pass is dropped.
        let Some(list) = slot.get()? else {
            return Ok(false);
        };
        begin_pass(list, &attachments, depth.as_ref());

        let mut state = ReplayState::<B> {
            pipeline: None,
            bindings: None,
            constants: None,
            vertex_buffers: SmallVec::new(),
            index_buffer: None,
            viewport: None,
            scissor: None,
        };
        for op in ops {
            match op {
                GraphicsOp::BindPipeline(pipeline) => state.pipeline = Some(pipeline),
                GraphicsOp::BindResources(bindings) => state.bindings = Some(bindings),
                GraphicsOp::SetConstantValues(data) => state.constants = Some(Constants::Pending(data)),
                GraphicsOp::BindVertexBuffers { first_slot, buffers } => {
                    for (i, buffer) in buffers.into_iter().enumerate() {
                        let index = first_slot as usize + i;
                        if state.vertex_buffers.len() <= index {
                            state.vertex_buffers.resize(index + 1, None);
                        }
                        state.vertex_buffers[index] = Some(buffer);
                    }
                }
                GraphicsOp::BindIndexBuffer(index_buffer) => state.index_buffer = Some(index_buffer),
                GraphicsOp::SetViewport(viewport) => state.viewport = Some(viewport),
                GraphicsOp::SetScissor(scissor) => state.scissor = Some(scissor),
                GraphicsOp::Draw(call) => {
                    let Some(list) = slot.get()? else {
                        continue;
                    };
                    let recorded = record_draw(&device, list, &mut state, &attachments, depth.as_ref(), &call)?;
                    if recorded && submit_each_draw {
                        submitted |= slot.submit()?;
                    }
                }
            }
        }
        submitted |= slot.submit()?;

        if attachments.iter().any(|attachment| attachment.resolve_target.is_some()) {
            if let Some(list) = slot.get()? {
                for attachment in &attachments {
                    if let Some(target) = &attachment.resolve_target {
                        target.resolve(list, &attachment.texture);
                    }
                }
            }
            submitted |= slot.submit()?;
        }
        Ok(submitted)
    }
}

fn begin_pass<B: GPUBackend>(list: &mut CommandListGuard<B>, attachments: &[Attachment<B>], depth: Option<&DepthTarget<B>>) {
    for attachment in attachments {
        attachment.texture.request_state(list, ResourceState::RENDER_TARGET);
        if let Some(color) = attachment.clear {
            unsafe {
                list.command_buffer().clear_render_target(attachment.texture.handle(), color);
            }
        }
    }
    if let Some(depth) = depth {
        depth.texture.request_state(list, ResourceState::DEPTH_WRITE);
        if let Some(value) = depth.clear {
            unsafe {
                list.command_buffer().clear_depth_stencil(depth.texture.handle(), value, 0);
            }
        }
    }
}

fn pass_extent<B: GPUBackend>(attachments: &[Attachment<B>], depth: Option<&DepthTarget<B>>) -> (u32, u32) {
    attachments.first()
        .map(|attachment| &attachment.texture)
        .or(depth.map(|depth| &depth.texture))
        .map_or((1, 1), |texture| texture.info().mip_extent(0))
}

fn record_draw<B: GPUBackend>(
    device: &Arc<Device<B>>,
    list: &mut CommandListGuard<B>,
    state: &mut ReplayState<B>,
    attachments: &[Attachment<B>],
    depth: Option<&DepthTarget<B>>,
    call: &DrawCall<B>,
) -> Result<bool, DeviceError> {
    let Some(pipeline) = state.pipeline.clone() else {
        log::warn!("Skipping draw without a pipeline");
        return Ok(false);
    };
    let Some(reflection) = pipeline.program().reflection() else {
        log::warn!("Skipping draw, the program of pipeline {:?} has no reflection", pipeline.name());
        return Ok(false);
    };
    if pipeline.render_target_formats().len() != attachments.len() || pipeline.depth_stencil_format().is_some() != depth.is_some() {
        log::warn!("Skipping draw, pipeline {:?} does not match the attachments of the pass", pipeline.name());
        return Ok(false);
    }
    let vertex_buffer_count = pipeline.vertex_buffer_count() as usize;
    let mut vertex_buffers = SmallVec::<[VertexBuffer<B>; 4]>::new();
    for slot in 0..vertex_buffer_count {
        match state.vertex_buffers.get(slot).cloned().flatten() {
            Some(vertex_buffer) => vertex_buffers.push(vertex_buffer),
            None => {
                log::warn!("Skipping draw, pipeline {:?} needs {} vertex buffers but slot {} is empty", pipeline.name(), vertex_buffer_count, slot);
                return Ok(false);
            }
        }
    }
    let index_buffer = match call {
        DrawCall::Draw { .. } => None,
        _ => {
            let Some(index_buffer) = state.index_buffer.clone() else {
                log::warn!("Skipping indexed draw without an index buffer");
                return Ok(false);
            };
            Some(index_buffer)
        }
    };
    let signature = match call {
        DrawCall::IndexedIndirect { stride, .. } => Some(device.command_signature(*stride)?),
        _ => None,
    };

    upload_constants(device, list, &mut state.constants)?;
    let Some(resolved) = resolve_bindings(device, reflection, state.bindings.as_deref(), state.constants.as_ref(), "draw") else {
        return Ok(false);
    };

    transition_bindings(list, &resolved, BindPoint::Graphics);
    for vertex_buffer in &vertex_buffers {
        vertex_buffer.buffer.request_state(list, ResourceState::VERTEX_AND_CONSTANT_BUFFER);
    }
    if let Some(index_buffer) = &index_buffer {
        index_buffer.buffer.request_state(list, ResourceState::INDEX_BUFFER);
    }
    if let DrawCall::IndexedIndirect { buffer, .. } = call {
        buffer.request_state(list, ResourceState::INDIRECT_ARGUMENT);
    }

    let (width, height) = pass_extent(attachments, depth);
    let viewport = state.viewport.unwrap_or(Viewport {
        position: [0.0f32, 0.0f32],
        extent: [width as f32, height as f32],
        min_depth: 0.0f32,
        max_depth: 1.0f32,
    });
    let scissor = state.scissor.unwrap_or(Scissor {
        position: [0, 0],
        extent: [width, height],
    });
    let render_targets: SmallVec<[&B::Texture; 8]> = attachments.iter().map(|attachment| attachment.texture.handle()).collect();

    unsafe {
        let command_buffer = list.command_buffer();
        command_buffer.set_render_targets(&render_targets, depth.map(|depth| depth.texture.handle()));
        command_buffer.set_graphics_pipeline(pipeline.handle());
        command_buffer.set_viewports(&[viewport]);
        command_buffer.set_scissors(&[scissor]);
        for (slot, vertex_buffer) in vertex_buffers.iter().enumerate() {
            command_buffer.set_vertex_buffer(slot as u32, vertex_buffer.buffer.handle(), vertex_buffer.offset, vertex_buffer.stride);
        }
        if let Some(index_buffer) = &index_buffer {
            command_buffer.set_index_buffer(index_buffer.buffer.handle(), index_buffer.offset, index_buffer.format);
        }
    }
    bind_resolved(list, &resolved, BindPoint::Graphics);

    unsafe {
        let command_buffer = list.command_buffer();
        match call {
            DrawCall::Draw { vertices, instances, first_vertex, first_instance } =>
                command_buffer.draw(*vertices, *instances, *first_vertex, *first_instance),
            DrawCall::Indexed { indices, instances, first_index, vertex_offset, first_instance } =>
                command_buffer.draw_indexed(*indices, *instances, *first_index, *vertex_offset, *first_instance),
            DrawCall::IndexedIndirect { buffer, offset, draw_count, .. } => {
                if let Some(signature) = &signature {
                    command_buffer.draw_indexed_indirect(signature, buffer.handle(), *offset, *draw_count);
                }
            }
        }
    }
    Ok(true)
}

impl<B: GPUBackend> std::fmt::Debug for GraphicsEncoder<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(Graphics encoder: {} attachments, {} operations)", self.attachments.len(), self.ops.len())
    }
}

