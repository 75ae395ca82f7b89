use std::sync::Arc;

use kiln_core::gpu;
use smallvec::SmallVec;

use super::command::{BoundResource, Command, Transition, TransitionTarget};
use super::*;

pub struct SoftwareQueue {
    queue_type: gpu::QueueType,
    shared: Arc<DeviceShared>,
}

impl SoftwareQueue {
    pub(crate) fn new(shared: &Arc<DeviceShared>, queue_type: gpu::QueueType) -> Self {
        Self {
            queue_type,
            shared: shared.clone(),
        }
    }

    pub fn queue_type(&self) -> gpu::QueueType {
        self.queue_type
    }
}

impl gpu::Queue<SoftwareBackend> for SoftwareQueue {
    unsafe fn execute(&self, command_buffers: &[&SoftwareCommandBuffer]) -> Result<(), gpu::NativeError> {
        for command_buffer in command_buffers {
            if !command_buffer.is_closed() {
                return Err(gpu::NativeError::new("ExecuteCommandLists", "command list is still open"));
            }
            if command_buffer.queue_type() != self.queue_type {
                return Err(gpu::NativeError::new("ExecuteCommandLists", format!("{:?} list submitted to {:?} queue", command_buffer.queue_type(), self.queue_type)));
            }
        }
        if self.shared.is_removed() {
            log::warn!("Dropping {} command list(s), the device was removed", command_buffers.len());
            return Ok(());
        }

        for command_buffer in command_buffers {
            let mut executor = Executor::new(self.queue_type, &self.shared);
            for command in command_buffer.commands() {
                executor.execute(command);
            }
            self.shared.append_journal(self.queue_type, executor.entries);
            StatsCounters::bump(&self.shared.stats.command_lists_executed);
        }
        Ok(())
    }

    unsafe fn signal(&self, fence: &SoftwareFence, value: u64) -> Result<(), gpu::NativeError> {
        if self.shared.is_removed() {
            return Ok(());
        }
        fence.inner.signal(value);
        self.shared.append_journal(self.queue_type, [JournalEntry::Signal { value }]);
        StatsCounters::bump(&self.shared.stats.signals);
        Ok(())
    }
}

#[derive(Default)]
struct BindingTable {
    bindings: SmallVec<[(u32, Option<gpu::BindingKind>, BoundResource); 8]>,
}

impl BindingTable {
    fn bind(&mut self, root_index: u32, kind: Option<gpu::BindingKind>, resource: BoundResource) {
        self.bindings.retain(|(index, _, _)| *index != root_index);
        self.bindings.push((root_index, kind, resource));
    }
}

/// Runs the commands of one list against resource memory.
struct Executor<'a> {
    queue_type: gpu::QueueType,
    shared: &'a DeviceShared,
    entries: Vec<JournalEntry>,
    graphics_pipeline: Option<SoftwareGraphicsPipeline>,
    compute_pipeline: Option<SoftwareComputePipeline>,
    render_targets: SmallVec<[SoftwareTexture; 8]>,
    depth_stencil: Option<SoftwareTexture>,
    vertex_buffers: SmallVec<[Option<SoftwareBuffer>; 4]>,
    index_buffer: Option<(SoftwareBuffer, u64, gpu::IndexFormat)>,
    graphics_bindings: BindingTable,
    compute_bindings: BindingTable,
}

impl<'a> Executor<'a> {
    fn new(queue_type: gpu::QueueType, shared: &'a DeviceShared) -> Self {
        Self {
            queue_type,
            shared,
            entries: Vec::new(),
            graphics_pipeline: None,
            compute_pipeline: None,
            render_targets: SmallVec::new(),
            depth_stencil: None,
            vertex_buffers: SmallVec::new(),
            index_buffer: None,
            graphics_bindings: BindingTable::default(),
            compute_bindings: BindingTable::default(),
        }
    }

    fn error(&mut self, message: String) {
        log::error!("{:?} queue: {}", self.queue_type, message);
        StatsCounters::bump(&self.shared.stats.validation_errors);
        self.entries.push(JournalEntry::ValidationError(message));
    }

    fn check_buffer(&mut self, buffer: &SoftwareBuffer, allowed: gpu::ResourceState, usage: &str) -> bool {
        let state = buffer.native_state();
        if !state.intersects(allowed) {
            self.error(format!("buffer {} ({:?}) used as {} while in state {:?}", buffer.id(), buffer.name(), usage, state));
            return false;
        }
        true
    }

    fn check_texture(&mut self, texture: &SoftwareTexture, allowed: gpu::ResourceState, usage: &str) -> bool {
        let state = texture.native_state();
        if !state.intersects(allowed) {
            self.error(format!("texture {} ({:?}) used as {} while in state {:?}", texture.id(), texture.name(), usage, state));
            return false;
        }
        true
    }

    fn execute(&mut self, command: &Command) {
        match command {
            Command::Barrier(transitions) => {
                for transition in transitions {
                    self.transition(transition);
                }
            }
            Command::CopyBuffer { src, dst, region } => self.copy_buffer(src, dst, region),
            Command::CopyBufferToTexture { src, dst, region } => self.copy_buffer_to_texture(src, dst, region),
            Command::CopyTextureToBuffer { src, dst, region } => self.copy_texture_to_buffer(src, dst, region),
            Command::Resolve { src, dst, subresource } => self.resolve(src, dst, subresource),
            Command::FillBuffer { buffer, offset, length, value } => {
                if !self.check_buffer(buffer, gpu::ResourceState::COPY_DEST | gpu::ResourceState::UNORDERED_ACCESS, "fill destination") {
                    return;
                }
                if !buffer.inner.memory.contains(*offset, *length) {
                    self.error(format!("fill of {} bytes at {} overruns buffer {}", length, offset, buffer.id()));
                    return;
                }
                unsafe { buffer.inner.memory.write(*offset as usize, *length as usize) }.fill(*value);
                self.entries.push(JournalEntry::FillBuffer { buffer: buffer.id(), offset: *offset, length: *length, value: *value });
            }
            Command::SetGraphicsPipeline(pipeline) => {
                self.graphics_pipeline = Some(pipeline.clone());
                self.graphics_bindings = BindingTable::default();
            }
            Command::SetComputePipeline(pipeline) => {
                self.compute_pipeline = Some(pipeline.clone());
                self.compute_bindings = BindingTable::default();
            }
            Command::SetRenderTargets { render_targets, depth_stencil } => {
                self.render_targets = render_targets.clone();
                self.depth_stencil = depth_stencil.clone();
            }
            Command::ClearRenderTarget { texture, color } => {
                if !self.check_texture(texture, gpu::ResourceState::RENDER_TARGET, "render target") {
                    return;
                }
                let texel = encode_color(texture.inner.info.format, color);
                fill_texels(texture, &texel);
                self.entries.push(JournalEntry::ClearRenderTarget { texture: texture.id() });
            }
            Command::ClearDepthStencil { texture, depth, stencil } => {
                if !self.check_texture(texture, gpu::ResourceState::DEPTH_WRITE, "depth stencil") {
                    return;
                }
                let texel = encode_depth(texture.inner.info.format, *depth, *stencil);
                fill_texels(texture, &texel);
                self.entries.push(JournalEntry::ClearDepthStencil { texture: texture.id() });
            }
            Command::SetViewports(_) | Command::SetScissors(_) => {}
            Command::SetVertexBuffer { slot, buffer, .. } => {
                let slot = *slot as usize;
                if self.vertex_buffers.len() <= slot {
                    self.vertex_buffers.resize(slot + 1, None);
                }
                self.vertex_buffers[slot] = Some(buffer.clone());
            }
            Command::SetIndexBuffer { buffer, offset, format } => {
                self.index_buffer = Some((buffer.clone(), *offset, *format));
            }
            Command::Bind { bind_point, root_index, kind, resource } => {
                let table = match bind_point {
                    gpu::BindPoint::Graphics => &mut self.graphics_bindings,
                    gpu::BindPoint::Compute => &mut self.compute_bindings,
                };
                table.bind(*root_index, *kind, resource.clone());
            }
            Command::Draw { vertices, instances } => {
                if self.validate_draw() {
                    StatsCounters::bump(&self.shared.stats.draws);
                    self.entries.push(JournalEntry::Draw { vertices: *vertices, instances: *instances });
                }
            }
            Command::DrawIndexed { indices, instances, first_index } => {
                if self.validate_draw() && self.validate_index_buffer(*first_index, *indices) {
                    StatsCounters::bump(&self.shared.stats.draws);
                    self.entries.push(JournalEntry::DrawIndexed { indices: *indices, instances: *instances });
                }
            }
            Command::DrawIndexedIndirect { stride, buffer, offset, max_draw_count } => {
                if !self.validate_draw() || !self.check_buffer(buffer, gpu::ResourceState::INDIRECT_ARGUMENT, "indirect arguments") {
                    return;
                }
                let argument_size = std::mem::size_of::<gpu::DrawIndexedIndirectArguments>() as u64;
                for i in 0..*max_draw_count as u64 {
                    let argument_offset = offset + i * *stride as u64;
                    if !buffer.inner.memory.contains(argument_offset, argument_size) {
                        self.error(format!("indirect draw {} reads past the end of buffer {}", i, buffer.id()));
                        return;
                    }
                    let bytes = unsafe { buffer.inner.memory.read(argument_offset as usize, argument_size as usize) };
                    let index_count = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                    let first_index = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
                    if !self.validate_index_buffer(first_index, index_count) {
                        return;
                    }
                    StatsCounters::bump(&self.shared.stats.draws);
                }
                self.entries.push(JournalEntry::DrawIndexedIndirect { stride: *stride, draw_count: *max_draw_count });
            }
            Command::Dispatch { x, y, z } => {
                if self.validate_dispatch() {
                    StatsCounters::bump(&self.shared.stats.dispatches);
                    self.entries.push(JournalEntry::Dispatch { x: *x, y: *y, z: *z });
                }
            }
        }
    }

    fn transition(&mut self, transition: &Transition) {
        let (id, mut state) = match &transition.target {
            TransitionTarget::Buffer(buffer) => (buffer.id(), buffer.inner.state.lock()),
            TransitionTarget::Texture(texture) => (texture.id(), texture.inner.state.lock()),
        };
        let actual = *state;
        *state = transition.new_state;
        drop(state);

        if transition.old_state == transition.new_state {
            self.error(format!("barrier on resource {} does not change its state {:?}", id, actual));
        } else if actual != transition.old_state {
            self.error(format!("barrier on resource {} expects state {:?} but the resource is in {:?}", id, transition.old_state, actual));
        }
        StatsCounters::bump(&self.shared.stats.barriers);
        self.entries.push(JournalEntry::Barrier { resource: id, before: transition.old_state, after: transition.new_state });
    }

    fn copy_buffer(&mut self, src: &SoftwareBuffer, dst: &SoftwareBuffer, region: &gpu::BufferCopyRegion) {
        if !self.check_buffer(src, gpu::ResourceState::COPY_SOURCE, "copy source") || !self.check_buffer(dst, gpu::ResourceState::COPY_DEST, "copy destination") {
            return;
        }
        if !src.inner.memory.contains(region.src_offset, region.size) || !dst.inner.memory.contains(region.dst_offset, region.size) {
            self.error(format!("copy of {} bytes from buffer {} to buffer {} is out of bounds", region.size, src.id(), dst.id()));
            return;
        }
        let data = unsafe { src.inner.memory.read(region.src_offset as usize, region.size as usize).to_vec() };
        unsafe { dst.inner.memory.write(region.dst_offset as usize, region.size as usize) }.copy_from_slice(&data);
        StatsCounters::bump(&self.shared.stats.copies);
        self.entries.push(JournalEntry::CopyBuffer { src: src.id(), dst: dst.id(), region: *region });
    }

    fn check_region(&mut self, buffer: &SoftwareBuffer, texture: &SoftwareTexture, region: &gpu::BufferTextureCopyRegion) -> bool {
        let info = &texture.inner.info;
        if info.samples != gpu::SampleCount::Samples1 {
            self.error(format!("texture {} is multisampled and can not be copied to or from a buffer", texture.id()));
            return false;
        }
        let (width, height) = info.mip_extent(region.texture_subresource.mip_level);
        let [x, y] = region.texture_offset;
        let [w, h] = region.texture_extent;
        if region.texture_subresource.mip_level >= info.mip_levels
            || region.texture_subresource.array_layer >= info.array_length
            || x + w > width
            || y + h > height {
            self.error(format!("copy region {:?} is outside of texture {}", region, texture.id()));
            return false;
        }
        let row_size = w as u64 * info.format.element_size() as u64;
        if region.buffer_row_pitch < row_size {
            self.error(format!("row pitch {} is smaller than the row size {}", region.buffer_row_pitch, row_size));
            return false;
        }
        if h > 0 && !buffer.inner.memory.contains(region.buffer_offset, region.buffer_row_pitch * (h as u64 - 1) + row_size) {
            self.error(format!("copy region {:?} is outside of buffer {}", region, buffer.id()));
            return false;
        }
        true
    }

    fn copy_buffer_to_texture(&mut self, src: &SoftwareBuffer, dst: &SoftwareTexture, region: &gpu::BufferTextureCopyRegion) {
        if !self.check_buffer(src, gpu::ResourceState::COPY_SOURCE, "copy source")
            || !self.check_texture(dst, gpu::ResourceState::COPY_DEST, "copy destination")
            || !self.check_region(src, dst, region) {
            return;
        }
        let row_size = region.texture_extent[0] as usize * dst.texel_size();
        for row in 0..region.texture_extent[1] {
            let src_offset = region.buffer_offset as usize + row as usize * region.buffer_row_pitch as usize;
            let Some(dst_offset) = dst.texel_offset(&region.texture_subresource, region.texture_offset[0], region.texture_offset[1] + row) else {
                continue;
            };
            let data = unsafe { src.inner.memory.read(src_offset, row_size) };
            unsafe { dst.inner.memory.write(dst_offset, row_size) }.copy_from_slice(data);
        }
        StatsCounters::bump(&self.shared.stats.copies);
        self.entries.push(JournalEntry::CopyBufferToTexture { src: src.id(), dst: dst.id(), subresource: region.texture_subresource });
    }

    fn copy_texture_to_buffer(&mut self, src: &SoftwareTexture, dst: &SoftwareBuffer, region: &gpu::BufferTextureCopyRegion) {
        if !self.check_texture(src, gpu::ResourceState::COPY_SOURCE, "copy source")
            || !self.check_buffer(dst, gpu::ResourceState::COPY_DEST, "copy destination")
            || !self.check_region(dst, src, region) {
            return;
        }
        let row_size = region.texture_extent[0] as usize * src.texel_size();
        for row in 0..region.texture_extent[1] {
            let dst_offset = region.buffer_offset as usize + row as usize * region.buffer_row_pitch as usize;
            let Some(src_offset) = src.texel_offset(&region.texture_subresource, region.texture_offset[0], region.texture_offset[1] + row) else {
                continue;
            };
            let data = unsafe { src.inner.memory.read(src_offset, row_size) };
            unsafe { dst.inner.memory.write(dst_offset, row_size) }.copy_from_slice(data);
        }
        StatsCounters::bump(&self.shared.stats.copies);
        self.entries.push(JournalEntry::CopyTextureToBuffer { src: src.id(), dst: dst.id(), subresource: region.texture_subresource });
    }

    fn resolve(&mut self, src: &SoftwareTexture, dst: &SoftwareTexture, subresource: &gpu::TextureSubresource) {
        if !self.check_texture(src, gpu::ResourceState::RESOLVE_SOURCE, "resolve source") || !self.check_texture(dst, gpu::ResourceState::RESOLVE_DEST, "resolve destination") {
            return;
        }
        let src_info = src.inner.info;
        let dst_info = dst.inner.info;
        if src_info.samples == gpu::SampleCount::Samples1 || dst_info.samples != gpu::SampleCount::Samples1 {
            self.error(format!("resolve from texture {} to texture {} needs a multisampled source and a single sampled destination", src.id(), dst.id()));
            return;
        }
        if src_info.format != dst_info.format || src_info.mip_extent(0) != dst_info.mip_extent(subresource.mip_level) {
            self.error(format!("resolve from texture {} to texture {} with mismatching formats or sizes", src.id(), dst.id()));
            return;
        }
        let source_subresource = gpu::TextureSubresource { array_layer: subresource.array_layer, mip_level: 0 };
        let (width, height) = dst_info.mip_extent(subresource.mip_level);
        let element_size = dst_info.format.element_size() as usize;
        for y in 0..height {
            for x in 0..width {
                // Takes sample 0, sample patterns are not modelled.
                let (Some(src_offset), Some(dst_offset)) = (src.texel_offset(&source_subresource, x, y), dst.texel_offset(subresource, x, y)) else {
                    continue;
                };
                let data = unsafe { src.inner.memory.read(src_offset, element_size) };
                unsafe { dst.inner.memory.write(dst_offset, element_size) }.copy_from_slice(data);
            }
        }
        StatsCounters::bump(&self.shared.stats.resolves);
        self.entries.push(JournalEntry::Resolve { src: src.id(), dst: dst.id() });
    }

    fn validate_bindings(&mut self, bind_point: gpu::BindPoint, parameters: &[gpu::RootParameter]) -> bool {
        let bindings = match bind_point {
            gpu::BindPoint::Graphics => self.graphics_bindings.bindings.clone(),
            gpu::BindPoint::Compute => self.compute_bindings.bindings.clone(),
        };
        let mut valid = true;
        for (root_index, parameter) in parameters.iter().enumerate() {
            let Some((_, kind, resource)) = bindings.iter().find(|(index, _, _)| *index as usize == root_index) else {
                self.error(format!("root parameter {} ({}) is not bound", root_index, parameter.name));
                valid = false;
                continue;
            };
            if let Some(kind) = kind {
                if *kind != parameter.kind {
                    self.error(format!("root parameter {} ({}) is declared {:?} but bound as {:?}", root_index, parameter.name, parameter.kind, kind));
                    valid = false;
                    continue;
                }
            }
            let allowed = match (parameter.kind, bind_point) {
                (gpu::BindingKind::Constant, _) => gpu::ResourceState::VERTEX_AND_CONSTANT_BUFFER,
                (gpu::BindingKind::ReadOnly, gpu::BindPoint::Graphics) => gpu::ResourceState::ALL_SHADER_RESOURCE,
                (gpu::BindingKind::ReadOnly, gpu::BindPoint::Compute) => gpu::ResourceState::NON_PIXEL_SHADER_RESOURCE,
                (gpu::BindingKind::ReadWrite, _) => gpu::ResourceState::UNORDERED_ACCESS,
            };
            valid &= match resource {
                BoundResource::Buffer(buffer) => self.check_buffer(buffer, allowed, &parameter.name),
                BoundResource::Texture(texture) => self.check_texture(texture, allowed, &parameter.name),
                BoundResource::Sampler => true,
            };
        }
        valid
    }

    fn validate_draw(&mut self) -> bool {
        let Some(pipeline) = self.graphics_pipeline.clone() else {
            self.error("draw without a graphics pipeline".to_string());
            return false;
        };
        let layout = pipeline.layout();
        let mut valid = true;
        if self.render_targets.len() != layout.render_target_formats.len() {
            self.error(format!("pipeline expects {} render targets, {} are bound", layout.render_target_formats.len(), self.render_targets.len()));
            valid = false;
        }
        for render_target in self.render_targets.clone() {
            valid &= self.check_texture(&render_target, gpu::ResourceState::RENDER_TARGET, "render target");
        }
        if let Some(depth_stencil) = self.depth_stencil.clone() {
            valid &= self.check_texture(&depth_stencil, gpu::ResourceState::DEPTH_WRITE | gpu::ResourceState::DEPTH_READ, "depth stencil");
        }
        for slot in 0..layout.vertex_buffer_count as usize {
            match self.vertex_buffers.get(slot).cloned().flatten() {
                Some(buffer) => valid &= self.check_buffer(&buffer, gpu::ResourceState::VERTEX_AND_CONSTANT_BUFFER, "vertex buffer"),
                None => {
                    self.error(format!("vertex buffer slot {} is not bound", slot));
                    valid = false;
                }
            }
        }
        valid &= self.validate_bindings(gpu::BindPoint::Graphics, &layout.root_parameters);
        valid
    }

    fn validate_index_buffer(&mut self, first_index: u32, indices: u32) -> bool {
        let Some((buffer, offset, format)) = self.index_buffer.clone() else {
            self.error("indexed draw without an index buffer".to_string());
            return false;
        };
        if !self.check_buffer(&buffer, gpu::ResourceState::INDEX_BUFFER, "index buffer") {
            return false;
        }
        let size = format.size() as u64;
        if !buffer.inner.memory.contains(offset + first_index as u64 * size, indices as u64 * size) {
            self.error(format!("indexed draw reads past the end of index buffer {}", buffer.id()));
            return false;
        }
        true
    }

    fn validate_dispatch(&mut self) -> bool {
        let Some(pipeline) = self.compute_pipeline.clone() else {
            self.error("dispatch without a compute pipeline".to_string());
            return false;
        };
        self.validate_bindings(gpu::BindPoint::Compute, &pipeline.layout().root_parameters)
    }
}

fn fill_texels(texture: &SoftwareTexture, texel: &[u8]) {
    let subresource = gpu::TextureSubresource { array_layer: 0, mip_level: 0 };
    let (width, height) = texture.inner.info.mip_extent(0);
    let Some(offset) = texture.texel_offset(&subresource, 0, 0) else {
        return;
    };
    let samples = texture.inner.info.samples.count() as usize;
    let len = width as usize * height as usize * samples * texel.len();
    let memory = unsafe { texture.inner.memory.write(offset, len) };
    for chunk in memory.chunks_exact_mut(texel.len()) {
        chunk.copy_from_slice(texel);
    }
}

fn unorm8(value: f32) -> u8 {
    (value.clamp(0.0f32, 1.0f32) * 255.0f32).round() as u8
}

fn encode_color(format: gpu::Format, color: &[f32; 4]) -> SmallVec<[u8; 16]> {
    let mut texel = SmallVec::<[u8; 16]>::new();
    match format {
        gpu::Format::R8Unorm => texel.push(unorm8(color[0])),
        gpu::Format::RG8UNorm => texel.extend([unorm8(color[0]), unorm8(color[1])]),
        gpu::Format::RGBA8UNorm | gpu::Format::RGBA8Srgb => texel.extend(color.iter().map(|c| unorm8(*c))),
        gpu::Format::BGRA8UNorm => texel.extend([unorm8(color[2]), unorm8(color[1]), unorm8(color[0]), unorm8(color[3])]),
        gpu::Format::R32Float => texel.extend_from_slice(&color[0].to_le_bytes()),
        gpu::Format::RG32Float => color[..2].iter().for_each(|c| texel.extend_from_slice(&c.to_le_bytes())),
        gpu::Format::RGB32Float => color[..3].iter().for_each(|c| texel.extend_from_slice(&c.to_le_bytes())),
        gpu::Format::RGBA32Float => color.iter().for_each(|c| texel.extend_from_slice(&c.to_le_bytes())),
        _ => texel.resize(format.element_size() as usize, 0u8),
    }
    texel
}

fn encode_depth(format: gpu::Format, depth: f32, stencil: u8) -> SmallVec<[u8; 16]> {
    let depth = depth.clamp(0.0f32, 1.0f32);
    let mut texel = SmallVec::<[u8; 16]>::new();
    match format {
        gpu::Format::D16 => texel.extend_from_slice(&((depth * 65535.0f32).round() as u16).to_le_bytes()),
        gpu::Format::D32 => texel.extend_from_slice(&depth.to_le_bytes()),
        gpu::Format::D24S8 => {
            let bits = (depth * 16777215.0f32).round() as u32 | ((stencil as u32) << 24);
            texel.extend_from_slice(&bits.to_le_bytes());
        }
        gpu::Format::D32S8 => {
            texel.extend_from_slice(&depth.to_le_bytes());
            texel.extend_from_slice(&[stencil, 0, 0, 0]);
        }
        _ => texel.resize(format.element_size() as usize, 0u8),
    }
    texel
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn clear_colors_are_encoded_per_format() {
        assert_eq!(encode_color(gpu::Format::RGBA8UNorm, &[1.0, 0.0, 0.5, 1.0]).as_slice(), &[255, 0, 128, 255]);
        assert_eq!(encode_color(gpu::Format::BGRA8UNorm, &[1.0, 0.0, 0.0, 1.0]).as_slice(), &[0, 0, 255, 255]);
        assert_eq!(encode_color(gpu::Format::R32Float, &[2.0, 0.0, 0.0, 0.0]).as_slice(), &2.0f32.to_le_bytes());
        assert_eq!(encode_color(gpu::Format::R11G11B10Float, &[1.0; 4]).len(), 4);
        assert_eq!(encode_depth(gpu::Format::D24S8, 1.0, 3).as_slice(), &[255, 255, 255, 3]);
    }
}
