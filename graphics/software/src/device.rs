use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use kiln_core::gpu;
use parking_lot::Mutex;

use super::sync::FenceInner;
use super::*;

const ROW_PITCH_ALIGNMENT: u64 = 256;
const PLACEMENT_ALIGNMENT: u64 = 512;

fn align_up(value: u64, alignment: u64) -> u64 {
    (value + alignment - 1) & !(alignment - 1)
}

pub(crate) struct DeviceShared {
    next_id: AtomicU64,
    removed: AtomicBool,
    fail_next_reset: AtomicBool,
    journals: Mutex<[Vec<JournalEntry>; 3]>,
    fences: Mutex<Vec<Weak<FenceInner>>>,
    pub(crate) stats: StatsCounters,
}

impl DeviceShared {
    pub(crate) fn next_id(&self) -> ResourceId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    pub(crate) fn take_reset_failure(&self) -> bool {
        self.fail_next_reset.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn register_fence(&self, fence: &Arc<FenceInner>) {
        let mut fences = self.fences.lock();
        fences.retain(|f| f.strong_count() > 0);
        fences.push(Arc::downgrade(fence));
    }

    pub(crate) fn append_journal(&self, queue_type: gpu::QueueType, entries: impl IntoIterator<Item = JournalEntry>) {
        let mut journals = self.journals.lock();
        journals[queue_type.index()].extend(entries);
    }
}

/// CPU device. Clones share the same device, which lets tests keep a handle for inspection.
#[derive(Clone)]
pub struct SoftwareDevice {
    shared: Arc<DeviceShared>,
}

impl SoftwareDevice {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(DeviceShared {
                next_id: AtomicU64::new(1),
                removed: AtomicBool::new(false),
                fail_next_reset: AtomicBool::new(false),
                journals: Mutex::new([Vec::new(), Vec::new(), Vec::new()]),
                fences: Mutex::new(Vec::new()),
                stats: StatsCounters::default(),
            }),
        }
    }

    /// Everything executed on the queue of the given type so far.
    pub fn journal(&self, queue_type: gpu::QueueType) -> Vec<JournalEntry> {
        self.shared.journals.lock()[queue_type.index()].clone()
    }

    pub fn take_journal(&self, queue_type: gpu::QueueType) -> Vec<JournalEntry> {
        std::mem::take(&mut self.shared.journals.lock()[queue_type.index()])
    }

    pub fn stats(&self) -> SoftwareStats {
        self.shared.stats.snapshot()
    }

    /// Behaves like a TDR: every fence reports the removed sentinel from now on and waiters are released.
    pub fn simulate_device_removal(&self) {
        log::warn!("Simulating device removal");
        self.shared.removed.store(true, Ordering::Release);
        let fences = self.shared.fences.lock();
        for fence in fences.iter().filter_map(|f| f.upgrade()) {
            fence.wake();
        }
    }

    /// Makes the next command list reset fail, as if the allocator ran out of memory.
    pub fn fail_next_command_list_reset(&self) {
        self.shared.fail_next_reset.store(true, Ordering::Release);
    }
}

impl Default for SoftwareDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl gpu::Device<SoftwareBackend> for SoftwareDevice {
    unsafe fn create_queue(&self, queue_type: gpu::QueueType) -> Result<SoftwareQueue, gpu::NativeError> {
        Ok(SoftwareQueue::new(&self.shared, queue_type))
    }

    unsafe fn create_command_pool(&self, queue_type: gpu::QueueType) -> Result<SoftwareCommandPool, gpu::NativeError> {
        Ok(SoftwareCommandPool::new(queue_type))
    }

    unsafe fn create_command_buffer(&self, pool: &mut SoftwareCommandPool, queue_type: gpu::QueueType, name: Option<&str>) -> Result<SoftwareCommandBuffer, gpu::NativeError> {
        if pool.queue_type() != queue_type {
            return Err(gpu::NativeError::new("CreateCommandList", format!("pool of type {:?} can not allocate a {:?} list", pool.queue_type(), queue_type)));
        }
        Ok(SoftwareCommandBuffer::new(&self.shared, queue_type, name))
    }

    unsafe fn create_fence(&self, initial_value: u64) -> Result<SoftwareFence, gpu::NativeError> {
        Ok(SoftwareFence::new(&self.shared, initial_value))
    }

    unsafe fn create_buffer(&self, info: &gpu::BufferInfo, initial_state: gpu::ResourceState, name: Option<&str>) -> Result<SoftwareBuffer, gpu::NativeError> {
        if info.size == 0 {
            return Err(gpu::NativeError::new("CreateCommittedResource", "buffers must not be empty"));
        }
        Ok(SoftwareBuffer::new(self.shared.next_id(), info, initial_state, name))
    }

    unsafe fn create_texture(&self, info: &gpu::TextureInfo, initial_state: gpu::ResourceState, name: Option<&str>) -> Result<SoftwareTexture, gpu::NativeError> {
        if info.width == 0 || info.height == 0 || info.mip_levels == 0 || info.array_length == 0 {
            return Err(gpu::NativeError::new("CreateCommittedResource", "textures must not be empty"));
        }
        if info.samples != gpu::SampleCount::Samples1 && info.mip_levels != 1 {
            return Err(gpu::NativeError::new("CreateCommittedResource", "multisampled textures can only have a single mip level"));
        }
        Ok(SoftwareTexture::new(self.shared.next_id(), info, initial_state, name))
    }

    unsafe fn create_sampler(&self, info: &gpu::SamplerInfo) -> Result<SoftwareSampler, gpu::NativeError> {
        Ok(SoftwareSampler {
            id: self.shared.next_id(),
            info: info.clone(),
        })
    }

    unsafe fn create_shader(&self, shader_type: gpu::ShaderType, bytecode: &[u8], name: Option<&str>) -> Result<SoftwareShader, gpu::NativeError> {
        Ok(SoftwareShader::new(shader_type, bytecode, name))
    }

    unsafe fn create_graphics_pipeline(&self, info: &gpu::GraphicsPipelineInfo<SoftwareBackend>, _name: Option<&str>) -> Result<SoftwareGraphicsPipeline, gpu::NativeError> {
        if info.vs.shader_type() != gpu::ShaderType::VertexShader {
            return Err(gpu::NativeError::new("CreateGraphicsPipelineState", "vertex stage is not a vertex shader"));
        }
        if info.fs.map_or(false, |fs| fs.shader_type() != gpu::ShaderType::FragmentShader) {
            return Err(gpu::NativeError::new("CreateGraphicsPipelineState", "pixel stage is not a fragment shader"));
        }
        Ok(SoftwareGraphicsPipeline {
            id: self.shared.next_id(),
            layout: Arc::new(SoftwarePipelineLayout {
                root_parameters: info.root_parameters.to_vec(),
                render_target_formats: info.render_target_formats.to_vec(),
                depth_stencil_format: info.depth_stencil_format,
                vertex_buffer_count: info.vertex_layout.input_assembler.len() as u32,
            }),
        })
    }

    unsafe fn create_compute_pipeline(&self, info: &gpu::ComputePipelineInfo<SoftwareBackend>, _name: Option<&str>) -> Result<SoftwareComputePipeline, gpu::NativeError> {
        if info.shader.shader_type() != gpu::ShaderType::ComputeShader {
            return Err(gpu::NativeError::new("CreateComputePipelineState", "shader is not a compute shader"));
        }
        Ok(SoftwareComputePipeline {
            id: self.shared.next_id(),
            layout: Arc::new(SoftwarePipelineLayout {
                root_parameters: info.root_parameters.to_vec(),
                render_target_formats: Vec::new(),
                depth_stencil_format: None,
                vertex_buffer_count: 0,
            }),
        })
    }

    unsafe fn create_command_signature(&self, stride: u32) -> Result<SoftwareCommandSignature, gpu::NativeError> {
        let min_stride = std::mem::size_of::<gpu::DrawIndexedIndirectArguments>() as u32;
        if stride < min_stride {
            return Err(gpu::NativeError::new("CreateCommandSignature", format!("stride {} is smaller than the argument size {}", stride, min_stride)));
        }
        StatsCounters::bump(&self.shared.stats.command_signatures_created);
        Ok(SoftwareCommandSignature { stride })
    }

    fn copyable_footprints(&self, info: &gpu::TextureInfo, first_subresource: u32, subresource_count: u32) -> (Vec<gpu::CopyableFootprint>, u64) {
        let mut footprints = Vec::with_capacity(subresource_count as usize);
        let mut offset = 0u64;
        for index in first_subresource..(first_subresource + subresource_count) {
            let mip_level = index % info.mip_levels;
            let (width, height) = info.mip_extent(mip_level);
            let row_size = info.packed_row_size(mip_level);
            let row_pitch = align_up(row_size, ROW_PITCH_ALIGNMENT);
            offset = align_up(offset, PLACEMENT_ALIGNMENT);
            footprints.push(gpu::CopyableFootprint {
                offset,
                row_pitch,
                width,
                height,
                row_count: height,
                row_size,
            });
            offset += row_pitch * (height as u64 - 1) + row_size;
        }
        (footprints, offset)
    }
}

#[cfg(test)]
mod test {
    use kiln_core::gpu::{self, Device as _};

    use super::*;

    #[test]
    fn footprints_are_pitch_aligned() {
        let device = SoftwareDevice::new();
        let info = gpu::TextureInfo {
            format: gpu::Format::RGBA8UNorm,
            width: 10,
            height: 4,
            mip_levels: 2,
            array_length: 1,
            samples: gpu::SampleCount::Samples1,
            usage: gpu::TextureUsage::SAMPLED,
        };
        let (footprints, total) = device.copyable_footprints(&info, 0, 2);
        assert_eq!(footprints.len(), 2);
        assert_eq!(footprints[0].row_pitch, 256);
        assert_eq!(footprints[0].row_size, 40);
        assert_eq!(footprints[1].offset, 1024);
        assert_eq!(footprints[1].width, 5);
        assert_eq!(total, 1024 + 256 + 20);
    }

    #[test]
    fn removal_reports_sentinel() {
        let device = SoftwareDevice::new();
        let fence = unsafe { device.create_fence(0).unwrap() };
        assert_eq!(unsafe { gpu::Fence::value(&fence) }, 0);
        device.simulate_device_removal();
        assert_eq!(unsafe { gpu::Fence::value(&fence) }, gpu::DEVICE_REMOVED_FENCE_VALUE);
        // Waiting on a removed device must not hang.
        unsafe { gpu::Fence::await_value(&fence, 10) };
    }
}
