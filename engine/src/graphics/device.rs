use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use kiln_core::gpu::{self, CommandSignature as _, Device as _, GPUBackend, QueueType};
use parking_lot::{Mutex, MutexGuard};

use super::*;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    /// Real submissions, indexed by [`QueueType::index`].
    pub submissions: [u64; 3],
    pub barriers: u64,
    /// Bindings that were only resolved through [`DeviceSettings::binding_fallbacks`].
    pub fallback_bindings: u64,
    pub command_signature_builds: u64,
    /// Operations dropped because no command list could be acquired.
    pub skipped_operations: u64,
}

#[derive(Default)]
struct StatsCounters {
    submissions: [AtomicU64; 3],
    barriers: AtomicU64,
    fallback_bindings: AtomicU64,
    command_signature_builds: AtomicU64,
    skipped_operations: AtomicU64,
}

impl StatsCounters {
    fn snapshot(&self) -> DeviceStats {
        DeviceStats {
            submissions: [
                self.submissions[0].load(Ordering::Relaxed),
                self.submissions[1].load(Ordering::Relaxed),
                self.submissions[2].load(Ordering::Relaxed),
            ],
            barriers: self.barriers.load(Ordering::Relaxed),
            fallback_bindings: self.fallback_bindings.load(Ordering::Relaxed),
            command_signature_builds: self.command_signature_builds.load(Ordering::Relaxed),
            skipped_operations: self.skipped_operations.load(Ordering::Relaxed),
        }
    }
}

/// Owns one allocator, command list and fence per queue kind and hands out the open lists.
pub struct Device<B: GPUBackend> {
    device: B::Device,
    queues: [Mutex<QueueContext<B>>; 3],
    fence_values: FenceValues,
    lost: AtomicBool,
    destroyer: DeferredDestroyer<B>,
    command_signature: Mutex<Option<Arc<B::CommandSignature>>>,
    submit_hook: Mutex<Option<Arc<dyn SubmitHook>>>,
    hook_running: AtomicBool,
    settings: DeviceSettings,
    stats: StatsCounters,
}

impl<B: GPUBackend> Device<B> {
    pub fn new(device: B::Device, settings: DeviceSettings) -> Result<Arc<Self>, DeviceError> {
        let queues = [
            Mutex::new(QueueContext::new(&device, QueueType::Graphics, settings.debug_names)?),
            Mutex::new(QueueContext::new(&device, QueueType::Compute, settings.debug_names)?),
            Mutex::new(QueueContext::new(&device, QueueType::Copy, settings.debug_names)?),
        ];
        log::info!("Created {} device", B::name());
        Ok(Arc::new(Self {
            device,
            queues,
            fence_values: FenceValues::new(),
            lost: AtomicBool::new(false),
            destroyer: DeferredDestroyer::new(),
            command_signature: Mutex::new(None),
            submit_hook: Mutex::new(None),
            hook_running: AtomicBool::new(false),
            settings,
            stats: StatsCounters::default(),
        }))
    }

    #[inline(always)]
    pub fn native(&self) -> &B::Device {
        &self.device
    }

    pub fn settings(&self) -> &DeviceSettings {
        &self.settings
    }

    pub fn stats(&self) -> DeviceStats {
        self.stats.snapshot()
    }

    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::Acquire)
    }

    /// Number of completed submissions on the given queue.
    pub fn fence_value(&self, queue_type: QueueType) -> u64 {
        self.fence_values.completed(queue_type)
    }

    /// Blocks while another thread holds the list of that queue.
    pub fn list_state(&self, queue_type: QueueType) -> ListState {
        self.queues[queue_type.index()].lock().state
    }

    /// Returns the open list of the given queue kind, reopening it first if it was submitted.
    pub fn get_command_list(&self, queue_type: QueueType) -> Result<CommandListGuard<'_, B>, DeviceError> {
        if self.is_lost() {
            return Err(DeviceError::DeviceLost);
        }
        let context = self.queues[queue_type.index()].lock();
        CommandListGuard::acquire(self, context)
    }

    /// Like [`Device::get_command_list`] but any failure other than device loss is logged and yields `None`.
    pub fn acquire(&self, queue_type: QueueType, operation: &str) -> Result<Option<CommandListGuard<'_, B>>, DeviceError> {
        match self.get_command_list(queue_type) {
            Ok(guard) => Ok(Some(guard)),
            Err(DeviceError::DeviceLost) => Err(DeviceError::DeviceLost),
            Err(e) => {
                log::warn!("Skipping {}, no {:?} command list available: {}", operation, queue_type, e);
                self.stats.skipped_operations.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    /// Submits the list of the given queue kind if it is open and waits for it to finish.
    pub fn submit_command_list(&self, queue_type: QueueType) -> Result<bool, DeviceError> {
        if self.is_lost() {
            return Err(DeviceError::DeviceLost);
        }
        let context = self.queues[queue_type.index()].lock();
        self.finish_submission(context)
    }

    pub fn wait_for_idle(&self) -> Result<(), DeviceError> {
        if self.is_lost() {
            return Err(DeviceError::DeviceLost);
        }
        for queue in &self.queues {
            let context = queue.lock();
            if let Err(e) = context.wait() {
                self.mark_lost();
                return Err(e);
            }
        }
        Ok(())
    }

    pub(super) fn finish_submission(&self, mut context: MutexGuard<'_, QueueContext<B>>) -> Result<bool, DeviceError> {
        let queue_type = context.queue_type;
        let submitted = match context.submit() {
            Ok(submitted) => submitted,
            Err(DeviceError::DeviceLost) => {
                drop(context);
                self.mark_lost();
                return Err(DeviceError::DeviceLost);
            }
            Err(e) => return Err(e),
        };
        if submitted {
            self.fence_values.mark_completed(queue_type, context.fence_value);
            self.stats.submissions[queue_type.index()].fetch_add(1, Ordering::Relaxed);
        }
        drop(context);

        if submitted {
            self.destroyer.collect(self.fence_values.completed_values());
            self.run_submit_hook(queue_type);
        }
        Ok(submitted)
    }

    fn mark_lost(&self) {
        if !self.lost.swap(true, Ordering::AcqRel) {
            log::error!("The {} device was lost", B::name());
        }
    }

    /// Installs a hook that runs after every real submission. Replaces the previous one.
    pub fn set_submit_hook(&self, hook: Option<Arc<dyn SubmitHook>>) {
        *self.submit_hook.lock() = hook;
    }

    fn run_submit_hook(&self, queue_type: QueueType) {
        let hook = self.submit_hook.lock().clone();
        let Some(hook) = hook else {
            return;
        };
        // Hooks submit work themselves.
        if self.hook_running.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = hook.after_submit(queue_type) {
            log::warn!("Submit hook failed after {:?} submission: {}", queue_type, e);
        }
        self.hook_running.store(false, Ordering::Release);
    }

    /// Returns the command signature for indirect indexed draws with the given stride.
    /// Only rebuilt when the stride changes.
    pub fn command_signature(&self, stride: u32) -> Result<Arc<B::CommandSignature>, DeviceError> {
        let mut cached = self.command_signature.lock();
        if let Some(signature) = cached.as_ref() {
            if signature.stride() == stride {
                return Ok(signature.clone());
            }
        }

        let signature = Arc::new(unsafe { self.device.create_command_signature(stride)? });
        self.stats.command_signature_builds.fetch_add(1, Ordering::Relaxed);
        log::trace!("Built command signature with stride {}", stride);
        if let Some(old) = cached.replace(signature.clone()) {
            self.destroyer.destroy_command_signature(self.fence_values.retire_values(), self.fence_values.completed_values(), old);
        }
        Ok(signature)
    }

    pub fn footprints(&self, info: &gpu::TextureInfo, first_subresource: u32, subresource_count: u32) -> (Vec<gpu::CopyableFootprint>, u64) {
        self.device.copyable_footprints(info, first_subresource, subresource_count)
    }

    pub(super) fn debug_name<'a>(&self, name: Option<&'a str>) -> Option<&'a str> {
        if self.settings.debug_names {
            name
        } else {
            None
        }
    }

    #[inline(always)]
    pub(super) fn fence_values(&self) -> &FenceValues {
        &self.fence_values
    }

    pub(super) fn retire_buffer(&self, buffer: B::Buffer) {
        self.destroyer.destroy_buffer(self.fence_values.retire_values(), self.fence_values.completed_values(), buffer);
    }

    pub(super) fn retire_texture(&self, texture: B::Texture) {
        self.destroyer.destroy_texture(self.fence_values.retire_values(), self.fence_values.completed_values(), texture);
    }

    pub(super) fn retire_sampler(&self, sampler: B::Sampler) {
        self.destroyer.destroy_sampler(self.fence_values.retire_values(), self.fence_values.completed_values(), sampler);
    }

    pub(super) fn retire_graphics_pipeline(&self, pipeline: B::GraphicsPipeline) {
        self.destroyer.destroy_graphics_pipeline(self.fence_values.retire_values(), self.fence_values.completed_values(), pipeline);
    }

    pub(super) fn retire_compute_pipeline(&self, pipeline: B::ComputePipeline) {
        self.destroyer.destroy_compute_pipeline(self.fence_values.retire_values(), self.fence_values.completed_values(), pipeline);
    }

    pub(super) fn count_barrier(&self) {
        self.stats.barriers.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn count_fallback_binding(&self) {
        self.stats.fallback_bindings.fetch_add(1, Ordering::Relaxed);
    }

    /// Native objects waiting for their last use on the GPU to finish.
    pub fn pending_destructions(&self) -> usize {
        self.destroyer.pending_count()
    }

    pub fn create_buffer(self: &Arc<Self>, desc: &BufferDesc, name: Option<&str>) -> Result<Handle<Buffer<B>>, DeviceError> {
        Ok(Handle::new(Buffer::new(self, desc, name)?))
    }

    pub fn create_texture(self: &Arc<Self>, info: &gpu::TextureInfo, name: Option<&str>) -> Result<Handle<Texture<B>>, DeviceError> {
        Ok(Handle::new(Texture::new(self, info, name)?))
    }

    pub fn create_texture_view(&self, texture: Option<&Handle<Texture<B>>>, info: &gpu::TextureViewInfo) -> Result<Handle<TextureView<B>>, DeviceError> {
        let Some(texture) = texture.and_then(|handle| handle.get()) else {
            log::error!("Texture views need a source texture");
            return Err(DeviceError::InvalidDescriptor("texture view without a source texture".to_string()));
        };
        Ok(Handle::new(TextureView::new(texture, info)?))
    }

    pub fn create_sampler(self: &Arc<Self>, info: &gpu::SamplerInfo) -> Result<Handle<Sampler<B>>, DeviceError> {
        Ok(Handle::new(Sampler::new(self, info)?))
    }

    pub fn create_shader_function(&self, desc: &ShaderFunctionDesc) -> Result<Handle<ShaderFunction<B>>, DeviceError> {
        Ok(Handle::new(ShaderFunction::new(self, desc)?))
    }

    pub fn create_shader_program(&self, functions: &[&Handle<ShaderFunction<B>>], name: Option<&str>) -> Result<Handle<ShaderProgram<B>>, DeviceError> {
        Ok(Handle::new(ShaderProgram::new(functions, name)?))
    }

    pub fn create_resource_bindings(&self, desc: &ResourceBindingsDesc<B>) -> Result<Handle<ResourceBindings<B>>, DeviceError> {
        Ok(Handle::new(ResourceBindings::new(desc)?))
    }

    pub fn create_graphics_pipeline(self: &Arc<Self>, desc: &GraphicsPipelineDesc<B>, name: Option<&str>) -> Result<Handle<GraphicsPipeline<B>>, DeviceError> {
        Ok(Handle::new(GraphicsPipeline::new(self, desc, name)?))
    }

    pub fn create_compute_pipeline(self: &Arc<Self>, program: &Handle<ShaderProgram<B>>, name: Option<&str>) -> Result<Handle<ComputePipeline<B>>, DeviceError> {
        Ok(Handle::new(ComputePipeline::new(self, program, name)?))
    }

    pub fn destroy_buffer(&self, handle: &mut Handle<Buffer<B>>) {
        handle.take();
    }

    pub fn destroy_texture(&self, handle: &mut Handle<Texture<B>>) {
        handle.take();
    }

    pub fn destroy_texture_view(&self, handle: &mut Handle<TextureView<B>>) {
        handle.take();
    }

    pub fn destroy_sampler(&self, handle: &mut Handle<Sampler<B>>) {
        handle.take();
    }

    pub fn destroy_shader_function(&self, handle: &mut Handle<ShaderFunction<B>>) {
        handle.take();
    }

    pub fn destroy_shader_program(&self, handle: &mut Handle<ShaderProgram<B>>) {
        handle.take();
    }

    pub fn destroy_resource_bindings(&self, handle: &mut Handle<ResourceBindings<B>>) {
        handle.take();
    }

    pub fn destroy_graphics_pipeline(&self, handle: &mut Handle<GraphicsPipeline<B>>) {
        handle.take();
    }

    pub fn destroy_compute_pipeline(&self, handle: &mut Handle<ComputePipeline<B>>) {
        handle.take();
    }

    pub fn create_graphics_encoder(self: &Arc<Self>, desc: &GraphicsEncoderDesc<B>) -> Result<GraphicsEncoder<B>, DeviceError> {
        GraphicsEncoder::new(self, desc)
    }

    pub fn create_compute_encoder(self: &Arc<Self>) -> ComputeEncoder<B> {
        ComputeEncoder::new(self)
    }

    pub fn create_blit_encoder(self: &Arc<Self>) -> BlitEncoder<B> {
        BlitEncoder::new(self)
    }
}

impl<B: GPUBackend> Drop for Device<B> {
    fn drop(&mut self) {
        if let Err(e) = self.wait_for_idle() {
            log::warn!("Failed to wait for the GPU before destroying the device: {}", e);
        }
        self.destroyer.drain();
    }
}
