use std::sync::Arc;

use kiln_core::gpu::GPUBackend;
use parking_lot::Mutex;

/// Per queue fence values that must have completed before a native object may be freed.
pub(super) type RetireValues = [u64; 3];

fn is_retired(retire: &RetireValues, completed: &RetireValues) -> bool {
    retire.iter().zip(completed.iter()).all(|(retire, completed)| completed >= retire)
}

/// Keeps native objects alive until every command list that may reference them has finished.
pub(super) struct DeferredDestroyer<B: GPUBackend> {
    inner: Mutex<DeferredDestroyerInner<B>>,
}

struct DeferredDestroyerInner<B: GPUBackend> {
    buffers: Vec<(RetireValues, B::Buffer)>,
    textures: Vec<(RetireValues, B::Texture)>,
    samplers: Vec<(RetireValues, B::Sampler)>,
    graphics_pipelines: Vec<(RetireValues, B::GraphicsPipeline)>,
    compute_pipelines: Vec<(RetireValues, B::ComputePipeline)>,
    command_signatures: Vec<(RetireValues, Arc<B::CommandSignature>)>,
}

impl<B: GPUBackend> DeferredDestroyer<B> {
    pub(super) fn new() -> Self {
        Self {
            inner: Mutex::new(DeferredDestroyerInner {
                buffers: Vec::new(),
                textures: Vec::new(),
                samplers: Vec::new(),
                graphics_pipelines: Vec::new(),
                compute_pipelines: Vec::new(),
                command_signatures: Vec::new(),
            }),
        }
    }

    pub(super) fn destroy_buffer(&self, retire: RetireValues, completed: RetireValues, buffer: B::Buffer) {
        if !is_retired(&retire, &completed) {
            self.inner.lock().buffers.push((retire, buffer));
        }
    }

    pub(super) fn destroy_texture(&self, retire: RetireValues, completed: RetireValues, texture: B::Texture) {
        if !is_retired(&retire, &completed) {
            self.inner.lock().textures.push((retire, texture));
        }
    }

    pub(super) fn destroy_sampler(&self, retire: RetireValues, completed: RetireValues, sampler: B::Sampler) {
        if !is_retired(&retire, &completed) {
            self.inner.lock().samplers.push((retire, sampler));
        }
    }

    pub(super) fn destroy_graphics_pipeline(&self, retire: RetireValues, completed: RetireValues, pipeline: B::GraphicsPipeline) {
        if !is_retired(&retire, &completed) {
            self.inner.lock().graphics_pipelines.push((retire, pipeline));
        }
    }

    pub(super) fn destroy_compute_pipeline(&self, retire: RetireValues, completed: RetireValues, pipeline: B::ComputePipeline) {
        if !is_retired(&retire, &completed) {
            self.inner.lock().compute_pipelines.push((retire, pipeline));
        }
    }

    pub(super) fn destroy_command_signature(&self, retire: RetireValues, completed: RetireValues, signature: Arc<B::CommandSignature>) {
        if !is_retired(&retire, &completed) {
            self.inner.lock().command_signatures.push((retire, signature));
        }
    }

    /// Frees everything whose work has completed.
    pub(super) fn collect(&self, completed: RetireValues) {
        let mut guard = self.inner.lock();
        guard.buffers.retain(|(retire, _)| !is_retired(retire, &completed));
        guard.textures.retain(|(retire, _)| !is_retired(retire, &completed));
        guard.samplers.retain(|(retire, _)| !is_retired(retire, &completed));
        guard.graphics_pipelines.retain(|(retire, _)| !is_retired(retire, &completed));
        guard.compute_pipelines.retain(|(retire, _)| !is_retired(retire, &completed));
        guard.command_signatures.retain(|(retire, _)| !is_retired(retire, &completed));
    }

    pub(super) fn pending_count(&self) -> usize {
        let guard = self.inner.lock();
        guard.buffers.len()
            + guard.textures.len()
            + guard.samplers.len()
            + guard.graphics_pipelines.len()
            + guard.compute_pipelines.len()
            + guard.command_signatures.len()
    }

    /// Frees everything. Only valid once the device is idle.
    pub(super) fn drain(&self) {
        self.collect([u64::MAX; 3]);
    }
}

#[cfg(test)]
mod test {
    use super::is_retired;

    #[test]
    fn retirement_needs_every_queue() {
        assert!(is_retired(&[1, 0, 0], &[1, 0, 0]));
        assert!(is_retired(&[1, 2, 0], &[3, 2, 5]));
        assert!(!is_retired(&[1, 2, 0], &[3, 1, 5]));
    }
}
