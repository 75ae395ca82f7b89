use std::sync::Arc;

use kiln_core::gpu::{
    BindPoint,
    CommandBuffer as _,
    GPUBackend,
    QueueType,
};

use super::*;

enum ComputeOp<B: GPUBackend> {
    BindPipeline(Arc<ComputePipeline<B>>),
    BindResources(Arc<ResourceBindings<B>>),
    SetConstantValues(Vec<u8>),
    Dispatch([u32; 3]),
}

/// Records dispatches for the compute queue.
///
/// Compute lists can not record most transitions, so constant uploads and binding transitions
/// go through the graphics queue. Dispatches recorded so far are submitted before that happens.
pub struct ComputeEncoder<B: GPUBackend> {
    device: Arc<Device<B>>,
    ops: Vec<ComputeOp<B>>,
}

impl<B: GPUBackend> ComputeEncoder<B> {
    pub(in super::super) fn new(device: &Arc<Device<B>>) -> Self {
        Self {
            device: device.clone(),
            ops: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn bind_pipeline(&mut self, pipeline: &Handle<ComputePipeline<B>>) {
        if let Some(pipeline) = live(pipeline, "bind_pipeline") {
            self.ops.push(ComputeOp::BindPipeline(pipeline));
        }
    }

    pub fn bind_resources(&mut self, bindings: &Handle<ResourceBindings<B>>) {
        if let Some(bindings) = live(bindings, "bind_resources") {
            self.ops.push(ComputeOp::BindResources(bindings));
        }
    }

    pub fn set_constant_values(&mut self, data: &[u8]) {
        self.ops.push(ComputeOp::SetConstantValues(data.to_vec()));
    }

    pub fn dispatch(&mut self, group_count_x: u32, group_count_y: u32, group_count_z: u32) {
        self.ops.push(ComputeOp::Dispatch([group_count_x, group_count_y, group_count_z]));
    }

    /// Returns false without touching a queue if nothing was recorded.
    pub fn submit(self) -> Result<bool, DeviceError> {
        if self.ops.is_empty() {
            return Ok(false);
        }
        let ComputeEncoder { device, ops } = self;
        let submit_each_draw = device.settings().submit_each_draw;
        // Transitions already recorded on the graphics list have to land before any dispatch runs.
        let mut submitted = false;
        if device.fence_values().has_pending(QueueType::Graphics) {
            submitted |= device.submit_command_list(QueueType::Graphics)?;
        }
        let mut compute = ListSlot::new(&device, QueueType::Compute, "compute encoder submission");

        let mut pipeline: Option<Arc<ComputePipeline<B>>> = None;
        let mut bindings: Option<Arc<ResourceBindings<B>>> = None;
        let mut constants: Option<Constants<B>> = None;
        for op in ops {
            let group_count = match op {
                ComputeOp::BindPipeline(bound) => {
                    pipeline = Some(bound);
                    continue;
                }
                ComputeOp::BindResources(bound) => {
                    bindings = Some(bound);
                    continue;
                }
                ComputeOp::SetConstantValues(data) => {
                    constants = Some(Constants::Pending(data));
                    continue;
                }
                ComputeOp::Dispatch(group_count) => group_count,
            };

            let Some(pipeline) = pipeline.as_ref() else {
                log::warn!("Skipping dispatch without a pipeline");
                continue;
            };
            let Some(reflection) = pipeline.program().reflection() else {
                log::warn!("Skipping dispatch, the program of pipeline {:?} has no reflection", pipeline.name());
                continue;
            };

            let mut graphics = ListSlot::new(&device, QueueType::Graphics, "compute resource preparation");
            if matches!(constants, Some(Constants::Pending(_))) {
                submitted |= compute.submit()?;
                if let Some(list) = graphics.get()? {
                    upload_constants(&device, list, &mut constants)?;
                }
            }
            let resolved = resolve_bindings(&device, reflection, bindings.as_deref(), constants.as_ref(), "dispatch");
            if let Some(resolved) = &resolved {
                if needs_transitions(resolved, BindPoint::Compute) {
                    if !graphics.is_held() {
                        submitted |= compute.submit()?;
                    }
                    // The dispatch must not run with its resources in the wrong state.
                    let Some(list) = graphics.get()? else {
                        continue;
                    };
                    transition_bindings(list, resolved, BindPoint::Compute);
                }
            }
            submitted |= graphics.submit()?;
            let Some(resolved) = resolved else {
                continue;
            };

            let Some(list) = compute.get()? else {
                continue;
            };
            unsafe {
                list.command_buffer().set_compute_pipeline(pipeline.handle());
            }
            bind_resolved(list, &resolved, BindPoint::Compute);
            let [x, y, z] = group_count;
            unsafe {
                list.command_buffer().dispatch(x, y, z);
            }
            if submit_each_draw {
                submitted |= compute.submit()?;
            }
        }
        submitted |= compute.submit()?;
        Ok(submitted)
    }
}
