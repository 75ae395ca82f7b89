use std::sync::atomic::{AtomicU64, Ordering};

use kiln_core::gpu::{
    self,
    CommandBuffer as _,
    CommandPool as _,
    Device as _,
    Fence as _,
    GPUBackend,
    Queue as _,
    QueueType,
};
use parking_lot::MutexGuard;

use super::*;

/// Recording state of the command list of one queue kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListState {
    Open,
    Closed,
}

/// Allocator, list and fence of one queue kind. Guarded by a mutex in the device.
pub(super) struct QueueContext<B: GPUBackend> {
    pub(super) queue_type: QueueType,
    queue: B::Queue,
    pool: B::CommandPool,
    list: B::CommandBuffer,
    fence: B::Fence,
    pub(super) fence_value: u64,
    pub(super) state: ListState,
    epoch: u64,
}

impl<B: GPUBackend> QueueContext<B> {
    pub(super) fn new(device: &B::Device, queue_type: QueueType, debug_names: bool) -> Result<Self, DeviceError> {
        let name = format!("{:?}CommandList", queue_type);
        let name = debug_names.then_some(name.as_str());
        unsafe {
            let queue = device.create_queue(queue_type)?;
            let mut pool = device.create_command_pool(queue_type)?;
            let list = device.create_command_buffer(&mut pool, queue_type, name)?;
            let fence = device.create_fence(0)?;
            Ok(Self {
                queue_type,
                queue,
                pool,
                list,
                fence,
                fence_value: 0,
                state: ListState::Open,
                epoch: 0,
            })
        }
    }

    /// Resets the allocator and reopens the list. Leaves the list closed if either step fails.
    fn reopen(&mut self) -> Result<(), gpu::NativeError> {
        debug_assert_eq!(self.state, ListState::Closed);
        unsafe {
            self.pool.reset()?;
            self.list.reset(&mut self.pool)?;
        }
        self.state = ListState::Open;
        self.epoch += 1;
        log::trace!("Reopened {:?} command list, epoch {}", self.queue_type, self.epoch);
        Ok(())
    }

    /// Closes, executes and fences the list, then blocks until the GPU is done with it.
    pub(super) fn submit(&mut self) -> Result<bool, DeviceError> {
        if self.state == ListState::Closed {
            return Ok(false);
        }

        self.state = ListState::Closed;
        unsafe {
            self.list.close()?;
            self.queue.execute(&[&self.list])?;
        }
        self.fence_value += 1;
        log::trace!("Submitted {:?} command list, fence value {}", self.queue_type, self.fence_value);
        unsafe {
            self.queue.signal(&self.fence, self.fence_value)?;
        }
        self.wait()?;
        Ok(true)
    }

    pub(super) fn wait(&self) -> Result<(), DeviceError> {
        let completed = unsafe {
            self.fence.await_value(self.fence_value);
            self.fence.value()
        };
        if completed == gpu::DEVICE_REMOVED_FENCE_VALUE {
            return Err(DeviceError::DeviceLost);
        }
        Ok(())
    }
}

/// Fence values the device has handed out, readable without taking any queue lock.
pub(super) struct FenceValues {
    pending: [AtomicU64; 3],
    completed: [AtomicU64; 3],
}

impl FenceValues {
    pub(super) fn new() -> Self {
        Self {
            pending: Default::default(),
            completed: Default::default(),
        }
    }

    /// Work was recorded into the open list, which will signal `value` once submitted.
    fn mark_pending(&self, queue_type: QueueType, value: u64) {
        self.pending[queue_type.index()].fetch_max(value, Ordering::AcqRel);
    }

    pub(super) fn mark_completed(&self, queue_type: QueueType, value: u64) {
        self.completed[queue_type.index()].fetch_max(value, Ordering::AcqRel);
        self.pending[queue_type.index()].fetch_max(value, Ordering::AcqRel);
    }

    /// The values that must complete before a resource that is destroyed right now may be freed.
    pub(super) fn retire_values(&self) -> RetireValues {
        [
            self.pending[0].load(Ordering::Acquire),
            self.pending[1].load(Ordering::Acquire),
            self.pending[2].load(Ordering::Acquire),
        ]
    }

    pub(super) fn completed_values(&self) -> RetireValues {
        [
            self.completed[0].load(Ordering::Acquire),
            self.completed[1].load(Ordering::Acquire),
            self.completed[2].load(Ordering::Acquire),
        ]
    }

    pub(super) fn completed(&self, queue_type: QueueType) -> u64 {
        self.completed[queue_type.index()].load(Ordering::Acquire)
    }

    /// Commands were recorded into the open list of that queue since its last submission.
    pub(super) fn has_pending(&self, queue_type: QueueType) -> bool {
        self.pending[queue_type.index()].load(Ordering::Acquire) > self.completed(queue_type)
    }
}

/// Exclusive access to the open command list of one queue kind.
/// Only one guard per queue kind can exist at a time.
pub struct CommandListGuard<'a, B: GPUBackend> {
    device: &'a Device<B>,
    context: MutexGuard<'a, QueueContext<B>>,
}

impl<'a, B: GPUBackend> CommandListGuard<'a, B> {
    pub(super) fn acquire(device: &'a Device<B>, mut context: MutexGuard<'a, QueueContext<B>>) -> Result<Self, DeviceError> {
        if context.state == ListState::Closed {
            context.reopen()?;
        }
        Ok(Self {
            device,
            context,
        })
    }

    pub fn queue_type(&self) -> QueueType {
        self.context.queue_type
    }

    /// Counts how often the list was reopened. Work recorded under the same epoch shares one submission.
    pub fn epoch(&self) -> u64 {
        self.context.epoch
    }

    pub fn command_buffer(&mut self) -> &mut B::CommandBuffer {
        let next_value = self.context.fence_value + 1;
        self.device.fence_values().mark_pending(self.context.queue_type, next_value);
        &mut self.context.list
    }

    /// Submits the list and waits for it. Returns false if the list was already closed.
    pub fn submit(self) -> Result<bool, DeviceError> {
        self.device.finish_submission(self.context)
    }
}
