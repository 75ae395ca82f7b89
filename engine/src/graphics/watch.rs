use std::sync::{Arc, Weak};

use kiln_core::gpu::{GPUBackend, QueueType};

use super::*;

/// Runs after every real submission of a device.
pub trait SubmitHook: Send + Sync {
    fn after_submit(&self, queue_type: QueueType) -> Result<(), DeviceError>;
}

/// Reads back a buffer after every submission on one queue and hands the bytes to a callback.
pub struct BufferWatch<B: GPUBackend> {
    buffer: Weak<Buffer<B>>,
    queue_type: QueueType,
    callback: Box<dyn Fn(&[u8]) + Send + Sync>,
}

impl<B: GPUBackend> BufferWatch<B> {
    pub fn new<F>(buffer: &Handle<Buffer<B>>, queue_type: QueueType, callback: F) -> Result<Self, HandleError>
        where F: Fn(&[u8]) + Send + Sync + 'static {
        Ok(Self {
            buffer: Arc::downgrade(buffer.resource()?),
            queue_type,
            callback: Box::new(callback),
        })
    }

    /// Installs the watch on the device the buffer belongs to.
    pub fn install(self) -> Option<Arc<Self>> {
        let buffer = self.buffer.upgrade()?;
        let watch = Arc::new(self);
        buffer.device().set_submit_hook(Some(watch.clone()));
        Some(watch)
    }
}

impl<B: GPUBackend> SubmitHook for BufferWatch<B> {
    fn after_submit(&self, queue_type: QueueType) -> Result<(), DeviceError> {
        if queue_type != self.queue_type {
            return Ok(());
        }
        let Some(buffer) = self.buffer.upgrade() else {
            return Ok(());
        };
        let mut data = vec![0u8; buffer.size() as usize];
        if buffer.read_data(0, &mut data)? {
            (self.callback)(&data);
        }
        Ok(())
    }
}
