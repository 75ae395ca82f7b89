use std::mem::ManuallyDrop;
use std::sync::Arc;

use kiln_core::gpu::{
    self,
    Buffer as _,
    BufferCopyRegion,
    BufferInfo,
    BufferUsage,
    CommandBuffer as _,
    Device as _,
    GPUBackend,
    MemoryUsage,
    QueueType,
    ResourceState,
};
use parking_lot::Mutex;

use super::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDesc {
    pub size: u64,
    pub usage: BufferUsage,
}

struct UploadBuffer<B: GPUBackend> {
    buffer: B::Buffer,
    /// Epoch of the graphics list the upload buffer was last copied from.
    last_epoch: Option<u64>,
}

/// A buffer in GPU memory with a tracked resource state.
pub struct Buffer<B: GPUBackend> {
    device: Arc<Device<B>>,
    buffer: ManuallyDrop<B::Buffer>,
    info: BufferInfo,
    state: ResourceStateTracker,
    upload: Mutex<Option<UploadBuffer<B>>>,
    readback: Mutex<Option<B::Buffer>>,
    name: Option<String>,
}

impl<B: GPUBackend> Buffer<B> {
    pub(super) fn new(device: &Arc<Device<B>>, desc: &BufferDesc, name: Option<&str>) -> Result<Self, DeviceError> {
        if desc.size == 0 {
            log::error!("Buffer {:?} has a size of 0", name);
            return Err(DeviceError::InvalidDescriptor(format!("buffer {:?} has a size of 0", name)));
        }
        let info = BufferInfo {
            size: desc.size,
            usage: desc.usage | BufferUsage::COPY_SRC | BufferUsage::COPY_DST,
            memory_usage: MemoryUsage::GPUMemory,
        };
        let initial_state = initial_buffer_state(&info);
        let buffer = unsafe { device.native().create_buffer(&info, initial_state, device.debug_name(name))? };
        Ok(Self {
            device: device.clone(),
            buffer: ManuallyDrop::new(buffer),
            info,
            state: ResourceStateTracker::new(initial_state),
            upload: Mutex::new(None),
            readback: Mutex::new(None),
            name: name.map(|n| n.to_string()),
        })
    }

    #[inline(always)]
    pub fn handle(&self) -> &B::Buffer {
        &self.buffer
    }

    pub fn info(&self) -> &BufferInfo {
        &self.info
    }

    pub fn size(&self) -> u64 {
        self.info.size
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn device(&self) -> &Arc<Device<B>> {
        &self.device
    }

    /// The state as of the last barrier recorded for this buffer.
    pub fn current_state(&self) -> ResourceState {
        self.state.current()
    }

    /// Records a transition into `new_state` on `list` unless the buffer is already in it.
    pub fn request_state(&self, list: &mut CommandListGuard<B>, new_state: ResourceState) -> bool {
        let buffer = &*self.buffer;
        let changed = self.state.request(new_state, |old_state, new_state| unsafe {
            list.command_buffer().barrier(&[gpu::Barrier::BufferBarrier {
                old_state,
                new_state,
                buffer,
            }]);
        });
        if changed {
            self.device.count_barrier();
        }
        changed
    }

    fn create_staging(&self, memory_usage: MemoryUsage) -> Result<B::Buffer, DeviceError> {
        let (usage, state, suffix) = match memory_usage {
            MemoryUsage::Readback => (BufferUsage::COPY_DST, ResourceState::COPY_DEST, "Readback"),
            _ => (BufferUsage::COPY_SRC, ResourceState::GENERIC_READ, "Upload"),
        };
        let info = BufferInfo {
            size: self.info.size,
            usage,
            memory_usage,
        };
        let name = self.name.as_ref().map(|name| format!("{}_{}", name, suffix));
        let buffer = unsafe { self.device.native().create_buffer(&info, state, self.device.debug_name(name.as_deref()))? };
        Ok(buffer)
    }

    /// Copies `size` bytes starting at `src_offset` of `data` into the buffer at `dst_offset`.
    /// The copy is recorded into the open graphics list and runs with its next submission.
    pub fn update_data(&self, data: &[u8], size: u64, src_offset: u64, dst_offset: u64) -> Result<bool, DeviceError> {
        let Some(mut list) = self.device.acquire(QueueType::Graphics, "Buffer::update_data")? else {
            return Ok(false);
        };
        self.record_update(&mut list, data, size, src_offset, dst_offset)
    }

    pub(super) fn record_update(&self, list: &mut CommandListGuard<B>, data: &[u8], size: u64, src_offset: u64, dst_offset: u64) -> Result<bool, DeviceError> {
        let src_in_range = src_offset.checked_add(size).is_some_and(|end| end <= data.len() as u64);
        let dst_in_range = dst_offset.checked_add(size).is_some_and(|end| end <= self.info.size);
        if size == 0 || !src_in_range || !dst_in_range {
            log::warn!("Skipping update of buffer {:?}: {} bytes from offset {} of {} to offset {} of {}",
                self.name, size, src_offset, data.len(), dst_offset, self.info.size);
            return Ok(false);
        }
        let data = &data[src_offset as usize..(src_offset + size) as usize];

        let epoch = list.epoch();
        let mut upload = self.upload.lock();
        if upload.as_ref().is_some_and(|upload| upload.last_epoch == Some(epoch)) {
            // The upload buffer is still read by a copy that was recorded into this list.
            let transient = self.create_staging(MemoryUsage::MappableUpload)?;
            let recorded = self.copy_from_upload(list, &transient, data, dst_offset);
            self.device.retire_buffer(transient);
            return Ok(recorded);
        }

        let buffer = match upload.take() {
            Some(upload) => upload.buffer,
            None => self.create_staging(MemoryUsage::MappableUpload)?,
        };
        let recorded = self.copy_from_upload(list, &buffer, data, dst_offset);
        *upload = Some(UploadBuffer {
            buffer,
            last_epoch: recorded.then_some(epoch),
        });
        Ok(recorded)
    }

    fn copy_from_upload(&self, list: &mut CommandListGuard<B>, upload: &B::Buffer, data: &[u8], dst_offset: u64) -> bool {
        let size = data.len() as u64;
        unsafe {
            let Some(ptr) = upload.map(dst_offset, size, false) else {
                log::warn!("Failed to map the upload buffer of {:?}", self.name);
                return false;
            };
            std::ptr::copy_nonoverlapping(data.as_ptr(), ptr as *mut u8, data.len());
            upload.unmap(dst_offset, size, true);
        }
        self.request_state(list, ResourceState::COPY_DEST);
        unsafe {
            list.command_buffer().copy_buffer(upload, &self.buffer, &BufferCopyRegion {
                src_offset: dst_offset,
                dst_offset,
                size,
            });
        }
        true
    }

    /// GPU side copy from `other` into this buffer. Recorded into the open graphics list.
    pub fn update_from_buffer(&self, other: &Buffer<B>, size: u64, src_offset: u64, dst_offset: u64) -> Result<bool, DeviceError> {
        let Some(mut list) = self.device.acquire(QueueType::Graphics, "Buffer::update_from_buffer")? else {
            return Ok(false);
        };
        Ok(self.record_copy_from(&mut list, other, size, src_offset, dst_offset))
    }

    pub(super) fn record_copy_from(&self, list: &mut CommandListGuard<B>, other: &Buffer<B>, size: u64, src_offset: u64, dst_offset: u64) -> bool {
        if !Arc::ptr_eq(&self.device, &other.device) {
            log::warn!("Skipping copy from buffer {:?} into {:?}, they belong to different devices", other.name, self.name);
            return false;
        }
        if std::ptr::eq(self, other) {
            log::warn!("Skipping copy of buffer {:?} into itself", self.name);
            return false;
        }
        let src_in_range = src_offset.checked_add(size).is_some_and(|end| end <= other.info.size);
        let dst_in_range = dst_offset.checked_add(size).is_some_and(|end| end <= self.info.size);
        if size == 0 || !src_in_range || !dst_in_range {
            log::warn!("Skipping copy of {} bytes from buffer {:?} at {} into buffer {:?} at {}",
                size, other.name, src_offset, self.name, dst_offset);
            return false;
        }

        other.request_state(list, ResourceState::COPY_SOURCE);
        self.request_state(list, ResourceState::COPY_DEST);
        unsafe {
            list.command_buffer().copy_buffer(&other.buffer, &self.buffer, &BufferCopyRegion {
                src_offset,
                dst_offset,
                size,
            });
        }
        true
    }

    pub(super) fn record_fill(&self, list: &mut CommandListGuard<B>, offset: u64, length: u64, value: u8) -> bool {
        if length == 0 || offset.checked_add(length).map_or(true, |end| end > self.info.size) {
            log::warn!("Skipping fill of {} bytes at {} of buffer {:?}", length, offset, self.name);
            return false;
        }
        self.request_state(list, ResourceState::COPY_DEST);
        unsafe {
            list.command_buffer().fill_buffer(&self.buffer, offset, length, value);
        }
        true
    }

    /// Reads `dst.len()` bytes starting at `offset`. Submits the graphics queue and waits for it.
    pub fn read_data(&self, offset: u64, dst: &mut [u8]) -> Result<bool, DeviceError> {
        let size = dst.len() as u64;
        if size == 0 || offset.checked_add(size).map_or(true, |end| end > self.info.size) {
            log::warn!("Skipping read of {} bytes at {} of buffer {:?} with size {}", size, offset, self.name, self.info.size);
            return Ok(false);
        }
        let Some(mut list) = self.device.acquire(QueueType::Graphics, "Buffer::read_data")? else {
            return Ok(false);
        };

        // Taken out for the duration of the submission, submit hooks may read this buffer too.
        let existing = self.readback.lock().take();
        let readback = match existing {
            Some(readback) => readback,
            None => self.create_staging(MemoryUsage::Readback)?,
        };

        self.request_state(&mut list, ResourceState::COPY_SOURCE);
        unsafe {
            list.command_buffer().copy_buffer(&self.buffer, &readback, &BufferCopyRegion {
                src_offset: offset,
                dst_offset: offset,
                size,
            });
        }
        let submitted = list.submit();

        let mut copied = false;
        if submitted.is_ok() {
            unsafe {
                if let Some(ptr) = readback.map(offset, size, true) {
                    std::ptr::copy_nonoverlapping(ptr as *const u8, dst.as_mut_ptr(), dst.len());
                    readback.unmap(offset, size, false);
                    copied = true;
                } else {
                    log::warn!("Failed to map the readback buffer of {:?}", self.name);
                }
            }
        }

        if let Some(previous) = self.readback.lock().replace(readback) {
            self.device.retire_buffer(previous);
        }
        submitted?;
        Ok(copied)
    }
}

impl<B: GPUBackend> Drop for Buffer<B> {
    fn drop(&mut self) {
        let buffer = unsafe { ManuallyDrop::take(&mut self.buffer) };
        self.device.retire_buffer(buffer);
        if let Some(upload) = self.upload.get_mut().take() {
            self.device.retire_buffer(upload.buffer);
        }
        if let Some(readback) = self.readback.get_mut().take() {
            self.device.retire_buffer(readback);
        }
    }
}
