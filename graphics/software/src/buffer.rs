use std::ffi::c_void;
use std::sync::Arc;

use kiln_core::gpu;
use parking_lot::Mutex;

use super::memory::ResourceMemory;

pub type ResourceId = u64;

pub(crate) struct BufferInner {
    pub(crate) id: ResourceId,
    pub(crate) info: gpu::BufferInfo,
    pub(crate) memory: ResourceMemory,
    pub(crate) state: Mutex<gpu::ResourceState>,
    pub(crate) name: Option<String>,
}

/// A cheap handle to a software buffer. Clones refer to the same resource.
#[derive(Clone)]
pub struct SoftwareBuffer {
    pub(crate) inner: Arc<BufferInner>,
}

impl SoftwareBuffer {
    pub(crate) fn new(id: ResourceId, info: &gpu::BufferInfo, initial_state: gpu::ResourceState, name: Option<&str>) -> Self {
        Self {
            inner: Arc::new(BufferInner {
                id,
                info: info.clone(),
                memory: ResourceMemory::new(info.size as usize),
                state: Mutex::new(initial_state),
                name: name.map(|n| n.to_string()),
            }),
        }
    }

    pub fn id(&self) -> ResourceId {
        self.inner.id
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// The state the buffer is in as far as executed work is concerned.
    pub fn native_state(&self) -> gpu::ResourceState {
        *self.inner.state.lock()
    }

    /// Copies the current contents. Only meaningful once all work touching the buffer has completed.
    pub fn contents(&self) -> Vec<u8> {
        unsafe { self.inner.memory.read(0, self.inner.memory.len()).to_vec() }
    }
}

impl PartialEq for SoftwareBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for SoftwareBuffer {}

impl gpu::Buffer for SoftwareBuffer {
    fn info(&self) -> &gpu::BufferInfo {
        &self.inner.info
    }

    unsafe fn map(&self, offset: u64, length: u64, _invalidate: bool) -> Option<*mut c_void> {
        if self.inner.info.memory_usage == gpu::MemoryUsage::GPUMemory {
            log::error!("Tried to map buffer {:?} which lives in GPU memory", self.inner.name);
            return None;
        }
        if !self.inner.memory.contains(offset, length) {
            return None;
        }
        Some(self.inner.memory.as_mut_ptr().add(offset as usize) as *mut c_void)
    }

    unsafe fn unmap(&self, _offset: u64, _length: u64, _flush: bool) {}
}
