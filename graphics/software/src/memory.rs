use std::cell::UnsafeCell;

/// Backing storage of a software resource.
///
/// The GPU does not synchronize access to resource memory either. Reads and writes are only
/// well defined when the caller orders them with fences, exactly like mapped native memory.
pub(crate) struct ResourceMemory {
    data: UnsafeCell<Box<[u8]>>,
}

unsafe impl Send for ResourceMemory {}
unsafe impl Sync for ResourceMemory {}

impl ResourceMemory {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            data: UnsafeCell::new(vec![0u8; size].into_boxed_slice()),
        }
    }

    pub(crate) fn len(&self) -> usize {
        unsafe { (&*self.data.get()).len() }
    }

    pub(crate) fn as_mut_ptr(&self) -> *mut u8 {
        unsafe { (&mut *self.data.get()).as_mut_ptr() }
    }

    /// Caller must guarantee that nothing writes the range concurrently.
    pub(crate) unsafe fn read(&self, offset: usize, len: usize) -> &[u8] {
        &(&*self.data.get())[offset..offset + len]
    }

    /// Caller must guarantee exclusive access to the range.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn write(&self, offset: usize, len: usize) -> &mut [u8] {
        &mut (&mut *self.data.get())[offset..offset + len]
    }

    pub(crate) fn contains(&self, offset: u64, len: u64) -> bool {
        offset.checked_add(len).map_or(false, |end| end <= self.len() as u64)
    }
}
