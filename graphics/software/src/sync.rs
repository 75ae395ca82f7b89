use std::sync::Arc;

use kiln_core::gpu;
use parking_lot::{Condvar, Mutex};

use super::*;

pub(crate) struct FenceInner {
    value: Mutex<u64>,
    condvar: Condvar,
}

impl FenceInner {
    pub(crate) fn signal(&self, value: u64) {
        let mut guard = self.value.lock();
        if value > *guard {
            *guard = value;
        }
        self.condvar.notify_all();
    }

    pub(crate) fn wake(&self) {
        let _guard = self.value.lock();
        self.condvar.notify_all();
    }
}

pub struct SoftwareFence {
    pub(crate) inner: Arc<FenceInner>,
    shared: Arc<DeviceShared>,
}

impl SoftwareFence {
    pub(crate) fn new(shared: &Arc<DeviceShared>, initial_value: u64) -> Self {
        let inner = Arc::new(FenceInner {
            value: Mutex::new(initial_value),
            condvar: Condvar::new(),
        });
        shared.register_fence(&inner);
        Self {
            inner,
            shared: shared.clone(),
        }
    }
}

impl gpu::Fence for SoftwareFence {
    unsafe fn value(&self) -> u64 {
        if self.shared.is_removed() {
            return gpu::DEVICE_REMOVED_FENCE_VALUE;
        }
        *self.inner.value.lock()
    }

    unsafe fn await_value(&self, value: u64) {
        let mut guard = self.inner.value.lock();
        while *guard < value && !self.shared.is_removed() {
            self.inner.condvar.wait(&mut guard);
        }
    }
}
