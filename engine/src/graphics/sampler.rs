use std::{sync::Arc, mem::ManuallyDrop};

use kiln_core::gpu::{Device as _, GPUBackend, SamplerInfo};

use super::*;

pub struct Sampler<B: GPUBackend> {
    sampler: ManuallyDrop<B::Sampler>,
    info: SamplerInfo,
    device: Arc<Device<B>>,
}

impl<B: GPUBackend> Sampler<B> {
    pub(super) fn new(device: &Arc<Device<B>>, info: &SamplerInfo) -> Result<Self, DeviceError> {
        let sampler = unsafe { device.native().create_sampler(info)? };
        Ok(Self {
            sampler: ManuallyDrop::new(sampler),
            info: info.clone(),
            device: device.clone(),
        })
    }

    #[inline(always)]
    pub fn handle(&self) -> &B::Sampler {
        &self.sampler
    }

    pub fn info(&self) -> &SamplerInfo {
        &self.info
    }
}

impl<B: GPUBackend> Drop for Sampler<B> {
    fn drop(&mut self) {
        let sampler = unsafe { ManuallyDrop::take(&mut self.sampler) };
        self.device.retire_sampler(sampler);
    }
}
