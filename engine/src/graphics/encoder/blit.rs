use std::sync::Arc;

use kiln_core::gpu::{GPUBackend, QueueType};
use parking_lot::Mutex;

use super::*;

/// Filled with the read back bytes when the encoder is submitted. Empty if the readback was skipped.
pub type ReadbackTarget = Arc<Mutex<Vec<u8>>>;

enum BlitOp<B: GPUBackend> {
    CopyBuffer { src: Arc<Buffer<B>>, dst: Arc<Buffer<B>>, size: u64, src_offset: u64, dst_offset: u64 },
    UpdateBuffer { buffer: Arc<Buffer<B>>, data: Vec<u8>, dst_offset: u64 },
    UpdateTexture { texture: Arc<Texture<B>>, data: Vec<u8> },
    FillBuffer { buffer: Arc<Buffer<B>>, offset: u64, length: u64, value: u8 },
    ReadbackBuffer { buffer: Arc<Buffer<B>>, offset: u64, size: u64, target: ReadbackTarget },
    ReadbackTexture { texture: Arc<Texture<B>>, texel_offset: [u32; 2], mip_level: u32, target: ReadbackTarget },
}

/// Records copies, uploads and readbacks. Everything runs on the graphics queue.
pub struct BlitEncoder<B: GPUBackend> {
    device: Arc<Device<B>>,
    ops: Vec<BlitOp<B>>,
}

impl<B: GPUBackend> BlitEncoder<B> {
    pub(in super::super) fn new(device: &Arc<Device<B>>) -> Self {
        Self {
            device: device.clone(),
            ops: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn copy_buffer(&mut self, src: &Handle<Buffer<B>>, dst: &Handle<Buffer<B>>, size: u64, src_offset: u64, dst_offset: u64) {
        let (Some(src), Some(dst)) = (live(src, "copy_buffer"), live(dst, "copy_buffer")) else {
            return;
        };
        self.ops.push(BlitOp::CopyBuffer { src, dst, size, src_offset, dst_offset });
    }

    pub fn update_buffer(&mut self, buffer: &Handle<Buffer<B>>, data: &[u8], dst_offset: u64) {
        if let Some(buffer) = live(buffer, "update_buffer") {
            self.ops.push(BlitOp::UpdateBuffer { buffer, data: data.to_vec(), dst_offset });
        }
    }

    /// `data` holds every subresource tightly packed, layer by layer.
    pub fn update_texture(&mut self, texture: &Handle<Texture<B>>, data: &[u8]) {
        if let Some(texture) = live(texture, "update_texture") {
            self.ops.push(BlitOp::UpdateTexture { texture, data: data.to_vec() });
        }
    }

    pub fn fill_buffer(&mut self, buffer: &Handle<Buffer<B>>, offset: u64, length: u64, value: u8) {
        if let Some(buffer) = live(buffer, "fill_buffer") {
            self.ops.push(BlitOp::FillBuffer { buffer, offset, length, value });
        }
    }

    pub fn readback_buffer(&mut self, buffer: &Handle<Buffer<B>>, offset: u64, size: u64) -> ReadbackTarget {
        let target = ReadbackTarget::default();
        if let Some(buffer) = live(buffer, "readback_buffer") {
            self.ops.push(BlitOp::ReadbackBuffer { buffer, offset, size, target: target.clone() });
        }
        target
    }

    pub fn readback_texture(&mut self, texture: &Handle<Texture<B>>, texel_offset: [u32; 2], mip_level: u32) -> ReadbackTarget {
        let target = ReadbackTarget::default();
        if let Some(texture) = live(texture, "readback_texture") {
            self.ops.push(BlitOp::ReadbackTexture { texture, texel_offset, mip_level, target: target.clone() });
        }
        target
    }

    /// Returns false without touching the queue if nothing was recorded.
    pub fn submit(self) -> Result<bool, DeviceError> {
        if self.ops.is_empty() {
            return Ok(false);
        }
        let BlitEncoder { device, ops } = self;
        let mut slot = ListSlot::new(&device, QueueType::Graphics, "blit encoder submission");
        let mut submitted = false;

        for op in ops {
            match op {
                BlitOp::CopyBuffer { src, dst, size, src_offset, dst_offset } => {
                    if let Some(list) = slot.get()? {
                        dst.record_copy_from(list, &src, size, src_offset, dst_offset);
                    }
                }
                BlitOp::UpdateBuffer { buffer, data, dst_offset } => {
                    if let Some(list) = slot.get()? {
                        buffer.record_update(list, &data, data.len() as u64, 0, dst_offset)?;
                    }
                }
                BlitOp::UpdateTexture { texture, data } => {
                    if let Some(list) = slot.get()? {
                        texture.record_update(list, &data)?;
                    }
                }
                BlitOp::FillBuffer { buffer, offset, length, value } => {
                    if let Some(list) = slot.get()? {
                        buffer.record_fill(list, offset, length, value);
                    }
                }
                BlitOp::ReadbackBuffer { buffer, offset, size, target } => {
                    if size == 0 || offset.checked_add(size).map_or(true, |end| end > buffer.size()) {
                        log::warn!("Skipping readback of {} bytes at {} of buffer {:?} with size {}", size, offset, buffer.name(), buffer.size());
                        continue;
                    }
                    submitted |= slot.submit()?;
                    let mut data = vec![0u8; size as usize];
                    if buffer.read_data(offset, &mut data)? {
                        submitted = true;
                        *target.lock() = data;
                    }
                }
                BlitOp::ReadbackTexture { texture, texel_offset, mip_level, target } => {
                    submitted |= slot.submit()?;
                    let mut data = vec![0u8; texture.readback_size(texel_offset)];
                    let written = texture.readback_data(texel_offset, mip_level, &mut data, 0)?;
                    if written != 0 {
                        submitted = true;
                        data.truncate(written);
                        *target.lock() = data;
                    }
                }
            }
        }
        submitted |= slot.submit()?;
        Ok(submitted)
    }
}
