use std::mem::ManuallyDrop;
use std::sync::Arc;

use kiln_core::gpu::{
    self,
    Buffer as _,
    BufferInfo,
    BufferTextureCopyRegion,
    BufferUsage,
    CommandBuffer as _,
    Device as _,
    GPUBackend,
    MemoryUsage,
    QueueType,
    ResourceState,
    SampleCount,
    TextureInfo,
    TextureSubresource,
    TextureViewInfo,
};
use parking_lot::Mutex;
use smallvec::SmallVec;

use super::*;

const TOP_MIP: TextureSubresource = TextureSubresource {
    array_layer: 0,
    mip_level: 0,
};

pub struct Texture<B: GPUBackend> {
    device: Arc<Device<B>>,
    texture: ManuallyDrop<B::Texture>,
    info: TextureInfo,
    state: ResourceStateTracker,
    /// Upload buffer and the epoch of the graphics list it was last copied from.
    upload: Mutex<Option<(B::Buffer, Option<u64>)>>,
    readback: Mutex<Option<B::Buffer>>,
    name: Option<String>,
}

impl<B: GPUBackend> Texture<B> {
    pub(super) fn new(device: &Arc<Device<B>>, info: &TextureInfo, name: Option<&str>) -> Result<Self, DeviceError> {
        if info.width == 0 || info.height == 0 || info.mip_levels == 0 || info.array_length == 0 {
            log::error!("Texture {:?} has a size of 0: {:?}", name, info);
            return Err(DeviceError::InvalidDescriptor(format!("texture {:?} has a size of 0", name)));
        }
        if info.samples != SampleCount::Samples1 && info.mip_levels != 1 {
            log::error!("Multisampled texture {:?} must have a single mip level", name);
            return Err(DeviceError::InvalidDescriptor(format!("multisampled texture {:?} has {} mip levels", name, info.mip_levels)));
        }

        let initial_state = initial_texture_state(info);
        let texture = unsafe { device.native().create_texture(info, initial_state, device.debug_name(name))? };
        Ok(Self {
            device: device.clone(),
            texture: ManuallyDrop::new(texture),
            info: *info,
            state: ResourceStateTracker::new(initial_state),
            upload: Mutex::new(None),
            readback: Mutex::new(None),
            name: name.map(|n| n.to_string()),
        })
    }

    #[inline(always)]
    pub fn handle(&self) -> &B::Texture {
        &self.texture
    }

    pub fn info(&self) -> &TextureInfo {
        &self.info
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn current_state(&self) -> ResourceState {
        self.state.current()
    }

    pub fn request_state(&self, list: &mut CommandListGuard<B>, new_state: ResourceState) -> bool {
        let texture = &*self.texture;
        let changed = self.state.request(new_state, |old_state, new_state| unsafe {
            list.command_buffer().barrier(&[gpu::Barrier::TextureBarrier {
                old_state,
                new_state,
                texture,
            }]);
        });
        if changed {
            self.device.count_barrier();
        }
        changed
    }

    fn create_staging(&self, size: u64, memory_usage: MemoryUsage) -> Result<B::Buffer, DeviceError> {
        let (usage, state, suffix) = match memory_usage {
            MemoryUsage::Readback => (BufferUsage::COPY_DST, ResourceState::COPY_DEST, "Readback"),
            _ => (BufferUsage::COPY_SRC, ResourceState::GENERIC_READ, "Upload"),
        };
        let info = BufferInfo {
            size,
            usage,
            memory_usage,
        };
        let name = self.name.as_ref().map(|name| format!("{}_{}", name, suffix));
        let buffer = unsafe { self.device.native().create_buffer(&info, state, self.device.debug_name(name.as_deref()))? };
        Ok(buffer)
    }

    /// Uploads tightly packed texel data. Subresources are consumed in order,
    /// all mip levels of the first layer first, for as long as `data` holds a complete one.
    pub fn update_data(&self, data: &[u8]) -> Result<bool, DeviceError> {
        let Some(mut list) = self.device.acquire(QueueType::Graphics, "Texture::update_data")? else {
            return Ok(false);
        };
        self.record_update(&mut list, data)
    }

    pub(super) fn record_update(&self, list: &mut CommandListGuard<B>, data: &[u8]) -> Result<bool, DeviceError> {
        if self.info.samples != SampleCount::Samples1 {
            log::warn!("Skipping upload into multisampled texture {:?}", self.name);
            return Ok(false);
        }

        let (footprints, total_size) = self.device.footprints(&self.info, 0, self.info.subresource_count());
        let mut subresources = SmallVec::<[(u32, usize); 16]>::new();
        let mut consumed = 0usize;
        for (index, footprint) in footprints.iter().enumerate() {
            let packed_size = footprint.row_size as usize * footprint.row_count as usize;
            if consumed + packed_size > data.len() {
                break;
            }
            subresources.push((index as u32, consumed));
            consumed += packed_size;
        }
        if subresources.is_empty() {
            log::warn!("Skipping upload into texture {:?}, {} bytes do not cover the top mip level", self.name, data.len());
            return Ok(false);
        }
        if consumed < data.len() {
            log::warn!("Ignoring {} trailing bytes of the upload into texture {:?}", data.len() - consumed, self.name);
        }

        let epoch = list.epoch();
        let mut upload = self.upload.lock();
        let reusable = upload.as_ref().map_or(true, |(_, last_epoch)| *last_epoch != Some(epoch));
        let (buffer, transient) = match upload.take() {
            Some((buffer, _)) if reusable => (buffer, false),
            existing => {
                *upload = existing;
                (self.create_staging(total_size, MemoryUsage::MappableUpload)?, !reusable)
            }
        };

        unsafe {
            let Some(ptr) = buffer.map(0, total_size, false) else {
                log::warn!("Failed to map the upload buffer of texture {:?}", self.name);
                if transient {
                    self.device.retire_buffer(buffer);
                } else {
                    *upload = Some((buffer, None));
                }
                return Ok(false);
            };
            let ptr = ptr as *mut u8;
            for (index, data_offset) in &subresources {
                let footprint = &footprints[*index as usize];
                for row in 0..footprint.row_count as usize {
                    let src = &data[data_offset + row * footprint.row_size as usize..][..footprint.row_size as usize];
                    let dst = ptr.add(footprint.offset as usize + row * footprint.row_pitch as usize);
                    std::ptr::copy_nonoverlapping(src.as_ptr(), dst, src.len());
                }
            }
            buffer.unmap(0, total_size, true);
        }

        self.request_state(list, ResourceState::COPY_DEST);
        for (index, _) in &subresources {
            let subresource = TextureSubresource {
                array_layer: index / self.info.mip_levels,
                mip_level: index % self.info.mip_levels,
            };
            let region = BufferTextureCopyRegion::from_footprint(&footprints[*index as usize], subresource);
            unsafe {
                list.command_buffer().copy_buffer_to_texture(&buffer, &self.texture, &region);
            }
        }

        if transient {
            self.device.retire_buffer(buffer);
        } else {
            *upload = Some((buffer, Some(epoch)));
        }
        Ok(true)
    }

    /// Size of the top mip level starting at `texel_offset` when tightly packed.
    pub fn readback_size(&self, texel_offset: [u32; 2]) -> usize {
        let (width, height) = self.info.mip_extent(0);
        let [x, y] = texel_offset;
        (width.saturating_sub(x) as usize) * (height.saturating_sub(y) as usize) * self.info.format.element_size() as usize
    }

    /// Reads the top mip level, starting at `texel_offset`, into `dst` at `dst_byte_offset` with tightly packed rows.
    /// Submits the graphics queue and waits for it. Returns the number of bytes written.
    pub fn readback_data(&self, texel_offset: [u32; 2], mip_level: u32, dst: &mut [u8], dst_byte_offset: usize) -> Result<usize, DeviceError> {
        if mip_level != 0 {
            log::warn!("Reading back mip level {} of texture {:?} is not supported, reading the top mip level instead", mip_level, self.name);
        }
        if self.info.samples != SampleCount::Samples1 {
            log::warn!("Skipping readback of multisampled texture {:?}", self.name);
            return Ok(0);
        }
        let (width, height) = self.info.mip_extent(0);
        let [x, y] = texel_offset;
        if x >= width || y >= height {
            log::warn!("Skipping readback of texture {:?}, texel offset {:?} is outside of {}x{}", self.name, texel_offset, width, height);
            return Ok(0);
        }

        if dst_byte_offset >= dst.len() {
            log::warn!("Skipping readback of texture {:?}, destination offset {} is outside of {} bytes", self.name, dst_byte_offset, dst.len());
            return Ok(0);
        }

        let (footprints, total_size) = self.device.footprints(&self.info, 0, 1);
        let Some(footprint) = footprints.first().copied() else {
            return Ok(0);
        };
        let extent = [width - x, height - y];
        let row_size = extent[0] as usize * self.info.format.element_size() as usize;

        let Some(mut list) = self.device.acquire(QueueType::Graphics, "Texture::readback_data")? else {
            return Ok(0);
        };
        let existing = self.readback.lock().take();
        let readback = match existing {
            Some(readback) => readback,
            None => self.create_staging(total_size, MemoryUsage::Readback)?,
        };

        self.request_state(&mut list, ResourceState::COPY_SOURCE);
        unsafe {
            list.command_buffer().copy_texture_to_buffer(&self.texture, &readback, &BufferTextureCopyRegion {
                buffer_offset: 0,
                buffer_row_pitch: footprint.row_pitch,
                texture_subresource: TOP_MIP,
                texture_offset: texel_offset,
                texture_extent: extent,
            });
        }
        let submitted = list.submit();

        let mut written = 0usize;
        if submitted.is_ok() {
            unsafe {
                if let Some(ptr) = readback.map(0, total_size, true) {
                    let src = std::slice::from_raw_parts(ptr as *const u8, total_size as usize);
                    for row in 0..extent[1] as usize {
                        let dst_range = row.checked_mul(row_size)
                            .and_then(|start| start.checked_add(dst_byte_offset))
                            .and_then(|start| Some(start..start.checked_add(row_size)?))
                            .filter(|range| range.end <= dst.len());
                        let Some(dst_range) = dst_range else {
                            log::warn!("Not enough room in buffer to copy the texture data");
                            break;
                        };
                        let src_start = row * footprint.row_pitch as usize;
                        dst[dst_range].copy_from_slice(&src[src_start..src_start + row_size]);
                        written += row_size;
                    }
                    readback.unmap(0, total_size, false);
                } else {
                    log::warn!("Failed to map the readback buffer of texture {:?}", self.name);
                }
            }
        }

        if let Some(previous) = self.readback.lock().replace(readback) {
            self.device.retire_buffer(previous);
        }
        submitted?;
        Ok(written)
    }

    /// Records a resolve of the multisampled `source` into this texture.
    pub fn resolve(&self, list: &mut CommandListGuard<B>, source: &Texture<B>) -> bool {
        if source.info.samples == SampleCount::Samples1 || self.info.samples != SampleCount::Samples1 {
            log::warn!("Skipping resolve of {:?} into {:?}, the source must be multisampled and the destination must not", source.name, self.name);
            return false;
        }
        if source.info.format != self.info.format || source.info.mip_extent(0) != self.info.mip_extent(0) {
            log::warn!("Skipping resolve of {:?} into {:?}, formats or sizes differ", source.name, self.name);
            return false;
        }

        source.request_state(list, ResourceState::RESOLVE_SOURCE);
        self.request_state(list, ResourceState::RESOLVE_DEST);
        unsafe {
            list.command_buffer().resolve_texture(&source.texture, &self.texture, TOP_MIP);
        }
        true
    }
}

impl<B: GPUBackend> Drop for Texture<B> {
    fn drop(&mut self) {
        let texture = unsafe { ManuallyDrop::take(&mut self.texture) };
        self.device.retire_texture(texture);
        if let Some((upload, _)) = self.upload.get_mut().take() {
            self.device.retire_buffer(upload);
        }
        if let Some(readback) = self.readback.get_mut().take() {
            self.device.retire_buffer(readback);
        }
    }
}

/// A range of a texture. Shares the tracked state of the texture it was created from.
pub struct TextureView<B: GPUBackend> {
    texture: Arc<Texture<B>>,
    info: TextureViewInfo,
}

impl<B: GPUBackend> TextureView<B> {
    pub(super) fn new(texture: &Arc<Texture<B>>, info: &TextureViewInfo) -> Result<Self, DeviceError> {
        let texture_info = texture.info();
        if info.mip_level_length == 0
            || info.array_layer_length == 0
            || info.base_mip_level.checked_add(info.mip_level_length).map_or(true, |end| end > texture_info.mip_levels)
            || info.base_array_layer.checked_add(info.array_layer_length).map_or(true, |end| end > texture_info.array_length) {
            log::error!("Texture view {:?} is outside of texture {:?}", info, texture.name());
            return Err(DeviceError::InvalidDescriptor(format!("texture view {:?} is outside of texture {:?}", info, texture.name())));
        }
        Ok(Self {
            texture: texture.clone(),
            info: *info,
        })
    }

    pub fn texture(&self) -> &Arc<Texture<B>> {
        &self.texture
    }

    pub fn info(&self) -> &TextureViewInfo {
        &self.info
    }

    pub fn current_state(&self) -> ResourceState {
        self.texture.current_state()
    }

    pub fn request_state(&self, list: &mut CommandListGuard<B>, new_state: ResourceState) -> bool {
        self.texture.request_state(list, new_state)
    }
}
