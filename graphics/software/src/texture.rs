use std::sync::Arc;

use kiln_core::gpu;
use parking_lot::Mutex;

use super::memory::ResourceMemory;
use super::*;

pub(crate) struct TextureInner {
    pub(crate) id: ResourceId,
    pub(crate) info: gpu::TextureInfo,
    pub(crate) memory: ResourceMemory,
    /// Byte offset of every subresource. Texels are tightly packed, samples of one texel are adjacent.
    pub(crate) subresource_offsets: Vec<usize>,
    pub(crate) state: Mutex<gpu::ResourceState>,
    pub(crate) name: Option<String>,
}

#[derive(Clone)]
pub struct SoftwareTexture {
    pub(crate) inner: Arc<TextureInner>,
}

impl SoftwareTexture {
    pub(crate) fn new(id: ResourceId, info: &gpu::TextureInfo, initial_state: gpu::ResourceState, name: Option<&str>) -> Self {
        let mut subresource_offsets = Vec::with_capacity(info.subresource_count() as usize);
        let mut size = 0usize;
        for _array_layer in 0..info.array_length {
            for mip_level in 0..info.mip_levels {
                subresource_offsets.push(size);
                size += Self::subresource_size(info, mip_level);
            }
        }
        Self {
            inner: Arc::new(TextureInner {
                id,
                info: *info,
                memory: ResourceMemory::new(size),
                subresource_offsets,
                state: Mutex::new(initial_state),
                name: name.map(|n| n.to_string()),
            }),
        }
    }

    fn subresource_size(info: &gpu::TextureInfo, mip_level: u32) -> usize {
        let (width, height) = info.mip_extent(mip_level);
        width as usize * height as usize * info.format.element_size() as usize * info.samples.count() as usize
    }

    pub(crate) fn texel_size(&self) -> usize {
        self.inner.info.format.element_size() as usize * self.inner.info.samples.count() as usize
    }

    /// Offset of the texel at (x, y) within the memory, if the subresource exists.
    pub(crate) fn texel_offset(&self, subresource: &gpu::TextureSubresource, x: u32, y: u32) -> Option<usize> {
        if subresource.mip_level >= self.inner.info.mip_levels || subresource.array_layer >= self.inner.info.array_length {
            return None;
        }
        let (width, height) = self.inner.info.mip_extent(subresource.mip_level);
        if x >= width || y >= height {
            return None;
        }
        let base = self.inner.subresource_offsets[subresource.index(&self.inner.info) as usize];
        Some(base + (y as usize * width as usize + x as usize) * self.texel_size())
    }

    pub fn id(&self) -> ResourceId {
        self.inner.id
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    pub fn native_state(&self) -> gpu::ResourceState {
        *self.inner.state.lock()
    }

    /// Tightly packed texels of one subresource. Only meaningful once all work touching the texture has completed.
    pub fn subresource_contents(&self, subresource: gpu::TextureSubresource) -> Option<Vec<u8>> {
        let offset = self.texel_offset(&subresource, 0, 0)?;
        let size = Self::subresource_size(&self.inner.info, subresource.mip_level);
        Some(unsafe { self.inner.memory.read(offset, size).to_vec() })
    }
}

impl PartialEq for SoftwareTexture {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for SoftwareTexture {}

impl gpu::Texture for SoftwareTexture {
    fn info(&self) -> &gpu::TextureInfo {
        &self.inner.info
    }
}
