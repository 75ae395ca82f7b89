use std::sync::Arc;

use kiln_core::gpu::{GPUBackend, ResourceState};

use super::*;

pub struct BufferBindingDesc<'a, B: GPUBackend> {
    pub slot: u32,
    pub name: &'a str,
    pub buffer: &'a Handle<Buffer<B>>,
    pub offset: u64,
}

pub enum TextureSource<'a, B: GPUBackend> {
    Texture(&'a Handle<Texture<B>>),
    View(&'a Handle<TextureView<B>>),
}

pub struct TextureBindingDesc<'a, B: GPUBackend> {
    pub slot: u32,
    pub name: &'a str,
    pub texture: TextureSource<'a, B>,
    /// Bound to the sampler parameter at the same slot.
    pub sampler: Option<&'a Handle<Sampler<B>>>,
}

pub struct ResourceBindingsDesc<'a, B: GPUBackend> {
    pub buffers: &'a [BufferBindingDesc<'a, B>],
    pub textures: &'a [TextureBindingDesc<'a, B>],
}

pub struct BufferBinding<B: GPUBackend> {
    pub slot: u32,
    pub name: String,
    pub buffer: Arc<Buffer<B>>,
    pub offset: u64,
}

pub enum BoundTexture<B: GPUBackend> {
    Texture(Arc<Texture<B>>),
    View(Arc<TextureView<B>>),
}

impl<B: GPUBackend> BoundTexture<B> {
    pub fn texture(&self) -> &Arc<Texture<B>> {
        match self {
            BoundTexture::Texture(texture) => texture,
            BoundTexture::View(view) => view.texture(),
        }
    }

    pub fn current_state(&self) -> ResourceState {
        self.texture().current_state()
    }
}

pub struct TextureBinding<B: GPUBackend> {
    pub slot: u32,
    pub name: String,
    pub texture: BoundTexture<B>,
    pub sampler: Option<Arc<Sampler<B>>>,
}

/// The resources a draw or dispatch reads and writes, keyed by binding slot.
pub struct ResourceBindings<B: GPUBackend> {
    buffers: Vec<BufferBinding<B>>,
    textures: Vec<TextureBinding<B>>,
}

fn resolve<'a, T: HandleResource>(handle: &'a Handle<T>, name: &str) -> Result<&'a Arc<T>, DeviceError> {
    handle.resource().map_err(|e| {
        log::error!("Binding {}: {}", name, e);
        DeviceError::InvalidDescriptor(format!("binding {}: {}", name, e))
    })
}

impl<B: GPUBackend> ResourceBindings<B> {
    pub(super) fn new(desc: &ResourceBindingsDesc<B>) -> Result<Self, DeviceError> {
        let mut buffers = Vec::with_capacity(desc.buffers.len());
        for binding in desc.buffers {
            let buffer = resolve(binding.buffer, binding.name)?;
            if binding.offset >= buffer.size() {
                log::error!("Binding {} starts at {} which is past the end of buffer {:?}", binding.name, binding.offset, buffer.name());
                return Err(DeviceError::InvalidDescriptor(format!("binding {} is out of bounds", binding.name)));
            }
            buffers.push(BufferBinding {
                slot: binding.slot,
                name: binding.name.to_string(),
                buffer: buffer.clone(),
                offset: binding.offset,
            });
        }

        let mut textures = Vec::with_capacity(desc.textures.len());
        for binding in desc.textures {
            let texture = match &binding.texture {
                TextureSource::Texture(handle) => BoundTexture::Texture(resolve(handle, binding.name)?.clone()),
                TextureSource::View(handle) => BoundTexture::View(resolve(handle, binding.name)?.clone()),
            };
            let sampler = match binding.sampler {
                Some(handle) => Some(resolve(handle, binding.name)?.clone()),
                None => None,
            };
            textures.push(TextureBinding {
                slot: binding.slot,
                name: binding.name.to_string(),
                texture,
                sampler,
            });
        }

        Ok(Self {
            buffers,
            textures,
        })
    }

    pub fn buffers(&self) -> &[BufferBinding<B>] {
        &self.buffers
    }

    pub fn textures(&self) -> &[TextureBinding<B>] {
        &self.textures
    }
}
