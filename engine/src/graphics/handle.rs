use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use kiln_core::gpu::GPUBackend;

use super::*;

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    Buffer,
    Texture,
    TextureView,
    Sampler,
    ShaderFunction,
    ShaderProgram,
    ResourceBindings,
    GraphicsPipeline,
    ComputePipeline,
}

pub trait HandleResource {
    const KIND: HandleKind;
}

/// Reference to a device object. The id is unique for the lifetime of the process.
pub struct Handle<T: HandleResource> {
    id: u64,
    resource: Option<Arc<T>>,
}

impl<T: HandleResource> Handle<T> {
    pub(super) fn new(resource: T) -> Self {
        Self {
            id: NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed),
            resource: Some(Arc::new(resource)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> HandleKind {
        T::KIND
    }

    /// True once the object was destroyed through this handle.
    pub fn is_null(&self) -> bool {
        self.resource.is_none()
    }

    pub fn get(&self) -> Option<&Arc<T>> {
        self.resource.as_ref()
    }

    pub fn resource(&self) -> Result<&Arc<T>, HandleError> {
        self.resource.as_ref().ok_or(HandleError::Destroyed(T::KIND))
    }

    pub(super) fn take(&mut self) -> Option<Arc<T>> {
        self.resource.take()
    }
}

impl<T: HandleResource> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            resource: self.resource.clone(),
        }
    }
}

impl<T: HandleResource> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T: HandleResource> Eq for Handle<T> {}

impl<T: HandleResource> Debug for Handle<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:?} handle {}{})", T::KIND, self.id, if self.is_null() { ", destroyed" } else { "" })
    }
}

macro_rules! any_handle {
    ($($kind:ident => $ty:ident, $accessor:ident;)*) => {
        /// A handle of any kind. Downcasting checks the kind.
        pub enum AnyHandle<B: GPUBackend> {
            $($kind(Handle<$ty<B>>),)*
        }

        impl<B: GPUBackend> AnyHandle<B> {
            pub fn kind(&self) -> HandleKind {
                match self {
                    $(AnyHandle::$kind(_) => HandleKind::$kind,)*
                }
            }

            pub fn id(&self) -> u64 {
                match self {
                    $(AnyHandle::$kind(handle) => handle.id(),)*
                }
            }

            $(
            pub fn $accessor(&self) -> Result<&Handle<$ty<B>>, HandleError> {
                match self {
                    AnyHandle::$kind(handle) => Ok(handle),
                    other => Err(HandleError::KindMismatch { expected: HandleKind::$kind, found: other.kind() }),
                }
            }
            )*
        }

        $(
        impl<B: GPUBackend> HandleResource for $ty<B> {
            const KIND: HandleKind = HandleKind::$kind;
        }

        impl<B: GPUBackend> From<Handle<$ty<B>>> for AnyHandle<B> {
            fn from(handle: Handle<$ty<B>>) -> Self {
                AnyHandle::$kind(handle)
            }
        }
        )*
    };
}

any_handle! {
    Buffer => Buffer, as_buffer;
    Texture => Texture, as_texture;
    TextureView => TextureView, as_texture_view;
    Sampler => Sampler, as_sampler;
    ShaderFunction => ShaderFunction, as_shader_function;
    ShaderProgram => ShaderProgram, as_shader_program;
    ResourceBindings => ResourceBindings, as_resource_bindings;
    GraphicsPipeline => GraphicsPipeline, as_graphics_pipeline;
    ComputePipeline => ComputePipeline, as_compute_pipeline;
}
