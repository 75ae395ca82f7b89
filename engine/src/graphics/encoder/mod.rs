use std::sync::Arc;

use kiln_core::gpu::{
    BindPoint,
    BindingKind,
    BindingSlot,
    BufferUsage,
    CommandBuffer as _,
    GPUBackend,
    QueueType,
    ResourceState,
    ResourceType,
};
use smallvec::SmallVec;

use super::*;

pub use self::blit::*;
pub use self::compute::*;
pub use self::graphics::*;

mod blit;
mod compute;
mod graphics;

/// Lazily acquired command list of one queue kind, released on submit.
struct ListSlot<'a, B: GPUBackend> {
    device: &'a Device<B>,
    queue_type: QueueType,
    operation: &'static str,
    guard: Option<CommandListGuard<'a, B>>,
}

impl<'a, B: GPUBackend> ListSlot<'a, B> {
    fn new(device: &'a Device<B>, queue_type: QueueType, operation: &'static str) -> Self {
        Self {
            device,
            queue_type,
            operation,
            guard: None,
        }
    }

    fn get(&mut self) -> Result<Option<&mut CommandListGuard<'a, B>>, DeviceError> {
        if self.guard.is_none() {
            self.guard = self.device.acquire(self.queue_type, self.operation)?;
        }
        Ok(self.guard.as_mut())
    }

    fn is_held(&self) -> bool {
        self.guard.is_some()
    }

    fn submit(&mut self) -> Result<bool, DeviceError> {
        match self.guard.take() {
            Some(guard) => guard.submit(),
            None => Ok(false),
        }
    }
}

/// Constant data set on an encoder. Becomes a buffer the first time a draw or dispatch needs it.
enum Constants<B: GPUBackend> {
    Pending(Vec<u8>),
    Uploaded(Arc<Buffer<B>>),
}

fn create_constant_buffer<B: GPUBackend>(device: &Arc<Device<B>>, data: &[u8]) -> Result<Arc<Buffer<B>>, DeviceError> {
    let desc = BufferDesc {
        size: device.settings().align_constant_size(data.len() as u64),
        usage: BufferUsage::CONSTANT,
    };
    Ok(Arc::new(Buffer::new(device, &desc, Some("ConstantValues"))?))
}

/// Turns pending constant data into a buffer, recording the upload into `list`.
fn upload_constants<B: GPUBackend>(device: &Arc<Device<B>>, list: &mut CommandListGuard<B>, constants: &mut Option<Constants<B>>) -> Result<(), DeviceError> {
    if let Some(Constants::Pending(data)) = constants.as_ref() {
        if data.is_empty() {
            log::warn!("Ignoring empty constant values");
            *constants = None;
            return Ok(());
        }
        let buffer = create_constant_buffer(device, data)?;
        if buffer.record_update(list, data, data.len() as u64, 0, 0)? {
            *constants = Some(Constants::Uploaded(buffer));
        } else {
            *constants = None;
        }
    }
    Ok(())
}

enum ResolvedResource<B: GPUBackend> {
    Buffer(Arc<Buffer<B>>, u64),
    Texture(Arc<Texture<B>>),
    Sampler(Arc<Sampler<B>>),
}

struct ResolvedBinding<B: GPUBackend> {
    root_index: u32,
    kind: BindingKind,
    resource: ResolvedResource<B>,
}

type ResolvedBindings<B> = SmallVec<[ResolvedBinding<B>; 8]>;

/// The state a resource bound with `kind` has to be in.
pub fn binding_state(kind: BindingKind, bind_point: BindPoint) -> ResourceState {
    match (kind, bind_point) {
        (BindingKind::Constant, _) => ResourceState::VERTEX_AND_CONSTANT_BUFFER,
        (BindingKind::ReadOnly, BindPoint::Graphics) => ResourceState::ALL_SHADER_RESOURCE,
        (BindingKind::ReadOnly, BindPoint::Compute) => ResourceState::NON_PIXEL_SHADER_RESOURCE,
        (BindingKind::ReadWrite, _) => ResourceState::UNORDERED_ACCESS,
    }
}

fn find_parameter<B: GPUBackend>(device: &Device<B>, reflection: &ProgramReflection, slot: u32, name: &str, resource_type: ResourceType) -> Option<(u32, BindingKind)> {
    if let Some((index, parameter)) = reflection.find(BindingSlot::Index(slot), resource_type) {
        return Some((index, parameter.kind));
    }
    let fallback = *device.settings().binding_fallbacks.get(name)?;
    let (index, parameter) = reflection.find(BindingSlot::Index(fallback), resource_type)?;
    log::warn!("Binding {} has no reflected {:?} parameter at slot {}, using fallback slot {}", name, resource_type, slot, fallback);
    device.count_fallback_binding();
    Some((index, parameter.kind))
}

/// Matches the bound resources against the root parameters of a program.
/// Returns `None` if a root parameter is left unbound.
fn resolve_bindings<B: GPUBackend>(
    device: &Device<B>,
    reflection: &ProgramReflection,
    bindings: Option<&ResourceBindings<B>>,
    constants: Option<&Constants<B>>,
    operation: &str,
) -> Option<ResolvedBindings<B>> {
    let mut resolved = ResolvedBindings::<B>::new();
    let mut push = |root_index: u32, kind: BindingKind, resource: ResolvedResource<B>| {
        resolved.retain(|binding| binding.root_index != root_index);
        resolved.push(ResolvedBinding { root_index, kind, resource });
    };

    if let Some(bindings) = bindings {
        for binding in bindings.buffers() {
            match find_parameter(device, reflection, binding.slot, &binding.name, ResourceType::Buffer) {
                Some((index, kind)) => push(index, kind, ResolvedResource::Buffer(binding.buffer.clone(), binding.offset)),
                None => log::warn!("{}: buffer binding {} at slot {} matches no parameter, ignoring it", operation, binding.name, binding.slot),
            }
        }
        for binding in bindings.textures() {
            match find_parameter(device, reflection, binding.slot, &binding.name, ResourceType::Texture) {
                Some((index, kind)) => push(index, kind, ResolvedResource::Texture(binding.texture.texture().clone())),
                None => log::warn!("{}: texture binding {} at slot {} matches no parameter, ignoring it", operation, binding.name, binding.slot),
            }
            if let Some(sampler) = &binding.sampler {
                match find_parameter(device, reflection, binding.slot, &binding.name, ResourceType::Sampler) {
                    Some((index, kind)) => push(index, kind, ResolvedResource::Sampler(sampler.clone())),
                    None => log::warn!("{}: sampler of binding {} at slot {} matches no parameter, ignoring it", operation, binding.name, binding.slot),
                }
            }
        }
    }

    match (constants, reflection.find(BindingSlot::ConstantValues, ResourceType::Buffer)) {
        (Some(Constants::Uploaded(buffer)), Some((index, parameter))) => push(index, parameter.kind, ResolvedResource::Buffer(buffer.clone(), 0)),
        (Some(_), None) => log::warn!("{}: program takes no constant values, ignoring them", operation),
        _ => {}
    }

    for (index, parameter) in reflection.parameters.iter().enumerate() {
        if !resolved.iter().any(|binding| binding.root_index == index as u32) {
            log::warn!("{}: parameter {} is not bound, skipping", operation, parameter.name);
            return None;
        }
    }
    Some(resolved)
}

fn needs_transitions<B: GPUBackend>(resolved: &ResolvedBindings<B>, bind_point: BindPoint) -> bool {
    resolved.iter().any(|binding| {
        let state = binding_state(binding.kind, bind_point);
        match &binding.resource {
            ResolvedResource::Buffer(buffer, _) => buffer.current_state() != state,
            ResolvedResource::Texture(texture) => texture.current_state() != state,
            ResolvedResource::Sampler(_) => false,
        }
    })
}

fn transition_bindings<B: GPUBackend>(list: &mut CommandListGuard<B>, resolved: &ResolvedBindings<B>, bind_point: BindPoint) {
    for binding in resolved {
        let state = binding_state(binding.kind, bind_point);
        match &binding.resource {
            ResolvedResource::Buffer(buffer, _) => {
                buffer.request_state(list, state);
            }
            ResolvedResource::Texture(texture) => {
                texture.request_state(list, state);
            }
            ResolvedResource::Sampler(_) => {}
        }
    }
}

fn bind_resolved<B: GPUBackend>(list: &mut CommandListGuard<B>, resolved: &ResolvedBindings<B>, bind_point: BindPoint) {
    let command_buffer = list.command_buffer();
    for binding in resolved {
        unsafe {
            match &binding.resource {
                ResolvedResource::Buffer(buffer, offset) => command_buffer.bind_buffer(bind_point, binding.root_index, binding.kind, buffer.handle(), *offset),
                ResolvedResource::Texture(texture) => command_buffer.bind_texture(bind_point, binding.root_index, binding.kind, texture.handle()),
                ResolvedResource::Sampler(sampler) => command_buffer.bind_sampler(bind_point, binding.root_index, sampler.handle()),
            }
        }
    }
}

/// Clones the object behind a handle for a deferred operation, or logs why the operation is dropped.
fn live<T: HandleResource>(handle: &Handle<T>, operation: &str) -> Option<Arc<T>> {
    match handle.resource() {
        Ok(resource) => Some(resource.clone()),
        Err(e) => {
            log::warn!("Dropping {}: {}", operation, e);
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn binding_kinds_map_to_states() {
        assert_eq!(binding_state(BindingKind::Constant, BindPoint::Compute), ResourceState::VERTEX_AND_CONSTANT_BUFFER);
        assert_eq!(binding_state(BindingKind::ReadOnly, BindPoint::Graphics), ResourceState::ALL_SHADER_RESOURCE);
        assert_eq!(binding_state(BindingKind::ReadOnly, BindPoint::Compute), ResourceState::NON_PIXEL_SHADER_RESOURCE);
        assert_eq!(binding_state(BindingKind::ReadWrite, BindPoint::Graphics), ResourceState::UNORDERED_ACCESS);
        for kind in [BindingKind::Constant, BindingKind::ReadOnly, BindingKind::ReadWrite] {
            assert!(binding_state(kind, BindPoint::Compute).is_compute_compatible());
        }
    }
}
