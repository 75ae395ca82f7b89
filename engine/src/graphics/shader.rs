use std::sync::Arc;

use kiln_core::gpu::{
    BindingSlot,
    Device as _,
    GPUBackend,
    ResourceType,
    RootParameter,
    ShaderReflection,
    ShaderType,
    VertexAttribute,
};
use smallvec::SmallVec;

use super::*;

pub struct ShaderFunctionDesc<'a> {
    pub shader_type: ShaderType,
    pub bytecode: &'a [u8],
    /// Produced by the shader compiler. Draws with functions that lack it are skipped.
    pub reflection: Option<ShaderReflection>,
    pub name: Option<&'a str>,
}

pub struct ShaderFunction<B: GPUBackend> {
    shader: B::Shader,
    shader_type: ShaderType,
    reflection: Option<ShaderReflection>,
    name: Option<String>,
}

impl<B: GPUBackend> ShaderFunction<B> {
    pub(super) fn new(device: &Device<B>, desc: &ShaderFunctionDesc) -> Result<Self, DeviceError> {
        if desc.bytecode.is_empty() {
            log::error!("Shader function {:?} has no bytecode", desc.name);
            return Err(DeviceError::InvalidDescriptor(format!("shader function {:?} has no bytecode", desc.name)));
        }
        if let Some(reflection) = &desc.reflection {
            if reflection.shader_type != desc.shader_type {
                log::error!("Shader function {:?} is a {:?} but its reflection describes a {:?}", desc.name, desc.shader_type, reflection.shader_type);
                return Err(DeviceError::InvalidDescriptor(format!("reflection of shader function {:?} does not match its stage", desc.name)));
            }
        }
        let shader = unsafe { device.native().create_shader(desc.shader_type, desc.bytecode, device.debug_name(desc.name))? };
        Ok(Self {
            shader,
            shader_type: desc.shader_type,
            reflection: desc.reflection.clone(),
            name: desc.name.map(|n| n.to_string()),
        })
    }

    #[inline(always)]
    pub fn handle(&self) -> &B::Shader {
        &self.shader
    }

    pub fn shader_type(&self) -> ShaderType {
        self.shader_type
    }

    pub fn reflection(&self) -> Option<&ShaderReflection> {
        self.reflection.as_ref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// The merged interface of all functions of a program.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgramReflection {
    /// In root parameter order.
    pub parameters: Vec<RootParameter>,
    pub vertex_attributes: Vec<VertexAttribute>,
}

impl ProgramReflection {
    /// Merges in stage order. A slot used by several stages becomes a single root parameter.
    pub fn merge<'a>(reflections: impl IntoIterator<Item = &'a ShaderReflection>) -> Self {
        let mut merged = ProgramReflection::default();
        for reflection in reflections {
            for parameter in &reflection.parameters {
                let existing = merged.parameters.iter()
                    .find(|p| p.slot == parameter.slot && p.resource_type == parameter.resource_type);
                match existing {
                    Some(existing) if existing.kind != parameter.kind => {
                        log::warn!("Parameter {} is declared {:?} and {:?} by different stages, keeping {:?}",
                            parameter.name, existing.kind, parameter.kind, existing.kind);
                    }
                    Some(_) => {}
                    None => merged.parameters.push(parameter.clone()),
                }
            }
            if reflection.shader_type == ShaderType::VertexShader {
                merged.vertex_attributes = reflection.vertex_attributes.clone();
            }
        }
        merged
    }

    /// Root parameter index and declaration of the parameter at `slot`.
    pub fn find(&self, slot: BindingSlot, resource_type: ResourceType) -> Option<(u32, &RootParameter)> {
        self.parameters.iter()
            .enumerate()
            .find(|(_, p)| p.slot == slot && p.resource_type == resource_type)
            .map(|(index, p)| (index as u32, p))
    }
}

pub struct ShaderProgram<B: GPUBackend> {
    functions: SmallVec<[Arc<ShaderFunction<B>>; 2]>,
    reflection: Option<ProgramReflection>,
    name: Option<String>,
}

impl<B: GPUBackend> ShaderProgram<B> {
    pub(super) fn new(functions: &[&Handle<ShaderFunction<B>>], name: Option<&str>) -> Result<Self, DeviceError> {
        if functions.is_empty() {
            log::error!("Shader program {:?} has no functions", name);
            return Err(DeviceError::InvalidDescriptor(format!("shader program {:?} has no functions", name)));
        }

        let mut resolved = SmallVec::<[Arc<ShaderFunction<B>>; 2]>::new();
        for function in functions {
            let function = function.resource().map_err(|e| {
                log::error!("Shader program {:?}: {}", name, e);
                DeviceError::InvalidDescriptor(e.to_string())
            })?;
            if resolved.iter().any(|f| f.shader_type == function.shader_type) {
                log::error!("Shader program {:?} has more than one {:?}", name, function.shader_type);
                return Err(DeviceError::InvalidDescriptor(format!("shader program {:?} has more than one {:?}", name, function.shader_type)));
            }
            resolved.push(function.clone());
        }
        let compute_count = resolved.iter().filter(|f| f.shader_type == ShaderType::ComputeShader).count();
        if compute_count != 0 && compute_count != resolved.len() {
            log::error!("Shader program {:?} mixes compute and graphics stages", name);
            return Err(DeviceError::InvalidDescriptor(format!("shader program {:?} mixes compute and graphics stages", name)));
        }

        let reflection = if resolved.iter().all(|f| f.reflection.is_some()) {
            Some(ProgramReflection::merge(resolved.iter().filter_map(|f| f.reflection.as_ref())))
        } else {
            log::warn!("Shader program {:?} has a function without reflection, draws using it will be skipped", name);
            None
        };

        Ok(Self {
            functions: resolved,
            reflection,
            name: name.map(|n| n.to_string()),
        })
    }

    pub fn function(&self, shader_type: ShaderType) -> Option<&Arc<ShaderFunction<B>>> {
        self.functions.iter().find(|f| f.shader_type == shader_type)
    }

    pub fn is_compute(&self) -> bool {
        self.function(ShaderType::ComputeShader).is_some()
    }

    pub fn reflection(&self) -> Option<&ProgramReflection> {
        self.reflection.as_ref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

#[cfg(test)]
mod test {
    use kiln_core::gpu::{BindingKind, Format};

    use super::*;

    fn parameter(name: &str, slot: BindingSlot, kind: BindingKind, resource_type: ResourceType) -> RootParameter {
        RootParameter {
            name: name.to_string(),
            slot,
            kind,
            resource_type,
            register: 0,
            space: 0,
        }
    }

    #[test]
    fn merge_deduplicates_shared_slots() {
        let vertex = ShaderReflection {
            shader_type: ShaderType::VertexShader,
            parameters: vec![
                parameter("constants", BindingSlot::ConstantValues, BindingKind::Constant, ResourceType::Buffer),
                parameter("instances", BindingSlot::Index(0), BindingKind::ReadOnly, ResourceType::Buffer),
            ],
            vertex_attributes: vec![VertexAttribute {
                semantic_name: "POSITION".to_string(),
                semantic_index: 0,
                location: 0,
                format: Format::RGB32Float,
            }],
        };
        let fragment = ShaderReflection {
            shader_type: ShaderType::FragmentShader,
            parameters: vec![
                parameter("constants", BindingSlot::ConstantValues, BindingKind::Constant, ResourceType::Buffer),
                parameter("albedo", BindingSlot::Index(0), BindingKind::ReadOnly, ResourceType::Texture),
                parameter("albedo_sampler", BindingSlot::Index(0), BindingKind::ReadOnly, ResourceType::Sampler),
            ],
            vertex_attributes: Vec::new(),
        };

        let merged = ProgramReflection::merge([&vertex, &fragment]);
        assert_eq!(merged.parameters.len(), 4);
        assert_eq!(merged.vertex_attributes.len(), 1);
        assert_eq!(merged.find(BindingSlot::ConstantValues, ResourceType::Buffer).map(|(i, _)| i), Some(0));
        assert_eq!(merged.find(BindingSlot::Index(0), ResourceType::Texture).map(|(i, _)| i), Some(2));
        assert!(merged.find(BindingSlot::Index(1), ResourceType::Buffer).is_none());
    }
}
