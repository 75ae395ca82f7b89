use kiln_core::gpu;

use super::*;

pub struct SoftwareShader {
    shader_type: gpu::ShaderType,
    bytecode: Box<[u8]>,
    name: Option<String>,
}

impl SoftwareShader {
    pub(crate) fn new(shader_type: gpu::ShaderType, bytecode: &[u8], name: Option<&str>) -> Self {
        Self {
            shader_type,
            bytecode: bytecode.into(),
            name: name.map(|n| n.to_string()),
        }
    }

    pub fn shader_type(&self) -> gpu::ShaderType {
        self.shader_type
    }

    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// The parts of a pipeline state object the software queue validates draws and dispatches against.
#[derive(Clone)]
pub struct SoftwarePipelineLayout {
    pub root_parameters: Vec<gpu::RootParameter>,
    pub render_target_formats: Vec<gpu::Format>,
    pub depth_stencil_format: Option<gpu::Format>,
    pub vertex_buffer_count: u32,
}

#[derive(Clone)]
pub struct SoftwareGraphicsPipeline {
    pub(crate) id: ResourceId,
    pub(crate) layout: std::sync::Arc<SoftwarePipelineLayout>,
}

impl SoftwareGraphicsPipeline {
    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn layout(&self) -> &SoftwarePipelineLayout {
        &self.layout
    }
}

#[derive(Clone)]
pub struct SoftwareComputePipeline {
    pub(crate) id: ResourceId,
    pub(crate) layout: std::sync::Arc<SoftwarePipelineLayout>,
}

impl SoftwareComputePipeline {
    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn layout(&self) -> &SoftwarePipelineLayout {
        &self.layout
    }
}

#[derive(Clone)]
pub struct SoftwareCommandSignature {
    pub(crate) stride: u32,
}

impl gpu::CommandSignature for SoftwareCommandSignature {
    fn stride(&self) -> u32 {
        self.stride
    }
}

#[derive(Clone)]
pub struct SoftwareSampler {
    pub(crate) id: ResourceId,
    pub(crate) info: gpu::SamplerInfo,
}

impl SoftwareSampler {
    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn info(&self) -> &gpu::SamplerInfo {
        &self.info
    }
}
