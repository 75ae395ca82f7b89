use std::mem::ManuallyDrop;
use std::sync::Arc;

use kiln_core::gpu::{
    self,
    DepthStencilInfo,
    Device as _,
    Format,
    GPUBackend,
    InputAssemblerElement,
    InputRate,
    PrimitiveType,
    RasterizerInfo,
    RootParameter,
    ShaderInputElement,
    ShaderType,
    VertexAttribute,
};
use smallvec::SmallVec;

use super::*;

pub struct GraphicsPipelineDesc<'a, B: GPUBackend> {
    pub program: &'a Handle<ShaderProgram<B>>,
    /// Derived from the reflected vertex attributes when empty.
    pub shader_inputs: &'a [ShaderInputElement],
    pub input_assembler: &'a [InputAssemblerElement],
    pub rasterizer: RasterizerInfo,
    pub depth_stencil: DepthStencilInfo,
    pub primitive_type: PrimitiveType,
    pub render_target_formats: &'a [Format],
    pub depth_stencil_format: Option<Format>,
}

/// Interleaves the attributes in location order into a single per-vertex buffer at binding 0.
pub fn derive_vertex_layout(attributes: &[VertexAttribute]) -> (Vec<ShaderInputElement>, Vec<InputAssemblerElement>) {
    if attributes.is_empty() {
        return (Vec::new(), Vec::new());
    }
    let mut sorted: SmallVec<[&VertexAttribute; 8]> = attributes.iter().collect();
    sorted.sort_by_key(|attribute| attribute.location);

    let mut offset = 0usize;
    let mut shader_inputs = Vec::with_capacity(sorted.len());
    for attribute in sorted {
        shader_inputs.push(ShaderInputElement {
            input_assembler_binding: 0,
            semantic_name: attribute.semantic_name.clone(),
            semantic_index: attribute.semantic_index,
            offset,
            format: attribute.format,
        });
        offset += attribute.format.element_size() as usize;
    }
    let input_assembler = vec![InputAssemblerElement {
        binding: 0,
        input_rate: InputRate::PerVertex,
        stride: offset,
    }];
    (shader_inputs, input_assembler)
}

pub struct GraphicsPipeline<B: GPUBackend> {
    pipeline: ManuallyDrop<B::GraphicsPipeline>,
    program: Arc<ShaderProgram<B>>,
    render_target_formats: SmallVec<[Format; 8]>,
    depth_stencil_format: Option<Format>,
    vertex_buffer_count: u32,
    name: Option<String>,
    device: Arc<Device<B>>,
}

fn resolve_program<B: GPUBackend>(program: &Handle<ShaderProgram<B>>, name: Option<&str>) -> Result<Arc<ShaderProgram<B>>, DeviceError> {
    program.resource().cloned().map_err(|e| {
        log::error!("Pipeline {:?}: {}", name, e);
        DeviceError::InvalidDescriptor(e.to_string())
    })
}

fn root_parameters<B: GPUBackend>(program: &ShaderProgram<B>) -> &[RootParameter] {
    program.reflection().map_or(&[][..], |reflection| reflection.parameters.as_slice())
}

impl<B: GPUBackend> GraphicsPipeline<B> {
    pub(super) fn new(device: &Arc<Device<B>>, desc: &GraphicsPipelineDesc<B>, name: Option<&str>) -> Result<Self, DeviceError> {
        let program = resolve_program(desc.program, name)?;
        let Some(vs) = program.function(ShaderType::VertexShader) else {
            log::error!("Graphics pipeline {:?} needs a vertex shader", name);
            return Err(DeviceError::InvalidDescriptor(format!("graphics pipeline {:?} has no vertex shader", name)));
        };
        let fs = program.function(ShaderType::FragmentShader);
        if desc.render_target_formats.iter().any(|format| format.is_depth()) || desc.depth_stencil_format.is_some_and(|format| !format.is_depth()) {
            log::error!("Graphics pipeline {:?} mixes up color and depth formats", name);
            return Err(DeviceError::InvalidDescriptor(format!("graphics pipeline {:?} has invalid attachment formats", name)));
        }

        let derived;
        let (shader_inputs, input_assembler) = if desc.shader_inputs.is_empty() {
            let attributes = program.reflection().map_or(&[][..], |reflection| reflection.vertex_attributes.as_slice());
            derived = derive_vertex_layout(attributes);
            (derived.0.as_slice(), derived.1.as_slice())
        } else {
            (desc.shader_inputs, desc.input_assembler)
        };

        let info = gpu::GraphicsPipelineInfo::<B> {
            vs: vs.handle(),
            fs: fs.map(|fs| fs.handle()),
            vertex_layout: gpu::VertexLayoutInfo {
                shader_inputs,
                input_assembler,
            },
            rasterizer: desc.rasterizer.clone(),
            depth_stencil: desc.depth_stencil.clone(),
            primitive_type: desc.primitive_type,
            render_target_formats: desc.render_target_formats,
            depth_stencil_format: desc.depth_stencil_format,
            root_parameters: root_parameters(&program),
        };
        let pipeline = unsafe { device.native().create_graphics_pipeline(&info, device.debug_name(name))? };
        let vertex_buffer_count = input_assembler.len() as u32;

        Ok(Self {
            pipeline: ManuallyDrop::new(pipeline),
            render_target_formats: desc.render_target_formats.iter().copied().collect(),
            depth_stencil_format: desc.depth_stencil_format,
            vertex_buffer_count,
            program,
            name: name.map(|n| n.to_string()),
            device: device.clone(),
        })
    }

    #[inline(always)]
    pub fn handle(&self) -> &B::GraphicsPipeline {
        &self.pipeline
    }

    pub fn program(&self) -> &Arc<ShaderProgram<B>> {
        &self.program
    }

    pub fn render_target_formats(&self) -> &[Format] {
        &self.render_target_formats
    }

    pub fn depth_stencil_format(&self) -> Option<Format> {
        self.depth_stencil_format
    }

    pub fn vertex_buffer_count(&self) -> u32 {
        self.vertex_buffer_count
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl<B: GPUBackend> Drop for GraphicsPipeline<B> {
    fn drop(&mut self) {
        let pipeline = unsafe { ManuallyDrop::take(&mut self.pipeline) };
        self.device.retire_graphics_pipeline(pipeline);
    }
}

pub struct ComputePipeline<B: GPUBackend> {
    pipeline: ManuallyDrop<B::ComputePipeline>,
    program: Arc<ShaderProgram<B>>,
    name: Option<String>,
    device: Arc<Device<B>>,
}

impl<B: GPUBackend> ComputePipeline<B> {
    pub(super) fn new(device: &Arc<Device<B>>, program: &Handle<ShaderProgram<B>>, name: Option<&str>) -> Result<Self, DeviceError> {
        let program = resolve_program(program, name)?;
        let Some(shader) = program.function(ShaderType::ComputeShader) else {
            log::error!("Compute pipeline {:?} needs a compute shader", name);
            return Err(DeviceError::InvalidDescriptor(format!("compute pipeline {:?} has no compute shader", name)));
        };
        let info = gpu::ComputePipelineInfo::<B> {
            shader: shader.handle(),
            root_parameters: root_parameters(&program),
        };
        let pipeline = unsafe { device.native().create_compute_pipeline(&info, device.debug_name(name))? };
        Ok(Self {
            pipeline: ManuallyDrop::new(pipeline),
            program,
            name: name.map(|n| n.to_string()),
            device: device.clone(),
        })
    }

    #[inline(always)]
    pub fn handle(&self) -> &B::ComputePipeline {
        &self.pipeline
    }

    pub fn program(&self) -> &Arc<ShaderProgram<B>> {
        &self.program
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl<B: GPUBackend> Drop for ComputePipeline<B> {
    fn drop(&mut self) {
        let pipeline = unsafe { ManuallyDrop::take(&mut self.pipeline) };
        self.device.retire_compute_pipeline(pipeline);
    }
}

#[cfg(test)]
mod test {
    use kiln_core::gpu::Format;

    use super::*;

    #[test]
    fn vertex_layout_follows_locations() {
        let attributes = [
            VertexAttribute {
                semantic_name: "TEXCOORD".to_string(),
                semantic_index: 0,
                location: 1,
                format: Format::RG32Float,
            },
            VertexAttribute {
                semantic_name: "POSITION".to_string(),
                semantic_index: 0,
                location: 0,
                format: Format::RGB32Float,
            },
        ];
        let (inputs, assembler) = derive_vertex_layout(&attributes);
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].semantic_name, "POSITION");
        assert_eq!(inputs[0].offset, 0);
        assert_eq!(inputs[1].offset, 12);
        assert_eq!(assembler.len(), 1);
        assert_eq!(assembler[0].stride, 20);

        let (inputs, assembler) = derive_vertex_layout(&[]);
        assert!(inputs.is_empty() && assembler.is_empty());
    }
}
