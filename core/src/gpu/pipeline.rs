use serde::Deserialize;
use serde::Serialize;

use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Hash, Eq)]
pub enum InputRate {
  PerVertex,
  PerInstance
}

#[derive(Debug, Hash, Eq, PartialEq, Clone)]
pub struct ShaderInputElement {
  pub input_assembler_binding: u32,
  pub semantic_name: String,
  pub semantic_index: u32,
  pub offset: usize,
  pub format: Format
}

#[derive(Debug, Hash, Eq, PartialEq, Clone)]
pub struct InputAssemblerElement {
  pub binding: u32,
  pub input_rate: InputRate,
  pub stride: usize
}

impl Default for InputAssemblerElement {
  fn default() -> InputAssemblerElement {
    InputAssemblerElement {
      binding: 0,
      input_rate: InputRate::PerVertex,
      stride: 0
    }
  }
}

#[derive(Debug, Hash, Eq, PartialEq, Clone)]
pub struct VertexLayoutInfo<'a> {
  pub shader_inputs: &'a [ShaderInputElement],
  pub input_assembler: &'a [InputAssemblerElement]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FillMode {
  Fill,
  Line
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
  None,
  Front,
  Back
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrontFace {
  CounterClockwise,
  Clockwise
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleCount {
  Samples1,
  Samples2,
  Samples4,
  Samples8
}

impl SampleCount {
  pub fn count(&self) -> u32 {
    match self {
      SampleCount::Samples1 => 1,
      SampleCount::Samples2 => 2,
      SampleCount::Samples4 => 4,
      SampleCount::Samples8 => 8,
    }
  }
}

#[derive(Debug, Hash, Eq, PartialEq, Clone)]
pub struct RasterizerInfo {
  pub fill_mode: FillMode,
  pub cull_mode: CullMode,
  pub front_face: FrontFace,
  pub sample_count: SampleCount
}

impl Default for RasterizerInfo {
  fn default() -> Self {
    RasterizerInfo {
      fill_mode: FillMode::Fill,
      cull_mode: CullMode::Back,
      front_face: FrontFace::Clockwise,
      sample_count: SampleCount::Samples1
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunc {
  Never,
  Less,
  LessEqual,
  Equal,
  NotEqual,
  GreaterEqual,
  Greater,
  Always
}

#[derive(Debug, Hash, PartialEq, Eq, Clone)]
pub struct DepthStencilInfo {
  pub depth_test_enabled: bool,
  pub depth_write_enabled: bool,
  pub depth_func: CompareFunc,
}

impl Default for DepthStencilInfo {
  fn default() -> Self {
    DepthStencilInfo {
      depth_test_enabled: true,
      depth_write_enabled: true,
      depth_func: CompareFunc::Less,
    }
  }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub enum ShaderType {
  VertexShader = 0,
  FragmentShader,
  ComputeShader,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum PrimitiveType {
  Triangles,
  TriangleStrip,
  Lines,
  LineStrip,
  Points
}

pub struct GraphicsPipelineInfo<'a, B: GPUBackend> {
  pub vs: &'a B::Shader,
  pub fs: Option<&'a B::Shader>,
  pub vertex_layout: VertexLayoutInfo<'a>,
  pub rasterizer: RasterizerInfo,
  pub depth_stencil: DepthStencilInfo,
  pub primitive_type: PrimitiveType,
  pub render_target_formats: &'a [Format],
  pub depth_stencil_format: Option<Format>,
  /// Root signature layout, in root parameter order.
  pub root_parameters: &'a [RootParameter],
}

pub struct ComputePipelineInfo<'a, B: GPUBackend> {
  pub shader: &'a B::Shader,
  pub root_parameters: &'a [RootParameter],
}
