use serde::{Serialize, Deserialize};

use super::{Format, ShaderType};

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum BindingKind {
  Constant,
  ReadOnly,
  ReadWrite
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ResourceType {
  Buffer,
  Texture,
  Sampler
}

/// Where a client binds a resource.
/// `ConstantValues` is reserved for data pushed with set_constant_values and never collides with shader declared slots.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum BindingSlot {
  Index(u32),
  ConstantValues
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone)]
pub struct RootParameter {
  pub name: String,
  pub slot: BindingSlot,
  pub kind: BindingKind,
  pub resource_type: ResourceType,
  pub register: u32,
  pub space: u32
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone)]
pub struct VertexAttribute {
  pub semantic_name: String,
  pub semantic_index: u32,
  pub location: u32,
  pub format: Format
}

/// Reflected interface of a single compiled shader function.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct ShaderReflection {
  pub shader_type: ShaderType,
  pub parameters: Vec<RootParameter>,
  #[serde(default)]
  pub vertex_attributes: Vec<VertexAttribute>
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn reflection_deserializes_without_vertex_attributes() {
    let json = r#"{
      "shader_type": "ComputeShader",
      "parameters": [
        { "name": "params", "slot": "ConstantValues", "kind": "Constant", "resource_type": "Buffer", "register": 0, "space": 0 },
        { "name": "output", "slot": { "Index": 1 }, "kind": "ReadWrite", "resource_type": "Buffer", "register": 0, "space": 0 }
      ]
    }"#;
    let reflection: ShaderReflection = serde_json::from_str(json).unwrap();
    assert_eq!(reflection.shader_type, ShaderType::ComputeShader);
    assert_eq!(reflection.parameters.len(), 2);
    assert_eq!(reflection.parameters[0].slot, BindingSlot::ConstantValues);
    assert_eq!(reflection.parameters[1].slot, BindingSlot::Index(1));
    assert!(reflection.vertex_attributes.is_empty());
  }
}
