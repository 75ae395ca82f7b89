use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
  Unknown,
  R32UNorm,
  R16UNorm,
  R8Unorm,
  RGBA8UNorm,
  RGBA8Srgb,
  BGRA8UNorm,
  R16Float,
  R32Float,
  RG32Float,
  RG16Float,
  RGB32Float,
  RGBA32Float,
  RG16UNorm,
  RG8UNorm,
  R32UInt,
  RGBA16Float,
  R11G11B10Float,
  RG16UInt,
  R16UInt,
  R16SNorm,

  D16,
  D32,
  D24S8,
  D32S8
}

impl Format {
  pub fn is_depth(&self) -> bool {
    matches!(self,
      Format::D32
      | Format::D16
      | Format::D24S8
      | Format::D32S8)
  }

  pub fn is_stencil(&self) -> bool {
    matches!(self,
      Format::D24S8
      | Format::D32S8)
  }

  /// Byte size of a single texel or vertex attribute tuple.
  pub fn element_size(&self) -> u32 {
    match self {
      Format::Unknown => 0,
      Format::R8Unorm => 1,
      Format::R16UNorm
      | Format::R16Float
      | Format::R16UInt
      | Format::R16SNorm
      | Format::RG8UNorm
      | Format::D16 => 2,
      Format::R32UNorm
      | Format::RGBA8UNorm
      | Format::RGBA8Srgb
      | Format::BGRA8UNorm
      | Format::R32Float
      | Format::RG16Float
      | Format::RG16UNorm
      | Format::RG16UInt
      | Format::R32UInt
      | Format::R11G11B10Float
      | Format::D32
      | Format::D24S8 => 4,
      Format::RG32Float
      | Format::RGBA16Float
      | Format::D32S8 => 8,
      Format::RGB32Float => 12,
      Format::RGBA32Float => 16,
    }
  }
}

#[cfg(test)]
mod test {
  use super::Format;

  #[test]
  fn element_sizes() {
    assert_eq!(Format::RGBA8UNorm.element_size(), 4);
    assert_eq!(Format::RGB32Float.element_size(), 12);
    assert_eq!(Format::D32S8.element_size(), 8);
    assert!(Format::D24S8.is_depth());
    assert!(Format::D24S8.is_stencil());
    assert!(!Format::D32.is_stencil());
  }
}
