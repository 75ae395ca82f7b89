use bitflags::bitflags;

use super::*;

bitflags! {
  #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
  pub struct TextureUsage: u32 {
    const SAMPLED       = 0b1;
    const RENDER_TARGET = 0b10;
    const STORAGE       = 0b100;
    const COPY_SRC      = 0b1000;
    const COPY_DST      = 0b10000;
    const RESOLVE_SRC   = 0b100000;
    const RESOLVE_DST   = 0b1000000;
    const DEPTH_STENCIL = 0b1000000000;
  }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureInfo {
  pub format: Format,
  pub width: u32,
  pub height: u32,
  pub mip_levels: u32,
  pub array_length: u32,
  pub samples: SampleCount,
  pub usage: TextureUsage
}

impl TextureInfo {
  pub fn subresource_count(&self) -> u32 {
    self.mip_levels * self.array_length
  }

  pub fn mip_extent(&self, mip_level: u32) -> (u32, u32) {
    ((self.width >> mip_level).max(1), (self.height >> mip_level).max(1))
  }

  /// Size of one tightly packed row of the given mip level.
  pub fn packed_row_size(&self, mip_level: u32) -> u64 {
    self.mip_extent(mip_level).0 as u64 * self.format.element_size() as u64
  }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureSubresource {
  pub array_layer: u32,
  pub mip_level: u32
}

impl TextureSubresource {
  pub fn index(&self, info: &TextureInfo) -> u32 {
    self.mip_level + self.array_layer * info.mip_levels
  }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureViewInfo {
  pub base_mip_level: u32,
  pub mip_level_length: u32,
  pub base_array_layer: u32,
  pub array_layer_length: u32,
  pub format: Option<Format>,
}

impl Default for TextureViewInfo {
  fn default() -> Self {
    Self {
      base_mip_level: 0,
      mip_level_length: 1,
      base_array_layer: 0,
      array_layer_length: 1,
      format: None,
    }
  }
}

/// Placement of one texture subresource inside a linear buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct CopyableFootprint {
  pub offset: u64,
  pub row_pitch: u64,
  pub width: u32,
  pub height: u32,
  pub row_count: u32,
  pub row_size: u64,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Filter {
  Linear,
  Nearest,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AddressMode {
  Repeat,
  MirroredRepeat,
  ClampToEdge,
  ClampToBorder
}

#[derive(Debug, Clone, PartialEq)]
pub struct SamplerInfo {
  pub mag_filter: Filter,
  pub min_filter: Filter,
  pub mip_filter: Filter,
  pub address_mode_u: AddressMode,
  pub address_mode_v: AddressMode,
  pub address_mode_w: AddressMode,
  pub mip_bias: f32,
  pub max_anisotropy: f32,
  pub compare_op: Option<CompareFunc>,
  pub min_lod: f32,
  pub max_lod: Option<f32>,
}

impl Default for SamplerInfo {
  fn default() -> Self {
    Self {
      mag_filter: Filter::Linear,
      min_filter: Filter::Linear,
      mip_filter: Filter::Linear,
      address_mode_u: AddressMode::Repeat,
      address_mode_v: AddressMode::Repeat,
      address_mode_w: AddressMode::Repeat,
      mip_bias: 0.0f32,
      max_anisotropy: 0.0f32,
      compare_op: None,
      min_lod: 0.0f32,
      max_lod: None,
    }
  }
}

pub trait Texture : Send + Sync {
  fn info(&self) -> &TextureInfo;
}

#[cfg(test)]
mod test {
  use super::*;

  fn info() -> TextureInfo {
    TextureInfo {
      format: Format::RGBA8UNorm,
      width: 100,
      height: 7,
      mip_levels: 3,
      array_length: 2,
      samples: SampleCount::Samples1,
      usage: TextureUsage::SAMPLED
    }
  }

  #[test]
  fn mip_extent_never_reaches_zero() {
    let info = info();
    assert_eq!(info.mip_extent(0), (100, 7));
    assert_eq!(info.mip_extent(2), (25, 1));
    assert_eq!(info.mip_extent(5), (3, 1));
    assert_eq!(info.packed_row_size(1), 200);
  }

  #[test]
  fn subresource_index_is_mip_major() {
    let info = info();
    assert_eq!(info.subresource_count(), 6);
    assert_eq!(TextureSubresource { array_layer: 1, mip_level: 2 }.index(&info), 5);
  }
}
