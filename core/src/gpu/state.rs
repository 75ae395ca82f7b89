use bitflags::bitflags;

bitflags! {
  /// Access state of a resource, laid out like the native resource state bits.
  #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
  pub struct ResourceState: u32 {
    const VERTEX_AND_CONSTANT_BUFFER = 0x1;
    const INDEX_BUFFER               = 0x2;
    const RENDER_TARGET              = 0x4;
    const UNORDERED_ACCESS           = 0x8;
    const DEPTH_WRITE                = 0x10;
    const DEPTH_READ                 = 0x20;
    const NON_PIXEL_SHADER_RESOURCE  = 0x40;
    const PIXEL_SHADER_RESOURCE      = 0x80;
    const INDIRECT_ARGUMENT          = 0x200;
    const COPY_DEST                  = 0x400;
    const COPY_SOURCE                = 0x800;
    const RESOLVE_DEST               = 0x1000;
    const RESOLVE_SOURCE             = 0x2000;

    const ALL_SHADER_RESOURCE = Self::NON_PIXEL_SHADER_RESOURCE.bits() | Self::PIXEL_SHADER_RESOURCE.bits();
    const GENERIC_READ = Self::VERTEX_AND_CONSTANT_BUFFER.bits()
      | Self::INDEX_BUFFER.bits()
      | Self::NON_PIXEL_SHADER_RESOURCE.bits()
      | Self::PIXEL_SHADER_RESOURCE.bits()
      | Self::INDIRECT_ARGUMENT.bits()
      | Self::COPY_SOURCE.bits();
  }
}

impl ResourceState {
  pub const COMMON: ResourceState = ResourceState::empty();

  pub fn is_write(&self) -> bool {
    self.intersects(ResourceState::RENDER_TARGET
      | ResourceState::UNORDERED_ACCESS
      | ResourceState::DEPTH_WRITE
      | ResourceState::COPY_DEST
      | ResourceState::RESOLVE_DEST)
  }

  /// States a compute command list is allowed to transition from and to.
  pub fn is_compute_compatible(&self) -> bool {
    (*self & !(ResourceState::UNORDERED_ACCESS
      | ResourceState::NON_PIXEL_SHADER_RESOURCE
      | ResourceState::COPY_DEST
      | ResourceState::COPY_SOURCE
      | ResourceState::INDIRECT_ARGUMENT
      | ResourceState::VERTEX_AND_CONSTANT_BUFFER)).is_empty()
  }
}
