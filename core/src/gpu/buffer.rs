use std::ffi::c_void;

use bitflags::bitflags;

bitflags! {
  #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
  pub struct BufferUsage: u32 {
    const VERTEX                             = 0b1;
    const INDEX                              = 0b10;
    const STORAGE                            = 0b100;
    const CONSTANT                           = 0b1000;
    const COPY_SRC                           = 0b100000;
    const COPY_DST                           = 0b1000000;
    const INDIRECT                           = 0b10000000;
  }
}

/// Where the memory backing a buffer lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryUsage {
  GPUMemory,
  /// CPU writable, GPU readable. Permanently in the generic read state.
  MappableUpload,
  /// GPU writable, CPU readable. Permanently in the copy destination state.
  Readback
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BufferInfo {
  pub size: u64,
  pub usage: BufferUsage,
  pub memory_usage: MemoryUsage
}

pub trait Buffer : Send + Sync {
  fn info(&self) -> &BufferInfo;

  unsafe fn map(&self, offset: u64, length: u64, invalidate: bool) -> Option<*mut c_void>;
  unsafe fn unmap(&self, offset: u64, length: u64, flush: bool);
}
