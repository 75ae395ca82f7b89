use std::sync::atomic::{AtomicU64, Ordering};

use kiln_core::gpu;

use super::*;

/// One command as it was executed by a software queue.
#[derive(Debug, Clone, PartialEq)]
pub enum JournalEntry {
    Barrier { resource: ResourceId, before: gpu::ResourceState, after: gpu::ResourceState },
    CopyBuffer { src: ResourceId, dst: ResourceId, region: gpu::BufferCopyRegion },
    CopyBufferToTexture { src: ResourceId, dst: ResourceId, subresource: gpu::TextureSubresource },
    CopyTextureToBuffer { src: ResourceId, dst: ResourceId, subresource: gpu::TextureSubresource },
    Resolve { src: ResourceId, dst: ResourceId },
    FillBuffer { buffer: ResourceId, offset: u64, length: u64, value: u8 },
    ClearRenderTarget { texture: ResourceId },
    ClearDepthStencil { texture: ResourceId },
    Draw { vertices: u32, instances: u32 },
    DrawIndexed { indices: u32, instances: u32 },
    DrawIndexedIndirect { stride: u32, draw_count: u32 },
    Dispatch { x: u32, y: u32, z: u32 },
    Signal { value: u64 },
    ValidationError(String),
}

impl JournalEntry {
    pub fn is_barrier_for(&self, id: ResourceId) -> bool {
        matches!(self, JournalEntry::Barrier { resource, .. } if *resource == id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SoftwareStats {
    pub command_lists_executed: u64,
    pub barriers: u64,
    pub copies: u64,
    pub resolves: u64,
    pub draws: u64,
    pub dispatches: u64,
    pub signals: u64,
    pub command_signatures_created: u64,
    pub validation_errors: u64,
}

#[derive(Default)]
pub(crate) struct StatsCounters {
    pub(crate) command_lists_executed: AtomicU64,
    pub(crate) barriers: AtomicU64,
    pub(crate) copies: AtomicU64,
    pub(crate) resolves: AtomicU64,
    pub(crate) draws: AtomicU64,
    pub(crate) dispatches: AtomicU64,
    pub(crate) signals: AtomicU64,
    pub(crate) command_signatures_created: AtomicU64,
    pub(crate) validation_errors: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> SoftwareStats {
        SoftwareStats {
            command_lists_executed: self.command_lists_executed.load(Ordering::Relaxed),
            barriers: self.barriers.load(Ordering::Relaxed),
            copies: self.copies.load(Ordering::Relaxed),
            resolves: self.resolves.load(Ordering::Relaxed),
            draws: self.draws.load(Ordering::Relaxed),
            dispatches: self.dispatches.load(Ordering::Relaxed),
            signals: self.signals.load(Ordering::Relaxed),
            command_signatures_created: self.command_signatures_created.load(Ordering::Relaxed),
            validation_errors: self.validation_errors.load(Ordering::Relaxed),
        }
    }
}
