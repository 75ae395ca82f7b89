use kiln_core::gpu::{
    self,
    Buffer as _,
    CommandBuffer as _,
    Device as _,
    Fence as _,
    Queue as _,
    BufferInfo,
    BufferUsage,
    MemoryUsage,
    QueueType,
    ResourceState,
};
use kiln_software::{JournalEntry, SoftwareBackend, SoftwareBuffer, SoftwareCommandBuffer, SoftwareDevice, SoftwareQueue};

fn init_logging() {
    let _ = simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Error)
        .init();
}

fn buffer(device: &SoftwareDevice, memory_usage: MemoryUsage, state: ResourceState) -> SoftwareBuffer {
    let info = BufferInfo {
        size: 64,
        usage: BufferUsage::COPY_SRC | BufferUsage::COPY_DST,
        memory_usage,
    };
    unsafe { device.create_buffer(&info, state, None).unwrap() }
}

fn list(device: &SoftwareDevice, queue_type: QueueType) -> (SoftwareQueue, SoftwareCommandBuffer) {
    unsafe {
        let queue = device.create_queue(queue_type).unwrap();
        let mut pool = device.create_command_pool(queue_type).unwrap();
        let list = device.create_command_buffer(&mut pool, queue_type, Some("TestList")).unwrap();
        (queue, list)
    }
}

fn barrier(buffer: &SoftwareBuffer, old_state: ResourceState, new_state: ResourceState) -> gpu::Barrier<'_, SoftwareBackend> {
    gpu::Barrier::BufferBarrier {
        old_state,
        new_state,
        buffer,
    }
}

#[test]
fn stale_barriers_are_reported() {
    init_logging();
    let device = SoftwareDevice::new();
    let buffer = buffer(&device, MemoryUsage::GPUMemory, ResourceState::COPY_DEST);
    let (queue, mut list) = list(&device, QueueType::Graphics);
    unsafe {
        list.barrier(&[barrier(&buffer, ResourceState::COPY_SOURCE, ResourceState::UNORDERED_ACCESS)]);
        list.close().unwrap();
        queue.execute(&[&list]).unwrap();
    }
    assert_eq!(device.stats().validation_errors, 1);
    assert_eq!(buffer.native_state(), ResourceState::UNORDERED_ACCESS);
    let journal = device.journal(QueueType::Graphics);
    assert!(matches!(journal[0], JournalEntry::ValidationError(_)));
    assert!(journal[1].is_barrier_for(buffer.id()));
}

#[test]
fn copies_move_memory_in_order() {
    init_logging();
    let device = SoftwareDevice::new();
    let upload = buffer(&device, MemoryUsage::MappableUpload, ResourceState::GENERIC_READ);
    let target = buffer(&device, MemoryUsage::GPUMemory, ResourceState::COPY_DEST);
    unsafe {
        let ptr = upload.map(0, 64, false).unwrap() as *mut u8;
        std::ptr::write_bytes(ptr, 0x5A, 64);
        upload.unmap(0, 64, true);
        assert!(target.map(0, 64, false).is_none());
    }

    let (queue, mut list) = list(&device, QueueType::Graphics);
    let fence = unsafe { device.create_fence(0).unwrap() };
    unsafe {
        list.copy_buffer(&upload, &target, &gpu::BufferCopyRegion { src_offset: 0, dst_offset: 0, size: 32 });
        list.close().unwrap();
        queue.execute(&[&list]).unwrap();
        queue.signal(&fence, 1).unwrap();
        fence.await_value(1);
        assert_eq!(fence.value(), 1);
    }

    let contents = target.contents();
    assert!(contents[..32].iter().all(|b| *b == 0x5A));
    assert!(contents[32..].iter().all(|b| *b == 0));
    assert_eq!(device.stats().copies, 1);
    assert_eq!(device.stats().validation_errors, 0);
}

#[test]
fn compute_lists_reject_graphics_transitions() {
    init_logging();
    let device = SoftwareDevice::new();
    let buffer = buffer(&device, MemoryUsage::GPUMemory, ResourceState::COPY_DEST);
    let (_queue, mut list) = list(&device, QueueType::Compute);
    unsafe {
        list.barrier(&[barrier(&buffer, ResourceState::COPY_DEST, ResourceState::PIXEL_SHADER_RESOURCE)]);
        assert!(list.close().is_err());
    }
}
