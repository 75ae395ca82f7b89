use std::sync::Arc;

use kiln_engine::gpu::{BufferUsage, Format, QueueType, ResourceState, TextureUsage};
use kiln_engine::{
    AnyHandle,
    BufferDesc,
    BufferWatch,
    ColorAttachment,
    DeviceError,
    GraphicsEncoderDesc,
    HandleError,
    HandleKind,
    ListState,
    LoadOp,
};
use parking_lot::Mutex;

mod common;

fn storage(size: u64) -> BufferDesc {
    BufferDesc {
        size,
        usage: BufferUsage::STORAGE,
    }
}

#[test]
fn update_then_read_back() {
    let (native, device) = common::device();
    let handle = device.create_buffer(&storage(256), Some("Data")).unwrap();
    let buffer = handle.resource().unwrap();
    let data = vec![0xABu8; 256];

    assert!(buffer.update_data(&data, 256, 0, 0).unwrap());
    assert_eq!(buffer.current_state(), ResourceState::COPY_DEST);
    assert!(device.submit_command_list(QueueType::Graphics).unwrap());
    assert_eq!(device.fence_value(QueueType::Graphics), 1);

    let mut read = vec![0u8; 256];
    assert!(buffer.read_data(0, &mut read).unwrap());
    assert_eq!(read, data);
    assert_eq!(buffer.current_state(), ResourceState::COPY_SOURCE);
    assert_eq!(native.stats().validation_errors, 0);
}

#[test]
fn second_submit_is_a_no_op() {
    let (native, device) = common::device();
    let handle = device.create_buffer(&storage(64), None).unwrap();
    handle.resource().unwrap().update_data(&[1u8; 64], 64, 0, 0).unwrap();

    assert!(device.submit_command_list(QueueType::Graphics).unwrap());
    let executed = native.stats().command_lists_executed;
    assert!(!device.submit_command_list(QueueType::Graphics).unwrap());
    assert_eq!(native.stats().command_lists_executed, executed);
    assert_eq!(device.fence_value(QueueType::Graphics), 1);
    assert_eq!(device.list_state(QueueType::Graphics), ListState::Closed);
    assert_eq!(device.stats().submissions, [1, 0, 0]);
}

#[test]
fn fence_values_only_grow() {
    let (_native, device) = common::device();
    let handle = device.create_buffer(&storage(16), None).unwrap();
    let buffer = handle.resource().unwrap();
    let mut previous = device.fence_value(QueueType::Graphics);
    for i in 0..5u8 {
        buffer.update_data(&[i; 16], 16, 0, 0).unwrap();
        device.submit_command_list(QueueType::Graphics).unwrap();
        let value = device.fence_value(QueueType::Graphics);
        assert!(value > previous);
        previous = value;
    }
    assert_eq!(device.fence_value(QueueType::Compute), 0);
    assert_eq!(device.fence_value(QueueType::Copy), 0);
}

#[test]
fn updates_in_one_list_keep_their_data() {
    let (native, device) = common::device();
    let handle = device.create_buffer(&storage(8), None).unwrap();
    let buffer = handle.resource().unwrap();
    buffer.update_data(&[1u8; 4], 4, 0, 0).unwrap();
    // The staging buffer is still read by the first copy, so this one has to use its own.
    buffer.update_data(&[2u8; 4], 4, 0, 4).unwrap();
    device.submit_command_list(QueueType::Graphics).unwrap();

    let mut read = [0u8; 8];
    assert!(buffer.read_data(0, &mut read).unwrap());
    assert_eq!(read, [1, 1, 1, 1, 2, 2, 2, 2]);
    assert_eq!(native.stats().validation_errors, 0);
}

#[test]
fn out_of_range_operations_are_skipped() {
    let (_native, device) = common::device();
    let handle = device.create_buffer(&storage(16), None).unwrap();
    let buffer = handle.resource().unwrap();
    assert!(!buffer.update_data(&[0u8; 8], 8, 0, 12).unwrap());
    assert!(!buffer.update_data(&[0u8; 8], 16, 0, 0).unwrap());
    let mut read = [0u8; 32];
    assert!(!buffer.read_data(0, &mut read).unwrap());
    assert!(!buffer.update_from_buffer(buffer, 4, 0, 8).unwrap());
}

#[test]
fn invalid_descriptors_are_rejected() {
    let (_native, device) = common::device();
    assert!(matches!(device.create_buffer(&storage(0), None), Err(DeviceError::InvalidDescriptor(_))));
    let info = common::texture_info(Format::RGBA8UNorm, 0, 4, TextureUsage::SAMPLED);
    assert!(matches!(device.create_texture(&info, None), Err(DeviceError::InvalidDescriptor(_))));
    assert!(matches!(device.create_texture_view(None, &Default::default()), Err(DeviceError::InvalidDescriptor(_))));
}

#[test]
fn device_loss_is_sticky() {
    let (native, device) = common::device();
    let handle = device.create_buffer(&storage(32), None).unwrap();
    handle.resource().unwrap().update_data(&[3u8; 32], 32, 0, 0).unwrap();

    native.simulate_device_removal();
    assert!(matches!(device.submit_command_list(QueueType::Graphics), Err(DeviceError::DeviceLost)));
    assert!(device.is_lost());
    assert!(matches!(device.get_command_list(QueueType::Compute), Err(DeviceError::DeviceLost)));
    assert!(matches!(device.submit_command_list(QueueType::Graphics), Err(DeviceError::DeviceLost)));
    assert!(matches!(handle.resource().unwrap().update_data(&[0u8; 4], 4, 0, 0), Err(DeviceError::DeviceLost)));
    assert!(matches!(device.wait_for_idle(), Err(DeviceError::DeviceLost)));
}

#[test]
fn failed_reset_skips_the_operation() {
    let (native, device) = common::device();
    let handle = device.create_buffer(&storage(32), None).unwrap();
    let buffer = handle.resource().unwrap();
    buffer.update_data(&[1u8; 32], 32, 0, 0).unwrap();
    device.submit_command_list(QueueType::Graphics).unwrap();

    native.fail_next_command_list_reset();
    assert!(!buffer.update_data(&[2u8; 32], 32, 0, 0).unwrap());
    assert_eq!(device.stats().skipped_operations, 1);
    assert_eq!(device.list_state(QueueType::Graphics), ListState::Closed);
    assert!(!device.is_lost());

    assert!(buffer.update_data(&[2u8; 32], 32, 0, 0).unwrap());
    assert_eq!(device.list_state(QueueType::Graphics), ListState::Open);
    let mut read = [0u8; 32];
    assert!(buffer.read_data(0, &mut read).unwrap());
    assert_eq!(read, [2u8; 32]);
}

#[test]
fn empty_encoders_do_not_submit() {
    let (native, device) = common::device();
    let target = device.create_texture(&common::texture_info(Format::RGBA8UNorm, 4, 4, TextureUsage::RENDER_TARGET), None).unwrap();

    assert!(!device.create_blit_encoder().submit().unwrap());
    assert!(!device.create_compute_encoder().submit().unwrap());
    let attachments = [ColorAttachment {
        texture: &target,
        resolve_target: None,
        load_op: LoadOp::Clear([0.0f32; 4]),
    }];
    let encoder = device.create_graphics_encoder(&GraphicsEncoderDesc {
        color_attachments: &attachments,
        depth_attachment: None,
    }).unwrap();
    assert!(encoder.is_empty());
    assert!(!encoder.submit().unwrap());

    assert_eq!(native.stats().command_lists_executed, 0);
    assert_eq!(device.stats().submissions, [0, 0, 0]);
}

#[test]
fn handles_check_their_kind() {
    let (_native, device) = common::device();
    let mut handle = device.create_buffer(&storage(16), None).unwrap();
    let any: AnyHandle<_> = handle.clone().into();
    assert_eq!(any.kind(), HandleKind::Buffer);
    assert_eq!(any.id(), handle.id());
    assert_eq!(any.as_buffer().map(|h| h.id()), Ok(handle.id()));
    assert!(matches!(
        any.as_texture(),
        Err(HandleError::KindMismatch { expected: HandleKind::Texture, found: HandleKind::Buffer })
    ));

    let other = device.create_buffer(&storage(16), None).unwrap();
    assert_ne!(other.id(), handle.id());

    device.destroy_buffer(&mut handle);
    assert!(handle.is_null());
    assert!(matches!(handle.resource(), Err(HandleError::Destroyed(HandleKind::Buffer))));
}

#[test]
fn destruction_waits_for_the_gpu() {
    let (_native, device) = common::device();
    let mut handle = device.create_buffer(&storage(64), None).unwrap();
    handle.resource().unwrap().update_data(&[5u8; 64], 64, 0, 0).unwrap();

    device.destroy_buffer(&mut handle);
    // The buffer and its staging buffer are still used by the unsubmitted copy.
    assert_eq!(device.pending_destructions(), 2);
    device.submit_command_list(QueueType::Graphics).unwrap();
    assert_eq!(device.pending_destructions(), 0);
}

#[test]
fn watch_sees_every_graphics_submission() {
    let (_native, device) = common::device();
    let handle = device.create_buffer(&storage(8), Some("Watched")).unwrap();
    let seen = Arc::new(Mutex::new(Vec::<Vec<u8>>::new()));
    let sink = seen.clone();
    let watch = BufferWatch::new(&handle, QueueType::Graphics, move |data| sink.lock().push(data.to_vec())).unwrap();
    assert!(watch.install().is_some());

    let buffer = handle.resource().unwrap();
    buffer.update_data(&[9u8; 8], 8, 0, 0).unwrap();
    device.submit_command_list(QueueType::Graphics).unwrap();
    buffer.update_data(&[4u8; 8], 8, 0, 0).unwrap();
    device.submit_command_list(QueueType::Graphics).unwrap();

    let seen = seen.lock();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], vec![9u8; 8]);
    assert_eq!(seen[1], vec![4u8; 8]);
}
