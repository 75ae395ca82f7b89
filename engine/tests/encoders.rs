use std::collections::HashMap;
use std::sync::Arc;

use kiln_engine::gpu::{
    BindingKind,
    BindingSlot,
    BufferUsage,
    DepthStencilInfo,
    DrawIndexedIndirectArguments,
    Format,
    IndexFormat,
    PrimitiveType,
    QueueType,
    RasterizerInfo,
    ResourceState,
    ResourceType,
    SampleCount,
    SamplerInfo,
    ShaderType,
    TextureSubresource,
    TextureUsage,
};
use kiln_engine::{
    BufferBindingDesc,
    BufferDesc,
    ColorAttachment,
    DeviceError,
    DeviceSettings,
    GraphicsEncoderDesc,
    GraphicsPipeline,
    GraphicsPipelineDesc,
    Handle,
    LoadOp,
    ResourceBindingsDesc,
    SubmitHook,
    TextureBindingDesc,
    TextureSource,
};
use kiln_software::{JournalEntry, SoftwareBackend};
use parking_lot::Mutex;

mod common;

use common::TestDevice;

const TOP_MIP: TextureSubresource = TextureSubresource { array_layer: 0, mip_level: 0 };

fn pipeline(device: &TestDevice, fragment_parameters: Vec<kiln_engine::gpu::RootParameter>, vertex_attributes: bool) -> Handle<GraphicsPipeline<SoftwareBackend>> {
    let vertex_parameters = if fragment_parameters.is_empty() {
        Vec::new()
    } else {
        vec![common::parameter("constants", BindingSlot::ConstantValues, BindingKind::Constant, ResourceType::Buffer)]
    };
    let attributes = if vertex_attributes { vec![common::position_attribute()] } else { Vec::new() };
    let vs = common::shader(device, ShaderType::VertexShader, vertex_parameters, attributes);
    let fs = common::shader(device, ShaderType::FragmentShader, fragment_parameters, Vec::new());
    let program = device.create_shader_program(&[&vs, &fs], Some("Program")).unwrap();
    device.create_graphics_pipeline(&GraphicsPipelineDesc {
        program: &program,
        shader_inputs: &[],
        input_assembler: &[],
        rasterizer: RasterizerInfo::default(),
        depth_stencil: DepthStencilInfo::default(),
        primitive_type: PrimitiveType::Triangles,
        render_target_formats: &[Format::RGBA8UNorm],
        depth_stencil_format: None,
    }, Some("Pipeline")).unwrap()
}

fn textured_parameters() -> Vec<kiln_engine::gpu::RootParameter> {
    vec![
        common::parameter("constants", BindingSlot::ConstantValues, BindingKind::Constant, ResourceType::Buffer),
        common::parameter("albedo", BindingSlot::Index(0), BindingKind::ReadOnly, ResourceType::Texture),
        common::parameter("albedo_sampler", BindingSlot::Index(0), BindingKind::ReadOnly, ResourceType::Sampler),
    ]
}

fn render_target(device: &TestDevice) -> Handle<kiln_engine::Texture<SoftwareBackend>> {
    device.create_texture(&common::texture_info(Format::RGBA8UNorm, 4, 4, TextureUsage::RENDER_TARGET), Some("Target")).unwrap()
}

fn buffer(device: &TestDevice, data: &[u8], usage: BufferUsage) -> Handle<kiln_engine::Buffer<SoftwareBackend>> {
    let handle = device.create_buffer(&BufferDesc { size: data.len() as u64, usage }, None).unwrap();
    assert!(handle.resource().unwrap().update_data(data, data.len() as u64, 0, 0).unwrap());
    handle
}

struct TexturedScene {
    pipeline: Handle<GraphicsPipeline<SoftwareBackend>>,
    vertices: Handle<kiln_engine::Buffer<SoftwareBackend>>,
    albedo: Handle<kiln_engine::Texture<SoftwareBackend>>,
    sampler: Handle<kiln_engine::Sampler<SoftwareBackend>>,
}

fn textured_scene(device: &TestDevice) -> TexturedScene {
    let albedo = device.create_texture(&common::texture_info(Format::RGBA8UNorm, 2, 2, TextureUsage::SAMPLED), Some("Albedo")).unwrap();
    albedo.resource().unwrap().update_data(&[128u8; 16]).unwrap();
    TexturedScene {
        pipeline: pipeline(device, textured_parameters(), true),
        vertices: buffer(device, &[0u8; 36], BufferUsage::VERTEX),
        albedo,
        sampler: device.create_sampler(&SamplerInfo::default()).unwrap(),
    }
}

#[test]
fn draw_transitions_and_binds_everything() {
    let (native, device) = common::device();
    let target = render_target(&device);
    let scene = textured_scene(&device);
    let textures = [TextureBindingDesc {
        slot: 0,
        name: "albedo",
        texture: TextureSource::Texture(&scene.albedo),
        sampler: Some(&scene.sampler),
    }];
    let bindings = device.create_resource_bindings(&ResourceBindingsDesc {
        buffers: &[],
        textures: &textures,
    }).unwrap();

    let attachments = [ColorAttachment {
        texture: &target,
        resolve_target: None,
        load_op: LoadOp::Clear([1.0f32, 0.0f32, 0.0f32, 1.0f32]),
    }];
    let mut encoder = device.create_graphics_encoder(&GraphicsEncoderDesc {
        color_attachments: &attachments,
        depth_attachment: None,
    }).unwrap();
    encoder.bind_pipeline(&scene.pipeline);
    encoder.bind_resources(&bindings);
    encoder.set_constant_values(&[1u8; 20]);
    encoder.bind_vertex_buffers(0, &[(&scene.vertices, 0, 12)]);
    encoder.draw(3, 1, 0, 0);
    assert!(encoder.submit().unwrap());

    let stats = native.stats();
    assert_eq!(stats.draws, 1);
    assert_eq!(stats.validation_errors, 0);
    let journal = native.journal(QueueType::Graphics);
    assert!(journal.contains(&JournalEntry::Draw { vertices: 3, instances: 1 }));
    assert!(journal.iter().any(|entry| matches!(entry, JournalEntry::ClearRenderTarget { .. })));

    assert_eq!(scene.albedo.resource().unwrap().current_state(), ResourceState::ALL_SHADER_RESOURCE);
    assert_eq!(scene.vertices.resource().unwrap().current_state(), ResourceState::VERTEX_AND_CONSTANT_BUFFER);
    let contents = target.resource().unwrap().handle().subresource_contents(TOP_MIP).unwrap();
    assert!(contents.chunks_exact(4).all(|texel| texel == [255, 0, 0, 255]));
}

#[test]
fn draw_with_unbound_parameter_is_skipped() {
    let (native, device) = common::device();
    let target = render_target(&device);
    let scene = textured_scene(&device);

    let attachments = [ColorAttachment { texture: &target, resolve_target: None, load_op: LoadOp::Load }];
    let mut encoder = device.create_graphics_encoder(&GraphicsEncoderDesc {
        color_attachments: &attachments,
        depth_attachment: None,
    }).unwrap();
    encoder.bind_pipeline(&scene.pipeline);
    encoder.bind_vertex_buffers(0, &[(&scene.vertices, 0, 12)]);
    encoder.draw(3, 1, 0, 0);
    encoder.submit().unwrap();

    assert_eq!(native.stats().draws, 0);
    assert_eq!(native.stats().validation_errors, 0);
}

#[test]
fn draw_without_vertex_buffer_is_skipped() {
    let (native, device) = common::device();
    let target = render_target(&device);
    let pipeline = pipeline(&device, Vec::new(), true);

    let attachments = [ColorAttachment { texture: &target, resolve_target: None, load_op: LoadOp::Load }];
    let mut encoder = device.create_graphics_encoder(&GraphicsEncoderDesc {
        color_attachments: &attachments,
        depth_attachment: None,
    }).unwrap();
    encoder.bind_pipeline(&pipeline);
    encoder.draw(3, 1, 0, 0);
    encoder.submit().unwrap();

    assert_eq!(native.stats().draws, 0);
    assert_eq!(native.stats().validation_errors, 0);
}

#[test]
fn bindings_fall_back_to_configured_slots() {
    let mut binding_fallbacks = HashMap::new();
    binding_fallbacks.insert("albedo".to_string(), 0u32);
    let (native, device) = common::device_with(DeviceSettings {
        binding_fallbacks,
        ..DeviceSettings::default()
    });
    let target = render_target(&device);
    let scene = textured_scene(&device);
    let textures = [TextureBindingDesc {
        slot: 5,
        name: "albedo",
        texture: TextureSource::Texture(&scene.albedo),
        sampler: Some(&scene.sampler),
    }];
    let bindings = device.create_resource_bindings(&ResourceBindingsDesc {
        buffers: &[],
        textures: &textures,
    }).unwrap();

    let attachments = [ColorAttachment { texture: &target, resolve_target: None, load_op: LoadOp::Load }];
    let mut encoder = device.create_graphics_encoder(&GraphicsEncoderDesc {
        color_attachments: &attachments,
        depth_attachment: None,
    }).unwrap();
    encoder.bind_pipeline(&scene.pipeline);
    encoder.bind_resources(&bindings);
    encoder.set_constant_values(&[0u8; 4]);
    encoder.bind_vertex_buffers(0, &[(&scene.vertices, 0, 12)]);
    encoder.draw(3, 1, 0, 0);
    encoder.submit().unwrap();

    assert_eq!(device.stats().fallback_bindings, 2);
    assert_eq!(native.stats().draws, 1);
    assert_eq!(native.stats().validation_errors, 0);
}

#[test]
fn batched_draws_share_one_submission() {
    let (native, device) = common::device_with(DeviceSettings {
        submit_each_draw: false,
        ..DeviceSettings::default()
    });
    let target = render_target(&device);
    let pipeline = pipeline(&device, Vec::new(), false);
    let before = device.stats().submissions[QueueType::Graphics.index()];

    let attachments = [ColorAttachment { texture: &target, resolve_target: None, load_op: LoadOp::Clear([0.0f32; 4]) }];
    let mut encoder = device.create_graphics_encoder(&GraphicsEncoderDesc {
        color_attachments: &attachments,
        depth_attachment: None,
    }).unwrap();
    encoder.bind_pipeline(&pipeline);
    for _ in 0..4 {
        encoder.draw(6, 2, 0, 0);
    }
    assert!(encoder.submit().unwrap());

    assert_eq!(device.stats().submissions[QueueType::Graphics.index()], before + 1);
    assert_eq!(native.stats().draws, 4);
}

fn indirect_arguments(draws: &[DrawIndexedIndirectArguments]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for draw in draws {
        bytes.extend_from_slice(&draw.index_count.to_le_bytes());
        bytes.extend_from_slice(&draw.instance_count.to_le_bytes());
        bytes.extend_from_slice(&draw.first_index.to_le_bytes());
        bytes.extend_from_slice(&draw.vertex_offset.to_le_bytes());
        bytes.extend_from_slice(&draw.first_instance.to_le_bytes());
    }
    bytes
}

#[test]
fn indirect_draws_reuse_the_command_signature() {
    let (native, device) = common::device();
    let target = render_target(&device);
    let pipeline = pipeline(&device, Vec::new(), false);
    let indices: Vec<u8> = [0u32, 1, 2].iter().flat_map(|i| i.to_le_bytes()).collect();
    let index_buffer = buffer(&device, &indices, BufferUsage::INDEX);
    let draw = DrawIndexedIndirectArguments { index_count: 3, instance_count: 1, ..Default::default() };
    let arguments = buffer(&device, &indirect_arguments(&[draw, draw]), BufferUsage::INDIRECT);

    let attachments = [ColorAttachment { texture: &target, resolve_target: None, load_op: LoadOp::Load }];
    let mut encoder = device.create_graphics_encoder(&GraphicsEncoderDesc {
        color_attachments: &attachments,
        depth_attachment: None,
    }).unwrap();
    encoder.bind_pipeline(&pipeline);
    encoder.bind_index_buffer(&index_buffer, 0, IndexFormat::U32);
    encoder.draw_indexed_indirect(&arguments, 0, 2, 20);
    encoder.draw_indexed_indirect(&arguments, 0, 2, 20);
    encoder.draw_indexed_indirect(&arguments, 0, 1, 40);
    assert!(encoder.submit().unwrap());

    assert_eq!(device.stats().command_signature_builds, 2);
    assert_eq!(native.stats().command_signatures_created, 2);
    assert_eq!(native.stats().draws, 5);
    assert_eq!(native.stats().validation_errors, 0);
    assert_eq!(arguments.resource().unwrap().current_state(), ResourceState::INDIRECT_ARGUMENT);
    assert_eq!(index_buffer.resource().unwrap().current_state(), ResourceState::INDEX_BUFFER);

    let signature = device.command_signature(40).unwrap();
    assert!(Arc::ptr_eq(&signature, &device.command_signature(40).unwrap()));
    assert!(matches!(device.command_signature(4), Err(DeviceError::Native(_))));
}

#[test]
fn compute_transitions_run_on_the_graphics_queue() {
    let (native, device) = common::device();
    let cs = common::shader(&device, ShaderType::ComputeShader, vec![
        common::parameter("params", BindingSlot::ConstantValues, BindingKind::Constant, ResourceType::Buffer),
        common::parameter("output", BindingSlot::Index(1), BindingKind::ReadWrite, ResourceType::Buffer),
    ], Vec::new());
    let program = device.create_shader_program(&[&cs], Some("Compute")).unwrap();
    let pipeline = device.create_compute_pipeline(&program, Some("Compute")).unwrap();
    let output = device.create_buffer(&BufferDesc { size: 64, usage: BufferUsage::STORAGE }, Some("Output")).unwrap();
    let buffers = [BufferBindingDesc {
        slot: 1,
        name: "output",
        buffer: &output,
        offset: 0,
    }];
    let bindings = device.create_resource_bindings(&ResourceBindingsDesc {
        buffers: &buffers,
        textures: &[],
    }).unwrap();

    let mut encoder = device.create_compute_encoder();
    encoder.bind_pipeline(&pipeline);
    encoder.bind_resources(&bindings);
    encoder.set_constant_values(&[1, 2, 3, 4]);
    encoder.dispatch(4, 1, 1);
    encoder.dispatch(2, 2, 1);
    assert!(encoder.submit().unwrap());

    let output_id = output.resource().unwrap().handle().id();
    let graphics = native.journal(QueueType::Graphics);
    assert!(graphics.contains(&JournalEntry::Barrier {
        resource: output_id,
        before: ResourceState::COPY_DEST,
        after: ResourceState::UNORDERED_ACCESS,
    }));
    let compute = native.journal(QueueType::Compute);
    assert!(!compute.iter().any(|entry| matches!(entry, JournalEntry::Barrier { .. })));
    assert!(compute.contains(&JournalEntry::Dispatch { x: 4, y: 1, z: 1 }));
    assert!(compute.contains(&JournalEntry::Dispatch { x: 2, y: 2, z: 1 }));

    // The second dispatch needs no new transitions.
    assert_eq!(device.stats().submissions[QueueType::Graphics.index()], 1);
    assert_eq!(device.stats().submissions[QueueType::Compute.index()], 2);
    assert_eq!(output.resource().unwrap().current_state(), ResourceState::UNORDERED_ACCESS);
    assert_eq!(native.stats().validation_errors, 0);
}

#[test]
fn multisampled_attachments_are_resolved() {
    let (native, device) = common::device();
    let mut msaa_info = common::texture_info(Format::RGBA8UNorm, 4, 4, TextureUsage::RENDER_TARGET);
    msaa_info.samples = SampleCount::Samples4;
    let msaa = device.create_texture(&msaa_info, Some("Multisampled")).unwrap();
    let resolved = device.create_texture(&common::texture_info(Format::RGBA8UNorm, 4, 4, TextureUsage::RESOLVE_DST | TextureUsage::SAMPLED), Some("Resolved")).unwrap();
    let pipeline = pipeline(&device, Vec::new(), false);

    let attachments = [ColorAttachment {
        texture: &msaa,
        resolve_target: Some(&resolved),
        load_op: LoadOp::Clear([0.0f32, 1.0f32, 0.0f32, 1.0f32]),
    }];
    let mut encoder = device.create_graphics_encoder(&GraphicsEncoderDesc {
        color_attachments: &attachments,
        depth_attachment: None,
    }).unwrap();
    encoder.bind_pipeline(&pipeline);
    encoder.draw(3, 1, 0, 0);
    assert!(encoder.submit().unwrap());

    assert_eq!(native.stats().resolves, 1);
    assert_eq!(native.stats().validation_errors, 0);
    assert_eq!(resolved.resource().unwrap().current_state(), ResourceState::RESOLVE_DEST);
    let contents = resolved.resource().unwrap().handle().subresource_contents(TOP_MIP).unwrap();
    assert!(contents.chunks_exact(4).all(|texel| texel == [0, 255, 0, 255]));
}

#[test]
fn invalid_attachments_are_rejected() {
    let (_native, device) = common::device();
    let depth = device.create_texture(&common::texture_info(Format::D32, 4, 4, TextureUsage::DEPTH_STENCIL), None).unwrap();
    let color = render_target(&device);
    let other = render_target(&device);

    let attachments = [ColorAttachment { texture: &depth, resolve_target: None, load_op: LoadOp::Load }];
    let result = device.create_graphics_encoder(&GraphicsEncoderDesc { color_attachments: &attachments, depth_attachment: None });
    assert!(matches!(result, Err(DeviceError::InvalidDescriptor(_))));

    let attachments = [ColorAttachment { texture: &color, resolve_target: Some(&other), load_op: LoadOp::Load }];
    let result = device.create_graphics_encoder(&GraphicsEncoderDesc { color_attachments: &attachments, depth_attachment: None });
    assert!(matches!(result, Err(DeviceError::InvalidDescriptor(_))));
}

/// Remembers the queue of every real submission in order.
#[derive(Default)]
struct SubmissionOrder(Mutex<Vec<QueueType>>);

impl SubmitHook for SubmissionOrder {
    fn after_submit(&self, queue_type: QueueType) -> Result<(), DeviceError> {
        self.0.lock().push(queue_type);
        Ok(())
    }
}

/// A compute pipeline writing `output` and the bindings for it.
fn output_dispatch(device: &TestDevice, output: &Handle<kiln_engine::Buffer<SoftwareBackend>>) -> (Handle<kiln_engine::ComputePipeline<SoftwareBackend>>, Handle<kiln_engine::ResourceBindings<SoftwareBackend>>) {
    let cs = common::shader(device, ShaderType::ComputeShader, vec![
        common::parameter("output", BindingSlot::Index(1), BindingKind::ReadWrite, ResourceType::Buffer),
    ], Vec::new());
    let program = device.create_shader_program(&[&cs], Some("Compute")).unwrap();
    let pipeline = device.create_compute_pipeline(&program, Some("Compute")).unwrap();
    let buffers = [BufferBindingDesc {
        slot: 1,
        name: "output",
        buffer: output,
        offset: 0,
    }];
    let bindings = device.create_resource_bindings(&ResourceBindingsDesc {
        buffers: &buffers,
        textures: &[],
    }).unwrap();
    (pipeline, bindings)
}

#[test]
fn compute_waits_for_recorded_graphics_work() {
    let (native, device) = common::device();
    let order = Arc::new(SubmissionOrder::default());
    device.set_submit_hook(Some(order.clone()));
    let output = device.create_buffer(&BufferDesc { size: 16, usage: BufferUsage::STORAGE }, Some("Output")).unwrap();
    let (pipeline, bindings) = output_dispatch(&device, &output);

    // Recorded on the graphics list but not submitted yet.
    output.resource().unwrap().update_data(&[6u8; 16], 16, 0, 0).unwrap();

    let mut encoder = device.create_compute_encoder();
    encoder.bind_pipeline(&pipeline);
    encoder.bind_resources(&bindings);
    encoder.dispatch(1, 1, 1);
    assert!(encoder.submit().unwrap());

    assert_eq!(*order.0.lock(), vec![QueueType::Graphics, QueueType::Graphics, QueueType::Compute]);
    let graphics = native.journal(QueueType::Graphics);
    let copy = graphics.iter().position(|entry| matches!(entry, JournalEntry::CopyBuffer { .. })).unwrap();
    let transition = graphics.iter().position(|entry| matches!(entry, JournalEntry::Barrier { after, .. } if *after == ResourceState::UNORDERED_ACCESS)).unwrap();
    assert!(copy < transition);
    assert!(native.journal(QueueType::Compute).contains(&JournalEntry::Dispatch { x: 1, y: 1, z: 1 }));
    assert_eq!(native.stats().validation_errors, 0);

    let mut read = [0u8; 16];
    assert!(output.resource().unwrap().read_data(0, &mut read).unwrap());
    assert_eq!(read, [6u8; 16]);
}

#[test]
fn dispatch_is_dropped_when_its_transitions_can_not_be_recorded() {
    let (native, device) = common::device();
    let output = device.create_buffer(&BufferDesc { size: 16, usage: BufferUsage::STORAGE }, Some("Output")).unwrap();
    let (pipeline, bindings) = output_dispatch(&device, &output);
    output.resource().unwrap().update_data(&[1u8; 16], 16, 0, 0).unwrap();
    device.submit_command_list(QueueType::Graphics).unwrap();

    native.fail_next_command_list_reset();
    let mut encoder = device.create_compute_encoder();
    encoder.bind_pipeline(&pipeline);
    encoder.bind_resources(&bindings);
    encoder.dispatch(1, 1, 1);
    assert!(!encoder.submit().unwrap());

    assert!(native.journal(QueueType::Compute).is_empty());
    assert_eq!(native.stats().dispatches, 0);
    assert_eq!(native.stats().validation_errors, 0);
    assert_eq!(device.stats().submissions, [1, 0, 0]);
    assert_eq!(device.stats().skipped_operations, 1);
    assert_eq!(output.resource().unwrap().current_state(), ResourceState::COPY_DEST);
    assert!(!device.is_lost());
}

#[test]
fn pass_is_dropped_when_its_attachments_can_not_be_prepared() {
    let (native, device) = common::device();
    let target = render_target(&device);
    let pipeline = pipeline(&device, Vec::new(), false);
    buffer(&device, &[0u8; 16], BufferUsage::STORAGE);
    device.submit_command_list(QueueType::Graphics).unwrap();
    let executed = native.stats().command_lists_executed;

    native.fail_next_command_list_reset();
    let attachments = [ColorAttachment {
        texture: &target,
        resolve_target: None,
        load_op: LoadOp::Clear([1.0f32; 4]),
    }];
    let mut encoder = device.create_graphics_encoder(&GraphicsEncoderDesc {
        color_attachments: &attachments,
        depth_attachment: None,
    }).unwrap();
    encoder.bind_pipeline(&pipeline);
    encoder.draw(3, 1, 0, 0);
    encoder.draw(3, 1, 0, 0);
    assert!(!encoder.submit().unwrap());

    assert_eq!(native.stats().command_lists_executed, executed);
    assert_eq!(native.stats().draws, 0);
    assert_eq!(native.stats().validation_errors, 0);
    assert!(!native.journal(QueueType::Graphics).iter().any(|entry| matches!(entry, JournalEntry::ClearRenderTarget { .. })));
    assert_eq!(device.stats().skipped_operations, 1);
}
