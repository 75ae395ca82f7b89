#![allow(dead_code)]

use std::sync::Arc;

use kiln_engine::gpu::{
    BindingKind,
    BindingSlot,
    Format,
    ResourceType,
    RootParameter,
    SampleCount,
    ShaderReflection,
    ShaderType,
    TextureInfo,
    TextureUsage,
    VertexAttribute,
};
use kiln_engine::{Device, DeviceSettings, Handle, ShaderFunction, ShaderFunctionDesc};
use kiln_software::{SoftwareBackend, SoftwareDevice};

pub type TestDevice = Arc<Device<SoftwareBackend>>;

pub fn init_logging() {
    let _ = simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Warn)
        .init();
}

/// Returns the native device next to the wrapping one so tests can inspect journals and stats.
pub fn device_with(settings: DeviceSettings) -> (SoftwareDevice, TestDevice) {
    init_logging();
    let native = SoftwareDevice::new();
    let device = Device::<SoftwareBackend>::new(native.clone(), settings).unwrap();
    (native, device)
}

pub fn device() -> (SoftwareDevice, TestDevice) {
    device_with(DeviceSettings::default())
}

pub fn texture_info(format: Format, width: u32, height: u32, usage: TextureUsage) -> TextureInfo {
    TextureInfo {
        format,
        width,
        height,
        mip_levels: 1,
        array_length: 1,
        samples: SampleCount::Samples1,
        usage,
    }
}

pub fn parameter(name: &str, slot: BindingSlot, kind: BindingKind, resource_type: ResourceType) -> RootParameter {
    RootParameter {
        name: name.to_string(),
        slot,
        kind,
        resource_type,
        register: 0,
        space: 0,
    }
}

pub fn position_attribute() -> VertexAttribute {
    VertexAttribute {
        semantic_name: "POSITION".to_string(),
        semantic_index: 0,
        location: 0,
        format: Format::RGB32Float,
    }
}

pub fn shader(device: &TestDevice, shader_type: ShaderType, parameters: Vec<RootParameter>, vertex_attributes: Vec<VertexAttribute>) -> Handle<ShaderFunction<SoftwareBackend>> {
    device.create_shader_function(&ShaderFunctionDesc {
        shader_type,
        bytecode: &[0x44, 0x58, 0x42, 0x43],
        reflection: Some(ShaderReflection {
            shader_type,
            parameters,
            vertex_attributes,
        }),
        name: Some("TestShader"),
    }).unwrap()
}
