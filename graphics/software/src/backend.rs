use kiln_core::gpu::GPUBackend;

use super::*;

pub enum SoftwareBackend {}

impl GPUBackend for SoftwareBackend {
    type Device = SoftwareDevice;
    type Queue = SoftwareQueue;
    type CommandPool = SoftwareCommandPool;
    type CommandBuffer = SoftwareCommandBuffer;
    type Fence = SoftwareFence;
    type Buffer = SoftwareBuffer;
    type Texture = SoftwareTexture;
    type Sampler = SoftwareSampler;
    type Shader = SoftwareShader;
    type GraphicsPipeline = SoftwareGraphicsPipeline;
    type ComputePipeline = SoftwareComputePipeline;
    type CommandSignature = SoftwareCommandSignature;

    fn name() -> &'static str {
        "Software"
    }
}
