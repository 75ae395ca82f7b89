pub use device::*;
pub use texture::*;
pub use buffer::*;
pub use sampler::*;
pub use queue::*;
pub use state::*;
pub use error::*;
pub use settings::*;
pub use handle::*;
pub use shader::*;
pub use pipeline::*;
pub use binding::*;
pub use watch::*;
pub use encoder::*;
use destroyer::*;

mod device;
mod texture;
mod buffer;
mod destroyer;
mod sampler;
mod queue;
mod state;
mod error;
mod settings;
mod handle;
mod shader;
mod pipeline;
mod binding;
mod watch;
mod encoder;

pub use kiln_core::gpu;
