pub use self::device::*;
pub use self::command::*;
pub use self::buffer::*;
pub use self::format::*;
pub use self::pipeline::*;
pub use self::texture::*;
pub use self::sync::*;
pub use self::queue::*;
pub use self::backend::*;
pub use self::state::*;
pub use self::error::*;
pub use self::shader_metadata::*;

mod device;
mod command;
mod buffer;
mod format;
mod pipeline;
mod texture;
mod backend;
mod sync;
mod queue;
mod state;
mod error;
mod shader_metadata;
