//! CPU implementation of the native GPU interface.
//!
//! Command lists are recorded into plain command vectors and executed on the calling thread
//! when they are handed to a queue. Every barrier is validated against the state the resource
//! is actually in, and every executed command is appended to a per queue journal so tests
//! can observe exactly what reached the "hardware".

pub use self::{
    backend::*,
    device::*,
    buffer::*,
    queue::*,
    texture::*,
    sync::*,
    command::*,
    pipeline::*,
    journal::*,
};

mod backend;
mod device;
mod buffer;
mod memory;
mod queue;
mod texture;
mod sync;
mod command;
mod pipeline;
mod journal;
