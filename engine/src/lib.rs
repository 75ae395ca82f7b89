//! GPU command submission and resource state engine.
//!
//! Work is recorded through encoders, replayed onto one of three native queues at submit
//! time and fenced before the submitting thread continues. Every buffer and texture tracks
//! its own access state, so barriers are inserted only where the state actually changes.

pub mod graphics;

pub use graphics::*;
