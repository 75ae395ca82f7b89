//! Backend independent description of the native GPU interface.

pub mod gpu;
