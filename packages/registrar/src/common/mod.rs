// Common types shared between the kernel and domain layers

pub mod types;

pub use types::*;
