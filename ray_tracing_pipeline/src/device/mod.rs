//! Device abstraction
//!
//! Backend-agnostic vocabulary for the GPU objects the ray tracing pipeline
//! creates, plus the [`RayTracingDevice`] and [`SwapChain`] traits implemented
//! by the backend crate.

pub mod handles;
pub mod shader;
pub mod descriptor;
pub mod ray_tracing_device;
pub mod swap_chain;

#[cfg(test)]
pub mod mock_device;

pub use handles::*;
pub use shader::*;
pub use descriptor::*;
pub use ray_tracing_device::*;
pub use swap_chain::*;
