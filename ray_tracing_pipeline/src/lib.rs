/*!
# Ray Tracing Pipeline

Construction and ownership of a hardware ray tracing pipeline for a real-time
renderer.

This crate is backend-agnostic: it talks to the GPU through the
[`RayTracingDevice`](rtp::device::RayTracingDevice) trait, implemented by
backend crates (`ray_tracing_pipeline_vulkan` for Vulkan).

## Architecture

- **ShaderGroupTable**: ordered shader stages and role-tagged shader groups
- **DescriptorSetManager**: binding slots, exact-size pool, one set per frame
- **PipelineLayout**: descriptor set layout plus push constant ranges
- **RayTracingPipeline**: the compiled pipeline, owning all of the above
- **ShaderBindingTableLayout**: SBT regions for the dispatch layer

The acceleration structure, images, uniform buffers, scene buffers and light
probe buffers are built elsewhere; the pipeline only binds them.
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod device;
pub mod scene;
pub mod pipeline;

// Main rtp namespace module
pub mod rtp {
    // Error types
    pub use crate::error::{Error, Result};

    // Logging hub
    pub use crate::engine::Engine;

    // Main component
    pub use crate::pipeline::{RayTracingPipeline, RayTracingPipelineDesc, RayTracingPipelineConfig};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Device abstraction sub-module
    pub mod device {
        pub use crate::device::*;
    }

    // Scene inputs sub-module
    pub mod scene {
        pub use crate::scene::*;
    }

    // Pipeline construction sub-module
    pub mod pipeline {
        pub use crate::pipeline::*;
    }
}

// Re-export math library at crate root
pub use glam;
