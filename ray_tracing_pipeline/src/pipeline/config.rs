//! Ray tracing pipeline configuration

use std::path::PathBuf;
use crate::device::PushConstantRange;
use crate::pipeline::ShaderGroupTable;

/// Construction-time configuration of a [`RayTracingPipeline`](crate::pipeline::RayTracingPipeline)
#[derive(Debug, Clone)]
pub struct RayTracingPipelineConfig {
    /// Directory the default file loader reads SPIR-V from
    pub shader_directory: PathBuf,

    /// Shader stages and tagged shader groups
    pub shader_table: ShaderGroupTable,

    /// Maximum trace recursion depth (1 = primary rays only trace, no recursion from hit shaders)
    pub max_ray_recursion_depth: u32,

    /// Push constant ranges added to the pipeline layout
    pub push_constant_ranges: Vec<PushConstantRange>,

    /// Prefix for driver debug names
    pub debug_name: String,

    /// Check each shader's declared bindings against the descriptor layout
    /// (default: enabled in debug builds)
    pub validate_shader_interface: bool,
}

impl Default for RayTracingPipelineConfig {
    fn default() -> Self {
        Self {
            shader_directory: PathBuf::from("assets/shaders"),
            shader_table: ShaderGroupTable::default(),
            max_ray_recursion_depth: 1,
            push_constant_ranges: Vec::new(),
            debug_name: "RayTracingPipeline".to_string(),
            validate_shader_interface: cfg!(debug_assertions),
        }
    }
}
