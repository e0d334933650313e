//! Ray tracing pipeline construction

pub mod config;
pub mod shader_loader;
pub mod shader_table;
pub mod descriptor_binder;
pub mod pipeline_layout;
pub mod shader_binding_table;
pub mod ray_tracing_pipeline;

pub use config::RayTracingPipelineConfig;
pub use shader_loader::{ShaderLoader, FileShaderLoader, MemoryShaderLoader, spirv_words, SPIRV_MAGIC};
pub use shader_table::{
    ShaderStageDesc, GroupRole, TaggedShaderGroup, ShaderGroupIndices, ShaderGroupTable,
};
pub use descriptor_binder::{binding_slot, PipelineResources, DescriptorSetManager};
pub use pipeline_layout::PipelineLayout;
pub use shader_binding_table::{ShaderBindingTableLayout, ShaderBindingTableRegion};
pub use ray_tracing_pipeline::{RayTracingPipeline, RayTracingPipelineDesc};
