//! RayTracingDevice trait - the driver capability the pipeline is built against
//!
//! This is the device-level ray tracing function table: every GPU object the
//! pipeline creates or destroys goes through it. The Vulkan backend implements
//! it over `ash` and `VK_KHR_ray_tracing_pipeline`; unit tests use a recording
//! mock.

use crate::error::Result;
use crate::device::{
    DescriptorBinding, DescriptorPoolSize, DescriptorWrite, PushConstantRange,
    PipelineShaderStage, ShaderGroup, ShaderStageKind,
    DescriptorPoolHandle, DescriptorSetHandle, DescriptorSetLayoutHandle,
    PipelineHandle, PipelineLayoutHandle, ShaderModuleHandle,
};

/// Shader module creation descriptor
#[derive(Debug, Clone, Copy)]
pub struct ShaderModuleDesc<'a> {
    /// Name used for diagnostics (usually the SPIR-V file name)
    pub name: &'a str,
    /// SPIR-V words
    pub code: &'a [u32],
    /// Pipeline role of the module
    pub stage: ShaderStageKind,
    /// Entry point expected in the module
    pub entry_point: &'a str,
    /// Descriptor layout the module will be used with
    ///
    /// Backends that reflect SPIR-V check the module's declared bindings against it.
    pub bindings: &'a [DescriptorBinding],
    /// Reject modules whose interface disagrees with `bindings`
    pub validate_interface: bool,
}

/// Ray tracing pipeline creation descriptor
#[derive(Debug, Clone, Copy)]
pub struct RayTracingPipelineCreateDesc<'a> {
    /// Ordered shader stages (group slots index into this list)
    pub stages: &'a [PipelineShaderStage],
    /// Ordered shader groups (position is the group index)
    pub groups: &'a [ShaderGroup],
    /// Layout the pipeline is created against
    pub layout: PipelineLayoutHandle,
    /// Maximum trace recursion depth
    pub max_ray_recursion_depth: u32,
}

/// Driver limits relevant to shader binding table construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderGroupHandleProperties {
    /// Size in bytes of one opaque shader group handle
    pub handle_size: u32,
    /// Required alignment of each record inside a region
    pub handle_alignment: u32,
    /// Required alignment of each region's start address
    pub base_alignment: u32,
    /// Maximum supported trace recursion depth
    pub max_ray_recursion_depth: u32,
}

/// Object passed to [`RayTracingDevice::set_debug_name`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugObject {
    DescriptorSetLayout(DescriptorSetLayoutHandle),
    DescriptorPool(DescriptorPoolHandle),
    DescriptorSet(DescriptorSetHandle),
    PipelineLayout(PipelineLayoutHandle),
    Pipeline(PipelineHandle),
}

/// Device-level ray tracing capability
///
/// All methods take `&self`: driver calls are externally synchronized by the
/// single construction thread, and destruction happens in `Drop`.
pub trait RayTracingDevice: Send + Sync {
    /// Create a descriptor set layout covering `bindings`
    fn create_descriptor_set_layout(
        &self,
        bindings: &[DescriptorBinding],
    ) -> Result<DescriptorSetLayoutHandle>;

    fn destroy_descriptor_set_layout(&self, layout: DescriptorSetLayoutHandle);

    /// Create a descriptor pool with exact capacity
    fn create_descriptor_pool(
        &self,
        pool_sizes: &[DescriptorPoolSize],
        max_sets: u32,
    ) -> Result<DescriptorPoolHandle>;

    /// Destroy a descriptor pool, freeing every set allocated from it
    fn destroy_descriptor_pool(&self, pool: DescriptorPoolHandle);

    /// Allocate `count` sets of `layout` from `pool`
    ///
    /// # Errors
    ///
    /// `Error::DescriptorPoolExhausted` when the pool cannot satisfy the request.
    fn allocate_descriptor_sets(
        &self,
        pool: DescriptorPoolHandle,
        layout: DescriptorSetLayoutHandle,
        count: u32,
    ) -> Result<Vec<DescriptorSetHandle>>;

    /// Write resources into a descriptor set
    fn update_descriptor_set(&self, set: DescriptorSetHandle, writes: &[DescriptorWrite]);

    /// Create a pipeline layout
    fn create_pipeline_layout(
        &self,
        set_layouts: &[DescriptorSetLayoutHandle],
        push_constant_ranges: &[PushConstantRange],
    ) -> Result<PipelineLayoutHandle>;

    fn destroy_pipeline_layout(&self, layout: PipelineLayoutHandle);

    /// Create a shader module from SPIR-V
    fn create_shader_module(&self, desc: &ShaderModuleDesc<'_>) -> Result<ShaderModuleHandle>;

    fn destroy_shader_module(&self, module: ShaderModuleHandle);

    /// Compile a ray tracing pipeline
    fn create_ray_tracing_pipeline(
        &self,
        desc: &RayTracingPipelineCreateDesc<'_>,
    ) -> Result<PipelineHandle>;

    fn destroy_pipeline(&self, pipeline: PipelineHandle);

    /// Shader group handle size and alignment limits
    fn shader_group_handle_properties(&self) -> ShaderGroupHandleProperties;

    /// Fetch `group_count` opaque group handles starting at `first_group`
    fn get_shader_group_handles(
        &self,
        pipeline: PipelineHandle,
        first_group: u32,
        group_count: u32,
    ) -> Result<Vec<u8>>;

    /// Attach a debug name to an object (no-op unless the backend supports it)
    fn set_debug_name(&self, _object: DebugObject, _name: &str) {}
}
