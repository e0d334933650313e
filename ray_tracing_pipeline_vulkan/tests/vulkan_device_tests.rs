//! GPU tests for VulkanRayTracingDevice
//!
//! These tests verify that VulkanRayTracingDevice correctly implements the
//! RayTracingDevice trait against a real driver.
//! All tests require a GPU with VK_KHR_ray_tracing_pipeline and are marked with #[ignore].
//!
//! Run with: cargo test --test vulkan_device_tests -- --ignored

use ray_tracing_pipeline::rtp::Error;
use ray_tracing_pipeline::rtp::device::{
    BindingFrequency, DebugObject, DescriptorBinding, DescriptorPoolSize, DescriptorType,
    PushConstantRange, RayTracingDevice, ShaderModuleDesc, ShaderStageFlags, ShaderStageKind,
};
use ray_tracing_pipeline_vulkan::rtp::{VulkanContext, VulkanContextConfig};

fn create_context() -> VulkanContext {
    VulkanContext::new(VulkanContextConfig::default()).unwrap()
}

fn binding(binding: u32, descriptor_type: DescriptorType, count: u32) -> DescriptorBinding {
    DescriptorBinding {
        binding,
        descriptor_type,
        count,
        stages: ShaderStageFlags::ALL_RAY_TRACING,
        frequency: BindingFrequency::Shared,
    }
}

// ============================================================================
// DEVICE LIMITS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_shader_group_handle_properties() {
    let context = create_context();
    let device = context.ray_tracing_device();

    let properties = device.shader_group_handle_properties();

    assert!(properties.handle_size > 0);
    assert!(properties.handle_alignment.is_power_of_two());
    assert!(properties.base_alignment.is_power_of_two());
    assert!(properties.max_ray_recursion_depth >= 1);
}

// ============================================================================
// DESCRIPTORS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_descriptor_set_lifecycle() {
    let context = create_context();
    let device = context.ray_tracing_device();

    let bindings = [
        binding(0, DescriptorType::AccelerationStructure, 1),
        binding(1, DescriptorType::StorageImage, 1),
        binding(3, DescriptorType::UniformBuffer, 1),
        // reserved slot with no descriptors
        binding(9, DescriptorType::StorageBuffer, 0),
    ];
    let layout = device.create_descriptor_set_layout(&bindings).unwrap();
    assert!(!layout.is_null());

    let pool_sizes = [
        DescriptorPoolSize { descriptor_type: DescriptorType::AccelerationStructure, count: 2 },
        DescriptorPoolSize { descriptor_type: DescriptorType::StorageImage, count: 2 },
        DescriptorPoolSize { descriptor_type: DescriptorType::UniformBuffer, count: 2 },
    ];
    let pool = device.create_descriptor_pool(&pool_sizes, 2).unwrap();

    let sets = device.allocate_descriptor_sets(pool, layout, 2).unwrap();
    assert_eq!(sets.len(), 2);
    assert_ne!(sets[0], sets[1]);

    device.set_debug_name(DebugObject::DescriptorPool(pool), "test.descriptor_pool");

    device.destroy_descriptor_pool(pool);
    device.destroy_descriptor_set_layout(layout);
}

// ============================================================================
// PIPELINE LAYOUT
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_pipeline_layout_with_push_constants() {
    let context = create_context();
    let device = context.ray_tracing_device();

    let set_layout = device
        .create_descriptor_set_layout(&[binding(0, DescriptorType::AccelerationStructure, 1)])
        .unwrap();
    let ranges = [PushConstantRange {
        stages: ShaderStageFlags::RAYGEN | ShaderStageFlags::CLOSEST_HIT,
        offset: 0,
        size: 16,
    }];

    let layout = device.create_pipeline_layout(&[set_layout], &ranges).unwrap();
    assert!(!layout.is_null());

    device.destroy_pipeline_layout(layout);
    device.destroy_descriptor_set_layout(set_layout);
}

// ============================================================================
// SHADER MODULES
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_rejects_invalid_spirv_when_validating() {
    let context = create_context();
    let device = context.ray_tracing_device();

    let code = [0x0723_0203_u32, 0x0001_0000, 0, 1, 0, 0xdead_beef];
    let desc = ShaderModuleDesc {
        name: "broken.rgen.spv",
        code: &code,
        stage: ShaderStageKind::RayGeneration,
        entry_point: "main",
        bindings: &[],
        validate_interface: true,
    };

    let result = device.create_shader_module(&desc);
    assert!(matches!(result, Err(Error::ShaderLoadFailed(msg)) if msg.starts_with("broken.rgen.spv")));
}
