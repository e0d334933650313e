/*!
# Ray Tracing Pipeline - Vulkan Backend

Vulkan implementation of the `ray_tracing_pipeline` device abstraction.

This crate provides [`VulkanRayTracingDevice`](rtp::VulkanRayTracingDevice), which
implements the `RayTracingDevice` trait over Ash and `VK_KHR_ray_tracing_pipeline`,
with SPIR-V interface validation through spirq. A headless
[`VulkanContext`](rtp::VulkanContext) is available for tools and GPU tests.

# Example

```no_run
use std::sync::Arc;
use ash::vk;
use ray_tracing_pipeline::rtp::device::RayTracingDevice;
use ray_tracing_pipeline_vulkan::rtp::{VulkanRayTracingDevice, VulkanDeviceConfig};

fn wrap(instance: &ash::Instance, device: ash::Device, physical_device: vk::PhysicalDevice)
    -> Arc<dyn RayTracingDevice>
{
    Arc::new(VulkanRayTracingDevice::new(
        instance,
        device,
        physical_device,
        VulkanDeviceConfig::default(),
    ))
}
```
*/

mod debug;
mod vulkan_conversions;
mod vulkan_reflection;
mod vulkan_device;
mod vulkan_swap_chain;
mod vulkan_context;

pub mod rtp {
    pub use crate::vulkan_device::{
        VulkanRayTracingDevice, VulkanDeviceConfig, query_shader_group_handle_properties,
    };
    pub use crate::vulkan_swap_chain::VulkanSwapChainInfo;
    pub use crate::vulkan_context::{VulkanContext, VulkanContextConfig};

    // Validation messenger configuration and statistics
    pub mod debug {
        pub use crate::debug::{
            DebugSeverity, DebugOutput, DebugMessageFilter, ValidationConfig, ValidationStats,
            get_validation_stats, print_validation_stats_report,
        };
    }
}

pub use debug::{get_validation_stats, print_validation_stats_report};
