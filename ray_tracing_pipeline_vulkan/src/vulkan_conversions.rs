/// Conversions between backend-agnostic pipeline types and Vulkan types
///
/// Also maps `vk::Result` failure codes onto the pipeline error kinds, so that
/// pool exhaustion and out-of-memory conditions surface as their own variants
/// instead of a generic backend error.

use ash::vk;
use ray_tracing_pipeline::rtp::Error;
use ray_tracing_pipeline::rtp::device::{
    DescriptorType, ShaderGroupKind, ShaderStageFlags, ShaderStageKind,
};
use ray_tracing_pipeline::{engine_err, engine_error, engine_warn};

pub(crate) fn descriptor_type_to_vk(descriptor_type: DescriptorType) -> vk::DescriptorType {
    match descriptor_type {
        DescriptorType::AccelerationStructure => vk::DescriptorType::ACCELERATION_STRUCTURE_KHR,
        DescriptorType::StorageImage => vk::DescriptorType::STORAGE_IMAGE,
        DescriptorType::UniformBuffer => vk::DescriptorType::UNIFORM_BUFFER,
        DescriptorType::StorageBuffer => vk::DescriptorType::STORAGE_BUFFER,
        DescriptorType::CombinedImageSampler => vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
    }
}

pub(crate) fn shader_stage_flags_to_vk(stages: ShaderStageFlags) -> vk::ShaderStageFlags {
    let mut flags = vk::ShaderStageFlags::empty();
    if stages.contains(ShaderStageFlags::RAYGEN) {
        flags |= vk::ShaderStageFlags::RAYGEN_KHR;
    }
    if stages.contains(ShaderStageFlags::MISS) {
        flags |= vk::ShaderStageFlags::MISS_KHR;
    }
    if stages.contains(ShaderStageFlags::CLOSEST_HIT) {
        flags |= vk::ShaderStageFlags::CLOSEST_HIT_KHR;
    }
    if stages.contains(ShaderStageFlags::ANY_HIT) {
        flags |= vk::ShaderStageFlags::ANY_HIT_KHR;
    }
    if stages.contains(ShaderStageFlags::INTERSECTION) {
        flags |= vk::ShaderStageFlags::INTERSECTION_KHR;
    }
    flags
}

pub(crate) fn shader_stage_kind_to_vk(kind: ShaderStageKind) -> vk::ShaderStageFlags {
    shader_stage_flags_to_vk(ShaderStageFlags::from(kind))
}

pub(crate) fn shader_group_kind_to_vk(kind: ShaderGroupKind) -> vk::RayTracingShaderGroupTypeKHR {
    match kind {
        ShaderGroupKind::General => vk::RayTracingShaderGroupTypeKHR::GENERAL,
        ShaderGroupKind::TrianglesHit => vk::RayTracingShaderGroupTypeKHR::TRIANGLES_HIT_GROUP,
        ShaderGroupKind::ProceduralHit => vk::RayTracingShaderGroupTypeKHR::PROCEDURAL_HIT_GROUP,
    }
}

/// Image layout a descriptor of the given type is expected to be in when sampled or traced
pub(crate) fn descriptor_image_layout(descriptor_type: DescriptorType) -> vk::ImageLayout {
    match descriptor_type {
        DescriptorType::StorageImage => vk::ImageLayout::GENERAL,
        _ => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
    }
}

/// Map a failed Vulkan call onto a pipeline error, logging it
///
/// `action` completes the sentence "Failed to ...".
pub(crate) fn vk_result_to_error(result: vk::Result, action: &str) -> Error {
    match result {
        vk::Result::ERROR_OUT_OF_HOST_MEMORY | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => {
            engine_error!("rtp::vulkan", "Failed to {}: {:?}", action, result);
            Error::OutOfMemory
        }
        vk::Result::ERROR_OUT_OF_POOL_MEMORY | vk::Result::ERROR_FRAGMENTED_POOL => {
            let message = format!("Failed to {}: {:?}", action, result);
            engine_warn!("rtp::vulkan", "{}", message);
            Error::DescriptorPoolExhausted(message)
        }
        other => engine_err!("rtp::vulkan", "Failed to {}: {:?}", action, other),
    }
}

#[cfg(test)]
#[path = "vulkan_conversions_tests.rs"]
mod tests;
