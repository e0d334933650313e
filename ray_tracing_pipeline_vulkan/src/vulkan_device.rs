/// VulkanRayTracingDevice - RayTracingDevice over ash and VK_KHR_ray_tracing_pipeline
///
/// Wraps a logical device created by the host renderer. The device must have
/// `VK_KHR_ray_tracing_pipeline` (and its dependencies) enabled; this type
/// never creates or destroys the logical device itself.

use ash::vk;
use ash::vk::Handle;
use std::ffi::CString;
use ray_tracing_pipeline::rtp::{Error, Result};
use ray_tracing_pipeline::rtp::device::{
    DebugObject, DescriptorBinding, DescriptorPoolHandle, DescriptorPoolSize, DescriptorResource,
    DescriptorSetHandle, DescriptorSetLayoutHandle, DescriptorType, DescriptorWrite,
    PipelineHandle, PipelineLayoutHandle, PushConstantRange, RayTracingDevice,
    RayTracingPipelineCreateDesc, ShaderGroupHandleProperties, ShaderModuleDesc,
    ShaderModuleHandle,
};
use ray_tracing_pipeline::{engine_bail_warn, engine_debug, engine_warn, engine_warn_err};
use crate::vulkan_conversions::{
    descriptor_image_layout, descriptor_type_to_vk, shader_group_kind_to_vk,
    shader_stage_flags_to_vk, shader_stage_kind_to_vk, vk_result_to_error,
};
use crate::vulkan_reflection::validate_module;

/// Options for [`VulkanRayTracingDevice::new`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VulkanDeviceConfig {
    /// Attach debug names through VK_EXT_debug_utils
    ///
    /// Only enable when the instance was created with the debug utils extension.
    pub enable_debug_names: bool,
}

/// Resolved descriptor info for one write, kept alive while the writes are submitted
enum WriteInfo {
    Images(vk::DescriptorType, Vec<vk::DescriptorImageInfo>),
    Buffer(vk::DescriptorType, [vk::DescriptorBufferInfo; 1]),
    AccelerationStructure([vk::AccelerationStructureKHR; 1]),
}

fn resolve_write(resource: &DescriptorResource) -> WriteInfo {
    match resource {
        DescriptorResource::AccelerationStructure(tlas) => {
            WriteInfo::AccelerationStructure([vk::AccelerationStructureKHR::from_raw(tlas.as_raw())])
        }
        DescriptorResource::StorageImage(view) => WriteInfo::Images(
            vk::DescriptorType::STORAGE_IMAGE,
            vec![vk::DescriptorImageInfo::default()
                .image_view(vk::ImageView::from_raw(view.as_raw()))
                .image_layout(descriptor_image_layout(DescriptorType::StorageImage))],
        ),
        DescriptorResource::UniformBuffer(buffer) => WriteInfo::Buffer(
            vk::DescriptorType::UNIFORM_BUFFER,
            [vk::DescriptorBufferInfo::default()
                .buffer(vk::Buffer::from_raw(buffer.as_raw()))
                .offset(0)
                .range(vk::WHOLE_SIZE)],
        ),
        DescriptorResource::StorageBuffer { buffer, range } => WriteInfo::Buffer(
            vk::DescriptorType::STORAGE_BUFFER,
            [vk::DescriptorBufferInfo::default()
                .buffer(vk::Buffer::from_raw(buffer.as_raw()))
                .offset(0)
                .range(range.unwrap_or(vk::WHOLE_SIZE))],
        ),
        DescriptorResource::CombinedImageSamplers(textures) => WriteInfo::Images(
            vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            textures
                .iter()
                .map(|(view, sampler)| {
                    vk::DescriptorImageInfo::default()
                        .image_view(vk::ImageView::from_raw(view.as_raw()))
                        .sampler(vk::Sampler::from_raw(sampler.as_raw()))
                        .image_layout(descriptor_image_layout(DescriptorType::CombinedImageSampler))
                })
                .collect(),
        ),
    }
}

/// Read the ray tracing pipeline limits of a physical device
pub fn query_shader_group_handle_properties(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
) -> ShaderGroupHandleProperties {
    let mut rt_properties = vk::PhysicalDeviceRayTracingPipelinePropertiesKHR::default();
    let mut properties = vk::PhysicalDeviceProperties2::default().push_next(&mut rt_properties);
    unsafe {
        instance.get_physical_device_properties2(physical_device, &mut properties);
    }

    ShaderGroupHandleProperties {
        handle_size: rt_properties.shader_group_handle_size,
        handle_alignment: rt_properties.shader_group_handle_alignment,
        base_alignment: rt_properties.shader_group_base_alignment,
        max_ray_recursion_depth: rt_properties.max_ray_recursion_depth,
    }
}

/// Vulkan implementation of [`RayTracingDevice`]
pub struct VulkanRayTracingDevice {
    device: ash::Device,
    ray_tracing: ash::khr::ray_tracing_pipeline::Device,
    debug_utils: Option<ash::ext::debug_utils::Device>,
    properties: ShaderGroupHandleProperties,
}

impl VulkanRayTracingDevice {
    /// Wrap a logical device that has VK_KHR_ray_tracing_pipeline enabled
    ///
    /// # Arguments
    ///
    /// * `instance` - Instance the device was created from
    /// * `device` - Logical device (not owned, the caller destroys it)
    /// * `physical_device` - Physical device the limits are read from
    /// * `config` - Backend options
    pub fn new(
        instance: &ash::Instance,
        device: ash::Device,
        physical_device: vk::PhysicalDevice,
        config: VulkanDeviceConfig,
    ) -> Self {
        let ray_tracing = ash::khr::ray_tracing_pipeline::Device::new(instance, &device);
        let debug_utils = config
            .enable_debug_names
            .then(|| ash::ext::debug_utils::Device::new(instance, &device));
        let properties = query_shader_group_handle_properties(instance, physical_device);

        engine_debug!("rtp::vulkan",
            "Ray tracing limits: handle size {}, handle alignment {}, base alignment {}, max recursion {}",
            properties.handle_size, properties.handle_alignment,
            properties.base_alignment, properties.max_ray_recursion_depth);

        Self {
            device,
            ray_tracing,
            debug_utils,
            properties,
        }
    }

    /// Underlying logical device
    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    fn name_object<H: Handle>(&self, handle: H, name: &str) {
        let Some(debug_utils) = &self.debug_utils else {
            return;
        };
        let Ok(name) = CString::new(name) else {
            engine_warn!("rtp::vulkan", "Debug name {:?} contains a NUL byte, ignored", name);
            return;
        };
        let info = vk::DebugUtilsObjectNameInfoEXT::default()
            .object_handle(handle)
            .object_name(&name);
        if let Err(e) = unsafe { debug_utils.set_debug_utils_object_name(&info) } {
            engine_warn!("rtp::vulkan", "Failed to set debug name {:?}: {:?}", name, e);
        }
    }
}

impl RayTracingDevice for VulkanRayTracingDevice {
    fn create_descriptor_set_layout(
        &self,
        bindings: &[DescriptorBinding],
    ) -> Result<DescriptorSetLayoutHandle> {
        // Zero-count bindings stay in the layout as reserved, never-written slots
        let vk_bindings: Vec<vk::DescriptorSetLayoutBinding> = bindings
            .iter()
            .map(|b| {
                vk::DescriptorSetLayoutBinding::default()
                    .binding(b.binding)
                    .descriptor_type(descriptor_type_to_vk(b.descriptor_type))
                    .descriptor_count(b.count)
                    .stage_flags(shader_stage_flags_to_vk(b.stages))
            })
            .collect();

        let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&vk_bindings);

        let layout = unsafe { self.device.create_descriptor_set_layout(&create_info, None) }
            .map_err(|e| vk_result_to_error(e, "create descriptor set layout"))?;

        Ok(DescriptorSetLayoutHandle::from_raw(layout.as_raw()))
    }

    fn destroy_descriptor_set_layout(&self, layout: DescriptorSetLayoutHandle) {
        unsafe {
            self.device.destroy_descriptor_set_layout(
                vk::DescriptorSetLayout::from_raw(layout.as_raw()),
                None,
            );
        }
    }

    fn create_descriptor_pool(
        &self,
        pool_sizes: &[DescriptorPoolSize],
        max_sets: u32,
    ) -> Result<DescriptorPoolHandle> {
        let vk_pool_sizes: Vec<vk::DescriptorPoolSize> = pool_sizes
            .iter()
            .filter(|size| size.count > 0)
            .map(|size| vk::DescriptorPoolSize {
                ty: descriptor_type_to_vk(size.descriptor_type),
                descriptor_count: size.count,
            })
            .collect();

        let create_info = vk::DescriptorPoolCreateInfo::default()
            .pool_sizes(&vk_pool_sizes)
            .max_sets(max_sets);

        let pool = unsafe { self.device.create_descriptor_pool(&create_info, None) }
            .map_err(|e| vk_result_to_error(e, "create descriptor pool"))?;

        Ok(DescriptorPoolHandle::from_raw(pool.as_raw()))
    }

    fn destroy_descriptor_pool(&self, pool: DescriptorPoolHandle) {
        unsafe {
            self.device
                .destroy_descriptor_pool(vk::DescriptorPool::from_raw(pool.as_raw()), None);
        }
    }

    fn allocate_descriptor_sets(
        &self,
        pool: DescriptorPoolHandle,
        layout: DescriptorSetLayoutHandle,
        count: u32,
    ) -> Result<Vec<DescriptorSetHandle>> {
        let layouts = vec![vk::DescriptorSetLayout::from_raw(layout.as_raw()); count as usize];
        let allocate_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(vk::DescriptorPool::from_raw(pool.as_raw()))
            .set_layouts(&layouts);

        let sets = unsafe { self.device.allocate_descriptor_sets(&allocate_info) }
            .map_err(|e| vk_result_to_error(e, "allocate descriptor sets"))?;

        Ok(sets
            .into_iter()
            .map(|set| DescriptorSetHandle::from_raw(set.as_raw()))
            .collect())
    }

    fn update_descriptor_set(&self, set: DescriptorSetHandle, writes: &[DescriptorWrite]) {
        let dst_set = vk::DescriptorSet::from_raw(set.as_raw());
        let resolved: Vec<(u32, WriteInfo)> = writes
            .iter()
            .map(|write| (write.binding, resolve_write(&write.resource)))
            .collect();

        let mut vk_writes = Vec::with_capacity(resolved.len());
        let mut tlas_writes = Vec::new();
        for (binding, info) in &resolved {
            let write = vk::WriteDescriptorSet::default()
                .dst_set(dst_set)
                .dst_binding(*binding)
                .dst_array_element(0);
            match info {
                WriteInfo::Images(ty, image_infos) => {
                    vk_writes.push(write.descriptor_type(*ty).image_info(image_infos));
                }
                WriteInfo::Buffer(ty, buffer_infos) => {
                    vk_writes.push(write.descriptor_type(*ty).buffer_info(buffer_infos));
                }
                WriteInfo::AccelerationStructure(structures) => {
                    tlas_writes.push((*binding, structures));
                }
            }
        }

        unsafe {
            self.device.update_descriptor_sets(&vk_writes, &[]);
        }

        // Acceleration structure writes carry their payload in the pNext chain
        for (binding, structures) in tlas_writes {
            let mut tlas_info = vk::WriteDescriptorSetAccelerationStructureKHR::default()
                .acceleration_structures(structures);
            let write = vk::WriteDescriptorSet::default()
                .dst_set(dst_set)
                .dst_binding(binding)
                .dst_array_element(0)
                .descriptor_type(vk::DescriptorType::ACCELERATION_STRUCTURE_KHR)
                .descriptor_count(1)
                .push_next(&mut tlas_info);
            unsafe {
                self.device.update_descriptor_sets(&[write], &[]);
            }
        }
    }

    fn create_pipeline_layout(
        &self,
        set_layouts: &[DescriptorSetLayoutHandle],
        push_constant_ranges: &[PushConstantRange],
    ) -> Result<PipelineLayoutHandle> {
        let vk_set_layouts: Vec<vk::DescriptorSetLayout> = set_layouts
            .iter()
            .map(|layout| vk::DescriptorSetLayout::from_raw(layout.as_raw()))
            .collect();
        let vk_ranges: Vec<vk::PushConstantRange> = push_constant_ranges
            .iter()
            .map(|range| {
                vk::PushConstantRange::default()
                    .stage_flags(shader_stage_flags_to_vk(range.stages))
                    .offset(range.offset)
                    .size(range.size)
            })
            .collect();

        let create_info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(&vk_set_layouts)
            .push_constant_ranges(&vk_ranges);

        let layout = unsafe { self.device.create_pipeline_layout(&create_info, None) }
            .map_err(|e| vk_result_to_error(e, "create pipeline layout"))?;

        Ok(PipelineLayoutHandle::from_raw(layout.as_raw()))
    }

    fn destroy_pipeline_layout(&self, layout: PipelineLayoutHandle) {
        unsafe {
            self.device
                .destroy_pipeline_layout(vk::PipelineLayout::from_raw(layout.as_raw()), None);
        }
    }

    fn create_shader_module(&self, desc: &ShaderModuleDesc<'_>) -> Result<ShaderModuleHandle> {
        if desc.validate_interface {
            validate_module(desc.name, desc.code, desc.entry_point, desc.bindings)?;
        }

        let create_info = vk::ShaderModuleCreateInfo::default().code(desc.code);

        let module = unsafe { self.device.create_shader_module(&create_info, None) }
            .map_err(|e| match e {
                vk::Result::ERROR_OUT_OF_HOST_MEMORY | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => {
                    vk_result_to_error(e, "create shader module")
                }
                other => {
                    let message = format!("{}: driver rejected module ({:?})", desc.name, other);
                    engine_warn!("rtp::vulkan", "{}", message);
                    Error::ShaderLoadFailed(message)
                }
            })?;

        Ok(ShaderModuleHandle::from_raw(module.as_raw()))
    }

    fn destroy_shader_module(&self, module: ShaderModuleHandle) {
        unsafe {
            self.device
                .destroy_shader_module(vk::ShaderModule::from_raw(module.as_raw()), None);
        }
    }

    fn create_ray_tracing_pipeline(
        &self,
        desc: &RayTracingPipelineCreateDesc<'_>,
    ) -> Result<PipelineHandle> {
        let entry_points = desc
            .stages
            .iter()
            .map(|stage| {
                CString::new(stage.entry_point.as_str()).map_err(|_| {
                    engine_warn_err!("rtp::vulkan",
                        "Entry point {:?} contains a NUL byte", stage.entry_point)
                })
            })
            .collect::<Result<Vec<CString>>>()?;

        let vk_stages: Vec<vk::PipelineShaderStageCreateInfo> = desc
            .stages
            .iter()
            .zip(&entry_points)
            .map(|(stage, entry_point)| {
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(shader_stage_kind_to_vk(stage.kind))
                    .module(vk::ShaderModule::from_raw(stage.module.as_raw()))
                    .name(entry_point)
            })
            .collect();

        // UNUSED matches VK_SHADER_UNUSED_KHR, so slots pass through unchanged
        let vk_groups: Vec<vk::RayTracingShaderGroupCreateInfoKHR> = desc
            .groups
            .iter()
            .map(|group| {
                vk::RayTracingShaderGroupCreateInfoKHR::default()
                    .ty(shader_group_kind_to_vk(group.kind))
                    .general_shader(group.general)
                    .closest_hit_shader(group.closest_hit)
                    .any_hit_shader(group.any_hit)
                    .intersection_shader(group.intersection)
            })
            .collect();

        if desc.max_ray_recursion_depth > self.properties.max_ray_recursion_depth {
            engine_bail_warn!("rtp::vulkan",
                "Recursion depth {} exceeds the device limit {}",
                desc.max_ray_recursion_depth, self.properties.max_ray_recursion_depth);
        }

        let create_info = vk::RayTracingPipelineCreateInfoKHR::default()
            .stages(&vk_stages)
            .groups(&vk_groups)
            .max_pipeline_ray_recursion_depth(desc.max_ray_recursion_depth)
            .layout(vk::PipelineLayout::from_raw(desc.layout.as_raw()));

        let pipelines = unsafe {
            self.ray_tracing.create_ray_tracing_pipelines(
                vk::DeferredOperationKHR::null(),
                vk::PipelineCache::null(),
                &[create_info],
                None,
            )
        }
        .map_err(|(_, e)| vk_result_to_error(e, "create ray tracing pipeline"))?;

        let pipeline = pipelines.first().copied().ok_or_else(|| {
            Error::BackendError("Driver returned no ray tracing pipeline".to_string())
        })?;

        Ok(PipelineHandle::from_raw(pipeline.as_raw()))
    }

    fn destroy_pipeline(&self, pipeline: PipelineHandle) {
        unsafe {
            self.device
                .destroy_pipeline(vk::Pipeline::from_raw(pipeline.as_raw()), None);
        }
    }

    fn shader_group_handle_properties(&self) -> ShaderGroupHandleProperties {
        self.properties
    }

    fn get_shader_group_handles(
        &self,
        pipeline: PipelineHandle,
        first_group: u32,
        group_count: u32,
    ) -> Result<Vec<u8>> {
        let data_size = (self.properties.handle_size * group_count) as usize;
        unsafe {
            self.ray_tracing.get_ray_tracing_shader_group_handles(
                vk::Pipeline::from_raw(pipeline.as_raw()),
                first_group,
                group_count,
                data_size,
            )
        }
        .map_err(|e| vk_result_to_error(e, "get shader group handles"))
    }

    fn set_debug_name(&self, object: DebugObject, name: &str) {
        match object {
            DebugObject::DescriptorSetLayout(h) => {
                self.name_object(vk::DescriptorSetLayout::from_raw(h.as_raw()), name)
            }
            DebugObject::DescriptorPool(h) => {
                self.name_object(vk::DescriptorPool::from_raw(h.as_raw()), name)
            }
            DebugObject::DescriptorSet(h) => {
                self.name_object(vk::DescriptorSet::from_raw(h.as_raw()), name)
            }
            DebugObject::PipelineLayout(h) => {
                self.name_object(vk::PipelineLayout::from_raw(h.as_raw()), name)
            }
            DebugObject::Pipeline(h) => self.name_object(vk::Pipeline::from_raw(h.as_raw()), name),
        }
    }
}
