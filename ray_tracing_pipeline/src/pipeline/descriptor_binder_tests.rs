use super::*;
use std::sync::Arc;
use serial_test::serial;

use crate::device::mock_device::MockRayTracingDevice;
use crate::device::{
    AccelerationStructureHandle, BufferHandle, ImageViewHandle, SamplerHandle,
    DescriptorType, DescriptorResource, BindingFrequency,
};
use crate::error::Error;
use crate::scene::LightProbeBinding;

fn resources(frame_count: u64) -> PipelineResources {
    PipelineResources {
        acceleration_structure: AccelerationStructureHandle::from_raw(500),
        accumulation_image: ImageViewHandle::from_raw(600),
        output_image: ImageViewHandle::from_raw(601),
        uniform_buffers: (0..frame_count).map(|i| BufferHandle::from_raw(700 + i)).collect(),
        vertex_buffer: BufferHandle::from_raw(801),
        index_buffer: BufferHandle::from_raw(802),
        material_buffer: BufferHandle::from_raw(803),
        offset_buffer: BufferHandle::from_raw(804),
        textures: Vec::new(),
        procedural_buffer: None,
        light_probes: LightProbeBinding::Absent,
    }
}

fn with_everything(mut resources: PipelineResources) -> PipelineResources {
    resources.textures = vec![
        (ImageViewHandle::from_raw(900), SamplerHandle::from_raw(950)),
        (ImageViewHandle::from_raw(901), SamplerHandle::from_raw(950)),
        (ImageViewHandle::from_raw(902), SamplerHandle::from_raw(950)),
    ];
    resources.procedural_buffer = Some(BufferHandle::from_raw(805));
    resources.light_probes = LightProbeBinding::Present {
        probe_buffer: BufferHandle::from_raw(806),
        probe_range: 2 * 160,
        position_buffer: BufferHandle::from_raw(807),
        position_range: 2 * 16,
        count: 2,
    };
    resources
}

// ============================================================================
// Binding table
// ============================================================================

#[test]
fn test_binding_table_declares_every_slot_in_order() {
    let bindings = resources(2).bindings();
    assert_eq!(bindings.len() as u32, binding_slot::COUNT);
    for (i, binding) in bindings.iter().enumerate() {
        assert_eq!(binding.binding, i as u32);
    }
}

#[test]
fn test_binding_table_types_and_frequency() {
    let bindings = resources(2).bindings();

    assert_eq!(bindings[0].descriptor_type, DescriptorType::AccelerationStructure);
    assert_eq!(bindings[1].descriptor_type, DescriptorType::StorageImage);
    assert_eq!(bindings[2].descriptor_type, DescriptorType::StorageImage);
    assert_eq!(bindings[3].descriptor_type, DescriptorType::UniformBuffer);
    assert_eq!(bindings[8].descriptor_type, DescriptorType::CombinedImageSampler);
    for slot in [4, 5, 6, 7, 9, 10, 11] {
        assert_eq!(bindings[slot].descriptor_type, DescriptorType::StorageBuffer);
    }

    let per_frame: Vec<_> = bindings
        .iter()
        .filter(|b| b.frequency == BindingFrequency::PerFrame)
        .map(|b| b.binding)
        .collect();
    assert_eq!(per_frame, vec![binding_slot::UNIFORM_BUFFER]);
}

#[test]
fn test_binding_table_stage_visibility() {
    let bindings = resources(1).bindings();

    assert_eq!(bindings[0].stages, ShaderStageFlags::RAYGEN | ShaderStageFlags::CLOSEST_HIT);
    assert_eq!(bindings[1].stages, ShaderStageFlags::RAYGEN);
    assert!(bindings[3].stages.contains(ShaderStageFlags::MISS));
    assert!(bindings[9].stages.contains(ShaderStageFlags::INTERSECTION));
}

#[test]
fn test_absent_optional_resources_are_zero_count_slots() {
    let bindings = resources(2).bindings();
    for slot in [binding_slot::TEXTURES, binding_slot::PROCEDURAL_BUFFER, binding_slot::LIGHT_PROBES, binding_slot::LIGHT_PROBE_POSITIONS] {
        assert!(bindings[slot as usize].is_unused(), "slot {} should be unused", slot);
    }
}

#[test]
fn test_present_optional_resources_are_counted() {
    let bindings = with_everything(resources(2)).bindings();
    assert_eq!(bindings[binding_slot::TEXTURES as usize].count, 3);
    assert_eq!(bindings[binding_slot::PROCEDURAL_BUFFER as usize].count, 1);
    assert_eq!(bindings[binding_slot::LIGHT_PROBES as usize].count, 1);
    assert_eq!(bindings[binding_slot::LIGHT_PROBE_POSITIONS as usize].count, 1);
}

// ============================================================================
// Writes
// ============================================================================

#[test]
fn test_writes_use_frame_uniform_buffer() {
    let resources = resources(2);

    for frame in 0..2 {
        let writes = resources.writes(frame);
        let uniform = writes
            .iter()
            .find(|w| w.binding == binding_slot::UNIFORM_BUFFER)
            .unwrap();
        assert_eq!(
            uniform.resource,
            DescriptorResource::UniformBuffer(BufferHandle::from_raw(700 + frame as u64))
        );
    }
}

#[test]
fn test_writes_skip_unused_slots() {
    let writes = resources(1).writes(0);
    assert_eq!(writes.len(), 8);
    assert!(writes.iter().all(|w| w.binding < binding_slot::TEXTURES));
}

#[test]
fn test_light_probe_writes_carry_ranges() {
    let writes = with_everything(resources(1)).writes(0);
    assert_eq!(writes.len(), 12);

    let probes = writes.iter().find(|w| w.binding == binding_slot::LIGHT_PROBES).unwrap();
    assert_eq!(
        probes.resource,
        DescriptorResource::StorageBuffer { buffer: BufferHandle::from_raw(806), range: Some(320) }
    );
    let positions = writes.iter().find(|w| w.binding == binding_slot::LIGHT_PROBE_POSITIONS).unwrap();
    assert_eq!(
        positions.resource,
        DescriptorResource::StorageBuffer { buffer: BufferHandle::from_raw(807), range: Some(32) }
    );
}

// ============================================================================
// Pool sizing
// ============================================================================

#[test]
fn test_pool_sizes_are_exact_per_frame() {
    let bindings = with_everything(resources(3)).bindings();
    let sizes = DescriptorSetManager::pool_sizes(&bindings, 3);

    assert_eq!(
        sizes,
        vec![
            DescriptorPoolSize { descriptor_type: DescriptorType::AccelerationStructure, count: 3 },
            DescriptorPoolSize { descriptor_type: DescriptorType::StorageImage, count: 6 },
            DescriptorPoolSize { descriptor_type: DescriptorType::UniformBuffer, count: 3 },
            DescriptorPoolSize { descriptor_type: DescriptorType::StorageBuffer, count: 21 },
            DescriptorPoolSize { descriptor_type: DescriptorType::CombinedImageSampler, count: 9 },
        ]
    );
}

#[test]
fn test_pool_sizes_ignore_unused_slots() {
    let bindings = resources(2).bindings();
    let sizes = DescriptorSetManager::pool_sizes(&bindings, 2);

    assert!(sizes.iter().all(|s| s.descriptor_type != DescriptorType::CombinedImageSampler));
    let storage = sizes.iter().find(|s| s.descriptor_type == DescriptorType::StorageBuffer).unwrap();
    assert_eq!(storage.count, 4 * 2);
}

// ============================================================================
// DescriptorSetManager
// ============================================================================

#[test]
fn test_manager_allocates_one_set_per_frame() {
    let device = Arc::new(MockRayTracingDevice::new());
    let manager = DescriptorSetManager::new(device.clone(), resources(3).bindings(), 3, "test").unwrap();

    assert_eq!(manager.frame_count(), 3);
    assert_eq!(manager.descriptor_sets().len(), 3);
    assert!(manager.descriptor_sets().iter().all(|s| !s.is_null()));

    let pools = device.pools.lock().unwrap();
    assert_eq!(pools.len(), 1);
    assert_eq!(pools[0].max_sets, 3);
}

#[test]
fn test_manager_names_its_objects() {
    let device = Arc::new(MockRayTracingDevice::new());
    let _manager = DescriptorSetManager::new(device.clone(), resources(2).bindings(), 2, "rt").unwrap();

    let names: Vec<_> = device.debug_names.lock().unwrap().iter().map(|(_, n)| n.clone()).collect();
    assert_eq!(
        names,
        vec![
            "rt.descriptor_set_layout",
            "rt.descriptor_pool",
            "rt.descriptor_set[0]",
            "rt.descriptor_set[1]",
        ]
    );
}

#[test]
fn test_manager_drop_destroys_pool_then_layout() {
    let device = Arc::new(MockRayTracingDevice::new());
    let manager = DescriptorSetManager::new(device.clone(), resources(2).bindings(), 2, "test").unwrap();
    drop(manager);

    let destroys = device.events_with_prefix("destroy_");
    assert_eq!(destroys.len(), 2);
    assert!(destroys[0].starts_with("destroy_descriptor_pool"));
    assert!(destroys[1].starts_with("destroy_descriptor_set_layout"));
    assert_eq!(device.live_object_count(), 0);
}

#[test]
#[serial]
fn test_manager_rejects_zero_frames() {
    let device = Arc::new(MockRayTracingDevice::new());
    let result = DescriptorSetManager::new(device.clone(), resources(0).bindings(), 0, "test");

    assert!(matches!(result, Err(Error::InvalidResource(_))));
    assert!(device.get_events().is_empty());
}

#[test]
#[serial]
fn test_manager_rejects_duplicate_slots() {
    let device = Arc::new(MockRayTracingDevice::new());
    let mut bindings = resources(1).bindings();
    bindings[5].binding = 4;

    let result = DescriptorSetManager::new(device.clone(), bindings, 1, "test");
    assert!(matches!(result, Err(Error::InvalidResource(msg)) if msg.contains("slot 4")));
}

#[test]
fn test_manager_allocation_failure_releases_layout_and_pool() {
    let device = Arc::new(MockRayTracingDevice::new());
    device.fail_descriptor_allocation();

    let result = DescriptorSetManager::new(device.clone(), resources(2).bindings(), 2, "test");
    assert!(matches!(result, Err(Error::DescriptorPoolExhausted(_))));
    assert_eq!(device.live_object_count(), 0);
}

#[test]
fn test_manager_write_records_writes() {
    let device = Arc::new(MockRayTracingDevice::new());
    let resources = with_everything(resources(2));
    let manager = DescriptorSetManager::new(device.clone(), resources.bindings(), 2, "test").unwrap();

    manager.write(1, &resources.writes(1)).unwrap();

    let writes = device.writes_for(manager.descriptor_set(1));
    assert_eq!(writes, resources.writes(1));
    assert!(device.writes_for(manager.descriptor_set(0)).is_empty());
}

#[test]
#[serial]
fn test_manager_write_rejects_type_mismatch() {
    let device = Arc::new(MockRayTracingDevice::new());
    let manager = DescriptorSetManager::new(device.clone(), resources(1).bindings(), 1, "test").unwrap();

    let bad = DescriptorWrite {
        binding: binding_slot::UNIFORM_BUFFER,
        resource: DescriptorResource::StorageImage(ImageViewHandle::from_raw(1)),
    };
    assert!(matches!(manager.write(0, &[bad]), Err(Error::InvalidResource(_))));
    assert!(device.events_with_prefix("update_descriptor_set").is_empty());
}

#[test]
#[serial]
fn test_manager_write_rejects_unused_slot() {
    let device = Arc::new(MockRayTracingDevice::new());
    let manager = DescriptorSetManager::new(device.clone(), resources(1).bindings(), 1, "test").unwrap();

    let bad = DescriptorWrite {
        binding: binding_slot::PROCEDURAL_BUFFER,
        resource: DescriptorResource::StorageBuffer { buffer: BufferHandle::from_raw(1), range: None },
    };
    assert!(matches!(manager.write(0, &[bad]), Err(Error::InvalidResource(msg)) if msg.contains("unused")));
}

#[test]
#[serial]
fn test_manager_write_rejects_texture_count_mismatch() {
    let device = Arc::new(MockRayTracingDevice::new());
    let resources = with_everything(resources(1));
    let manager = DescriptorSetManager::new(device.clone(), resources.bindings(), 1, "test").unwrap();

    let bad = DescriptorWrite {
        binding: binding_slot::TEXTURES,
        resource: DescriptorResource::CombinedImageSamplers(vec![(ImageViewHandle::from_raw(1), SamplerHandle::from_raw(2))]),
    };
    assert!(matches!(manager.write(0, &[bad]), Err(Error::InvalidResource(msg)) if msg.contains("expects 3 descriptors")));
}

#[test]
#[serial]
fn test_manager_write_rejects_out_of_range_frame() {
    let device = Arc::new(MockRayTracingDevice::new());
    let manager = DescriptorSetManager::new(device.clone(), resources(2).bindings(), 2, "test").unwrap();

    assert!(matches!(manager.write(2, &[]), Err(Error::InvalidResource(_))));
}

#[test]
fn test_manager_descriptor_set_accessors() {
    let device = Arc::new(MockRayTracingDevice::new());
    let manager = DescriptorSetManager::new(device.clone(), resources(2).bindings(), 2, "test").unwrap();

    assert_eq!(manager.get_descriptor_set(1), Some(manager.descriptor_set(1)));
    assert_eq!(manager.get_descriptor_set(2), None);
    assert_eq!(manager.binding(3).unwrap().descriptor_type, DescriptorType::UniformBuffer);
    assert!(manager.binding(42).is_none());
}

#[test]
#[should_panic(expected = "descriptor set index 2 out of range")]
fn test_manager_descriptor_set_out_of_range_panics() {
    let device = Arc::new(MockRayTracingDevice::new());
    let manager = DescriptorSetManager::new(device, resources(2).bindings(), 2, "test").unwrap();
    manager.descriptor_set(2);
}
