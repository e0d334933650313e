//! Descriptor resource binder
//!
//! Declares the binding slots the ray tracing shaders read, sizes a
//! descriptor pool for exactly one set per in-flight frame, and writes every
//! frame's set. The slot numbers below must match the `layout(binding = N)`
//! declarations of the shaders.

use std::sync::Arc;
use rustc_hash::FxHashMap;

use crate::device::{
    RayTracingDevice, DebugObject,
    DescriptorBinding, DescriptorType, DescriptorPoolSize, DescriptorWrite, DescriptorResource,
    BindingFrequency, ShaderStageFlags,
    AccelerationStructureHandle, BufferHandle, ImageViewHandle, SamplerHandle,
    DescriptorPoolHandle, DescriptorSetHandle, DescriptorSetLayoutHandle,
};
use crate::scene::LightProbeBinding;
use crate::error::Result;
use crate::{engine_bail_warn, engine_debug, engine_trace};

/// Binding slot numbers of the ray tracing descriptor set
pub mod binding_slot {
    pub const ACCELERATION_STRUCTURE: u32 = 0;
    pub const ACCUMULATION_IMAGE: u32 = 1;
    pub const OUTPUT_IMAGE: u32 = 2;
    pub const UNIFORM_BUFFER: u32 = 3;
    pub const VERTEX_BUFFER: u32 = 4;
    pub const INDEX_BUFFER: u32 = 5;
    pub const MATERIAL_BUFFER: u32 = 6;
    pub const OFFSET_BUFFER: u32 = 7;
    pub const TEXTURES: u32 = 8;
    pub const PROCEDURAL_BUFFER: u32 = 9;
    pub const LIGHT_PROBES: u32 = 10;
    pub const LIGHT_PROBE_POSITIONS: u32 = 11;

    /// Number of slots in the layout
    pub const COUNT: u32 = 12;
}

// ===== RESOURCES =====

/// Every resource bound by the pipeline, with optional inputs already resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineResources {
    pub acceleration_structure: AccelerationStructureHandle,
    pub accumulation_image: ImageViewHandle,
    pub output_image: ImageViewHandle,
    /// One per in-flight frame
    pub uniform_buffers: Vec<BufferHandle>,
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    pub material_buffer: BufferHandle,
    pub offset_buffer: BufferHandle,
    pub textures: Vec<(ImageViewHandle, SamplerHandle)>,
    pub procedural_buffer: Option<BufferHandle>,
    pub light_probes: LightProbeBinding,
}

impl PipelineResources {
    /// Layout bindings for these resources
    ///
    /// Every slot is always declared. Slots whose resource is absent (no
    /// textures, no procedural geometry, no light probes) get a descriptor
    /// count of 0.
    pub fn bindings(&self) -> Vec<DescriptorBinding> {
        use binding_slot::*;

        let rgen = ShaderStageFlags::RAYGEN;
        let chit = ShaderStageFlags::CLOSEST_HIT;
        let probe_count = if self.light_probes.is_present() { 1 } else { 0 };

        let shared = |binding, descriptor_type, count, stages| DescriptorBinding {
            binding,
            descriptor_type,
            count,
            stages,
            frequency: BindingFrequency::Shared,
        };

        vec![
            shared(ACCELERATION_STRUCTURE, DescriptorType::AccelerationStructure, 1, rgen | chit),
            shared(ACCUMULATION_IMAGE, DescriptorType::StorageImage, 1, rgen),
            shared(OUTPUT_IMAGE, DescriptorType::StorageImage, 1, rgen),
            DescriptorBinding {
                binding: UNIFORM_BUFFER,
                descriptor_type: DescriptorType::UniformBuffer,
                count: 1,
                stages: rgen | ShaderStageFlags::MISS | chit,
                frequency: BindingFrequency::PerFrame,
            },
            shared(VERTEX_BUFFER, DescriptorType::StorageBuffer, 1, chit),
            shared(INDEX_BUFFER, DescriptorType::StorageBuffer, 1, chit),
            shared(MATERIAL_BUFFER, DescriptorType::StorageBuffer, 1, chit),
            shared(OFFSET_BUFFER, DescriptorType::StorageBuffer, 1, chit),
            shared(TEXTURES, DescriptorType::CombinedImageSampler, self.textures.len() as u32, chit),
            shared(
                PROCEDURAL_BUFFER,
                DescriptorType::StorageBuffer,
                self.procedural_buffer.map_or(0, |_| 1),
                chit | ShaderStageFlags::INTERSECTION,
            ),
            shared(LIGHT_PROBES, DescriptorType::StorageBuffer, probe_count, rgen | chit),
            shared(LIGHT_PROBE_POSITIONS, DescriptorType::StorageBuffer, probe_count, rgen | chit),
        ]
    }

    /// Writes for the set of frame `frame_index`
    ///
    /// Only the uniform buffer differs between frames. Unused slots get no write.
    pub fn writes(&self, frame_index: usize) -> Vec<DescriptorWrite> {
        use binding_slot::*;

        let whole = |buffer| DescriptorResource::StorageBuffer { buffer, range: None };
        let mut writes = vec![
            DescriptorWrite {
                binding: ACCELERATION_STRUCTURE,
                resource: DescriptorResource::AccelerationStructure(self.acceleration_structure),
            },
            DescriptorWrite {
                binding: ACCUMULATION_IMAGE,
                resource: DescriptorResource::StorageImage(self.accumulation_image),
            },
            DescriptorWrite {
                binding: OUTPUT_IMAGE,
                resource: DescriptorResource::StorageImage(self.output_image),
            },
        ];

        if let Some(uniform_buffer) = self.uniform_buffers.get(frame_index) {
            writes.push(DescriptorWrite {
                binding: UNIFORM_BUFFER,
                resource: DescriptorResource::UniformBuffer(*uniform_buffer),
            });
        }

        writes.push(DescriptorWrite { binding: VERTEX_BUFFER, resource: whole(self.vertex_buffer) });
        writes.push(DescriptorWrite { binding: INDEX_BUFFER, resource: whole(self.index_buffer) });
        writes.push(DescriptorWrite { binding: MATERIAL_BUFFER, resource: whole(self.material_buffer) });
        writes.push(DescriptorWrite { binding: OFFSET_BUFFER, resource: whole(self.offset_buffer) });

        if !self.textures.is_empty() {
            writes.push(DescriptorWrite {
                binding: TEXTURES,
                resource: DescriptorResource::CombinedImageSamplers(self.textures.clone()),
            });
        }

        if let Some(procedural_buffer) = self.procedural_buffer {
            writes.push(DescriptorWrite { binding: PROCEDURAL_BUFFER, resource: whole(procedural_buffer) });
        }

        if let LightProbeBinding::Present {
            probe_buffer,
            probe_range,
            position_buffer,
            position_range,
            ..
        } = self.light_probes
        {
            writes.push(DescriptorWrite {
                binding: LIGHT_PROBES,
                resource: DescriptorResource::StorageBuffer { buffer: probe_buffer, range: Some(probe_range) },
            });
            writes.push(DescriptorWrite {
                binding: LIGHT_PROBE_POSITIONS,
                resource: DescriptorResource::StorageBuffer { buffer: position_buffer, range: Some(position_range) },
            });
        }

        writes
    }
}

// ===== DESCRIPTOR SET MANAGER =====

/// Owns the descriptor set layout, the pool and one set per in-flight frame
///
/// Sets are freed together with the pool; the pool is destroyed before the
/// layout it was allocated against.
pub struct DescriptorSetManager {
    device: Arc<dyn RayTracingDevice>,
    bindings: Vec<DescriptorBinding>,
    layout: DescriptorSetLayoutHandle,
    pool: DescriptorPoolHandle,
    sets: Vec<DescriptorSetHandle>,
}

impl DescriptorSetManager {
    /// Create the layout and pool, then allocate `frame_count` sets
    ///
    /// # Errors
    ///
    /// - `Error::InvalidResource` for a zero frame count or duplicate slots
    /// - `Error::DescriptorPoolExhausted` when set allocation fails
    /// - any driver error from layout or pool creation
    pub fn new(
        device: Arc<dyn RayTracingDevice>,
        bindings: Vec<DescriptorBinding>,
        frame_count: u32,
        debug_name: &str,
    ) -> Result<Self> {
        if frame_count == 0 {
            engine_bail_warn!("rtp::DescriptorSetManager", "Frame count must be at least 1");
        }
        for (i, binding) in bindings.iter().enumerate() {
            if bindings[..i].iter().any(|other| other.binding == binding.binding) {
                engine_bail_warn!("rtp::DescriptorSetManager", "Binding slot {} declared twice", binding.binding);
            }
        }

        let mut manager = Self {
            device: Arc::clone(&device),
            bindings,
            layout: DescriptorSetLayoutHandle::NULL,
            pool: DescriptorPoolHandle::NULL,
            sets: Vec::new(),
        };

        // Partially built objects are released by Drop if a step below fails
        manager.layout = device.create_descriptor_set_layout(&manager.bindings)?;
        device.set_debug_name(
            DebugObject::DescriptorSetLayout(manager.layout),
            &format!("{}.descriptor_set_layout", debug_name),
        );

        let pool_sizes = Self::pool_sizes(&manager.bindings, frame_count);
        manager.pool = device.create_descriptor_pool(&pool_sizes, frame_count)?;
        device.set_debug_name(
            DebugObject::DescriptorPool(manager.pool),
            &format!("{}.descriptor_pool", debug_name),
        );

        manager.sets = device.allocate_descriptor_sets(manager.pool, manager.layout, frame_count)?;
        for (frame, set) in manager.sets.iter().enumerate() {
            device.set_debug_name(
                DebugObject::DescriptorSet(*set),
                &format!("{}.descriptor_set[{}]", debug_name, frame),
            );
        }

        engine_debug!(
            "rtp::DescriptorSetManager",
            "Allocated {} descriptor sets ({} bindings, {} pool sizes)",
            frame_count,
            manager.bindings.len(),
            pool_sizes.len()
        );

        Ok(manager)
    }

    /// Exact pool capacity for `frame_count` sets of `bindings`
    ///
    /// Unused (zero-count) bindings contribute nothing. Sizes are sorted by
    /// descriptor type.
    pub fn pool_sizes(bindings: &[DescriptorBinding], frame_count: u32) -> Vec<DescriptorPoolSize> {
        let mut per_type: FxHashMap<DescriptorType, u32> = FxHashMap::default();
        for binding in bindings.iter().filter(|binding| !binding.is_unused()) {
            *per_type.entry(binding.descriptor_type).or_insert(0) += binding.count * frame_count;
        }

        let mut pool_sizes: Vec<_> = per_type
            .into_iter()
            .map(|(descriptor_type, count)| DescriptorPoolSize { descriptor_type, count })
            .collect();
        pool_sizes.sort_by_key(|size| size.descriptor_type);
        pool_sizes
    }

    /// Write resources into the set of frame `frame_index`
    ///
    /// Every write must target a declared, used slot with the slot's type and
    /// descriptor count.
    pub fn write(&self, frame_index: usize, writes: &[DescriptorWrite]) -> Result<()> {
        let set = match self.sets.get(frame_index) {
            Some(set) => *set,
            None => engine_bail_warn!(
                "rtp::DescriptorSetManager",
                "Frame index {} out of range (frame count {})",
                frame_index,
                self.sets.len()
            ),
        };

        for write in writes {
            let binding = match self.binding(write.binding) {
                Some(binding) => binding,
                None => engine_bail_warn!(
                    "rtp::DescriptorSetManager",
                    "Write targets undeclared binding slot {}",
                    write.binding
                ),
            };
            if binding.is_unused() {
                engine_bail_warn!(
                    "rtp::DescriptorSetManager",
                    "Write targets unused binding slot {}",
                    write.binding
                );
            }
            if write.resource.descriptor_type() != binding.descriptor_type {
                engine_bail_warn!(
                    "rtp::DescriptorSetManager",
                    "Binding slot {} expects {:?}, got {:?}",
                    write.binding,
                    binding.descriptor_type,
                    write.resource.descriptor_type()
                );
            }
            if write.resource.descriptor_count() != binding.count {
                engine_bail_warn!(
                    "rtp::DescriptorSetManager",
                    "Binding slot {} expects {} descriptors, got {}",
                    write.binding,
                    binding.count,
                    write.resource.descriptor_count()
                );
            }
        }

        engine_trace!(
            "rtp::DescriptorSetManager",
            "Writing {} bindings into descriptor set {}",
            writes.len(),
            frame_index
        );
        self.device.update_descriptor_set(set, writes);
        Ok(())
    }

    /// Descriptor set of frame `frame_index`
    ///
    /// # Panics
    ///
    /// Panics if `frame_index >= frame_count()`.
    pub fn descriptor_set(&self, frame_index: usize) -> DescriptorSetHandle {
        match self.sets.get(frame_index) {
            Some(set) => *set,
            None => panic!(
                "descriptor set index {} out of range (frame count {})",
                frame_index,
                self.sets.len()
            ),
        }
    }

    pub fn get_descriptor_set(&self, frame_index: usize) -> Option<DescriptorSetHandle> {
        self.sets.get(frame_index).copied()
    }

    pub fn descriptor_sets(&self) -> &[DescriptorSetHandle] {
        &self.sets
    }

    pub fn frame_count(&self) -> u32 {
        self.sets.len() as u32
    }

    pub fn layout(&self) -> DescriptorSetLayoutHandle {
        self.layout
    }

    pub fn pool(&self) -> DescriptorPoolHandle {
        self.pool
    }

    pub fn bindings(&self) -> &[DescriptorBinding] {
        &self.bindings
    }

    pub fn binding(&self, slot: u32) -> Option<&DescriptorBinding> {
        self.bindings.iter().find(|binding| binding.binding == slot)
    }
}

impl Drop for DescriptorSetManager {
    fn drop(&mut self) {
        if !self.pool.is_null() {
            self.device.destroy_descriptor_pool(self.pool);
        }
        if !self.layout.is_null() {
            self.device.destroy_descriptor_set_layout(self.layout);
        }
    }
}

#[cfg(test)]
#[path = "descriptor_binder_tests.rs"]
mod tests;
