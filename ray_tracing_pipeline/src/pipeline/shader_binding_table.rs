//! Shader binding table layout
//!
//! Computes where each group handle lands in the shader binding table and the
//! strided regions the trace-rays call is recorded with. Buffer creation and
//! device addresses belong to the dispatch layer: region offsets here are
//! relative to the start of the table buffer, which must itself be aligned
//! to `base_alignment`.

use crate::device::ShaderGroupHandleProperties;
use crate::error::Result;
use crate::pipeline::ShaderGroupIndices;
use crate::engine_bail_warn;

/// One strided region of the table, relative to the buffer start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShaderBindingTableRegion {
    pub offset: u64,
    pub stride: u64,
    pub size: u64,
}

/// Layout of a shader binding table for one pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderBindingTableLayout {
    pub raygen: ShaderBindingTableRegion,
    pub miss: ShaderBindingTableRegion,
    pub hit: ShaderBindingTableRegion,
    /// Always empty: the pipeline has no callable shaders
    pub callable: ShaderBindingTableRegion,

    raygen_groups: Vec<u32>,
    miss_groups: Vec<u32>,
    hit_groups: Vec<u32>,
    handle_size: u32,
    base_alignment: u32,
}

pub(crate) fn align_up(value: u32, alignment: u32) -> u32 {
    (value + alignment - 1) & !(alignment - 1)
}

impl ShaderBindingTableLayout {
    /// Lay out raygen, miss and hit regions for `indices`
    ///
    /// Hit records are ordered triangle hit group first, so an instance's
    /// SBT record offset 0 selects triangles and 1 selects procedurals.
    ///
    /// # Errors
    ///
    /// `Error::InvalidResource` when an alignment is zero or not a power of two.
    pub fn new(indices: ShaderGroupIndices, properties: ShaderGroupHandleProperties) -> Result<Self> {
        for (name, alignment) in [
            ("handle alignment", properties.handle_alignment),
            ("base alignment", properties.base_alignment),
        ] {
            if !alignment.is_power_of_two() {
                engine_bail_warn!("rtp::ShaderBindingTableLayout", "Shader group {} {} is not a power of two", name, alignment);
            }
        }

        let raygen_groups = vec![indices.ray_gen];
        let miss_groups = vec![indices.miss];
        let hit_groups = vec![indices.triangle_hit_group, indices.procedural_hit_group];

        // No shader record data: a record is exactly one handle
        let record_size = align_up(properties.handle_size, properties.handle_alignment);
        let region_size = |count: usize| align_up(count as u32 * record_size, properties.base_alignment);

        // The raygen region's stride must equal its size
        let raygen_size = align_up(record_size, properties.base_alignment) as u64;
        let raygen = ShaderBindingTableRegion {
            offset: 0,
            stride: raygen_size,
            size: raygen_size,
        };
        let miss = ShaderBindingTableRegion {
            offset: raygen.offset + raygen.size,
            stride: record_size as u64,
            size: region_size(miss_groups.len()) as u64,
        };
        let hit = ShaderBindingTableRegion {
            offset: miss.offset + miss.size,
            stride: record_size as u64,
            size: region_size(hit_groups.len()) as u64,
        };

        Ok(Self {
            raygen,
            miss,
            hit,
            callable: ShaderBindingTableRegion::default(),
            raygen_groups,
            miss_groups,
            hit_groups,
            handle_size: properties.handle_size,
            base_alignment: properties.base_alignment,
        })
    }

    /// Total buffer size in bytes
    pub fn size(&self) -> u64 {
        self.hit.offset + self.hit.size
    }

    /// Required alignment of the table buffer's device address
    pub fn base_alignment(&self) -> u32 {
        self.base_alignment
    }

    /// Group indices copied into each region, in record order
    pub fn raygen_groups(&self) -> &[u32] {
        &self.raygen_groups
    }

    pub fn miss_groups(&self) -> &[u32] {
        &self.miss_groups
    }

    pub fn hit_groups(&self) -> &[u32] {
        &self.hit_groups
    }

    /// Build the table contents from group handles
    ///
    /// `handle_data` holds the handles of groups `0..group_count` back to back,
    /// as returned by [`RayTracingPipeline::shader_group_handles`](crate::pipeline::RayTracingPipeline::shader_group_handles).
    ///
    /// # Errors
    ///
    /// `Error::InvalidResource` when a referenced group has no handle in `handle_data`.
    pub fn build_table(&self, handle_data: &[u8]) -> Result<Vec<u8>> {
        let handle_size = self.handle_size as usize;
        let mut table = vec![0u8; self.size() as usize];

        let regions = [
            (&self.raygen, &self.raygen_groups),
            (&self.miss, &self.miss_groups),
            (&self.hit, &self.hit_groups),
        ];
        for (region, groups) in regions {
            for (record, group) in groups.iter().enumerate() {
                let src_start = *group as usize * handle_size;
                let src = match handle_data.get(src_start..src_start + handle_size) {
                    Some(src) => src,
                    None => engine_bail_warn!(
                        "rtp::ShaderBindingTableLayout",
                        "No handle for shader group {} ({} bytes of handle data)",
                        group,
                        handle_data.len()
                    ),
                };
                let dst_start = (region.offset + record as u64 * region.stride) as usize;
                table[dst_start..dst_start + handle_size].copy_from_slice(src);
            }
        }

        Ok(table)
    }
}

#[cfg(test)]
#[path = "shader_binding_table_tests.rs"]
mod tests;
