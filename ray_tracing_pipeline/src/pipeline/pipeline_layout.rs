//! Pipeline layout: the descriptor set layout plus push constant ranges

use std::sync::Arc;
use crate::device::{
    RayTracingDevice, DebugObject, PushConstantRange,
    DescriptorSetLayoutHandle, PipelineLayoutHandle,
};
use crate::error::Result;
use crate::{engine_bail_warn, engine_debug};

/// Owned pipeline layout
///
/// References (does not own) the descriptor set layout it was built from;
/// the owner must keep that layout alive for as long as this exists.
pub struct PipelineLayout {
    device: Arc<dyn RayTracingDevice>,
    handle: PipelineLayoutHandle,
    descriptor_set_layout: DescriptorSetLayoutHandle,
    push_constant_ranges: Vec<PushConstantRange>,
}

impl PipelineLayout {
    /// Create a layout with one descriptor set
    ///
    /// # Errors
    ///
    /// `Error::InvalidResource` when a push constant range is empty, not
    /// 4-byte aligned, or visible to no stage.
    pub fn new(
        device: Arc<dyn RayTracingDevice>,
        descriptor_set_layout: DescriptorSetLayoutHandle,
        push_constant_ranges: Vec<PushConstantRange>,
        debug_name: &str,
    ) -> Result<Self> {
        for range in &push_constant_ranges {
            if range.size == 0 || range.offset % 4 != 0 || range.size % 4 != 0 {
                engine_bail_warn!(
                    "rtp::PipelineLayout",
                    "Push constant range (offset {}, size {}) must be non-empty and 4-byte aligned",
                    range.offset,
                    range.size
                );
            }
            if range.stages.is_empty() {
                engine_bail_warn!(
                    "rtp::PipelineLayout",
                    "Push constant range (offset {}, size {}) is visible to no stage",
                    range.offset,
                    range.size
                );
            }
        }

        let handle = device.create_pipeline_layout(&[descriptor_set_layout], &push_constant_ranges)?;
        device.set_debug_name(DebugObject::PipelineLayout(handle), &format!("{}.pipeline_layout", debug_name));

        engine_debug!(
            "rtp::PipelineLayout",
            "Created pipeline layout ({} push constant ranges)",
            push_constant_ranges.len()
        );

        Ok(Self {
            device,
            handle,
            descriptor_set_layout,
            push_constant_ranges,
        })
    }

    pub fn handle(&self) -> PipelineLayoutHandle {
        self.handle
    }

    pub fn descriptor_set_layout(&self) -> DescriptorSetLayoutHandle {
        self.descriptor_set_layout
    }

    pub fn push_constant_ranges(&self) -> &[PushConstantRange] {
        &self.push_constant_ranges
    }
}

impl Drop for PipelineLayout {
    fn drop(&mut self) {
        self.device.destroy_pipeline_layout(self.handle);
    }
}

#[cfg(test)]
#[path = "pipeline_layout_tests.rs"]
mod tests;
