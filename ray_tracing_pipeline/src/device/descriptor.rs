//! Descriptor binding types
//!
//! A descriptor binding describes one slot of the pipeline's descriptor set
//! layout. Resources are written into slots through [`DescriptorWrite`]s.

use crate::device::{
    AccelerationStructureHandle, BufferHandle, ImageViewHandle, SamplerHandle, ShaderStageFlags,
};

/// Type of resource bound at a given slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DescriptorType {
    /// Top-level acceleration structure
    AccelerationStructure,
    /// Read/write storage image (accumulation, output)
    StorageImage,
    /// Uniform buffer (per-frame camera/scene parameters)
    UniformBuffer,
    /// Storage buffer (geometry, materials, light probes)
    StorageBuffer,
    /// Combined image sampler (scene textures)
    CombinedImageSampler,
}

/// How often the resource behind a binding changes across in-flight frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingFrequency {
    /// One resource per frame (written with the frame's own resource)
    PerFrame,
    /// One resource shared by every frame's set
    Shared,
}

/// Description of a single binding slot within the descriptor set layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorBinding {
    /// Binding number (corresponds to `layout(binding = N)` in GLSL)
    pub binding: u32,
    /// Type of resource at this binding
    pub descriptor_type: DescriptorType,
    /// Number of descriptors at this binding; 0 declares an unused slot
    pub count: u32,
    /// Shader stages that access this binding
    pub stages: ShaderStageFlags,
    /// Per-frame or shared resource
    pub frequency: BindingFrequency,
}

impl DescriptorBinding {
    /// A slot with no descriptors: reserved in the layout, never written
    pub fn is_unused(&self) -> bool {
        self.count == 0
    }
}

/// Descriptor pool capacity for one descriptor type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorPoolSize {
    pub descriptor_type: DescriptorType,
    pub count: u32,
}

/// A concrete resource to write into a binding slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorResource {
    /// Acceleration structure binding
    AccelerationStructure(AccelerationStructureHandle),
    /// Storage image binding (image is expected in GENERAL layout)
    StorageImage(ImageViewHandle),
    /// Uniform buffer binding (whole buffer)
    UniformBuffer(BufferHandle),
    /// Storage buffer binding; `range: None` binds the whole buffer
    StorageBuffer {
        buffer: BufferHandle,
        range: Option<u64>,
    },
    /// Array of sampled textures
    CombinedImageSamplers(Vec<(ImageViewHandle, SamplerHandle)>),
}

impl DescriptorResource {
    /// Descriptor type this resource must be written to
    pub fn descriptor_type(&self) -> DescriptorType {
        match self {
            DescriptorResource::AccelerationStructure(_) => DescriptorType::AccelerationStructure,
            DescriptorResource::StorageImage(_) => DescriptorType::StorageImage,
            DescriptorResource::UniformBuffer(_) => DescriptorType::UniformBuffer,
            DescriptorResource::StorageBuffer { .. } => DescriptorType::StorageBuffer,
            DescriptorResource::CombinedImageSamplers(_) => DescriptorType::CombinedImageSampler,
        }
    }

    /// Number of descriptors written
    pub fn descriptor_count(&self) -> u32 {
        match self {
            DescriptorResource::CombinedImageSamplers(textures) => textures.len() as u32,
            _ => 1,
        }
    }
}

/// A write of one resource into one binding slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorWrite {
    pub binding: u32,
    pub resource: DescriptorResource,
}

/// Push constant range descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushConstantRange {
    /// Shader stages that can access these push constants
    pub stages: ShaderStageFlags,
    /// Offset in bytes
    pub offset: u32,
    /// Size in bytes
    pub size: u32,
}
