//! Shader stage and shader group vocabulary shared by the pipeline and the driver

use bitflags::bitflags;
use crate::device::ShaderModuleHandle;

/// Pipeline role of a single shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStageKind {
    /// Ray generation (one per pipeline, entry of every trace dispatch)
    RayGeneration,
    /// Miss (invoked when a ray hits nothing)
    Miss,
    /// Closest hit
    ClosestHit,
    /// Any hit
    AnyHit,
    /// Intersection (procedural geometry only)
    Intersection,
}

bitflags! {
    /// Shader stage visibility flags for descriptor bindings and push constants
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStageFlags: u32 {
        const RAYGEN = 0x01;
        const MISS = 0x02;
        const CLOSEST_HIT = 0x04;
        const ANY_HIT = 0x08;
        const INTERSECTION = 0x10;
        const ALL_RAY_TRACING = Self::RAYGEN.bits()
            | Self::MISS.bits()
            | Self::CLOSEST_HIT.bits()
            | Self::ANY_HIT.bits()
            | Self::INTERSECTION.bits();
    }
}

impl From<ShaderStageKind> for ShaderStageFlags {
    fn from(kind: ShaderStageKind) -> Self {
        match kind {
            ShaderStageKind::RayGeneration => ShaderStageFlags::RAYGEN,
            ShaderStageKind::Miss => ShaderStageFlags::MISS,
            ShaderStageKind::ClosestHit => ShaderStageFlags::CLOSEST_HIT,
            ShaderStageKind::AnyHit => ShaderStageFlags::ANY_HIT,
            ShaderStageKind::Intersection => ShaderStageFlags::INTERSECTION,
        }
    }
}

/// A shader module bound to one pipeline role, ready for pipeline creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineShaderStage {
    /// Transient module handle
    pub module: ShaderModuleHandle,
    /// Pipeline role
    pub kind: ShaderStageKind,
    /// Entry point name inside the module
    pub entry_point: String,
}

/// Shader group type as understood by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderGroupKind {
    /// Single ray-generation, miss or callable stage
    General,
    /// Hit group for built-in triangle geometry
    TrianglesHit,
    /// Hit group for procedural (AABB) geometry, requires an intersection stage
    ProceduralHit,
}

/// Raw shader group: the group kind plus stage indices per slot
///
/// Slots the kind does not use hold [`ShaderGroup::UNUSED`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderGroup {
    pub kind: ShaderGroupKind,
    pub general: u32,
    pub closest_hit: u32,
    pub any_hit: u32,
    pub intersection: u32,
}

impl ShaderGroup {
    /// Sentinel for an unused slot (VK_SHADER_UNUSED_KHR)
    pub const UNUSED: u32 = !0;

    /// General group around a single stage
    pub const fn general(stage: u32) -> Self {
        Self {
            kind: ShaderGroupKind::General,
            general: stage,
            closest_hit: Self::UNUSED,
            any_hit: Self::UNUSED,
            intersection: Self::UNUSED,
        }
    }

    /// Triangle hit group with a closest-hit stage
    pub const fn triangles_hit(closest_hit: u32) -> Self {
        Self {
            kind: ShaderGroupKind::TrianglesHit,
            general: Self::UNUSED,
            closest_hit,
            any_hit: Self::UNUSED,
            intersection: Self::UNUSED,
        }
    }

    /// Procedural hit group with closest-hit and intersection stages
    pub const fn procedural_hit(closest_hit: u32, intersection: u32) -> Self {
        Self {
            kind: ShaderGroupKind::ProceduralHit,
            general: Self::UNUSED,
            closest_hit,
            any_hit: Self::UNUSED,
            intersection,
        }
    }

    /// Add an any-hit stage to a hit group
    pub const fn with_any_hit(mut self, any_hit: u32) -> Self {
        self.any_hit = any_hit;
        self
    }
}
