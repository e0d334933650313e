//! Shader stage/group table
//!
//! The table is the single place where shader stages are assigned to shader
//! groups. Every group carries the role it plays at dispatch time, and the
//! four exported group indices are found by searching the table for those
//! roles, so reordering groups can never silently desynchronize the indices
//! from the compiled pipeline.

use crate::device::{ShaderGroup, ShaderGroupKind, ShaderStageKind};
use crate::error::Result;
use crate::engine_bail_warn;

/// One shader stage: a SPIR-V file bound to a pipeline role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderStageDesc {
    /// SPIR-V file name, resolved by the shader loader
    pub file_name: String,
    pub kind: ShaderStageKind,
    pub entry_point: String,
}

impl ShaderStageDesc {
    /// Stage with the conventional `main` entry point
    pub fn new(file_name: impl Into<String>, kind: ShaderStageKind) -> Self {
        Self {
            file_name: file_name.into(),
            kind,
            entry_point: "main".to_string(),
        }
    }
}

/// Role a shader group plays in the shader binding table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupRole {
    RayGeneration,
    Miss,
    TriangleHit,
    ProceduralHit,
}

impl GroupRole {
    /// Every role, in the order groups are laid out by default
    pub const ALL: [GroupRole; 4] = [
        GroupRole::RayGeneration,
        GroupRole::Miss,
        GroupRole::TriangleHit,
        GroupRole::ProceduralHit,
    ];

    /// Group kind a group playing this role must have
    pub fn group_kind(self) -> ShaderGroupKind {
        match self {
            GroupRole::RayGeneration | GroupRole::Miss => ShaderGroupKind::General,
            GroupRole::TriangleHit => ShaderGroupKind::TrianglesHit,
            GroupRole::ProceduralHit => ShaderGroupKind::ProceduralHit,
        }
    }
}

/// A shader group tagged with its role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaggedShaderGroup {
    pub role: GroupRole,
    pub group: ShaderGroup,
}

/// Position of each role's group in the compiled group list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderGroupIndices {
    pub ray_gen: u32,
    pub miss: u32,
    pub triangle_hit_group: u32,
    pub procedural_hit_group: u32,
}

impl ShaderGroupIndices {
    pub fn get(&self, role: GroupRole) -> u32 {
        match role {
            GroupRole::RayGeneration => self.ray_gen,
            GroupRole::Miss => self.miss,
            GroupRole::TriangleHit => self.triangle_hit_group,
            GroupRole::ProceduralHit => self.procedural_hit_group,
        }
    }

    /// [ray_gen, miss, triangle_hit_group, procedural_hit_group]
    pub fn as_array(&self) -> [u32; 4] {
        [self.ray_gen, self.miss, self.triangle_hit_group, self.procedural_hit_group]
    }
}

/// Validated, ordered shader stages and tagged shader groups
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderGroupTable {
    stages: Vec<ShaderStageDesc>,
    groups: Vec<TaggedShaderGroup>,
    indices: ShaderGroupIndices,
}

impl ShaderGroupTable {
    /// Build and validate a table
    ///
    /// # Errors
    ///
    /// `Error::InvalidResource` when a group references a stage out of range,
    /// a slot holds a stage of the wrong kind, a group kind does not match its
    /// role, or a role is missing or repeated.
    pub fn new(stages: Vec<ShaderStageDesc>, groups: Vec<TaggedShaderGroup>) -> Result<Self> {
        for (group_index, tagged) in groups.iter().enumerate() {
            validate_group(&stages, group_index, tagged)?;
        }

        let indices = ShaderGroupIndices {
            ray_gen: find_role(&groups, GroupRole::RayGeneration)?,
            miss: find_role(&groups, GroupRole::Miss)?,
            triangle_hit_group: find_role(&groups, GroupRole::TriangleHit)?,
            procedural_hit_group: find_role(&groups, GroupRole::ProceduralHit)?,
        };

        Ok(Self { stages, groups, indices })
    }

    pub fn stages(&self) -> &[ShaderStageDesc] {
        &self.stages
    }

    pub fn groups(&self) -> &[TaggedShaderGroup] {
        &self.groups
    }

    /// Untagged groups, in compiled order
    pub fn raw_groups(&self) -> Vec<ShaderGroup> {
        self.groups.iter().map(|tagged| tagged.group).collect()
    }

    pub fn indices(&self) -> ShaderGroupIndices {
        self.indices
    }

    pub fn group_count(&self) -> u32 {
        self.groups.len() as u32
    }
}

impl Default for ShaderGroupTable {
    /// Ray generation, miss, triangle hit group, procedural hit group
    fn default() -> Self {
        let stages = vec![
            ShaderStageDesc::new("RayTracing.rgen.spv", ShaderStageKind::RayGeneration),
            ShaderStageDesc::new("RayTracing.rmiss.spv", ShaderStageKind::Miss),
            ShaderStageDesc::new("RayTracing.rchit.spv", ShaderStageKind::ClosestHit),
            ShaderStageDesc::new("RayTracing.Procedural.rchit.spv", ShaderStageKind::ClosestHit),
            ShaderStageDesc::new("RayTracing.Procedural.rint.spv", ShaderStageKind::Intersection),
        ];
        let groups = vec![
            TaggedShaderGroup { role: GroupRole::RayGeneration, group: ShaderGroup::general(0) },
            TaggedShaderGroup { role: GroupRole::Miss, group: ShaderGroup::general(1) },
            TaggedShaderGroup { role: GroupRole::TriangleHit, group: ShaderGroup::triangles_hit(2) },
            TaggedShaderGroup { role: GroupRole::ProceduralHit, group: ShaderGroup::procedural_hit(3, 4) },
        ];

        Self {
            stages,
            groups,
            indices: ShaderGroupIndices {
                ray_gen: 0,
                miss: 1,
                triangle_hit_group: 2,
                procedural_hit_group: 3,
            },
        }
    }
}

fn find_role(groups: &[TaggedShaderGroup], role: GroupRole) -> Result<u32> {
    let mut positions = groups
        .iter()
        .enumerate()
        .filter(|(_, tagged)| tagged.role == role)
        .map(|(index, _)| index as u32);

    match (positions.next(), positions.next()) {
        (Some(index), None) => Ok(index),
        (None, _) => engine_bail_warn!("rtp::ShaderGroupTable", "No shader group plays the {:?} role", role),
        (Some(first), Some(second)) => engine_bail_warn!(
            "rtp::ShaderGroupTable",
            "{:?} role is played by groups {} and {}",
            role, first, second
        ),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotUsage {
    Required,
    Optional,
    Forbidden,
}

fn validate_group(stages: &[ShaderStageDesc], group_index: usize, tagged: &TaggedShaderGroup) -> Result<()> {
    use SlotUsage::*;

    let group = &tagged.group;

    if group.kind != tagged.role.group_kind() {
        engine_bail_warn!(
            "rtp::ShaderGroupTable",
            "Group {} plays {:?} but is a {:?} group",
            group_index, tagged.role, group.kind
        );
    }

    let general_kind = match tagged.role {
        GroupRole::RayGeneration => ShaderStageKind::RayGeneration,
        _ => ShaderStageKind::Miss,
    };
    let (general, closest_hit, any_hit, intersection) = match group.kind {
        ShaderGroupKind::General => (Required, Forbidden, Forbidden, Forbidden),
        ShaderGroupKind::TrianglesHit => (Forbidden, Required, Optional, Forbidden),
        ShaderGroupKind::ProceduralHit => (Forbidden, Required, Optional, Required),
    };
    let slots = [
        ("general", group.general, general_kind, general),
        ("closest_hit", group.closest_hit, ShaderStageKind::ClosestHit, closest_hit),
        ("any_hit", group.any_hit, ShaderStageKind::AnyHit, any_hit),
        ("intersection", group.intersection, ShaderStageKind::Intersection, intersection),
    ];

    for (slot, stage_index, required_kind, usage) in slots {
        match (stage_index == ShaderGroup::UNUSED, usage) {
            (true, Required) => engine_bail_warn!(
                "rtp::ShaderGroupTable",
                "Group {} ({:?}) leaves its {} slot unused",
                group_index, tagged.role, slot
            ),
            (true, _) => continue,
            (false, Forbidden) => engine_bail_warn!(
                "rtp::ShaderGroupTable",
                "Group {} ({:?}) must not use its {} slot",
                group_index, tagged.role, slot
            ),
            (false, _) => {}
        }

        let stage = match stages.get(stage_index as usize) {
            Some(stage) => stage,
            None => engine_bail_warn!(
                "rtp::ShaderGroupTable",
                "Group {} {} slot references stage {} but only {} stages exist",
                group_index, slot, stage_index, stages.len()
            ),
        };
        if stage.kind != required_kind {
            engine_bail_warn!(
                "rtp::ShaderGroupTable",
                "Group {} {} slot references '{}' which is a {:?} stage, expected {:?}",
                group_index, slot, stage.file_name, stage.kind, required_kind
            );
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "shader_table_tests.rs"]
mod tests;
