//! Light probes as seen by the ray tracing shaders
//!
//! Probe data is generated and uploaded by the host. The pipeline only binds
//! the two buffers (probe records and probe positions), and only when there is
//! something to bind: an empty probe list resolves to [`LightProbeBinding::Absent`],
//! which leaves both binding slots declared but unused.

use bytemuck::{Pod, Zeroable};
use glam::Vec4;
use crate::device::BufferHandle;
use crate::engine_warn;

/// GPU layout of one light probe record (std430 compatible)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightProbe {
    /// World-space position (w = influence radius)
    pub position: Vec4,
    /// Order-2 spherical harmonics irradiance, RGB in xyz
    pub sh_coefficients: [Vec4; 9],
}

impl LightProbe {
    /// Size of one record in the probe buffer
    pub const GPU_SIZE: u64 = std::mem::size_of::<LightProbe>() as u64;

    /// Size of one entry in the probe position buffer
    pub const POSITION_GPU_SIZE: u64 = std::mem::size_of::<Vec4>() as u64;

    pub fn new(position: Vec4) -> Self {
        Self {
            position,
            sh_coefficients: [Vec4::ZERO; 9],
        }
    }
}

/// Light probe input of the pipeline: probe list plus the buffers holding it
#[derive(Debug, Clone, Default)]
pub struct LightProbeSource {
    pub probes: Vec<LightProbe>,
    /// Buffer holding `probes` (one [`LightProbe`] record each)
    pub probe_buffer: Option<BufferHandle>,
    /// Buffer holding one position (Vec4) per probe
    pub position_buffer: Option<BufferHandle>,
}

/// Light probe binding resolved once at pipeline construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightProbeBinding {
    /// Both buffers are bound with ranges covering `count` probes
    Present {
        probe_buffer: BufferHandle,
        probe_range: u64,
        position_buffer: BufferHandle,
        position_range: u64,
        count: u32,
    },
    /// Probe slots are declared with zero descriptors and never written
    Absent,
}

impl LightProbeSource {
    /// No light probes
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(probes: Vec<LightProbe>, probe_buffer: BufferHandle, position_buffer: BufferHandle) -> Self {
        Self {
            probes,
            probe_buffer: Some(probe_buffer),
            position_buffer: Some(position_buffer),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    /// Probe records as raw bytes, ready for upload into `probe_buffer`
    pub fn probe_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.probes)
    }

    /// Probe positions, in upload order for `position_buffer`
    pub fn positions(&self) -> Vec<Vec4> {
        self.probes.iter().map(|probe| probe.position).collect()
    }

    /// Resolve into the binding written into the descriptor sets
    ///
    /// Probes without a backing buffer cannot be bound: they are dropped with
    /// a warning instead of failing construction.
    pub fn resolve(&self) -> LightProbeBinding {
        if self.probes.is_empty() {
            return LightProbeBinding::Absent;
        }

        match (self.probe_buffer, self.position_buffer) {
            (Some(probe_buffer), Some(position_buffer))
                if !probe_buffer.is_null() && !position_buffer.is_null() =>
            {
                let count = self.probes.len() as u64;
                LightProbeBinding::Present {
                    probe_buffer,
                    probe_range: count * LightProbe::GPU_SIZE,
                    position_buffer,
                    position_range: count * LightProbe::POSITION_GPU_SIZE,
                    count: self.probes.len() as u32,
                }
            }
            _ => {
                engine_warn!(
                    "rtp::LightProbeSource",
                    "{} light probes given without probe/position buffers, probe bindings left unused",
                    self.probes.len()
                );
                LightProbeBinding::Absent
            }
        }
    }
}

impl LightProbeBinding {
    pub fn is_present(&self) -> bool {
        matches!(self, LightProbeBinding::Present { .. })
    }

    /// Number of bound probes (0 when absent)
    pub fn count(&self) -> u32 {
        match self {
            LightProbeBinding::Present { count, .. } => *count,
            LightProbeBinding::Absent => 0,
        }
    }
}

#[cfg(test)]
#[path = "light_probe_tests.rs"]
mod tests;
