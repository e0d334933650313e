//! SceneResources trait - GPU buffers a loaded scene exposes to the ray tracing shaders

use crate::device::{BufferHandle, ImageViewHandle, SamplerHandle};

/// Scene buffers bound by the ray tracing pipeline
///
/// Implemented by the host's scene/asset layer. All handles must stay valid
/// for as long as any pipeline built from them exists.
pub trait SceneResources: Send + Sync {
    /// Concatenated vertex data of every mesh
    fn vertex_buffer(&self) -> BufferHandle;

    /// Concatenated index data of every mesh
    fn index_buffer(&self) -> BufferHandle;

    /// Material parameters, indexed per instance
    fn material_buffer(&self) -> BufferHandle;

    /// Per-instance (vertex offset, index offset) pairs into the buffers above
    fn offset_buffer(&self) -> BufferHandle;

    /// AABB buffer of procedural geometry, `None` when the scene has none
    fn procedural_buffer(&self) -> Option<BufferHandle>;

    /// Texture image views paired with their samplers
    fn textures(&self) -> Vec<(ImageViewHandle, SamplerHandle)>;

    fn has_procedurals(&self) -> bool {
        self.procedural_buffer().is_some()
    }
}
