/// Mock scene for unit tests: fixed buffer handles in the 1000 range

use crate::device::{BufferHandle, ImageViewHandle, SamplerHandle};
use crate::scene::SceneResources;

#[derive(Debug, Clone)]
pub struct MockScene {
    pub procedural: Option<BufferHandle>,
    pub textures: Vec<(ImageViewHandle, SamplerHandle)>,
}

impl MockScene {
    pub const VERTEX_BUFFER: BufferHandle = BufferHandle::from_raw(1001);
    pub const INDEX_BUFFER: BufferHandle = BufferHandle::from_raw(1002);
    pub const MATERIAL_BUFFER: BufferHandle = BufferHandle::from_raw(1003);
    pub const OFFSET_BUFFER: BufferHandle = BufferHandle::from_raw(1004);
    pub const PROCEDURAL_BUFFER: BufferHandle = BufferHandle::from_raw(1005);

    /// Triangle-only scene with no textures
    pub fn new() -> Self {
        Self {
            procedural: None,
            textures: Vec::new(),
        }
    }

    pub fn with_procedurals(mut self) -> Self {
        self.procedural = Some(Self::PROCEDURAL_BUFFER);
        self
    }

    pub fn with_textures(mut self, count: u64) -> Self {
        self.textures = (0..count)
            .map(|i| (ImageViewHandle::from_raw(2000 + i), SamplerHandle::from_raw(3000)))
            .collect();
        self
    }
}

impl SceneResources for MockScene {
    fn vertex_buffer(&self) -> BufferHandle {
        Self::VERTEX_BUFFER
    }

    fn index_buffer(&self) -> BufferHandle {
        Self::INDEX_BUFFER
    }

    fn material_buffer(&self) -> BufferHandle {
        Self::MATERIAL_BUFFER
    }

    fn offset_buffer(&self) -> BufferHandle {
        Self::OFFSET_BUFFER
    }

    fn procedural_buffer(&self) -> Option<BufferHandle> {
        self.procedural
    }

    fn textures(&self) -> Vec<(ImageViewHandle, SamplerHandle)> {
        self.textures.clone()
    }
}
