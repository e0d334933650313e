//! SwapChain trait - the swap chain as seen by the ray tracing pipeline
//!
//! Swap chain creation and recreation are owned by the host renderer. The
//! pipeline only reads the frame count (one descriptor set per in-flight
//! frame) and keeps the swap chain alive for as long as it exists.

/// Swap chain abstraction
pub trait SwapChain: Send + Sync {
    /// Number of in-flight frames (one descriptor set and uniform buffer each)
    fn frame_count(&self) -> u32;

    /// Image extent (width, height) in pixels
    fn extent(&self) -> (u32, u32);

    /// Raw driver image format (a `VkFormat` value for the Vulkan backend)
    fn image_format(&self) -> i32;
}
