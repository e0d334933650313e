/// VulkanSwapChainInfo - the host renderer's swap chain as seen by the pipeline
///
/// The renderer owns the `VkSwapchainKHR` and recreates it on resize. The
/// pipeline only needs the in-flight frame count, the extent and the format,
/// so this is a plain snapshot of those values.

use ash::vk;
use ray_tracing_pipeline::rtp::device::SwapChain;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VulkanSwapChainInfo {
    image_count: u32,
    extent: vk::Extent2D,
    format: vk::Format,
}

impl VulkanSwapChainInfo {
    /// Snapshot a swap chain with `image_count` images
    pub fn new(image_count: u32, extent: vk::Extent2D, format: vk::Format) -> Self {
        Self {
            image_count,
            extent,
            format,
        }
    }

    pub fn vk_extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub fn vk_format(&self) -> vk::Format {
        self.format
    }
}

impl SwapChain for VulkanSwapChainInfo {
    fn frame_count(&self) -> u32 {
        self.image_count
    }

    fn extent(&self) -> (u32, u32) {
        (self.extent.width, self.extent.height)
    }

    fn image_format(&self) -> i32 {
        self.format.as_raw()
    }
}
