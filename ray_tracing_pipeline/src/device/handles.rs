//! Opaque GPU object handles
//!
//! Handles are plain 64-bit values as handed out by the driver (a Vulkan
//! non-dispatchable handle, or a counter in the mock device). They carry no
//! ownership: whoever created the object is responsible for destroying it.

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(u64);

        impl $name {
            /// The null handle
            pub const NULL: Self = Self(0);

            /// Wrap a raw driver handle
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// Raw driver handle value
            pub const fn as_raw(self) -> u64 {
                self.0
            }

            pub const fn is_null(self) -> bool {
                self.0 == 0
            }
        }
    };
}

define_handle!(
    /// Compiled shader module (transient, destroyed after pipeline creation)
    ShaderModuleHandle
);
define_handle!(
    /// Descriptor set layout
    DescriptorSetLayoutHandle
);
define_handle!(
    /// Descriptor pool backing the per-frame descriptor sets
    DescriptorPoolHandle
);
define_handle!(
    /// Descriptor set (freed together with its pool)
    DescriptorSetHandle
);
define_handle!(
    /// Pipeline layout
    PipelineLayoutHandle
);
define_handle!(
    /// Ray tracing pipeline
    PipelineHandle
);
define_handle!(
    /// Top-level acceleration structure (built externally)
    AccelerationStructureHandle
);
define_handle!(
    /// Image view (built externally)
    ImageViewHandle
);
define_handle!(
    /// Buffer (built externally)
    BufferHandle
);
define_handle!(
    /// Sampler (built externally)
    SamplerHandle
);
