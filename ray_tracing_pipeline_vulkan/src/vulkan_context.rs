/// VulkanContext - headless instance and device with ray tracing enabled
///
/// The pipeline normally borrows the host renderer's device. This context is
/// for tools and GPU tests that need a ray tracing capable device without a
/// window: it creates the instance, picks the first physical device exposing
/// VK_KHR_ray_tracing_pipeline, and owns the resulting logical device.

use ash::vk;
use std::ffi::CStr;
use std::sync::Arc;
use ray_tracing_pipeline::rtp::{Error, Result};
use ray_tracing_pipeline::{engine_error, engine_info};
use crate::debug::ValidationConfig;
use crate::vulkan_device::{VulkanDeviceConfig, VulkanRayTracingDevice};

/// Headless context configuration
#[derive(Debug, Clone)]
pub struct VulkanContextConfig {
    pub application_name: String,
    /// Enable VK_LAYER_KHRONOS_validation (only with the `vulkan-validation` feature)
    pub enable_validation: bool,
    pub validation: ValidationConfig,
}

impl Default for VulkanContextConfig {
    fn default() -> Self {
        Self {
            application_name: "Ray Tracing Pipeline".to_string(),
            enable_validation: cfg!(feature = "vulkan-validation"),
            validation: ValidationConfig::default(),
        }
    }
}

fn init_error(action: &str, e: impl std::fmt::Debug) -> Error {
    engine_error!("rtp::vulkan", "Failed to {}: {:?}", action, e);
    Error::InitializationFailed(format!("Failed to {}: {:?}", action, e))
}

fn required_device_extensions() -> [&'static CStr; 3] {
    [
        ash::khr::ray_tracing_pipeline::NAME,
        ash::khr::acceleration_structure::NAME,
        ash::khr::deferred_host_operations::NAME,
    ]
}

pub struct VulkanContext {
    _entry: ash::Entry,
    instance: ash::Instance,
    physical_device: vk::PhysicalDevice,
    device: ash::Device,
    queue_family_index: u32,
    debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl VulkanContext {
    pub fn new(config: VulkanContextConfig) -> Result<Self> {
        let validation = config.enable_validation && cfg!(feature = "vulkan-validation");

        unsafe {
            let entry = ash::Entry::load().map_err(|e| init_error("load Vulkan library", e))?;

            let application_name = std::ffi::CString::new(config.application_name.as_str())
                .map_err(|e| init_error("encode application name", e))?;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&application_name)
                .application_version(vk::make_api_version(0, 1, 0, 0))
                .engine_name(c"ray_tracing_pipeline")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            let mut extension_names = Vec::new();
            let mut layer_names = Vec::new();
            if validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
                layer_names.push(c"VK_LAYER_KHRONOS_validation".as_ptr());
            }

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| init_error("create Vulkan instance", e))?;

            let (debug_utils_loader, debug_messenger) = if validation {
                let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);
                crate::debug::init_debug_config(config.validation.clone());

                let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
                    .message_severity(config.validation.severity_flags())
                    .message_type(
                        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
                    )
                    .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

                match debug_utils.create_debug_utils_messenger(&debug_info, None) {
                    Ok(messenger) => (Some(debug_utils), Some(messenger)),
                    Err(e) => {
                        instance.destroy_instance(None);
                        return Err(init_error("create debug messenger", e));
                    }
                }
            } else {
                (None, None)
            };

            // From here on, `partial` destroys what was created if a later step fails
            let partial = PartialContext {
                instance: &instance,
                debug_utils_loader: debug_utils_loader.as_ref(),
                debug_messenger,
                armed: true,
            };

            let (physical_device, queue_family_index) = Self::pick_physical_device(&instance)?;

            let queue_priorities = [1.0];
            let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
                .queue_family_index(queue_family_index)
                .queue_priorities(&queue_priorities)];

            let device_extension_names: Vec<*const std::os::raw::c_char> =
                required_device_extensions().iter().map(|name| name.as_ptr()).collect();

            let mut buffer_device_address = vk::PhysicalDeviceBufferDeviceAddressFeatures::default()
                .buffer_device_address(true);
            let mut acceleration_structure = vk::PhysicalDeviceAccelerationStructureFeaturesKHR::default()
                .acceleration_structure(true);
            let mut ray_tracing_pipeline = vk::PhysicalDeviceRayTracingPipelineFeaturesKHR::default()
                .ray_tracing_pipeline(true);
            let mut features = vk::PhysicalDeviceFeatures2::default()
                .push_next(&mut buffer_device_address)
                .push_next(&mut acceleration_structure)
                .push_next(&mut ray_tracing_pipeline);

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names)
                .push_next(&mut features);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| init_error("create logical device", e))?;

            partial.disarm();

            let properties = instance.get_physical_device_properties(physical_device);
            let device_name = properties
                .device_name_as_c_str()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "unknown".to_string());
            engine_info!("rtp::vulkan", "Ray tracing context created on {}", device_name);

            Ok(Self {
                _entry: entry,
                instance,
                physical_device,
                device,
                queue_family_index,
                debug_utils_loader,
                debug_messenger,
            })
        }
    }

    /// First physical device with ray tracing support and a compute queue
    fn pick_physical_device(instance: &ash::Instance) -> Result<(vk::PhysicalDevice, u32)> {
        let physical_devices = unsafe { instance.enumerate_physical_devices() }
            .map_err(|e| init_error("enumerate physical devices", e))?;

        for physical_device in physical_devices {
            let extensions = match unsafe { instance.enumerate_device_extension_properties(physical_device) } {
                Ok(extensions) => extensions,
                Err(_) => continue,
            };
            let supports_all = required_device_extensions().iter().all(|required| {
                extensions
                    .iter()
                    .any(|ext| ext.extension_name_as_c_str().is_ok_and(|name| name == *required))
            });
            if !supports_all {
                continue;
            }

            let queue_families =
                unsafe { instance.get_physical_device_queue_family_properties(physical_device) };
            if let Some(index) = queue_families
                .iter()
                .position(|qf| qf.queue_flags.contains(vk::QueueFlags::COMPUTE))
            {
                return Ok((physical_device, index as u32));
            }
        }

        engine_error!("rtp::vulkan", "No GPU with VK_KHR_ray_tracing_pipeline support found");
        Err(Error::InitializationFailed(
            "No GPU with VK_KHR_ray_tracing_pipeline support found".to_string(),
        ))
    }

    /// Create a ray tracing device over this context's logical device
    pub fn ray_tracing_device(&self) -> Arc<VulkanRayTracingDevice> {
        Arc::new(VulkanRayTracingDevice::new(
            &self.instance,
            self.device.clone(),
            self.physical_device,
            VulkanDeviceConfig {
                enable_debug_names: self.debug_utils_loader.is_some(),
            },
        ))
    }

    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
            if let (Some(loader), Some(messenger)) = (&self.debug_utils_loader, self.debug_messenger) {
                loader.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

/// Cleanup guard for a context whose construction has not finished
struct PartialContext<'a> {
    instance: &'a ash::Instance,
    debug_utils_loader: Option<&'a ash::ext::debug_utils::Instance>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    armed: bool,
}

impl PartialContext<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PartialContext<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        unsafe {
            if let (Some(loader), Some(messenger)) = (self.debug_utils_loader, self.debug_messenger) {
                loader.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}
