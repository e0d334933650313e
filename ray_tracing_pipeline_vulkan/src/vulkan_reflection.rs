/// SPIR-V interface validation using spirq
///
/// Before a shader module is handed to the driver, its entry points and the
/// descriptors they reference are reflected and checked against the pipeline's
/// descriptor set layout. A mismatch here would otherwise only show up as a
/// validation layer message (or undefined behaviour) at trace time.

use ray_tracing_pipeline::rtp::{Error, Result};
use ray_tracing_pipeline::rtp::device::{DescriptorBinding, DescriptorType};
use ray_tracing_pipeline::{engine_error, engine_warn};

/// A descriptor referenced by an entry point
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReflectedDescriptor {
    pub name: String,
    pub set: u32,
    pub binding: u32,
    /// `None` for descriptor kinds the pipeline never binds
    pub descriptor_type: Option<DescriptorType>,
    /// spirq's own name for the descriptor kind, for diagnostics
    pub spirv_type: String,
}

/// An entry point and the descriptors it statically uses
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReflectedEntryPoint {
    pub name: String,
    pub descriptors: Vec<ReflectedDescriptor>,
}

fn shader_error(module_name: &str, reason: String) -> Error {
    let message = format!("{}: {}", module_name, reason);
    engine_error!("rtp::vulkan", "{}", message);
    Error::ShaderLoadFailed(message)
}

/// Reflect every entry point of a SPIR-V module
pub(crate) fn reflect_module(module_name: &str, code: &[u32]) -> Result<Vec<ReflectedEntryPoint>> {
    let entry_points = spirq::ReflectConfig::new()
        .spv(code)
        .ref_all_rscs(false)
        .reflect()
        .map_err(|e| shader_error(module_name, format!("SPIR-V reflection failed: {:?}", e)))?;

    let reflected = entry_points
        .iter()
        .map(|entry_point| {
            let descriptors = entry_point
                .vars
                .iter()
                .filter_map(|var| match var {
                    spirq::var::Variable::Descriptor { name, desc_bind, desc_ty, .. } => {
                        Some(ReflectedDescriptor {
                            name: name.clone().unwrap_or_default(),
                            set: desc_bind.set(),
                            binding: desc_bind.bind(),
                            descriptor_type: spirq_desc_type_to_descriptor_type(desc_ty),
                            spirv_type: format!("{:?}", desc_ty),
                        })
                    }
                    _ => None,
                })
                .collect();
            ReflectedEntryPoint {
                name: entry_point.name.clone(),
                descriptors,
            }
        })
        .collect();

    Ok(reflected)
}

/// Convert a spirq descriptor type to the pipeline's descriptor type
fn spirq_desc_type_to_descriptor_type(desc_ty: &spirq::ty::DescriptorType) -> Option<DescriptorType> {
    use spirq::ty::DescriptorType as SpirqType;
    match desc_ty {
        SpirqType::AccelStruct(..) => Some(DescriptorType::AccelerationStructure),
        SpirqType::StorageImage(..) => Some(DescriptorType::StorageImage),
        SpirqType::UniformBuffer(..) => Some(DescriptorType::UniformBuffer),
        SpirqType::StorageBuffer(..) => Some(DescriptorType::StorageBuffer),
        SpirqType::CombinedImageSampler(..) => Some(DescriptorType::CombinedImageSampler),
        _ => None,
    }
}

/// Check a reflected module against the pipeline's single descriptor set layout
///
/// Fails when the entry point is missing, or when a referenced descriptor is
/// outside set 0, absent from the layout, or of the wrong type. A reference to
/// a slot that is declared unused for this scene only warns: the shader may
/// guard the access at runtime.
pub(crate) fn check_interface(
    module_name: &str,
    entry_point: &str,
    reflected: &[ReflectedEntryPoint],
    bindings: &[DescriptorBinding],
) -> Result<()> {
    let entry = match reflected.iter().find(|e| e.name == entry_point) {
        Some(entry) => entry,
        None => {
            let declared: Vec<&str> = reflected.iter().map(|e| e.name.as_str()).collect();
            return Err(shader_error(
                module_name,
                format!("entry point '{}' not found (module declares {:?})", entry_point, declared),
            ));
        }
    };

    for descriptor in &entry.descriptors {
        if descriptor.set != 0 {
            return Err(shader_error(
                module_name,
                format!(
                    "'{}' uses descriptor set {} but the pipeline has a single set",
                    descriptor.name, descriptor.set
                ),
            ));
        }

        let binding = match bindings.iter().find(|b| b.binding == descriptor.binding) {
            Some(binding) => binding,
            None => {
                return Err(shader_error(
                    module_name,
                    format!("'{}' uses binding {} which the layout does not declare", descriptor.name, descriptor.binding),
                ));
            }
        };

        if descriptor.descriptor_type != Some(binding.descriptor_type) {
            return Err(shader_error(
                module_name,
                format!(
                    "'{}' at binding {} is {} but the layout declares {:?}",
                    descriptor.name, descriptor.binding, descriptor.spirv_type, binding.descriptor_type
                ),
            ));
        }

        if binding.is_unused() {
            engine_warn!("rtp::vulkan",
                "{}: '{}' references binding {} which holds no descriptors for this scene",
                module_name, descriptor.name, descriptor.binding);
        }
    }

    Ok(())
}

/// Reflect a module and check it against `bindings`
pub(crate) fn validate_module(
    module_name: &str,
    code: &[u32],
    entry_point: &str,
    bindings: &[DescriptorBinding],
) -> Result<()> {
    let reflected = reflect_module(module_name, code)?;
    check_interface(module_name, entry_point, &reflected, bindings)
}

#[cfg(test)]
#[path = "vulkan_reflection_tests.rs"]
mod tests;
