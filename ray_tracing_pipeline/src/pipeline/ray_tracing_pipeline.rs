//! RayTracingPipeline - owns a compiled ray tracing pipeline and everything it is bound with
//!
//! Construction happens in one pass:
//! descriptor layout -> pool -> per-frame sets -> writes -> pipeline layout
//! -> shader modules -> pipeline -> shader modules released.
//!
//! Nothing is created lazily and nothing changes after construction. Any
//! change of shaders, resources or frame count means building a new pipeline.

use std::sync::Arc;

use crate::device::{
    RayTracingDevice, SwapChain, ShaderModuleDesc, RayTracingPipelineCreateDesc, DebugObject,
    PipelineShaderStage, ShaderModuleHandle, PipelineHandle, DescriptorSetHandle,
    AccelerationStructureHandle, ImageViewHandle, BufferHandle,
};
use crate::scene::{SceneResources, LightProbeSource, LightProbeBinding};
use crate::pipeline::{
    RayTracingPipelineConfig, ShaderLoader, FileShaderLoader, ShaderGroupIndices,
    DescriptorSetManager, PipelineResources, PipelineLayout, ShaderBindingTableLayout,
};
use crate::error::Result;
use crate::{engine_bail_warn, engine_debug, engine_error, engine_info, engine_trace};

/// Everything a ray tracing pipeline is built from
pub struct RayTracingPipelineDesc {
    /// Ray tracing device capability (driver function table)
    pub device: Arc<dyn RayTracingDevice>,
    /// Determines the number of descriptor sets; kept alive by the pipeline
    pub swap_chain: Arc<dyn SwapChain>,
    /// Top-level acceleration structure
    pub acceleration_structure: AccelerationStructureHandle,
    /// Accumulation storage image
    pub accumulation_image: ImageViewHandle,
    /// Output storage image
    pub output_image: ImageViewHandle,
    /// One uniform buffer per swap chain frame
    pub uniform_buffers: Vec<BufferHandle>,
    pub scene: Arc<dyn SceneResources>,
    /// May be empty
    pub light_probes: LightProbeSource,
    /// Shader source; `None` reads files from `config.shader_directory`
    pub shader_loader: Option<Arc<dyn ShaderLoader>>,
    pub config: RayTracingPipelineConfig,
}

/// Transient shader modules, destroyed when the guard goes out of scope
/// whether or not pipeline creation succeeded
struct TransientShaderModules<'a> {
    device: &'a dyn RayTracingDevice,
    modules: Vec<ShaderModuleHandle>,
}

impl<'a> TransientShaderModules<'a> {
    fn new(device: &'a dyn RayTracingDevice) -> Self {
        Self {
            device,
            modules: Vec::new(),
        }
    }

    fn push(&mut self, module: ShaderModuleHandle) {
        self.modules.push(module);
    }
}

impl Drop for TransientShaderModules<'_> {
    fn drop(&mut self) {
        for module in self.modules.drain(..) {
            self.device.destroy_shader_module(module);
        }
    }
}

/// Compiled ray tracing pipeline with its layout and per-frame descriptor sets
///
/// Dropping it destroys the pipeline, then the pipeline layout, then the
/// descriptor pool and set layout. It must be dropped before the device and
/// the resources it binds.
pub struct RayTracingPipeline {
    device: Arc<dyn RayTracingDevice>,
    swap_chain: Arc<dyn SwapChain>,
    handle: PipelineHandle,
    // Declaration order is drop order: the layout goes before the descriptor sets
    pipeline_layout: PipelineLayout,
    descriptor_set_manager: DescriptorSetManager,
    indices: ShaderGroupIndices,
    group_count: u32,
    light_probes: LightProbeBinding,
    debug_name: String,
}

impl RayTracingPipeline {
    /// Build the pipeline
    ///
    /// # Errors
    ///
    /// - `Error::InvalidResource` for invalid inputs (zero frames, uniform
    ///   buffer count different from the frame count, null handles,
    ///   unsupported recursion depth), reported before any driver call
    /// - `Error::DescriptorPoolExhausted` when set allocation fails, reported
    ///   before any shader is loaded
    /// - `Error::ShaderLoadFailed` when a shader cannot be loaded or is rejected
    /// - driver errors from pipeline creation
    ///
    /// Objects created before a failure are released before returning.
    pub fn new(desc: RayTracingPipelineDesc) -> Result<Self> {
        let RayTracingPipelineDesc {
            device,
            swap_chain,
            acceleration_structure,
            accumulation_image,
            output_image,
            uniform_buffers,
            scene,
            light_probes,
            shader_loader,
            config,
        } = desc;

        let frame_count = swap_chain.frame_count();
        let debug_name = config.debug_name.as_str();

        // ===== INPUT VALIDATION =====

        if frame_count == 0 {
            engine_bail_warn!("rtp::RayTracingPipeline", "Swap chain reports 0 frames");
        }
        if uniform_buffers.len() != frame_count as usize {
            engine_bail_warn!(
                "rtp::RayTracingPipeline",
                "Expected one uniform buffer per frame ({} frames), got {}",
                frame_count,
                uniform_buffers.len()
            );
        }
        if acceleration_structure.is_null() {
            engine_bail_warn!("rtp::RayTracingPipeline", "Top-level acceleration structure is null");
        }
        if accumulation_image.is_null() || output_image.is_null() {
            engine_bail_warn!("rtp::RayTracingPipeline", "Accumulation and output images must not be null");
        }
        if let Some(frame) = uniform_buffers.iter().position(|buffer| buffer.is_null()) {
            engine_bail_warn!("rtp::RayTracingPipeline", "Uniform buffer of frame {} is null", frame);
        }

        let scene_buffers = [
            ("vertex", scene.vertex_buffer()),
            ("index", scene.index_buffer()),
            ("material", scene.material_buffer()),
            ("offset", scene.offset_buffer()),
        ];
        for (name, buffer) in scene_buffers {
            if buffer.is_null() {
                engine_bail_warn!("rtp::RayTracingPipeline", "Scene {} buffer is null", name);
            }
        }
        if scene.procedural_buffer().is_some_and(|buffer| buffer.is_null()) {
            engine_bail_warn!("rtp::RayTracingPipeline", "Scene procedural buffer is null");
        }
        let textures = scene.textures();
        if let Some(texture) = textures.iter().position(|(view, sampler)| view.is_null() || sampler.is_null()) {
            engine_bail_warn!("rtp::RayTracingPipeline", "Texture {} has a null image view or sampler", texture);
        }

        let max_depth = device.shader_group_handle_properties().max_ray_recursion_depth;
        if config.max_ray_recursion_depth == 0 || config.max_ray_recursion_depth > max_depth {
            engine_bail_warn!(
                "rtp::RayTracingPipeline",
                "Ray recursion depth {} outside supported range 1..={}",
                config.max_ray_recursion_depth,
                max_depth
            );
        }

        let light_probes = light_probes.resolve();
        let resources = PipelineResources {
            acceleration_structure,
            accumulation_image,
            output_image,
            uniform_buffers,
            vertex_buffer: scene.vertex_buffer(),
            index_buffer: scene.index_buffer(),
            material_buffer: scene.material_buffer(),
            offset_buffer: scene.offset_buffer(),
            textures,
            procedural_buffer: scene.procedural_buffer(),
            light_probes,
        };

        engine_debug!(
            "rtp::RayTracingPipeline",
            "Building '{}': {} frames, {} textures, procedurals: {}, light probes: {}",
            debug_name,
            frame_count,
            resources.textures.len(),
            scene.has_procedurals(),
            light_probes.count()
        );

        // ===== DESCRIPTOR SETS =====

        let descriptor_set_manager = DescriptorSetManager::new(
            Arc::clone(&device),
            resources.bindings(),
            frame_count,
            debug_name,
        )
        .map_err(|e| {
            engine_error!("rtp::RayTracingPipeline", "Descriptor set allocation failed: {}", e);
            e
        })?;

        for frame in 0..frame_count as usize {
            descriptor_set_manager.write(frame, &resources.writes(frame))?;
        }

        // ===== PIPELINE LAYOUT =====

        let pipeline_layout = PipelineLayout::new(
            Arc::clone(&device),
            descriptor_set_manager.layout(),
            config.push_constant_ranges.clone(),
            debug_name,
        )?;

        // ===== SHADERS =====

        let shader_loader = shader_loader
            .unwrap_or_else(|| Arc::new(FileShaderLoader::new(config.shader_directory.clone())));
        let table = &config.shader_table;

        let mut modules = TransientShaderModules::new(device.as_ref());
        let mut stages = Vec::with_capacity(table.stages().len());
        for stage in table.stages() {
            let code = shader_loader.load(&stage.file_name)?;
            let module = device.create_shader_module(&ShaderModuleDesc {
                name: &stage.file_name,
                code: &code,
                stage: stage.kind,
                entry_point: &stage.entry_point,
                bindings: descriptor_set_manager.bindings(),
                validate_interface: config.validate_shader_interface,
            })?;
            modules.push(module);
            engine_trace!("rtp::RayTracingPipeline", "Loaded {:?} shader '{}'", stage.kind, stage.file_name);

            stages.push(PipelineShaderStage {
                module,
                kind: stage.kind,
                entry_point: stage.entry_point.clone(),
            });
        }

        // ===== PIPELINE =====

        let groups = table.raw_groups();
        let handle = device
            .create_ray_tracing_pipeline(&RayTracingPipelineCreateDesc {
                stages: &stages,
                groups: &groups,
                layout: pipeline_layout.handle(),
                max_ray_recursion_depth: config.max_ray_recursion_depth,
            })
            .map_err(|e| {
                engine_error!("rtp::RayTracingPipeline", "Ray tracing pipeline creation failed: {}", e);
                e
            })?;

        drop(modules);
        device.set_debug_name(DebugObject::Pipeline(handle), debug_name);

        let indices = table.indices();
        engine_info!(
            "rtp::RayTracingPipeline",
            "Created '{}' ({} stages, {} groups, raygen {} miss {} triangle hit {} procedural hit {})",
            debug_name,
            stages.len(),
            groups.len(),
            indices.ray_gen,
            indices.miss,
            indices.triangle_hit_group,
            indices.procedural_hit_group
        );

        Ok(Self {
            device,
            swap_chain,
            handle,
            pipeline_layout,
            descriptor_set_manager,
            indices,
            group_count: table.group_count(),
            light_probes,
            debug_name: config.debug_name,
        })
    }

    // ===== SHADER GROUP INDICES =====

    pub fn ray_gen_shader_index(&self) -> u32 {
        self.indices.ray_gen
    }

    pub fn miss_shader_index(&self) -> u32 {
        self.indices.miss
    }

    pub fn triangle_hit_group_index(&self) -> u32 {
        self.indices.triangle_hit_group
    }

    pub fn procedural_hit_group_index(&self) -> u32 {
        self.indices.procedural_hit_group
    }

    pub fn shader_group_indices(&self) -> ShaderGroupIndices {
        self.indices
    }

    /// Number of shader groups compiled into the pipeline
    pub fn shader_group_count(&self) -> u32 {
        self.group_count
    }

    // ===== DESCRIPTOR SETS =====

    /// Descriptor set of in-flight frame `frame_index`
    ///
    /// # Panics
    ///
    /// Panics if `frame_index >= frame_count()`.
    pub fn descriptor_set(&self, frame_index: usize) -> DescriptorSetHandle {
        self.descriptor_set_manager.descriptor_set(frame_index)
    }

    /// Descriptor set of in-flight frame `frame_index`, `None` when out of range
    pub fn get_descriptor_set(&self, frame_index: usize) -> Option<DescriptorSetHandle> {
        self.descriptor_set_manager.get_descriptor_set(frame_index)
    }

    pub fn descriptor_sets(&self) -> &[DescriptorSetHandle] {
        self.descriptor_set_manager.descriptor_sets()
    }

    pub fn frame_count(&self) -> u32 {
        self.descriptor_set_manager.frame_count()
    }

    // ===== PIPELINE =====

    pub fn pipeline_layout(&self) -> &PipelineLayout {
        &self.pipeline_layout
    }

    pub fn handle(&self) -> PipelineHandle {
        self.handle
    }

    pub fn swap_chain(&self) -> &Arc<dyn SwapChain> {
        &self.swap_chain
    }

    /// Light probe binding the descriptor sets were written with
    pub fn light_probes(&self) -> LightProbeBinding {
        self.light_probes
    }

    /// Opaque handles of every shader group, back to back in group order
    pub fn shader_group_handles(&self) -> Result<Vec<u8>> {
        self.device.get_shader_group_handles(self.handle, 0, self.group_count)
    }

    /// Shader binding table layout for this pipeline on this device
    pub fn shader_binding_table_layout(&self) -> Result<ShaderBindingTableLayout> {
        ShaderBindingTableLayout::new(self.indices, self.device.shader_group_handle_properties())
    }
}

impl Drop for RayTracingPipeline {
    fn drop(&mut self) {
        self.device.destroy_pipeline(self.handle);
        engine_info!("rtp::RayTracingPipeline", "Destroyed '{}'", self.debug_name);
    }
}

#[cfg(test)]
#[path = "ray_tracing_pipeline_tests.rs"]
mod tests;
