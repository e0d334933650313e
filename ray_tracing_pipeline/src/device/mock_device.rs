/// Mock ray tracing device for unit tests (no GPU required)
///
/// Hands out counter-based handles, records every driver call in order and
/// tracks live objects so tests can check creation/destruction sequences.
/// Failures can be injected per call family.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use rustc_hash::FxHashMap;

use crate::device::{
    RayTracingDevice, SwapChain, ShaderModuleDesc, RayTracingPipelineCreateDesc,
    ShaderGroupHandleProperties, DebugObject,
    DescriptorBinding, DescriptorPoolSize, DescriptorWrite, PushConstantRange,
    PipelineShaderStage, ShaderGroup, ShaderStageKind,
    DescriptorPoolHandle, DescriptorSetHandle, DescriptorSetLayoutHandle,
    PipelineHandle, PipelineLayoutHandle, ShaderModuleHandle,
};
use crate::error::{Error, Result};
use crate::engine_bail;

// ============================================================================
// Recorded calls
// ============================================================================

/// Recorded `create_shader_module` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedShaderModule {
    pub handle: ShaderModuleHandle,
    pub name: String,
    pub stage: ShaderStageKind,
    pub entry_point: String,
    pub word_count: usize,
    pub validate_interface: bool,
}

/// Recorded `create_ray_tracing_pipeline` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPipeline {
    pub stages: Vec<PipelineShaderStage>,
    pub groups: Vec<ShaderGroup>,
    pub layout: PipelineLayoutHandle,
    pub max_ray_recursion_depth: u32,
}

/// Recorded `create_descriptor_pool` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPool {
    pub handle: DescriptorPoolHandle,
    pub pool_sizes: Vec<DescriptorPoolSize>,
    pub max_sets: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LiveKind {
    DescriptorSetLayout,
    DescriptorPool,
    DescriptorSet(DescriptorPoolHandle),
    PipelineLayout,
    ShaderModule,
    Pipeline,
}

// ============================================================================
// Mock RayTracingDevice
// ============================================================================

pub struct MockRayTracingDevice {
    next_handle: AtomicU64,
    properties: ShaderGroupHandleProperties,

    /// Every driver call, in call order (e.g. "create_pipeline_layout 4")
    pub events: Mutex<Vec<String>>,
    /// Bindings passed to each descriptor set layout
    pub set_layouts: Mutex<Vec<Vec<DescriptorBinding>>>,
    /// Descriptor pools created
    pub pools: Mutex<Vec<RecordedPool>>,
    /// Writes issued per descriptor set
    pub descriptor_writes: Mutex<FxHashMap<DescriptorSetHandle, Vec<DescriptorWrite>>>,
    /// Push constant ranges passed to each pipeline layout
    pub pipeline_layouts: Mutex<Vec<(Vec<DescriptorSetLayoutHandle>, Vec<PushConstantRange>)>>,
    /// Shader modules created
    pub shader_modules: Mutex<Vec<RecordedShaderModule>>,
    /// Ray tracing pipelines created
    pub pipelines: Mutex<Vec<RecordedPipeline>>,
    /// Debug names attached to objects
    pub debug_names: Mutex<Vec<(DebugObject, String)>>,

    live: Mutex<FxHashMap<u64, LiveKind>>,
    pool_remaining_sets: Mutex<FxHashMap<DescriptorPoolHandle, u32>>,

    fail_descriptor_allocation: AtomicBool,
    fail_pipeline_creation: AtomicBool,
    fail_shader_module: Mutex<Option<String>>,
}

impl MockRayTracingDevice {
    /// Create a new mock device with typical desktop limits
    /// (32-byte handles, 32-byte record alignment, 64-byte region alignment)
    pub fn new() -> Self {
        Self::with_properties(ShaderGroupHandleProperties {
            handle_size: 32,
            handle_alignment: 32,
            base_alignment: 64,
            max_ray_recursion_depth: 31,
        })
    }

    pub fn with_properties(properties: ShaderGroupHandleProperties) -> Self {
        Self {
            next_handle: AtomicU64::new(1),
            properties,
            events: Mutex::new(Vec::new()),
            set_layouts: Mutex::new(Vec::new()),
            pools: Mutex::new(Vec::new()),
            descriptor_writes: Mutex::new(FxHashMap::default()),
            pipeline_layouts: Mutex::new(Vec::new()),
            shader_modules: Mutex::new(Vec::new()),
            pipelines: Mutex::new(Vec::new()),
            debug_names: Mutex::new(Vec::new()),
            live: Mutex::new(FxHashMap::default()),
            pool_remaining_sets: Mutex::new(FxHashMap::default()),
            fail_descriptor_allocation: AtomicBool::new(false),
            fail_pipeline_creation: AtomicBool::new(false),
            fail_shader_module: Mutex::new(None),
        }
    }

    // ===== FAILURE INJECTION =====

    /// Make every descriptor set allocation report pool exhaustion
    pub fn fail_descriptor_allocation(&self) {
        self.fail_descriptor_allocation.store(true, Ordering::SeqCst);
    }

    /// Make pipeline compilation fail
    pub fn fail_pipeline_creation(&self) {
        self.fail_pipeline_creation.store(true, Ordering::SeqCst);
    }

    /// Make creation of the shader module called `name` fail
    pub fn fail_shader_module(&self, name: &str) {
        *self.fail_shader_module.lock().unwrap() = Some(name.to_string());
    }

    // ===== INSPECTION =====

    pub fn get_events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Recorded events whose name starts with `prefix`
    pub fn events_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.get_events()
            .into_iter()
            .filter(|event| event.starts_with(prefix))
            .collect()
    }

    /// Number of objects created and not yet destroyed
    /// (descriptor sets count until their pool is destroyed)
    pub fn live_object_count(&self) -> usize {
        self.live.lock().unwrap().len()
    }

    pub fn live_shader_module_count(&self) -> usize {
        self.live
            .lock()
            .unwrap()
            .values()
            .filter(|kind| **kind == LiveKind::ShaderModule)
            .count()
    }

    pub fn writes_for(&self, set: DescriptorSetHandle) -> Vec<DescriptorWrite> {
        self.descriptor_writes
            .lock()
            .unwrap()
            .get(&set)
            .cloned()
            .unwrap_or_default()
    }

    // ===== INTERNALS =====

    fn next(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::SeqCst)
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn track(&self, raw: u64, kind: LiveKind) {
        self.live.lock().unwrap().insert(raw, kind);
    }

    fn untrack(&self, raw: u64) {
        self.live.lock().unwrap().remove(&raw);
    }
}

impl Default for MockRayTracingDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl RayTracingDevice for MockRayTracingDevice {
    fn create_descriptor_set_layout(
        &self,
        bindings: &[DescriptorBinding],
    ) -> Result<DescriptorSetLayoutHandle> {
        let handle = DescriptorSetLayoutHandle::from_raw(self.next());
        self.set_layouts.lock().unwrap().push(bindings.to_vec());
        self.track(handle.as_raw(), LiveKind::DescriptorSetLayout);
        self.record(format!("create_descriptor_set_layout {}", handle.as_raw()));
        Ok(handle)
    }

    fn destroy_descriptor_set_layout(&self, layout: DescriptorSetLayoutHandle) {
        self.untrack(layout.as_raw());
        self.record(format!("destroy_descriptor_set_layout {}", layout.as_raw()));
    }

    fn create_descriptor_pool(
        &self,
        pool_sizes: &[DescriptorPoolSize],
        max_sets: u32,
    ) -> Result<DescriptorPoolHandle> {
        let handle = DescriptorPoolHandle::from_raw(self.next());
        self.pools.lock().unwrap().push(RecordedPool {
            handle,
            pool_sizes: pool_sizes.to_vec(),
            max_sets,
        });
        self.pool_remaining_sets.lock().unwrap().insert(handle, max_sets);
        self.track(handle.as_raw(), LiveKind::DescriptorPool);
        self.record(format!("create_descriptor_pool {}", handle.as_raw()));
        Ok(handle)
    }

    fn destroy_descriptor_pool(&self, pool: DescriptorPoolHandle) {
        self.live.lock().unwrap().retain(|raw, kind| {
            *raw != pool.as_raw() && *kind != LiveKind::DescriptorSet(pool)
        });
        self.pool_remaining_sets.lock().unwrap().remove(&pool);
        self.record(format!("destroy_descriptor_pool {}", pool.as_raw()));
    }

    fn allocate_descriptor_sets(
        &self,
        pool: DescriptorPoolHandle,
        _layout: DescriptorSetLayoutHandle,
        count: u32,
    ) -> Result<Vec<DescriptorSetHandle>> {
        self.record(format!("allocate_descriptor_sets {}", count));

        if self.fail_descriptor_allocation.load(Ordering::SeqCst) {
            return Err(Error::DescriptorPoolExhausted(format!(
                "mock pool {} refused {} sets",
                pool.as_raw(),
                count
            )));
        }

        let mut remaining_sets = self.pool_remaining_sets.lock().unwrap();
        let remaining = match remaining_sets.get_mut(&pool) {
            Some(remaining) => remaining,
            None => engine_bail!("rtp::MockRayTracingDevice", "Unknown descriptor pool {}", pool.as_raw()),
        };
        if *remaining < count {
            return Err(Error::DescriptorPoolExhausted(format!(
                "mock pool {} has {} sets left, {} requested",
                pool.as_raw(),
                remaining,
                count
            )));
        }
        *remaining -= count;
        drop(remaining_sets);

        let sets: Vec<_> = (0..count)
            .map(|_| DescriptorSetHandle::from_raw(self.next()))
            .collect();
        for set in &sets {
            self.track(set.as_raw(), LiveKind::DescriptorSet(pool));
        }
        Ok(sets)
    }

    fn update_descriptor_set(&self, set: DescriptorSetHandle, writes: &[DescriptorWrite]) {
        self.descriptor_writes
            .lock()
            .unwrap()
            .entry(set)
            .or_default()
            .extend_from_slice(writes);
        self.record(format!("update_descriptor_set {} ({} writes)", set.as_raw(), writes.len()));
    }

    fn create_pipeline_layout(
        &self,
        set_layouts: &[DescriptorSetLayoutHandle],
        push_constant_ranges: &[PushConstantRange],
    ) -> Result<PipelineLayoutHandle> {
        let handle = PipelineLayoutHandle::from_raw(self.next());
        self.pipeline_layouts
            .lock()
            .unwrap()
            .push((set_layouts.to_vec(), push_constant_ranges.to_vec()));
        self.track(handle.as_raw(), LiveKind::PipelineLayout);
        self.record(format!("create_pipeline_layout {}", handle.as_raw()));
        Ok(handle)
    }

    fn destroy_pipeline_layout(&self, layout: PipelineLayoutHandle) {
        self.untrack(layout.as_raw());
        self.record(format!("destroy_pipeline_layout {}", layout.as_raw()));
    }

    fn create_shader_module(&self, desc: &ShaderModuleDesc<'_>) -> Result<ShaderModuleHandle> {
        let should_fail = self.fail_shader_module.lock().unwrap().as_deref() == Some(desc.name);
        if should_fail {
            self.record(format!("create_shader_module {} FAILED", desc.name));
            return Err(Error::ShaderLoadFailed(format!("mock rejected '{}'", desc.name)));
        }

        let handle = ShaderModuleHandle::from_raw(self.next());
        self.shader_modules.lock().unwrap().push(RecordedShaderModule {
            handle,
            name: desc.name.to_string(),
            stage: desc.stage,
            entry_point: desc.entry_point.to_string(),
            word_count: desc.code.len(),
            validate_interface: desc.validate_interface,
        });
        self.track(handle.as_raw(), LiveKind::ShaderModule);
        self.record(format!("create_shader_module {}", desc.name));
        Ok(handle)
    }

    fn destroy_shader_module(&self, module: ShaderModuleHandle) {
        self.untrack(module.as_raw());
        self.record(format!("destroy_shader_module {}", module.as_raw()));
    }

    fn create_ray_tracing_pipeline(
        &self,
        desc: &RayTracingPipelineCreateDesc<'_>,
    ) -> Result<PipelineHandle> {
        if self.fail_pipeline_creation.load(Ordering::SeqCst) {
            self.record("create_ray_tracing_pipeline FAILED".to_string());
            engine_bail!("rtp::MockRayTracingDevice", "Injected pipeline creation failure");
        }

        let handle = PipelineHandle::from_raw(self.next());
        self.pipelines.lock().unwrap().push(RecordedPipeline {
            stages: desc.stages.to_vec(),
            groups: desc.groups.to_vec(),
            layout: desc.layout,
            max_ray_recursion_depth: desc.max_ray_recursion_depth,
        });
        self.track(handle.as_raw(), LiveKind::Pipeline);
        self.record(format!("create_ray_tracing_pipeline {}", handle.as_raw()));
        Ok(handle)
    }

    fn destroy_pipeline(&self, pipeline: PipelineHandle) {
        self.untrack(pipeline.as_raw());
        self.record(format!("destroy_pipeline {}", pipeline.as_raw()));
    }

    fn shader_group_handle_properties(&self) -> ShaderGroupHandleProperties {
        self.properties
    }

    /// Handle bytes of group `g` are all `g + 1`
    fn get_shader_group_handles(
        &self,
        _pipeline: PipelineHandle,
        first_group: u32,
        group_count: u32,
    ) -> Result<Vec<u8>> {
        let handle_size = self.properties.handle_size as usize;
        let mut data = Vec::with_capacity(handle_size * group_count as usize);
        for group in first_group..first_group + group_count {
            data.extend(std::iter::repeat((group + 1) as u8).take(handle_size));
        }
        Ok(data)
    }

    fn set_debug_name(&self, object: DebugObject, name: &str) {
        self.debug_names.lock().unwrap().push((object, name.to_string()));
    }
}

// ============================================================================
// Mock SwapChain
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct MockSwapChain {
    pub frame_count: u32,
    pub extent: (u32, u32),
}

impl MockSwapChain {
    pub fn new(frame_count: u32) -> Self {
        Self {
            frame_count,
            extent: (1280, 720),
        }
    }
}

impl SwapChain for MockSwapChain {
    fn frame_count(&self) -> u32 {
        self.frame_count
    }

    fn extent(&self) -> (u32, u32) {
        self.extent
    }

    fn image_format(&self) -> i32 {
        // VK_FORMAT_B8G8R8A8_UNORM
        44
    }
}

#[cfg(test)]
#[path = "mock_device_tests.rs"]
mod tests;
