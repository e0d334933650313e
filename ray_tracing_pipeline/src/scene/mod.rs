//! Scene-side inputs of the ray tracing pipeline

pub mod scene_resources;
pub mod light_probe;

#[cfg(test)]
pub mod mock_scene;

pub use scene_resources::SceneResources;
pub use light_probe::{LightProbe, LightProbeSource, LightProbeBinding};
