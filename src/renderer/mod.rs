pub mod backend;
pub mod camera;
pub mod frame;
pub mod gpu;
pub mod model;
pub mod shader;

#[cfg(test)]
pub(crate) mod testing;

pub use camera::Trackball;
pub use frame::{FrameRenderer, FrameSettings, SceneGeometry};
pub use gpu::GpuState;
