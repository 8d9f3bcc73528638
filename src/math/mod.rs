pub mod mesh;
pub mod surface;
pub mod transform;

pub use mesh::{LineMesh, direction_markers};
pub use surface::{ParametricSurfaceSpec, SingularityPolicy, richmond, tessellate};
pub use transform::{SceneTransform, model_view_projection, perspective};
