use crate::error::{Result, ShaderStage, ViewerError};
use crate::renderer::backend::{GraphicsBackend, UniformLocation};

pub const VERTEX_SHADER: &str = include_str!("line_vertex.wgsl");
pub const FRAGMENT_SHADER: &str = include_str!("line_fragment.wgsl");

pub const ATTRIB_VERTEX: &str = "vertex";
pub const UNIFORM_MODEL_VIEW_PROJECTION: &str = "model_view_projection";
pub const UNIFORM_COLOR: &str = "color";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShaderHandles {
    pub vertex: u32,
    pub model_view_projection: UniformLocation,
    pub color: UniformLocation,
}

pub struct ShaderProgram<B: GraphicsBackend> {
    pub name: String,
    pub program: B::Program,
    pub handles: ShaderHandles,
}

impl<B: GraphicsBackend> ShaderProgram<B> {
    /// Compiles and links both stages, then resolves the handle set.
    pub fn build(
        backend: &mut B,
        name: &str,
        vertex_src: &str,
        fragment_src: &str,
    ) -> Result<Self> {
        let program = backend.compile_and_link(vertex_src, fragment_src)?;

        let vertex = backend
            .attribute_location(program, ATTRIB_VERTEX)
            .ok_or_else(|| missing("attribute", ATTRIB_VERTEX))?;
        let model_view_projection = backend
            .uniform_location(program, UNIFORM_MODEL_VIEW_PROJECTION)
            .ok_or_else(|| missing("uniform", UNIFORM_MODEL_VIEW_PROJECTION))?;
        let color = backend
            .uniform_location(program, UNIFORM_COLOR)
            .ok_or_else(|| missing("uniform", UNIFORM_COLOR))?;

        log::info!("linked shader program '{name}'");

        Ok(Self {
            name: name.to_string(),
            program,
            handles: ShaderHandles {
                vertex,
                model_view_projection,
                color,
            },
        })
    }
}

fn missing(kind: &str, name: &str) -> ViewerError {
    ViewerError::shader(ShaderStage::Link, format!("no active {kind} named `{name}`"))
}
