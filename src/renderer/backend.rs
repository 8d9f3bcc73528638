use glam::{Mat4, Vec4};

use crate::error::Result;

/// Byte offset of a uniform inside the per-draw uniform block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformLocation(pub u32);

/// The graphics device as seen by the frame renderer. Handles are small
/// copyable ids owned by the backend.
pub trait GraphicsBackend {
    type Program: Copy;
    type Buffer: Copy;

    fn compile_and_link(&mut self, vertex_src: &str, fragment_src: &str) -> Result<Self::Program>;

    fn attribute_location(&self, program: Self::Program, name: &str) -> Option<u32>;

    fn uniform_location(&self, program: Self::Program, name: &str) -> Option<UniformLocation>;

    /// Creates a vertex buffer holding `vertices` (xyz triples).
    fn create_buffer(&mut self, label: &str, vertices: &[f32]) -> Self::Buffer;

    fn clear(&mut self, color: [f32; 4]);

    fn set_uniform_matrix4(&mut self, location: UniformLocation, value: &Mat4);

    fn set_uniform_vec4(&mut self, location: UniformLocation, value: Vec4);

    /// Draws `vertex_count` vertices of `buffer`, bound to the vertex
    /// attribute at `attribute`, as independent segments using the uniform
    /// values set so far.
    fn draw_line_segments(
        &mut self,
        program: Self::Program,
        attribute: u32,
        buffer: Self::Buffer,
        vertex_count: u32,
    );

    fn end_frame(&mut self);
}
