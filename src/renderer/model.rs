use crate::error::{Result, ViewerError};
use crate::math::mesh::LineMesh;
use crate::renderer::backend::GraphicsBackend;
use crate::renderer::shader::ShaderProgram;

/// A named, immutable vertex buffer drawn as a line list.
pub struct Model<B: GraphicsBackend> {
    pub name: String,
    buffer: B::Buffer,
    vertex_count: u32,
}

impl<B: GraphicsBackend> Model<B> {
    pub fn upload(backend: &mut B, name: &str, mesh: &LineMesh) -> Result<Self> {
        let vertex_count = u32::try_from(mesh.vertex_count()).map_err(|_| {
            ViewerError::Config(format!(
                "model '{name}' has {} vertices, more than one draw call can address",
                mesh.vertex_count()
            ))
        })?;
        if mesh.is_empty() {
            log::warn!("model '{name}' has no vertices and will draw nothing");
        }

        let buffer = backend.create_buffer(name, &mesh.vertices);
        log::debug!("uploaded model '{name}' with {vertex_count} vertices");

        Ok(Self {
            name: name.to_string(),
            buffer,
            vertex_count,
        })
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn draw(&self, backend: &mut B, program: &ShaderProgram<B>) {
        log::trace!("drawing '{}' with program '{}'", self.name, program.name);
        backend.draw_line_segments(
            program.program,
            program.handles.vertex,
            self.buffer,
            self.vertex_count,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::testing::{Call, RecordingBackend};
    use glam::DVec3;

    #[test]
    fn upload_keeps_name_and_vertex_count() {
        let mut backend = RecordingBackend::default();
        let mut mesh = LineMesh::default();
        mesh.push_segment(DVec3::ZERO, DVec3::X);

        let model = Model::upload(&mut backend, "uDirectionLine", &mesh).unwrap();

        assert_eq!(model.name, "uDirectionLine");
        assert_eq!(model.vertex_count(), 2);
        assert_eq!(
            backend.calls,
            vec![Call::CreateBuffer {
                label: "uDirectionLine".to_string(),
                floats: 6,
            }]
        );
    }

    #[test_log::test]
    fn empty_mesh_uploads_with_zero_vertices() {
        let mut backend = RecordingBackend::default();
        let model = Model::upload(&mut backend, "Empty", &LineMesh::default()).unwrap();
        assert_eq!(model.vertex_count(), 0);
    }
}
