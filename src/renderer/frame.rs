use glam::{Mat4, Vec4};

use crate::config::ViewerConfig;
use crate::error::{Result, ViewerError};
use crate::math::{LineMesh, SceneTransform, direction_markers, model_view_projection, tessellate};
use crate::renderer::backend::GraphicsBackend;
use crate::renderer::camera::ViewSource;
use crate::renderer::model::Model;
use crate::renderer::shader::{FRAGMENT_SHADER, ShaderProgram, VERTEX_SHADER};

/// CPU-side geometry, built once before anything touches the device.
pub struct SceneGeometry {
    pub surface: LineMesh,
    pub u_marker: LineMesh,
    pub v_marker: LineMesh,
}

impl SceneGeometry {
    pub fn from_config(config: &ViewerConfig) -> Result<Self> {
        let spec = config.surface_spec()?;
        let wireframe = tessellate(&spec, config.surface.singularity);
        let markers = direction_markers(config.marker_scale);

        Ok(Self {
            surface: wireframe.combined(),
            u_marker: markers.u,
            v_marker: markers.v,
        })
    }
}

/// Per-frame constants: everything but the view matrix.
#[derive(Clone, Debug)]
pub struct FrameSettings {
    pub projection: Mat4,
    pub scene: SceneTransform,
    pub background: [f32; 4],
    pub surface_color: Vec4,
    pub u_marker_color: Vec4,
    pub v_marker_color: Vec4,
}

impl FrameSettings {
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            projection: config.projection_matrix(),
            scene: config.scene_transform(),
            background: config.colors.background,
            surface_color: Vec4::from_array(config.colors.surface),
            u_marker_color: Vec4::from_array(config.colors.u_marker),
            v_marker_color: Vec4::from_array(config.colors.v_marker),
        }
    }
}

pub struct RendererContext<B: GraphicsBackend> {
    pub program: ShaderProgram<B>,
    pub surface: Model<B>,
    pub u_marker: Model<B>,
    pub v_marker: Model<B>,
}

pub enum RendererState<B: GraphicsBackend> {
    Uninitialized { error: Option<ViewerError> },
    Ready(RendererContext<B>),
}

pub struct FrameRenderer<B: GraphicsBackend> {
    state: RendererState<B>,
    settings: FrameSettings,
}

impl<B: GraphicsBackend> FrameRenderer<B> {
    pub fn new(settings: FrameSettings) -> Self {
        Self {
            state: RendererState::Uninitialized { error: None },
            settings,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, RendererState::Ready(_))
    }

    pub fn error(&self) -> Option<&ViewerError> {
        match &self.state {
            RendererState::Uninitialized { error } => error.as_ref(),
            RendererState::Ready(_) => None,
        }
    }

    pub fn context(&self) -> Option<&RendererContext<B>> {
        match &self.state {
            RendererState::Ready(ctx) => Some(ctx),
            RendererState::Uninitialized { .. } => None,
        }
    }

    /// Builds the program and uploads the geometry. On failure the renderer
    /// stays `Uninitialized` and keeps the error for display.
    pub fn initialize(&mut self, backend: &mut B, geometry: &SceneGeometry) -> Result<()> {
        if self.is_ready() {
            return Ok(());
        }

        match Self::build_context(backend, geometry) {
            Ok(ctx) => {
                log::info!(
                    "renderer ready with program '{}': surface {} vertices, markers {} + {}",
                    ctx.program.name,
                    ctx.surface.vertex_count(),
                    ctx.u_marker.vertex_count(),
                    ctx.v_marker.vertex_count()
                );
                self.state = RendererState::Ready(ctx);
                Ok(())
            }
            Err(e) => {
                log::error!("renderer initialization failed: {e}");
                self.state = RendererState::Uninitialized {
                    error: Some(e.clone()),
                };
                Err(e)
            }
        }
    }

    fn build_context(backend: &mut B, geometry: &SceneGeometry) -> Result<RendererContext<B>> {
        let program = ShaderProgram::build(backend, "Basic", VERTEX_SHADER, FRAGMENT_SHADER)?;

        Ok(RendererContext {
            program,
            surface: Model::upload(backend, "Surface", &geometry.surface)?,
            u_marker: Model::upload(backend, "uDirectionLine", &geometry.u_marker)?,
            v_marker: Model::upload(backend, "vDirectionLine", &geometry.v_marker)?,
        })
    }

    /// Draws one frame and returns the uploaded model-view-projection matrix.
    /// Does nothing before initialization succeeded.
    pub fn redraw(&self, backend: &mut B, camera: &impl ViewSource) -> Option<Mat4> {
        let RendererState::Ready(ctx) = &self.state else {
            return None;
        };
        let settings = &self.settings;
        let handles = ctx.program.handles;

        backend.clear(settings.background);

        let view = camera.view_matrix();
        let mvp = model_view_projection(&settings.projection, &settings.scene, &view);
        backend.set_uniform_matrix4(handles.model_view_projection, &mvp);

        for (model, color) in [
            (&ctx.surface, settings.surface_color),
            (&ctx.u_marker, settings.u_marker_color),
            (&ctx.v_marker, settings.v_marker_color),
        ] {
            backend.set_uniform_vec4(handles.color, color);
            model.draw(backend, &ctx.program);
        }

        backend.end_frame();
        log::trace!("frame drawn");
        Some(mvp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShaderStage;
    use crate::renderer::testing::{Call, RecordingBackend};
    use glam::Vec3;

    fn renderer() -> FrameRenderer<RecordingBackend> {
        FrameRenderer::new(FrameSettings::from_config(&ViewerConfig::default()))
    }

    fn geometry() -> SceneGeometry {
        SceneGeometry::from_config(&ViewerConfig::default()).unwrap()
    }

    #[test_log::test]
    fn initialize_uploads_three_models() {
        let mut backend = RecordingBackend::default();
        let mut renderer = renderer();

        renderer.initialize(&mut backend, &geometry()).unwrap();

        assert!(renderer.is_ready());
        let labels: Vec<_> = backend.created_buffers().collect();
        assert_eq!(labels, vec!["Surface", "uDirectionLine", "vDirectionLine"]);
    }

    #[test_log::test]
    fn shader_failure_keeps_renderer_uninitialized() {
        let mut backend =
            RecordingBackend::failing(ShaderStage::Fragment, "unknown identifier `colour`");
        let mut renderer = renderer();

        let err = renderer.initialize(&mut backend, &geometry()).unwrap_err();

        assert!(err.to_string().contains("unknown identifier `colour`"));
        assert!(!renderer.is_ready());
        assert!(
            renderer
                .error()
                .is_some_and(|e| e.to_string().contains("unknown identifier `colour`"))
        );

        assert_eq!(renderer.redraw(&mut backend, &Mat4::IDENTITY), None);
        assert_eq!(backend.draw_count(), 0);
        assert!(backend.created_buffers().next().is_none());
    }

    #[test]
    fn missing_uniform_is_a_link_error() {
        let mut backend = RecordingBackend::without_uniform("color");
        let mut renderer = renderer();

        let err = renderer.initialize(&mut backend, &geometry()).unwrap_err();
        assert!(matches!(
            err,
            ViewerError::ShaderBuild {
                stage: ShaderStage::Link,
                ..
            }
        ));
    }

    #[test]
    fn redraw_draws_surface_then_markers_with_their_colors() {
        let mut backend = RecordingBackend::default();
        let mut renderer = renderer();
        let geometry = geometry();
        renderer.initialize(&mut backend, &geometry).unwrap();
        backend.calls.clear();

        renderer.redraw(&mut backend, &Mat4::IDENTITY).unwrap();

        let draws: Vec<_> = backend
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Draw {
                    attribute,
                    vertex_count,
                    color,
                    ..
                } => Some((*attribute, *vertex_count, *color)),
                _ => None,
            })
            .collect();

        assert_eq!(
            draws,
            vec![
                (0, geometry.surface.vertex_count() as u32, [0.8, 0.4, 0.2, 1.0]),
                (0, 2, [1.0, 0.0, 0.0, 1.0]),
                (0, 2, [0.0, 0.0, 1.0, 1.0]),
            ]
        );
        assert!(matches!(backend.calls.first(), Some(Call::Clear(_))));
        assert!(matches!(backend.calls.last(), Some(Call::EndFrame)));
    }

    #[test]
    fn redraw_is_idempotent_for_unchanged_camera() {
        let mut backend = RecordingBackend::default();
        let mut renderer = renderer();
        renderer.initialize(&mut backend, &geometry()).unwrap();

        let view = crate::math::transform::axis_rotation(Vec3::new(1.0, 2.0, 0.5), 0.9);
        let first = renderer.redraw(&mut backend, &view).unwrap();
        let second = renderer.redraw(&mut backend, &view).unwrap();

        let bits = |m: Mat4| m.to_cols_array().map(f32::to_bits);
        assert_eq!(bits(first), bits(second));

        let uploaded: Vec<_> = backend
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::SetMatrix(m) => Some(m.map(f32::to_bits)),
                _ => None,
            })
            .collect();
        assert_eq!(uploaded.len(), 2);
        assert_eq!(uploaded[0], uploaded[1]);
    }

    #[test]
    fn mvp_composes_projection_scene_and_view() {
        let config = ViewerConfig::default();
        let mut backend = RecordingBackend::default();
        let mut renderer = renderer();
        renderer.initialize(&mut backend, &geometry()).unwrap();

        let mvp = renderer.redraw(&mut backend, &Mat4::IDENTITY).unwrap();

        let scene = config.scene_transform();
        let expected =
            config.projection_matrix() * scene.translate_to_origin * scene.rotate_to_origin;
        assert!(mvp.abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn second_initialize_is_a_no_op() {
        let mut backend = RecordingBackend::default();
        let mut renderer = renderer();
        let geometry = geometry();
        renderer.initialize(&mut backend, &geometry).unwrap();
        renderer.initialize(&mut backend, &geometry).unwrap();

        assert_eq!(backend.created_buffers().count(), 3);
    }
}
