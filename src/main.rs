use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use glam::Vec2;

mod config;
mod error;
mod math;
mod renderer;
mod ui;

use config::ViewerConfig;
use error::ViewerError;
use renderer::{FrameRenderer, FrameSettings, GpuState, SceneGeometry, Trackball};
use ui::{OverlayStats, apply_theme, draw_error_panel, draw_help_overlay};

struct App {
    config: ViewerConfig,
    geometry: SceneGeometry,

    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    egui_state: Option<egui_winit::State>,
    egui_renderer: Option<egui_wgpu::Renderer>,
    egui_ctx: egui::Context,

    renderer: FrameRenderer<GpuState>,
    trackball: Trackball,
    cursor: Vec2,

    fatal: Option<ViewerError>,
}

impl App {
    fn new(config: ViewerConfig, geometry: SceneGeometry) -> Self {
        let renderer = FrameRenderer::new(FrameSettings::from_config(&config));
        let trackball = Trackball::new(
            config.trackball.view_distance,
            config.window.width as f32,
            config.window.height as f32,
        );

        Self {
            config,
            geometry,
            window: None,
            gpu: None,
            egui_state: None,
            egui_renderer: None,
            egui_ctx: egui::Context::default(),
            renderer,
            trackball,
            cursor: Vec2::ZERO,
            fatal: None,
        }
    }

    fn init_gpu(&mut self, window: Arc<Window>) -> Result<(), ViewerError> {
        let mut gpu = pollster::block_on(GpuState::new(window.clone()))?;

        let egui_state = egui_winit::State::new(
            self.egui_ctx.clone(),
            self.egui_ctx.viewport_id(),
            &window,
            Some(window.scale_factor() as f32),
            None,
            Some(2048),
        );

        let egui_renderer =
            egui_wgpu::Renderer::new(&gpu.device, gpu.config.format, None, 1, false);

        apply_theme(&self.egui_ctx);

        if let Err(e) = self.renderer.initialize(&mut gpu, &self.geometry) {
            log::debug!("showing initialization error in the window: {e}");
        }

        let size = window.inner_size();
        self.trackball
            .set_viewport(size.width as f32, size.height as f32);

        self.window = Some(window);
        self.gpu = Some(gpu);
        self.egui_state = Some(egui_state);
        self.egui_renderer = Some(egui_renderer);
        Ok(())
    }

    fn overlay_stats(&self) -> Option<OverlayStats> {
        self.renderer.context().map(|ctx| OverlayStats {
            surface_segments: ctx.surface.vertex_count() / 2,
            marker_segments: (ctx.u_marker.vertex_count() + ctx.v_marker.vertex_count()) / 2,
        })
    }

    fn render(&mut self) {
        let stats = self.overlay_stats();

        let (Some(window), Some(gpu), Some(egui_state), Some(egui_renderer)) = (
            &self.window,
            &mut self.gpu,
            &mut self.egui_state,
            &mut self.egui_renderer,
        ) else {
            return;
        };

        self.renderer.redraw(gpu, &self.trackball);

        let raw_input = egui_state.take_egui_input(window);
        let error = self.renderer.error();

        let full_output = self.egui_ctx.run(raw_input, |ctx| match (error, &stats) {
            (Some(e), _) => draw_error_panel(ctx, e),
            (None, Some(stats)) => draw_help_overlay(ctx, stats),
            (None, None) => {}
        });

        egui_state.handle_platform_output(window, full_output.platform_output);

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [gpu.config.width, gpu.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, delta) in full_output.textures_delta.set {
            egui_renderer.update_texture(&gpu.device, &gpu.queue, id, &delta);
        }

        gpu.present(|device, queue, encoder, view| {
            egui_renderer.update_buffers(device, queue, encoder, &paint_jobs, &screen_descriptor);

            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let mut render_pass = render_pass.forget_lifetime();
            egui_renderer.render(&mut render_pass, &paint_jobs, &screen_descriptor);
        });

        for id in full_output.textures_delta.free {
            egui_renderer.free_texture(&id);
        }
    }

    fn request_redraw(&self) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, key: KeyCode) {
        match key {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::KeyR => {
                self.trackball.reset();
                self.request_redraw();
            }
            _ => {}
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title(self.config.window.title.clone())
            .with_inner_size(PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));

        let result = event_loop
            .create_window(window_attrs)
            .map_err(|e| ViewerError::DeviceUnavailable(e.to_string()))
            .and_then(|window| self.init_gpu(Arc::new(window)));

        match result {
            Ok(()) => self.request_redraw(),
            Err(e) => {
                log::error!("{e}");
                self.fatal = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let (Some(egui_state), Some(window)) = (&mut self.egui_state, &self.window) {
            let response = egui_state.on_window_event(window, &event);
            if response.repaint {
                window.request_redraw();
            }
            if response.consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::Resized(size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.resize(size);
                }
                self.trackball
                    .set_viewport(size.width as f32, size.height as f32);
                self.request_redraw();
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    if event.state == ElementState::Pressed {
                        self.handle_key(event_loop, key);
                    }
                }
            }

            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state,
                ..
            } => match state {
                ElementState::Pressed => self.trackball.begin_drag(self.cursor),
                ElementState::Released => self.trackball.end_drag(),
            },

            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Vec2::new(position.x as f32, position.y as f32);
                if self.trackball.drag_to(self.cursor) {
                    self.request_redraw();
                }
            }

            WindowEvent::RedrawRequested => self.render(),

            _ => {}
        }
    }
}

fn main() -> Result<(), ViewerError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ViewerConfig::load()?;
    let geometry = SceneGeometry::from_config(&config)?;
    log::info!(
        "surface tessellated into {} segments",
        geometry.surface.segment_count()
    );

    let event_loop =
        EventLoop::new().map_err(|e| ViewerError::DeviceUnavailable(e.to_string()))?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config, geometry);
    event_loop
        .run_app(&mut app)
        .map_err(|e| ViewerError::DeviceUnavailable(e.to_string()))?;

    match app.fatal.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
