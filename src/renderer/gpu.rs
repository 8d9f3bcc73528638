use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::error::{Result, ShaderStage, ViewerError};
use crate::renderer::backend::{GraphicsBackend, UniformLocation};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const MAX_DRAWS_PER_FRAME: usize = 16;

/// Uniform block shared by both shader stages, one slot per draw call.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct DrawUniforms {
    pub model_view_projection: [[f32; 4]; 4],
    pub color: [f32; 4],
}

const UNIFORM_FIELDS: &[(&str, u32)] = &[("model_view_projection", 0), ("color", 64)];
const VERTEX_LOCATION: u32 = 0;
const VERTEX_ATTRIBUTES: &[(&str, u32)] = &[("vertex", VERTEX_LOCATION)];

pub fn uniform_offset(name: &str) -> Option<u32> {
    UNIFORM_FIELDS
        .iter()
        .find(|(field, _)| *field == name)
        .map(|(_, offset)| *offset)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgramId(usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferId(usize);

struct VertexBuffer {
    buffer: wgpu::Buffer,
    len: u64,
}

struct QueuedDraw {
    program: ProgramId,
    attribute: u32,
    buffer: BufferId,
    vertex_count: u32,
    uniforms: DrawUniforms,
}

struct FrameInFlight {
    output: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
}

pub struct GpuState {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub size: PhysicalSize<u32>,

    uniform_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniform_stride: u64,

    depth_texture: wgpu::TextureView,

    pipelines: Vec<wgpu::RenderPipeline>,
    vertex_buffers: Vec<VertexBuffer>,

    clear_color: wgpu::Color,
    current: DrawUniforms,
    queued: Vec<QueuedDraw>,
    in_flight: Option<FrameInFlight>,
}

/// One buffer per attribute, bound at the slot equal to its location.
fn line_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: 12,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: VERTEX_LOCATION,
            format: wgpu::VertexFormat::Float32x3,
        }],
    }
}

fn align_to(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

impl GpuState {
    pub async fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .map_err(|e| ViewerError::DeviceUnavailable(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| {
                ViewerError::DeviceUnavailable("no compatible graphics adapter".to_string())
            })?;

        let info = adapter.get_info();
        log::info!("using adapter '{}' ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|e| ViewerError::DeviceUnavailable(e.to_string()))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| {
                ViewerError::DeviceUnavailable("surface reports no texture formats".to_string())
            })?;
        log::info!("surface format {surface_format:?}");

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let uniform_size = std::mem::size_of::<DrawUniforms>() as u64;
        let uniform_stride = align_to(
            uniform_size,
            device.limits().min_uniform_buffer_offset_alignment as u64,
        );

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw Uniform Buffer"),
            size: uniform_stride * MAX_DRAWS_PER_FRAME as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Draw Uniform Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(uniform_size),
                },
                count: None,
            }],
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw Uniform Bind Group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &uniform_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(uniform_size),
                }),
            }],
        });

        let depth_texture = Self::create_depth_texture(&device, &config);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            uniform_layout,
            uniform_buffer,
            uniform_bind_group,
            uniform_stride,
            depth_texture,
            pipelines: Vec::new(),
            vertex_buffers: Vec::new(),
            clear_color: wgpu::Color::BLACK,
            current: DrawUniforms::zeroed(),
            queued: Vec::with_capacity(MAX_DRAWS_PER_FRAME),
            in_flight: None,
        })
    }

    fn create_depth_texture(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
    ) -> wgpu::TextureView {
        let size = wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_texture = Self::create_depth_texture(&self.device, &self.config);
        }
    }

    fn compile_module(
        &self,
        label: &str,
        source: &str,
        stage: ShaderStage,
    ) -> Result<wgpu::ShaderModule> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(ViewerError::shader(stage, err.to_string())),
            None => Ok(module),
        }
    }

    fn create_line_pipeline(
        &self,
        vertex: &wgpu::ShaderModule,
        fragment: &wgpu::ShaderModule,
    ) -> wgpu::RenderPipeline {
        let layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Line Pipeline Layout"),
            bind_group_layouts: &[&self.uniform_layout],
            push_constant_ranges: &[],
        });

        self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Line Render Pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: vertex,
                entry_point: Some("vs_main"),
                buffers: &[line_vertex_layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: fragment,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }

    fn write_uniform(&mut self, location: UniformLocation, bytes: &[u8]) {
        let start = location.0 as usize;
        let target = bytemuck::bytes_of_mut(&mut self.current);
        match target.get_mut(start..start + bytes.len()) {
            Some(slot) => slot.copy_from_slice(bytes),
            None => log::warn!("uniform write at offset {start} out of range"),
        }
    }

    fn acquire_frame(&mut self) -> Option<FrameInFlight> {
        let output = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("surface lost or outdated, reconfiguring");
                self.resize(self.size);
                return None;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("out of GPU memory, dropping frame");
                return None;
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("timed out acquiring surface texture");
                return None;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Main Encoder"),
            });

        Some(FrameInFlight {
            output,
            view,
            encoder,
        })
    }

    fn encode_scene(&self, frame: &mut FrameInFlight) {
        let mut render_pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_texture,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        for (slot, draw) in self.queued.iter().enumerate() {
            let vertex_buffer = &self.vertex_buffers[draw.buffer.0];
            if draw.vertex_count == 0 || vertex_buffer.len == 0 {
                continue;
            }
            let offset = (slot as u64 * self.uniform_stride) as wgpu::DynamicOffset;

            render_pass.set_pipeline(&self.pipelines[draw.program.0]);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[offset]);
            render_pass.set_vertex_buffer(draw.attribute, vertex_buffer.buffer.slice(..));
            render_pass.draw(0..draw.vertex_count, 0..1);
        }
    }

    /// Finishes the current frame: runs `overlay` on top of the scene (or on
    /// a cleared target when no scene was drawn), then submits and presents.
    pub fn present(
        &mut self,
        overlay: impl FnOnce(
            &wgpu::Device,
            &wgpu::Queue,
            &mut wgpu::CommandEncoder,
            &wgpu::TextureView,
        ),
    ) {
        let mut frame = match self.in_flight.take() {
            Some(frame) => frame,
            None => {
                let Some(mut frame) = self.acquire_frame() else {
                    return;
                };
                self.queued.clear();
                self.encode_scene(&mut frame);
                frame
            }
        };

        overlay(&self.device, &self.queue, &mut frame.encoder, &frame.view);

        self.queue.submit(std::iter::once(frame.encoder.finish()));
        frame.output.present();
    }
}

impl GraphicsBackend for GpuState {
    type Program = ProgramId;
    type Buffer = BufferId;

    fn compile_and_link(&mut self, vertex_src: &str, fragment_src: &str) -> Result<ProgramId> {
        let vertex = self.compile_module("Line Vertex Shader", vertex_src, ShaderStage::Vertex)?;
        let fragment =
            self.compile_module("Line Fragment Shader", fragment_src, ShaderStage::Fragment)?;

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = self.create_line_pipeline(&vertex, &fragment);
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(ViewerError::shader(ShaderStage::Link, err.to_string()));
        }

        self.pipelines.push(pipeline);
        Ok(ProgramId(self.pipelines.len() - 1))
    }

    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        self.pipelines.get(program.0)?;
        VERTEX_ATTRIBUTES
            .iter()
            .find(|(attribute, _)| *attribute == name)
            .map(|(_, location)| *location)
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.pipelines.get(program.0)?;
        uniform_offset(name).map(UniformLocation)
    }

    fn create_buffer(&mut self, label: &str, vertices: &[f32]) -> BufferId {
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });

        self.vertex_buffers.push(VertexBuffer {
            buffer,
            len: (vertices.len() * std::mem::size_of::<f32>()) as u64,
        });
        BufferId(self.vertex_buffers.len() - 1)
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.clear_color = wgpu::Color {
            r: color[0] as f64,
            g: color[1] as f64,
            b: color[2] as f64,
            a: color[3] as f64,
        };
        self.queued.clear();
        self.current = DrawUniforms::zeroed();
    }

    fn set_uniform_matrix4(&mut self, location: UniformLocation, value: &Mat4) {
        self.write_uniform(location, bytemuck::bytes_of(&value.to_cols_array()));
    }

    fn set_uniform_vec4(&mut self, location: UniformLocation, value: Vec4) {
        self.write_uniform(location, bytemuck::bytes_of(&value.to_array()));
    }

    fn draw_line_segments(
        &mut self,
        program: ProgramId,
        attribute: u32,
        buffer: BufferId,
        vertex_count: u32,
    ) {
        if !VERTEX_ATTRIBUTES.iter().any(|(_, location)| *location == attribute) {
            log::warn!("no vertex attribute at location {attribute}, dropping draw");
            return;
        }
        if self.queued.len() == MAX_DRAWS_PER_FRAME {
            log::warn!("more than {MAX_DRAWS_PER_FRAME} draws in one frame, dropping draw");
            return;
        }
        self.queued.push(QueuedDraw {
            program,
            attribute,
            buffer,
            vertex_count,
            uniforms: self.current,
        });
    }

    fn end_frame(&mut self) {
        let mut slots = vec![0u8; (self.uniform_stride as usize) * self.queued.len()];
        for (i, draw) in self.queued.iter().enumerate() {
            let start = i * self.uniform_stride as usize;
            let bytes = bytemuck::bytes_of(&draw.uniforms);
            slots[start..start + bytes.len()].copy_from_slice(bytes);
        }
        if !slots.is_empty() {
            self.queue.write_buffer(&self.uniform_buffer, 0, &slots);
        }

        let Some(mut frame) = self.acquire_frame() else {
            self.queued.clear();
            return;
        };
        self.encode_scene(&mut frame);
        self.queued.clear();
        self.in_flight = Some(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_block_layout() {
        assert_eq!(std::mem::size_of::<DrawUniforms>(), 80);
        assert_eq!(uniform_offset("model_view_projection"), Some(0));
        assert_eq!(uniform_offset("color"), Some(64));
        assert_eq!(uniform_offset("ModelViewProjectionMatrix"), None);
    }

    #[test]
    fn uniform_stride_respects_alignment() {
        assert_eq!(align_to(80, 256), 256);
        assert_eq!(align_to(256, 256), 256);
        assert_eq!(align_to(257, 256), 512);
    }
}
