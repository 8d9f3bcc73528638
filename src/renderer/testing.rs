use glam::{Mat4, Vec4};

use crate::error::{Result, ShaderStage, ViewerError};
use crate::renderer::backend::{GraphicsBackend, UniformLocation};
use crate::renderer::gpu::uniform_offset;

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    CompileAndLink,
    CreateBuffer { label: String, floats: usize },
    Clear([f32; 4]),
    SetMatrix([f32; 16]),
    Draw {
        attribute: u32,
        buffer: usize,
        vertex_count: u32,
        color: [f32; 4],
    },
    EndFrame,
}

/// Backend double that records every call instead of touching a device.
#[derive(Default)]
pub struct RecordingBackend {
    pub calls: Vec<Call>,
    fail: Option<(ShaderStage, String)>,
    hidden_uniform: Option<&'static str>,
    color: [f32; 4],
    buffers: usize,
}

impl RecordingBackend {
    pub fn failing(stage: ShaderStage, log: &str) -> Self {
        Self {
            fail: Some((stage, log.to_string())),
            ..Default::default()
        }
    }

    pub fn without_uniform(name: &'static str) -> Self {
        Self {
            hidden_uniform: Some(name),
            ..Default::default()
        }
    }

    pub fn created_buffers(&self) -> impl Iterator<Item = &str> {
        self.calls.iter().filter_map(|c| match c {
            Call::CreateBuffer { label, .. } => Some(label.as_str()),
            _ => None,
        })
    }

    pub fn draw_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::Draw { .. }))
            .count()
    }
}

impl GraphicsBackend for RecordingBackend {
    type Program = ();
    type Buffer = usize;

    fn compile_and_link(&mut self, _vertex_src: &str, _fragment_src: &str) -> Result<()> {
        self.calls.push(Call::CompileAndLink);
        match &self.fail {
            Some((stage, log)) => Err(ViewerError::shader(*stage, log.clone())),
            None => Ok(()),
        }
    }

    fn attribute_location(&self, _program: (), name: &str) -> Option<u32> {
        (name == "vertex").then_some(0)
    }

    fn uniform_location(&self, _program: (), name: &str) -> Option<UniformLocation> {
        if self.hidden_uniform == Some(name) {
            return None;
        }
        uniform_offset(name).map(UniformLocation)
    }

    fn create_buffer(&mut self, label: &str, vertices: &[f32]) -> usize {
        self.calls.push(Call::CreateBuffer {
            label: label.to_string(),
            floats: vertices.len(),
        });
        self.buffers += 1;
        self.buffers - 1
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.calls.push(Call::Clear(color));
    }

    fn set_uniform_matrix4(&mut self, _location: UniformLocation, value: &Mat4) {
        self.calls.push(Call::SetMatrix(value.to_cols_array()));
    }

    fn set_uniform_vec4(&mut self, _location: UniformLocation, value: Vec4) {
        self.color = value.to_array();
    }

    fn draw_line_segments(
        &mut self,
        _program: (),
        attribute: u32,
        buffer: usize,
        vertex_count: u32,
    ) {
        self.calls.push(Call::Draw {
            attribute,
            buffer,
            vertex_count,
            color: self.color,
        });
    }

    fn end_frame(&mut self) {
        self.calls.push(Call::EndFrame);
    }
}
