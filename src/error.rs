use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ViewerError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Link,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => write!(f, "vertex shader"),
            Self::Fragment => write!(f, "fragment shader"),
            Self::Link => write!(f, "program link"),
        }
    }
}

/// Everything that can stop the viewer from reaching its `Ready` state.
#[derive(Debug, Clone, Error)]
pub enum ViewerError {
    /// No usable surface, adapter or device.
    #[error("could not get a graphics context: {0}")]
    DeviceUnavailable(String),

    /// Compiler or linker diagnostic for one of the shader stages.
    #[error("error in {stage}: {log}")]
    ShaderBuild { stage: ShaderStage, log: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ViewerError {
    pub fn shader(stage: ShaderStage, log: impl Into<String>) -> Self {
        Self::ShaderBuild {
            stage,
            log: log.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_error_message_names_stage_and_log() {
        let err = ViewerError::shader(ShaderStage::Fragment, "expected `;`");
        assert_eq!(err.to_string(), "error in fragment shader: expected `;`");
    }

    #[test]
    fn device_error_message() {
        let err = ViewerError::DeviceUnavailable("no adapter".into());
        assert!(err.to_string().contains("no adapter"));
    }
}
