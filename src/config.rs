//! Viewer settings. Every field has a default, so a config file only needs
//! to name what it changes.

use std::path::Path;

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ViewerError};
use crate::math::mesh::DEFAULT_MARKER_SCALE;
use crate::math::transform::deg_to_rad;
use crate::math::{ParametricSurfaceSpec, SceneTransform, SingularityPolicy, perspective, richmond};

pub const CONFIG_ENV_VAR: &str = "RICHMOND_VIEWER_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub window: WindowConfig,
    pub surface: SurfaceConfig,
    pub projection: ProjectionConfig,
    pub scene: SceneConfig,
    pub colors: ColorConfig,
    pub marker_scale: f64,
    pub trackball: TrackballConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            surface: SurfaceConfig::default(),
            projection: ProjectionConfig::default(),
            scene: SceneConfig::default(),
            colors: ColorConfig::default(),
            marker_scale: DEFAULT_MARKER_SCALE,
            trackball: TrackballConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Richmond's Minimal Surface".to_string(),
            width: 800,
            height: 800,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub u_range: (f64, f64),
    pub v_range: (f64, f64),
    pub u_steps: usize,
    pub v_steps: usize,
    pub singularity: SingularityPolicy,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            u_range: (-2.0, 2.0),
            v_range: (-2.0, 2.0),
            u_steps: 100,
            v_steps: 100,
            singularity: SingularityPolicy::default(),
        }
    }
}

/// `aspect` is not tied to the window size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub fov_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 22.5,
            aspect: 1.0,
            near: 8.0,
            far: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub rotation_axis: [f32; 3],
    pub rotation_angle: f32,
    pub translation: [f32; 3],
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            rotation_axis: [0.707, 0.707, 0.0],
            rotation_angle: 0.7,
            translation: [0.0, 0.0, -40.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    pub background: [f32; 4],
    pub surface: [f32; 4],
    pub u_marker: [f32; 4],
    pub v_marker: [f32; 4],
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            background: [0.0, 0.0, 0.0, 1.0],
            surface: [0.8, 0.4, 0.2, 1.0],
            u_marker: [1.0, 0.0, 0.0, 1.0],
            v_marker: [0.0, 0.0, 1.0, 1.0],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackballConfig {
    pub view_distance: f32,
}

impl ViewerConfig {
    /// Reads the file named by `RICHMOND_VIEWER_CONFIG`, or returns the
    /// defaults when the variable is unset.
    pub fn load() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::from_path(Path::new(&path)),
            None => {
                log::info!("{CONFIG_ENV_VAR} not set, using default configuration");
                Ok(Self::default())
            }
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ViewerError::Config(format!("{}: {e}", path.display())))?;
        let config = Self::from_json_str(&text)?;
        log::info!("loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| ViewerError::Config(e.to_string()))?;
        config.surface_spec()?;
        Ok(config)
    }

    pub fn surface_spec(&self) -> Result<ParametricSurfaceSpec> {
        ParametricSurfaceSpec::new(
            self.surface.u_range,
            self.surface.v_range,
            self.surface.u_steps,
            self.surface.v_steps,
            richmond,
        )
    }

    pub fn projection_matrix(&self) -> Mat4 {
        let p = &self.projection;
        perspective(deg_to_rad(p.fov_degrees), p.aspect, p.near, p.far)
    }

    pub fn scene_transform(&self) -> SceneTransform {
        SceneTransform::new(
            Vec3::from_array(self.scene.rotation_axis),
            self.scene.rotation_angle,
            Vec3::from_array(self.scene.translation),
        )
    }
}
