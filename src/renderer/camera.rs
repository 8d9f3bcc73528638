use glam::{Mat4, Quat, Vec2, Vec3};

use crate::math::transform::{multiply, translation};

/// Anything that can hand the renderer a view matrix for the current frame.
pub trait ViewSource {
    fn view_matrix(&self) -> Mat4;
}

impl ViewSource for Mat4 {
    fn view_matrix(&self) -> Mat4 {
        *self
    }
}

/// Virtual-sphere trackball driven by pointer drags.
pub struct Trackball {
    rotation: Quat,
    view_distance: f32,
    viewport: Vec2,
    last_point: Option<Vec3>,
}

impl Trackball {
    pub fn new(view_distance: f32, width: f32, height: f32) -> Self {
        Self {
            rotation: Quat::IDENTITY,
            view_distance,
            viewport: Vec2::new(width, height),
            last_point: None,
        }
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport = Vec2::new(width, height);
    }

    pub fn begin_drag(&mut self, pointer: Vec2) {
        self.last_point = Some(self.sphere_point(pointer));
    }

    /// Returns true when the rotation changed and a redraw is due.
    pub fn drag_to(&mut self, pointer: Vec2) -> bool {
        let Some(from) = self.last_point else {
            return false;
        };
        let to = self.sphere_point(pointer);
        self.last_point = Some(to);

        if from.abs_diff_eq(to, 1e-6) {
            return false;
        }

        let delta = Quat::from_rotation_arc(from, to);
        self.rotation = (delta * self.rotation).normalize();
        true
    }

    pub fn end_drag(&mut self) {
        self.last_point = None;
    }

    pub fn reset(&mut self) {
        self.rotation = Quat::IDENTITY;
        self.last_point = None;
    }

    fn sphere_point(&self, pointer: Vec2) -> Vec3 {
        let radius = (self.viewport.min_element() * 0.5).max(1.0);
        let center = self.viewport * 0.5;
        let x = (pointer.x - center.x) / radius;
        let y = (center.y - pointer.y) / radius;

        let r2 = x * x + y * y;
        if r2 <= 1.0 {
            Vec3::new(x, y, (1.0 - r2).sqrt())
        } else {
            Vec3::new(x, y, 0.0).normalize()
        }
    }
}

impl ViewSource for Trackball {
    fn view_matrix(&self) -> Mat4 {
        multiply(
            &translation(0.0, 0.0, -self.view_distance),
            &Mat4::from_quat(self.rotation),
        )
    }
}
