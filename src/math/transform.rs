use glam::{Mat4, Vec3};

pub fn deg_to_rad(degrees: f32) -> f32 {
    degrees * std::f32::consts::PI / 180.0
}

/// Right-handed perspective projection with a 0..1 depth range.
pub fn perspective(fov_y_radians: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    Mat4::perspective_rh(fov_y_radians, aspect, near, far)
}

pub fn translation(x: f32, y: f32, z: f32) -> Mat4 {
    Mat4::from_translation(Vec3::new(x, y, z))
}

/// Rotation of `angle_radians` about `axis`. The axis does not need to be
/// unit length; a zero axis yields the identity.
pub fn axis_rotation(axis: Vec3, angle_radians: f32) -> Mat4 {
    match axis.try_normalize() {
        Some(axis) => Mat4::from_axis_angle(axis, angle_radians),
        None => Mat4::IDENTITY,
    }
}

/// `a · b`, so `b` is applied to a vertex first.
pub fn multiply(a: &Mat4, b: &Mat4) -> Mat4 {
    *a * *b
}

/// Fixed model transform placing the surface in front of the camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneTransform {
    pub rotate_to_origin: Mat4,
    pub translate_to_origin: Mat4,
}

impl SceneTransform {
    pub fn new(rotation_axis: Vec3, rotation_angle: f32, offset: Vec3) -> Self {
        Self {
            rotate_to_origin: axis_rotation(rotation_axis, rotation_angle),
            translate_to_origin: translation(offset.x, offset.y, offset.z),
        }
    }
}

/// `projection · translate_to_origin · rotate_to_origin · view`.
pub fn model_view_projection(projection: &Mat4, scene: &SceneTransform, view: &Mat4) -> Mat4 {
    let rotated = multiply(&scene.rotate_to_origin, view);
    let placed = multiply(&scene.translate_to_origin, &rotated);
    multiply(projection, &placed)
}
