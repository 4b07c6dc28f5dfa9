use nalgebra::{Isometry3, Matrix4, Point3, Translation3, UnitQuaternion, Vector3};
use std::f32::consts::FRAC_PI_2;

use crate::config::CameraSettings;
use crate::engine::input::CameraMotion;

/// Free-flying perspective camera.
///
/// Orientation is kept as yaw about world Y followed by pitch about the
/// camera's own X axis, so the horizon never rolls and pitch can be clamped
/// to straight up or straight down.
pub struct CameraRig {
    pub position: Point3<f32>,
    yaw: f32,
    pitch: f32,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub aspect: f32,
    pub move_speed: f32,
    pub rotate_speed: f32,
}

impl CameraRig {
    pub fn new(settings: &CameraSettings, aspect: f32) -> Self {
        let [x, y, z] = settings.position;
        let mut rig = CameraRig {
            position: Point3::new(x, y, z),
            yaw: 0.0,
            pitch: 0.0,
            fov_degrees: settings.fov_degrees,
            near: settings.near,
            far: settings.far,
            aspect: if aspect.is_finite() && aspect > 0.0 { aspect } else { 1.0 },
            move_speed: settings.move_speed,
            rotate_speed: settings.rotate_speed,
        };
        match settings.look_at {
            Some([tx, ty, tz]) => rig.look_at(&Point3::new(tx, ty, tz)),
            None => rig.set_pitch(settings.pitch_degrees.to_radians()),
        }
        rig
    }

    pub fn orientation(&self) -> UnitQuaternion<f32> {
        UnitQuaternion::from_axis_angle(&Vector3::y_axis(), self.yaw)
            * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), self.pitch)
    }

    pub fn look_at(&mut self, target: &Point3<f32>) {
        let dir = target - self.position;
        if dir.norm_squared() <= f32::EPSILON {
            return;
        }
        self.yaw = (-dir.x).atan2(-dir.z);
        self.set_pitch(dir.y.atan2((dir.x * dir.x + dir.z * dir.z).sqrt()));
    }

    /// Moves along the camera's local axes: -Z is forward, +X is right.
    pub fn translate_local(&mut self, offset: &Vector3<f32>) {
        self.position += self.orientation() * offset;
    }

    pub fn rotate_yaw(&mut self, angle: f32) {
        self.yaw += angle;
    }

    pub fn rotate_pitch(&mut self, angle: f32) {
        self.set_pitch(self.pitch + angle);
    }

    fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch.clamp(-FRAC_PI_2, FRAC_PI_2);
    }

    pub fn apply(&mut self, motion: &CameraMotion) {
        if motion.translate != Vector3::zeros() {
            self.translate_local(&motion.translate);
        }
        self.rotate_yaw(motion.yaw);
        self.rotate_pitch(motion.pitch);
    }

    /// Zero-sized viewports leave the aspect untouched.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Isometry3::from_parts(Translation3::from(self.position.coords), self.orientation())
            .inverse()
            .to_homogeneous()
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        Matrix4::new_perspective(self.aspect, self.fov_degrees.to_radians(), self.near, self.far)
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }
}

#[cfg(test)]
impl CameraRig {
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn forward(&self) -> Vector3<f32> {
        self.orientation() * -Vector3::z()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> CameraSettings {
        CameraSettings {
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            position: [0.0, 50.0, 100.0],
            look_at: Some([0.0, 0.0, 0.0]),
            pitch_degrees: 0.0,
            move_speed: 1.0,
            rotate_speed: 0.02,
        }
    }

    #[test]
    fn look_at_points_forward_at_target() {
        let rig = CameraRig::new(&settings(), 1.5);
        let expected = (Point3::origin() - rig.position).normalize();
        assert!((rig.forward() - expected).norm() < 1e-5);
    }

    #[test]
    fn pitch_never_passes_vertical() {
        let mut rig = CameraRig::new(&settings(), 1.0);
        for _ in 0..1000 {
            rig.rotate_pitch(0.02);
        }
        assert_eq!(rig.pitch(), FRAC_PI_2);
        for _ in 0..5000 {
            rig.rotate_pitch(-0.02);
        }
        assert_eq!(rig.pitch(), -FRAC_PI_2);
    }

    #[test]
    fn initial_pitch_is_clamped_too() {
        let mut s = settings();
        s.look_at = None;
        s.pitch_degrees = 120.0;
        let rig = CameraRig::new(&s, 1.0);
        assert_eq!(rig.pitch(), FRAC_PI_2);
    }

    #[test]
    fn forward_motion_follows_view_direction() {
        let mut rig = CameraRig::new(&settings(), 1.0);
        let start = rig.position;
        let dir = rig.forward();
        rig.apply(&CameraMotion {
            translate: Vector3::new(0.0, 0.0, -1.0),
            yaw: 0.0,
            pitch: 0.0,
        });
        assert!(((rig.position - start) - dir).norm() < 1e-5);
    }

    #[test]
    fn view_matrix_moves_camera_to_origin() {
        let rig = CameraRig::new(&settings(), 1.0);
        let eye = rig.view_matrix().transform_point(&rig.position);
        assert!(eye.coords.norm() < 1e-4);
        let target = rig.view_matrix().transform_point(&Point3::origin());
        assert!(target.x.abs() < 1e-3 && target.y.abs() < 1e-3);
        assert!(target.z < 0.0);
    }

    #[test]
    fn viewport_sets_aspect_and_ignores_zero_height() {
        let mut rig = CameraRig::new(&settings(), 1.0);
        rig.set_viewport(800, 400);
        assert_eq!(rig.aspect, 2.0);
        rig.set_viewport(800, 0);
        assert_eq!(rig.aspect, 2.0);
    }
}
