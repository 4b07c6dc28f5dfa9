use nalgebra::{Matrix4, Point3, UnitQuaternion, Vector3};

use crate::engine::camera::CameraRig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelStyle {
    Planet,
    Constellation,
}

impl LabelStyle {
    pub fn class_name(self) -> &'static str {
        match self {
            LabelStyle::Planet => "planet-label",
            LabelStyle::Constellation => "constellation-label",
        }
    }

    pub fn css(self) -> &'static str {
        match self {
            LabelStyle::Planet => {
                "position: absolute; color: #00ff00; padding: 2px 6px; font-size: 14px; \
                 font-weight: bold; text-shadow: 2px 2px 2px rgba(0,0,0,0.5); \
                 pointer-events: none; white-space: nowrap;"
            }
            LabelStyle::Constellation => {
                "position: absolute; background-color: rgba(0, 0, 0, 0.6); color: white; \
                 padding: 2px 6px; border-radius: 3px; font-size: 12px; \
                 pointer-events: none; white-space: nowrap;"
            }
        }
    }
}

/// Where a label lives in world space.
#[derive(Debug, Clone, PartialEq)]
pub enum LabelAnchor {
    /// Follows the body at this index, offset in world units.
    Body { index: usize, offset: Vector3<f32> },
    World(Point3<f32>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Visibility {
    Always,
    /// Shown only while the camera is strictly closer than `distance`.
    Near { point: Point3<f32>, distance: f32 },
}

impl Visibility {
    pub fn opacity(&self, camera: &Point3<f32>) -> f32 {
        match self {
            Visibility::Always => 1.0,
            Visibility::Near { point, distance } => {
                if nalgebra::distance(camera, point) < *distance {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Label {
    pub text: String,
    pub style: LabelStyle,
    pub anchor: LabelAnchor,
    pub visibility: Visibility,
    pub opacity: f32,
    pub orientation: UnitQuaternion<f32>,
}

impl Label {
    pub fn on_body(text: &str, index: usize, offset: Vector3<f32>) -> Self {
        Label {
            text: text.to_string(),
            style: LabelStyle::Planet,
            anchor: LabelAnchor::Body { index, offset },
            visibility: Visibility::Always,
            opacity: 1.0,
            orientation: UnitQuaternion::identity(),
        }
    }

    pub fn near_point(text: &str, position: Point3<f32>, reference: Point3<f32>, distance: f32) -> Self {
        Label {
            text: text.to_string(),
            style: LabelStyle::Constellation,
            anchor: LabelAnchor::World(position),
            visibility: Visibility::Near { point: reference, distance },
            opacity: 0.0,
            orientation: UnitQuaternion::identity(),
        }
    }
}

/// Where the overlay should draw one label this frame.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelPlacement {
    /// Pixel position inside the container, `None` when behind the camera
    /// or outside the clip volume.
    pub screen: Option<(f32, f32)>,
    pub opacity: f32,
}

/// Screen-space annotations attached to scene entities.
#[derive(Debug, Default)]
pub struct LabelOverlay {
    labels: Vec<Label>,
}

impl LabelOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn push(&mut self, label: Label) {
        self.labels.push(label);
    }

    pub fn replace(&mut self, labels: Vec<Label>) {
        self.labels = labels;
    }

    /// Billboards every label and applies its visibility policy.
    pub fn update(&mut self, camera: &CameraRig) {
        let orientation = camera.orientation();
        for label in &mut self.labels {
            label.orientation = orientation;
            label.opacity = label.visibility.opacity(&camera.position);
        }
    }

    pub fn world_position(label: &Label, body_position: impl Fn(usize) -> Option<Point3<f32>>) -> Option<Point3<f32>> {
        match &label.anchor {
            LabelAnchor::Body { index, offset } => body_position(*index).map(|p| p + offset),
            LabelAnchor::World(p) => Some(*p),
        }
    }

    pub fn placements(
        &self,
        view_projection: &Matrix4<f32>,
        width: u32,
        height: u32,
        body_position: impl Fn(usize) -> Option<Point3<f32>>,
    ) -> Vec<LabelPlacement> {
        self.labels
            .iter()
            .map(|label| LabelPlacement {
                screen: Self::world_position(label, &body_position)
                    .and_then(|p| project(view_projection, &p, width, height)),
                opacity: label.opacity,
            })
            .collect()
    }
}

/// Projects a world point to pixel coordinates with the origin at top-left.
pub fn project(view_projection: &Matrix4<f32>, point: &Point3<f32>, width: u32, height: u32) -> Option<(f32, f32)> {
    let clip = view_projection * point.to_homogeneous();
    if clip.w <= 0.0 {
        return None;
    }
    let ndc = clip.xyz() / clip.w;
    if ndc.z < -1.0 || ndc.z > 1.0 {
        return None;
    }
    let x = (ndc.x + 1.0) / 2.0 * width as f32;
    let y = (1.0 - ndc.y) / 2.0 * height as f32;
    Some((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraSettings;

    fn camera_at(position: [f32; 3]) -> CameraRig {
        CameraRig::new(
            &CameraSettings {
                position,
                look_at: None,
                pitch_degrees: 0.0,
                ..CameraSettings::default()
            },
            1.0,
        )
    }

    #[test]
    fn near_label_hidden_at_exact_threshold() {
        let reference = Point3::new(0.0, 0.0, 0.0);
        let vis = Visibility::Near { point: reference, distance: 30.0 };
        assert_eq!(vis.opacity(&Point3::new(0.0, 0.0, 29.9)), 1.0);
        assert_eq!(vis.opacity(&Point3::new(0.0, 0.0, 30.0)), 0.0);
        assert_eq!(vis.opacity(&Point3::new(0.0, 0.0, 300.0)), 0.0);
    }

    #[test]
    fn update_copies_camera_orientation() {
        let mut camera = camera_at([0.0, 0.0, 10.0]);
        camera.rotate_yaw(0.7);
        camera.rotate_pitch(-0.3);
        let mut overlay = LabelOverlay::new();
        overlay.push(Label::on_body("Earth", 0, Vector3::new(0.0, -2.0, 0.0)));
        overlay.push(Label::near_point("Orion", Point3::origin(), Point3::origin(), 30.0));
        overlay.update(&camera);
        for label in overlay.labels() {
            assert!(label.orientation.angle_to(&camera.orientation()) < 1e-6);
        }
        assert_eq!(overlay.labels()[0].opacity, 1.0);
        assert_eq!(overlay.labels()[1].opacity, 1.0);
    }

    #[test]
    fn constellation_label_starts_hidden() {
        let label = Label::near_point("Lyra", Point3::new(1.0, 2.0, 3.0), Point3::new(1.0, 0.0, 3.0), 30.0);
        assert_eq!(label.opacity, 0.0);
    }

    #[test]
    fn body_label_follows_body_with_offset() {
        let label = Label::on_body("Mars", 3, Vector3::new(0.0, -2.0, 0.0));
        let pos = LabelOverlay::world_position(&label, |i| (i == 3).then(|| Point3::new(35.0, 0.0, 0.0)));
        assert_eq!(pos, Some(Point3::new(35.0, -2.0, 0.0)));
        assert_eq!(LabelOverlay::world_position(&label, |_| None), None);
    }

    #[test]
    fn projection_centers_look_target_and_hides_points_behind() {
        let camera = camera_at([0.0, 0.0, 10.0]);
        let vp = camera.view_projection();
        let (x, y) = project(&vp, &Point3::origin(), 800, 600).unwrap();
        assert!((x - 400.0).abs() < 1e-2);
        assert!((y - 300.0).abs() < 1e-2);
        assert_eq!(project(&vp, &Point3::new(0.0, 0.0, 20.0), 800, 600), None);
    }
}
