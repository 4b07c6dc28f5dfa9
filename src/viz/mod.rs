pub mod bodies;
pub mod night_sky;
pub mod solar_system;
pub mod textures;

use nalgebra::Point3;

use crate::engine::camera::CameraRig;
use crate::engine::input::{KeyPhase, KeyRoute, KeyState};
use crate::engine::labels::LabelOverlay;
use crate::engine::pass::{LabelPass, ScenePass, Viewport};

/// A scene model that a [`SceneController`] can drive.
pub trait Visualization {
    type Texture;

    fn camera(&self) -> &CameraRig;
    fn camera_mut(&mut self) -> &mut CameraRig;

    /// One frame of body motion.
    fn advance(&mut self);

    fn labels(&self) -> &LabelOverlay;

    /// Billboards labels against the current camera and applies visibility.
    fn update_labels(&mut self);

    /// World position of body `index`, for labels anchored to bodies.
    fn body_position(&self, index: usize) -> Option<Point3<f32>>;

    fn draw<P: ScenePass<Texture = Self::Texture>>(&self, pass: &mut P);
}

/// Frame driver shared by both visualizations: keyboard in, two render
/// passes out.
pub struct SceneController<V> {
    scene: V,
    keys: KeyState,
    viewport: Viewport,
    frames: u64,
}

impl<V: Visualization> SceneController<V> {
    pub fn new(mut scene: V, viewport: Viewport) -> Self {
        scene.camera_mut().set_viewport(viewport.width, viewport.height);
        SceneController { scene, keys: KeyState::new(), viewport, frames: 0 }
    }

    pub fn scene_mut(&mut self) -> &mut V {
        &mut self.scene
    }

    /// Routes a page-level key event; the caller applies `preventDefault`.
    pub fn key_event(&mut self, phase: KeyPhase, key: &str, inside_container: bool, is_body: bool) -> KeyRoute {
        self.keys.handle(phase, key, inside_container, is_body)
    }

    /// Resizes the camera and both drawing surfaces in one step.
    pub fn on_resize<P, L>(&mut self, width: u32, height: u32, pass: &mut P, label_pass: &mut L)
    where
        P: ScenePass<Texture = V::Texture>,
        L: LabelPass,
    {
        self.viewport = Viewport::new(width, height);
        self.scene.camera_mut().set_viewport(width, height);
        pass.resize(self.viewport);
        label_pass.resize(self.viewport);
    }

    /// Input, motion, labels, then the 3D pass followed by the label pass.
    pub fn step_frame<P, L>(&mut self, pass: &mut P, label_pass: &mut L)
    where
        P: ScenePass<Texture = V::Texture>,
        L: LabelPass,
    {
        let camera = self.scene.camera();
        let motion = self.keys.motion(camera.move_speed, camera.rotate_speed);
        if !motion.is_idle() {
            self.scene.camera_mut().apply(&motion);
        }

        self.scene.advance();
        self.scene.update_labels();

        pass.begin(self.scene.camera(), self.viewport);
        self.scene.draw(pass);

        let view_projection = self.scene.camera().view_projection();
        let placements = self.scene.labels().placements(
            &view_projection,
            self.viewport.width,
            self.viewport.height,
            |i| self.scene.body_position(i),
        );
        label_pass.draw_labels(self.scene.labels().labels(), &placements);

        self.frames += 1;
    }
}

#[cfg(test)]
impl<V: Visualization> SceneController<V> {
    pub fn scene(&self) -> &V {
        &self.scene
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn key_down(&mut self, key: &str) {
        self.key_event(KeyPhase::Down, key, false, true);
    }

    pub fn key_up(&mut self, key: &str) {
        self.key_event(KeyPhase::Up, key, false, true);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use nalgebra::Matrix4;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::engine::camera::CameraRig;
    use crate::engine::labels::{Label, LabelPlacement};
    use crate::engine::mesh::Mesh;
    use crate::engine::pass::{Blend, DrawStyle, LabelPass, ScenePass, Viewport};
    use crate::engine::Rgb;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Resize(Viewport),
        LabelResize(Viewport),
        Begin(Viewport),
        Mesh { texture: Option<u32>, color: Rgb, blend: Blend },
        Lines { points: usize },
        Points { points: usize },
        Labels { placements: Vec<LabelPlacement> },
    }

    pub type Log = Rc<RefCell<Vec<Call>>>;

    pub struct RecordingPass(pub Log);

    impl ScenePass for RecordingPass {
        type Texture = u32;

        fn resize(&mut self, viewport: Viewport) {
            self.0.borrow_mut().push(Call::Resize(viewport));
        }

        fn begin(&mut self, _camera: &CameraRig, viewport: Viewport) {
            self.0.borrow_mut().push(Call::Begin(viewport));
        }

        fn draw_mesh(&mut self, _mesh: &Mesh, _model: &Matrix4<f32>, style: &DrawStyle<'_, u32>) {
            self.0.borrow_mut().push(Call::Mesh {
                texture: style.texture.copied(),
                color: style.color,
                blend: style.blend,
            });
        }

        fn draw_line_strip(&mut self, points: &[f32], _color: Rgb, _opacity: f32) {
            self.0.borrow_mut().push(Call::Lines { points: points.len() / 3 });
        }

        fn draw_points(&mut self, points: &[f32], _color: Rgb, _size: f32) {
            self.0.borrow_mut().push(Call::Points { points: points.len() / 3 });
        }
    }

    pub struct RecordingLabels(pub Log);

    impl LabelPass for RecordingLabels {
        fn resize(&mut self, viewport: Viewport) {
            self.0.borrow_mut().push(Call::LabelResize(viewport));
        }

        fn draw_labels(&mut self, _labels: &[Label], placements: &[LabelPlacement]) {
            self.0.borrow_mut().push(Call::Labels { placements: placements.to_vec() });
        }
    }

    pub fn recorders() -> (Log, RecordingPass, RecordingLabels) {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        (log.clone(), RecordingPass(log.clone()), RecordingLabels(log))
    }
}
