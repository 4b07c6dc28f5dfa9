use nalgebra::{Matrix4, Point3, Vector3};

use crate::config::SolarSystemConfig;
use crate::engine::camera::CameraRig;
use crate::engine::labels::{Label, LabelOverlay};
use crate::engine::mesh::{circle_xz, Mesh};
use crate::engine::pass::{Blend, DrawStyle, ScenePass};
use crate::engine::{rgb, Rgb};
use crate::viz::bodies::{BodyFactory, BodyFeature, CelestialBody, Material, TextureSource};
use crate::viz::textures::{ResolveOutcome, SlotId, TextureSet};
use crate::viz::Visualization;

struct RingMesh {
    body: usize,
    mesh: Mesh,
    tilt_degrees: f32,
    color: Rgb,
    opacity: f32,
}

struct Glow {
    body: usize,
    scale: f32,
    color: Rgb,
}

/// Sun and planets on circular orbits.
///
/// Starts with flat-colored placeholders. Once every texture slot has
/// resolved, the whole body list is swapped for textured bodies in one step
/// and labels are attached.
pub struct SolarSystem<T> {
    config: SolarSystemConfig,
    camera: CameraRig,
    bodies: Vec<CelestialBody<T>>,
    textures: TextureSet<T>,
    labels: LabelOverlay,
    sphere: Mesh,
    sprite: Mesh,
    rings: Vec<RingMesh>,
    glows: Vec<Glow>,
    orbits: Vec<Vec<f32>>,
    glow_texture: Option<T>,
    swaps: u32,
}

impl<T: Clone> SolarSystem<T> {
    pub fn new(config: SolarSystemConfig, aspect: f32) -> Self {
        let camera = CameraRig::new(&config.camera, aspect);
        let bodies = BodyFactory::new(&config).placeholder_bodies();
        let textures = TextureSet::for_bodies(&config.bodies);
        let orbits = config
            .bodies
            .iter()
            .filter(|b| b.orbits())
            .map(|b| circle_xz(b.orbital_radius, config.orbit_segments))
            .collect();
        let segments = config.sphere_segments;

        let mut system = SolarSystem {
            config,
            camera,
            bodies,
            textures,
            labels: LabelOverlay::new(),
            sphere: Mesh::sphere(1.0, segments, segments, 1.0, 1.0, 1.0),
            sprite: Mesh::quad(1.0, 1.0, 1.0),
            rings: Vec::new(),
            glows: Vec::new(),
            orbits,
            glow_texture: None,
            swaps: 0,
        };
        system.rebuild_features();
        system
    }

    pub fn config(&self) -> &SolarSystemConfig {
        &self.config
    }

    pub fn bodies(&self) -> &[CelestialBody<T>] {
        &self.bodies
    }

    pub fn set_glow_texture(&mut self, texture: T) {
        self.glow_texture = Some(texture);
    }

    /// `(slot, body name, url)` for every texture still to be fetched.
    pub fn pending_textures(&self) -> Vec<(SlotId, String, String)> {
        self.textures.pending()
    }

    /// Feeds one fetch result into the texture set and performs the swap
    /// when it was the last outstanding slot.
    pub fn resolve_texture<E>(
        &mut self,
        slot: SlotId,
        outcome: Result<T, E>,
        fallback: impl FnOnce(Rgb) -> Option<T>,
    ) -> ResolveOutcome {
        let result = self.textures.resolve(slot, outcome, fallback);
        if result == ResolveOutcome::Complete {
            self.swap_to_final();
        }
        result
    }

    fn swap_to_final(&mut self) {
        if self.swaps > 0 {
            return;
        }
        let mut bodies = BodyFactory::new(&self.config).final_bodies(&self.textures);
        for (new, old) in bodies.iter_mut().zip(&self.bodies) {
            new.orbit_angle = old.orbit_angle;
            new.spin = old.spin;
        }
        for body in &bodies {
            match body.material {
                Material::Textured { source: TextureSource::Fallback(color), .. } => {
                    log::debug!("{} textured with fallback color {:?}", body.name, color)
                }
                Material::Flat { color, .. } => log::debug!("{} has no texture, drawn flat in {:?}", body.name, color),
                Material::Textured { .. } => {}
            }
        }
        self.bodies = bodies;
        self.rebuild_features();

        let offset = Vector3::new(0.0, self.config.label_offset, 0.0);
        let labels = self
            .bodies
            .iter()
            .enumerate()
            .map(|(i, body)| Label::on_body(&body.label, i, offset))
            .collect();
        self.labels.replace(labels);
        self.swaps += 1;
    }

    fn rebuild_features(&mut self) {
        self.rings.clear();
        self.glows.clear();
        for (i, body) in self.bodies.iter().enumerate() {
            for feature in &body.features {
                match *feature {
                    BodyFeature::Ring { inner, outer, tilt_degrees, color, opacity } => {
                        let color = rgb(color);
                        self.rings.push(RingMesh {
                            body: i,
                            mesh: Mesh::ring(inner, outer, self.config.sphere_segments, 1.0, 1.0, 1.0),
                            tilt_degrees,
                            color,
                            opacity,
                        });
                    }
                    BodyFeature::Glow { scale, color } => {
                        self.glows.push(Glow { body: i, scale, color: rgb(color) });
                    }
                }
            }
        }
    }

    fn body_style(body: &CelestialBody<T>) -> DrawStyle<'_, T> {
        let (color, texture) = match &body.material {
            Material::Flat { color, .. } => (*color, None),
            Material::Textured { texture, .. } => ((1.0, 1.0, 1.0), Some(texture)),
        };
        DrawStyle {
            color,
            texture,
            emissive: body.material.emissive(),
            opacity: 1.0,
            lit: true,
            blend: Blend::Opaque,
        }
    }
}

impl<T: Clone> Visualization for SolarSystem<T> {
    type Texture = T;

    fn camera(&self) -> &CameraRig {
        &self.camera
    }

    fn camera_mut(&mut self) -> &mut CameraRig {
        &mut self.camera
    }

    fn advance(&mut self) {
        for body in &mut self.bodies {
            body.advance();
        }
    }

    fn labels(&self) -> &LabelOverlay {
        &self.labels
    }

    fn update_labels(&mut self) {
        self.labels.update(&self.camera);
    }

    fn body_position(&self, index: usize) -> Option<Point3<f32>> {
        self.bodies.get(index).map(CelestialBody::position)
    }

    fn draw<P: ScenePass<Texture = T>>(&self, pass: &mut P) {
        let orbit_color = rgb(self.config.orbit_color);
        for orbit in &self.orbits {
            pass.draw_line_strip(orbit, orbit_color, self.config.orbit_opacity);
        }

        for body in &self.bodies {
            pass.draw_mesh(&self.sphere, &body.model_matrix(), &Self::body_style(body));
        }

        for ring in &self.rings {
            let Some(body) = self.bodies.get(ring.body) else { continue };
            let style = DrawStyle {
                opacity: ring.opacity,
                blend: Blend::Alpha,
                ..DrawStyle::flat(ring.color)
            };
            pass.draw_mesh(&ring.mesh, &body.ring_matrix(ring.tilt_degrees), &style);
        }

        if let Some(texture) = &self.glow_texture {
            let facing = self.camera.orientation().to_homogeneous();
            for glow in &self.glows {
                let Some(body) = self.bodies.get(glow.body) else { continue };
                let model = Matrix4::new_translation(&body.position().coords)
                    * facing
                    * Matrix4::new_nonuniform_scaling(&Vector3::new(glow.scale, glow.scale, 1.0));
                let style = DrawStyle {
                    texture: Some(texture),
                    blend: Blend::Additive,
                    ..DrawStyle::flat(glow.color)
                };
                pass.draw_mesh(&self.sprite, &model, &style);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::pass::Viewport;
    use crate::engine::input::KeyPhase;
    use crate::viz::testing::{recorders, Call};
    use crate::viz::SceneController;

    fn system() -> SolarSystem<u32> {
        SolarSystem::new(SolarSystemConfig::default(), 1.0)
    }

    fn resolve_all(system: &mut SolarSystem<u32>, failures: &[usize]) -> Vec<ResolveOutcome> {
        (0..system.config().bodies.len())
            .map(|i| {
                let outcome = if failures.contains(&i) { Err("404") } else { Ok(i as u32) };
                system.resolve_texture(SlotId(i), outcome, |_| Some(1000 + i as u32))
            })
            .collect()
    }

    #[test]
    fn placeholders_visible_before_any_texture() {
        let system = system();
        assert_eq!(system.bodies().len(), 9);
        assert!(system.bodies().iter().all(CelestialBody::is_placeholder));
        assert!(system.labels().labels().is_empty());
        assert_eq!(system.swaps, 0);
    }

    #[test]
    fn eight_loads_and_one_failure_swap_once() {
        let mut system = system();
        let outcomes = resolve_all(&mut system, &[4]);
        let completions = outcomes.iter().filter(|o| **o == ResolveOutcome::Complete).count();
        assert_eq!(completions, 1);
        assert_eq!(outcomes.last(), Some(&ResolveOutcome::Complete));
        assert_eq!(system.swaps, 1);

        let bodies = system.bodies();
        assert_eq!(bodies.len(), 9);
        assert!(bodies.iter().all(|b| !b.is_placeholder()));
        let mut names: Vec<&str> = bodies.iter().map(|b| b.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 9);

        let mars = bodies.iter().find(|b| b.name == "mars").unwrap();
        assert!(matches!(
            mars.material,
            Material::Textured { texture: 1004, source: crate::viz::bodies::TextureSource::Fallback(c), .. }
                if c == rgb(0xff4400)
        ));
        assert_eq!(system.labels().labels().len(), 9);
    }

    #[test]
    fn extra_resolution_does_not_swap_again() {
        let mut system = system();
        resolve_all(&mut system, &[]);
        let again = system.resolve_texture(SlotId(3), Ok::<_, ()>(77), |_| None);
        assert_eq!(again, ResolveOutcome::Ignored);
        assert_eq!(system.swaps, 1);
    }

    #[test]
    fn no_swap_until_last_slot_in_reverse_order() {
        let mut system = system();
        for i in (1..9).rev() {
            let out = system.resolve_texture(SlotId(i), Err::<u32, _>("offline"), |_| Some(i as u32));
            assert!(matches!(out, ResolveOutcome::Pending { .. }));
            assert!(system.bodies().iter().all(CelestialBody::is_placeholder));
        }
        assert_eq!(system.resolve_texture(SlotId(0), Ok::<_, ()>(5), |_| None), ResolveOutcome::Complete);
        assert!(system.bodies().iter().all(|b| !b.is_placeholder()));
    }

    #[test]
    fn swap_keeps_orbit_progress() {
        let mut system = system();
        for _ in 0..10 {
            system.advance();
        }
        let before = system.bodies()[1].orbit_angle;
        resolve_all(&mut system, &[]);
        assert_eq!(system.bodies()[1].orbit_angle, before);
        assert_eq!(system.bodies()[1].orbit_speed, 0.01);
    }

    #[test]
    fn frame_renders_scene_before_labels() {
        let mut controller = SceneController::new(system(), Viewport::new(800, 600));
        resolve_all(controller.scene_mut(), &[]);
        controller.scene_mut().set_glow_texture(42);
        let (log, mut pass, mut labels) = recorders();

        controller.step_frame(&mut pass, &mut labels);

        let calls = log.borrow();
        assert_eq!(calls.first(), Some(&Call::Begin(Viewport::new(800, 600))));
        assert!(matches!(calls.last(), Some(Call::Labels { placements }) if placements.len() == 9));
        let lines = calls.iter().filter(|c| matches!(c, Call::Lines { .. })).count();
        assert_eq!(lines, 8);
        let glow = calls
            .iter()
            .filter(|c| matches!(c, Call::Mesh { blend: Blend::Additive, texture: Some(42), .. }))
            .count();
        assert_eq!(glow, 1);
        let rings = calls
            .iter()
            .filter(|c| matches!(c, Call::Mesh { blend: Blend::Alpha, .. }))
            .count();
        assert_eq!(rings, 1);
        assert_eq!(controller.frames(), 1);
    }

    #[test]
    fn resize_reaches_camera_and_both_surfaces() {
        let mut controller = SceneController::new(system(), Viewport::new(800, 600));
        let (log, mut pass, mut labels) = recorders();
        controller.on_resize(1200, 400, &mut pass, &mut labels);

        assert_eq!(controller.viewport(), Viewport::new(1200, 400));
        assert_eq!(controller.scene().camera().aspect, 3.0);
        assert_eq!(
            *log.borrow(),
            vec![Call::Resize(Viewport::new(1200, 400)), Call::LabelResize(Viewport::new(1200, 400))]
        );

        // the next frame draws at the new size
        controller.step_frame(&mut pass, &mut labels);
        assert!(log.borrow().contains(&Call::Begin(Viewport::new(1200, 400))));
    }

    #[test]
    fn zero_height_keeps_previous_aspect() {
        let mut controller = SceneController::new(system(), Viewport::new(800, 400));
        let (_, mut pass, mut labels) = recorders();
        controller.on_resize(800, 0, &mut pass, &mut labels);
        assert_eq!(controller.scene().camera().aspect, 2.0);
    }

    #[test]
    fn only_routed_keyup_releases_a_key() {
        let mut controller = SceneController::new(system(), Viewport::new(800, 600));
        let (_, mut pass, mut labels) = recorders();
        let start = controller.scene().camera().yaw();
        controller.key_event(KeyPhase::Down, "ArrowLeft", true, false);

        // keyup aimed at another element on the page
        let ignored = controller.key_event(KeyPhase::Up, "ArrowLeft", false, false);
        assert!(!ignored.accepted);
        controller.step_frame(&mut pass, &mut labels);
        let turned = controller.scene().camera().yaw();
        assert!(turned > start);

        let released = controller.key_event(KeyPhase::Up, "ArrowLeft", false, true);
        assert!(released.accepted);
        controller.step_frame(&mut pass, &mut labels);
        assert_eq!(controller.scene().camera().yaw(), turned);
    }

    #[test]
    fn held_look_up_key_stays_clamped() {
        let mut controller = SceneController::new(system(), Viewport::new(800, 600));
        let (_, mut pass, mut labels) = recorders();
        controller.key_down("ArrowUp");
        for _ in 0..500 {
            controller.step_frame(&mut pass, &mut labels);
        }
        let pitch = controller.scene().camera().pitch();
        assert!(pitch <= std::f32::consts::FRAC_PI_2 && pitch >= -std::f32::consts::FRAC_PI_2);
        assert_eq!(pitch, std::f32::consts::FRAC_PI_2);
        controller.key_up("ArrowUp");
        controller.step_frame(&mut pass, &mut labels);
        assert_eq!(controller.scene().camera().pitch(), std::f32::consts::FRAC_PI_2);
    }
}
