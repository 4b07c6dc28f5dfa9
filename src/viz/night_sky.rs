use nalgebra::{Matrix4, Point3, Vector3};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::marker::PhantomData;

use crate::config::NightSkyConfig;
use crate::engine::camera::CameraRig;
use crate::engine::labels::{Label, LabelOverlay};
use crate::engine::mesh::Mesh;
use crate::engine::pass::{DrawStyle, ScenePass};
use crate::engine::rgb;
use crate::viz::Visualization;

/// A named group of stars joined by a line.
///
/// The line and the star markers are both read from `points`, so they
/// always agree.
#[derive(Debug, Clone)]
pub struct Constellation {
    pub name: String,
    points: Vec<Point3<f32>>,
}

impl Constellation {
    /// `None` for an empty point list: a constellation needs a reference star.
    pub fn new(name: &str, stars: &[[f32; 3]]) -> Option<Self> {
        if stars.is_empty() {
            return None;
        }
        Some(Constellation {
            name: name.to_string(),
            points: stars.iter().map(|&[x, y, z]| Point3::new(x, y, z)).collect(),
        })
    }

    pub fn points(&self) -> &[Point3<f32>] {
        &self.points
    }

    /// Point used for label placement and proximity checks.
    pub fn reference(&self) -> Point3<f32> {
        self.points[0]
    }

    pub fn line_vertices(&self) -> Vec<f32> {
        self.points.iter().flat_map(|p| [p.x, p.y, p.z]).collect()
    }
}

/// Uniformly scattered background stars inside a cube of edge `spread`.
pub fn star_field<R: Rng>(rng: &mut R, count: usize, spread: f32) -> Vec<f32> {
    let half = spread / 2.0;
    (0..count * 3).map(|_| rng.gen_range(-half..=half)).collect()
}

/// Static star field with constellation figures. Nothing moves except the
/// camera; constellation labels fade in when the camera gets close.
pub struct NightSky<T> {
    config: NightSkyConfig,
    camera: CameraRig,
    stars: Vec<f32>,
    constellations: Vec<Constellation>,
    labels: LabelOverlay,
    marker: Mesh,
    _texture: PhantomData<fn() -> T>,
}

impl<T> NightSky<T> {
    pub fn new(config: NightSkyConfig, aspect: f32) -> Self {
        let mut rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        let stars = star_field(&mut rng, config.star_count, config.star_spread);

        let constellations: Vec<Constellation> = config
            .constellations
            .iter()
            .filter_map(|c| Constellation::new(&c.name, &c.stars))
            .collect();

        let mut labels = LabelOverlay::new();
        let lift = Vector3::new(0.0, config.label_lift, 0.0);
        for constellation in &constellations {
            let reference = constellation.reference();
            labels.push(Label::near_point(
                &constellation.name,
                reference + lift,
                reference,
                config.label_distance,
            ));
        }

        NightSky {
            camera: CameraRig::new(&config.camera, aspect),
            marker: Mesh::sphere(1.0, 8, 8, 1.0, 1.0, 1.0),
            config,
            stars,
            constellations,
            labels,
            _texture: PhantomData,
        }
    }

    pub fn constellations(&self) -> &[Constellation] {
        &self.constellations
    }

    pub fn star_count(&self) -> usize {
        self.stars.len() / 3
    }
}

impl<T> Visualization for NightSky<T> {
    type Texture = T;

    fn camera(&self) -> &CameraRig {
        &self.camera
    }

    fn camera_mut(&mut self) -> &mut CameraRig {
        &mut self.camera
    }

    fn advance(&mut self) {}

    fn labels(&self) -> &LabelOverlay {
        &self.labels
    }

    fn update_labels(&mut self) {
        self.labels.update(&self.camera);
    }

    fn body_position(&self, _index: usize) -> Option<Point3<f32>> {
        None
    }

    fn draw<P: ScenePass<Texture = T>>(&self, pass: &mut P) {
        pass.draw_points(&self.stars, (1.0, 1.0, 1.0), self.config.star_size);

        let line_color = rgb(self.config.line_color);
        let marker_style = DrawStyle::flat((1.0, 1.0, 1.0));
        for constellation in &self.constellations {
            pass.draw_line_strip(&constellation.line_vertices(), line_color, 1.0);
            for star in constellation.points() {
                let model = Matrix4::new_translation(&star.coords) * Matrix4::new_scaling(self.config.marker_radius);
                pass.draw_mesh(&self.marker, &model, &marker_style);
            }
        }
    }
}
