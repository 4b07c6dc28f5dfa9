//! Viewer configuration.
//!
//! Every field has a default, so pages can pass a partial object (or nothing
//! at all) and only override what they care about.

use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;

use crate::error::{Result, ViewerError};
use crate::viz::bodies::BodyFeature;

const TEXTURE_BASE: &str = "https://raw.githubusercontent.com/mrdoob/three.js/master/examples/textures/planets/";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct CameraSettings {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    /// When set, overrides `pitch_degrees`.
    pub look_at: Option<[f32; 3]>,
    pub pitch_degrees: f32,
    pub move_speed: f32,
    pub rotate_speed: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
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
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BodySpec {
    pub name: String,
    pub label: String,
    pub radius: f32,
    #[serde(default)]
    pub orbital_radius: f32,
    #[serde(default)]
    pub orbit_speed: f32,
    #[serde(default)]
    pub spin_speed: f32,
    pub placeholder_color: u32,
    pub fallback_color: u32,
    #[serde(default)]
    pub placeholder_emissive: Option<u32>,
    #[serde(default)]
    pub emissive: Option<u32>,
    pub texture_url: String,
    #[serde(default)]
    pub features: Vec<BodyFeature>,
}

impl BodySpec {
    fn planet(name: &str, label: &str, radius: f32, orbital_radius: f32, orbit_speed: f32, placeholder: u32, fallback: u32) -> Self {
        BodySpec {
            name: name.to_string(),
            label: label.to_string(),
            radius,
            orbital_radius,
            orbit_speed,
            spin_speed: orbit_speed * 2.0,
            placeholder_color: placeholder,
            fallback_color: fallback,
            placeholder_emissive: None,
            emissive: None,
            texture_url: format!("{TEXTURE_BASE}{name}.jpg"),
            features: Vec::new(),
        }
    }

    pub fn orbits(&self) -> bool {
        self.orbital_radius > 0.0
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SolarSystemConfig {
    pub camera: CameraSettings,
    pub bodies: Vec<BodySpec>,
    pub label_offset: f32,
    pub orbit_color: u32,
    pub orbit_opacity: f32,
    pub orbit_segments: u16,
    pub sphere_segments: u16,
    pub emissive_intensity: f32,
    pub ambient_light: u32,
    pub fallback_texture_size: u32,
}

impl Default for SolarSystemConfig {
    fn default() -> Self {
        let mut sun = BodySpec::planet("sun", "Dielli", 8.0, 0.0, 0.0, 0xffff00, 0xffff00);
        sun.spin_speed = 0.001;
        sun.placeholder_emissive = Some(0xff6600);
        sun.emissive = Some(0xffff00);
        sun.features.push(BodyFeature::Glow { scale: 40.0, color: 0xffff00 });

        let mut saturn = BodySpec::planet("saturn", "Saturni", 3.5, 55.0, 0.001, 0xead6b8, 0xffd700);
        saturn.features.push(BodyFeature::Ring {
            inner: 4.0,
            outer: 7.0,
            tilt_degrees: 60.0,
            color: 0xc1a875,
            opacity: 0.8,
        });

        SolarSystemConfig {
            camera: CameraSettings::default(),
            bodies: vec![
                sun,
                BodySpec::planet("mercury", "Mërkuri", 0.8, 15.0, 0.01, 0xa5a5a5, 0x888888),
                BodySpec::planet("venus", "Venusi", 1.2, 20.0, 0.008, 0xe6b800, 0xffd700),
                BodySpec::planet("earth", "Toka", 1.5, 28.0, 0.006, 0x2244cc, 0x0077ff),
                BodySpec::planet("mars", "Marsi", 1.3, 35.0, 0.004, 0xcc4422, 0xff4400),
                BodySpec::planet("jupiter", "Jupiteri", 4.0, 45.0, 0.002, 0xd8b690, 0xffaa00),
                saturn,
                BodySpec::planet("uranus", "Urani", 2.5, 65.0, 0.0008, 0x99ccff, 0x00ffff),
                BodySpec::planet("neptune", "Neptuni", 2.3, 75.0, 0.0006, 0x3344aa, 0x0000ff),
            ],
            label_offset: -2.0,
            orbit_color: 0x666666,
            orbit_opacity: 0.3,
            orbit_segments: 90,
            sphere_segments: 32,
            emissive_intensity: 0.5,
            ambient_light: 0x404040,
            fallback_texture_size: 256,
        }
    }
}

impl SolarSystemConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SolarSystemConfig = serde_json::from_str(json)?;
        config.validate()
    }

    pub fn from_js(value: JsValue) -> Result<Self> {
        if value.is_undefined() || value.is_null() {
            return Ok(Self::default());
        }
        if let Some(json) = value.as_string() {
            return Self::from_json(&json);
        }
        let config: SolarSystemConfig = serde_wasm_bindgen::from_value(value)?;
        config.validate()
    }

    fn validate(self) -> Result<Self> {
        if self.bodies.is_empty() {
            return Err(ViewerError::Config("at least one body is required".into()));
        }
        if let Some(body) = self.bodies.iter().find(|b| !(b.radius > 0.0)) {
            return Err(ViewerError::Config(format!("body {} needs a positive radius", body.name)));
        }
        Ok(self)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ConstellationSpec {
    pub name: String,
    pub stars: Vec<[f32; 3]>,
}

impl ConstellationSpec {
    fn new(name: &str, stars: &[[f32; 3]]) -> Self {
        ConstellationSpec { name: name.to_string(), stars: stars.to_vec() }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct NightSkyConfig {
    pub camera: CameraSettings,
    pub star_count: usize,
    /// Edge length of the cube the background stars are scattered in.
    pub star_spread: f32,
    pub star_size: f32,
    /// Fixed seed for the star field; random when absent.
    pub seed: Option<u64>,
    pub label_distance: f32,
    pub label_lift: f32,
    pub line_color: u32,
    pub marker_radius: f32,
    pub constellations: Vec<ConstellationSpec>,
}

impl Default for NightSkyConfig {
    fn default() -> Self {
        NightSkyConfig {
            camera: CameraSettings {
                fov_degrees: 60.0,
                near: 1.0,
                far: 1000.0,
                position: [0.0, 0.0, 100.0],
                look_at: None,
                pitch_degrees: 41.0,
                move_speed: 1.0,
                rotate_speed: 0.02,
            },
            star_count: 10_000,
            star_spread: 2000.0,
            star_size: 0.1,
            seed: None,
            label_distance: 30.0,
            label_lift: 2.0,
            line_color: 0x4a9eff,
            marker_radius: 0.2,
            constellations: vec![
                ConstellationSpec::new("Arusha e Madhe", &[
                    [0.0, 10.0, 50.0], [5.0, 12.0, 50.0], [10.0, 15.0, 50.0], [15.0, 13.0, 50.0],
                    [12.0, 8.0, 50.0], [7.0, 6.0, 50.0], [2.0, 7.0, 50.0],
                ]),
                ConstellationSpec::new("Kasiopea", &[
                    [-10.0, 20.0, 40.0], [-8.0, 25.0, 40.0], [-5.0, 23.0, 40.0],
                    [-2.0, 25.0, 40.0], [0.0, 22.0, 40.0],
                ]),
                ConstellationSpec::new("Orioni", &[
                    [-20.0, 0.0, 45.0], [-18.0, 5.0, 45.0], [-15.0, 8.0, 45.0],
                    [-20.0, -5.0, 45.0], [-15.0, -8.0, 45.0], [-18.0, -10.0, 45.0],
                ]),
                ConstellationSpec::new("Drako", &[
                    [15.0, 30.0, 35.0], [18.0, 28.0, 35.0], [20.0, 25.0, 35.0],
                    [22.0, 22.0, 35.0], [25.0, 20.0, 35.0], [28.0, 18.0, 35.0],
                ]),
                ConstellationSpec::new("Pegasi", &[
                    [30.0, 15.0, 30.0], [33.0, 15.0, 30.0], [33.0, 12.0, 30.0], [30.0, 12.0, 30.0],
                ]),
                ConstellationSpec::new("Luani", &[
                    [-25.0, 15.0, 40.0], [-22.0, 18.0, 40.0], [-20.0, 20.0, 40.0],
                    [-18.0, 17.0, 40.0], [-15.0, 15.0, 40.0], [-17.0, 12.0, 40.0],
                ]),
                ConstellationSpec::new("Binjakët", &[
                    [35.0, 25.0, 45.0], [37.0, 28.0, 45.0], [40.0, 30.0, 45.0],
                    [35.0, 20.0, 45.0], [37.0, 23.0, 45.0], [40.0, 25.0, 45.0],
                ]),
                ConstellationSpec::new("Demi", &[
                    [-30.0, 30.0, 35.0], [-27.0, 33.0, 35.0], [-25.0, 35.0, 35.0],
                    [-28.0, 28.0, 35.0], [-26.0, 30.0, 35.0],
                ]),
                ConstellationSpec::new("Shigjetari", &[
                    [25.0, -10.0, 40.0], [28.0, -8.0, 40.0], [30.0, -5.0, 40.0],
                    [27.0, -12.0, 40.0], [32.0, -7.0, 40.0],
                ]),
                ConstellationSpec::new("Akrepi", &[
                    [-15.0, -15.0, 45.0], [-12.0, -17.0, 45.0], [-10.0, -20.0, 45.0],
                    [-8.0, -22.0, 45.0], [-5.0, -25.0, 45.0], [-3.0, -27.0, 45.0],
                ]),
            ],
        }
    }
}

impl NightSkyConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: NightSkyConfig = serde_json::from_str(json)?;
        config.validate()
    }

    pub fn from_js(value: JsValue) -> Result<Self> {
        if value.is_undefined() || value.is_null() {
            return Ok(Self::default());
        }
        if let Some(json) = value.as_string() {
            return Self::from_json(&json);
        }
        let config: NightSkyConfig = serde_wasm_bindgen::from_value(value)?;
        config.validate()
    }

    fn validate(self) -> Result<Self> {
        if !(self.star_spread.is_finite() && self.star_spread >= 0.0) {
            return Err(ViewerError::Config(format!("star_spread must be a finite non-negative number, got {}", self.star_spread)));
        }
        for (field, value) in [("star_size", self.star_size), ("label_distance", self.label_distance)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ViewerError::Config(format!("{field} must be a finite positive number, got {value}")));
            }
        }
        if let Some(c) = self.constellations.iter().find(|c| c.stars.is_empty()) {
            return Err(ViewerError::Config(format!("constellation {} has no stars", c.name)));
        }
        Ok(self)
    }
}
