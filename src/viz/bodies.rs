use nalgebra::{Matrix4, Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::config::{BodySpec, SolarSystemConfig};
use crate::engine::{rgb, scale, Rgb};
use crate::viz::textures::{Resolution, SlotId, TextureSet};

/// Extra geometry carried by a body.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BodyFeature {
    /// Flat annulus around the body, tilted about its X axis.
    Ring { inner: f32, outer: f32, tilt_degrees: f32, color: u32, opacity: f32 },
    /// Camera-facing additive sprite centered on the body.
    Glow { scale: f32, color: u32 },
}

impl BodyFeature {
    /// Placeholders only carry features that look right on a flat material.
    pub fn shown_on_placeholder(&self) -> bool {
        !matches!(self, BodyFeature::Glow { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextureSource {
    Loaded,
    Fallback(Rgb),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Material<T> {
    Flat { color: Rgb, emissive: Option<Rgb> },
    Textured { texture: T, source: TextureSource, emissive: Option<Rgb> },
}

impl<T> Material<T> {
    pub fn emissive(&self) -> Option<Rgb> {
        match self {
            Material::Flat { emissive, .. } | Material::Textured { emissive, .. } => *emissive,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CelestialBody<T> {
    pub name: String,
    pub label: String,
    pub radius: f32,
    pub orbital_radius: f32,
    pub orbit_angle: f32,
    pub orbit_speed: f32,
    pub spin: f32,
    pub spin_speed: f32,
    pub material: Material<T>,
    pub features: Vec<BodyFeature>,
}

impl<T> CelestialBody<T> {
    /// One frame of orbital and axial motion.
    pub fn advance(&mut self) {
        self.orbit_angle += self.orbit_speed;
        self.spin += self.spin_speed;
    }

    /// Orbits are circles in the XZ plane, counter-clockwise seen from +Y.
    pub fn position(&self) -> Point3<f32> {
        Point3::new(
            self.orbital_radius * self.orbit_angle.cos(),
            0.0,
            -self.orbital_radius * self.orbit_angle.sin(),
        )
    }

    pub fn spin_rotation(&self) -> UnitQuaternion<f32> {
        UnitQuaternion::from_axis_angle(&Vector3::y_axis(), self.spin)
    }

    /// Model matrix for a unit sphere mesh.
    pub fn model_matrix(&self) -> Matrix4<f32> {
        Matrix4::new_translation(&self.position().coords)
            * self.spin_rotation().to_homogeneous()
            * Matrix4::new_scaling(self.radius)
    }

    pub fn ring_matrix(&self, tilt_degrees: f32) -> Matrix4<f32> {
        Matrix4::new_translation(&self.position().coords)
            * self.spin_rotation().to_homogeneous()
            * Matrix4::from_axis_angle(&Vector3::x_axis(), tilt_degrees.to_radians())
    }
}

/// Builds body lists from the catalog.
pub struct BodyFactory<'a> {
    config: &'a SolarSystemConfig,
}

impl<'a> BodyFactory<'a> {
    pub fn new(config: &'a SolarSystemConfig) -> Self {
        BodyFactory { config }
    }

    fn emissive(&self, color: Option<u32>) -> Option<Rgb> {
        color.map(|c| scale(rgb(c), self.config.emissive_intensity))
    }

    /// Placeholder orbit speeds are coarser than the final ones: outer
    /// planets crawl, inner planets move at one shared pace.
    fn placeholder_orbit_speed(spec: &BodySpec) -> f32 {
        if !spec.orbits() {
            0.0
        } else if spec.orbital_radius > 40.0 {
            0.001
        } else {
            0.003
        }
    }

    /// Flat-colored stand-ins for every catalog entry.
    pub fn placeholder_bodies<T>(&self) -> Vec<CelestialBody<T>> {
        self.config
            .bodies
            .iter()
            .map(|spec| {
                let orbit_speed = Self::placeholder_orbit_speed(spec);
                CelestialBody {
                    name: spec.name.clone(),
                    label: spec.label.clone(),
                    radius: spec.radius,
                    orbital_radius: spec.orbital_radius,
                    orbit_angle: 0.0,
                    orbit_speed,
                    spin: 0.0,
                    spin_speed: if spec.orbits() { orbit_speed * 2.0 } else { spec.spin_speed },
                    material: Material::Flat {
                        color: rgb(spec.placeholder_color),
                        emissive: self.emissive(spec.placeholder_emissive),
                    },
                    features: spec
                        .features
                        .iter()
                        .filter(|f| f.shown_on_placeholder())
                        .cloned()
                        .collect(),
                }
            })
            .collect()
    }

    /// Textured bodies, one per catalog entry, using slot `i` for body `i`.
    pub fn final_bodies<T: Clone>(&self, textures: &TextureSet<T>) -> Vec<CelestialBody<T>> {
        self.config
            .bodies
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                let emissive = self.emissive(spec.emissive);
                let material = match textures.get(SlotId(i)) {
                    Some(Resolution::Loaded(texture)) => Material::Textured {
                        texture: texture.clone(),
                        source: TextureSource::Loaded,
                        emissive,
                    },
                    Some(Resolution::Fallback { color, texture: Some(texture) }) => Material::Textured {
                        texture: texture.clone(),
                        source: TextureSource::Fallback(*color),
                        emissive,
                    },
                    Some(Resolution::Fallback { color, texture: None }) => Material::Flat { color: *color, emissive },
                    None => Material::Flat { color: rgb(spec.fallback_color), emissive },
                };
                CelestialBody {
                    name: spec.name.clone(),
                    label: spec.label.clone(),
                    radius: spec.radius,
                    orbital_radius: spec.orbital_radius,
                    orbit_angle: 0.0,
                    orbit_speed: spec.orbit_speed,
                    spin: 0.0,
                    spin_speed: spec.spin_speed,
                    material,
                    features: spec.features.clone(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
impl<T> CelestialBody<T> {
    pub fn is_placeholder(&self) -> bool {
        matches!(self.material, Material::Flat { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_cover_every_body_without_glow() {
        let config = SolarSystemConfig::default();
        let bodies: Vec<CelestialBody<()>> = BodyFactory::new(&config).placeholder_bodies();
        assert_eq!(bodies.len(), config.bodies.len());
        assert!(bodies.iter().all(CelestialBody::is_placeholder));
        assert!(bodies
            .iter()
            .flat_map(|b| &b.features)
            .all(|f| !matches!(f, BodyFeature::Glow { .. })));
        let saturn = bodies.iter().find(|b| b.name == "saturn").unwrap();
        assert_eq!(saturn.features.len(), 1);
    }

    #[test]
    fn placeholder_speeds_split_at_forty_units() {
        let config = SolarSystemConfig::default();
        let bodies: Vec<CelestialBody<()>> = BodyFactory::new(&config).placeholder_bodies();
        let speed = |name: &str| bodies.iter().find(|b| b.name == name).unwrap().orbit_speed;
        assert_eq!(speed("sun"), 0.0);
        assert_eq!(speed("mars"), 0.003);
        assert_eq!(speed("jupiter"), 0.001);
    }

    #[test]
    fn final_bodies_carry_texture_source() {
        let config = SolarSystemConfig::default();
        let mut textures = TextureSet::for_bodies(&config.bodies);
        for i in 0..config.bodies.len() {
            let outcome = if i == 4 { Err(()) } else { Ok(i as u32) };
            textures.resolve(SlotId(i), outcome, |_| Some(999));
        }
        let bodies = BodyFactory::new(&config).final_bodies(&textures);
        assert_eq!(bodies.len(), 9);
        assert!(matches!(
            bodies[4].material,
            Material::Textured { texture: 999, source: TextureSource::Fallback(c), .. } if c == rgb(0xff4400)
        ));
        assert!(matches!(bodies[0].material, Material::Textured { source: TextureSource::Loaded, .. }));
        assert!(bodies[0].features.iter().any(|f| matches!(f, BodyFeature::Glow { .. })));
    }

    #[test]
    fn advance_moves_along_orbit() {
        let config = SolarSystemConfig::default();
        let mut bodies: Vec<CelestialBody<()>> = BodyFactory::new(&config).placeholder_bodies();
        let earth = &mut bodies[3];
        assert_eq!(earth.position(), Point3::new(28.0, 0.0, 0.0));
        for _ in 0..100 {
            earth.advance();
        }
        let p = earth.position();
        assert!((p.coords.norm() - 28.0).abs() < 1e-3);
        assert!(p.z < 0.0);
        assert!((earth.spin - 0.6).abs() < 1e-4);
    }
}
