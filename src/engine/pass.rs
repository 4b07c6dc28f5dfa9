//! Seams between scene models and whatever draws them.
//!
//! The WebGL renderer and the DOM label layer implement these in the
//! browser; tests implement them with recorders.

use nalgebra::Matrix4;

use crate::engine::camera::CameraRig;
use crate::engine::labels::{Label, LabelPlacement};
use crate::engine::mesh::Mesh;
use crate::engine::Rgb;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Viewport { width, height }
    }

    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blend {
    Opaque,
    Alpha,
    Additive,
}

/// How one mesh is shaded.
#[derive(Debug)]
pub struct DrawStyle<'a, T> {
    pub color: Rgb,
    pub texture: Option<&'a T>,
    pub emissive: Option<Rgb>,
    pub opacity: f32,
    /// Lit by the scene's ambient and point light, or drawn at full color.
    pub lit: bool,
    pub blend: Blend,
}

impl<'a, T> DrawStyle<'a, T> {
    pub fn flat(color: Rgb) -> Self {
        DrawStyle { color, texture: None, emissive: None, opacity: 1.0, lit: false, blend: Blend::Opaque }
    }
}

pub trait ScenePass {
    type Texture;

    /// Called synchronously from the resize notification.
    fn resize(&mut self, viewport: Viewport);
    fn begin(&mut self, camera: &CameraRig, viewport: Viewport);
    fn draw_mesh(&mut self, mesh: &Mesh, model: &Matrix4<f32>, style: &DrawStyle<'_, Self::Texture>);
    /// `points` are flat xyz triples joined into one strip.
    fn draw_line_strip(&mut self, points: &[f32], color: Rgb, opacity: f32);
    /// `size` is in world units and shrinks with distance.
    fn draw_points(&mut self, points: &[f32], color: Rgb, size: f32);
}

pub trait LabelPass {
    fn resize(&mut self, viewport: Viewport);
    fn draw_labels(&mut self, labels: &[Label], placements: &[LabelPlacement]);
}
