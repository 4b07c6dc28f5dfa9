use std::f32::consts::PI;

/// Floats per vertex: position (3), color (3), texture coordinate (2).
pub const VERTEX_STRIDE: usize = 8;

pub struct Mesh {
    pub vertices: Vec<f32>,
    pub indices: Vec<u16>,
}

impl Mesh {
    /// UV sphere centered on the origin, laid out like a lat/long texture map
    /// so equirectangular planet images wrap without seams at the poles.
    ///
    /// Images are uploaded top row first, so `v = 0` is the north pole.
    pub fn sphere(radius: f32, width_segments: u16, height_segments: u16, r: f32, g: f32, b: f32) -> Self {
        let width_segments = width_segments.max(3);
        let height_segments = height_segments.max(2);
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for iy in 0..=height_segments {
            let v = iy as f32 / height_segments as f32;
            for ix in 0..=width_segments {
                let u = ix as f32 / width_segments as f32;
                let x = -radius * (u * 2.0 * PI).cos() * (v * PI).sin();
                let y = radius * (v * PI).cos();
                let z = radius * (u * 2.0 * PI).sin() * (v * PI).sin();
                vertices.extend_from_slice(&[x, y, z, r, g, b, u, v]);
            }
        }

        let row = width_segments + 1;
        for iy in 0..height_segments {
            for ix in 0..width_segments {
                let a = iy * row + ix + 1;
                let b = iy * row + ix;
                let c = (iy + 1) * row + ix;
                let d = (iy + 1) * row + ix + 1;
                if iy != 0 {
                    indices.extend_from_slice(&[a, b, d]);
                }
                if iy != height_segments - 1 {
                    indices.extend_from_slice(&[b, c, d]);
                }
            }
        }

        Mesh { vertices, indices }
    }

    /// Flat annulus in the XY plane. Callers tilt it with the model matrix.
    pub fn ring(inner: f32, outer: f32, segments: u16, r: f32, g: f32, b: f32) -> Self {
        let segments = segments.max(3);
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for radius in [inner, outer] {
            for i in 0..=segments {
                let theta = i as f32 / segments as f32 * 2.0 * PI;
                let x = radius * theta.cos();
                let y = radius * theta.sin();
                let u = (x / outer + 1.0) / 2.0;
                let v = (y / outer + 1.0) / 2.0;
                vertices.extend_from_slice(&[x, y, 0.0, r, g, b, u, v]);
            }
        }

        for i in 0..segments {
            let a = i;
            let b = a + segments + 1;
            let c = a + segments + 2;
            let d = a + 1;
            indices.extend_from_slice(&[a, b, d, b, c, d]);
        }

        Mesh { vertices, indices }
    }

    /// Unit quad in the XY plane, used for camera-facing sprites.
    pub fn quad(r: f32, g: f32, b: f32) -> Self {
        let vertices = vec![
            -0.5, -0.5, 0.0, r, g, b, 0.0, 0.0,
            0.5, -0.5, 0.0, r, g, b, 1.0, 0.0,
            0.5, 0.5, 0.0, r, g, b, 1.0, 1.0,
            -0.5, 0.5, 0.0, r, g, b, 0.0, 1.0,
        ];
        Mesh { vertices, indices: vec![0, 1, 2, 0, 2, 3] }
    }
}

/// Closed circle of `segments` line segments in the XZ plane, as flat xyz triples.
pub fn circle_xz(radius: f32, segments: u16) -> Vec<f32> {
    let segments = segments.max(3);
    let mut points = Vec::with_capacity((segments as usize + 1) * 3);
    for j in 0..=segments {
        let angle = j as f32 * 2.0 * PI / segments as f32;
        points.push(radius * angle.cos());
        points.push(0.0);
        points.push(radius * angle.sin());
    }
    points
}
