pub mod camera;
pub mod dom;
pub mod input;
pub mod labels;
pub mod mesh;
pub mod pass;
pub mod renderer;

pub type Rgb = (f32, f32, f32);

/// `0xRRGGBB` to normalized channels.
pub fn rgb(hex: u32) -> Rgb {
    (
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    )
}

pub fn scale(color: Rgb, factor: f32) -> Rgb {
    (color.0 * factor, color.1 * factor, color.2 * factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_channels_split() {
        assert_eq!(rgb(0xff0000), (1.0, 0.0, 0.0));
        assert_eq!(rgb(0x0000ff), (0.0, 0.0, 1.0));
        let (r, g, b) = rgb(0x404040);
        assert!((r - 64.0 / 255.0).abs() < 1e-6 && r == g && g == b);
    }
}
