use crate::rng;

// Pointer colors are kept dim and brightened on demand (click splats scale
// them back up), so the dye field doesn't saturate under continuous input.
const POINTER_COLOR_SCALE: f32 = 0.15;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub fn scale(self, factor: f32) -> Color {
        Color {
            r: self.r * factor,
            g: self.g * factor,
            b: self.b * factor,
        }
    }
}

impl From<Color> for [f32; 3] {
    fn from(color: Color) -> Self {
        [color.r, color.g, color.b]
    }
}

// Pick a fully saturated color with a random hue.
pub fn generate_color() -> Color {
    hsv_to_rgb(rng::gen::<f32>(), 1.0, 1.0).scale(POINTER_COLOR_SCALE)
}

pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Color {
    let i = (h * 6.0).floor();
    let f = h * 6.0 - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - f * s);
    let t = v * (1.0 - (1.0 - f) * s);

    let (r, g, b) = match (i as i32).rem_euclid(6) {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };

    Color { r, g, b }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn primary_hues_map_to_primary_colors() {
        let red = hsv_to_rgb(0.0, 1.0, 1.0);
        assert_relative_eq!(red.r, 1.0);
        assert_relative_eq!(red.g, 0.0);
        assert_relative_eq!(red.b, 0.0);

        let green = hsv_to_rgb(1.0 / 3.0, 1.0, 1.0);
        assert_relative_eq!(green.r, 0.0, epsilon = 1e-6);
        assert_relative_eq!(green.g, 1.0);
        assert_relative_eq!(green.b, 0.0, epsilon = 1e-6);

        let blue = hsv_to_rgb(2.0 / 3.0, 1.0, 1.0);
        assert_relative_eq!(blue.r, 0.0, epsilon = 1e-6);
        assert_relative_eq!(blue.g, 0.0, epsilon = 1e-6);
        assert_relative_eq!(blue.b, 1.0);
    }

    #[test]
    fn zero_saturation_is_grayscale() {
        let gray = hsv_to_rgb(0.4, 0.0, 0.8);
        assert_relative_eq!(gray.r, 0.8);
        assert_relative_eq!(gray.g, 0.8);
        assert_relative_eq!(gray.b, 0.8);
    }

    #[test]
    fn generated_colors_are_dim() {
        crate::rng::init_from_seed(&Some("plume-test-seed".to_string()));

        for _ in 0..64 {
            let color = generate_color();
            assert!(color.r <= POINTER_COLOR_SCALE);
            assert!(color.g <= POINTER_COLOR_SCALE);
            assert!(color.b <= POINTER_COLOR_SCALE);
            assert!(color.r >= 0.0 && color.g >= 0.0 && color.b >= 0.0);
        }
    }
}
