use crate::color::Color;

// Touch pointers carry the device's touch identifier; the mouse gets a
// sentinel that no touch will ever use.
pub const MOUSE_POINTER_ID: i64 = -1;

// The state of one input pointer, tracked in normalized texture coordinates
// with the origin at the bottom-left of the drawable surface.
//
// A pointer is created once and reused across gesture sessions: release
// clears the `down` flag but keeps the record alive for the next contact.
#[derive(Clone, Debug)]
pub struct Pointer {
    pub id: i64,
    pub texcoord: [f32; 2],
    pub prev_texcoord: [f32; 2],
    pub delta: [f32; 2],
    pub down: bool,
    pub moved: bool,
    pub color: Color,
}

impl Default for Pointer {
    fn default() -> Self {
        Self {
            id: MOUSE_POINTER_ID,
            texcoord: [0.0, 0.0],
            prev_texcoord: [0.0, 0.0],
            delta: [0.0, 0.0],
            down: false,
            moved: false,
            color: Color::BLACK,
        }
    }
}

impl Pointer {
    pub fn record_down(&mut self, id: i64, texcoord: [f32; 2], color: Color) {
        self.id = id;
        self.down = true;
        self.moved = false;
        self.texcoord = texcoord;
        self.prev_texcoord = texcoord;
        self.delta = [0.0, 0.0];
        self.color = color;
    }

    pub fn record_move(&mut self, texcoord: [f32; 2], aspect_ratio: f32) {
        self.prev_texcoord = self.texcoord;
        self.texcoord = texcoord;
        self.delta = [
            correct_delta_x(texcoord[0] - self.prev_texcoord[0], aspect_ratio),
            correct_delta_y(texcoord[1] - self.prev_texcoord[1], aspect_ratio),
        ];
        self.moved = self.delta[0].abs() > 0.0 || self.delta[1].abs() > 0.0;
    }

    pub fn record_up(&mut self) {
        self.down = false;
    }
}

// Map window-space pixel coordinates (origin top-left) into texture space
// (origin bottom-left).
pub fn window_to_texcoord(x: f64, y: f64, width: u32, height: u32) -> [f32; 2] {
    [
        (x / width as f64) as f32,
        1.0 - (y / height as f64) as f32,
    ]
}

// Pointer deltas are measured in texture space, which is stretched over a
// non-square drawable. Scale the shorter axis so a diagonal gesture splats a
// diagonal impulse.
fn correct_delta_x(delta: f32, aspect_ratio: f32) -> f32 {
    if aspect_ratio < 1.0 {
        delta * aspect_ratio
    } else {
        delta
    }
}

fn correct_delta_y(delta: f32, aspect_ratio: f32) -> f32 {
    if aspect_ratio > 1.0 {
        delta / aspect_ratio
    } else {
        delta
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn window_coordinates_are_flipped_vertically() {
        let texcoord = window_to_texcoord(400.0, 0.0, 800, 600);
        assert_relative_eq!(texcoord[0], 0.5);
        assert_relative_eq!(texcoord[1], 1.0);

        let texcoord = window_to_texcoord(0.0, 600.0, 800, 600);
        assert_relative_eq!(texcoord[0], 0.0);
        assert_relative_eq!(texcoord[1], 0.0);
    }

    #[test]
    fn stationary_pointer_is_not_moved() {
        let mut pointer = Pointer::default();
        pointer.record_down(MOUSE_POINTER_ID, [0.5, 0.5], Color::BLACK);
        assert!(pointer.down);
        assert!(!pointer.moved);

        pointer.record_move([0.5, 0.5], 1.0);
        assert!(!pointer.moved);
        assert_eq!(pointer.delta, [0.0, 0.0]);
    }

    #[test]
    fn movement_sets_the_moved_flag_and_delta() {
        let mut pointer = Pointer::default();
        pointer.record_down(7, [0.25, 0.5], Color::BLACK);
        pointer.record_move([0.5, 0.5], 1.0);

        assert!(pointer.moved);
        assert_relative_eq!(pointer.delta[0], 0.25);
        assert_relative_eq!(pointer.delta[1], 0.0);
        assert_eq!(pointer.prev_texcoord, [0.25, 0.5]);
        assert_eq!(pointer.id, 7);
    }

    #[test]
    fn deltas_are_corrected_for_wide_surfaces() {
        // On a 2:1 surface, a vertical texture-space delta covers half the
        // physical distance of an equal horizontal one.
        let mut pointer = Pointer::default();
        pointer.record_down(MOUSE_POINTER_ID, [0.5, 0.25], Color::BLACK);
        pointer.record_move([0.5, 0.5], 2.0);

        assert_relative_eq!(pointer.delta[0], 0.0);
        assert_relative_eq!(pointer.delta[1], 0.125);
    }

    #[test]
    fn deltas_are_corrected_for_tall_surfaces() {
        let mut pointer = Pointer::default();
        pointer.record_down(MOUSE_POINTER_ID, [0.25, 0.5], Color::BLACK);
        pointer.record_move([0.5, 0.5], 0.5);

        assert_relative_eq!(pointer.delta[0], 0.125);
        assert_relative_eq!(pointer.delta[1], 0.0);
    }

    #[test]
    fn release_keeps_the_pointer_for_the_next_gesture() {
        let mut pointer = Pointer::default();
        let color = Color {
            r: 0.1,
            g: 0.05,
            b: 0.15,
        };
        pointer.record_down(3, [0.5, 0.5], color);
        pointer.record_up();

        assert!(!pointer.down);
        assert_eq!(pointer.id, 3);
        assert_eq!(pointer.color, color);
    }
}
