// Common geometries

// A quad covering the whole of clip space. Every pass in the pipeline draws
// these two triangles and does its work in the fragment stage.
pub static PLANE_VERTICES: [f32; 8] = [
    1.0, -1.0, //
    1.0, 1.0, //
    -1.0, 1.0, //
    -1.0, -1.0, //
];

pub static PLANE_INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];
