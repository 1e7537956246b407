//! Periodic cell arithmetic in fractional coordinates.

/// Periodic repeat cell of the simulation box.
///
/// Rows of `mat` are the lattice vectors, so a fractional coordinate `f`
/// maps into real space as the row-vector product `f · mat`.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub mat: [[f64; 3]; 3],
}

impl Cell {
    pub fn new(mat: [[f64; 3]; 3]) -> Self {
        Self { mat }
    }

    /// Orthorhombic cell from three box lengths.
    pub fn orthorhombic(lengths: [f64; 3]) -> Self {
        Self {
            mat: [
                [lengths[0], 0.0, 0.0],
                [0.0, lengths[1], 0.0],
                [0.0, 0.0, lengths[2]],
            ],
        }
    }

    /// Project a fractional coordinate into real space.
    pub fn to_real(&self, frac: [f64; 3]) -> [f64; 3] {
        let m = &self.mat;
        [
            frac[0] * m[0][0] + frac[1] * m[1][0] + frac[2] * m[2][0],
            frac[0] * m[0][1] + frac[1] * m[1][1] + frac[2] * m[2][1],
            frac[0] * m[0][2] + frac[1] * m[1][2] + frac[2] * m[2][2],
        ]
    }
}

/// Minimum-image displacement from `b` to `a` in fractional coordinates:
/// the raw difference with the nearest integer translation removed, so every
/// component lands in [-0.5, 0.5).
pub fn min_image(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    let mut d = sub(a, b);
    for k in 0..3 {
        d[k] -= (d[k] + 0.5).floor();
    }
    d
}

pub fn add(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

pub fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub fn scale(a: [f64; 3], s: f64) -> [f64; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

pub fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub fn norm(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}
