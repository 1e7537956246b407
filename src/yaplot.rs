//! Drawing-language primitives for the yaplot viewer.
//!
//! Yaplot takes a line-oriented token stream: `@ n r g b` defines palette
//! slot n, a bare `@ n` selects it, `y n` selects a drawing layer and
//! `p n x1 y1 z1 ...` draws a closed n-gon. Slots 0 to 2 belong to the
//! viewer, so drawable colors start at [`PALETTE_BASE`].

use lazy_static::lazy_static;
use std::fmt::Write;

/// How many classes the ranked drawing shows.
pub const TOP_K: usize = 30;

/// First palette slot free for our colors.
pub const PALETTE_BASE: usize = 3;

lazy_static! {
    /// One color per display rank, hue swept once around the circle.
    pub static ref RAINBOW: Vec<[u8; 3]> = (0..TOP_K)
        .map(|rank| hue_to_rgb(rank as f64 / TOP_K as f64))
        .collect();
}

pub fn set_palette(slot: usize, rgb: [u8; 3]) -> String {
    format!("@ {} {} {} {}\n", slot, rgb[0], rgb[1], rgb[2])
}

pub fn color(slot: usize) -> String {
    format!("@ {}\n", slot)
}

pub fn layer(n: usize) -> String {
    format!("y {}\n", n)
}

pub fn polygon(vertices: &[[f64; 3]]) -> String {
    let mut line = format!("p {}", vertices.len());
    for v in vertices {
        write!(line, " {:.4} {:.4} {:.4}", v[0], v[1], v[2]).unwrap();
    }
    line.push('\n');
    line
}

/// Hue on [0,1) to full-saturation RGB.
fn hue_to_rgb(h: f64) -> [u8; 3] {
    let h6 = (h.fract() + 1.0).fract() * 6.0;
    let sector = h6.floor() as usize % 6;
    let f = h6 - h6.floor();
    let q = 1.0 - f;
    let channels = match sector {
        0 => (1.0, f, 0.0),
        1 => (q, 1.0, 0.0),
        2 => (0.0, 1.0, f),
        3 => (0.0, q, 1.0),
        4 => (f, 0.0, 1.0),
        _ => (1.0, 0.0, q),
    };
    [level(channels.0), level(channels.1), level(channels.2)]
}

fn level(x: f64) -> u8 {
    (x * 255.0).round() as u8
}
