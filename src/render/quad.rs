//! Textured quads for cells and image layers.

use super::{Quad, Vertex};
use crate::gid::{Cell, Rotation};
use crate::tileset::TextureRegion;
use macroquad::color::Color;
use macroquad::math::{vec2, Vec2};

/// Corner texture coordinates in vertex order.
///
/// Vertices go bottom-left, top-left, top-right, bottom-right; with Y up the
/// region's bottom edge (`v2`) lands on the first vertex.
fn region_uvs(region: &TextureRegion, half_texel: bool) -> [Vec2; 4] {
    let (mut u1, mut v1, mut u2, mut v2) = (region.u(), region.v2(), region.u2(), region.v());
    if half_texel {
        let dx = 0.5 / region.image_width as f32;
        let dy = 0.5 / region.image_height as f32;
        // inset toward the centre whatever the region's flip
        let (sx, sy) = ((u2 - u1).signum(), (v2 - v1).signum());
        u1 += dx * sx;
        u2 -= dx * sx;
        v1 += dy * sy;
        v2 -= dy * sy;
    }
    [vec2(u1, v1), vec2(u1, v2), vec2(u2, v2), vec2(u2, v1)]
}

/// Quad covering `(x1, y1)`-`(x2, y2)` with the whole region.
pub fn region_quad(region: &TextureRegion, x1: f32, y1: f32, x2: f32, y2: f32, color: Color, half_texel: bool) -> Quad {
    let uv = region_uvs(region, half_texel);
    let corners = [vec2(x1, y1), vec2(x1, y2), vec2(x2, y2), vec2(x2, y1)];
    Quad {
        image: region.image,
        vertices: std::array::from_fn(|i| Vertex {
            position: corners[i],
            uv: uv[i],
            color,
        }),
    }
}

/// Apply a cell's flips, then its rotation, by reassigning texture coordinates.
pub fn transform_cell(quad: &mut Quad, cell: &Cell) {
    let v = &mut quad.vertices;
    if cell.flip_h {
        let (a, b) = (v[0].uv.x, v[1].uv.x);
        v[0].uv.x = v[2].uv.x;
        v[2].uv.x = a;
        v[1].uv.x = v[3].uv.x;
        v[3].uv.x = b;
    }
    if cell.flip_v {
        let (a, b) = (v[0].uv.y, v[1].uv.y);
        v[0].uv.y = v[2].uv.y;
        v[2].uv.y = a;
        v[1].uv.y = v[3].uv.y;
        v[3].uv.y = b;
    }

    let mut uvs = [v[0].uv, v[1].uv, v[2].uv, v[3].uv];
    match cell.rotation {
        Rotation::R0 => return,
        Rotation::R90 => uvs.rotate_left(1),
        Rotation::R180 => uvs.rotate_left(2),
        Rotation::R270 => uvs.rotate_right(1),
    }
    for (vertex, uv) in v.iter_mut().zip(uvs) {
        vertex.uv = uv;
    }
}

/// Quad for one cell whose bottom-left corner is `origin`.
pub fn cell_quad(region: &TextureRegion, cell: &Cell, origin: Vec2, unit_scale: f32, color: Color, half_texel: bool) -> Quad {
    let x2 = origin.x + region.width as f32 * unit_scale;
    let y2 = origin.y + region.height as f32 * unit_scale;
    let mut quad = region_quad(region, origin.x, origin.y, x2, y2, color, half_texel);
    transform_cell(&mut quad, cell);
    quad
}
