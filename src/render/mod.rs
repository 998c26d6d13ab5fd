//! Orthogonal map rendering.
//!
//! Renderers turn visible cells and image layers into [`Quad`]s and hand them
//! to a [`Batch`]. [`BatchRenderer`] rebuilds quads every frame;
//! [`CachedRenderer`] keeps them for an area larger than the view and only
//! rebuilds when the view leaves it. Both assume a map loaded with `flip_y`.

mod batch;
mod cached;
pub mod cull;
mod macroquad_batch;
pub mod quad;

pub use batch::BatchRenderer;
pub use cached::CachedRenderer;
pub use macroquad_batch::MacroquadBatch;

use crate::layer::{ImageLayer, MapLayer, TileLayer};
use crate::map::TiledMap;
use crate::tileset::ImageId;
use cull::{visible_cells, CellRange};
use macroquad::color::{Color, WHITE};
use macroquad::math::{vec2, Rect, Vec2};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vec2,
    pub uv: Vec2,
    pub color: Color,
}

/// Four vertices textured from one map image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub image: ImageId,
    pub vertices: [Vertex; 4],
}

/// Sink for quads; implementations own the GPU side.
pub trait Batch {
    fn begin(&mut self) {}
    fn draw(&mut self, quad: &Quad);
    fn end(&mut self) {}
    fn set_blending(&mut self, _enabled: bool) {}
}

/// Shared surface of the two renderers.
pub trait MapRenderer {
    /// Area of the map to draw, in world units.
    fn set_view(&mut self, bounds: Rect);

    /// View of a camera centred on `center` showing `viewport * zoom` units.
    fn set_view_camera(&mut self, center: Vec2, viewport: Vec2, zoom: f32) {
        self.set_view(cull::camera_view_rect(center, viewport, zoom));
    }

    /// Draw every visible layer.
    fn render(&mut self, batch: &mut dyn Batch);

    /// Draw the visible top-level layers at these indices, in that order.
    fn render_layers(&mut self, batch: &mut dyn Batch, layers: &[usize]);
}

/// Offset, opacity and tint accumulated down the group hierarchy.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LayerContext {
    pub offset: Vec2,
    pub opacity: f32,
    pub tint: Color,
}

impl LayerContext {
    pub fn root() -> Self {
        LayerContext {
            offset: Vec2::ZERO,
            opacity: 1.0,
            tint: WHITE,
        }
    }

    pub fn child(&self, layer: &MapLayer) -> Self {
        LayerContext {
            offset: self.offset + layer.offset,
            opacity: self.opacity * layer.opacity,
            tint: Color::new(
                self.tint.r * layer.tint.r,
                self.tint.g * layer.tint.g,
                self.tint.b * layer.tint.b,
                self.tint.a * layer.tint.a,
            ),
        }
    }

    pub fn color(&self) -> Color {
        Color::new(self.tint.r, self.tint.g, self.tint.b, self.tint.a * self.opacity)
    }

    /// Screen-space origin of a layer: Tiled offsets are Y-down, parallax
    /// shifts the layer against the view.
    pub fn origin(&self, parallax: Vec2, view: Rect, unit_scale: f32) -> Vec2 {
        vec2(
            self.offset.x * unit_scale - view.x * (parallax.x - 1.0),
            -self.offset.y * unit_scale - view.y * (parallax.y - 1.0),
        )
    }
}

/// Settings shared by one pass over the map.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Pass {
    pub view: Rect,
    /// Area to fill; the view itself, or the cache bounds
    pub area: Rect,
    pub unit_scale: f32,
    pub time_ms: u64,
    pub half_texel: bool,
}

/// Emit the quads of a tile layer's visible cells; returns the range used.
pub(crate) fn tile_layer_quads(
    map: &TiledMap,
    tiles: &TileLayer,
    layer: &MapLayer,
    ctx: &LayerContext,
    pass: &Pass,
    emit: &mut dyn FnMut(Quad),
) -> CellRange {
    let color = ctx.color();
    let origin = ctx.origin(layer.parallax, pass.view, pass.unit_scale);
    let tile = vec2(tiles.tile_width, tiles.tile_height) * pass.unit_scale;
    let range = visible_cells(tiles.width, tiles.height, tile, origin, pass.area);

    for row in range.rows() {
        for col in range.cols() {
            let Some(cell) = tiles.cell(col, row) else { continue };
            let Some(map_tile) = map.tile(cell.gid) else { continue };
            let region = map_tile.region_at(pass.time_ms);
            let at = vec2(
                col as f32 * tile.x + origin.x + map_tile.offset.x * pass.unit_scale,
                row as f32 * tile.y + origin.y + map_tile.offset.y * pass.unit_scale,
            );
            emit(quad::cell_quad(region, cell, at, pass.unit_scale, color, pass.half_texel));
        }
    }
    range
}

/// Emit an image layer: one quad, or copies tiled across the pass area.
pub(crate) fn image_layer_quads(
    image: &ImageLayer,
    layer: &MapLayer,
    parent: &LayerContext,
    ctx: &LayerContext,
    pass: &Pass,
    emit: &mut dyn FnMut(Quad),
) {
    let Some(region) = &image.region else { return };
    let color = ctx.color();
    let u = pass.unit_scale;
    let parent_origin = vec2(parent.offset.x * u, -parent.offset.y * u);

    let w = region.width as f32 * u;
    let h = region.height as f32 * u;
    if w <= 0.0 || h <= 0.0 {
        return;
    }
    let x1 = image.x * u - pass.view.x * (layer.parallax.x - 1.0) + parent_origin.x;
    let y1 = image.y * u - pass.view.y * (layer.parallax.y - 1.0) + parent_origin.y;

    if !image.repeat_x && !image.repeat_y {
        emit(quad::region_quad(region, x1, y1, x1 + w, y1 + h, color, pass.half_texel));
        return;
    }

    let area = pass.area;
    let repeat_x = if image.repeat_x { (area.w / w + 4.0).ceil() as i32 } else { 0 };
    let repeat_y = if image.repeat_y { (area.h / h + 4.0).ceil() as i32 } else { 0 };
    let start_x = area.x - area.x % w;
    let start_y = area.y - area.y % h;

    for i in 0..=repeat_x {
        for j in 0..=repeat_y {
            let rx = if image.repeat_x { start_x + (i - 2) as f32 * w + x1 % w } else { x1 };
            let ry = if image.repeat_y { start_y + (j - 2) as f32 * h + y1 % h } else { y1 };
            emit(quad::region_quad(region, rx, ry, rx + w, ry + h, color, pass.half_texel));
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::tileset::{ImageSource, TextureRegion};

    fn pass(view: Rect) -> Pass {
        Pass {
            view,
            area: view,
            unit_scale: 1.0,
            time_ms: 0,
            half_texel: false,
        }
    }

    #[test]
    fn context_accumulates_down_groups() {
        let mut group = MapLayer::new("g", crate::layer::LayerKind::Group(vec![]));
        group.offset = vec2(4.0, 2.0);
        group.opacity = 0.5;
        group.tint = Color::new(1.0, 0.5, 1.0, 1.0);
        let mut child = group.clone();
        child.opacity = 0.5;

        let ctx = LayerContext::root().child(&group).child(&child);
        assert_eq!(ctx.offset, vec2(8.0, 4.0));
        assert_eq!(ctx.color().a, 0.25);
        assert_eq!(ctx.color().g, 0.25);
        assert_eq!(ctx.origin(vec2(0.5, 1.0), Rect::new(100.0, 0.0, 10.0, 10.0), 1.0), vec2(58.0, -4.0));
    }

    #[test]
    fn repeated_image_fills_the_area() {
        let source = ImageSource {
            path: "sky.png".into(),
            width: 10,
            height: 10,
        };
        let image = ImageLayer {
            region: Some(TextureRegion::whole(ImageId(0), &source)),
            x: 0.0,
            y: 0.0,
            repeat_x: true,
            repeat_y: false,
        };
        let layer = MapLayer::new("sky", crate::layer::LayerKind::Image(image.clone()));
        let ctx = LayerContext::root();

        let mut quads = Vec::new();
        image_layer_quads(&image, &layer, &ctx, &ctx, &pass(Rect::new(0.0, 0.0, 30.0, 10.0)), &mut |q| quads.push(q));
        assert_eq!(quads.len(), 8);
        assert_eq!(quads[0].vertices[0].position, vec2(-20.0, 0.0));
        assert_eq!(quads[7].vertices[0].position, vec2(50.0, 0.0));
    }
}
