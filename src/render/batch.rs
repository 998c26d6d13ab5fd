use super::{image_layer_quads, tile_layer_quads, Batch, LayerContext, MapRenderer, Pass};
use crate::layer::{LayerKind, MapLayer};
use crate::map::TiledMap;
use macroquad::math::Rect;

/// Immediate-mode renderer: rebuilds the visible quads on every call.
#[derive(Debug, Clone)]
pub struct BatchRenderer<'m> {
    map: &'m TiledMap,
    unit_scale: f32,
    view_bounds: Rect,
    elapsed: f64,
}

impl<'m> BatchRenderer<'m> {
    pub fn new(map: &'m TiledMap) -> Self {
        Self::with_unit_scale(map, 1.0)
    }

    /// `unit_scale` converts map pixels to world units, e.g. `1.0 / 16.0`.
    pub fn with_unit_scale(map: &'m TiledMap, unit_scale: f32) -> Self {
        BatchRenderer {
            map,
            unit_scale,
            view_bounds: Rect::new(0.0, 0.0, 0.0, 0.0),
            elapsed: 0.0,
        }
    }

    pub fn map(&self) -> &'m TiledMap {
        self.map
    }

    pub fn unit_scale(&self) -> f32 {
        self.unit_scale
    }

    pub fn view_bounds(&self) -> Rect {
        self.view_bounds
    }

    /// Advance the animation clock by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        self.elapsed += dt as f64;
    }

    pub fn set_animation_time(&mut self, time_ms: u64) {
        self.elapsed = time_ms as f64 / 1000.0;
    }

    pub fn animation_time_ms(&self) -> u64 {
        (self.elapsed * 1000.0) as u64
    }

    fn pass(&self) -> Pass {
        Pass {
            view: self.view_bounds,
            area: self.view_bounds,
            unit_scale: self.unit_scale,
            time_ms: self.animation_time_ms(),
            half_texel: false,
        }
    }

    fn render_layer(&self, layer: &MapLayer, parent: &LayerContext, pass: &Pass, batch: &mut dyn Batch) {
        if !layer.visible {
            return;
        }
        let ctx = parent.child(layer);
        match &layer.kind {
            LayerKind::Tiles(tiles) => {
                tile_layer_quads(self.map, tiles, layer, &ctx, pass, &mut |q| batch.draw(&q));
            }
            LayerKind::Image(image) => {
                image_layer_quads(image, layer, parent, &ctx, pass, &mut |q| batch.draw(&q))
            }
            LayerKind::Group(children) => {
                for child in children {
                    self.render_layer(child, &ctx, pass, batch);
                }
            }
            // objects carry no texture of their own
            LayerKind::Objects(_) => {}
        }
    }
}

impl MapRenderer for BatchRenderer<'_> {
    fn set_view(&mut self, bounds: Rect) {
        self.view_bounds = bounds;
    }

    fn render(&mut self, batch: &mut dyn Batch) {
        let pass = self.pass();
        let root = LayerContext::root();
        batch.begin();
        for layer in &self.map.layers {
            self.render_layer(layer, &root, &pass, batch);
        }
        batch.end();
    }

    fn render_layers(&mut self, batch: &mut dyn Batch, layers: &[usize]) {
        let pass = self.pass();
        let root = LayerContext::root();
        batch.begin();
        for layer in layers.iter().filter_map(|&i| self.map.layers.get(i)) {
            self.render_layer(layer, &root, &pass, batch);
        }
        batch.end();
    }
}
