use super::{image_layer_quads, tile_layer_quads, Batch, LayerContext, MapRenderer, Pass, Quad};
use crate::layer::{LayerKind, MapLayer};
use crate::map::TiledMap;
use macroquad::math::Rect;
use tracing::{debug, trace};

const TOLERANCE: f32 = 0.00001;

/// Display-list renderer: quads for an area around the view are built once
/// and replayed until the view moves past them.
///
/// Animated tiles show their first frame. Changes to the map, to nested layer
/// visibility or to tile regions need [`invalidate_cache`](Self::invalidate_cache).
#[derive(Debug, Clone)]
pub struct CachedRenderer<'m> {
    map: &'m TiledMap,
    unit_scale: f32,
    view_bounds: Rect,
    cache_bounds: Rect,
    over_cache: f32,
    max_tile_width: f32,
    max_tile_height: f32,
    blending: bool,
    cached: bool,
    /// north, east, west, south
    can_cache_more: [bool; 4],
    layers: Vec<Vec<Quad>>,
    count: usize,
}

impl<'m> CachedRenderer<'m> {
    pub fn new(map: &'m TiledMap) -> Self {
        Self::with_unit_scale(map, 1.0)
    }

    pub fn with_unit_scale(map: &'m TiledMap, unit_scale: f32) -> Self {
        let empty = Rect::new(0.0, 0.0, 0.0, 0.0);
        CachedRenderer {
            map,
            unit_scale,
            view_bounds: empty,
            cache_bounds: empty,
            over_cache: 0.5,
            max_tile_width: 0.0,
            max_tile_height: 0.0,
            blending: false,
            cached: false,
            can_cache_more: [false; 4],
            layers: Vec::new(),
            count: 0,
        }
    }

    pub fn view_bounds(&self) -> Rect {
        self.view_bounds
    }

    pub fn cache_bounds(&self) -> Rect {
        self.cache_bounds
    }

    /// Fraction of the view size cached beyond each edge; 0.5 by default.
    pub fn set_over_cache(&mut self, over_cache: f32) {
        self.over_cache = over_cache;
    }

    /// Largest tile in pixels. The view is grown by this much on every side
    /// so oversized tiles or offsets never pop in at the edges.
    pub fn set_max_tile_size(&mut self, width: f32, height: f32) {
        self.max_tile_width = width;
        self.max_tile_height = height;
    }

    pub fn set_blending(&mut self, blending: bool) {
        self.blending = blending;
    }

    /// Force a rebuild on the next render.
    pub fn invalidate_cache(&mut self) {
        self.cached = false;
    }

    pub fn is_cached(&self) -> bool {
        self.cached
    }

    /// Quads currently held across all layers.
    pub fn cached_quad_count(&self) -> usize {
        self.count
    }

    fn view_left_cache(&self) -> bool {
        let [n, e, w, s] = self.can_cache_more;
        let (v, c) = (self.view_bounds, self.cache_bounds);
        (w && v.x < c.x - TOLERANCE)
            || (s && v.y < c.y - TOLERANCE)
            || (e && v.x + v.w > c.x + c.w + TOLERANCE)
            || (n && v.y + v.h > c.y + c.h + TOLERANCE)
    }

    fn rebuild(&mut self) {
        let v = self.view_bounds;
        let extra_w = v.w * self.over_cache;
        let extra_h = v.h * self.over_cache;
        self.cache_bounds = Rect::new(v.x - extra_w, v.y - extra_h, v.w + extra_w * 2.0, v.h + extra_h * 2.0);
        self.can_cache_more = [false; 4];

        let pass = Pass {
            view: v,
            area: self.cache_bounds,
            unit_scale: self.unit_scale,
            time_ms: 0,
            half_texel: true,
        };
        let root = LayerContext::root();
        let map = self.map;
        let mut layers = Vec::with_capacity(map.layers.len());
        for layer in &map.layers {
            let mut quads = Vec::new();
            // top-level visibility is checked at draw time
            self.cache_layer(layer, &root, &pass, &mut quads);
            trace!(layer = %layer.name, quads = quads.len(), "cached layer");
            layers.push(quads);
        }
        self.count = layers.iter().map(Vec::len).sum();
        self.layers = layers;
        self.cached = true;
        debug!(
            x = self.cache_bounds.x,
            y = self.cache_bounds.y,
            w = self.cache_bounds.w,
            h = self.cache_bounds.h,
            quads = self.count,
            "rebuilt tile cache"
        );
    }

    fn cache_layer(&mut self, layer: &MapLayer, parent: &LayerContext, pass: &Pass, out: &mut Vec<Quad>) {
        let ctx = parent.child(layer);
        match &layer.kind {
            LayerKind::Tiles(tiles) => {
                let range = tile_layer_quads(self.map, tiles, layer, &ctx, pass, &mut |q| out.push(q));
                let more = range.more_beyond(tiles.width, tiles.height);
                for (flag, m) in self.can_cache_more.iter_mut().zip(more) {
                    *flag |= m;
                }
            }
            LayerKind::Image(image) => image_layer_quads(image, layer, parent, &ctx, pass, &mut |q| out.push(q)),
            LayerKind::Group(children) => {
                for child in children.iter().filter(|c| c.visible) {
                    self.cache_layer(child, &ctx, pass, out);
                }
            }
            LayerKind::Objects(_) => {}
        }
    }

    fn replay(&mut self, batch: &mut dyn Batch, indices: &mut dyn Iterator<Item = usize>) {
        if !self.cached {
            self.rebuild();
        }
        if self.blending {
            batch.set_blending(true);
        }
        batch.begin();
        for i in indices {
            let (Some(layer), Some(quads)) = (self.map.layers.get(i), self.layers.get(i)) else {
                continue;
            };
            if !layer.visible {
                continue;
            }
            for quad in quads {
                batch.draw(quad);
            }
        }
        batch.end();
        if self.blending {
            batch.set_blending(false);
        }
    }
}

impl MapRenderer for CachedRenderer<'_> {
    /// The view is grown by the max tile size; the cache is dropped when the
    /// grown view crosses an edge with more tiles beyond it.
    fn set_view(&mut self, bounds: Rect) {
        let pad_w = self.max_tile_width * self.unit_scale;
        let pad_h = self.max_tile_height * self.unit_scale;
        self.view_bounds = Rect::new(
            bounds.x - pad_w,
            bounds.y - pad_h,
            bounds.w + pad_w * 2.0,
            bounds.h + pad_h * 2.0,
        );
        if self.cached && self.view_left_cache() {
            self.cached = false;
        }
    }

    fn render(&mut self, batch: &mut dyn Batch) {
        let count = self.map.layers.len();
        self.replay(batch, &mut (0..count));
    }

    fn render_layers(&mut self, batch: &mut dyn Batch, layers: &[usize]) {
        self.replay(batch, &mut layers.iter().copied());
    }
}
