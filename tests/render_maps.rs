// tests/render_maps.rs

use macroquad::math::{vec2, Rect};
use std::path::Path;
use tiled_maps::render::{Batch, BatchRenderer, CachedRenderer, MapRenderer, Quad};
use tiled_maps::{TiledMap, TiledMapLoader};

/// Collects quads between `begin` and `end`.
#[derive(Default)]
struct Collect {
    quads: Vec<Quad>,
    open: bool,
    blending: Vec<bool>,
}

impl Batch for Collect {
    fn begin(&mut self) {
        assert!(!self.open, "begin called twice");
        self.open = true;
    }

    fn draw(&mut self, quad: &Quad) {
        assert!(self.open, "draw outside begin/end");
        self.quads.push(*quad);
    }

    fn end(&mut self) {
        self.open = false;
    }

    fn set_blending(&mut self, enabled: bool) {
        self.blending.push(enabled);
    }
}

fn desert() -> TiledMap {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/desert.tmx");
    TiledMapLoader::new().load(path).expect("desert.tmx should load")
}

#[test]
fn batch_renderer_draws_every_layer_in_order() {
    let map = desert();
    let mut renderer = BatchRenderer::new(&map);
    renderer.set_view(Rect::new(0.0, 0.0, 64.0, 48.0));

    let mut batch = Collect::default();
    renderer.render(&mut batch);
    assert!(!batch.open);
    assert!(batch.blending.is_empty());

    // ground fills the map and comes first
    let ground: Vec<_> = batch.quads.iter().take(12).collect();
    assert!(ground.iter().all(|q| q.image.0 <= 2));
    assert_eq!(ground.len(), 12);
    // the sky repeats across the view and is drawn last
    let sky = map.images().len() - 1;
    assert_eq!(batch.quads.last().map(|q| q.image.0), Some(sky));
    assert!(batch.quads.iter().filter(|q| q.image.0 == sky).count() > 1);
    // every quad samples an uploaded image
    assert!(batch.quads.iter().all(|q| q.image.0 < map.images().len()));
}

#[test]
fn tile_offsets_shift_quads() {
    let map = desert();
    let mut renderer = BatchRenderer::new(&map);
    renderer.set_view(Rect::new(0.0, 0.0, 16.0, 16.0));

    let mut batch = Collect::default();
    renderer.render_layers(&mut batch, &[0]);
    // terrain tiles carry a (2, 4) draw offset, Y flipped
    let positions: Vec<_> = batch.quads.iter().map(|q| q.vertices[0].position).collect();
    assert!(positions.contains(&vec2(2.0, -4.0)), "{positions:?}");
}

#[test]
fn cached_renderer_replays_until_the_view_moves_away() {
    let map = desert();
    let mut renderer = CachedRenderer::new(&map);
    renderer.set_blending(true);
    renderer.set_view_camera(vec2(32.0, 24.0), vec2(64.0, 48.0), 1.0);

    let mut first = Collect::default();
    renderer.render(&mut first);
    assert!(renderer.is_cached());
    assert_eq!(first.blending, [true, false]);

    let mut second = Collect::default();
    renderer.render(&mut second);
    assert_eq!(first.quads, second.quads);

    // the cache already holds the whole map; panning never rebuilds it
    renderer.set_view(Rect::new(500.0, 500.0, 64.0, 48.0));
    assert!(renderer.is_cached());
}

#[test]
fn cached_and_batch_renderers_agree_on_geometry() {
    let map = desert();
    let view = Rect::new(0.0, 0.0, 64.0, 48.0);

    let mut immediate = BatchRenderer::new(&map);
    immediate.set_view(view);
    let mut a = Collect::default();
    immediate.render_layers(&mut a, &[0, 1]);

    let mut cached = CachedRenderer::new(&map);
    cached.set_over_cache(0.0);
    cached.set_view(view);
    let mut b = Collect::default();
    cached.render_layers(&mut b, &[0, 1]);

    let corners = |c: &Collect| -> Vec<_> { c.quads.iter().map(|q| q.vertices.map(|v| v.position)).collect() };
    assert_eq!(corners(&a), corners(&b));
}
