use macroquad::prelude::*;
use tiled_maps::render::{BatchRenderer, MacroquadBatch, MapRenderer};
use tiled_maps::{MapObject, ObjectShape, TiledMapLoader};
use tracing_subscriber::EnvFilter;

fn window_conf() -> Conf {
    Conf {
        window_title: "Objects Example".into(),
        window_width: 1280,
        window_height: 720,
        ..Default::default()
    }
}

fn draw_outline(points: &[Vec2], closed: bool, color: Color) {
    for pair in points.windows(2) {
        draw_line(pair[0].x, pair[0].y, pair[1].x, pair[1].y, 0.5, color);
    }
    if let (true, Some(first), Some(last)) = (closed, points.first(), points.last()) {
        draw_line(last.x, last.y, first.x, first.y, 0.5, color);
    }
}

fn draw_object(object: &MapObject) {
    match &object.shape {
        ObjectShape::Rectangle(r) => draw_rectangle_lines(r.x, r.y, r.w, r.h, 1.0, YELLOW),
        ObjectShape::Ellipse(r) => {
            draw_ellipse_lines(r.x + r.w / 2.0, r.y + r.h / 2.0, r.w / 2.0, r.h / 2.0, 0.0, 0.5, SKYBLUE)
        }
        ObjectShape::Point(p) => draw_circle(p.x, p.y, 1.5, RED),
        ObjectShape::Polygon { position, vertices } => {
            let points: Vec<Vec2> = vertices.iter().map(|v| *position + *v).collect();
            draw_outline(&points, true, GREEN);
        }
        ObjectShape::Polyline { position, vertices } => {
            let points: Vec<Vec2> = vertices.iter().map(|v| *position + *v).collect();
            draw_outline(&points, false, LIME);
        }
        ObjectShape::Tile(_) => {
            let b = object.bounds();
            draw_rectangle_lines(b.x, b.y, b.w, b.h, 1.0, ORANGE);
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let map = TiledMapLoader::new().load("assets/desert.tmj")?;
    let mut batch = MacroquadBatch::load(&map, Default::default()).await?;
    let mut renderer = BatchRenderer::new(&map);

    for layer in map.object_layers() {
        tracing::info!(layer = %layer.name, objects = layer.objects().len(), "object layer");
    }
    for object in map.objects() {
        tracing::info!(id = object.id, name = %object.name, bounds = ?object.bounds(), "object");
    }

    let size = vec2(map.pixel_width() as f32, map.pixel_height() as f32);
    let center = size / 2.0;

    loop {
        clear_background(BLACK);

        let viewport = vec2(screen_width(), screen_height());
        let zoom = (size.x / viewport.x).max(size.y / viewport.y) * 1.2;
        set_camera(&Camera2D {
            target: center,
            zoom: vec2(2.0 / (viewport.x * zoom), 2.0 / (viewport.y * zoom)),
            ..Default::default()
        });

        renderer.advance(get_frame_time());
        renderer.set_view_camera(center, viewport, zoom);
        renderer.render(&mut batch);
        map.objects().filter(|o| o.visible).for_each(draw_object);

        set_default_camera();
        draw_text("objects example", 20.0, 30.0, 32.0, WHITE);
        next_frame().await;
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(err) = run().await {
        tracing::error!("{err:#}");
    }
}
