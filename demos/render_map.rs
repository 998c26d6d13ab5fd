use macroquad::prelude::*;
use tiled_maps::render::{BatchRenderer, CachedRenderer, MacroquadBatch, MapRenderer};
use tiled_maps::{LoaderParams, TiledMapLoader};
use tracing_subscriber::EnvFilter;

fn window_conf() -> Conf {
    Conf {
        window_title: "Render Map".into(),
        window_width: 1280,
        window_height: 720,
        ..Default::default()
    }
}

async fn run() -> anyhow::Result<()> {
    let params = LoaderParams::from_toml_file("assets/loader.toml")?;
    let filter = params.texture_filter;
    let map = TiledMapLoader::with_params(params).load("assets/desert.tmx")?;
    let mut batch = MacroquadBatch::load(&map, filter).await?;

    let mut cached = CachedRenderer::new(&map);
    cached.set_max_tile_size(16.0, 32.0);
    cached.set_blending(true);
    let mut immediate = BatchRenderer::new(&map);
    let mut use_cache = true;

    let mut center = vec2(map.pixel_width() as f32, map.pixel_height() as f32) / 2.0;
    let mut zoom = 0.1;

    loop {
        let dt = get_frame_time();
        let speed = 60.0 * dt;
        if is_key_down(KeyCode::Left) {
            center.x -= speed;
        }
        if is_key_down(KeyCode::Right) {
            center.x += speed;
        }
        if is_key_down(KeyCode::Down) {
            center.y -= speed;
        }
        if is_key_down(KeyCode::Up) {
            center.y += speed;
        }
        if is_key_pressed(KeyCode::Z) {
            zoom *= 0.8;
        }
        if is_key_pressed(KeyCode::X) {
            zoom *= 1.25;
        }
        if is_key_pressed(KeyCode::C) {
            use_cache = !use_cache;
        }

        clear_background(Color::from_rgba(32, 64, 96, 255));

        // positive y zoom keeps the map's +Y pointing up
        let viewport = vec2(screen_width(), screen_height());
        set_camera(&Camera2D {
            target: center,
            zoom: vec2(2.0 / (viewport.x * zoom), 2.0 / (viewport.y * zoom)),
            ..Default::default()
        });

        immediate.advance(dt);
        let renderer: &mut dyn MapRenderer = if use_cache { &mut cached } else { &mut immediate };
        renderer.set_view_camera(center, viewport, zoom);
        renderer.render(&mut batch);

        set_default_camera();
        let mode = if use_cache { "cached" } else { "batch" };
        draw_text(&format!("FPS: {}  renderer: {mode} (C)", get_fps()), 20.0, 30.0, 28.0, WHITE);

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
