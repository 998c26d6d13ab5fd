// tests/load_maps.rs

use macroquad::math::{vec2, Rect};
use std::path::{Path, PathBuf};
use tiled_maps::{
    AtlasMapLoader, LayerKind, LoaderParams, MapError, ObjectShape, PropertyValue, Rotation, TiledMap,
    TiledMapLoader,
};

fn asset(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("assets").join(name)
}

fn desert() -> TiledMap {
    TiledMapLoader::new()
        .load(asset("desert.tmx"))
        .expect("desert.tmx should load")
}

fn layer<'m>(map: &'m TiledMap, name: &str) -> &'m tiled_maps::MapLayer {
    map.all_layers()
        .into_iter()
        .find(|l| l.name == name)
        .unwrap_or_else(|| panic!("no layer {name}"))
}

#[test]
fn tmx_map_attributes_and_properties() {
    let map = desert();
    assert_eq!((map.width, map.height, map.tile_width, map.tile_height), (4, 3, 16, 16));
    assert_eq!((map.pixel_width(), map.pixel_height()), (64, 48));

    let props = &map.properties;
    assert_eq!(props.get_string("orientation"), Some("orthogonal"));
    assert_eq!(props.get_i64("tilewidth"), Some(16));
    assert_eq!(props.get_string("backgroundcolor"), Some("#ff204060"));
    assert_eq!(props.get_string("author"), Some("dunes"));
    assert_eq!(props.get_f32("gravity"), Some(9.5));
    assert_eq!(props.get_bool("night"), Some(false));
    let tint = props.get_color("tint").expect("tint colour");
    assert_eq!((tint.r, tint.b), (1.0, 0.0));
}

#[test]
fn tilesets_are_sliced_and_annotated() {
    let map = desert();
    assert_eq!(map.tilesets.len(), 2);

    let terrain = map.tilesets.by_name("terrain").expect("terrain tileset");
    assert_eq!(terrain.len(), 8);
    assert_eq!(terrain.properties.get_i64("firstgid"), Some(1));
    assert_eq!(terrain.properties.get_string("imagesource"), Some("images/terrain.png"));

    let sixth = map.tile(6).expect("gid 6");
    assert_eq!((sixth.region.x, sixth.region.y), (16, 16));
    // offsets follow the flipped Y axis
    assert_eq!(sixth.offset, vec2(2.0, -4.0));

    let animated = map.tile(1).and_then(|t| t.animation.as_ref()).expect("animated tile");
    assert_eq!(animated.frames().len(), 2);
    assert_eq!(animated.loop_duration(), 400);

    let wall = map.tile(3).expect("gid 3");
    assert_eq!(wall.properties.get_string("type"), Some("wall"));
    assert_eq!(wall.properties.get_bool("solid"), Some(true));
    assert_eq!(wall.objects.len(), 1);
    assert_eq!(wall.objects[0].shape, ObjectShape::Rectangle(Rect::new(0.0, 8.0, 16.0, 8.0)));

    let corner = map.tile(4).expect("gid 4");
    assert_eq!(corner.properties.get_string("terrain"), Some("0,0,1,1"));
    assert_eq!(corner.properties.get_string("probability"), Some("0.5"));

    let tree = map.tile(9).expect("gid 9");
    assert_eq!((tree.region.width, tree.region.height), (16, 32));
    assert_eq!(map.image(tree.region.image).map(|i| i.path.clone()), Some(asset("images/tree.png")));
    assert_eq!(map.tile(10).and_then(|t| t.properties.get_bool("breakable")), Some(true));
}

#[test]
fn tile_layers_decode_every_encoding() {
    let map = desert();

    let ground = layer(&map, "ground").as_tiles().expect("tiles");
    // the first row of the file is the top row, stored last
    assert_eq!(ground.cell(0, 2).map(|c| c.gid), Some(1));
    assert_eq!(ground.cell(3, 1).map(|c| c.gid), Some(8));
    assert_eq!(ground.cell(2, 0).map(|c| c.gid), Some(9));
    assert_eq!(ground.cells().count(), 12);

    let detail = layer(&map, "detail").as_tiles().expect("tiles");
    assert_eq!(detail.cell(1, 1).map(|c| c.gid), Some(3));
    // gid 99 belongs to no tileset
    assert_eq!(detail.cells().count(), 1);

    let decor = layer(&map, "decor").as_tiles().expect("tiles");
    let h = decor.cell(0, 2).expect("flipped cell");
    assert!(h.flip_h && !h.flip_v && h.rotation == Rotation::R0);
    let v = decor.cell(1, 2).expect("flipped cell");
    assert!(v.flip_v && !v.flip_h);
    let d = decor.cell(2, 2).expect("transposed cell");
    assert!(d.flip_v && d.rotation == Rotation::R270);
    let dhv = decor.cell(3, 2).expect("transposed cell");
    assert!(dhv.flip_h && !dhv.flip_v && dhv.rotation == Rotation::R270);
}

#[test]
fn groups_nest_and_multiply_parallax() {
    let map = desert();
    let overlay = layer(&map, "overlay");
    assert_eq!(overlay.offset, vec2(8.0, 4.0));
    assert_eq!(overlay.opacity, 0.5);
    assert_eq!(overlay.children().len(), 1);
    assert_eq!(overlay.parallax, vec2(0.5, 1.0));
    assert_eq!(layer(&map, "decor").parallax, vec2(0.25, 1.0));
    assert_eq!(layer(&map, "decor").opacity, 0.8);

    let names: Vec<_> = map.all_layers().iter().map(|l| l.name.clone()).collect();
    assert_eq!(names, ["ground", "detail", "overlay", "decor", "spawns", "sky"]);
}

#[test]
fn objects_are_flipped_into_y_up_space() {
    let map = desert();
    let by_name = |name: &str| map.objects().find(|o| o.name == name).expect(name);

    let player = by_name("player");
    assert_eq!(player.shape, ObjectShape::Rectangle(Rect::new(8.0, 16.0, 16.0, 16.0)));
    assert_eq!(player.properties.get_string("type"), Some("spawn"));
    assert_eq!(player.properties.get_f32("y"), Some(16.0));
    assert_eq!(player.properties.get_i64("lives"), Some(3));
    let buddy = player.properties.get_object("buddy").expect("object reference");
    assert_eq!(map.object_by_id(buddy).map(|o| o.name.as_str()), Some("crate"));

    assert_eq!(by_name("lake").shape, ObjectShape::Ellipse(Rect::new(32.0, 24.0, 24.0, 16.0)));
    assert_eq!(by_name("marker").shape, ObjectShape::Point(vec2(60.0, 44.0)));

    let path = by_name("path");
    assert_eq!(
        path.shape,
        ObjectShape::Polygon {
            position: vec2(4.0, 8.0),
            vertices: vec![vec2(0.0, 0.0), vec2(16.0, 0.0), vec2(16.0, 8.0)],
        }
    );
    assert_eq!(path.properties.get_f32("rotation"), Some(15.0));

    let crate_obj = by_name("crate");
    let ObjectShape::Tile(tile) = &crate_obj.shape else {
        panic!("crate should be a tile object");
    };
    assert_eq!(tile.gid, 3);
    assert!(tile.flip_h && !tile.flip_v);
    assert_eq!(tile.position, vec2(48.0, 0.0));
    assert_eq!(tile.scale, vec2(2.0, 2.0));
    assert_eq!(crate_obj.tile_gid(), Some(3));
    assert_eq!(crate_obj.properties.get("gid"), Some(&PropertyValue::I64(0x8000_0003)));
}

#[test]
fn image_layer_sits_on_its_bottom_left_corner() {
    let map = desert();
    let LayerKind::Image(sky) = &layer(&map, "sky").kind else {
        panic!("sky should be an image layer");
    };
    assert_eq!((sky.x, sky.y), (4.0, -8.0));
    assert!(sky.repeat_x && !sky.repeat_y);
    let region = sky.region.expect("sky image");
    assert_eq!((region.width, region.height), (64, 48));
}

#[test]
fn tmx_and_tmj_build_the_same_map() {
    let tmx = desert();
    let tmj = TiledMapLoader::new().load(asset("desert.tmj")).expect("desert.tmj should load");

    assert_eq!(tmx.properties, tmj.properties);
    assert_eq!(tmx.images(), tmj.images());
    assert_eq!(tmx.tilesets, tmj.tilesets);
    assert_eq!(tmx.layers, tmj.layers);
}

#[test]
fn y_down_loading_keeps_tiled_coordinates() {
    let params = LoaderParams {
        flip_y: false,
        convert_object_to_tile_space: true,
        ..LoaderParams::default()
    };
    let map = TiledMapLoader::with_params(params).load(asset("desert.tmx")).expect("load");

    let ground = layer(&map, "ground").as_tiles().expect("tiles");
    assert_eq!(ground.cell(0, 0).map(|c| c.gid), Some(1));
    assert_eq!(map.tile(6).map(|t| t.offset), Some(vec2(2.0, 4.0)));

    let player = map.objects().find(|o| o.name == "player").expect("player");
    assert_eq!(player.shape, ObjectShape::Rectangle(Rect::new(0.5, 1.0, 1.0, 1.0)));
}

#[test]
fn y_down_image_layer_keeps_its_top_left_corner() {
    let params = LoaderParams {
        flip_y: false,
        ..LoaderParams::default()
    };
    let map = TiledMapLoader::with_params(params).load(asset("desert.tmx")).expect("load");
    let LayerKind::Image(sky) = &layer(&map, "sky").kind else {
        panic!("sky should be an image layer");
    };
    assert_eq!((sky.x, sky.y), (4.0, 8.0));
    assert!(sky.region.is_some_and(|r| !r.flip_y));
}

#[test]
fn y_down_atlas_regions_are_flipped() {
    let params = LoaderParams {
        flip_y: false,
        ..LoaderParams::default()
    };
    let map = AtlasMapLoader::with_params(params).load(asset("atlas_map.tmx")).expect("atlas map should load");

    let first = map.tile(1).expect("gid 1");
    assert!(first.region.flip_y && !first.region.flip_x);
    assert_eq!((first.region.x, first.region.y), (0, 0));

    let floor = layer(&map, "floor").as_tiles().expect("tiles");
    assert_eq!(floor.cell(0, 0).map(|c| c.gid), Some(1));
    assert_eq!(floor.cell(3, 1).map(|c| c.gid), Some(1));

    let up = AtlasMapLoader::new().load(asset("atlas_map.tmx")).expect("atlas map should load");
    assert!(up.tile(1).is_some_and(|t| !t.region.flip_y));
}

#[test]
fn dependencies_list_images_without_loading() {
    let deps = TiledMapLoader::new().dependencies(asset("desert.tmx")).expect("deps");
    assert_eq!(
        deps,
        [
            asset("images/terrain.png"),
            asset("images/tree.png"),
            asset("images/rock.png"),
            asset("images/sky.png"),
        ]
    );
}

#[test]
fn loader_params_come_from_toml() {
    let params = LoaderParams::from_toml_file(asset("loader.toml")).expect("params");
    assert_eq!(params, LoaderParams::default());
}

#[test]
fn atlas_map_takes_tiles_from_the_atlas() {
    let mut loader = AtlasMapLoader::new();
    assert_eq!(loader.dependencies(asset("atlas_map.tmx")).expect("deps"), [asset("tiles.atlas")]);

    let map = loader.load(asset("atlas_map.tmx")).expect("atlas map should load");
    assert_eq!(map.images().len(), 1);
    assert_eq!(map.images()[0].path, asset("images/tiles_atlas.png"));

    let ground = map.tilesets.by_name("ground").expect("tileset");
    assert_eq!(ground.len(), 4);
    assert_eq!(map.tile(3).map(|t| (t.region.x, t.region.y)), Some((32, 0)));
    let frames = map.tile(2).and_then(|t| t.animation.as_ref()).expect("animation");
    assert_eq!(frames.frames().iter().map(|f| f.gid).collect::<Vec<_>>(), [2, 3]);

    let floor = layer(&map, "floor").as_tiles().expect("tiles");
    assert_eq!(floor.cell(3, 1).map(|c| c.gid), Some(4));
    assert_eq!(floor.cell(3, 0).map(|c| c.gid), Some(1));
}

#[test]
fn load_errors_are_typed() {
    let err = TiledMapLoader::new().load(asset("desert.txt")).unwrap_err();
    assert!(matches!(err, MapError::UnsupportedFormat(_)));

    let err = TiledMapLoader::new().load(asset("missing.tmx")).unwrap_err();
    assert!(matches!(err, MapError::Io { .. }));

    let err = AtlasMapLoader::new().load(asset("desert.tmx")).unwrap_err();
    assert!(matches!(err, MapError::MissingAtlas));
}
