// src/loader/json_loader.rs
use super::source::resolve_relative;
use crate::decode::{decode_gid_array, decode_tile_data};
use crate::error::MapError;
use crate::ir_map::*;
use crate::properties::{parse_color, Properties, PropertyValue};
use macroquad::math::{ivec2, vec2};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::path::Path;

#[derive(Deserialize)]
struct JsonLayer {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default = "default_true")]
    visible: bool,
    #[serde(default = "one")]
    opacity: f32,
    #[serde(default)]
    offsetx: f32,
    #[serde(default)]
    offsety: f32,
    #[serde(default = "one")]
    parallaxx: f32,
    #[serde(default = "one")]
    parallaxy: f32,
    #[serde(default)]
    tintcolor: Option<String>,
    #[serde(default)]
    properties: Vec<JsonProperty>,
    // tilelayer
    #[serde(default)]
    width: usize,
    #[serde(default)]
    height: usize,
    #[serde(default)]
    data: Option<JsonTileData>,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    compression: Option<String>,
    #[serde(default)]
    chunks: Option<JsonValue>,
    // objectgroup
    #[serde(default)]
    objects: Vec<JsonObject>,
    // imagelayer
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    imagewidth: u32,
    #[serde(default)]
    imageheight: u32,
    #[serde(default)]
    repeatx: Option<JsonValue>,
    #[serde(default)]
    repeaty: Option<JsonValue>,
    // group
    #[serde(default)]
    layers: Vec<JsonLayer>,
}

/// Tile data is a plain array, or a string when `encoding` is base64.
#[derive(Deserialize)]
#[serde(untagged)]
enum JsonTileData {
    Gids(Vec<u32>),
    Encoded(String),
}

fn default_true() -> bool {
    true
}
fn one() -> f32 {
    1.0
}
fn first() -> u32 {
    1
}

#[derive(Deserialize)]
struct JsonTilesetRef {
    #[serde(default = "first")]
    firstgid: u32,
    #[serde(default)]
    source: Option<String>,
    #[serde(flatten)]
    inline: JsonTileset,
}

#[derive(Deserialize)]
struct JsonMap {
    #[serde(default)]
    orientation: Option<String>,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
    tilewidth: u32,
    tileheight: u32,
    #[serde(default)]
    hexsidelength: u32,
    #[serde(default)]
    staggeraxis: Option<String>,
    #[serde(default)]
    staggerindex: Option<String>,
    #[serde(default)]
    backgroundcolor: Option<String>,
    #[serde(default)]
    infinite: bool,
    #[serde(default)]
    layers: Vec<JsonLayer>,
    #[serde(default)]
    tilesets: Vec<JsonTilesetRef>,
    #[serde(default)]
    properties: Vec<JsonProperty>,
}

#[derive(Deserialize, Default)]
struct JsonTileset {
    #[serde(default)]
    name: String,
    #[serde(default)]
    tilewidth: u32,
    #[serde(default)]
    tileheight: u32,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    imagewidth: u32,
    #[serde(default)]
    imageheight: u32,
    #[serde(default)]
    spacing: u32,
    #[serde(default)]
    margin: u32,
    #[serde(default)]
    tileoffset: Option<JsonOffset>,
    #[serde(default)]
    properties: Vec<JsonProperty>,
    #[serde(default)]
    tiles: Vec<JsonTile>,
}

#[derive(Deserialize)]
struct JsonOffset {
    #[serde(default)]
    x: i32,
    #[serde(default)]
    y: i32,
}

#[derive(Deserialize)]
struct JsonProperty {
    name: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    propertytype: Option<String>,
    value: JsonValue,
}

#[derive(Deserialize)]
struct JsonObject {
    #[serde(default)]
    id: u32,
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    class: String,
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    #[serde(default)]
    width: Option<f32>,
    #[serde(default)]
    height: Option<f32>,
    #[serde(default)]
    rotation: Option<f32>,
    #[serde(default = "default_true")]
    visible: bool,
    #[serde(default)]
    point: bool,
    #[serde(default)]
    ellipse: bool,
    #[serde(default)]
    polygon: Vec<JsonObjectPoint>,
    #[serde(default)]
    polyline: Vec<JsonObjectPoint>,
    #[serde(default)]
    gid: Option<u32>,
    #[serde(default)]
    properties: Vec<JsonProperty>,
}

#[derive(Deserialize)]
struct JsonObjectPoint {
    x: f32,
    y: f32,
}

#[derive(Deserialize, Default)]
struct JsonObjectGroup {
    #[serde(default)]
    objects: Vec<JsonObject>,
}

#[derive(Deserialize)]
struct JsonTile {
    id: u32,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    class: Option<String>,
    #[serde(default)]
    terrain: Option<Vec<i64>>,
    #[serde(default)]
    probability: Option<f64>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    imagewidth: u32,
    #[serde(default)]
    imageheight: u32,
    #[serde(default)]
    properties: Vec<JsonProperty>,
    #[serde(default)]
    objectgroup: JsonObjectGroup,
    #[serde(default)]
    animation: Vec<JsonFrame>,
}

#[derive(Deserialize)]
struct JsonFrame {
    tileid: u32,
    duration: u32,
}

fn json_property_to_ir(prop: JsonProperty) -> Result<(String, PropertyValue), MapError> {
    let JsonProperty {
        name,
        kind,
        propertytype,
        value,
    } = prop;

    let invalid = |kind: &str, value: &JsonValue| MapError::InvalidPropertyValue {
        name: name.clone(),
        kind: kind.to_owned(),
        value: value.to_string(),
    };

    let parsed = match kind.as_deref() {
        Some("bool") => value.as_bool().map(PropertyValue::Bool),
        Some("int") => value.as_i64().map(PropertyValue::I64),
        Some("object") => value
            .as_u64()
            .and_then(|id| u32::try_from(id).ok())
            .map(PropertyValue::Object),
        Some("float") => value.as_f64().map(|n| PropertyValue::F32(n as f32)),
        Some("string") | Some("file") => value.as_str().map(|s| PropertyValue::String(s.to_owned())),
        Some("color") => value.as_str().and_then(parse_color).map(PropertyValue::Color),
        Some("class") => Some(PropertyValue::Class {
            class_name: propertytype.unwrap_or_default(),
            properties: class_members(&value),
        }),
        Some(other) => {
            return Err(MapError::UnsupportedPropertyType {
                name,
                kind: other.to_owned(),
            });
        }
        None => Some(infer_value(&value)),
    };

    match parsed {
        Some(value) => Ok((name, value)),
        None => Err(invalid(kind.as_deref().unwrap_or_default(), &value)),
    }
}

fn infer_value(value: &JsonValue) -> PropertyValue {
    if let Some(v) = value.as_bool() {
        PropertyValue::Bool(v)
    } else if let Some(v) = value.as_i64() {
        PropertyValue::I64(v)
    } else if let Some(v) = value.as_f64() {
        PropertyValue::F32(v as f32)
    } else if value.is_object() {
        PropertyValue::Class {
            class_name: String::new(),
            properties: class_members(value),
        }
    } else {
        PropertyValue::String(value.as_str().map(str::to_owned).unwrap_or_else(|| value.to_string()))
    }
}

/// Class values only carry members that differ from the class defaults.
fn class_members(value: &JsonValue) -> Properties {
    let mut out = Properties::new();
    if let Some(members) = value.as_object() {
        for (name, member) in members {
            out.insert(name.as_str(), infer_value(member));
        }
    }
    out
}

fn properties_from_json(props: Vec<JsonProperty>) -> Result<Properties, MapError> {
    let mut out = Properties::new();
    for p in props {
        let (name, value) = json_property_to_ir(p)?;
        out.insert(name, value);
    }
    Ok(out)
}

fn object_to_ir(obj: JsonObject) -> Result<IrObject, MapError> {
    let shape = if !obj.polygon.is_empty() {
        IrObjectShape::Polygon(obj.polygon.into_iter().map(|p| vec2(p.x, p.y)).collect())
    } else if !obj.polyline.is_empty() {
        IrObjectShape::Polyline(obj.polyline.into_iter().map(|p| vec2(p.x, p.y)).collect())
    } else if obj.ellipse {
        IrObjectShape::Ellipse
    } else if obj.point {
        IrObjectShape::Point
    } else if let Some(gid) = obj.gid {
        IrObjectShape::Tile { gid }
    } else {
        IrObjectShape::Rectangle
    };

    let class_name = if !obj.class.is_empty() {
        Some(obj.class)
    } else if !obj.kind.is_empty() {
        Some(obj.kind)
    } else {
        None
    };

    Ok(IrObject {
        id: obj.id,
        name: obj.name,
        class_name,
        x: obj.x,
        y: obj.y,
        width: obj.width,
        height: obj.height,
        rotation: obj.rotation,
        visible: obj.visible,
        shape,
        properties: properties_from_json(obj.properties)?,
    })
}

fn image_to_ir(source: Option<String>, base: &Path, width: u32, height: u32) -> Option<IrImage> {
    source.filter(|s| !s.is_empty()).map(|source| IrImage {
        path: resolve_relative(base, &source),
        source,
        width,
        height,
    })
}

fn tileset_to_ir(ts: JsonTilesetRef, map_path: &Path) -> Result<IrTileset, MapError> {
    let (tileset, base, source) = match ts.source {
        Some(src) => {
            let ts_path = resolve_relative(map_path, &src);
            let ext_txt = std::fs::read_to_string(&ts_path).map_err(|source| MapError::io(&ts_path, source))?;
            let ext: JsonTileset = serde_json::from_str(&ext_txt).map_err(|source| MapError::Json {
                path: ts_path.clone(),
                source,
            })?;
            (ext, ts_path.clone(), Some(ts_path))
        }
        None => (ts.inline, map_path.to_path_buf(), None),
    };

    let tiles = tileset
        .tiles
        .into_iter()
        .map(|tile| -> Result<IrTileMetadata, MapError> {
            Ok(IrTileMetadata {
                id: tile.id,
                class_name: tile.class.or(tile.kind),
                terrain: tile
                    .terrain
                    .map(|t| t.iter().map(i64::to_string).collect::<Vec<_>>().join(",")),
                probability: tile.probability.map(|p| p.to_string()),
                image: image_to_ir(tile.image, &base, tile.imagewidth, tile.imageheight),
                properties: properties_from_json(tile.properties)?,
                objects: tile
                    .objectgroup
                    .objects
                    .into_iter()
                    .map(object_to_ir)
                    .collect::<Result<Vec<_>, _>>()?,
                animation: tile.animation.iter().map(|f| (f.tileid, f.duration)).collect(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(IrTileset {
        first_gid: ts.firstgid,
        name: tileset.name,
        source,
        tile_w: tileset.tilewidth,
        tile_h: tileset.tileheight,
        spacing: tileset.spacing,
        margin: tileset.margin,
        tile_offset: tileset.tileoffset.map_or(ivec2(0, 0), |o| ivec2(o.x, o.y)),
        image: image_to_ir(tileset.image, &base, tileset.imagewidth, tileset.imageheight),
        properties: properties_from_json(tileset.properties)?,
        tiles,
    })
}

/// `repeatx` is a bool in current Tiled, `0`/`1` in older files.
fn json_flag(value: Option<&JsonValue>) -> bool {
    match value {
        Some(JsonValue::Bool(b)) => *b,
        Some(v) => v.as_i64() == Some(1),
        None => false,
    }
}

fn layer_to_ir(l: JsonLayer, map_path: &Path) -> Result<Option<IrLayer>, MapError> {
    let kind = match l.kind.as_str() {
        "tilelayer" => {
            if l.chunks.is_some() {
                return Err(MapError::InvalidMap(format!(
                    "layer '{}' is infinite; only fixed-size maps are supported",
                    l.name
                )));
            }
            let data = match l.data {
                Some(JsonTileData::Gids(gids)) => decode_gid_array(gids, l.width, l.height),
                Some(JsonTileData::Encoded(text)) => decode_tile_data(
                    l.encoding.as_deref().unwrap_or("base64"),
                    l.compression.as_deref().filter(|c| !c.is_empty()),
                    &text,
                    l.width,
                    l.height,
                ),
                None => decode_gid_array(Vec::new(), l.width, l.height),
            }
            .map_err(|e| MapError::tile_data(&l.name, e))?;
            IrLayerKind::Tiles {
                width: l.width,
                height: l.height,
                data,
            }
        }
        "objectgroup" => IrLayerKind::Objects {
            objects: l
                .objects
                .into_iter()
                .map(object_to_ir)
                .collect::<Result<Vec<_>, _>>()?,
        },
        "imagelayer" => IrLayerKind::Image {
            image: image_to_ir(l.image, map_path, l.imagewidth, l.imageheight),
            x: l.offsetx,
            y: l.offsety,
            repeat_x: json_flag(l.repeatx.as_ref()),
            repeat_y: json_flag(l.repeaty.as_ref()),
        },
        "group" => IrLayerKind::Group {
            layers: layers_to_ir(l.layers, map_path)?,
        },
        _ => return Ok(None),
    };

    Ok(Some(IrLayer {
        name: l.name,
        visible: l.visible,
        opacity: l.opacity,
        offset: vec2(l.offsetx, l.offsety),
        parallax: vec2(l.parallaxx, l.parallaxy),
        tint: l.tintcolor,
        properties: properties_from_json(l.properties)?,
        kind,
    }))
}

fn layers_to_ir(layers: Vec<JsonLayer>, map_path: &Path) -> Result<Vec<IrLayer>, MapError> {
    let mut out = Vec::with_capacity(layers.len());
    for l in layers {
        if let Some(layer) = layer_to_ir(l, map_path)? {
            out.push(layer);
        }
    }
    Ok(out)
}

/// Parse TMJ text; `path` anchors relative tileset and image references.
pub fn decode_tmj_str_to_ir(text: &str, path: &Path) -> Result<IrMap, MapError> {
    let j: JsonMap = serde_json::from_str(text).map_err(|source| MapError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    if j.infinite {
        return Err(MapError::InvalidMap(format!(
            "{} is an infinite map; only fixed-size maps are supported",
            path.display()
        )));
    }

    let tilesets = j
        .tilesets
        .into_iter()
        .map(|ts| tileset_to_ir(ts, path))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(IrMap {
        orientation: j.orientation,
        width: j.width,
        height: j.height,
        tile_w: j.tilewidth,
        tile_h: j.tileheight,
        hex_side_length: j.hexsidelength,
        stagger_axis: j.staggeraxis,
        stagger_index: j.staggerindex,
        background_color: j.backgroundcolor,
        properties: properties_from_json(j.properties)?,
        tilesets,
        layers: layers_to_ir(j.layers, path)?,
    })
}

pub fn decode_tmj_file_to_ir(path: &Path) -> Result<IrMap, MapError> {
    let txt = std::fs::read_to_string(path).map_err(|source| MapError::io(path, source))?;
    decode_tmj_str_to_ir(&txt, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, text).expect("failed to write fixture");
        path
    }

    #[test]
    fn typed_properties_reach_every_ir_node() {
        let dir = tempfile::tempdir().expect("tempdir");

        let map_json = r##"{
          "tilewidth": 32, "tileheight": 32,
          "properties": [
            {"name":"sandstorm","type":"bool","value":false},
            {"name":"wind","type":"float","value":2.25},
            {"name":"region","type":"string","value":"dunes"},
            {"name":"haze","type":"color","value":"#40c0a060"},
            {"name":"oasis","type":"object","value":31},
            {"name":"gate","type":"class","propertytype":"Gate","value":{"sealed":false,"rune":"sun"}}
          ],
          "layers": [
            {"type":"tilelayer", "name":"sand", "width":1, "height":2, "data":[0,2],
             "properties":[{"name":"speed","type":"int","value":-2},{"name":"slippery","type":"bool","value":true}]},
            {"type":"objectgroup", "name":"camels",
             "properties":[{"name":"herd","type":"int","value":4}],
             "objects":[{"id":31, "name":"lead", "type":"camel",
                         "properties":[{"name":"pack","type":"string","value":"water"}]}]}
          ],
          "tilesets":[{"firstgid":1,"source":"sand.tsj"}]
        }"##;

        let tileset_json = r#"{
          "name":"sand", "tilewidth":32, "tileheight":32,
          "image":"sand.png", "imagewidth":64, "imageheight":32,
          "properties":[{"name":"palette","type":"string","value":"warm"}],
          "tiles":[{
            "id":1, "type":"dune", "terrain":[1,1,0,0],
            "properties":[{"name":"height","type":"int","value":7}],
            "objectgroup":{"objects":[{"id":2,"name":"slope","properties":[{"name":"walkable","type":"bool","value":true}]}]}
          }]
        }"#;

        let map_path = write(dir.path(), "dunes.tmj", map_json);
        write(dir.path(), "sand.tsj", tileset_json);

        let ir = decode_tmj_file_to_ir(&map_path).expect("decode");

        assert_eq!(ir.properties.get_bool("sandstorm"), Some(false));
        assert_eq!(ir.properties.get_f32("wind"), Some(2.25));
        assert_eq!(ir.properties.get_string("region"), Some("dunes"));
        assert_eq!(ir.properties.get_object("oasis"), Some(31));
        assert!(ir.properties.get_color("haze").is_some());
        let (class, gate) = ir.properties.get_class("gate").expect("class property");
        assert_eq!(class, "Gate");
        assert_eq!(gate.get_bool("sealed"), Some(false));
        assert_eq!(gate.get_string("rune"), Some("sun"));

        let sand = &ir.layers[0].properties;
        assert_eq!((sand.get_i32("speed"), sand.get_bool("slippery")), (Some(-2), Some(true)));

        let IrLayerKind::Objects { objects } = &ir.layers[1].kind else {
            panic!("camels should be an object layer");
        };
        assert_eq!(ir.layers[1].properties.get_i64("herd"), Some(4));
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].class_name.as_deref(), Some("camel"));
        assert_eq!(objects[0].properties.get_string("pack"), Some("water"));

        let ts = &ir.tilesets[0];
        assert_eq!(ts.name, "sand");
        assert_eq!(ts.properties.get_string("palette"), Some("warm"));
        assert_eq!(ts.image.as_ref().map(|i| i.path.clone()), Some(dir.path().join("sand.png")));
        let dune = &ts.tiles[0];
        assert_eq!(dune.class_name.as_deref(), Some("dune"));
        assert_eq!(dune.terrain.as_deref(), Some("1,1,0,0"));
        assert_eq!(dune.properties.get_i32("height"), Some(7));
        assert_eq!(dune.objects[0].properties.get_bool("walkable"), Some(true));
    }

    #[test]
    fn int_properties_keep_64_bit_values() {
        let map_json = r#"{"tilewidth": 8, "tileheight": 8,
          "properties": [{"name":"seed","type":"int","value":8589934592}]}"#;

        let ir = decode_tmj_str_to_ir(map_json, Path::new("seeded.tmj")).expect("decode");
        assert_eq!(ir.properties.get_i64("seed"), Some(8_589_934_592));
        assert_eq!(ir.properties.get_i32("seed"), None);
    }

    #[test]
    fn inline_tileset_and_encoded_layer() {
        let map_json = r#"{
          "tilewidth": 8, "tileheight": 8, "width": 2, "height": 2,
          "tilesets": [{"firstgid": 5, "name": "inline", "tilewidth": 8, "tileheight": 8,
                        "image": "../shared/t.png", "tileoffset": {"x": 2, "y": 3}}],
          "layers": [
            {"type": "tilelayer", "name": "packed", "width": 2, "height": 2,
             "encoding": "base64", "compression": "zlib", "data": "eJxjZGBgYAJiZgaGBhYgDQAC4ACL"},
            {"type": "imagelayer", "name": "sky", "image": "sky.png", "offsetx": 4, "repeatx": 1, "repeaty": true},
            {"type": "group", "name": "g", "layers": [{"type": "objectgroup", "name": "inner"}]},
            {"type": "unknown", "name": "skipped"}
          ]
        }"#;

        let ir = decode_tmj_str_to_ir(map_json, Path::new("maps/level.tmj")).expect("decode");
        let ts = &ir.tilesets[0];
        assert_eq!(ts.first_gid, 5);
        assert_eq!(ts.tile_offset, ivec2(2, 3));
        assert_eq!(ts.image.as_ref().map(|i| i.path.clone()), Some(PathBuf::from("shared/t.png")));

        assert_eq!(ir.layers.len(), 3);
        match &ir.layers[0].kind {
            IrLayerKind::Tiles { data, .. } => assert_eq!(data, &[1, 2, 0x8000_0003, 4]),
            _ => panic!("expected tile layer"),
        }
        match &ir.layers[1].kind {
            IrLayerKind::Image { x, repeat_x, repeat_y, .. } => {
                assert_eq!(*x, 4.0);
                assert!(*repeat_x && *repeat_y);
            }
            _ => panic!("expected image layer"),
        }
        assert!(matches!(&ir.layers[2].kind, IrLayerKind::Group { layers } if layers.len() == 1));
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        let err = decode_tmj_str_to_ir("{ not json", Path::new("map.tmj")).expect_err("expected decode error");
        assert!(matches!(err, MapError::Json { .. }));
    }

    #[test]
    fn missing_external_tileset_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let map_json = r#"{"tilewidth": 8, "tileheight": 8, "tilesets":[{"firstgid":1,"source":"gone.tsj"}]}"#;
        let map_path = write(dir.path(), "orphan.tmj", map_json);

        let err = decode_tmj_file_to_ir(&map_path).expect_err("tileset is missing");
        assert!(matches!(err, MapError::Io { ref path, .. } if path.ends_with("gone.tsj")));
    }

    #[test]
    fn short_tile_data_names_the_layer() {
        let map_json = r#"{
          "tilewidth": 16, "tileheight": 16,
          "layers": [{"type":"tilelayer", "name":"ground", "width":2, "height":2, "data":[1]}]
        }"#;
        let err = decode_tmj_str_to_ir(map_json, Path::new("map.tmj")).expect_err("expected decode error");
        assert!(matches!(err, MapError::TileData { ref layer, .. } if layer == "ground"));
    }

    #[test]
    fn unknown_property_type_is_rejected() {
        let map_json = r#"{"tilewidth": 8, "tileheight": 8,
          "properties": [{"name":"relic","type":"vector","value":[1,2]}]}"#;
        let err = decode_tmj_str_to_ir(map_json, Path::new("map.tmj")).expect_err("unknown type");
        assert!(matches!(err, MapError::UnsupportedPropertyType { ref kind, .. } if kind == "vector"));
    }

    #[test]
    fn rejects_infinite_maps() {
        let map_json = r#"{"tilewidth": 16, "tileheight": 16, "infinite": true}"#;
        let err = decode_tmj_str_to_ir(map_json, Path::new("map.tmj")).expect_err("infinite");
        assert!(matches!(err, MapError::InvalidMap(_)));
    }
}
