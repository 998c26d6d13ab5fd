// src/loader/tmx_loader.rs
use super::source::resolve_relative;
use super::xml::Element;
use crate::decode::{decode_gid_array, decode_tile_data};
use crate::error::MapError;
use crate::ir_map::*;
use crate::properties::{cast_property, Properties, PropertyValue};
use macroquad::math::{ivec2, vec2, Vec2};
use std::path::Path;

fn parse_document(text: &str, path: &Path, root_name: &str) -> Result<Element, MapError> {
    let root = Element::parse(text)
        .map_err(|source| MapError::Xml {
            path: path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| MapError::InvalidMap(format!("{} is empty", path.display())))?;
    if root.name != root_name {
        return Err(MapError::InvalidMap(format!(
            "expected <{root_name}> as the root of {}, found <{}>",
            path.display(),
            root.name
        )));
    }
    Ok(root)
}

fn read_text(path: &Path) -> Result<String, MapError> {
    std::fs::read_to_string(path).map_err(|source| MapError::io(path, source))
}

fn properties_from_xml(el: Option<&Element>) -> Result<Properties, MapError> {
    let mut out = Properties::new();
    let Some(el) = el else {
        return Ok(out);
    };
    for prop in el.children_named("property") {
        let name = prop.attr("name").unwrap_or_default();
        let kind = prop.attr("type");
        let value = if kind == Some("class") {
            PropertyValue::Class {
                class_name: prop.attr("propertytype").unwrap_or_default().to_owned(),
                properties: properties_from_xml(prop.child("properties"))?,
            }
        } else {
            // multi-line strings are stored as element text
            let text = prop.attr("value").unwrap_or(&prop.text);
            cast_property(name, kind, text)?
        };
        out.insert(name, value);
    }
    Ok(out)
}

fn image_from_xml(el: Option<&Element>, base: &Path) -> Result<Option<IrImage>, MapError> {
    let Some(el) = el else {
        return Ok(None);
    };
    let Some(source) = el.attr("source") else {
        return Ok(None);
    };
    Ok(Some(IrImage {
        source: source.to_owned(),
        path: resolve_relative(base, source),
        width: el.num("width", 0)?,
        height: el.num("height", 0)?,
    }))
}

fn parse_points(el: &Element) -> Result<Vec<Vec2>, MapError> {
    let points = el.attr("points").unwrap_or_default();
    points
        .split_whitespace()
        .map(|pair| {
            let (x, y) = pair
                .split_once(',')
                .ok_or_else(|| MapError::InvalidMap(format!("malformed point '{pair}'")))?;
            match (x.trim().parse::<f32>(), y.trim().parse::<f32>()) {
                (Ok(x), Ok(y)) => Ok(vec2(x, y)),
                _ => Err(MapError::InvalidMap(format!("malformed point '{pair}'"))),
            }
        })
        .collect()
}

fn object_from_xml(el: &Element) -> Result<IrObject, MapError> {
    let shape = if let Some(poly) = el.child("polygon") {
        IrObjectShape::Polygon(parse_points(poly)?)
    } else if let Some(line) = el.child("polyline") {
        IrObjectShape::Polyline(parse_points(line)?)
    } else if el.child("ellipse").is_some() {
        IrObjectShape::Ellipse
    } else if el.child("point").is_some() {
        IrObjectShape::Point
    } else if let Some(gid) = el.opt_num::<u32>("gid")? {
        IrObjectShape::Tile { gid }
    } else {
        IrObjectShape::Rectangle
    };

    Ok(IrObject {
        id: el.num("id", 0)?,
        name: el.attr("name").unwrap_or_default().to_owned(),
        class_name: el.attr("type").or_else(|| el.attr("class")).map(str::to_owned),
        x: el.num("x", 0.0)?,
        y: el.num("y", 0.0)?,
        width: el.opt_num("width")?,
        height: el.opt_num("height")?,
        rotation: el.opt_num("rotation")?,
        visible: el.num("visible", 1)? == 1,
        shape,
        properties: properties_from_xml(el.child("properties"))?,
    })
}

fn objects_from_xml(group: Option<&Element>) -> Result<Vec<IrObject>, MapError> {
    group
        .map(|g| g.children_named("object").map(object_from_xml).collect())
        .unwrap_or_else(|| Ok(Vec::new()))
}

fn tileset_from_xml(el: &Element, map_path: &Path) -> Result<IrTileset, MapError> {
    let first_gid = el.num("firstgid", 1)?;

    // External tilesets keep their own file as the base for image paths.
    let external;
    let (ts, base, source) = match el.attr("source") {
        Some(src) => {
            let tsx_path = resolve_relative(map_path, src);
            external = parse_document(&read_text(&tsx_path)?, &tsx_path, "tileset")?;
            (&external, tsx_path.clone(), Some(tsx_path))
        }
        None => (el, map_path.to_path_buf(), None),
    };

    let offset = match ts.child("tileoffset") {
        Some(o) => ivec2(o.num("x", 0)?, o.num("y", 0)?),
        None => ivec2(0, 0),
    };

    let mut tiles = Vec::new();
    for tile in ts.children_named("tile") {
        let animation = match tile.child("animation") {
            Some(anim) => anim
                .children_named("frame")
                .map(|f| Ok((f.num("tileid", 0)?, f.num("duration", 0)?)))
                .collect::<Result<Vec<_>, MapError>>()?,
            None => Vec::new(),
        };
        tiles.push(IrTileMetadata {
            id: tile.num("id", 0)?,
            class_name: tile.attr("type").or_else(|| tile.attr("class")).map(str::to_owned),
            terrain: tile.attr("terrain").map(str::to_owned),
            probability: tile.attr("probability").map(str::to_owned),
            image: image_from_xml(tile.child("image"), &base)?,
            properties: properties_from_xml(tile.child("properties"))?,
            objects: objects_from_xml(tile.child("objectgroup"))?,
            animation,
        });
    }

    Ok(IrTileset {
        first_gid,
        name: ts.attr("name").unwrap_or_default().to_owned(),
        source,
        tile_w: ts.num("tilewidth", 0)?,
        tile_h: ts.num("tileheight", 0)?,
        spacing: ts.num("spacing", 0)?,
        margin: ts.num("margin", 0)?,
        tile_offset: offset,
        image: image_from_xml(ts.child("image"), &base)?,
        properties: properties_from_xml(ts.child("properties"))?,
        tiles,
    })
}

fn tile_data_from_xml(el: &Element, name: &str, width: usize, height: usize) -> Result<Vec<u32>, MapError> {
    let data = el
        .child("data")
        .ok_or_else(|| MapError::InvalidMap(format!("layer '{name}' has no <data>")))?;
    if data.child("chunk").is_some() {
        return Err(MapError::InvalidMap(format!(
            "layer '{name}' is infinite; only fixed-size maps are supported"
        )));
    }
    let decoded = match data.attr("encoding") {
        Some(encoding) => decode_tile_data(encoding, data.attr("compression"), &data.text, width, height),
        None => {
            let gids = data
                .children_named("tile")
                .map(|t| t.num("gid", 0u32))
                .collect::<Result<Vec<_>, _>>()?;
            decode_gid_array(gids, width, height)
        }
    };
    decoded.map_err(|e| MapError::tile_data(name, e))
}

fn layer_from_xml(el: &Element, map_path: &Path) -> Result<Option<IrLayer>, MapError> {
    let name = el.attr("name").unwrap_or_default().to_owned();
    let offset = vec2(el.num("offsetx", 0.0)?, el.num("offsety", 0.0)?);

    let kind = match el.name.as_str() {
        "layer" => {
            let width = el.num("width", 0usize)?;
            let height = el.num("height", 0usize)?;
            IrLayerKind::Tiles {
                width,
                height,
                data: tile_data_from_xml(el, &name, width, height)?,
            }
        }
        "objectgroup" => IrLayerKind::Objects {
            objects: objects_from_xml(Some(el))?,
        },
        "imagelayer" => IrLayerKind::Image {
            image: image_from_xml(el.child("image"), map_path)?,
            x: el.opt_num::<f32>("offsetx")?.map_or_else(|| el.num("x", 0.0), Ok)?,
            y: el.opt_num::<f32>("offsety")?.map_or_else(|| el.num("y", 0.0), Ok)?,
            repeat_x: el.flag("repeatx", false),
            repeat_y: el.flag("repeaty", false),
        },
        "group" => IrLayerKind::Group {
            layers: layers_from_xml(el, map_path)?,
        },
        _ => return Ok(None),
    };

    Ok(Some(IrLayer {
        name,
        visible: el.num("visible", 1)? == 1,
        opacity: el.num("opacity", 1.0)?,
        offset,
        parallax: vec2(el.num("parallaxx", 1.0)?, el.num("parallaxy", 1.0)?),
        tint: el.attr("tintcolor").map(str::to_owned),
        properties: properties_from_xml(el.child("properties"))?,
        kind,
    }))
}

fn layers_from_xml(parent: &Element, map_path: &Path) -> Result<Vec<IrLayer>, MapError> {
    let mut layers = Vec::new();
    for child in &parent.children {
        if let Some(layer) = layer_from_xml(child, map_path)? {
            layers.push(layer);
        }
    }
    Ok(layers)
}

/// Parse TMX text; `path` anchors relative tileset and image references.
pub fn decode_tmx_str_to_ir(text: &str, path: &Path) -> Result<IrMap, MapError> {
    let root = parse_document(text, path, "map")?;

    let tilesets = root
        .children_named("tileset")
        .map(|ts| tileset_from_xml(ts, path))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(IrMap {
        orientation: root.attr("orientation").map(str::to_owned),
        width: root.num("width", 0)?,
        height: root.num("height", 0)?,
        tile_w: root.num("tilewidth", 0)?,
        tile_h: root.num("tileheight", 0)?,
        hex_side_length: root.num("hexsidelength", 0)?,
        stagger_axis: root.attr("staggeraxis").map(str::to_owned),
        stagger_index: root.attr("staggerindex").map(str::to_owned),
        background_color: root.attr("backgroundcolor").map(str::to_owned),
        properties: properties_from_xml(root.child("properties"))?,
        tilesets,
        layers: layers_from_xml(&root, path)?,
    })
}

pub fn decode_tmx_file_to_ir(path: &Path) -> Result<IrMap, MapError> {
    decode_tmx_str_to_ir(&read_text(path)?, path)
}
