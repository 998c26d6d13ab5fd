//! Turns the intermediate form into a [`TiledMap`].

use super::source::{ImageResolver, TileSource};
use crate::config::LoaderParams;
use crate::error::MapError;
use crate::gid::{Cell, TileId};
use crate::ir_map::*;
use crate::layer::{ImageLayer, LayerKind, MapLayer, TileLayer};
use crate::map::TiledMap;
use crate::object::{MapObject, ObjectShape, TileObject};
use crate::properties::{parse_color, Properties, PropertyValue};
use crate::tileset::{AnimationFrame, ImageId, ImageSource, MapTile, TextureRegion, TileAnimation, TileSet, TileSets};
use macroquad::color::WHITE;
use macroquad::math::{vec2, Rect, Vec2};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, trace, warn};

/// State shared by the builder and the [`TileSource`] filling tilesets.
pub struct MapBuilder<'a> {
    params: &'a LoaderParams,
    resolver: &'a mut dyn ImageResolver,
    images: Vec<ImageSource>,
    image_ids: HashMap<std::path::PathBuf, ImageId>,
    tile_w: u32,
    tile_h: u32,
    pixel_height: f32,
}

impl<'a> MapBuilder<'a> {
    fn new(params: &'a LoaderParams, resolver: &'a mut dyn ImageResolver, ir: &IrMap) -> Self {
        let (_, pixel_height) = pixel_size(ir);
        MapBuilder {
            params,
            resolver,
            images: Vec::new(),
            image_ids: HashMap::new(),
            tile_w: ir.tile_w,
            tile_h: ir.tile_h,
            pixel_height,
        }
    }

    pub fn params(&self) -> &LoaderParams {
        self.params
    }

    /// Register an image the map declared.
    pub fn image(&mut self, image: &IrImage) -> Result<ImageId, MapError> {
        self.register_image(&image.path, image.width, image.height)
    }

    /// Register an image once; sizes of 0 are asked from the resolver.
    pub fn register_image(&mut self, path: &Path, width: u32, height: u32) -> Result<ImageId, MapError> {
        if let Some(id) = self.image_ids.get(path) {
            return Ok(*id);
        }
        let (width, height) = if width > 0 && height > 0 {
            (width, height)
        } else {
            self.resolver.image_size(path)?
        };
        let id = ImageId(self.images.len());
        self.images.push(ImageSource {
            path: path.to_path_buf(),
            width,
            height,
        });
        self.image_ids.insert(path.to_path_buf(), id);
        trace!(path = %path.display(), width, height, "registered image");
        Ok(id)
    }

    pub fn image_source(&self, id: ImageId) -> &ImageSource {
        &self.images[id.0]
    }

    /// A static tile with the tileset's draw offset applied.
    pub fn static_tile(&self, ir: &IrTileset, gid: u32, region: TextureRegion) -> MapTile {
        let mut tile = MapTile::new(gid, region);
        let y = ir.tile_offset.y as f32;
        tile.offset = vec2(ir.tile_offset.x as f32, if self.params.flip_y { -y } else { y });
        tile
    }

    fn object_scale(&self) -> Vec2 {
        if self.params.convert_object_to_tile_space {
            vec2(1.0 / self.tile_w.max(1) as f32, 1.0 / self.tile_h.max(1) as f32)
        } else {
            Vec2::ONE
        }
    }

    fn build_tileset(&mut self, ir: &IrTileset, source: &mut dyn TileSource) -> Result<TileSet, MapError> {
        let mut tileset = TileSet::new(ir.name.as_str(), ir.first_gid);
        tileset.properties = ir.properties.clone();
        tileset
            .properties
            .insert("firstgid", PropertyValue::I64(ir.first_gid as i64));

        source.add_static_tiles(self, ir, &mut tileset)?;

        for meta in &ir.tiles {
            if meta.animation.is_empty() {
                continue;
            }
            let gid = ir.gid(meta.id)?;
            let frames = meta
                .animation
                .iter()
                .map(|&(local, duration_ms)| {
                    let frame_gid = ir.gid(local)?;
                    let frame = tileset.tile(frame_gid).ok_or_else(|| {
                        MapError::InvalidMap(format!(
                            "animation of tile {} in tileset '{}' uses missing tile {local}",
                            meta.id, ir.name
                        ))
                    })?;
                    Ok(AnimationFrame {
                        gid: frame_gid,
                        region: frame.region,
                        duration_ms,
                    })
                })
                .collect::<Result<Vec<_>, MapError>>()?;
            if let Some(tile) = tileset.tile_mut(gid) {
                tile.animation = Some(TileAnimation::new(frames));
            }
        }

        for meta in &ir.tiles {
            let Some(tile) = tileset.tile_mut(ir.gid(meta.id)?) else {
                continue;
            };
            if let Some(terrain) = &meta.terrain {
                tile.properties.insert("terrain", PropertyValue::String(terrain.clone()));
            }
            if let Some(probability) = &meta.probability {
                tile.properties
                    .insert("probability", PropertyValue::String(probability.clone()));
            }
            if let Some(class_name) = &meta.class_name {
                tile.properties.insert("type", PropertyValue::String(class_name.clone()));
            }
            tile.properties.extend(meta.properties.clone());
        }

        trace!(tileset = %ir.name, first_gid = ir.first_gid, tiles = tileset.len(), "built tileset");
        Ok(tileset)
    }

    fn build_object(&self, obj: &IrObject, reference_height: f32, tilesets: &TileSets, owner: &str) -> Result<MapObject, MapError> {
        let flip_y = self.params.flip_y;
        let scale = self.object_scale();

        let x = obj.x * scale.x;
        let y = (if flip_y { reference_height - obj.y } else { obj.y }) * scale.y;
        let width = obj.width.unwrap_or(0.0) * scale.x;
        let height = obj.height.unwrap_or(0.0) * scale.y;
        let box_y = if flip_y { y - height } else { y };
        let vertex_sign = if flip_y { -1.0 } else { 1.0 };
        let vertices = |points: &[Vec2]| -> Vec<Vec2> {
            points
                .iter()
                .map(|p| vec2(p.x * scale.x, p.y * scale.y * vertex_sign))
                .collect()
        };

        let mut properties = Properties::new();
        let shape = match &obj.shape {
            IrObjectShape::Rectangle => ObjectShape::Rectangle(Rect::new(x, box_y, width, height)),
            IrObjectShape::Ellipse => ObjectShape::Ellipse(Rect::new(x, box_y, width, height)),
            IrObjectShape::Point => ObjectShape::Point(vec2(x, y)),
            IrObjectShape::Polygon(points) => ObjectShape::Polygon {
                position: vec2(x, y),
                vertices: vertices(points),
            },
            IrObjectShape::Polyline(points) => ObjectShape::Polyline {
                position: vec2(x, y),
                vertices: vertices(points),
            },
            IrObjectShape::Tile { gid } => {
                let id = TileId(*gid);
                let tile = tilesets
                    .get_tile(id.clean())
                    .ok_or_else(|| MapError::InvalidObjectGid {
                        layer: owner.to_owned(),
                        object_id: obj.id,
                        gid: id.clean(),
                    })?;
                let region = tile.region;
                let object_w = obj.width.unwrap_or(region.width as f32);
                let object_h = obj.height.unwrap_or(region.height as f32);
                properties.insert("gid", PropertyValue::I64(id.raw() as i64));
                ObjectShape::Tile(TileObject {
                    gid: id.clean(),
                    flip_h: id.flip_h(),
                    flip_v: id.flip_v(),
                    position: vec2(x, if flip_y { y } else { y - height }),
                    scale: vec2(
                        scale.x * object_w / region.width.max(1) as f32,
                        scale.y * object_h / region.height.max(1) as f32,
                    ),
                    rotation: obj.rotation.unwrap_or(0.0),
                    region,
                })
            }
        };

        if let Some(rotation) = obj.rotation {
            properties.insert("rotation", PropertyValue::F32(rotation));
        }
        if let Some(class_name) = &obj.class_name {
            properties.insert("type", PropertyValue::String(class_name.clone()));
        }
        if obj.id != 0 {
            properties.insert("id", PropertyValue::I64(obj.id as i64));
        }
        properties.insert("x", PropertyValue::F32(x));
        let reported_y = if matches!(shape, ObjectShape::Tile(_)) { y } else { box_y };
        properties.insert("y", PropertyValue::F32(reported_y));
        properties.insert("width", PropertyValue::F32(width));
        properties.insert("height", PropertyValue::F32(height));
        properties.extend(obj.properties.clone());

        Ok(MapObject {
            id: obj.id,
            name: obj.name.clone(),
            visible: obj.visible,
            properties,
            shape,
        })
    }

    fn build_layer(&mut self, ir: &IrLayer, tilesets: &TileSets) -> Result<MapLayer, MapError> {
        let kind = match &ir.kind {
            IrLayerKind::Tiles { width, height, data } => {
                LayerKind::Tiles(self.build_tile_layer(&ir.name, *width, *height, data, tilesets))
            }
            IrLayerKind::Objects { objects } => LayerKind::Objects(
                objects
                    .iter()
                    .map(|o| self.build_object(o, self.pixel_height, tilesets, &ir.name))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            IrLayerKind::Image {
                image,
                x,
                y,
                repeat_x,
                repeat_y,
            } => {
                let region = match image {
                    Some(img) => {
                        let id = self.image(img)?;
                        Some(TextureRegion::whole(id, self.image_source(id)))
                    }
                    None => None,
                };
                let mut y = if self.params.flip_y { self.pixel_height - y } else { *y };
                if let (true, Some(region)) = (self.params.flip_y, &region) {
                    y -= region.height as f32;
                }
                LayerKind::Image(ImageLayer {
                    region,
                    x: *x,
                    y,
                    repeat_x: *repeat_x,
                    repeat_y: *repeat_y,
                })
            }
            IrLayerKind::Group { layers } => LayerKind::Group(
                layers
                    .iter()
                    .map(|l| self.build_layer(l, tilesets))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };

        let tint = match &ir.tint {
            Some(text) => parse_color(text).unwrap_or_else(|| {
                warn!(layer = %ir.name, tint = %text, "ignoring malformed tint colour");
                WHITE
            }),
            None => WHITE,
        };

        Ok(MapLayer {
            name: ir.name.clone(),
            visible: ir.visible,
            opacity: ir.opacity,
            offset: ir.offset,
            parallax: ir.parallax,
            tint,
            properties: ir.properties.clone(),
            kind,
        })
    }

    fn build_tile_layer(&self, name: &str, width: usize, height: usize, data: &[u32], tilesets: &TileSets) -> TileLayer {
        let mut layer = TileLayer::new(width, height, self.tile_w as f32, self.tile_h as f32);
        let mut unknown = 0usize;
        for y in 0..height {
            for x in 0..width {
                let id = TileId(data[y * width + x]);
                if id.clean() == 0 {
                    continue;
                }
                if tilesets.get_tile(id.clean()).is_none() {
                    unknown += 1;
                    continue;
                }
                let row = if self.params.flip_y { height - 1 - y } else { y };
                layer.set_cell(x, row, Some(Cell::from_tile_id(id)));
            }
        }
        if unknown > 0 {
            warn!(layer = %name, unknown, "cells reference gids no tileset defines; left empty");
        }
        layer
    }
}

/// Map size in pixels; staggered maps interlock every other row or column.
fn pixel_size(ir: &IrMap) -> (f32, f32) {
    let mut width = ir.width as f32 * ir.tile_w as f32;
    let mut height = ir.height as f32 * ir.tile_h as f32;
    if ir.orientation.as_deref() == Some("staggered") && ir.height > 1 {
        width += ir.tile_w as f32 / 2.0;
        height = height / 2.0 + ir.tile_h as f32 / 2.0;
    }
    (width, height)
}

fn map_properties(ir: &IrMap) -> Properties {
    let mut props = Properties::new();
    let text = |s: &String| PropertyValue::String(s.clone());
    if let Some(o) = &ir.orientation {
        props.insert("orientation", text(o));
    }
    props.insert("width", PropertyValue::I64(ir.width as i64));
    props.insert("height", PropertyValue::I64(ir.height as i64));
    props.insert("tilewidth", PropertyValue::I64(ir.tile_w as i64));
    props.insert("tileheight", PropertyValue::I64(ir.tile_h as i64));
    props.insert("hexsidelength", PropertyValue::I64(ir.hex_side_length as i64));
    if let Some(axis) = &ir.stagger_axis {
        props.insert("staggeraxis", text(axis));
    }
    if let Some(index) = &ir.stagger_index {
        props.insert("staggerindex", text(index));
    }
    if let Some(color) = &ir.background_color {
        props.insert("backgroundcolor", text(color));
    }
    props.extend(ir.properties.clone());
    props
}

fn propagate_parallax(layers: &mut [MapLayer], parent: Vec2) {
    for layer in layers {
        layer.parallax *= parent;
        let factor = layer.parallax;
        if let LayerKind::Group(children) = &mut layer.kind {
            propagate_parallax(children, factor);
        }
    }
}

pub(crate) fn build_map(
    ir: IrMap,
    params: &LoaderParams,
    resolver: &mut dyn ImageResolver,
    source: &mut dyn TileSource,
) -> Result<TiledMap, MapError> {
    let mut builder = MapBuilder::new(params, resolver, &ir);

    let mut tilesets = TileSets::default();
    for ts in &ir.tilesets {
        tilesets.add(builder.build_tileset(ts, source)?);
    }

    // Collision shapes may stamp tiles of any tileset, so they come last.
    let mut tile_objects = Vec::new();
    for ts in &ir.tilesets {
        for meta in ts.tiles.iter().filter(|m| !m.objects.is_empty()) {
            let gid = ts.gid(meta.id)?;
            let Some(tile) = tilesets.get_tile(gid) else {
                continue;
            };
            let reference = tile.region.height as f32;
            let objects = meta
                .objects
                .iter()
                .map(|o| builder.build_object(o, reference, &tilesets, &ts.name))
                .collect::<Result<Vec<_>, _>>()?;
            tile_objects.push((gid, objects));
        }
    }
    for (gid, objects) in tile_objects {
        if let Some(tile) = tilesets.tile_mut(gid) {
            tile.objects = objects;
        }
    }

    let mut layers = ir
        .layers
        .iter()
        .map(|l| builder.build_layer(l, &tilesets))
        .collect::<Result<Vec<_>, _>>()?;
    propagate_parallax(&mut layers, Vec2::ONE);

    let map = TiledMap {
        width: ir.width,
        height: ir.height,
        tile_width: ir.tile_w,
        tile_height: ir.tile_h,
        properties: map_properties(&ir),
        tilesets,
        layers,
        images: builder.images,
    };
    debug!(
        layers = map.layers.len(),
        tilesets = map.tilesets.len(),
        images = map.images.len(),
        "built tiled map"
    );
    Ok(map)
}
