//! Format-agnostic intermediate form shared by the TMX and TMJ parsers.
//!
//! Custom [`TileSource`](crate::loader::TileSource) implementations read
//! tileset declarations from here.
use crate::error::MapError;
use crate::properties::Properties;
use macroquad::math::{IVec2, Vec2};
use std::path::PathBuf;

/// Canonical map as read from disk, before tiles are resolved.
#[derive(Debug)]
pub struct IrMap {
    pub orientation: Option<String>,
    pub width: u32,
    pub height: u32,
    pub tile_w: u32,
    pub tile_h: u32,
    pub hex_side_length: u32,
    pub stagger_axis: Option<String>,
    pub stagger_index: Option<String>,
    pub background_color: Option<String>,
    pub properties: Properties,
    pub tilesets: Vec<IrTileset>, // declaration order
    pub layers: Vec<IrLayer>,     // draw order: array order
}

/// An image reference, already resolved against the file that declared it.
#[derive(Debug, Clone)]
pub struct IrImage {
    /// Path as written in the document
    pub source: String,
    pub path: PathBuf,
    pub width: u32,  // 0 if not declared
    pub height: u32, // 0 if not declared
}

#[derive(Debug)]
pub struct IrTileset {
    pub first_gid: u32,
    pub name: String,
    /// Where an external tileset was read from
    pub source: Option<PathBuf>,
    pub tile_w: u32,
    pub tile_h: u32,
    pub spacing: u32, // 0 if not used
    pub margin: u32,  // 0 if not used
    pub tile_offset: IVec2,
    /// Single atlas image; `None` for image-collection tilesets
    pub image: Option<IrImage>,
    pub properties: Properties,
    pub tiles: Vec<IrTileMetadata>,
}

impl IrTileset {
    /// Global id of the tile with local id `local`.
    pub fn gid(&self, local: u32) -> Result<u32, MapError> {
        self.first_gid.checked_add(local).ok_or_else(|| {
            MapError::InvalidMap(format!(
                "tile {local} of tileset '{}' overflows firstgid {}",
                self.name, self.first_gid
            ))
        })
    }
}

#[derive(Debug)]
pub struct IrTileMetadata {
    pub id: u32,
    pub class_name: Option<String>,
    pub terrain: Option<String>,
    pub probability: Option<String>,
    pub image: Option<IrImage>,
    pub properties: Properties,
    pub objects: Vec<IrObject>,
    /// `(local tile id, duration in ms)`
    pub animation: Vec<(u32, u32)>,
}

#[derive(Debug)]
pub enum IrLayerKind {
    Tiles {
        width: usize,
        height: usize,
        data: Vec<u32>, // raw GIDs, flip flags included
    },
    Objects {
        objects: Vec<IrObject>,
    },
    Image {
        image: Option<IrImage>,
        x: f32,
        y: f32,
        repeat_x: bool,
        repeat_y: bool,
    },
    Group {
        layers: Vec<IrLayer>,
    },
}

#[derive(Debug)]
pub struct IrLayer {
    pub name: String,
    pub visible: bool,
    pub opacity: f32,
    pub offset: Vec2, // world offset for this layer
    pub parallax: Vec2,
    pub tint: Option<String>,
    pub properties: Properties,
    pub kind: IrLayerKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IrObjectShape {
    Rectangle,
    Ellipse,
    Point,
    Polygon(Vec<Vec2>),
    Polyline(Vec<Vec2>),
    Tile { gid: u32 },
}

/// An object with raw pixel attributes, Y down.
#[derive(Debug, Clone)]
pub struct IrObject {
    pub id: u32,
    pub name: String,
    pub class_name: Option<String>,
    pub x: f32,
    pub y: f32,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub rotation: Option<f32>,
    pub visible: bool,
    pub shape: IrObjectShape,
    pub properties: Properties,
}

impl IrMap {
    /// Image files the map needs, deduplicated, in first-use order.
    pub fn image_paths(&self) -> Vec<PathBuf> {
        fn layer_images(layers: &[IrLayer], out: &mut Vec<PathBuf>) {
            for layer in layers {
                match &layer.kind {
                    IrLayerKind::Image { image: Some(img), .. } => out.push(img.path.clone()),
                    IrLayerKind::Group { layers } => layer_images(layers, out),
                    _ => {}
                }
            }
        }

        let mut out = Vec::new();
        for ts in &self.tilesets {
            match &ts.image {
                Some(img) => out.push(img.path.clone()),
                None => out.extend(ts.tiles.iter().filter_map(|t| t.image.as_ref()).map(|i| i.path.clone())),
            }
        }
        layer_images(&self.layers, &mut out);

        let mut seen = std::collections::HashSet::new();
        out.retain(|p| seen.insert(p.clone()));
        out
    }
}
