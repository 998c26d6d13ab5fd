use crate::properties::Properties;
use crate::tileset::TextureRegion;
use macroquad::math::{Rect, Vec2};

/// An object placed on an object layer or inside a tile's collision group.
#[derive(Debug, Clone, PartialEq)]
pub struct MapObject {
    pub id: u32,
    pub name: String,
    pub visible: bool,
    /// Built-in attributes (`x`, `y`, `width`, `height`, ...) followed by custom ones
    pub properties: Properties,
    pub shape: ObjectShape,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectShape {
    Rectangle(Rect),
    Ellipse(Rect),
    Point(Vec2),
    /// Vertices are relative to `position`
    Polygon { position: Vec2, vertices: Vec<Vec2> },
    Polyline { position: Vec2, vertices: Vec<Vec2> },
    Tile(TileObject),
}

/// A tile stamped as a free-standing object.
#[derive(Debug, Clone, PartialEq)]
pub struct TileObject {
    /// Clean gid of the stamped tile
    pub gid: u32,
    pub flip_h: bool,
    pub flip_v: bool,
    pub position: Vec2,
    pub scale: Vec2,
    pub rotation: f32,
    pub region: TextureRegion,
}

impl MapObject {
    /// Tile objects report the gid they stamp.
    pub fn tile_gid(&self) -> Option<u32> {
        match &self.shape {
            ObjectShape::Tile(t) => Some(t.gid),
            _ => None,
        }
    }

    /// Axis-aligned bounds in map space.
    pub fn bounds(&self) -> Rect {
        match &self.shape {
            ObjectShape::Rectangle(r) | ObjectShape::Ellipse(r) => *r,
            ObjectShape::Point(p) => Rect::new(p.x, p.y, 0.0, 0.0),
            ObjectShape::Polygon { position, vertices }
            | ObjectShape::Polyline { position, vertices } => {
                let mut min = *position;
                let mut max = *position;
                for v in vertices {
                    let p = *position + *v;
                    min = min.min(p);
                    max = max.max(p);
                }
                Rect::new(min.x, min.y, max.x - min.x, max.y - min.y)
            }
            ObjectShape::Tile(t) => Rect::new(
                t.position.x,
                t.position.y,
                t.region.width as f32 * t.scale.x,
                t.region.height as f32 * t.scale.y,
            ),
        }
    }
}
