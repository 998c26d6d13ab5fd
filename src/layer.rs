use crate::gid::Cell;
use crate::object::MapObject;
use crate::properties::Properties;
use crate::tileset::TextureRegion;
use macroquad::color::{Color, WHITE};
use macroquad::math::Vec2;

/// A layer of any kind plus the attributes every layer shares.
#[derive(Debug, Clone, PartialEq)]
pub struct MapLayer {
    pub name: String,
    pub visible: bool,
    pub opacity: f32,
    /// Pixel offset in Tiled's Y-down convention
    pub offset: Vec2,
    /// Scroll factor relative to the camera, already multiplied through groups
    pub parallax: Vec2,
    pub tint: Color,
    pub properties: Properties,
    pub kind: LayerKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerKind {
    Tiles(TileLayer),
    Objects(Vec<MapObject>),
    Image(ImageLayer),
    Group(Vec<MapLayer>),
}

impl MapLayer {
    pub fn new(name: impl Into<String>, kind: LayerKind) -> Self {
        MapLayer {
            name: name.into(),
            visible: true,
            opacity: 1.0,
            offset: Vec2::ZERO,
            parallax: Vec2::ONE,
            tint: WHITE,
            properties: Properties::new(),
            kind,
        }
    }

    pub fn as_tiles(&self) -> Option<&TileLayer> {
        match &self.kind {
            LayerKind::Tiles(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_tiles_mut(&mut self) -> Option<&mut TileLayer> {
        match &mut self.kind {
            LayerKind::Tiles(t) => Some(t),
            _ => None,
        }
    }

    pub fn objects(&self) -> &[MapObject] {
        match &self.kind {
            LayerKind::Objects(objects) => objects,
            _ => &[],
        }
    }

    pub fn children(&self) -> &[MapLayer] {
        match &self.kind {
            LayerKind::Group(children) => children,
            _ => &[],
        }
    }
}

/// A grid of cells; row 0 is the bottom row when the map was loaded Y-up.
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayer {
    pub width: usize,
    pub height: usize,
    pub tile_width: f32,
    pub tile_height: f32,
    cells: Vec<Option<Cell>>,
}

impl TileLayer {
    pub fn new(width: usize, height: usize, tile_width: f32, tile_height: f32) -> Self {
        TileLayer {
            width,
            height,
            tile_width,
            tile_height,
            cells: vec![None; width * height],
        }
    }

    /// `None` for empty cells and for positions outside the grid.
    pub fn cell(&self, x: usize, y: usize) -> Option<&Cell> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells[y * self.width + x].as_ref()
    }

    /// Writes outside the grid are ignored.
    pub fn set_cell(&mut self, x: usize, y: usize, cell: Option<Cell>) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    /// Occupied cells as `(x, y, cell)`.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, &Cell)> {
        let w = self.width.max(1);
        self.cells
            .iter()
            .enumerate()
            .filter_map(move |(i, c)| c.as_ref().map(|c| (i % w, i / w, c)))
    }
}

/// A single image placed in map space.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageLayer {
    pub region: Option<TextureRegion>,
    /// Bottom-left corner when loaded Y-up
    pub x: f32,
    pub y: f32,
    pub repeat_x: bool,
    pub repeat_y: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_cells_read_as_empty() {
        let mut layer = TileLayer::new(3, 2, 16.0, 16.0);
        layer.set_cell(2, 1, Some(Cell::new(5)));
        layer.set_cell(3, 0, Some(Cell::new(9)));

        assert_eq!(layer.cell(2, 1).map(|c| c.gid), Some(5));
        assert!(layer.cell(3, 0).is_none());
        assert!(layer.cell(0, 2).is_none());
        assert_eq!(layer.cells().map(|(x, y, _)| (x, y)).collect::<Vec<_>>(), [(2, 1)]);
    }
}
