//! Global tile ids and their packed flip flags.

pub const FLIP_H: u32 = 0x8000_0000; // bit 31
pub const FLIP_V: u32 = 0x4000_0000; // bit 30
pub const FLIP_D: u32 = 0x2000_0000; // bit 29
pub const FLAG_MASK: u32 = FLIP_H | FLIP_V | FLIP_D;

/// A raw gid as stored in layer data, flags included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId(pub u32);

impl TileId {
    #[inline] pub fn raw(self) -> u32 { self.0 }
    #[inline] pub fn clean(self) -> u32 { self.0 & !FLAG_MASK }
    #[inline] pub fn flip_h(self) -> bool { (self.0 & FLIP_H) != 0 }
    #[inline] pub fn flip_v(self) -> bool { (self.0 & FLIP_V) != 0 }
    #[inline] pub fn flip_d(self) -> bool { (self.0 & FLIP_D) != 0 }
}

/// Counter-clockwise quarter turns applied to a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

/// One occupied position of a tile layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    /// Clean gid of the tile drawn here
    pub gid: u32,
    pub flip_h: bool,
    pub flip_v: bool,
    pub rotation: Rotation,
}

impl Cell {
    pub fn new(gid: u32) -> Self {
        Cell {
            gid,
            flip_h: false,
            flip_v: false,
            rotation: Rotation::R0,
        }
    }

    pub fn from_tile_id(id: TileId) -> Self {
        Self::from_flags(id.clean(), id.flip_h(), id.flip_v(), id.flip_d())
    }

    /// Fold Tiled's three flag bits into flips plus a rotation.
    ///
    /// The diagonal flag is a transpose; combined with H/V it is one of the
    /// four rotations, optionally mirrored.
    pub fn from_flags(gid: u32, h: bool, v: bool, d: bool) -> Self {
        let mut cell = Cell::new(gid);
        if d {
            match (h, v) {
                (true, true) => {
                    cell.flip_h = true;
                    cell.rotation = Rotation::R270;
                }
                (true, false) => cell.rotation = Rotation::R270,
                (false, true) => cell.rotation = Rotation::R90,
                (false, false) => {
                    cell.flip_v = true;
                    cell.rotation = Rotation::R270;
                }
            }
        } else {
            cell.flip_h = h;
            cell.flip_v = v;
        }
        cell
    }
}
