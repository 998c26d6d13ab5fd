use crate::object::MapObject;
use crate::properties::Properties;
use macroquad::math::Vec2;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Index of an image in [`TiledMap::images`](crate::TiledMap::images).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(pub usize);

/// An image file referenced by the map, with its pixel size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSource {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// A rectangular area of one image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureRegion {
    pub image: ImageId,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub image_width: u32,
    pub image_height: u32,
    pub flip_x: bool,
    pub flip_y: bool,
}

impl TextureRegion {
    pub fn new(image: ImageId, source: &ImageSource, x: u32, y: u32, width: u32, height: u32) -> Self {
        TextureRegion {
            image,
            x,
            y,
            width,
            height,
            image_width: source.width.max(1),
            image_height: source.height.max(1),
            flip_x: false,
            flip_y: false,
        }
    }

    /// Region covering a whole image.
    pub fn whole(image: ImageId, source: &ImageSource) -> Self {
        Self::new(image, source, 0, 0, source.width, source.height)
    }

    /// Toggle flips; a flipped region swaps its texture coordinates.
    pub fn flip(&mut self, x: bool, y: bool) {
        self.flip_x ^= x;
        self.flip_y ^= y;
    }

    fn left(&self) -> f32 {
        self.x as f32 / self.image_width as f32
    }
    fn right(&self) -> f32 {
        (self.x + self.width) as f32 / self.image_width as f32
    }
    fn top(&self) -> f32 {
        self.y as f32 / self.image_height as f32
    }
    fn bottom(&self) -> f32 {
        (self.y + self.height) as f32 / self.image_height as f32
    }

    pub fn u(&self) -> f32 {
        if self.flip_x { self.right() } else { self.left() }
    }
    pub fn u2(&self) -> f32 {
        if self.flip_x { self.left() } else { self.right() }
    }
    pub fn v(&self) -> f32 {
        if self.flip_y { self.bottom() } else { self.top() }
    }
    pub fn v2(&self) -> f32 {
        if self.flip_y { self.top() } else { self.bottom() }
    }
}

/// One frame of an animated tile.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationFrame {
    /// Gid of the static tile shown in this frame
    pub gid: u32,
    pub region: TextureRegion,
    pub duration_ms: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileAnimation {
    frames: Vec<AnimationFrame>,
    loop_duration: u64,
}

impl TileAnimation {
    pub fn new(frames: Vec<AnimationFrame>) -> Self {
        let loop_duration = frames.iter().map(|f| f.duration_ms as u64).sum();
        TileAnimation {
            frames,
            loop_duration,
        }
    }

    pub fn frames(&self) -> &[AnimationFrame] {
        &self.frames
    }

    pub fn loop_duration(&self) -> u64 {
        self.loop_duration
    }

    /// Frame shown `time_ms` after the animation clock started.
    pub fn frame_index(&self, time_ms: u64) -> usize {
        if self.loop_duration == 0 {
            return 0;
        }
        let mut t = time_ms % self.loop_duration;
        for (i, frame) in self.frames.iter().enumerate() {
            let d = frame.duration_ms as u64;
            if t <= d {
                return i;
            }
            t -= d;
        }
        0
    }
}

/// A tile of a tileset, addressed by its gid.
#[derive(Debug, Clone, PartialEq)]
pub struct MapTile {
    pub id: u32,
    pub region: TextureRegion,
    /// Draw offset; Y already follows the map's Y direction
    pub offset: Vec2,
    pub properties: Properties,
    /// Collision shapes drawn in the tile editor
    pub objects: Vec<MapObject>,
    pub animation: Option<TileAnimation>,
}

impl MapTile {
    pub fn new(id: u32, region: TextureRegion) -> Self {
        MapTile {
            id,
            region,
            offset: Vec2::ZERO,
            properties: Properties::new(),
            objects: Vec::new(),
            animation: None,
        }
    }

    /// Region to draw at `time_ms`; static tiles ignore the time.
    pub fn region_at(&self, time_ms: u64) -> &TextureRegion {
        match &self.animation {
            Some(anim) if !anim.frames.is_empty() => &anim.frames[anim.frame_index(time_ms)].region,
            _ => &self.region,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileSet {
    pub name: String,
    pub first_gid: u32,
    pub properties: Properties,
    tiles: BTreeMap<u32, MapTile>,
}

impl TileSet {
    pub fn new(name: impl Into<String>, first_gid: u32) -> Self {
        TileSet {
            name: name.into(),
            first_gid,
            properties: Properties::new(),
            tiles: BTreeMap::new(),
        }
    }

    pub fn tile(&self, gid: u32) -> Option<&MapTile> {
        self.tiles.get(&gid)
    }

    pub fn tile_mut(&mut self, gid: u32) -> Option<&mut MapTile> {
        self.tiles.get_mut(&gid)
    }

    /// Insert a tile under its own id, replacing any previous one.
    pub fn put_tile(&mut self, tile: MapTile) {
        self.tiles.insert(tile.id, tile);
    }

    pub fn tiles(&self) -> impl Iterator<Item = &MapTile> {
        self.tiles.values()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

/// All tilesets of a map, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileSets {
    sets: Vec<TileSet>,
}

impl TileSets {
    pub fn add(&mut self, tileset: TileSet) {
        self.sets.push(tileset);
    }

    /// Later tilesets shadow earlier ones on overlapping gids.
    pub fn get_tile(&self, gid: u32) -> Option<&MapTile> {
        self.sets.iter().rev().find_map(|ts| ts.tile(gid))
    }

    pub(crate) fn tile_mut(&mut self, gid: u32) -> Option<&mut MapTile> {
        self.sets.iter_mut().rev().find_map(|ts| ts.tile_mut(gid))
    }

    pub fn by_name(&self, name: &str) -> Option<&TileSet> {
        self.sets.iter().find(|ts| ts.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TileSet> {
        self.sets.iter()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> ImageSource {
        ImageSource {
            path: "tiles.png".into(),
            width: 64,
            height: 32,
        }
    }

    #[test]
    fn region_uvs_follow_flips() {
        let mut r = TextureRegion::new(ImageId(0), &source(), 16, 0, 16, 16);
        assert_eq!((r.u(), r.v(), r.u2(), r.v2()), (0.25, 0.0, 0.5, 0.5));
        r.flip(true, false);
        assert_eq!((r.u(), r.u2()), (0.5, 0.25));
        r.flip(true, true);
        assert_eq!((r.u(), r.v(), r.v2()), (0.25, 0.5, 0.0));
    }

    #[test]
    fn animation_walks_intervals_inclusively() {
        let region = TextureRegion::whole(ImageId(0), &source());
        let frame = |gid, d| AnimationFrame {
            gid,
            region,
            duration_ms: d,
        };
        let anim = TileAnimation::new(vec![frame(1, 100), frame(2, 200)]);
        assert_eq!(anim.loop_duration(), 300);
        assert_eq!(anim.frame_index(0), 0);
        assert_eq!(anim.frame_index(100), 0);
        assert_eq!(anim.frame_index(101), 1);
        assert_eq!(anim.frame_index(299), 1);
        assert_eq!(anim.frame_index(350), 0);
    }

    #[test]
    fn later_tilesets_shadow_earlier_ones() {
        let src = source();
        let mut a = TileSet::new("a", 1);
        a.put_tile(MapTile::new(1, TextureRegion::new(ImageId(0), &src, 0, 0, 16, 16)));
        let mut b = TileSet::new("b", 1);
        b.put_tile(MapTile::new(1, TextureRegion::new(ImageId(1), &src, 0, 0, 16, 16)));

        let mut sets = TileSets::default();
        sets.add(a);
        sets.add(b);
        assert_eq!(sets.get_tile(1).map(|t| t.region.image), Some(ImageId(1)));
        assert!(sets.get_tile(2).is_none());
    }
}
