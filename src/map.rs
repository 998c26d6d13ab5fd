use crate::layer::{LayerKind, MapLayer, TileLayer};
use crate::object::MapObject;
use crate::properties::Properties;
use crate::tileset::{ImageId, ImageSource, MapTile, TileSets};

/// A fully loaded Tiled map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TiledMap {
    /// Width in tiles
    pub width: u32,
    /// Height in tiles
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    /// Built-in map attributes plus custom properties
    pub properties: Properties,
    pub tilesets: TileSets,
    /// Draw order: array order, groups depth-first
    pub layers: Vec<MapLayer>,
    pub(crate) images: Vec<ImageSource>,
}

impl TiledMap {
    /// Every image the map draws from, indexed by [`ImageId`].
    pub fn images(&self) -> &[ImageSource] {
        &self.images
    }

    pub fn image(&self, id: ImageId) -> Option<&ImageSource> {
        self.images.get(id.0)
    }

    pub fn tile(&self, gid: u32) -> Option<&MapTile> {
        self.tilesets.get_tile(gid)
    }

    /// All layers, parents before their children.
    pub fn all_layers(&self) -> Vec<&MapLayer> {
        fn walk<'m>(layers: &'m [MapLayer], out: &mut Vec<&'m MapLayer>) {
            for layer in layers {
                out.push(layer);
                walk(layer.children(), out);
            }
        }
        let mut out = Vec::new();
        walk(&self.layers, &mut out);
        out
    }

    /// First layer with this name, searching into groups.
    pub fn layer_by_name(&self, name: &str) -> Option<&MapLayer> {
        self.all_layers().into_iter().find(|l| l.name == name)
    }

    pub fn tile_layers(&self) -> Vec<(&MapLayer, &TileLayer)> {
        self.all_layers()
            .into_iter()
            .filter_map(|l| l.as_tiles().map(|t| (l, t)))
            .collect()
    }

    pub fn object_layers(&self) -> Vec<&MapLayer> {
        self.all_layers()
            .into_iter()
            .filter(|l| matches!(l.kind, LayerKind::Objects(_)))
            .collect()
    }

    /// Objects of every object layer, in draw order.
    pub fn objects(&self) -> impl Iterator<Item = &MapObject> {
        self.object_layers().into_iter().flat_map(|l| l.objects())
    }

    /// Resolves `object` typed properties.
    pub fn object_by_id(&self, id: u32) -> Option<&MapObject> {
        if id == 0 {
            return None;
        }
        self.objects().find(|o| o.id == id)
    }

    pub fn pixel_width(&self) -> u64 {
        u64::from(self.width) * u64::from(self.tile_width)
    }

    pub fn pixel_height(&self) -> u64 {
        u64::from(self.height) * u64::from(self.tile_height)
    }
}
