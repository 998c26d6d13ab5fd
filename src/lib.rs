//! Tiled map loading and orthogonal rendering for Macroquad.
//!
//! [`TiledMapLoader`] reads TMX and TMJ maps into a [`TiledMap`], slicing
//! tileset images into regions; [`AtlasMapLoader`] takes regions from a
//! texture atlas named by the map's `atlas` property instead. Rendering goes
//! through [`render::BatchRenderer`] or [`render::CachedRenderer`] into any
//! [`render::Batch`], with [`render::MacroquadBatch`] drawing on screen.
//!
//! ```no_run
//! use tiled_maps::render::{CachedRenderer, MacroquadBatch, MapRenderer};
//! use tiled_maps::TiledMapLoader;
//! use macroquad::math::Rect;
//!
//! # async fn frame() -> Result<(), tiled_maps::MapError> {
//! let map = TiledMapLoader::new().load("assets/desert.tmx")?;
//! let mut batch = MacroquadBatch::load(&map, Default::default()).await?;
//! let mut renderer = CachedRenderer::with_unit_scale(&map, 1.0 / 16.0);
//! renderer.set_view(Rect::new(0.0, 0.0, 20.0, 15.0));
//! renderer.render(&mut batch);
//! # Ok(())
//! # }
//! ```

pub mod atlas;
mod config;
pub mod decode;
mod error;
pub mod gid;
pub mod ir_map;
mod layer;
pub mod loader;
mod map;
mod object;
mod properties;
pub mod render;
mod tileset;

pub use atlas::{AtlasPage, AtlasRegion, TextureAtlas};
pub use config::{LoaderParams, TextureFilter};
pub use error::{MapError, TileDataError};
pub use gid::{Cell, Rotation, TileId};
pub use layer::{ImageLayer, LayerKind, MapLayer, TileLayer};
pub use loader::{AtlasMapLoader, MapFormat, TiledMapLoader};
pub use map::TiledMap;
pub use object::{MapObject, ObjectShape, TileObject};
pub use properties::{parse_color, Properties, PropertyValue};
pub use tileset::{
    AnimationFrame, ImageId, ImageSource, MapTile, TextureRegion, TileAnimation, TileSet, TileSets,
};
