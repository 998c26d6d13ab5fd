//! Map loaders for TMX and TMJ files.
//!
//! Parsing and construction are split: `tmx_loader` and `json_loader` read
//! a document into the intermediate form, then [`build`] resolves tiles and
//! converts coordinates. The two public loaders only differ in where tile
//! images come from.

mod build;
mod json_loader;
mod source;
mod tmx_loader;
mod xml;

pub use build::MapBuilder;
pub use source::{resolve_relative, AtlasTileSource, FileImageResolver, ImageResolver, ImageTileSource, TileSource};

use crate::atlas::TextureAtlas;
use crate::config::LoaderParams;
use crate::error::MapError;
use crate::ir_map::IrMap;
use crate::map::TiledMap;
use crate::properties::PropertyValue;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Map document format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapFormat {
    /// XML `.tmx`
    Tmx,
    /// JSON `.tmj` (or `.json`)
    Tmj,
}

impl MapFormat {
    pub fn from_path(path: &Path) -> Result<Self, MapError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("tmx") => Ok(MapFormat::Tmx),
            Some("tmj") | Some("json") => Ok(MapFormat::Tmj),
            _ => Err(MapError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

fn read_ir(path: &Path) -> Result<IrMap, MapError> {
    match MapFormat::from_path(path)? {
        MapFormat::Tmx => tmx_loader::decode_tmx_file_to_ir(path),
        MapFormat::Tmj => json_loader::decode_tmj_file_to_ir(path),
    }
}

/// Loads maps whose tilesets reference their own images.
///
/// ```no_run
/// use tiled_maps::TiledMapLoader;
///
/// let mut loader = TiledMapLoader::new();
/// let map = loader.load("assets/desert.tmx")?;
/// println!("{} layers", map.layers.len());
/// # Ok::<(), tiled_maps::MapError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TiledMapLoader<R: ImageResolver = FileImageResolver> {
    params: LoaderParams,
    resolver: R,
}

impl TiledMapLoader<FileImageResolver> {
    pub fn new() -> Self {
        Self::with_params(LoaderParams::default())
    }

    pub fn with_params(params: LoaderParams) -> Self {
        Self::with_resolver(params, FileImageResolver)
    }
}

impl Default for TiledMapLoader<FileImageResolver> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: ImageResolver> TiledMapLoader<R> {
    pub fn with_resolver(params: LoaderParams, resolver: R) -> Self {
        TiledMapLoader { params, resolver }
    }

    pub fn params(&self) -> &LoaderParams {
        &self.params
    }

    /// Load a `.tmx`, `.tmj` or `.json` map.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<TiledMap, MapError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading tiled map");
        let ir = read_ir(path)?;
        self.build(ir)
    }

    pub fn load_tmx(&mut self, path: impl AsRef<Path>) -> Result<TiledMap, MapError> {
        let ir = tmx_loader::decode_tmx_file_to_ir(path.as_ref())?;
        self.build(ir)
    }

    pub fn load_tmj(&mut self, path: impl AsRef<Path>) -> Result<TiledMap, MapError> {
        let ir = json_loader::decode_tmj_file_to_ir(path.as_ref())?;
        self.build(ir)
    }

    /// Load TMX text; `path` is where relative references are resolved from.
    pub fn load_tmx_str(&mut self, text: &str, path: impl AsRef<Path>) -> Result<TiledMap, MapError> {
        let ir = tmx_loader::decode_tmx_str_to_ir(text, path.as_ref())?;
        self.build(ir)
    }

    pub fn load_tmj_str(&mut self, text: &str, path: impl AsRef<Path>) -> Result<TiledMap, MapError> {
        let ir = json_loader::decode_tmj_str_to_ir(text, path.as_ref())?;
        self.build(ir)
    }

    /// Image files the map needs, without loading them.
    pub fn dependencies(&self, path: impl AsRef<Path>) -> Result<Vec<PathBuf>, MapError> {
        Ok(read_ir(path.as_ref())?.image_paths())
    }

    fn build(&mut self, ir: IrMap) -> Result<TiledMap, MapError> {
        build::build_map(ir, &self.params, &mut self.resolver, &mut ImageTileSource)
    }
}

/// Loads maps whose tiles all live in one texture atlas.
///
/// The map must carry an `atlas` property naming the atlas file, relative
/// to the map.
#[derive(Debug, Clone)]
pub struct AtlasMapLoader<R: ImageResolver = FileImageResolver> {
    params: LoaderParams,
    resolver: R,
}

impl AtlasMapLoader<FileImageResolver> {
    pub fn new() -> Self {
        Self::with_params(LoaderParams::default())
    }

    pub fn with_params(params: LoaderParams) -> Self {
        Self::with_resolver(params, FileImageResolver)
    }
}

impl Default for AtlasMapLoader<FileImageResolver> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: ImageResolver> AtlasMapLoader<R> {
    pub fn with_resolver(params: LoaderParams, resolver: R) -> Self {
        AtlasMapLoader { params, resolver }
    }

    pub fn params(&self) -> &LoaderParams {
        &self.params
    }

    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<TiledMap, MapError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading atlas-backed tiled map");
        let ir = read_ir(path)?;
        self.build(ir, path)
    }

    pub fn load_tmx(&mut self, path: impl AsRef<Path>) -> Result<TiledMap, MapError> {
        let path = path.as_ref();
        let ir = tmx_loader::decode_tmx_file_to_ir(path)?;
        self.build(ir, path)
    }

    pub fn load_tmj(&mut self, path: impl AsRef<Path>) -> Result<TiledMap, MapError> {
        let path = path.as_ref();
        let ir = json_loader::decode_tmj_file_to_ir(path)?;
        self.build(ir, path)
    }

    /// Atlas files named by map properties starting with `atlas`.
    pub fn dependencies(&self, path: impl AsRef<Path>) -> Result<Vec<PathBuf>, MapError> {
        let path = path.as_ref();
        let ir = read_ir(path)?;
        let mut out: Vec<PathBuf> = Vec::new();
        for (name, value) in ir.properties.iter() {
            if let (true, PropertyValue::String(file)) = (name.starts_with("atlas"), value) {
                let resolved = resolve_relative(path, file);
                if !file.is_empty() && !out.contains(&resolved) {
                    out.push(resolved);
                }
            }
        }
        if out.is_empty() {
            return Err(MapError::MissingAtlas);
        }
        Ok(out)
    }

    fn build(&mut self, ir: IrMap, path: &Path) -> Result<TiledMap, MapError> {
        let atlas_path = match ir.properties.get_string("atlas") {
            Some(file) if !file.is_empty() => resolve_relative(path, file),
            _ => return Err(MapError::MissingAtlas),
        };
        let atlas = TextureAtlas::load(&atlas_path)?;
        debug!(
            atlas = %atlas_path.display(),
            pages = atlas.pages().len(),
            regions = atlas.regions().len(),
            "loaded texture atlas"
        );
        let mut source = AtlasTileSource::new(atlas, atlas_path);
        build::build_map(ir, &self.params, &mut self.resolver, &mut source)
    }
}
