//! Where tile regions come from: sliced tileset images or a texture atlas.

use super::build::MapBuilder;
use crate::atlas::TextureAtlas;
use crate::error::MapError;
use crate::ir_map::IrTileset;
use crate::properties::PropertyValue;
use crate::tileset::{ImageId, TextureRegion, TileSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Resolve `path` against the directory containing `file`.
///
/// Both `/` and `\` separate components; `..` walks up one directory.
pub fn resolve_relative(file: &Path, path: &str) -> PathBuf {
    if Path::new(path).is_absolute() {
        return PathBuf::from(path);
    }
    let mut out = file.parent().map(Path::to_path_buf).unwrap_or_default();
    for token in path.split(['/', '\\']) {
        match token {
            "" | "." => {}
            ".." => {
                if out.file_name().is_some() {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            name => out.push(name),
        }
    }
    out
}

/// Supplies the pixel size of images the map does not declare one for.
pub trait ImageResolver {
    fn image_size(&mut self, path: &Path) -> Result<(u32, u32), MapError>;
}

/// Reads image headers from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileImageResolver;

impl ImageResolver for FileImageResolver {
    fn image_size(&mut self, path: &Path) -> Result<(u32, u32), MapError> {
        image::image_dimensions(path).map_err(|source| MapError::Image {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Fills a tileset with its static tiles.
pub trait TileSource {
    fn add_static_tiles(
        &mut self,
        builder: &mut MapBuilder<'_>,
        ir: &IrTileset,
        tileset: &mut TileSet,
    ) -> Result<(), MapError>;
}

/// Tiles cut from the tileset's own image, or one image per tile.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageTileSource;

impl TileSource for ImageTileSource {
    fn add_static_tiles(
        &mut self,
        builder: &mut MapBuilder<'_>,
        ir: &IrTileset,
        tileset: &mut TileSet,
    ) -> Result<(), MapError> {
        let Some(image) = &ir.image else {
            for meta in &ir.tiles {
                let Some(img) = &meta.image else { continue };
                let id = builder.image(img)?;
                let region = TextureRegion::whole(id, builder.image_source(id));
                tileset.put_tile(builder.static_tile(ir, ir.gid(meta.id)?, region));
            }
            return Ok(());
        };

        if ir.tile_w == 0 || ir.tile_h == 0 {
            return Err(MapError::InvalidMap(format!(
                "tileset '{}' has a zero tile size",
                ir.name
            )));
        }
        let id = builder.image(image)?;
        let source = builder.image_source(id).clone();
        put_image_properties(tileset, ir, &image.source, source.width, source.height);

        let stop_w = source.width as i64 - ir.tile_w as i64;
        let stop_h = source.height as i64 - ir.tile_h as i64;
        let step_x = ir.tile_w.saturating_add(ir.spacing) as usize;
        let step_y = ir.tile_h.saturating_add(ir.spacing) as usize;

        let mut local = 0;
        for y in (ir.margin as i64..=stop_h).step_by(step_y) {
            for x in (ir.margin as i64..=stop_w).step_by(step_x) {
                let region = TextureRegion::new(id, &source, x as u32, y as u32, ir.tile_w, ir.tile_h);
                tileset.put_tile(builder.static_tile(ir, ir.gid(local)?, region));
                local += 1;
            }
        }
        Ok(())
    }
}

/// Tiles taken from one shared texture atlas.
///
/// Regions are looked up by tileset name, then by the atlas file stem; a
/// region's `index` is its local tile id.
#[derive(Debug, Clone)]
pub struct AtlasTileSource {
    atlas: TextureAtlas,
    atlas_path: PathBuf,
    pages: Option<Vec<ImageId>>,
}

impl AtlasTileSource {
    pub fn new(atlas: TextureAtlas, atlas_path: impl Into<PathBuf>) -> Self {
        AtlasTileSource {
            atlas,
            atlas_path: atlas_path.into(),
            pages: None,
        }
    }

    fn page_ids(&mut self, builder: &mut MapBuilder<'_>) -> Result<Vec<ImageId>, MapError> {
        if let Some(ids) = &self.pages {
            return Ok(ids.clone());
        }
        let ids = self
            .atlas
            .pages()
            .iter()
            .map(|page| builder.register_image(&page.image, page.width, page.height))
            .collect::<Result<Vec<_>, _>>()?;
        self.pages = Some(ids.clone());
        Ok(ids)
    }
}

impl TileSource for AtlasTileSource {
    fn add_static_tiles(
        &mut self,
        builder: &mut MapBuilder<'_>,
        ir: &IrTileset,
        tileset: &mut TileSet,
    ) -> Result<(), MapError> {
        let pages = self.page_ids(builder)?;
        if let Some(image) = &ir.image {
            put_image_properties(tileset, ir, &image.source, image.width, image.height);
        }

        let mut regions = self.atlas.find_regions(&ir.name);
        if regions.is_empty() {
            let stem = self
                .atlas_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            regions = self.atlas.find_regions(&stem);
        }
        if regions.is_empty() {
            warn!(tileset = %ir.name, atlas = %self.atlas_path.display(), "no atlas regions for tileset");
        }

        for region in regions {
            if region.index < 0 {
                continue;
            }
            if region.rotate {
                warn!(region = %region.name, index = region.index, "rotated atlas regions are drawn unrotated");
            }
            let Some(&id) = pages.get(region.page) else { continue };
            let mut tex = TextureRegion::new(id, builder.image_source(id), region.x, region.y, region.width, region.height);
            if !builder.params().flip_y {
                tex.flip(false, true);
            }
            let gid = ir.gid(region.index as u32)?;
            tileset.put_tile(builder.static_tile(ir, gid, tex));
        }
        debug!(tileset = %ir.name, tiles = tileset.len(), "tiles taken from atlas");
        Ok(())
    }
}

fn put_image_properties(tileset: &mut TileSet, ir: &IrTileset, source: &str, width: u32, height: u32) {
    let props = &mut tileset.properties;
    props.insert("imagesource", PropertyValue::String(source.to_owned()));
    props.insert("imagewidth", PropertyValue::I64(width as i64));
    props.insert("imageheight", PropertyValue::I64(height as i64));
    props.insert("tilewidth", PropertyValue::I64(ir.tile_w as i64));
    props.insert("tileheight", PropertyValue::I64(ir.tile_h as i64));
    props.insert("margin", PropertyValue::I64(ir.margin as i64));
    props.insert("spacing", PropertyValue::I64(ir.spacing as i64));
}
