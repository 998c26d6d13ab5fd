//! Reader for libGDX texture-atlas files.
//!
//! Both layouts are accepted: the legacy one with indented `xy:`/`size:`
//! lines and the compact one using `bounds:`. A blank line closes a page;
//! the next non-field line then names a new page image.

use crate::error::MapError;
use crate::loader::resolve_relative;
use std::path::{Path, PathBuf};

/// One image of an atlas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasPage {
    /// Image path, resolved against the atlas file
    pub image: PathBuf,
    /// Declared pixel size, 0 when the atlas omits it
    pub width: u32,
    pub height: u32,
}

/// A named rectangle on one atlas page.
#[derive(Debug, Clone, PartialEq)]
pub struct AtlasRegion {
    pub name: String,
    /// Index into [`TextureAtlas::pages`]
    pub page: usize,
    /// `-1` when the region is not part of an indexed sequence
    pub index: i32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub rotate: bool,
    pub offset_x: f32,
    pub offset_y: f32,
    pub original_width: u32,
    pub original_height: u32,
}

/// Pages and regions of a packed texture atlas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextureAtlas {
    pages: Vec<AtlasPage>,
    regions: Vec<AtlasRegion>,
}

impl TextureAtlas {
    /// Read and parse an atlas file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| MapError::io(path, source))?;
        Self::parse(&text, path)
    }

    /// Parse atlas text; page images resolve relative to `atlas_path`.
    pub fn parse(text: &str, atlas_path: &Path) -> Result<Self, MapError> {
        let mut atlas = TextureAtlas::default();
        let mut page_open = false;

        for (i, raw) in text.lines().enumerate() {
            let line = raw.trim();
            let line_no = i + 1;
            if line.is_empty() {
                page_open = false;
                continue;
            }

            let err = |message: String| MapError::Atlas {
                path: atlas_path.to_path_buf(),
                line: line_no,
                message,
            };

            match line.split_once(':') {
                Some((key, value)) => {
                    let key = key.trim();
                    let values: Vec<&str> = value.split(',').map(str::trim).collect();
                    if !page_open {
                        return Err(err(format!("field '{key}' outside of a page")));
                    }
                    match atlas.regions.last_mut() {
                        Some(region) if region.page + 1 == atlas.pages.len() => {
                            region_field(region, key, &values).map_err(err)?
                        }
                        _ => {
                            let page = atlas.pages.last_mut().ok_or_else(|| err("no page".into()))?;
                            page_field(page, key, &values).map_err(err)?
                        }
                    }
                }
                None if !page_open => {
                    atlas.pages.push(AtlasPage {
                        image: resolve_relative(atlas_path, line),
                        width: 0,
                        height: 0,
                    });
                    page_open = true;
                }
                None => atlas.regions.push(AtlasRegion {
                    name: line.to_owned(),
                    page: atlas.pages.len() - 1,
                    index: -1,
                    x: 0,
                    y: 0,
                    width: 0,
                    height: 0,
                    rotate: false,
                    offset_x: 0.0,
                    offset_y: 0.0,
                    original_width: 0,
                    original_height: 0,
                }),
            }
        }

        for region in &mut atlas.regions {
            if region.original_width == 0 && region.original_height == 0 {
                region.original_width = region.width;
                region.original_height = region.height;
            }
        }
        Ok(atlas)
    }

    pub fn pages(&self) -> &[AtlasPage] {
        &self.pages
    }

    pub fn regions(&self) -> &[AtlasRegion] {
        &self.regions
    }

    /// All regions called `name`, ordered by index.
    pub fn find_regions(&self, name: &str) -> Vec<&AtlasRegion> {
        let mut found: Vec<_> = self.regions.iter().filter(|r| r.name == name).collect();
        found.sort_by_key(|r| r.index);
        found
    }

    pub fn find_region(&self, name: &str) -> Option<&AtlasRegion> {
        self.regions.iter().find(|r| r.name == name)
    }
}

fn page_field(page: &mut AtlasPage, key: &str, values: &[&str]) -> Result<(), String> {
    // format, filter and repeat only matter to the texture backend
    if key == "size" {
        let [w, h] = numbers::<u32, 2>(key, values)?;
        page.width = w;
        page.height = h;
    }
    Ok(())
}

fn region_field(region: &mut AtlasRegion, key: &str, values: &[&str]) -> Result<(), String> {
    match key {
        "xy" => [region.x, region.y] = numbers(key, values)?,
        "size" => [region.width, region.height] = numbers(key, values)?,
        "bounds" => [region.x, region.y, region.width, region.height] = numbers(key, values)?,
        "orig" => [region.original_width, region.original_height] = numbers(key, values)?,
        "offset" => [region.offset_x, region.offset_y] = numbers(key, values)?,
        "offsets" => {
            let [x, y, w, h] = numbers(key, values)?;
            region.offset_x = x;
            region.offset_y = y;
            region.original_width = w as u32;
            region.original_height = h as u32;
        }
        "index" => [region.index] = numbers(key, values)?,
        "rotate" => {
            region.rotate = match values.first().copied() {
                Some("true") => true,
                Some("false") => false,
                Some(degrees) => {
                    let degrees: i32 = degrees
                        .parse()
                        .map_err(|_| format!("invalid rotate value '{degrees}'"))?;
                    matches!(degrees.rem_euclid(360), 90 | 270)
                }
                None => return Err("'rotate' needs a value".to_owned()),
            }
        }
        _ => {}
    }
    Ok(())
}

fn numbers<T: std::str::FromStr, const N: usize>(key: &str, values: &[&str]) -> Result<[T; N], String> {
    if values.len() < N {
        return Err(format!("'{key}' needs {N} values, found {}", values.len()));
    }
    let parsed: Vec<T> = values[..N]
        .iter()
        .map(|v| v.parse::<T>().map_err(|_| format!("'{key}' has a non-numeric value '{v}'")))
        .collect::<Result<_, _>>()?;
    parsed
        .try_into()
        .map_err(|_| format!("'{key}' needs {N} values"))
}
