use crate::error::MapError;
use serde::Deserialize;
use std::path::Path;

/// Texture sampling used when a backend uploads map images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextureFilter {
    /// Pixel-exact sampling, the usual choice for tile art
    #[default]
    Nearest,
    /// Bilinear sampling
    Linear,
}

/// Parameters shared by every map loader.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoaderParams {
    /// Flip all Y coordinates so that +Y is up. The renderers assume this.
    pub flip_y: bool,
    /// Convert object positions and sizes from pixels to tile units.
    pub convert_object_to_tile_space: bool,
    /// Filter applied to uploaded textures.
    pub texture_filter: TextureFilter,
}

impl Default for LoaderParams {
    fn default() -> Self {
        Self {
            flip_y: true,
            convert_object_to_tile_space: false,
            texture_filter: TextureFilter::Nearest,
        }
    }
}

impl LoaderParams {
    /// Parse parameters from TOML; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, MapError> {
        Ok(toml::from_str(text)?)
    }

    /// Read parameters from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| MapError::io(path, source))?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let params = LoaderParams::from_toml_str("").expect("parse");
        assert_eq!(params, LoaderParams::default());
        assert!(params.flip_y);
    }

    #[test]
    fn partial_toml_overrides_only_given_keys() {
        let params = LoaderParams::from_toml_str(
            "flip_y = false\ntexture_filter = \"linear\"\n",
        )
        .expect("parse");
        assert!(!params.flip_y);
        assert!(!params.convert_object_to_tile_space);
        assert_eq!(params.texture_filter, TextureFilter::Linear);
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        let err = LoaderParams::from_toml_str("flip_y = \"yes\"").unwrap_err();
        assert!(matches!(err, MapError::Config(_)));
    }
}
