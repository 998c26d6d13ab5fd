use super::{Batch, Quad};
use crate::config::TextureFilter;
use crate::error::MapError;
use crate::map::TiledMap;
use crate::tileset::ImageId;
use macroquad::models::{draw_mesh, Mesh, Vertex};
use macroquad::texture::{load_texture, FilterMode, Texture2D};
use std::collections::HashMap;
use tracing::{debug, warn};

// macroquad's default draw call holds at most 5000 indices
const MAX_QUADS: usize = 800;

/// [`Batch`] that draws through macroquad meshes, one draw call per texture run.
pub struct MacroquadBatch {
    textures: HashMap<ImageId, Texture2D>,
    current: Option<ImageId>,
    vertices: Vec<Vertex>,
    indices: Vec<u16>,
}

impl MacroquadBatch {
    /// Upload every image the map uses.
    pub async fn load(map: &TiledMap, filter: TextureFilter) -> Result<Self, MapError> {
        let mode = match filter {
            TextureFilter::Nearest => FilterMode::Nearest,
            TextureFilter::Linear => FilterMode::Linear,
        };
        let mut textures = HashMap::with_capacity(map.images().len());
        for (i, source) in map.images().iter().enumerate() {
            let path = source.path.to_string_lossy();
            let texture = load_texture(&path).await.map_err(|e| MapError::Texture {
                path: source.path.clone(),
                message: format!("{e:?}"),
            })?;
            texture.set_filter(mode);
            textures.insert(ImageId(i), texture);
        }
        debug!(textures = textures.len(), "uploaded map textures");
        Ok(Self::from_textures(textures))
    }

    /// Use textures uploaded elsewhere.
    pub fn from_textures(textures: HashMap<ImageId, Texture2D>) -> Self {
        MacroquadBatch {
            textures,
            current: None,
            vertices: Vec::with_capacity(MAX_QUADS * 4),
            indices: Vec::with_capacity(MAX_QUADS * 6),
        }
    }

    pub fn texture(&self, id: ImageId) -> Option<&Texture2D> {
        self.textures.get(&id)
    }

    fn flush(&mut self) {
        if self.indices.is_empty() {
            return;
        }
        let texture = self.current.and_then(|id| self.textures.get(&id)).cloned();
        let mesh = Mesh {
            vertices: std::mem::take(&mut self.vertices),
            indices: std::mem::take(&mut self.indices),
            texture,
        };
        draw_mesh(&mesh);
        self.vertices = mesh.vertices;
        self.indices = mesh.indices;
        self.vertices.clear();
        self.indices.clear();
    }
}

impl Batch for MacroquadBatch {
    fn begin(&mut self) {
        self.current = None;
        self.vertices.clear();
        self.indices.clear();
    }

    fn draw(&mut self, quad: &Quad) {
        if !self.textures.contains_key(&quad.image) {
            warn!(image = quad.image.0, "no texture uploaded for image");
            return;
        }
        if self.current != Some(quad.image) || self.vertices.len() >= MAX_QUADS * 4 {
            self.flush();
            self.current = Some(quad.image);
        }
        let base = self.vertices.len() as u16;
        for v in &quad.vertices {
            self.vertices
                .push(Vertex::new(v.position.x, v.position.y, 0.0, v.uv.x, v.uv.y, v.color));
        }
        self.indices
            .extend([0, 1, 2, 0, 2, 3].map(|i| base + i));
    }

    fn end(&mut self) {
        self.flush();
    }

    // macroquad's default pipeline always alpha-blends
}
