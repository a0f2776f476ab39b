//! Collaborators the loader consumes: sibling document lookup and image sizes.

use crate::error::MapError;
use macroquad::math::Rect;
use macroquad::texture::Image;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A rectangular region of an image, in pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureRegion {
    /// Resolved path of the image the region belongs to.
    pub image: PathBuf,
    /// Region inside the image.
    pub rect: Rect,
}

impl TextureRegion {
    /// Region covering a whole `width` x `height` image.
    pub fn whole(image: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        TextureRegion {
            image: image.into(),
            rect: Rect::new(0.0, 0.0, width as f32, height as f32),
        }
    }

    /// Sub-region of this region's image.
    pub fn sub(&self, x: u32, y: u32, width: u32, height: u32) -> Self {
        TextureRegion {
            image: self.image.clone(),
            rect: Rect::new(
                self.rect.x + x as f32,
                self.rect.y + y as f32,
                width as f32,
                height as f32,
            ),
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> f32 {
        self.rect.w
    }

    /// Height in pixels.
    pub fn height(&self) -> f32 {
        self.rect.h
    }
}

/// Resolves image paths to texture regions.
pub trait ImageResolver {
    /// Region covering the whole image at `path`.
    fn image(&self, path: &Path) -> Result<TextureRegion, MapError>;
}

/// Resolves documents referenced from a map (external tilesets, project files).
pub trait FileResolver {
    /// Path of `relative`, interpreted next to `base` (a file).
    fn resolve(&self, base: &Path, relative: &str) -> PathBuf {
        base.parent()
            .map(|dir| dir.join(relative))
            .unwrap_or_else(|| PathBuf::from(relative))
    }

    /// Text content of the document at `path`.
    fn read_to_string(&self, path: &Path) -> Result<String, MapError>;
}

/// Reads documents from disk and decodes image headers through Macroquad.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsResolver;

impl FileResolver for FsResolver {
    fn read_to_string(&self, path: &Path) -> Result<String, MapError> {
        std::fs::read_to_string(path).map_err(|source| MapError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl ImageResolver for FsResolver {
    fn image(&self, path: &Path) -> Result<TextureRegion, MapError> {
        let bytes = std::fs::read(path).map_err(|source| MapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let image = Image::from_file_with_format(&bytes, None).map_err(|e| MapError::Image {
            path: path.to_path_buf(),
            message: format!("{e:?}"),
        })?;
        Ok(TextureRegion::whole(
            path,
            image.width() as u32,
            image.height() as u32,
        ))
    }
}

/// In-memory documents and image sizes, for maps that do not live on disk.
#[derive(Debug, Clone, Default)]
pub struct MemoryResolver {
    files: HashMap<PathBuf, String>,
    images: HashMap<PathBuf, (u32, u32)>,
}

impl MemoryResolver {
    /// Empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document.
    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.files.insert(path.into(), contents.into());
        self
    }

    /// Register an image of the given pixel size.
    pub fn with_image(mut self, path: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        self.images.insert(path.into(), (width, height));
        self
    }
}

impl FileResolver for MemoryResolver {
    fn read_to_string(&self, path: &Path) -> Result<String, MapError> {
        self.files.get(path).cloned().ok_or_else(|| MapError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such document"),
        })
    }
}

impl ImageResolver for MemoryResolver {
    fn image(&self, path: &Path) -> Result<TextureRegion, MapError> {
        let (w, h) = self.images.get(path).copied().ok_or_else(|| MapError::Image {
            path: path.to_path_buf(),
            message: "no such image".to_owned(),
        })?;
        Ok(TextureRegion::whole(path, w, h))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_to_the_base_file() {
        let r = MemoryResolver::new();
        assert_eq!(
            r.resolve(Path::new("maps/level.tmx"), "tiles.tsx"),
            PathBuf::from("maps/tiles.tsx")
        );
        assert_eq!(
            r.resolve(Path::new("maps/level.tmx"), "../img/a.png"),
            PathBuf::from("maps/../img/a.png")
        );
    }

    #[test]
    fn memory_resolver_reports_missing_entries() {
        let r = MemoryResolver::new().with_image("a.png", 32, 16);
        assert_eq!(r.image(Path::new("a.png")).expect("image").height(), 16.0);
        assert!(matches!(r.image(Path::new("b.png")), Err(MapError::Image { .. })));
        assert!(matches!(r.read_to_string(Path::new("x.tsx")), Err(MapError::Io { .. })));
    }

    #[test]
    fn sub_regions_are_offset_from_the_parent() {
        let whole = TextureRegion::whole("a.png", 64, 64);
        let sub = whole.sub(16, 32, 16, 16);
        assert_eq!(sub.rect, Rect::new(16.0, 32.0, 16.0, 16.0));
        assert_eq!(sub.image, PathBuf::from("a.png"));
    }
}
