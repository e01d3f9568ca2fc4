// Image loading module
// Decodes image files into display-ready pixel buffers on background threads

use crate::coordinator::Event;
use crate::geometry::Size;
use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat};
use log::{debug, error};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Decoded image data ready for display
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Raw BGRA pixel data (4 bytes per pixel, Wayland ARGB8888 in little-endian)
    pub bgra_data: Vec<u8>,
}

impl ImageData {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Shared handle to decoded pixels, passed between the coordinator and the surface
pub type Displayable = Arc<ImageData>;

/// Outcome of one load request. `image` is `None` when reading or decoding failed.
#[derive(Debug, Clone)]
pub struct LoadResult {
    pub slot: usize,
    pub image: Option<Displayable>,
    pub width: u32,
    pub height: u32,
    pub name: String,
}

impl LoadResult {
    fn failed(slot: usize, name: String) -> Self {
        Self {
            slot,
            image: None,
            width: 0,
            height: 0,
            name,
        }
    }
}

/// Starts loads for the coordinator. Completion is reported through the
/// coordinator's intake, never through the return value.
pub trait ImageLoader {
    fn request_load(&mut self, slot: usize, path: &Path);
}

/// Loader that decodes every requested image on its own thread
pub struct ThreadLoader {
    intake: Sender<Event>,
}

impl ThreadLoader {
    pub fn new(intake: Sender<Event>) -> Self {
        Self { intake }
    }
}

impl ImageLoader for ThreadLoader {
    fn request_load(&mut self, slot: usize, path: &Path) {
        let intake = self.intake.clone();
        let path = path.to_path_buf();
        let name = display_name(&path);

        let spawned = thread::Builder::new()
            .name(format!("loader-{}", slot))
            .spawn({
                let name = name.clone();
                move || {
                    let result = match load_file(&path) {
                        Ok(image) => LoadResult {
                            slot,
                            width: image.width,
                            height: image.height,
                            image: Some(Arc::new(image)),
                            name,
                        },
                        Err(e) => {
                            error!("{:#}", e);
                            LoadResult::failed(slot, name)
                        }
                    };
                    if intake.send(Event::LoadCompleted(result)).is_err() {
                        debug!("Coordinator gone before slot {} finished loading", slot);
                    }
                }
            });

        // A slot whose thread never started still has to leave Loading
        if let Err(e) = spawned {
            error!("Failed to spawn loader thread for slot {}: {}", slot, e);
            let result = LoadResult::failed(slot, name);
            if self.intake.send(Event::LoadCompleted(result)).is_err() {
                debug!("Coordinator gone, dropping failure of slot {}", slot);
            }
        }
    }
}

/// Read and decode an image file
pub fn load_file(path: &Path) -> Result<ImageData> {
    let start = Instant::now();
    let data = fs::read(path)
        .with_context(|| format!("Failed to read image file: {}", path.display()))?;
    let (img, format) = load_from_bytes(&data)
        .with_context(|| format!("Could not decode '{}'", path.display()))?;
    debug!(
        "Decoded '{}' as {:?} in {:?}",
        path.display(),
        format,
        start.elapsed()
    );
    Ok(to_display_data(img))
}

/// Convert a decoded image into BGRA pixels
pub fn to_display_data(img: DynamicImage) -> ImageData {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    // Wayland expects ARGB in little-endian, i.e. BGRA in memory
    let mut bgra_data = rgba.into_raw();
    for pixel in bgra_data.chunks_exact_mut(4) {
        pixel.swap(0, 2);
    }

    ImageData {
        width,
        height,
        bgra_data,
    }
}

/// Load an image from raw bytes, auto-detecting the format
fn load_from_bytes(data: &[u8]) -> Result<(DynamicImage, ImageFormat)> {
    let format = image::guess_format(data).context("Failed to detect image format")?;

    let cursor = Cursor::new(data);
    let img = image::load(cursor, format).context("Failed to decode image")?;

    Ok((img, format))
}

/// Get the appropriate image format from file extension
pub fn format_from_extension(ext: &str) -> Option<ImageFormat> {
    match ext.to_lowercase().as_str() {
        "png" => Some(ImageFormat::Png),
        "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
        "gif" => Some(ImageFormat::Gif),
        "webp" => Some(ImageFormat::WebP),
        "bmp" => Some(ImageFormat::Bmp),
        "ico" => Some(ImageFormat::Ico),
        "tiff" | "tif" => Some(ImageFormat::Tiff),
        _ => None,
    }
}

/// Title-friendly name of an image file: its base name
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// A file queued for display: where to load it from and what to call it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSource {
    pub path: PathBuf,
    pub name: String,
}

impl ImageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = display_name(&path);
        Self { path, name }
    }
}
