use std::{fmt, path::Path, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use eframe::egui;
use image::{ImageFormat, RgbaImage};
use mime_guess::mime;

/// An image file selected by the user, held in memory until it is sent to an OCR service.
#[derive(Clone)]
pub struct ImageFile {
    pub name: String,
    pub bytes: Arc<[u8]>,
    pub format: ImageFormat,
    pub mime_type: String,
}

impl fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageFile")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .field("format", &self.format)
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

impl ImageFile {
    /// Read an image file from disk.
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Could not read image file `{}`", path.display()))?;

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Self::from_bytes(name, bytes)
    }

    /// Build an `ImageFile` from a file dropped onto the window.
    ///
    /// Depending on the platform, egui either hands us the file's contents or only its path.
    pub fn from_dropped(file: &egui::DroppedFile) -> Result<Self> {
        match (&file.bytes, &file.path) {
            (Some(bytes), _) => Self::from_bytes(file.name.clone(), bytes.clone()),
            (None, Some(path)) => Self::open(path),
            (None, None) => Err(anyhow!(
                "Dropped file `{}` has neither contents nor a path",
                file.name
            )),
        }
    }

    /// Validate `bytes` as an image and work out its MIME type.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Result<Self> {
        let name = name.into();
        let bytes = bytes.into();

        if bytes.is_empty() {
            bail!("`{name}` is empty");
        }

        let format = image::guess_format(&bytes)
            .with_context(|| format!("`{name}` does not look like an image"))?;

        let mime_type = mime_guess::from_path(&name)
            .first()
            .filter(|guess| guess.type_() == mime::IMAGE)
            .map(|guess| guess.essence_str().to_owned())
            .unwrap_or_else(|| format.to_mime_type().to_owned());

        Ok(Self {
            name,
            bytes,
            format,
            mime_type,
        })
    }

    /// The raw bytes encoded as standard base64, without a `data:` URL prefix.
    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.bytes)
    }

    /// Decode the image for previewing.
    pub fn decode(&self) -> Result<RgbaImage> {
        let image = image::load_from_memory_with_format(&self.bytes, self.format)
            .with_context(|| format!("Could not decode `{}`", self.name))?;
        Ok(image.to_rgba8())
    }
}
