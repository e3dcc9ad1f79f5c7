use std::{
    fs::File,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use eframe::egui;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::services::ocr::{batch_json::BatchJsonOcr, multipart::MultipartOcr, OcrService};

/// A configuration file stored in the user's configuration directory.
pub trait Config: Serialize + DeserializeOwned + Default {
    /// Path of the file, relative to this program's configuration directory.
    fn path() -> &'static str;
    /// Show the UI for editing this configuration.
    fn show_ui(&mut self, ui: &mut egui::Ui);

    /// Full path of the configuration file.
    fn config_path() -> Result<PathBuf> {
        let mut config_path = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not find suitable config directory"))?;
        config_path.push(env!("CARGO_PKG_NAME"));
        config_path.push(Self::path());
        Ok(config_path)
    }

    /// Loads the configuration file, or creates a default configuration struct if the file does not exist.
    fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            log::debug!(
                "No configuration file at `{}`, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let file = File::open(config_path).with_context(|| {
            format!(
                "Could not open configuration file: `{}`",
                config_path.display()
            )
        })?;

        serde_json::from_reader(file).with_context(|| {
            format!(
                "Could not read configuration file: `{}`",
                config_path.display(),
            )
        })
    }

    fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(config_dir) = config_path.parent() {
            std::fs::create_dir_all(config_dir).with_context(|| {
                format!(
                    "Could not create configuration directory: `{}`",
                    config_dir.display()
                )
            })?;
        }

        let file = File::create(config_path).with_context(|| {
            format!(
                "Could not write to configuration file: `{}`",
                config_path.display()
            )
        })?;

        serde_json::to_writer_pretty(file, self).with_context(|| {
            format!(
                "Could not serialise configuration file: `{}`",
                config_path.display()
            )
        })?;

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ocr_service: OcrServiceList,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ocr_service: OcrServiceList::BatchJson,
            window_width: 1024,
            window_height: 768,
        }
    }
}

impl Config for AppConfig {
    fn path() -> &'static str {
        "config.json"
    }

    fn show_ui(&mut self, ui: &mut egui::Ui) {
        egui::ComboBox::from_label("OCR Service")
            .selected_text(self.ocr_service.name())
            .show_ui(ui, |ui| {
                for service in OcrServiceList::ALL {
                    ui.selectable_value(&mut self.ocr_service, service, service.name());
                }
            });
        ui.label("Changing the service takes effect after reloading services.");

        ui.horizontal(|ui| {
            ui.label("Window size:");
            ui.add(egui::DragValue::new(&mut self.window_width).range(320..=7680));
            ui.label("x");
            ui.add(egui::DragValue::new(&mut self.window_height).range(240..=4320));
        });
    }
}

/// The OCR services this program can talk to.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum OcrServiceList {
    /// Several engines per request, image sent as base64 inside a JSON body.
    BatchJson,
    /// One engine per request chosen from a server-provided list, image uploaded as a multipart form.
    Multipart,
}

impl OcrServiceList {
    pub const ALL: [Self; 2] = [Self::BatchJson, Self::Multipart];

    pub fn name(&self) -> &'static str {
        match self {
            Self::BatchJson => "Batch (JSON)",
            Self::Multipart => "Single engine (multipart)",
        }
    }

    pub fn create_service(&self) -> Box<dyn OcrService> {
        match self {
            Self::BatchJson => Box::new(BatchJsonOcr::default()),
            Self::Multipart => Box::new(MultipartOcr::default()),
        }
    }
}
