use std::time::Duration;

use anyhow::{bail, Context, Result};
use attohttpc::{MultipartBuilder, MultipartFile};
use eframe::egui;
use serde::{Deserialize, Serialize};

use crate::{config::Config, image_file::ImageFile, services::ServiceJob};

use super::{
    endpoint, read_json, EngineListJob, EngineSelection, OcrResult, OcrService, OcrServiceJob,
};

/// Asks the server which engines it has, then uploads the image as a multipart form for one of them.
#[derive(Default)]
pub struct MultipartOcr {
    config: MultipartOcrConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MultipartOcrConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for MultipartOcrConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_owned(),
            timeout_secs: 300,
        }
    }
}

impl Config for MultipartOcrConfig {
    fn path() -> &'static str {
        "ocr_services/multipart.json"
    }

    fn show_ui(&mut self, ui: &mut egui::Ui) {
        ui.label("The engine list is fetched from the server.");
        ui.horizontal(|ui| {
            ui.label("Server URL:");
            ui.text_edit_singleline(&mut self.base_url);
        });
        ui.horizontal(|ui| {
            ui.label("Timeout (seconds):");
            ui.add(egui::DragValue::new(&mut self.timeout_secs).range(1..=3600));
        });
    }
}

#[derive(Deserialize)]
struct EngineListResponse {
    available_engines: Vec<String>,
}

#[derive(Deserialize)]
struct OcrResponse {
    result: OcrResult,
}

impl OcrService for MultipartOcr {
    fn init(&mut self) -> Result<()> {
        self.config = MultipartOcrConfig::load()
            .context("Multipart OCR: Failed to load configuration file")?;
        Ok(())
    }

    fn terminate(&mut self) -> Result<()> {
        self.config
            .save()
            .context("Multipart OCR: Failed to save configuration file")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "Single engine (multipart)"
    }

    fn show_config_ui(&mut self, ui: &mut egui::Ui) {
        self.config.show_ui(ui);
    }

    fn engine_selection(&self) -> EngineSelection {
        EngineSelection::Single
    }

    fn list_engines(&mut self) -> EngineListJob {
        let url = endpoint(&self.config.base_url, "GetOcrList");
        let timeout = Duration::from_secs(self.config.timeout_secs);

        ServiceJob::new(move || {
            log::debug!("Multipart OCR: Fetching engine list from `{url}`");

            let response = attohttpc::get(&url)
                .timeout(timeout)
                .send()
                .with_context(|| format!("Multipart OCR: Request to `{url}` failed"))?;

            let EngineListResponse { available_engines } = read_json(&url, response)
                .context("Multipart OCR: Could not fetch the list of engines")?;
            log::info!("Multipart OCR: Server offers {available_engines:?}");

            Ok(available_engines)
        })
    }

    fn recognize(&mut self, image: &ImageFile, engines: Vec<String>) -> OcrServiceJob {
        let url = endpoint(&self.config.base_url, "GetOcr");
        let timeout = Duration::from_secs(self.config.timeout_secs);
        let image = image.clone();

        ServiceJob::new(move || {
            let engine = match engines.as_slice() {
                [engine] => engine,
                [] => bail!("Multipart OCR: No engine selected"),
                _ => bail!(
                    "Multipart OCR: Exactly one engine can be used per request, got {engines:?}"
                ),
            };

            log::info!(
                "Multipart OCR: Uploading `{}` ({} bytes) to `{url}` for `{engine}`",
                image.name,
                image.bytes.len()
            );

            let file = MultipartFile::new("file", &image.bytes[..])
                .with_filename(&image.name)
                .with_type(&image.mime_type)
                .context("Multipart OCR: Invalid content type for upload")?;

            let form = MultipartBuilder::new()
                .with_text("engine", engine.as_str())
                .with_file(file)
                .build()
                .context("Multipart OCR: Failed to build upload form")?;

            let response = attohttpc::post(&url)
                .timeout(timeout)
                .body(form)
                .send()
                .with_context(|| format!("Multipart OCR: Request to `{url}` failed"))?;

            let OcrResponse { result } =
                read_json(&url, response).context("Multipart OCR: Text recognition failed")?;

            Ok(vec![result])
        })
    }
}
