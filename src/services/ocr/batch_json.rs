use std::time::Duration;

use anyhow::{bail, Context, Result};
use eframe::egui;
use serde::{Deserialize, Serialize};

use crate::{config::Config, image_file::ImageFile, services::ServiceJob};

use super::{
    endpoint, read_json, EngineListJob, EngineSelection, OcrResult, OcrService, OcrServiceJob,
};

/// Sends the image as base64 inside a JSON body and runs several engines in one request.
#[derive(Default)]
pub struct BatchJsonOcr {
    config: BatchJsonOcrConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchJsonOcrConfig {
    pub base_url: String,
    /// Engines offered as checkboxes. The server does not advertise them.
    pub engines: Vec<String>,
    pub use_gpu: bool,
    pub timeout_secs: u64,
}

impl Default for BatchJsonOcrConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_owned(),
            engines: ["easyocr", "tesseract", "paddleocr"]
                .map(str::to_owned)
                .to_vec(),
            use_gpu: false,
            timeout_secs: 300,
        }
    }
}

impl Config for BatchJsonOcrConfig {
    fn path() -> &'static str {
        "ocr_services/batch_json.json"
    }

    fn show_ui(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Server URL:");
            ui.text_edit_singleline(&mut self.base_url);
        });

        ui.horizontal(|ui| {
            ui.label("Engines (comma separated):");
            let mut engines = self.engines.join(", ");
            if ui.text_edit_singleline(&mut engines).changed() {
                self.engines = engines
                    .split(',')
                    .map(str::trim)
                    .filter(|engine| !engine.is_empty())
                    .map(str::to_owned)
                    .collect();
            }
        });

        ui.checkbox(&mut self.use_gpu, "Ask the server to use the GPU");

        ui.horizontal(|ui| {
            ui.label("Timeout (seconds):");
            ui.add(egui::DragValue::new(&mut self.timeout_secs).range(1..=3600));
        });
    }
}

#[derive(Serialize)]
struct OcrRequest<'a> {
    file: String,
    engines: &'a [String],
    use_gpu: bool,
}

#[derive(Deserialize)]
struct OcrResponse {
    results: Vec<OcrResult>,
}

impl OcrService for BatchJsonOcr {
    fn init(&mut self) -> Result<()> {
        self.config = BatchJsonOcrConfig::load()
            .context("Batch OCR: Failed to load configuration file")?;
        Ok(())
    }

    fn terminate(&mut self) -> Result<()> {
        self.config
            .save()
            .context("Batch OCR: Failed to save configuration file")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "Batch (JSON)"
    }

    fn show_config_ui(&mut self, ui: &mut egui::Ui) {
        self.config.show_ui(ui);
    }

    fn engine_selection(&self) -> EngineSelection {
        EngineSelection::Multiple
    }

    fn list_engines(&mut self) -> EngineListJob {
        ServiceJob::ready(Ok(self.config.engines.clone()))
    }

    fn recognize(&mut self, image: &ImageFile, engines: Vec<String>) -> OcrServiceJob {
        let url = endpoint(&self.config.base_url, "ocr");
        let timeout = Duration::from_secs(self.config.timeout_secs);
        let use_gpu = self.config.use_gpu;
        let image = image.clone();

        ServiceJob::new(move || {
            if engines.is_empty() {
                bail!("Batch OCR: No engine selected");
            }

            log::info!(
                "Batch OCR: Sending `{}` ({} bytes) to `{url}` for {engines:?}",
                image.name,
                image.bytes.len()
            );

            let response = attohttpc::post(&url)
                .timeout(timeout)
                .json(&OcrRequest {
                    file: image.to_base64(),
                    engines: &engines,
                    use_gpu,
                })
                .context("Batch OCR: Failed to serialise request")?
                .send()
                .with_context(|| format!("Batch OCR: Request to `{url}` failed"))?;

            let OcrResponse { results } =
                read_json(&url, response).context("Batch OCR: Text recognition failed")?;
            log::debug!("Batch OCR: Received {} result(s)", results.len());

            Ok(results)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        image_file::tests::png_file,
        services::ocr::{stub_server::StubServer, Outcome},
    };

    fn service(base_url: &str) -> BatchJsonOcr {
        BatchJsonOcr {
            config: BatchJsonOcrConfig {
                base_url: base_url.to_owned(),
                timeout_secs: 5,
                ..Default::default()
            },
        }
    }

    #[test]
    fn posts_base64_json_and_parses_results() {
        let server = StubServer::start(vec![(
            200,
            r#"{"results": [
                {"engine": "easyocr", "execution_time": 1.25, "text": "Hello"},
                {"engine": "tesseract", "error": "tesseract is not installed"}
            ]}"#,
        )]);
        let image = png_file();

        let results = service(&server.url)
            .recognize(&image, vec!["easyocr".to_owned(), "tesseract".to_owned()])
            .wait()
            .unwrap()
            .unwrap();

        let request = server.next_request();
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/ocr");
        assert!(request
            .header("content-type")
            .unwrap()
            .starts_with("application/json"));

        let body = request.json();
        assert_eq!(body["file"], image.to_base64());
        assert_eq!(body["engines"], serde_json::json!(["easyocr", "tesseract"]));
        assert_eq!(body["use_gpu"], false);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].outcome, Outcome::Text("Hello".to_owned()));
        assert_eq!(results[0].execution_time, Some(1.25));
        assert_eq!(
            results[1].outcome,
            Outcome::Error("tesseract is not installed".to_owned())
        );
    }

    #[test]
    fn server_errors_carry_status_and_body() {
        let server = StubServer::start(vec![(400, r#"{"detail": "cannot decode image"}"#)]);

        let err = service(&server.url)
            .recognize(&png_file(), vec!["easyocr".to_owned()])
            .wait()
            .unwrap()
            .unwrap_err();

        let message = format!("{err:#}");
        assert!(message.contains("400"), "{message}");
        assert!(message.contains("cannot decode image"), "{message}");
    }

    #[test]
    fn malformed_response_is_an_error() {
        let server = StubServer::start(vec![(200, r#"{"message": "Welcome"}"#)]);

        let err = service(&server.url)
            .recognize(&png_file(), vec!["easyocr".to_owned()])
            .wait()
            .unwrap()
            .unwrap_err();

        assert!(format!("{err:#}").contains("Malformed response"));
    }

    #[test]
    fn refuses_empty_engine_list() {
        let err = service("http://127.0.0.1:9")
            .recognize(&png_file(), Vec::new())
            .wait()
            .unwrap()
            .unwrap_err();

        assert!(err.to_string().contains("No engine selected"));
    }

    #[test]
    fn lists_configured_engines_without_a_request() {
        let engines = service("http://127.0.0.1:9")
            .list_engines()
            .wait()
            .unwrap()
            .unwrap();

        assert_eq!(engines, ["easyocr", "tesseract", "paddleocr"]);
    }
}
