use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use anyhow::{anyhow, Result};
use eframe::egui;

use crate::{image_file::ImageFile, services::ServiceJob};

use super::{EngineListJob, EngineSelection, OcrResult, OcrService, OcrServiceJob, Outcome};

/// Answers instantly with canned values and remembers what it was asked.
pub struct FakeOcr {
    pub selection: EngineSelection,
    pub engines: Result<Vec<String>, String>,
    pub response: Result<Vec<OcrResult>, String>,
    pub requests: Arc<Mutex<Vec<Vec<String>>>>,
    pub terminations: Arc<AtomicUsize>,
}

impl FakeOcr {
    pub fn new(selection: EngineSelection) -> Self {
        Self {
            selection,
            engines: Ok(vec!["easyocr".to_owned(), "tesseract".to_owned()]),
            response: Ok(vec![OcrResult {
                engine: "easyocr".to_owned(),
                execution_time: Some(2.0),
                outcome: Outcome::Text("hello".to_owned()),
            }]),
            requests: Default::default(),
            terminations: Default::default(),
        }
    }
}

impl OcrService for FakeOcr {
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    fn terminate(&mut self) -> Result<()> {
        self.terminations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake"
    }

    fn show_config_ui(&mut self, _ui: &mut egui::Ui) {}

    fn engine_selection(&self) -> EngineSelection {
        self.selection
    }

    fn list_engines(&mut self) -> EngineListJob {
        ServiceJob::ready(self.engines.clone().map_err(|e| anyhow!(e)))
    }

    fn recognize(&mut self, _image: &ImageFile, engines: Vec<String>) -> OcrServiceJob {
        self.requests.lock().unwrap().push(engines);
        ServiceJob::ready(self.response.clone().map_err(|e| anyhow!(e)))
    }
}
