use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};

use crate::{
    image_file::ImageFile,
    services::{
        ocr::{EngineListJob, EngineSelection, OcrResult, OcrService},
        ServiceJob,
    },
};

/// A recognition request together with how long it took, measured when the service returned.
type TimedOcrJob = ServiceJob<(Duration, Result<Vec<OcrResult>>)>;

/// Everything the main window shows, independent of how it is drawn.
pub struct Session {
    image: Option<ImageFile>,
    /// Bumped on every selection change so the preview knows when to reload.
    image_generation: u64,

    pub picker: EnginePicker,
    engine_job: Option<EngineListJob>,

    recognition: Option<TimedOcrJob>,
    results: Vec<OcrResult>,
    round_trip: Option<Duration>,
}

impl Session {
    pub fn new(service: &mut dyn OcrService) -> Self {
        let mut session = Self {
            image: None,
            image_generation: 0,
            picker: EnginePicker::empty(service.engine_selection()),
            engine_job: None,
            recognition: None,
            results: Vec::new(),
            round_trip: None,
        };
        session.refresh_engines(service);
        session
    }

    pub fn image(&self) -> Option<&ImageFile> {
        self.image.as_ref()
    }

    pub fn image_generation(&self) -> u64 {
        self.image_generation
    }

    pub fn select_image(&mut self, image: ImageFile) {
        log::info!("Selected `{}` ({})", image.name, image.mime_type);
        self.image = Some(image);
        self.image_generation += 1;
    }

    pub fn clear_image(&mut self) {
        if self.image.take().is_some() {
            self.image_generation += 1;
        }
    }

    /// Ask the service for its engines again. Current choices are kept where the names still exist.
    pub fn refresh_engines(&mut self, service: &mut dyn OcrService) {
        if self.picker.selection() != service.engine_selection() {
            self.picker = EnginePicker::empty(service.engine_selection());
        }
        self.engine_job = Some(service.list_engines());
    }

    pub fn is_loading_engines(&self) -> bool {
        self.engine_job.is_some()
    }

    pub fn is_busy(&self) -> bool {
        self.recognition.is_some()
    }

    /// A request can only be made with an image, at least one engine, and nothing else in flight.
    pub fn can_submit(&self) -> bool {
        self.image.is_some() && !self.picker.chosen().is_empty() && !self.is_busy()
    }

    pub fn submit(&mut self, service: &mut dyn OcrService) -> Result<()> {
        if self.is_busy() {
            bail!("A recognition request is already running");
        }
        let Some(image) = &self.image else {
            bail!("Please select an image first");
        };
        let engines = self.picker.chosen();
        if engines.is_empty() {
            bail!("Please choose at least one OCR engine");
        }

        log::info!("Recognizing `{}` with {engines:?}", image.name);
        let started = Instant::now();
        let job = service.recognize(image, engines);
        self.recognition = Some(ServiceJob::new(move || {
            let results = job.wait().and_then(|results| results);
            (started.elapsed(), results)
        }));
        Ok(())
    }

    /// Move the values of finished jobs into the session.
    ///
    /// A failed request leaves the results of the previous one in place.
    pub fn poll(&mut self) -> Result<()> {
        self.poll_engines()?;
        self.poll_recognition()
    }

    fn poll_engines(&mut self) -> Result<()> {
        let Some(job) = &mut self.engine_job else {
            return Ok(());
        };
        let Some(finished) = job.try_wait().transpose() else {
            return Ok(());
        };
        self.engine_job = None;

        let engines = finished
            .and_then(|engines| engines)
            .context("Could not load the list of OCR engines")?;
        if engines.is_empty() {
            log::warn!("The OCR service offers no engines");
        }
        self.picker = self.picker.with_engines(engines);

        Ok(())
    }

    fn poll_recognition(&mut self) -> Result<()> {
        let Some(job) = &mut self.recognition else {
            return Ok(());
        };
        let Some(finished) = job.try_wait().transpose() else {
            return Ok(());
        };
        self.recognition = None;

        let (elapsed, results) = finished.context("Error while recognizing text")?;
        let results = results.context("Error while recognizing text")?;
        log::info!("Received {} result(s) after {elapsed:.2?}", results.len());

        self.results = results;
        self.round_trip = Some(elapsed);
        Ok(())
    }

    pub fn results(&self) -> &[OcrResult] {
        &self.results
    }

    /// How long the last successful request took, as seen by this client.
    pub fn round_trip(&self) -> Option<Duration> {
        self.round_trip
    }
}

/// The user's choice of OCR engines.
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePicker {
    /// Checkboxes, any number may be ticked.
    Multiple(Vec<(String, bool)>),
    /// A dropdown with one entry selected.
    Single {
        engines: Vec<String>,
        selected: Option<usize>,
    },
}

impl EnginePicker {
    pub fn empty(selection: EngineSelection) -> Self {
        match selection {
            EngineSelection::Multiple => Self::Multiple(Vec::new()),
            EngineSelection::Single => Self::Single {
                engines: Vec::new(),
                selected: None,
            },
        }
    }

    pub fn selection(&self) -> EngineSelection {
        match self {
            Self::Multiple(_) => EngineSelection::Multiple,
            Self::Single { .. } => EngineSelection::Single,
        }
    }

    /// Replace the list of engines. New engines start ticked; a dropdown falls back to its first entry.
    pub fn with_engines(&self, engines: Vec<String>) -> Self {
        match self {
            Self::Multiple(previous) => Self::Multiple(
                engines
                    .into_iter()
                    .map(|engine| {
                        let checked = previous
                            .iter()
                            .find(|(name, _)| *name == engine)
                            .map_or(true, |(_, checked)| *checked);
                        (engine, checked)
                    })
                    .collect(),
            ),
            Self::Single {
                engines: previous,
                selected,
            } => {
                let previous = selected.and_then(|idx| previous.get(idx));
                let selected = previous
                    .and_then(|name| engines.iter().position(|engine| engine == name))
                    .or(if engines.is_empty() { None } else { Some(0) });
                Self::Single { engines, selected }
            }
        }
    }

    /// The engines to send with the next request.
    pub fn chosen(&self) -> Vec<String> {
        match self {
            Self::Multiple(engines) => engines
                .iter()
                .filter(|(_, checked)| *checked)
                .map(|(engine, _)| engine.clone())
                .collect(),
            Self::Single { engines, selected } => selected
                .and_then(|idx| engines.get(idx))
                .cloned()
                .into_iter()
                .collect(),
        }
    }
}
