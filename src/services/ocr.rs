use anyhow::{bail, Context, Result};
use eframe::egui;
use serde::{de::DeserializeOwned, Deserialize};

use crate::image_file::ImageFile;

use super::ServiceJob;

pub mod batch_json;
pub mod multipart;

#[cfg(test)]
mod stub_server;

#[cfg(test)]
pub(crate) mod fake;

pub type EngineListJob = ServiceJob<Result<Vec<String>>>;
pub type OcrServiceJob = ServiceJob<Result<Vec<OcrResult>>>;

pub trait OcrService {
    /// Initialise the service (ie. load its configuration file, etc).
    fn init(&mut self) -> Result<()>;
    /// Terminate the service (ie. save its configuration file, etc).
    fn terminate(&mut self) -> Result<()>;

    fn name(&self) -> &'static str;

    /// Show the config UI for the service's configuration.
    fn show_config_ui(&mut self, ui: &mut egui::Ui);

    /// How many engines the user may pick for a single request.
    fn engine_selection(&self) -> EngineSelection;

    /// Fetch the names of the engines this service offers.
    fn list_engines(&mut self) -> EngineListJob;

    /// Run the given engines over an image, returning one result per engine.
    fn recognize(&mut self, image: &ImageFile, engines: Vec<String>) -> OcrServiceJob;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineSelection {
    /// Any non-empty subset of the engines.
    Multiple,
    /// Exactly one engine.
    Single,
}

/// What a single engine made of the image.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawOcrResult")]
pub struct OcrResult {
    pub engine: String,
    /// Seconds the server spent on this engine, if it told us.
    pub execution_time: Option<f64>,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Text(String),
    Error(String),
}

impl OcrResult {
    pub fn heading(&self) -> String {
        let time = self
            .execution_time
            .map(|secs| format!("{secs:.2} s"))
            .unwrap_or_else(|| "n/a".to_owned());
        format!("Engine: {} - Execution time: {time}", self.engine)
    }
}

/// A result as it appears on the wire: `{engine, execution_time, text | error}`.
#[derive(Deserialize)]
struct RawOcrResult {
    engine: String,
    execution_time: Option<f64>,
    text: Option<String>,
    error: Option<String>,
}

impl From<RawOcrResult> for OcrResult {
    fn from(raw: RawOcrResult) -> Self {
        let outcome = match (raw.text, raw.error) {
            (Some(text), _) if !text.is_empty() => Outcome::Text(text),
            (_, Some(error)) => Outcome::Error(error),
            (text, None) => Outcome::Text(text.unwrap_or_default()),
        };

        Self {
            engine: raw.engine,
            execution_time: raw.execution_time,
            outcome,
        }
    }
}

/// Join a configured base URL and an endpoint path.
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}

/// Check the status of a response and parse its JSON body.
pub(crate) fn read_json<T: DeserializeOwned>(url: &str, response: attohttpc::Response) -> Result<T> {
    if !response.is_success() {
        let status = response.status();
        let body = response.text().unwrap_or_default();
        bail!("`{url}` answered with {status}: {}", body.trim());
    }

    response
        .json()
        .with_context(|| format!("Malformed response from `{url}`"))
}
