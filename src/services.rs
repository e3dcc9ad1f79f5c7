use std::thread::JoinHandle;

use anyhow::{anyhow, Result};
use ocr::OcrService;

use crate::config::AppConfig;

pub mod ocr;

/// Holds instanciated services.
pub struct Services {
    pub ocr: Box<dyn OcrService>,
    terminated: bool,
}

impl Services {
    /// Create a new `Services` from the services specified in the given `AppConfig`.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let mut services = Self::from_service(config.ocr_service.create_service());

        services.ocr.init()?;
        log::info!("Using OCR service `{}`", services.ocr.name());

        Ok(services)
    }

    fn from_service(ocr: Box<dyn OcrService>) -> Self {
        Self {
            ocr,
            terminated: false,
        }
    }

    /// Terminate the services now instead of when they are dropped.
    pub fn terminate(&mut self) -> Result<()> {
        self.terminated = true;
        self.ocr.terminate()
    }
}

impl Drop for Services {
    fn drop(&mut self) {
        if self.terminated {
            return;
        }
        if let Err(e) = self.ocr.terminate() {
            log::error!("Failed to terminate OCR service `{}`: {e:?}", self.ocr.name());
        }
    }
}

/// A job being performed by a service. May or may not be finished.
pub struct ServiceJob<T> {
    handle: Option<JoinHandle<T>>,
}

impl<T: Send + 'static> ServiceJob<T> {
    pub fn new<F: FnOnce() -> T + Send + 'static>(f: F) -> Self {
        std::thread::spawn(f).into()
    }

    /// A job whose value is already known.
    pub fn ready(value: T) -> Self {
        Self::new(move || value)
    }
}

impl<T> ServiceJob<T> {
    /// Get the return value of this `ServiceJob` if it was finished.
    ///
    /// - Returns `Err` if the job has already finished and its return value was taken previously, or if it panicked;
    /// - Returns `Ok(None)` if the job has not finished yet;
    /// - Returns `Ok(Some(T))` if the job has finished.
    pub fn try_wait(&mut self) -> Result<Option<T>> {
        match self.handle.take() {
            None => Err(anyhow!("job already finished")),
            Some(handle) if handle.is_finished() => join(handle).map(Some),
            Some(handle) => {
                self.handle = Some(handle);
                Ok(None)
            }
        }
    }

    /// Wait for the job to finish and return its return value.
    ///
    /// - Returns `Err` if the job has already finished (eg. by calling `try_wait()`) and its return value was taken previously, or if it panicked;
    /// - Returns `Ok(T)` if the job has finished.
    pub fn wait(self) -> Result<T> {
        match self.handle {
            None => Err(anyhow!("job already finished")),
            Some(handle) => join(handle),
        }
    }
}

fn join<T>(handle: JoinHandle<T>) -> Result<T> {
    handle
        .join()
        .map_err(|_| anyhow!("service job panicked before returning a value"))
}

impl<T> From<JoinHandle<T>> for ServiceJob<T> {
    fn from(handle: JoinHandle<T>) -> Self {
        ServiceJob {
            handle: Some(handle),
        }
    }
}
