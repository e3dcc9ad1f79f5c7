use anyhow::{anyhow, Context, Result};
use config::{AppConfig, Config};
use eframe::egui;
use gui::{config_window::show_config_window, main_window::MainWindow, popups::Popups};
use services::Services;

pub mod config;
pub mod gui;
pub mod image_file;
pub mod services;
pub mod session;

pub const WINDOW_TITLE: &str = "ocrdesk";

fn main() -> Result<()> {
    pretty_env_logger::init();

    let config = AppConfig::load().context("Could not load main configuration file")?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(WINDOW_TITLE)
            .with_inner_size([config.window_width as f32, config.window_height as f32])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        WINDOW_TITLE,
        options,
        Box::new(move |_cc| {
            EframeApp::new(config)
                .map(|app| -> Box<dyn eframe::App> { Box::new(app) })
                .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> { e.into() })
        }),
    )
    .map_err(|e| anyhow!("{e}"))
}

pub struct EframeApp {
    pub config: AppConfig,
    pub services: Services,
    pub popups: Popups,
    pub main_window: MainWindow,
    pub show_config: bool,
}

impl EframeApp {
    pub fn new(config: AppConfig) -> Result<Self> {
        let mut services = Services::new(&config).with_context(|| {
            format!(
                "Failed to initialise OCR service `{}`",
                config.ocr_service.name()
            )
        })?;
        let main_window = MainWindow::new(&mut services);

        Ok(Self {
            config,
            services,
            popups: Popups::default(),
            main_window,
            show_config: false,
        })
    }
}

impl eframe::App for EframeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("navigation").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.show_config, false, "Recognize");
                ui.selectable_value(&mut self.show_config, true, "Settings");
            });
        });

        // a dropped image should not be lost because the settings are open
        if self.main_window.update(ctx, &mut self.popups) {
            self.show_config = false;
        }

        if self.show_config {
            show_config_window(self, ctx);
        } else {
            self.main_window
                .show(ctx, &mut self.popups, &mut self.services);
        }

        self.popups.show(ctx);
    }
}

impl Drop for EframeApp {
    fn drop(&mut self) {
        if let Err(e) = self.config.save() {
            log::error!("Failed to save main configuration file: {e:?}");
        }
    }
}
