use std::{path::Path, time::Duration};

use anyhow::Result;
use eframe::egui::{self, vec2, Color32, RichText, TextureHandle};
use image::RgbaImage;

use crate::{
    image_file::ImageFile,
    services::{
        ocr::{OcrResult, Outcome},
        ServiceJob, Services,
    },
    session::{EnginePicker, Session},
};

use super::popups::Popups;

const PREVIEW_MAX_HEIGHT: f32 = 360.0;

pub struct MainWindow {
    pub session: Session,
    path_input: String,
    preview: Preview,
}

/// The decoded preview of the selected image, tagged with the selection it belongs to.
enum Preview {
    Empty(u64),
    Loading(u64, ServiceJob<Result<RgbaImage>>),
    Ready(u64, TextureHandle),
    Failed(u64),
}

impl Preview {
    fn generation(&self) -> u64 {
        match self {
            Self::Empty(generation)
            | Self::Loading(generation, _)
            | Self::Ready(generation, _)
            | Self::Failed(generation) => *generation,
        }
    }
}

impl MainWindow {
    pub fn new(services: &mut Services) -> Self {
        Self {
            session: Session::new(services.ocr.as_mut()),
            path_input: String::new(),
            preview: Preview::Empty(0),
        }
    }

    /// Take in dropped files and finished jobs. Runs every frame, whether or not the window is
    /// shown. Returns `true` if a file was dropped.
    pub fn update(&mut self, ctx: &egui::Context, popups: &mut Popups) -> bool {
        let dropped = ctx.input(|input| input.raw.dropped_files.first().cloned());
        if let Some(dropped) = &dropped {
            match ImageFile::from_dropped(dropped) {
                Ok(image) => self.session.select_image(image),
                Err(e) => popups.error(e),
            }
        }

        if let Err(e) = self.session.poll() {
            popups.error(e);
        }
        self.update_preview(ctx, popups);

        // jobs finish on other threads, which does not wake egui up on its own
        if self.session.is_busy()
            || self.session.is_loading_engines()
            || matches!(self.preview, Preview::Loading(..))
        {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        dropped.is_some()
    }

    pub fn show(&mut self, ctx: &egui::Context, popups: &mut Popups, services: &mut Services) {
        let hovering = ctx.input(|input| !input.raw.hovered_files.is_empty());

        egui::CentralPanel::default().show(ctx, |ui| {
            self.drop_zone_ui(ui, hovering, popups);
            ui.add_space(8.0);
            self.engines_ui(ui, services);
            ui.add_space(8.0);
            self.actions_ui(ui, popups, services);
            ui.separator();
            self.results_ui(ui);
        });
    }

    fn update_preview(&mut self, ctx: &egui::Context, popups: &mut Popups) {
        let generation = self.session.image_generation();

        if self.preview.generation() != generation {
            self.preview = match self.session.image() {
                None => Preview::Empty(generation),
                Some(image) => {
                    let image = image.clone();
                    Preview::Loading(generation, ServiceJob::new(move || image.decode()))
                }
            };
        }

        if let Preview::Loading(generation, job) = &mut self.preview {
            let generation = *generation;
            let decoded = match job.try_wait().transpose() {
                None => return,
                Some(finished) => finished.and_then(|decoded| decoded),
            };

            self.preview = match decoded {
                Ok(image) => {
                    let color_image = egui::ColorImage::from_rgba_unmultiplied(
                        [image.width() as usize, image.height() as usize],
                        image.as_flat_samples().as_slice(),
                    );
                    let texture = ctx.load_texture(
                        "image preview",
                        color_image,
                        egui::TextureOptions::LINEAR,
                    );
                    Preview::Ready(generation, texture)
                }
                Err(e) => {
                    popups.error(e.context("Could not show a preview of the selected image"));
                    Preview::Failed(generation)
                }
            };
        }
    }

    fn drop_zone_ui(&mut self, ui: &mut egui::Ui, hovering: bool, popups: &mut Popups) {
        let stroke = if hovering {
            egui::Stroke::new(2.0, ui.visuals().selection.stroke.color)
        } else {
            ui.visuals().widgets.noninteractive.bg_stroke
        };

        egui::Frame::group(ui.style())
            .stroke(stroke)
            .inner_margin(egui::Margin::same(12))
            .show(ui, |ui| {
                ui.set_width(ui.available_width());

                ui.vertical_centered(|ui| match &self.preview {
                    Preview::Ready(_, texture) => {
                        ui.add(
                            egui::Image::from_texture(egui::load::SizedTexture::from_handle(
                                texture,
                            ))
                            .max_size(vec2(ui.available_width(), PREVIEW_MAX_HEIGHT)),
                        );
                    }
                    Preview::Loading(..) => {
                        ui.spinner();
                    }
                    Preview::Empty(_) | Preview::Failed(_) => {
                        let text = if hovering {
                            "Release to select this image"
                        } else {
                            "Drop an image here"
                        };
                        ui.label(RichText::new(text).size(18.0).weak());
                    }
                });

                if let Some(image) = self.session.image() {
                    ui.vertical_centered(|ui| {
                        ui.label(format!(
                            "{} ({}, {} KiB)",
                            image.name,
                            image.mime_type,
                            image.bytes.len().div_ceil(1024)
                        ));
                    });
                }

                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    ui.label("Or open a file:");
                    let response = ui.add(
                        egui::TextEdit::singleline(&mut self.path_input)
                            .hint_text("/path/to/image.png")
                            .desired_width(ui.available_width() - 64.0),
                    );
                    let submitted = response.lost_focus()
                        && ui.input(|input| input.key_pressed(egui::Key::Enter));
                    let open = ui.button("Open").clicked() || submitted;

                    if open && !self.path_input.trim().is_empty() {
                        match ImageFile::open(Path::new(self.path_input.trim())) {
                            Ok(image) => self.session.select_image(image),
                            Err(e) => popups.error(e),
                        }
                    }
                });
            });
    }

    fn engines_ui(&mut self, ui: &mut egui::Ui, services: &mut Services) {
        ui.horizontal_wrapped(|ui| {
            ui.label("Engines:");

            match &mut self.session.picker {
                EnginePicker::Multiple(engines) => {
                    for (engine, checked) in engines.iter_mut() {
                        ui.checkbox(checked, engine.as_str());
                    }
                }
                EnginePicker::Single { engines, selected } => {
                    let selected_text = selected
                        .and_then(|idx| engines.get(idx))
                        .map(String::as_str)
                        .unwrap_or("(none)");

                    egui::ComboBox::from_id_salt("engine")
                        .selected_text(selected_text)
                        .show_ui(ui, |ui| {
                            for (idx, engine) in engines.iter().enumerate() {
                                ui.selectable_value(selected, Some(idx), engine.as_str());
                            }
                        });
                }
            }

            if self.session.is_loading_engines() {
                ui.spinner();
            } else if ui.small_button("Refresh").clicked() {
                self.session.refresh_engines(services.ocr.as_mut());
            }
        });
    }

    fn actions_ui(&mut self, ui: &mut egui::Ui, popups: &mut Popups, services: &mut Services) {
        ui.horizontal(|ui| {
            let recognize = ui.add_enabled(
                self.session.can_submit(),
                egui::Button::new(RichText::new("Recognize").size(16.0)),
            );
            if recognize.clicked() {
                if let Err(e) = self.session.submit(services.ocr.as_mut()) {
                    popups.error(e);
                }
            }

            if ui
                .add_enabled(
                    self.session.image().is_some() && !self.session.is_busy(),
                    egui::Button::new("Clear"),
                )
                .clicked()
            {
                self.session.clear_image();
            }

            if self.session.is_busy() {
                ui.spinner();
                ui.label("Recognizing...");
            }
        });
    }

    fn results_ui(&self, ui: &mut egui::Ui) {
        if let Some(round_trip) = self.session.round_trip() {
            ui.label(
                RichText::new(format!("Round trip: {:.2} s", round_trip.as_secs_f64())).weak(),
            );
        }

        egui::ScrollArea::vertical()
            .auto_shrink(false)
            .show(ui, |ui| {
                for result in self.session.results() {
                    result_ui(ui, result);
                    ui.add_space(12.0);
                }
            });
    }
}

fn result_ui(ui: &mut egui::Ui, result: &OcrResult) {
    ui.label(RichText::new(result.heading()).size(18.0).strong());
    ui.separator();

    match &result.outcome {
        Outcome::Text(text) => {
            ui.add(egui::Label::new(text.as_str()).selectable(true));
        }
        Outcome::Error(error) => {
            ui.horizontal_wrapped(|ui| {
                ui.label(RichText::new("Error:").strong().color(Color32::LIGHT_RED));
                ui.label(error.as_str());
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        image_file::tests::png_bytes,
        services::ocr::{fake::FakeOcr, EngineSelection},
    };

    #[test]
    fn dropped_file_is_selected_without_drawing() {
        let mut service = FakeOcr::new(EngineSelection::Multiple);
        let mut window = MainWindow {
            session: Session::new(&mut service),
            path_input: String::new(),
            preview: Preview::Empty(0),
        };
        let mut popups = Popups::default();

        let input = egui::RawInput {
            dropped_files: vec![egui::DroppedFile {
                name: "scan.png".to_owned(),
                bytes: Some(png_bytes().into()),
                ..Default::default()
            }],
            ..Default::default()
        };

        let mut dropped = false;
        let ctx = egui::Context::default();
        let _ = ctx.run(input, |ctx| {
            dropped = window.update(ctx, &mut popups);
        });

        assert!(dropped);
        let image = window.session.image().unwrap();
        assert_eq!(image.name, "scan.png");
        assert_eq!(window.session.image_generation(), 1);

        let mut dropped = true;
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            dropped = window.update(ctx, &mut popups);
        });
        assert!(!dropped);
        assert_eq!(window.session.image_generation(), 1);
    }
}
