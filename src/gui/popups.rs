use eframe::egui::{self, vec2};

/// A stack of popups which should be shown to the user (eg. for error messages).
#[derive(Debug, Default)]
pub struct Popups(Vec<Popup>);

#[derive(Debug)]
struct Popup {
    id: u64,
    message: String,
    first_frame: bool,
}

impl Popups {
    /// Show a new error message to the user.
    pub fn error(&mut self, e: anyhow::Error) {
        log::error!("{e:?}");
        self.push(format_error(&e));
    }

    fn push(&mut self, message: String) {
        let id = self.0.last().map_or(0, |popup| popup.id + 1);
        self.0.push(Popup {
            id,
            message,
            first_frame: true,
        });
    }

    /// Show all currently held popups.
    pub fn show(&mut self, ctx: &egui::Context) {
        let mut closed = Vec::new();

        for popup in self.0.iter_mut() {
            ctx.show_viewport_immediate(
                egui::ViewportId(egui::Id::new(("error_popup", popup.id))),
                egui::ViewportBuilder {
                    title: Some("Error".to_owned()),
                    inner_size: Some(vec2(480.0, 240.0)),
                    ..Default::default()
                },
                |ctx, _| {
                    if popup.first_frame {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Focus);
                        popup.first_frame = false;
                    }

                    egui::CentralPanel::default().show(ctx, |ui| {
                        egui_extras::StripBuilder::new(ui)
                            .size(egui_extras::Size::remainder())
                            .size(egui_extras::Size::exact(22.0))
                            .vertical(|mut strip| {
                                strip.cell(|ui| {
                                    egui::ScrollArea::vertical().auto_shrink(false).show(
                                        ui,
                                        |ui| {
                                            ui.label(&popup.message);
                                        },
                                    );
                                });

                                strip.cell(|ui| {
                                    ui.centered_and_justified(|ui| {
                                        if ui.button("Close").clicked() {
                                            closed.push(popup.id);
                                        }
                                    });
                                });
                            });
                    });

                    if ctx.input(|input| input.viewport().close_requested()) {
                        closed.push(popup.id);
                    }
                },
            );
        }

        self.0.retain(|popup| !closed.contains(&popup.id));
    }
}

/// The top-level message followed by a numbered list of its causes.
fn format_error(e: &anyhow::Error) -> String {
    let mut s = format!("Error: {e}\n");

    for (idx, error) in e.chain().enumerate().skip(1) {
        s.push_str(&format!("\t{}. {}\n", idx, error));
    }

    s
}
