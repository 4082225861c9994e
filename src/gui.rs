// src/gui.rs
use anyhow::Result;
use eframe::egui;
use egui::{Color32, RichText, Vec2};
use image::{DynamicImage, ImageFormat};
use log::{error, info};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::acquire::permissions::{Capability, CapabilityBroker, DesktopBroker};
use crate::acquire::{self, SelectedImage, Source};
use crate::api::client::PredictionClient;
use crate::api::connector::Predictor;
use crate::session::Session;

const WINDOW_WIDTH: f32 = 480.0;
const WINDOW_HEIGHT: f32 = 640.0;

/// Written by background workers, read on the UI thread.
struct SharedState {
    busy: bool,
    status: String,
    error: Option<String>,
    image: Option<DynamicImage>,
    texture: Option<egui::TextureHandle>,
    pending_selection: Option<SelectedImage>,
    upload_done: bool,
}

pub struct HelmetSnapApp {
    session: Session,
    shared: Arc<Mutex<SharedState>>,
    server_url: String,
}

impl HelmetSnapApp {
    fn new(server_url: String) -> Self {
        let shared = Arc::new(Mutex::new(SharedState {
            busy: false,
            status: "Capture or choose a photo to get started".to_string(),
            error: None,
            image: None,
            texture: None,
            pending_selection: None,
            upload_done: false,
        }));

        Self {
            session: Session::default(),
            shared,
            server_url,
        }
    }

    fn capture_photo(&mut self) {
        if let Err(e) = DesktopBroker.ensure(Capability::Camera) {
            self.shared.lock().unwrap().error = Some(e.to_string());
            return;
        }

        let shared = Arc::clone(&self.shared);
        {
            let mut state = shared.lock().unwrap();
            state.busy = true;
            state.status = "Capturing...".to_string();
            state.error = None;
        }
        thread::spawn(move || {
            // Let the frame settle before grabbing it
            thread::sleep(Duration::from_millis(300));
            let result = acquire::camera::capture_photo();
            let mut state = shared.lock().unwrap();
            match result {
                Ok(selection) => {
                    match image::open(selection.path()) {
                        Ok(preview) => {
                            state.image = Some(preview);
                            state.texture = None;
                        }
                        Err(e) => error!("Failed to load preview: {}", e),
                    }
                    state.status = format!("Captured {}", selection.file_name());
                    state.pending_selection = Some(selection);
                }
                Err(e) => {
                    error!("Capture failed: {}", e);
                    state.error = Some(format!("Capture failed: {}", e));
                    state.status.clear();
                }
            }
            state.busy = false;
        });
    }

    fn browse_for_photo(&mut self) {
        if let Err(e) = DesktopBroker.ensure(Capability::MediaRead) {
            self.shared.lock().unwrap().error = Some(e.to_string());
            return;
        }

        let Some(content) = acquire::picker::pick_image() else {
            return;
        };
        self.adopt_content(content, Source::Picker);
    }

    #[cfg(feature = "clipboard")]
    fn paste_from_clipboard(&mut self) {
        if let Err(e) = DesktopBroker.ensure(Capability::MediaRead) {
            self.shared.lock().unwrap().error = Some(e.to_string());
            return;
        }

        match acquire::picker::clipboard_image() {
            Ok(content) => self.adopt_content(content, Source::Clipboard),
            Err(e) => {
                self.shared.lock().unwrap().error = Some(format!("Clipboard read failed: {}", e));
            }
        }
    }

    fn adopt_content(&mut self, content: acquire::ContentRef, source: Source) {
        match acquire::stage(content, source) {
            Ok(selection) => {
                let verb = match selection.source() {
                    Source::Camera => "Captured",
                    Source::Picker => "Selected",
                    Source::Clipboard => "Pasted",
                };
                let staged = if selection.is_staged() {
                    " (staged copy)"
                } else {
                    ""
                };
                {
                    let mut state = self.shared.lock().unwrap();
                    state.status = format!("{} {}{}", verb, selection.file_name(), staged);
                    state.error = None;
                }
                self.load_preview(selection.path().to_path_buf());
                self.session.select(selection);
            }
            Err(e) => {
                error!("Failed to stage selection: {}", e);
                self.shared.lock().unwrap().error = Some(format!("Could not use image: {}", e));
            }
        }
    }

    fn load_preview(&self, path: PathBuf) {
        let shared = Arc::clone(&self.shared);
        thread::spawn(move || match image::open(&path) {
            Ok(preview) => {
                let mut state = shared.lock().unwrap();
                state.image = Some(preview);
                state.texture = None;
            }
            Err(e) => {
                error!("Failed to load preview for {}: {}", path.display(), e);
            }
        });
    }

    fn submit(&mut self) {
        let Some(selection) = self.session.begin_upload() else {
            return;
        };

        let shared = Arc::clone(&self.shared);
        let server_url = self.server_url.clone();
        {
            let mut state = shared.lock().unwrap();
            state.busy = true;
            state.status = "Uploading for detection...".to_string();
            state.error = None;
        }
        info!("Submitting {} to {}", selection.file_name(), server_url);
        thread::spawn(move || {
            let result = PredictionClient::new(&server_url)
                .and_then(|client| client.predict_file(selection.path()));
            let mut state = shared.lock().unwrap();
            match result {
                Ok(annotated) => {
                    state.image = Some(annotated);
                    state.texture = None;
                    state.status = "Detection complete".to_string();
                }
                Err(e) => {
                    error!("Prediction failed: {}", e);
                    state.error = Some(format!("Prediction failed: {}", e));
                    state.status.clear();
                }
            }
            state.busy = false;
            state.upload_done = true;
        });
    }

    fn clear_all(&mut self) {
        self.session.clear();
        let mut state = self.shared.lock().unwrap();
        state.image = None;
        state.texture = None;
        state.error = None;
        state.status = "Capture or choose a photo to get started".to_string();
        info!("Selection and displayed image cleared");
    }

    fn save_displayed_image(&self) {
        let displayed = self.shared.lock().unwrap().image.clone();
        if let Some(image) = displayed {
            if let Some(path) = rfd::FileDialog::new()
                .add_filter("PNG", &["png"])
                .add_filter("JPEG", &["jpg", "jpeg"])
                .set_file_name("detection.png")
                .save_file()
            {
                if let Err(e) = image.save_with_format(&path, ImageFormat::Png) {
                    error!("Failed to save image: {}", e);
                } else {
                    info!("Image saved to: {}", path.display());
                }
            }
        }
    }
}

impl eframe::App for HelmetSnapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Adopt worker results; the session is only ever mutated here,
        // on the UI thread.
        {
            let mut state = self.shared.lock().unwrap();
            if let Some(selection) = state.pending_selection.take() {
                self.session.select(selection);
            }
            if state.upload_done {
                state.upload_done = false;
                self.session.finish_upload();
            }
            if state.texture.is_none() {
                if let Some(image) = &state.image {
                    let size = [image.width() as usize, image.height() as usize];
                    let egui_image = egui::ColorImage::from_rgba_unmultiplied(
                        size,
                        image.to_rgba8().as_flat_samples().as_slice(),
                    );
                    state.texture = Some(ctx.load_texture(
                        "displayed_image",
                        egui_image,
                        egui::TextureOptions::LINEAR,
                    ));
                }
            }
            if state.busy {
                ctx.request_repaint_after(Duration::from_millis(100));
            }
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(8.0);
            ui.heading(RichText::new("HelmetSnap").size(22.0));
            ui.label(
                RichText::new(format!("Server: {}", self.server_url))
                    .small()
                    .color(Color32::from_rgb(150, 150, 150)),
            );
            ui.separator();
            ui.add_space(8.0);

            ui.horizontal(|ui| {
                let button_size = egui::vec2(ui.available_width() * 0.33 - 6.0, 36.0);
                if ui
                    .add_sized(button_size, egui::Button::new("📷 Capture"))
                    .clicked()
                {
                    self.capture_photo();
                }
                if ui
                    .add_sized(button_size, egui::Button::new("🖼 Browse..."))
                    .clicked()
                {
                    self.browse_for_photo();
                }
                #[cfg(feature = "clipboard")]
                if ui
                    .add_sized(button_size, egui::Button::new("📋 Paste"))
                    .clicked()
                {
                    self.paste_from_clipboard();
                }
            });

            ui.add_space(8.0);

            let (busy, status, error_text, texture, has_image) = {
                let state = self.shared.lock().unwrap();
                (
                    state.busy,
                    state.status.clone(),
                    state.error.clone(),
                    state.texture.clone(),
                    state.image.is_some(),
                )
            };

            ui.horizontal(|ui| {
                let detect_enabled = self.session.can_submit() && !busy;
                let mut wants_submit = false;
                ui.add_enabled_ui(detect_enabled, |ui| {
                    if ui
                        .add_sized(
                            [160.0, 36.0],
                            egui::Button::new(RichText::new("🔍 Detect helmets").size(15.0))
                                .fill(Color32::from_rgb(42, 90, 170)),
                        )
                        .clicked()
                    {
                        wants_submit = true;
                    }
                });
                if wants_submit {
                    self.submit();
                }
                if busy || self.session.is_uploading() {
                    ui.spinner();
                }
                if has_image && ui.button("💾 Save").clicked() {
                    self.save_displayed_image();
                }
                if (has_image || self.session.selected().is_some())
                    && ui.button("✕ Clear").clicked()
                {
                    self.clear_all();
                }
            });

            ui.add_space(6.0);
            if !status.is_empty() {
                ui.label(status);
            }
            if let Some(text) = error_text {
                ui.colored_label(Color32::from_rgb(220, 80, 80), text);
            }

            ui.add_space(8.0);
            if let Some(texture) = texture {
                egui::ScrollArea::vertical()
                    .auto_shrink([false; 2])
                    .show(ui, |ui| {
                        let available_width = ui.available_width();
                        let aspect = texture.size_vec2().x / texture.size_vec2().y;
                        let height = if aspect > 0.0 {
                            available_width / aspect
                        } else {
                            available_width
                        };
                        ui.image((texture.id(), Vec2::new(available_width, height)));
                    });
            } else {
                ui.centered_and_justified(|ui| {
                    ui.label(
                        RichText::new("No photo yet")
                            .size(16.0)
                            .color(Color32::from_rgb(120, 120, 120)),
                    );
                });
            }
        });
    }
}

pub fn run_gui(server_url: String) -> Result<()> {
    info!("HelmetSnap GUI starting up...");

    let native_options = eframe::NativeOptions {
        initial_window_size: Some(egui::vec2(WINDOW_WIDTH, WINDOW_HEIGHT)),
        ..eframe::NativeOptions::default()
    };

    eframe::run_native(
        "HelmetSnap",
        native_options,
        Box::new(move |_cc| Box::new(HelmetSnapApp::new(server_url))),
    )
    .map_err(|e| anyhow::anyhow!("Failed to start GUI: {}", e))?;

    Ok(())
}
