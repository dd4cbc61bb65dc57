use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use client_core::{
    view::{FileInfoView, ProgressView},
    Controller, ControllerEvent, LocalFile, Panel, ProgressAction, ViewModel,
};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use egui::{Color32, RichText};
use shared::domain::{AudioFormat, ChunkStatus, LogSeverity};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::{
    events::{UiError, UiErrorContext, UiEvent},
    orchestration::dispatch_backend_command,
};

const COPIED_LABEL_DURATION: Duration = Duration::from_secs(2);

pub struct TranscriberApp {
    controller: Controller,
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    status: String,
    copied_at: Option<Instant>,
}

impl TranscriberApp {
    pub fn new(
        controller: Controller,
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
    ) -> Self {
        Self {
            controller,
            cmd_tx,
            ui_rx,
            status: String::new(),
            copied_at: None,
        }
    }

    fn dispatch(&mut self, event: ControllerEvent) {
        let effects = self.controller.dispatch(event);
        if !effects.is_empty() {
            dispatch_backend_command(
                &self.cmd_tx,
                BackendCommand::Apply(effects),
                &mut self.status,
            );
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Info(message) => self.status = message,
                UiEvent::Controller(event) => self.dispatch(event),
                UiEvent::TranscriptSaved(path) => {
                    self.status = format!("Transcript saved to {}", path.display());
                }
                UiEvent::Error(err) => self.report(err),
            }
        }
    }

    fn report(&mut self, err: UiError) {
        tracing::warn!(category = ?err.category(), context = ?err.context(), "{}", err.message());
        self.status = err.status_text();
    }

    fn select_path(&mut self, path: PathBuf) {
        match LocalFile::from_path(&path) {
            Ok(file) => self.dispatch(ControllerEvent::Stage(file)),
            Err(err) => self.report(UiError::from_message(
                UiErrorContext::SelectFile,
                format!("{err:#}"),
            )),
        }
    }

    fn take_dropped_file(&mut self, ctx: &egui::Context, enabled: bool) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        if !enabled {
            return;
        }
        // Only the first file of a multi-file drop is used.
        if let Some(path) = dropped.into_iter().find_map(|file| file.path) {
            self.select_path(path);
        }
    }

    fn show_drop_zone(&mut self, ui: &mut egui::Ui, view: &ViewModel) {
        let hovering = ui.ctx().input(|i| !i.raw.hovered_files.is_empty());
        let stroke_color = if hovering && view.drop_zone_enabled {
            ui.visuals().selection.stroke.color
        } else {
            ui.visuals().widgets.noninteractive.bg_stroke.color
        };

        egui::Frame::group(ui.style())
            .stroke(egui::Stroke::new(1.5, stroke_color))
            .inner_margin(egui::Margin::same(18))
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.add_enabled_ui(view.drop_zone_enabled, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.label(RichText::new("Drop an audio file here").size(16.0));
                        ui.label(
                            RichText::new("WAV, MP3, OGG, FLAC or M4A, up to 100MB").weak(),
                        );
                        ui.add_space(6.0);
                        if ui.button("Choose file...").clicked() {
                            if let Some(path) = rfd::FileDialog::new()
                                .add_filter("Audio", audio_extensions().as_slice())
                                .pick_file()
                            {
                                self.select_path(path);
                            }
                        }
                    });
                });
            });
    }

    fn show_file_info(&mut self, ui: &mut egui::Ui, info: &FileInfoView) {
        ui.group(|ui| {
            ui.set_width(ui.available_width());
            ui.horizontal(|ui| {
                ui.label(RichText::new(&info.name).strong());
                ui.label(RichText::new(&info.size_text).weak());
            });
            if let Some(advisory) = &info.advisory {
                ui.colored_label(ui.visuals().warn_fg_color, advisory);
            }
            ui.add_space(6.0);
            ui.horizontal(|ui| {
                if ui.button("Transcribe").clicked() {
                    self.dispatch(ControllerEvent::StartUpload);
                }
                if ui.button("Remove").clicked() {
                    self.dispatch(ControllerEvent::Reset);
                }
            });
        });
    }

    fn show_progress(&mut self, ui: &mut egui::Ui, progress: &ProgressView) {
        ui.group(|ui| {
            ui.set_width(ui.available_width());
            ui.label(RichText::new(&progress.status_text).strong());
            ui.add(
                egui::ProgressBar::new((progress.percent / 100.0) as f32)
                    .text(format!("{:.0}%", progress.percent)),
            );

            if let Some(counter) = progress.counter_text() {
                ui.label(counter);
            }
            if !progress.indicators.is_empty() {
                ui.horizontal_wrapped(|ui| {
                    for (index, status) in progress.indicators.iter().enumerate() {
                        let (rect, response) =
                            ui.allocate_exact_size(egui::vec2(14.0, 14.0), egui::Sense::hover());
                        ui.painter().rect_filled(rect, 3.0, chunk_color(*status));
                        response.on_hover_text(format!(
                            "Chunk {}: {}",
                            index + 1,
                            chunk_label(*status)
                        ));
                    }
                });
            }

            ui.add_space(4.0);
            egui::ScrollArea::vertical()
                .id_salt("progress_log")
                .max_height(160.0)
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    for line in &progress.log {
                        ui.colored_label(severity_color(line.severity, ui.visuals()), &line.text);
                    }
                });

            if !progress.preview.is_empty() {
                egui::CollapsingHeader::new("Partial transcript")
                    .default_open(true)
                    .show(ui, |ui| {
                        egui::ScrollArea::vertical()
                            .id_salt("partial_preview")
                            .max_height(120.0)
                            .show(ui, |ui| ui.label(&progress.preview));
                    });
            }

            match progress.action {
                ProgressAction::None => {}
                ProgressAction::Cancel => {
                    if ui.button("Cancel").clicked() {
                        self.dispatch(ControllerEvent::Cancel);
                    }
                }
                ProgressAction::Back => {
                    if ui.button("Back").clicked() {
                        self.dispatch(ControllerEvent::Reset);
                    }
                }
            }
        });
    }

    fn show_results(&mut self, ui: &mut egui::Ui, transcript: &str, download_name: &str) {
        ui.group(|ui| {
            ui.set_width(ui.available_width());
            ui.label(RichText::new("Transcript").strong());
            egui::ScrollArea::vertical()
                .id_salt("transcript")
                .max_height((ui.available_height() - 48.0).max(120.0))
                .show(ui, |ui| {
                    let mut text = transcript;
                    ui.add(
                        egui::TextEdit::multiline(&mut text)
                            .desired_width(f32::INFINITY)
                            .desired_rows(12),
                    );
                });

            ui.horizontal(|ui| {
                if ui.button("Copy").clicked() {
                    self.copy_transcript(ui.ctx(), transcript);
                }
                if self
                    .copied_at
                    .is_some_and(|at| at.elapsed() < COPIED_LABEL_DURATION)
                {
                    ui.label(RichText::new("Copied!").color(ui.visuals().selection.stroke.color));
                }
                if ui.button("Download").clicked() {
                    self.save_transcript(transcript, download_name);
                }
                if ui.button("New transcription").clicked() {
                    self.dispatch(ControllerEvent::Reset);
                }
            });
        });
    }

    fn show_error(&mut self, ui: &mut egui::Ui, message: &str) {
        ui.group(|ui| {
            ui.set_width(ui.available_width());
            ui.colored_label(ui.visuals().error_fg_color, message);
            ui.add_space(6.0);
            ui.horizontal(|ui| {
                if ui.button("Try again").clicked() {
                    self.dispatch(ControllerEvent::Retry);
                }
                if ui.button("Start over").clicked() {
                    self.dispatch(ControllerEvent::Reset);
                }
            });
        });
    }

    fn copy_transcript(&mut self, ctx: &egui::Context, transcript: &str) {
        ctx.copy_text(transcript.to_string());
        self.copied_at = Some(Instant::now());
        tracing::debug!(characters = transcript.chars().count(), "copied transcript");
    }

    fn save_transcript(&mut self, transcript: &str, download_name: &str) {
        let Some(target) = rfd::FileDialog::new()
            .set_file_name(download_name)
            .add_filter("Text", &["txt"])
            .save_file()
        else {
            return;
        };
        let source_name = self
            .controller
            .session()
            .and_then(|session| session.source_name.clone());
        dispatch_backend_command(
            &self.cmd_tx,
            BackendCommand::SaveTranscript {
                target,
                source_name,
                text: transcript.to_string(),
            },
            &mut self.status,
        );
    }
}

impl eframe::App for TranscriberApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();

        let view = ViewModel::project(&self.controller);
        self.take_dropped_file(ctx, view.drop_zone_enabled);

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.label(RichText::new(&self.status).weak());
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Audio transcription");
            ui.add_space(8.0);
            self.show_drop_zone(ui, &view);
            ui.add_space(10.0);

            match view.panel {
                Panel::None => {}
                Panel::FileInfo => {
                    if let Some(info) = &view.file_info {
                        self.show_file_info(ui, info);
                    }
                }
                Panel::Progress => {
                    if let Some(progress) = &view.progress {
                        self.show_progress(ui, progress);
                    }
                }
                Panel::Results => {
                    if let Some(transcript) = &view.transcript {
                        self.show_results(ui, transcript, &view.download_name);
                    }
                }
                Panel::Error => {
                    if let Some(error) = &view.error {
                        self.show_error(ui, &error.message);
                    }
                }
            }
        });

        ctx.request_repaint_after(Duration::from_millis(100));
    }
}

fn audio_extensions() -> Vec<&'static str> {
    AudioFormat::ALL
        .iter()
        .map(|format| format.extension())
        .collect()
}

pub fn chunk_color(status: ChunkStatus) -> Color32 {
    match status {
        ChunkStatus::Pending => Color32::from_gray(120),
        ChunkStatus::Processing => Color32::from_rgb(66, 133, 244),
        ChunkStatus::Success => Color32::from_rgb(52, 168, 83),
        ChunkStatus::Error => Color32::from_rgb(234, 67, 53),
        ChunkStatus::Retried => Color32::from_rgb(251, 188, 5),
    }
}

pub fn chunk_label(status: ChunkStatus) -> &'static str {
    match status {
        ChunkStatus::Pending => "pending",
        ChunkStatus::Processing => "processing",
        ChunkStatus::Success => "done",
        ChunkStatus::Error => "failed",
        ChunkStatus::Retried => "done after retry",
    }
}

fn severity_color(severity: LogSeverity, visuals: &egui::Visuals) -> Color32 {
    match severity {
        LogSeverity::Info => visuals.text_color(),
        LogSeverity::Success => Color32::from_rgb(52, 168, 83),
        LogSeverity::Warning => visuals.warn_fg_color,
        LogSeverity::Error => visuals.error_fg_color,
    }
}
