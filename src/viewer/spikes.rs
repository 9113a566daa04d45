// src/viewer/spikes.rs

use colored::Colorize;
use eframe::egui;
use egui_plot::{Line, Plot, PlotPoints};
use std::sync::Arc;
use std::time::Duration;

use super::ControlFlags;
use crate::buffers::spikes::SharedSpikes;
use crate::config::Config;

const OVERLAY_COLOR: egui::Color32 = egui::Color32::from_rgba_premultiplied(60, 90, 140, 70);

/// Spike overlay grid: recent waveforms superimposed per electrode, with the
/// average of their primary rows drawn on top.
pub struct SpikeGridWindow {
    store: SharedSpikes,
    flags: Arc<ControlFlags>,
    max_channels: usize,
    grid_channels: usize,
    offset: usize,
    repaint_interval: Duration,
}

impl SpikeGridWindow {
    pub fn new(store: SharedSpikes, flags: Arc<ControlFlags>, config: &Config) -> Self {
        Self {
            store,
            flags,
            max_channels: config.spikes.max_channels,
            grid_channels: config.spikes.grid_channels,
            offset: config.spikes.start_offset,
            repaint_interval: Duration::from_millis(config.spikes.redraw_interval_ms),
        }
    }

    pub fn run(
        store: SharedSpikes,
        flags: Arc<ControlFlags>,
        config: &Config,
    ) -> Result<(), eframe::Error> {
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([
                    config.viewer.window_width as f32,
                    config.viewer.window_height as f32,
                ])
                .with_title("Probe Scope - Spikes"),
            ..Default::default()
        };

        let app = SpikeGridWindow::new(store, flags, config);
        eframe::run_native(
            "Probe Scope - Spikes",
            options,
            Box::new(|_cc| Ok(Box::new(app))),
        )
    }

    fn controls(&mut self, ui: &mut egui::Ui) {
        let max_offset = self.max_channels.saturating_sub(self.grid_channels);

        ui.horizontal(|ui| {
            ui.add(
                egui::Slider::new(&mut self.offset, 0..=max_offset)
                    .step_by(1.0)
                    .text("Channel Offset"),
            );

            ui.separator();

            if ui.button("Start").clicked() {
                self.flags.resume();
            }
            if ui.button("Pause").clicked() {
                self.flags.pause();
            }
            if ui.button("Quit").clicked() {
                self.flags.stop();
                println!("{}", "Viewer closing.".red());
                ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
            }

            ui.separator();

            let store = self.store.lock().unwrap();
            ui.label(format!(
                "Spikes in view: {}  (stored: {})",
                store.count_in_view(self.offset, self.grid_channels),
                store.len()
            ));
        });
    }

    fn spike_grid(&self, ui: &mut egui::Ui) {
        // 4x4 layout for the 16 electrodes in view
        let cols = (self.grid_channels as f64).sqrt().ceil() as usize;
        let rows = self.grid_channels.div_ceil(cols);

        let spacing = ui.spacing().item_spacing;
        let cell_w = (ui.available_width() - spacing.x * (cols as f32 - 1.0)) / cols as f32;
        let cell_h = (ui.available_height() - spacing.y * (rows as f32 - 1.0)) / rows as f32;
        let plot_h = (cell_h - 18.0).max(20.0);

        let store = self.store.lock().unwrap();

        for row in 0..rows {
            ui.horizontal(|ui| {
                for col in 0..cols {
                    let i = row * cols + col;
                    if i >= self.grid_channels {
                        continue;
                    }
                    let electrode = self.offset + i;
                    let overlay = store.overlay(electrode);

                    ui.allocate_ui(egui::vec2(cell_w, cell_h), |ui| {
                        ui.vertical(|ui| {
                            if overlay.spike_count == 0 {
                                ui.small(format!("Electrode {} (no spikes)", electrode));
                            } else {
                                ui.small(format!(
                                    "Electrode {} ({} spikes)",
                                    electrode, overlay.spike_count
                                ));
                            }

                            Plot::new(("spikes", electrode))
                                .width(cell_w)
                                .height(plot_h)
                                .show_axes([false, false])
                                .show_grid([false, false])
                                .allow_zoom(false)
                                .allow_drag(false)
                                .allow_scroll(false)
                                .show(ui, |plot_ui| {
                                    for trace in &overlay.traces {
                                        plot_ui.line(
                                            Line::new(PlotPoints::from_ys_f32(trace))
                                                .color(OVERLAY_COLOR)
                                                .width(0.5),
                                        );
                                    }
                                    if let Some(average) = &overlay.average {
                                        plot_ui.line(
                                            Line::new(PlotPoints::from_ys_f32(average))
                                                .color(egui::Color32::WHITE)
                                                .width(1.5),
                                        );
                                    }
                                });
                        });
                    });
                }
            });
        }
    }
}

impl eframe::App for SpikeGridWindow {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.request_repaint_after(self.repaint_interval);

        if ctx.input(|i| i.viewport().close_requested()) {
            self.flags.stop();
        }

        egui::TopBottomPanel::bottom("spike_controls").show(ctx, |ui| {
            self.controls(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.spike_grid(ui);
        });
    }
}
